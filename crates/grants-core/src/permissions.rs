//! Permission checks consumed by the core.
//!
//! Section editability is decided by the section's own `editable_by` list. Status and amount
//! edits are gated by a [`PermissionPolicy`], so deployments can plug in their own role
//! matrix.

use crate::actor::Actor;
use grants_types::RoleName;
use std::collections::BTreeSet;

pub trait PermissionPolicy: Send + Sync {
    /// May `actor` change an instance's status?
    fn can_edit_status(&self, actor: &Actor) -> bool;

    /// May `actor` change an instance's granted amount?
    fn can_edit_amount(&self, actor: &Actor) -> bool;
}

/// Grants status and amount edits to a fixed set of roles.
#[derive(Clone, Debug)]
pub struct RoleListPolicy {
    editors: BTreeSet<RoleName>,
}

impl RoleListPolicy {
    pub fn new(roles: impl IntoIterator<Item = RoleName>) -> Self {
        Self {
            editors: roles.into_iter().collect(),
        }
    }
}

impl PermissionPolicy for RoleListPolicy {
    fn can_edit_status(&self, actor: &Actor) -> bool {
        self.editors.contains(&actor.role)
    }

    fn can_edit_amount(&self, actor: &Actor) -> bool {
        self.editors.contains(&actor.role)
    }
}
