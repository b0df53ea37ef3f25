//! The acting user.
//!
//! Every core operation that depends on who is acting takes an [`Actor`] explicitly. The core
//! never looks identity up from ambient state; the API layer resolves it from the request.

use grants_types::{NonEmptyText, RoleName};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: NonEmptyText,
    pub role: RoleName,
}

impl Actor {
    pub fn new(user_id: NonEmptyText, role: RoleName) -> Self {
        Self { user_id, role }
    }
}
