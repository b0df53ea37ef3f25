//! Record storage.
//!
//! The store traits are the seam between the engine and wherever records live. The
//! file-backed implementations keep each record in its own sharded directory under the
//! configured data directory.

pub mod instances;
pub mod organisations;
pub mod shared;
pub mod templates;

use crate::error::GrantsResult;
use crate::instance::FormInstance;
use crate::organisation::Organisation;
use forms::FormTemplate;
use grants_uuid::RecordId;

pub use instances::FileInstanceStore;
pub use organisations::FileOrganisationStore;
pub use templates::FileTemplateStore;

pub trait TemplateStore: Send + Sync {
    fn load(&self, id: &RecordId) -> GrantsResult<FormTemplate>;
    fn save(&self, template: &FormTemplate) -> GrantsResult<()>;
    fn list(&self) -> GrantsResult<Vec<FormTemplate>>;
}

pub trait OrganisationStore: Send + Sync {
    fn load(&self, id: &RecordId) -> GrantsResult<Organisation>;
    fn save(&self, organisation: &Organisation) -> GrantsResult<()>;
}

/// Result of trying to store a new linked child.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    /// The parent already has a child, with this id. Nothing was written.
    AlreadyLinked(RecordId),
}

pub trait InstanceStore: Send + Sync {
    fn load(&self, id: &RecordId) -> GrantsResult<FormInstance>;

    /// Overwrites an existing instance.
    fn save(&self, instance: &FormInstance) -> GrantsResult<()>;

    /// Stores a new, unlinked instance.
    fn create(&self, instance: &FormInstance) -> GrantsResult<()>;

    fn list_for_organisation(&self, organisation_id: &RecordId) -> GrantsResult<Vec<FormInstance>>;

    /// The child whose `linkedFormId` is `parent_id`, if any.
    fn find_linked_child(&self, parent_id: &RecordId) -> GrantsResult<Option<FormInstance>>;

    /// Stores `child` as the one linked child of its `linked_form_id`.
    ///
    /// Storage guarantees at most one child per parent, across processes as well as within
    /// one.
    fn create_linked_child(&self, child: &FormInstance) -> GrantsResult<LinkOutcome>;
}
