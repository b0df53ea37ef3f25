//! # Grants Core
//!
//! Core business logic for the grants dynamic form engine.
//!
//! This crate owns everything between a stored form template and a stored answer:
//! - Prefill resolution and server-side materialisation of instances
//! - Field validity, section completion and the submission gate
//! - The debounced field mutation pipeline used by editors
//! - Status transitions, including the linked child instance lifecycle
//! - File-backed record storage under the configured data directory
//!
//! **No API concerns**: HTTP servers, header parsing and DTOs belong in `api-rest` or
//! `api-shared`.

pub mod actor;
pub mod config;
pub mod constants;
pub mod error;
pub mod instance;
pub mod locks;
pub mod materialize;
pub mod organisation;
pub mod permissions;
pub mod pipeline;
pub mod prefill;
pub mod progress;
pub mod repositories;
pub mod service;
pub mod status;
pub mod transitions;

pub use actor::Actor;
pub use config::{ApprovalHistoryPolicy, CoreConfig};
pub use error::{GrantsError, GrantsResult, RecordKind};
pub use instance::FormInstance;
pub use organisation::{Operations, Organisation, OrganisationDetail, StaffMember};
pub use permissions::{PermissionPolicy, RoleListPolicy};
pub use progress::{FieldProgress, FormProgress, SectionProgress};
pub use service::{
    AttributePatch, FormInstanceService, InstanceView, NewInstance, PatchOutcome,
};
pub use status::FormStatus;

pub use grants_types::{NonEmptyText, RoleName, TextError};
pub use grants_uuid::RecordId;
