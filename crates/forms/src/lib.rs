//! Form template wire/boundary support.
//!
//! This crate provides the **domain model** of dynamic form templates together with the
//! **wire models and translation helpers** used to read and write them:
//! - YAML documents on disk (administrator-authored templates)
//! - JSON documents exchanged with the API layer
//!
//! This crate focuses on:
//! - strict deserialisation with the failing path surfaced in errors
//! - translating the optionally-recursive wire shape into the one-level `Field` sum type
//! - structural checks (unique data keys, one nesting level)
//!
//! It knows nothing about storage, organisations or users.

pub mod answers;
pub mod prefill;
pub mod schema;
pub mod template;

// Re-export facades
pub use template::Template;

// Re-export public domain-level types
pub use answers::{FieldValue, FormData, PersonEntry};
pub use prefill::{DetailField, OperationsField, OrganisationField, PrefillRule, StaffList};
pub use schema::{
    compose_key, Field, FieldLocation, FieldType, Form, FormTemplate, GroupField, LeafField,
    Section, SidebarConfig, TemplateType,
};

/// Errors returned by the `forms` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FormsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("field '{field}' nests subfields more than one level deep")]
    NestingTooDeep { field: String },

    #[error("duplicate form data key: {0}")]
    DuplicateKey(String),

    #[error("invalid id: {0}")]
    InvalidId(String),
}

/// Type alias for Results that can fail with a [`FormsError`].
pub type FormsResult<T> = Result<T, FormsError>;
