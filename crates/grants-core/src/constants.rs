//! Constants used throughout the grants core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for stored records when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "grants_data";

/// Directory name for form template storage.
pub const TEMPLATES_DIR_NAME: &str = "templates";

/// Directory name for organisation (LDA) storage.
pub const ORGANISATIONS_DIR_NAME: &str = "organisations";

/// Directory name for form instance storage.
pub const INSTANCES_DIR_NAME: &str = "instances";

/// Directory name for parent → linked child markers.
pub const LINKS_DIR_NAME: &str = "links";

/// Filename for a stored form template.
pub const TEMPLATE_FILENAME: &str = "template.yaml";

/// Filename for a stored organisation.
pub const ORGANISATION_FILENAME: &str = "organisation.yaml";

/// Filename for a stored form instance.
pub const INSTANCE_FILENAME: &str = "instance.json";

/// Default quiet period before an edited field is persisted.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Roles allowed to change status and amount when none are configured.
pub const DEFAULT_STATUS_EDITOR_ROLES: &[&str] = &["ADMIN", "PROGRAMME_OFFICER"];
