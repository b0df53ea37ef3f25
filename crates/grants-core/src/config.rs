//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handlers never read environment variables; binaries
//! parse them with the `*_from_env_value` helpers below and build a [`CoreConfig`].

use crate::constants::{
    DEFAULT_DEBOUNCE_MS, DEFAULT_STATUS_EDITOR_ROLES, INSTANCES_DIR_NAME, LINKS_DIR_NAME,
    ORGANISATIONS_DIR_NAME, TEMPLATES_DIR_NAME,
};
use crate::{GrantsError, GrantsResult};
use grants_types::RoleName;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// What happens to an instance's approval timestamp when its status moves away from
/// `Approved`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApprovalHistoryPolicy {
    /// Keep the timestamp of the most recent approval.
    #[default]
    Preserve,
    /// Clear the timestamp whenever the status is anything other than `Approved`.
    ClearOnLeave,
}

impl FromStr for ApprovalHistoryPolicy {
    type Err = GrantsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "clear" => Ok(Self::ClearOnLeave),
            other => Err(GrantsError::InvalidInput(format!(
                "unknown approval history policy '{other}' (expected 'preserve' or 'clear')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    status_editor_roles: Vec<RoleName>,
    approval_history: ApprovalHistoryPolicy,
    debounce: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`GrantsError::InvalidInput`] if no status editor role is given or the debounce
    /// window is zero.
    pub fn new(
        data_dir: PathBuf,
        status_editor_roles: Vec<RoleName>,
        approval_history: ApprovalHistoryPolicy,
        debounce: Duration,
    ) -> GrantsResult<Self> {
        if status_editor_roles.is_empty() {
            return Err(GrantsError::InvalidInput(
                "at least one status editor role is required".into(),
            ));
        }
        if debounce.is_zero() {
            return Err(GrantsError::InvalidInput(
                "debounce window must be greater than zero".into(),
            ));
        }

        Ok(Self {
            data_dir,
            status_editor_roles,
            approval_history,
            debounce,
        })
    }

    /// A configuration with default roles, policy and debounce rooted at `data_dir`.
    pub fn with_defaults(data_dir: PathBuf) -> GrantsResult<Self> {
        Self::new(
            data_dir,
            status_editor_roles_from_env_value(None)?,
            ApprovalHistoryPolicy::default(),
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.data_dir.join(TEMPLATES_DIR_NAME)
    }

    pub fn organisations_dir(&self) -> PathBuf {
        self.data_dir.join(ORGANISATIONS_DIR_NAME)
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.data_dir.join(INSTANCES_DIR_NAME)
    }

    pub fn links_dir(&self) -> PathBuf {
        self.data_dir.join(LINKS_DIR_NAME)
    }

    pub fn status_editor_roles(&self) -> &[RoleName] {
        &self.status_editor_roles
    }

    pub fn approval_history(&self) -> ApprovalHistoryPolicy {
        self.approval_history
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the comma-separated status editor role list.
///
/// If `value` is `None` or blank, returns [`DEFAULT_STATUS_EDITOR_ROLES`].
pub fn status_editor_roles_from_env_value(value: Option<String>) -> GrantsResult<Vec<RoleName>> {
    let raw: Vec<String> = match non_blank(value) {
        Some(v) => v
            .split(',')
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect(),
        None => DEFAULT_STATUS_EDITOR_ROLES
            .iter()
            .map(|r| r.to_string())
            .collect(),
    };

    raw.iter()
        .map(|r| {
            RoleName::new(r)
                .map_err(|e| GrantsError::InvalidInput(format!("invalid role '{r}': {e}")))
        })
        .collect()
}

/// Parse the approval history policy. `None` or blank yields the default (`preserve`).
pub fn approval_history_from_env_value(value: Option<String>) -> GrantsResult<ApprovalHistoryPolicy> {
    non_blank(value)
        .map(|v| v.parse())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Parse the debounce window in milliseconds. `None` or blank yields the default.
pub fn debounce_from_env_value(value: Option<String>) -> GrantsResult<Duration> {
    let millis = match non_blank(value) {
        Some(v) => v.parse::<u64>().map_err(|e| {
            GrantsError::InvalidInput(format!("invalid debounce milliseconds '{v}': {e}"))
        })?,
        None => DEFAULT_DEBOUNCE_MS,
    };
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_default_when_unset_or_blank() {
        let roles = status_editor_roles_from_env_value(None).unwrap();
        assert_eq!(
            roles.iter().map(RoleName::as_str).collect::<Vec<_>>(),
            vec!["ADMIN", "PROGRAMME_OFFICER"]
        );
        assert_eq!(
            status_editor_roles_from_env_value(Some("  ".into())).unwrap(),
            roles
        );
    }

    #[test]
    fn roles_parse_comma_list_and_skip_gaps() {
        let roles = status_editor_roles_from_env_value(Some("ADMIN, ,FUNDER".into())).unwrap();
        assert_eq!(
            roles.iter().map(RoleName::as_str).collect::<Vec<_>>(),
            vec!["ADMIN", "FUNDER"]
        );
    }

    #[test]
    fn approval_policy_parses_known_values() {
        assert_eq!(
            approval_history_from_env_value(None).unwrap(),
            ApprovalHistoryPolicy::Preserve
        );
        assert_eq!(
            approval_history_from_env_value(Some("Clear".into())).unwrap(),
            ApprovalHistoryPolicy::ClearOnLeave
        );
        assert!(approval_history_from_env_value(Some("forget".into())).is_err());
    }

    #[test]
    fn debounce_rejects_garbage_and_config_rejects_zero() {
        assert_eq!(
            debounce_from_env_value(None).unwrap(),
            Duration::from_millis(500)
        );
        assert!(debounce_from_env_value(Some("soon".into())).is_err());

        let roles = status_editor_roles_from_env_value(None).unwrap();
        let err = CoreConfig::new(
            PathBuf::from("data"),
            roles,
            ApprovalHistoryPolicy::Preserve,
            Duration::ZERO,
        );
        assert!(matches!(err, Err(GrantsError::InvalidInput(_))));
    }

    #[test]
    fn record_dirs_hang_off_data_dir() {
        let cfg = CoreConfig::with_defaults(PathBuf::from("/srv/grants")).unwrap();
        assert_eq!(cfg.instances_dir(), PathBuf::from("/srv/grants/instances"));
        assert_eq!(cfg.links_dir(), PathBuf::from("/srv/grants/links"));
    }
}
