//! Acting user resolution.
//!
//! Authentication happens upstream; by the time a request reaches the API the gateway has
//! attached the user's id and role as headers. They are turned into an explicit [`Actor`]
//! here, and a request without them is rejected.

use grants_core::{Actor, NonEmptyText, RoleName};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing {0} header")]
    Missing(&'static str),
    #[error("invalid {header} header: {reason}")]
    Invalid {
        header: &'static str,
        reason: String,
    },
}

/// Builds the acting user from raw header values.
///
/// # Errors
///
/// Returns [`AuthError::Missing`] if either header is absent or blank, and
/// [`AuthError::Invalid`] if the role is not a valid role name.
pub fn actor_from_headers(user_id: Option<&str>, role: Option<&str>) -> Result<Actor, AuthError> {
    let user_id = user_id
        .and_then(|v| NonEmptyText::new(v).ok())
        .ok_or(AuthError::Missing(USER_ID_HEADER))?;

    let role = role
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::Missing(USER_ROLE_HEADER))?;
    let role = RoleName::new(role).map_err(|e| AuthError::Invalid {
        header: USER_ROLE_HEADER,
        reason: e.to_string(),
    })?;

    Ok(Actor::new(user_id, role))
}
