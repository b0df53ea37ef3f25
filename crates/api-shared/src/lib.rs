//! # API Shared
//!
//! Shared utilities and definitions for the grants APIs.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - Resolution of the acting user from request headers
//!
//! Used by `api-rest`.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{actor_from_headers, AuthError, USER_ID_HEADER, USER_ROLE_HEADER};
pub use dto::*;
pub use health::HealthService;
