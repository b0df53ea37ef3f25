//! Mapping of core errors onto HTTP responses.

use api_shared::{AuthError, ErrorRes};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use grants_core::GrantsError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorRes {
                error: error.into(),
                message: message.into(),
                parent_id: None,
                child_id: None,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<GrantsError> for ApiError {
    fn from(err: GrantsError) -> Self {
        match &err {
            GrantsError::Validation(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", msg.clone())
            }
            GrantsError::PermissionDenied(msg) => {
                tracing::warn!("Permission denied: {}", msg);
                Self::new(StatusCode::FORBIDDEN, "permission_denied", msg.clone())
            }
            GrantsError::NotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            GrantsError::InvalidInput(_) | GrantsError::Id(_) | GrantsError::Forms(_) => {
                Self::new(StatusCode::BAD_REQUEST, "bad_request", err.to_string())
            }
            GrantsError::Consistency {
                parent_id,
                child_id,
                ..
            } => {
                tracing::error!("Linked form out of step: {:?}", err);
                let mut api = Self::new(StatusCode::CONFLICT, "consistency", err.to_string());
                api.body.parent_id = Some(parent_id.to_string());
                api.body.child_id = child_id.map(|id| id.to_string());
                api
            }
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal error",
                )
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grants_core::{RecordId, RecordKind};

    #[test]
    fn core_errors_map_to_statuses() {
        let cases = [
            (
                GrantsError::Validation("incomplete".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                GrantsError::PermissionDenied("no".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                GrantsError::NotFound {
                    kind: RecordKind::Instance,
                    id: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                GrantsError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GrantsError::FileRead(std::io::Error::other("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn consistency_errors_name_both_instances() {
        let parent = RecordId::new();
        let child = RecordId::new();
        let api = ApiError::from(GrantsError::Consistency {
            parent_id: parent,
            child_id: Some(child),
            source: Box::new(GrantsError::Validation("x".into())),
        });
        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.body.parent_id, Some(parent.to_string()));
        assert_eq!(api.body.child_id, Some(child.to_string()));
    }
}
