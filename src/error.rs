use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Business-rule violations are values, not panics. Handlers return these and
/// the `IntoResponse` impl maps them onto the wire.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    /// Lost race or wrong lifecycle stage; caller must re-fetch before retrying.
    #[error("{0}")]
    Conflict(String),

    #[error("donation has expired")]
    Expired,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation { field, message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Expired => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation { field, message } => {
                json!({ "error": "validation", "field": field, "message": message })
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                json!({ "error": "internal", "message": "internal server error" })
            }
            other => json!({ "error": "rejected", "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                // lost race on a uniqueness constraint; safe for the caller to retry
                Self::Conflict("resource already exists".into())
            }
            _ => Self::Internal(e.into()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::validation("quantity", "must be >= 1").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::forbidden("not your donation").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::conflict("already claimed").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Expired.status(), StatusCode::GONE);
    }

    #[test]
    fn conflict_message_reaches_display() {
        let err = ApiError::conflict("driver already has an active order");
        assert_eq!(err.to_string(), "driver already has an active order");
    }
}
