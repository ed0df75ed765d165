use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use tracing::warn;
use uuid::Uuid;

use super::claims::Role;
use super::jwt::JwtKeys;

/// Pre-authenticated identity the core consumes on every request.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        let claims = match keys.verify(token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        Ok(Actor {
            id: claims.sub,
            role: claims.role,
        })
    }
}

impl Actor {
    /// Role gate for handlers; roles are facts from the token, not guesses.
    pub fn require(&self, role: Role) -> Result<(), crate::error::ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(crate::error::ApiError::forbidden(format!(
                "requires {} role",
                role.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_accepts_matching_role() {
        let actor = Actor { id: Uuid::new_v4(), role: Role::Receiver };
        assert!(actor.require(Role::Receiver).is_ok());
    }

    #[test]
    fn require_rejects_other_roles() {
        let actor = Actor { id: Uuid::new_v4(), role: Role::Donor };
        let err = actor.require(Role::Driver).unwrap_err();
        assert!(err.to_string().contains("driver"));
    }
}
