//! Caller identity extractors.
//!
//! Token issuing and verification live in the upstream gateway; by the time
//! a request reaches this service the gateway has authenticated it and
//! forwarded the subject as headers. Handlers never read ambient request
//! state; authorization always flows through these typed parameters.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Header carrying the authenticated subject's id (a UUID).
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the subject's role, set by the gateway.
pub const USER_ROLE_HEADER: &str = "x-user-role";

const ADMIN_ROLE: &str = "admin";

/// An authenticated storefront customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

fn user_id_from_parts(parts: &Parts) -> Result<Uuid, ServiceError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("missing caller identity".to_string()))?;

    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::Unauthorized("malformed caller identity".to_string()))
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            user_id: user_id_from_parts(parts)?,
        })
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = user_id_from_parts(parts)?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if !role.eq_ignore_ascii_case(ADMIN_ROLE) {
            return Err(ServiceError::Forbidden(
                "administrator role required".to_string(),
            ));
        }

        Ok(Self { user_id })
    }
}
