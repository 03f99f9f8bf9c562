//! Caller identity extractors
//!
//! Authentication happens upstream; by the time a request reaches this
//! service the gateway has resolved the caller into `x-user-id` and, for
//! administrators, `x-user-role: admin`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

const ADMIN_ROLE: &str = "admin";

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub is_admin: bool,
}

/// Caller that must carry the admin role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminUser(pub CurrentUser);

impl AdminUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_str(parts, USER_ID_HEADER)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("Missing or invalid {} header", USER_ID_HEADER))
            })?;

        let is_admin = header_str(parts, USER_ROLE_HEADER)
            .is_some_and(|role| role.eq_ignore_ascii_case(ADMIN_ROLE));

        Ok(Self { id, is_admin })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(user_id = %user.id, "Non-admin caller rejected from admin route");
            return Err(AppError::Forbidden(
                "Administrator role required".to_string(),
            ));
        }
        Ok(Self(user))
    }
}
