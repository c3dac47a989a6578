//! Request extractors.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use narrator_core::role::Role;

/// Header carrying the caller's role.
pub const ROLE_HEADER: &str = "x-narrator-role";

/// The role of the caller, read from [`ROLE_HEADER`]. A missing or
/// unreadable header observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerRole(pub Role);

impl<S> FromRequestParts<S> for CallerRole
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = parts
            .headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map_or(Role::Observer, Role::from_name);
        Ok(Self(role))
    }
}
