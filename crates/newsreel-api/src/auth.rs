//! Caller identity.
//!
//! Authentication happens upstream (the portal's gateway); by the time a
//! request reaches this service the gateway has verified the token and
//! injected `x-user-id` and `x-user-role` headers. This module only reads
//! those headers; a request without them is rejected as unauthenticated.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ErrorResponse;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Portal role carried on every request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CallerRole {
    Admin,
    Editor,
    Journalist,
}

impl CallerRole {
    /// Elevated roles may manage any asset; journalists only their own.
    pub fn is_elevated(&self) -> bool {
        matches!(self, CallerRole::Admin | CallerRole::Editor)
    }
}

impl Display for CallerRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CallerRole::Admin => write!(f, "admin"),
            CallerRole::Editor => write!(f, "editor"),
            CallerRole::Journalist => write!(f, "journalist"),
        }
    }
}

impl FromStr for CallerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(CallerRole::Admin),
            "editor" => Ok(CallerRole::Editor),
            "journalist" => Ok(CallerRole::Journalist),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Caller identity extracted from gateway headers.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: Uuid,
    pub role: CallerRole,
}

impl CallerContext {
    pub fn is_elevated(&self) -> bool {
        self.role.is_elevated()
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(message, "UNAUTHORIZED")),
    )
}

// Implemented directly (not via Extension) so it composes with Multipart
// extraction in upload handlers.
impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing caller identity"))?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| unauthorized("Caller identity is not a valid UUID"))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Missing caller role"))?;
        let role = role
            .parse::<CallerRole>()
            .map_err(|_| unauthorized("Unknown caller role"))?;

        Ok(CallerContext { user_id, role })
    }
}

/// Optional caller identity, for endpoints that serve public content to
/// anonymous readers but gate private content on ownership.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<CallerContext>);

impl<S> FromRequestParts<S> for MaybeCaller
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.get(USER_ID_HEADER).is_none() {
            return Ok(MaybeCaller(None));
        }
        // Headers present but malformed is still a 401.
        CallerContext::from_request_parts(parts, state)
            .await
            .map(|ctx| MaybeCaller(Some(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevated_roles() {
        assert!(CallerRole::Admin.is_elevated());
        assert!(CallerRole::Editor.is_elevated());
        assert!(!CallerRole::Journalist.is_elevated());
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<CallerRole>().unwrap(), CallerRole::Admin);
        assert_eq!("Editor".parse::<CallerRole>().unwrap(), CallerRole::Editor);
        assert!("superuser".parse::<CallerRole>().is_err());
    }
}
