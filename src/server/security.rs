//! Authentication
//!
//! Features:
//! - HS256 JWTs issued at login, valid for a configurable number of hours
//! - `Bearer` header extraction for protected routes
//! - Role checks: editors (ADMIN, SUPER_ADMIN) manage content, only
//!   SUPER_ADMIN changes roles
//! - Dev mode, which lets every request through

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Role, User};
use crate::server::AppState;

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: u32,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub dev_mode: bool,
}

/// Keys and policy shared by the auth extractors
#[derive(Clone)]
pub struct SecurityState {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    dev_mode: bool,
}

impl std::fmt::Debug for SecurityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityState")
            .field("ttl", &self.ttl)
            .field("dev_mode", &self.dev_mode)
            .finish()
    }
}

impl SecurityState {
    pub fn new(config: &SecurityConfig) -> Self {
        if config.jwt_secret == "CHANGE_ME_IN_PRODUCTION" && !config.dev_mode {
            warn!("Using the default JWT secret; set auth.jwt_secret");
        }
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::hours(config.token_ttl_hours),
            dev_mode: config.dev_mode,
        }
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub fn issue(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                Error::Forbidden("Invalid token".to_string())
            })
    }

    /// Missing or malformed header is 401, a bad token 403
    pub fn claims_from(&self, headers: &HeaderMap) -> Result<Claims> {
        let header = headers
            .get(AUTHORIZATION)
            .ok_or_else(|| Error::Unauthorized("Access denied".to_string()))?
            .to_str()
            .map_err(|_| Error::Unauthorized("Access denied".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Unauthorized("Access denied".to_string()))?;
        self.verify(token)
    }
}

fn app_state(parts: &Parts) -> Result<Arc<AppState>> {
    parts
        .extensions
        .get::<Arc<AppState>>()
        .cloned()
        .ok_or_else(|| Error::Internal("Application state missing".to_string()))
}

/// Any signed-in user with an editor role. `None` in dev mode.
#[derive(Debug, Clone)]
pub struct Editor(pub Option<Claims>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Editor {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let state = app_state(parts)?;
        if state.security.dev_mode() {
            return Ok(Editor(None));
        }
        let claims = state.security.claims_from(&parts.headers)?;
        if !claims.role.can_edit() {
            return Err(Error::Forbidden("Editor role required".to_string()));
        }
        Ok(Editor(Some(claims)))
    }
}

/// A signed-in SUPER_ADMIN. `None` in dev mode.
#[derive(Debug, Clone)]
pub struct SuperAdmin(pub Option<Claims>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SuperAdmin {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let state = app_state(parts)?;
        if state.security.dev_mode() {
            return Ok(SuperAdmin(None));
        }
        let claims = state.security.claims_from(&parts.headers)?;
        if claims.role != Role::SuperAdmin {
            return Err(Error::Forbidden("Access denied. Super Admins only.".to_string()));
        }
        Ok(SuperAdmin(Some(claims)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn state() -> SecurityState {
        SecurityState::new(&SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 12,
            dev_mode: false,
        })
    }

    fn user(role: Role) -> User {
        User {
            id: 7,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password: String::new(),
            role,
        }
    }

    #[test]
    fn test_issue_and_verify() -> Result<()> {
        let state = state();
        let token = state.issue(&user(Role::Admin))?;
        let claims = state.verify(&token)?;
        assert_eq!((claims.sub, claims.role), (7, Role::Admin));
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
        Ok(())
    }

    #[test]
    fn test_header_errors() -> Result<()> {
        let state = state();
        let mut headers = HeaderMap::new();
        assert!(matches!(state.claims_from(&headers), Err(Error::Unauthorized(_))));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(matches!(state.claims_from(&headers), Err(Error::Unauthorized(_))));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"));
        assert!(matches!(state.claims_from(&headers), Err(Error::Forbidden(_))));

        let token = state.issue(&user(Role::User))?;
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        assert_eq!(state.claims_from(&headers)?.role, Role::User);
        Ok(())
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() -> Result<()> {
        let other = SecurityState::new(&SecurityConfig {
            jwt_secret: "other".to_string(),
            token_ttl_hours: 1,
            dev_mode: false,
        });
        let token = other.issue(&user(Role::SuperAdmin))?;
        assert!(matches!(state().verify(&token), Err(Error::Forbidden(_))));
        Ok(())
    }
}
