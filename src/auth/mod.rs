/*!
 * # Session context
 *
 * Every service call takes an explicit [`Session`] naming the clinic account
 * whose rows it may touch. Over HTTP the session comes from an HS256 bearer
 * token; issuing tokens for real users happens elsewhere, so this module only
 * verifies them (plus a helper that mints development tokens for the CLI and
 * tests).
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// JWT claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (clinic account id)
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// The authenticated clinic account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
}

impl Session {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            jwt_audience: cfg.auth_audience.clone(),
            token_ttl: Duration::from_secs(cfg.jwt_expiration),
        }
    }
}

/// Verifies session tokens and turns them into [`Session`]s.
#[derive(Clone)]
pub struct SessionVerifier {
    config: AuthConfig,
}

impl SessionVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    pub fn session_from_token(&self, token: &str) -> Result<Session, AuthError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Session { user_id })
    }

    /// Mints a token for `user_id`. Used by the CLI and test harnesses.
    pub fn issue_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now();
        let ttl = ChronoDuration::from_std(self.config.token_ttl)
            .map_err(|_| AuthError::TokenCreation("invalid token ttl".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    Arc<SessionVerifier>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<SessionVerifier>::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let session = verifier.session_from_token(token).map_err(|e| {
            debug!("rejected session token: {}", e);
            e
        })?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> SessionVerifier {
        SessionVerifier::new(AuthConfig {
            jwt_secret: "unit_test_secret_for_sessions_0123456789".into(),
            jwt_issuer: "clinic-auth".into(),
            jwt_audience: "clinic-api".into(),
            token_ttl: Duration::from_secs(600),
        })
    }

    #[test]
    fn issued_token_round_trips_to_session() {
        let v = verifier();
        let user_id = Uuid::new_v4();
        let token = v.issue_token(user_id).unwrap();
        assert_eq!(v.session_from_token(&token).unwrap(), Session::new(user_id));
    }

    #[test]
    fn token_for_other_audience_is_rejected() {
        let issuer = SessionVerifier::new(AuthConfig {
            jwt_audience: "someone-else".into(),
            ..verifier().config
        });
        let token = issuer.issue_token(Uuid::new_v4()).unwrap();
        assert_eq!(
            verifier().validate_token(&token).unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let v = verifier();
        let past = Utc::now() - ChronoDuration::hours(2);
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: past.timestamp(),
            exp: (past + ChronoDuration::minutes(5)).timestamp(),
            nbf: past.timestamp(),
            iss: "clinic-auth".into(),
            aud: "clinic-api".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(v.config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(v.validate_token(&token).unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn non_uuid_subject_is_invalid() {
        let v = verifier();
        let now = Utc::now();
        let claims = Claims {
            sub: "not-a-uuid".into(),
            jti: "1".into(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::minutes(5)).timestamp(),
            nbf: now.timestamp(),
            iss: "clinic-auth".into(),
            aud: "clinic-api".into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(v.config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            v.session_from_token(&token).unwrap_err(),
            AuthError::InvalidToken
        );
    }
}
