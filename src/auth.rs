//! Bearer-token authentication.
//!
//! Handlers opt into authentication by taking an [`AuthenticatedUser`]
//! extractor (or the role-gated [`PublisherUser`] / [`AdminUser`] wrappers).
//! The extractor verifies the JWT, resolves the caller against the user
//! store so role changes and deletions take effect immediately, and caches
//! its result in the request extensions so layered extractors do the work
//! once.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;
use crate::AppState;

#[derive(Debug, Error, Clone)]
pub enum AuthError {
    #[error("Not authorized to access this route")]
    MissingToken,
    #[error("Invalid authentication token")]
    InvalidToken,
    #[error("Authentication token has expired")]
    TokenExpired,
    #[error("User no longer exists")]
    UnknownUser,
    #[error("User role is not authorized to access this route")]
    RoleDenied,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::RoleDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        };
        (
            status,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Signing/verification keys plus expiry policy, built once from config and
/// shared through [`AppState`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    pub fn sign(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| AuthError::InvalidToken)
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let data =
            decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

/// The resolved caller identity placed on the request by authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;
    value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)
        .map(str::trim)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(cached) = parts.extensions.get::<Result<Self, Self::Rejection>>() {
            return cached.clone();
        }

        let app_state = AppState::from_ref(state);
        let result = (|| {
            let token = bearer_token(parts)?;
            let user_id = app_state.jwt.verify(token)?;
            // resolve against the store so deleted users and role changes
            // take effect without waiting for token expiry
            let user = app_state
                .store
                .get_user(user_id)
                .ok_or(AuthError::UnknownUser)?;
            Ok(AuthenticatedUser {
                id: user.id,
                role: user.role,
            })
        })();

        parts.extensions.insert(result.clone());
        result
    }
}

/// Caller with role `publisher` or `admin`; anything else is a 403.
#[derive(Debug, Clone)]
pub struct PublisherUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for PublisherUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Publisher | Role::Admin => Ok(PublisherUser(user)),
            Role::User => Err(AuthError::RoleDenied),
        }
    }
}

/// Caller with role `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(AuthError::RoleDenied)
        }
    }
}
