use std::sync::OnceLock;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, AppJson};
use crate::models::{Role, UserPublic};
use crate::repositories::user_repository::{self, NewUser};
use crate::response::ApiResponse;
use crate::AppState;

const MAX_NAME_LENGTH: usize = 50;
const MIN_PASSWORD_LENGTH: usize = 6;
const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Deserialize, Debug)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Deserialize, Debug)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct ForgotPasswordData {
    pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct ResetPasswordData {
    pub password: String,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Signs a JWT for `user_id` and wraps it in the token envelope both the
/// register and login endpoints respond with.
fn token_response(state: &AppState, user_id: Uuid, status: StatusCode) -> Result<Response, ApiError> {
    let token = state
        .jwt
        .sign(user_id)
        .map_err(|e| ApiError::Internal(format!("Token signing failed: {e}")))?;
    Ok((status, Json(json!({ "success": true, "token": token }))).into_response())
}

pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterData>,
) -> Result<Response, ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::validation(format!(
            "Name cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }
    let email = payload.email.trim().to_lowercase();
    if !email_pattern().is_match(&email) {
        return Err(ApiError::validation("Please provide a valid email"));
    }
    validate_password(&payload.password)?;
    let role = match payload.role.unwrap_or(Role::User) {
        Role::Admin => return Err(ApiError::validation("Cannot register with role admin")),
        role => role,
    };

    let verification_token = random_token();
    let user = user_repository::create_user(
        &state.store,
        NewUser {
            name: name.to_string(),
            email,
            password_hash: hash_password(&payload.password)?,
            role,
            verification_token: Some(verification_token.clone()),
            verification_expire: Some(Utc::now() + Duration::hours(VERIFICATION_TOKEN_TTL_HOURS)),
        },
    )
    .await?;
    info!(user_id = %user.id, role = ?user.role, "registered new user");

    // mail is a non-critical side effect
    let verification_url = format!("{}/auth/verify/{verification_token}", state.config.public_url);
    if let Err(e) = state.mailer.send_verification(&user.email, &verification_url).await {
        warn!(error = %e, user_id = %user.id, "failed to send verification email");
    }

    token_response(&state, user.id, StatusCode::CREATED)
}

pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginData>,
) -> Result<Response, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = user_repository::find_by_email(&state.store, &email)
        .await
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
    if !verify_password(&payload.password, &user.password) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }
    token_response(&state, user.id, StatusCode::OK)
}

pub async fn me_handler(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let user = user_repository::get_user_by_id(&state.store, caller.id)
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(ApiResponse::new(UserPublic::from(&user))).into_response())
}

pub async fn verify_email_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let user = user_repository::find_by_verification_token(&state.store, &token)
        .await
        .ok_or_else(|| ApiError::validation("Invalid verification token"))?;
    let expired = user
        .verification_expire
        .map(|expire| expire < Utc::now())
        .unwrap_or(true);
    if expired {
        return Err(ApiError::validation("Verification token has expired"));
    }
    let user = user_repository::mark_verified(&state.store, user.id)
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(user_id = %user.id, "verified user email");
    Ok(Json(ApiResponse::new(UserPublic::from(&user))).into_response())
}

pub async fn forgot_password_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordData>,
) -> Result<Response, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = user_repository::find_by_email(&state.store, &email)
        .await
        .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;

    let token = random_token();
    let expire = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
    user_repository::set_reset_token(&state.store, user.id, token.clone(), expire)
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let reset_url = format!("{}/auth/reset-password/{token}", state.config.public_url);
    if let Err(e) = state.mailer.send_password_reset(&user.email, &reset_url).await {
        warn!(error = %e, user_id = %user.id, "failed to send password reset email");
    }
    Ok(Json(json!({ "success": true, "data": "Email sent" })).into_response())
}

pub async fn reset_password_handler(
    State(state): State<AppState>,
    Path(token): Path<String>,
    AppJson(payload): AppJson<ResetPasswordData>,
) -> Result<Response, ApiError> {
    validate_password(&payload.password)?;
    let user = user_repository::find_by_reset_token(&state.store, &token)
        .await
        .ok_or_else(|| ApiError::validation("Invalid reset token"))?;
    let expired = user
        .reset_password_expire
        .map(|expire| expire < Utc::now())
        .unwrap_or(true);
    if expired {
        return Err(ApiError::validation("Reset token has expired"));
    }
    user_repository::update_password(&state.store, user.id, hash_password(&payload.password)?)
        .await
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    info!(user_id = %user.id, "reset user password");
    token_response(&state, user.id, StatusCode::OK)
}
