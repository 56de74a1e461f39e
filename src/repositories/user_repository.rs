use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Role, User};
use crate::store::Store;

/// Input data for creating a new user. The password arrives here already
/// hashed; hashing policy lives with the auth handlers.
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub verification_token: Option<String>,
    pub verification_expire: Option<DateTime<Utc>>,
}

pub async fn create_user(store: &Store, data: NewUser) -> Result<User, ApiError> {
    let user = User {
        id: Uuid::new_v4(),
        name: data.name,
        email: data.email,
        password: data.password_hash,
        role: data.role,
        avatar: None,
        is_verified: false,
        verification_token: data.verification_token,
        verification_expire: data.verification_expire,
        reset_password_token: None,
        reset_password_expire: None,
        created_at: Utc::now(),
    };
    store.insert_user(user.clone())?;
    Ok(user)
}

pub async fn get_user_by_id(store: &Store, user_id: Uuid) -> Option<User> {
    store.get_user(user_id)
}

pub async fn find_by_email(store: &Store, email: &str) -> Option<User> {
    store.find_user_by_email(email)
}

pub async fn find_by_verification_token(store: &Store, token: &str) -> Option<User> {
    store
        .users()
        .into_iter()
        .find(|u| u.verification_token.as_deref() == Some(token))
}

pub async fn mark_verified(store: &Store, user_id: Uuid) -> Option<User> {
    store.update_user(user_id, |user| {
        user.is_verified = true;
        user.verification_token = None;
        user.verification_expire = None;
    })
}

pub async fn set_reset_token(
    store: &Store,
    user_id: Uuid,
    token: String,
    expire: DateTime<Utc>,
) -> Option<User> {
    store.update_user(user_id, |user| {
        user.reset_password_token = Some(token);
        user.reset_password_expire = Some(expire);
    })
}

pub async fn find_by_reset_token(store: &Store, token: &str) -> Option<User> {
    store
        .users()
        .into_iter()
        .find(|u| u.reset_password_token.as_deref() == Some(token))
}

/// Sets a new password hash and clears any outstanding reset token.
pub async fn update_password(store: &Store, user_id: Uuid, password_hash: String) -> Option<User> {
    store.update_user(user_id, |user| {
        user.password = password_hash;
        user.reset_password_token = None;
        user.reset_password_expire = None;
    })
}
