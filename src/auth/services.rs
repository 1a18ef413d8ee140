use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{User, UserRole};
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Register a new user: reject duplicate usernames, hash the password,
/// persist. No password-strength policy beyond non-empty.
pub async fn register(
    db: &PgPool,
    username: &str,
    password: &str,
    role: UserRole,
) -> Result<User, ApiError> {
    if User::exists_by_username(db, username).await? {
        return Err(ApiError::DuplicateUsername(username.to_string()));
    }

    let hash = hash_password(password)?;
    let user = User::create(db, username, &hash, role).await?;
    info!(user_id = %user.id, username = %user.username, role = ?user.role, "user registered");
    Ok(user)
}

/// Authenticate a login attempt against the stored hash.
pub async fn login(db: &PgPool, username: &str, password: &str) -> Result<User, ApiError> {
    let user = find_by_username(db, username).await?;
    if !verify_password(password, &user.password_hash)? {
        return Err(ApiError::InvalidCredentials);
    }
    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(user)
}

pub async fn find_by_username(db: &PgPool, username: &str) -> Result<User, ApiError> {
    User::find_by_username(db, username)
        .await?
        .ok_or(ApiError::UserNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_email() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("dr.bob+clinic@hospital.org"));
    }

    #[test]
    fn rejects_non_email_usernames() {
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("alice@x"));
    }
}
