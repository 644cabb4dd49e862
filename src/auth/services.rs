use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::jwt::JwtKeys;
use super::password::{
    check_password_policy, hash_password, is_valid_email, normalize_email, verify_password,
};
use super::repo_types::{PasswordResetToken, User};
use crate::config::PasswordResetConfig;
use crate::error::ApiError;
use crate::reservations::StoreError;

pub const SIGNUP_MESSAGE: &str = "Signup completed successfully.";
pub const RESET_REQUESTED_MESSAGE: &str =
    "If your account exists, a password reset link has been generated.";
pub const RESET_DONE_MESSAGE: &str = "Password reset successfully.";

const UNIQUE_VIOLATION: &str = "23505";
const RESET_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Invalid credentials.")]
    InvalidCredentials,
    #[error("Email is already registered.")]
    EmailTaken,
    #[error("{0}")]
    Unauthorized(String),
    #[error("Reset token is invalid.")]
    InvalidResetToken,
    #[error("Reset token is expired or already used.")]
    ExpiredResetToken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidInput(_) | AuthError::InvalidResetToken => {
                ApiError::BadRequest(e.to_string())
            }
            AuthError::InvalidCredentials | AuthError::Unauthorized(_) => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::EmailTaken => ApiError::Conflict(e.to_string()),
            AuthError::ExpiredResetToken => ApiError::Gone(e.to_string()),
            AuthError::Database(db) => ApiError::from(StoreError::Backend(db)),
            AuthError::Internal(inner) => ApiError::Internal(inner),
        }
    }
}

/// Issued access/refresh pair for a user.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Raw reset tokens are random and never stored; lookups go through this digest.
pub fn hash_reset_token(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.trim().as_bytes()))
}

pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Validates signup input. Returns the normalized email.
pub fn validate_signup(email: &str, password: &str) -> Result<String, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AuthError::InvalidInput("Email is required.".into()));
    }
    if !is_valid_email(&email) {
        return Err(AuthError::InvalidInput("Email format is invalid.".into()));
    }
    check_password_policy(password).map_err(|m| AuthError::InvalidInput(m.into()))?;
    Ok(email)
}

#[instrument(skip(db, password))]
pub async fn signup(db: &PgPool, email: &str, password: &str) -> Result<User, AuthError> {
    let email = validate_signup(email, password)?;

    if User::find_by_email(db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AuthError::EmailTaken);
    }

    let hash = hash_password(password)?;
    let user = User::create(db, &email, &hash).await.map_err(|e| match &e {
        sqlx::Error::Database(d) if d.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AuthError::EmailTaken
        }
        _ => AuthError::Database(e),
    })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

fn issue_pair(keys: &JwtKeys, user: User) -> Result<TokenPair, AuthError> {
    let access_token = keys.sign_access(user.id, &user.email).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        AuthError::Internal(e)
    })?;
    let refresh_token = keys.sign_refresh(user.id, &user.email).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        AuthError::Internal(e)
    })?;
    Ok(TokenPair {
        access_token,
        refresh_token,
        user,
    })
}

#[instrument(skip(db, keys, password))]
pub async fn login(
    db: &PgPool,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<TokenPair, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() || password.trim().is_empty() {
        return Err(AuthError::InvalidInput(
            "Email and password are required.".into(),
        ));
    }

    let Some(user) = User::find_by_email(db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    issue_pair(keys, user)
}

#[instrument(skip(db, keys, refresh_token))]
pub async fn refresh(db: &PgPool, keys: &JwtKeys, refresh_token: &str) -> Result<TokenPair, AuthError> {
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AuthError::Unauthorized("Invalid or expired refresh token.".into())
    })?;

    let user = User::find_by_id(db, claims.sub)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found.".into()))?;
    issue_pair(keys, user)
}

pub async fn current_user(db: &PgPool, user_id: Uuid) -> Result<User, AuthError> {
    User::find_by_id(db, user_id)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("User not found.".into()))
}

/// Creates a reset token when the account exists. The answer never reveals whether it does.
#[instrument(skip(db, cfg))]
pub async fn request_password_reset(
    db: &PgPool,
    cfg: &PasswordResetConfig,
    email: &str,
) -> Result<Option<String>, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Ok(None);
    }
    let Some(user) = User::find_by_email(db, &email).await? else {
        info!("password reset requested for unknown email");
        return Ok(None);
    };

    let raw = generate_reset_token();
    let expires_at = OffsetDateTime::now_utc() + TimeDuration::seconds(cfg.token_ttl_seconds);
    PasswordResetToken::insert(db, user.id, &hash_reset_token(&raw), expires_at).await?;
    info!(user_id = %user.id, "password reset token issued");

    Ok(cfg.expose_token.then_some(raw))
}

#[instrument(skip_all)]
pub async fn reset_password(db: &PgPool, raw_token: &str, new_password: &str) -> Result<(), AuthError> {
    let raw_token = raw_token.trim();
    if raw_token.is_empty() {
        return Err(AuthError::InvalidInput("Reset token is required.".into()));
    }
    check_password_policy(new_password).map_err(|m| AuthError::InvalidInput(m.into()))?;

    let token = PasswordResetToken::find_by_hash(db, &hash_reset_token(raw_token))
        .await?
        .ok_or(AuthError::InvalidResetToken)?;

    let now = OffsetDateTime::now_utc();
    if !token.is_usable_at(now) {
        warn!(
            token_id = %token.id,
            issued_at = %token.created_at,
            used = token.used_at.is_some(),
            "reset token expired or used"
        );
        return Err(AuthError::ExpiredResetToken);
    }

    let hash = hash_password(new_password)?;
    let mut tx = db.begin().await?;
    if !PasswordResetToken::consume_tx(&mut tx, token.id, now).await? {
        return Err(AuthError::ExpiredResetToken);
    }
    User::update_password_hash_tx(&mut tx, token.user_id, &hash).await?;
    tx.commit().await?;

    info!(user_id = %token.user_id, "password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn reset_token_hash_is_stable_hex_sha256() {
        let h = hash_reset_token("abc");
        assert_eq!(h, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(hash_reset_token("  abc \n"), h);
    }

    #[test]
    fn generated_tokens_are_random_and_url_safe() {
        let a = generate_reset_token();
        let b = generate_reset_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn signup_validation_order() {
        let msg = |r: Result<String, AuthError>| r.unwrap_err().to_string();
        assert_eq!(msg(validate_signup("   ", "ChangeMe123")), "Email is required.");
        assert_eq!(msg(validate_signup("nope", "ChangeMe123")), "Email format is invalid.");
        assert_eq!(
            msg(validate_signup("a@b.test", "short1")),
            "Password must be at least 8 characters long."
        );
        assert_eq!(
            validate_signup(" Employee@Company.test ", "ChangeMe123").unwrap(),
            "employee@company.test"
        );
    }

    #[test]
    fn auth_errors_map_to_http_statuses() {
        let status = |e: AuthError| ApiError::from(e).status();
        assert_eq!(status(AuthError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::EmailTaken), StatusCode::CONFLICT);
        assert_eq!(status(AuthError::InvalidResetToken), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::ExpiredResetToken), StatusCode::GONE);
        assert_eq!(
            status(AuthError::Database(sqlx::Error::PoolTimedOut)),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn reset_rejects_blank_token_and_weak_password_before_touching_db() {
        // Lazy pool is never connected; both checks happen before any query.
        let (state, _store) = crate::state::AppState::fake();
        let err = reset_password(&state.db, "  ", "ChangeMe123").await.unwrap_err();
        assert_eq!(err.to_string(), "Reset token is required.");
        let err = reset_password(&state.db, "token", "weak").await.unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters long.");
    }

    #[tokio::test]
    async fn login_requires_both_fields_before_touching_db() {
        let (state, _store) = crate::state::AppState::fake();
        let keys = JwtKeys::from(&state.config.jwt);
        let err = login(&state.db, &keys, " ", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Email and password are required.");
        let err = login(&state.db, &keys, "a@b.test", "   ").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn forgot_password_with_blank_email_is_silent() {
        let (state, _store) = crate::state::AppState::fake();
        let token = request_password_reset(&state.db, &state.config.password_reset, "   ")
            .await
            .unwrap();
        assert!(token.is_none());
    }
}
