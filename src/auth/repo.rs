use sqlx::{PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{PasswordResetToken, User};

impl User {
    /// Find a user by (normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &PgPool, email: &str, password_hash: &str) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn update_password_hash_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        password_hash: &str,
    ) -> sqlx::Result<()> {
        sqlx::query(r#"UPDATE users SET password_hash = $2 WHERE id = $1"#)
            .bind(id)
            .bind(password_hash)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

impl PasswordResetToken {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> sqlx::Result<PasswordResetToken> {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, expires_at, used_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_hash(db: &PgPool, token_hash: &str) -> sqlx::Result<Option<PasswordResetToken>> {
        sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT id, user_id, expires_at, used_at, created_at
              FROM password_reset_tokens
             WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await
    }

    /// Marks the token used. Returns false if it was consumed or expired in the meantime.
    pub async fn consume_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        now: OffsetDateTime,
    ) -> sqlx::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE password_reset_tokens
               SET used_at = $2
             WHERE id = $1
               AND used_at IS NULL
               AND expires_at > $2
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut **tx)
        .await?;
        Ok(res.rows_affected() == 1)
    }
}
