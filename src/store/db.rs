//! PostgreSQL-backed token store for the Jobber connection.
//!
//! One table, `jobber_tokens`, constrained to a single row (`id = 1`).
//! Writes are upserts so a new token set always replaces the old one.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{TokenRecord, TokenRepository};
use crate::error::AppError;

/// Token store backed by PostgreSQL.
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub async fn new(db_url: &str) -> Result<Self, AppError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to PostgreSQL: {e}")))?;

        Ok(Self { pool })
    }

    /// Run schema migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobber_tokens (
                id              INTEGER PRIMARY KEY DEFAULT 1,
                access_token    TEXT NOT NULL,
                refresh_token   TEXT NOT NULL,
                expires_at      BIGINT NOT NULL,
                created_at      TIMESTAMP DEFAULT NOW(),
                updated_at      TIMESTAMP DEFAULT NOW(),
                CONSTRAINT single_row CHECK (id = 1)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TokenRepository for PgTokenStore {
    async fn load(&self) -> Result<Option<TokenRecord>, AppError> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token, expires_at FROM jobber_tokens WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| TokenRecord {
            access_token: row.get(0),
            refresh_token: row.get(1),
            expires_at: row.get(2),
        }))
    }

    async fn save(&self, record: &TokenRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO jobber_tokens (id, access_token, refresh_token, expires_at, updated_at)
            VALUES (1, $1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM jobber_tokens WHERE id = 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
