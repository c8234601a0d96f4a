use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::repository::{AuthTokens, StorageError, TokenStore};

use super::SqliteRepository;

#[async_trait]
impl TokenStore for SqliteRepository {
    async fn load_tokens(&self) -> Result<Option<AuthTokens>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT access_token, refresh_token, saved_at
            FROM auth_tokens
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let access: String = row
            .try_get("access_token")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let refresh: Option<String> = row
            .try_get("refresh_token")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let saved_at: String = row
            .try_get("saved_at")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let saved_at = DateTime::parse_from_rfc3339(&saved_at)
            .map_err(|err| StorageError::Serialization(err.to_string()))?
            .with_timezone(&Utc);

        Ok(Some(AuthTokens {
            access,
            refresh,
            saved_at,
        }))
    }

    async fn save_tokens(&self, tokens: &AuthTokens) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO auth_tokens (id, access_token, refresh_token, saved_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                saved_at = excluded.saved_at
            ",
        )
        .bind(1_i64)
        .bind(&tokens.access)
        .bind(tokens.refresh.as_deref())
        .bind(tokens.saved_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }

    async fn clear_tokens(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM auth_tokens WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
