use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tripline_core::error::StoreError;
use tripline_core::repository::TokenRepository;
use tripline_core::token::{DriverToken, InvalidationReason};

pub struct PgTokenRepository {
    pool: PgPool,
}

impl PgTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    trip_id: Uuid,
    driver_email: String,
    token: String,
    expires_at: DateTime<Utc>,
    used: bool,
    used_at: Option<DateTime<Utc>>,
    invalidated_at: Option<DateTime<Utc>>,
    invalidation_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TokenRow {
    fn into_token(self) -> Result<DriverToken, StoreError> {
        let invalidation_reason = self
            .invalidation_reason
            .as_deref()
            .map(|raw| {
                InvalidationReason::parse(raw).ok_or_else(|| {
                    StoreError::decode(format!("unknown invalidation reason {}", raw))
                })
            })
            .transpose()?;
        Ok(DriverToken {
            id: self.id,
            trip_id: self.trip_id,
            driver_email: self.driver_email,
            token: self.token,
            expires_at: self.expires_at,
            used: self.used,
            used_at: self.used_at,
            invalidated_at: self.invalidated_at,
            invalidation_reason,
            created_at: self.created_at,
        })
    }
}

const TOKEN_COLUMNS: &str = "id, trip_id, driver_email, token, expires_at, used, used_at, invalidated_at, invalidation_reason, created_at";

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn insert_token(&self, token: &DriverToken) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO driver_tokens (id, trip_id, driver_email, token, expires_at, used, used_at, invalidated_at, invalidation_reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(token.id)
        .bind(token.trip_id)
        .bind(&token.driver_email)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.used)
        .bind(token.used_at)
        .bind(token.invalidated_at)
        .bind(token.invalidation_reason.map(|r| r.as_str()))
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;
        Ok(())
    }

    async fn find_token(
        &self,
        trip_id: Uuid,
        token_value: &str,
    ) -> Result<Option<DriverToken>, StoreError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {} FROM driver_tokens WHERE trip_id = $1 AND token = $2",
            TOKEN_COLUMNS
        ))
        .bind(trip_id)
        .bind(token_value)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database)?;

        row.map(TokenRow::into_token).transpose()
    }

    async fn tokens_for_driver(
        &self,
        trip_id: Uuid,
        driver_email: &str,
    ) -> Result<Vec<DriverToken>, StoreError> {
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {} FROM driver_tokens WHERE trip_id = $1 AND driver_email = $2 ORDER BY created_at ASC",
            TOKEN_COLUMNS
        ))
        .bind(trip_id)
        .bind(driver_email)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database)?;

        rows.into_iter().map(TokenRow::into_token).collect()
    }

    async fn invalidate_live(
        &self,
        trip_id: Uuid,
        driver_email: &str,
        reason: InvalidationReason,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        // Conditional on the row still being live so a raced consume or a
        // second invalidation never overwrites the first stamp.
        let result = sqlx::query(
            "UPDATE driver_tokens SET invalidated_at = $1, invalidation_reason = $2 \
             WHERE trip_id = $3 AND driver_email = $4 AND used = FALSE AND invalidated_at IS NULL",
        )
        .bind(at)
        .bind(reason.as_str())
        .bind(trip_id)
        .bind(driver_email)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;

        Ok(result.rows_affected())
    }

    async fn consume(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        // Compare-and-set: at most one of two concurrent consumers matches
        // the used = FALSE predicate.
        let result = sqlx::query(
            "UPDATE driver_tokens SET used = TRUE, used_at = $1 WHERE id = $2 AND used = FALSE",
        )
        .bind(at)
        .bind(token_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;

        Ok(result.rows_affected() == 1)
    }
}
