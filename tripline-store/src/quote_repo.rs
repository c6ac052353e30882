use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tripline_core::error::StoreError;
use tripline_core::quote::Quote;
use tripline_core::repository::QuoteRepository;

pub struct PgQuoteRepository {
    pool: PgPool,
}

impl PgQuoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct QuoteRow {
    id: Uuid,
    trip_id: Uuid,
    driver_email: String,
    price: f64,
    currency: String,
    submitted_at: DateTime<Utc>,
}

impl QuoteRow {
    fn into_quote(self) -> Quote {
        Quote {
            id: self.id,
            trip_id: self.trip_id,
            driver_email: self.driver_email,
            price: self.price,
            currency: self.currency,
            submitted_at: self.submitted_at,
        }
    }
}

const QUOTE_COLUMNS: &str = "id, trip_id, driver_email, price, currency, submitted_at";

#[async_trait]
impl QuoteRepository for PgQuoteRepository {
    async fn upsert_quote(&self, quote: &Quote) -> Result<Quote, StoreError> {
        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            r#"
            INSERT INTO quotes (id, trip_id, driver_email, price, currency, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (trip_id, driver_email)
            DO UPDATE SET price = EXCLUDED.price, currency = EXCLUDED.currency, submitted_at = EXCLUDED.submitted_at
            RETURNING {}
            "#,
            QUOTE_COLUMNS
        ))
        .bind(quote.id)
        .bind(quote.trip_id)
        .bind(&quote.driver_email)
        .bind(quote.price)
        .bind(&quote.currency)
        .bind(quote.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::database)?;

        Ok(row.into_quote())
    }

    async fn quotes_for_trip(&self, trip_id: Uuid) -> Result<Vec<Quote>, StoreError> {
        let rows = sqlx::query_as::<_, QuoteRow>(&format!(
            "SELECT {} FROM quotes WHERE trip_id = $1 ORDER BY submitted_at DESC",
            QUOTE_COLUMNS
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::database)?;

        Ok(rows.into_iter().map(QuoteRow::into_quote).collect())
    }

    async fn quote_for_driver(
        &self,
        trip_id: Uuid,
        driver_email: &str,
    ) -> Result<Option<Quote>, StoreError> {
        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            "SELECT {} FROM quotes WHERE trip_id = $1 AND driver_email = $2",
            QUOTE_COLUMNS
        ))
        .bind(trip_id)
        .bind(driver_email)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database)?;

        Ok(row.map(QuoteRow::into_quote))
    }
}
