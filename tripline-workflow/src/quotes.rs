use std::sync::Arc;
use uuid::Uuid;

use tripline_core::email;
use tripline_core::error::{WorkflowError, WorkflowResult};
use tripline_core::quote::{Quote, QUOTE_CURRENCIES};
use tripline_core::repository::QuoteRepository;

/// Per-trip price submissions, one row per (trip, driver).
pub struct QuoteRegistry {
    quotes: Arc<dyn QuoteRepository>,
}

impl QuoteRegistry {
    pub fn new(quotes: Arc<dyn QuoteRepository>) -> Self {
        Self { quotes }
    }

    /// Validate and upsert. A second submission from the same driver for the
    /// same trip updates price/currency in place.
    pub async fn submit(
        &self,
        trip_id: Uuid,
        driver_email: &str,
        price: f64,
        currency: &str,
    ) -> WorkflowResult<Quote> {
        let driver_email = email::normalize(driver_email);
        if !email::is_valid(&driver_email) {
            return Err(WorkflowError::Validation(format!(
                "Invalid driver email: {}",
                driver_email
            )));
        }
        if !(price > 0.0) || !price.is_finite() {
            return Err(WorkflowError::Validation(
                "Price must be greater than zero".to_string(),
            ));
        }
        let currency = currency.trim().to_uppercase();
        if !QUOTE_CURRENCIES.contains(&currency.as_str()) {
            return Err(WorkflowError::Validation(format!(
                "Unsupported currency: {}",
                currency
            )));
        }

        let quote = Quote::new(trip_id, driver_email, price, currency);
        let stored = self.quotes.upsert_quote(&quote).await?;
        tracing::info!(trip_id = %trip_id, quote_id = %stored.id, "Quote recorded");
        Ok(stored)
    }

    /// Owner view (no requesting driver): every quote for the trip, newest
    /// first. Driver view: restricted to the requesting driver's own row.
    pub async fn list_for(
        &self,
        trip_id: Uuid,
        requesting_driver: Option<&str>,
    ) -> WorkflowResult<Vec<Quote>> {
        match requesting_driver {
            Some(raw) => {
                let driver_email = email::normalize(raw);
                Ok(self
                    .quotes
                    .quote_for_driver(trip_id, &driver_email)
                    .await?
                    .into_iter()
                    .collect())
            }
            None => Ok(self.quotes.quotes_for_trip(trip_id).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripline_store::memory::MemoryStore;

    fn registry() -> QuoteRegistry {
        QuoteRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_submit_validates_input() {
        let registry = registry();
        let trip_id = Uuid::new_v4();

        let result = registry.submit(trip_id, "d@x.com", 0.0, "EUR").await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let result = registry.submit(trip_id, "d@x.com", -5.0, "EUR").await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let result = registry.submit(trip_id, "d@x.com", 100.0, "JPY").await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let result = registry.submit(trip_id, "not-an-email", 100.0, "EUR").await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    #[tokio::test]
    async fn test_resubmission_upserts() {
        let registry = registry();
        let trip_id = Uuid::new_v4();

        registry.submit(trip_id, "d@x.com", 150.0, "EUR").await.unwrap();
        registry.submit(trip_id, " D@X.com ", 175.0, "eur").await.unwrap();

        let all = registry.list_for(trip_id, None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].price, 175.0);
        assert_eq!(all[0].currency, "EUR");
    }

    #[tokio::test]
    async fn test_driver_view_is_restricted() {
        let registry = registry();
        let trip_id = Uuid::new_v4();

        registry.submit(trip_id, "a@x.com", 100.0, "EUR").await.unwrap();
        registry.submit(trip_id, "b@y.com", 120.0, "USD").await.unwrap();

        let own = registry.list_for(trip_id, Some("a@x.com")).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].driver_email, "a@x.com");

        let all = registry.list_for(trip_id, None).await.unwrap();
        assert_eq!(all.len(), 2);
        // Newest first for the owner view.
        assert_eq!(all[0].driver_email, "b@y.com");
    }
}
