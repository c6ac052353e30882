use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Currencies a driver may quote in.
pub const QUOTE_CURRENCIES: &[&str] = &["EUR", "USD", "GBP", "CHF"];

/// A driver's proposed price for a trip. One row per (trip, driver);
/// resubmission updates the existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub driver_email: String,
    pub price: f64,
    pub currency: String,
    pub submitted_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(trip_id: Uuid, driver_email: String, price: f64, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            driver_email,
            price,
            currency,
            submitted_at: Utc::now(),
        }
    }
}
