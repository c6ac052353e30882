use async_trait::async_trait;
use tracing::info;

use tripline_core::error::NotifyError;
use tripline_core::notify::NotificationDispatcher;

/// Logs outbound messages instead of delivering them. Stands in for the real
/// delivery service in development and in tests.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        info!(to = %to, subject = %subject, "Dispatching notification");
        Ok(())
    }
}
