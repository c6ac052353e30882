use async_trait::async_trait;

use crate::error::NotifyError;

/// Outbound message sender. Best-effort: callers decide whether a dispatch
/// failure is advisory (logged, attached as a warning) or fatal (the
/// link-resend path, where delivery is the whole point of the call).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;
}
