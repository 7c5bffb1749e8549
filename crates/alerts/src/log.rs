use async_trait::async_trait;
use tracing::info;

use common::{NotificationMessage, NotificationSink, Result};

/// Writes alerts to the tracing log. Used when no chat sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<()> {
        info!(title = %message.title, "Alert");
        for line in message.body.lines() {
            info!("  {line}");
        }
        for (name, value) in &message.fields {
            info!("  {name}: {value}");
        }
        Ok(())
    }
}
