use async_trait::async_trait;
use tracing::warn;

use common::{Error, NotificationMessage, NotificationSink, Result};

/// Delivers each message to every inner sink in order.
///
/// Succeeds when at least one sink accepted the message.
pub struct FanoutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<()> {
        let mut errors = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(message).await {
                warn!(title = %message.title, error = %e, "Sink delivery failed");
                errors.push(e.to_string());
            }
        }
        if !self.sinks.is_empty() && errors.len() == self.sinks.len() {
            return Err(Error::NotificationDelivery(errors.join("; ")));
        }
        Ok(())
    }
}
