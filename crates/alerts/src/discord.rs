use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use common::{Error, NotificationMessage, NotificationSink, Result};

use crate::split::split_body;

/// Embed description limit enforced by Discord.
pub const DISCORD_DESCRIPTION_MAX: usize = 4096;
/// Embed field count limit enforced by Discord.
const DISCORD_FIELDS_MAX: usize = 25;
/// Spacing between the parts of one split message.
pub const DEFAULT_PART_DELAY: Duration = Duration::from_secs(1);
/// Longest rate-limit wait honored before the retry.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Posts messages to a Discord channel webhook as embeds.
///
/// Parts of a split message are spaced by `part_delay`. An HTTP 429 is
/// retried once after the advertised `retry_after`.
pub struct DiscordWebhookSink {
    url: String,
    http: Client,
    part_delay: Duration,
}

impl DiscordWebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            http,
            part_delay: DEFAULT_PART_DELAY,
        })
    }

    pub fn with_part_delay(mut self, delay: Duration) -> Self {
        self.part_delay = delay;
        self
    }

    async fn post(&self, payload: &WebhookPayload<'_>) -> Result<()> {
        let resp = self.send(payload).await?;
        if resp.status() != StatusCode::TOO_MANY_REQUESTS {
            return check(resp).await;
        }
        let wait = retry_after(resp).await;
        warn!(wait_ms = wait.as_millis() as u64, "Discord webhook rate limited, retrying once");
        tokio::time::sleep(wait).await;
        check(self.send(payload).await?).await
    }

    async fn send(&self, payload: &WebhookPayload<'_>) -> Result<Response> {
        self.http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::NotificationDelivery(format!("webhook request failed: {e}")))
    }
}

async fn check(resp: Response) -> Result<()> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::NotificationDelivery(format!(
            "webhook returned HTTP {status}: {body}"
        )));
    }
    Ok(())
}

/// Wait advertised by a 429: the `Retry-After` header, else the JSON
/// `retry_after` field (seconds, fractional), else one second.
async fn retry_after(resp: Response) -> Duration {
    let header = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok());
    let secs = match header {
        Some(secs) => secs,
        None => resp
            .json::<RateLimited>()
            .await
            .map(|r| r.retry_after)
            .unwrap_or(1.0),
    };
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64()))
    } else {
        Duration::ZERO
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    async fn deliver(&self, message: &NotificationMessage) -> Result<()> {
        let chunks = split_body(&message.body, DISCORD_DESCRIPTION_MAX);
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.part_delay).await;
            }
            let payload = WebhookPayload {
                embeds: vec![embed_for(message, chunk, i, last)],
            };
            debug!(title = %message.title, part = i + 1, parts = last + 1, "Posting Discord embed");
            self.post(&payload).await?;
        }
        Ok(())
    }
}

/// Title goes on the first part; fields, footer and timestamp on the last.
fn embed_for<'a>(message: &'a NotificationMessage, chunk: &'a str, i: usize, last: usize) -> Embed<'a> {
    let title = if i == 0 {
        truncate(&message.title, 256)
    } else {
        format!("{} ({}/{})", truncate(&message.title, 240), i + 1, last + 1)
    };
    let (fields, footer, timestamp) = if i == last {
        (
            message
                .fields
                .iter()
                .take(DISCORD_FIELDS_MAX)
                .map(|(name, value)| EmbedField {
                    name,
                    value,
                    inline: true,
                })
                .collect(),
            message.footer.as_deref().map(|text| EmbedFooter { text }),
            message.timestamp.map(|t| t.to_rfc3339()),
        )
    } else {
        (Vec::new(), None, None)
    };

    Embed {
        title,
        description: chunk,
        color: message.color,
        fields,
        footer,
        timestamp,
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ─── Request types ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WebhookPayload<'a> {
    embeds: Vec<Embed<'a>>,
}

#[derive(Serialize)]
struct Embed<'a> {
    title: String,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Serialize)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
    inline: bool,
}

#[derive(Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RateLimited {
    retry_after: f64,
}
