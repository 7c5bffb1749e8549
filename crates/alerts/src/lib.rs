//! Notification sinks and alert formatting.

pub mod discord;
pub mod fanout;
pub mod format;
pub mod log;
pub mod split;
pub mod telegram;

pub use discord::DiscordWebhookSink;
pub use fanout::FanoutSink;
pub use log::LogSink;
pub use split::split_body;
pub use telegram::TelegramSink;
