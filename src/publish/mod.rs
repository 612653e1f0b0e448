//! Result publication
//!
//! A [`Broadcaster`] persists each finished index result (when a store is
//! configured) and then sends a rendered summary over every notification
//! channel. Store and channel failures are logged and reported, never
//! propagated.

pub mod channels;
pub mod store;
pub mod summary;

pub use channels::LogChannel;
#[cfg(feature = "email")]
pub use channels::EmailChannel;
#[cfg(feature = "http")]
pub use channels::{DiscordChannel, TelegramChannel};
pub use store::ResultStore;
#[cfg(feature = "rusqlite-support")]
pub use store::SqliteResultStore;
pub use summary::{
    error_subject, forecast_line, render_error, render_subject, render_summary, split_message, SummaryStyle,
};

use crate::config::PublishConfig;
use crate::error::{PotentialError, Result};
use crate::ranking::IndexResult;
use serde::Serialize;

/// One delivery target for human-readable messages
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    fn style(&self) -> SummaryStyle;

    /// Longest message the channel accepts, in characters
    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn send(&self, message: &str) -> Result<()>;

    /// Send with a subject line; channels without one ignore it
    fn send_titled(&self, _subject: &str, message: &str) -> Result<()> {
        self.send(message)
    }
}

/// Outcome of one publication
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PublishReport {
    /// Id of the stored record, if persistence succeeded
    pub stored: Option<i64>,
    /// Channels that accepted every chunk
    pub delivered: Vec<String>,
    /// `(target, error message)` for each failed store or channel
    pub failed: Vec<(String, String)>,
}

impl PublishReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Receiver of finished index results
pub trait ResultPublisher {
    fn publish(&self, index_name: &str, result: &IndexResult) -> PublishReport;

    /// Broadcast a run-level failure
    fn notify_error(&self, message: &str) -> PublishReport;
}

/// Optional store plus ordered notification channels
#[derive(Default)]
pub struct Broadcaster {
    store: Option<Box<dyn ResultStore>>,
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Box<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_channel(mut self, channel: Box<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Build the store and channels a validated configuration asks for
    pub fn from_config(config: &PublishConfig) -> Result<Self> {
        let mut broadcaster = Self::new();
        if let Some(store) = configured_store(config)? {
            broadcaster = broadcaster.with_store(store);
        }
        for channel in configured_channels(config) {
            broadcaster = broadcaster.with_channel(channel?);
        }
        Ok(broadcaster)
    }

    /// Build whatever parts of `config` can be built, skipping the rest.
    /// Used to report failures that happen before a run can start.
    pub fn best_effort(config: &PublishConfig) -> Self {
        let mut broadcaster = Self::new();
        match configured_store(config) {
            Ok(Some(store)) => broadcaster = broadcaster.with_store(store),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping result store: {}", e),
        }
        for channel in configured_channels(config) {
            match channel {
                Ok(channel) => broadcaster = broadcaster.with_channel(channel),
                Err(e) => log::warn!("Skipping notification channel: {}", e),
            }
        }
        broadcaster
    }

    fn broadcast<F>(&self, report: &mut PublishReport, subject: &str, render: F)
    where
        F: Fn(SummaryStyle) -> String,
    {
        for channel in &self.channels {
            let message = render(channel.style());
            let outcome = split_message(&message, channel.max_len())
                .iter()
                .try_for_each(|chunk| channel.send_titled(subject, chunk));

            match outcome {
                Ok(()) => report.delivered.push(channel.name().to_string()),
                Err(e) => {
                    log::warn!("Failed to notify {}: {}", channel.name(), e);
                    report.failed.push((channel.name().to_string(), e.to_string()));
                }
            }
        }
    }
}

impl ResultPublisher for Broadcaster {
    fn publish(&self, index_name: &str, result: &IndexResult) -> PublishReport {
        log::info!("Publishing results for {}", index_name);
        let mut report = PublishReport::default();

        if let Some(store) = &self.store {
            match store.save(index_name, result) {
                Ok(id) => report.stored = Some(id),
                Err(e) => {
                    log::warn!("Failed to store {} in {}: {}", index_name, store.name(), e);
                    report.failed.push((store.name().to_string(), e.to_string()));
                }
            }
        }

        let subject = render_subject(index_name, result.computed_at);
        self.broadcast(&mut report, &subject, |style| render_summary(index_name, result, style));
        report
    }

    fn notify_error(&self, message: &str) -> PublishReport {
        log::error!("Run failed: {}", message);
        let mut report = PublishReport::default();
        self.broadcast(&mut report, &error_subject(), |style| render_error(message, style));
        report
    }
}

fn configured_store(config: &PublishConfig) -> Result<Option<Box<dyn ResultStore>>> {
    let Some(path) = &config.store_path else {
        return Ok(None);
    };
    #[cfg(feature = "rusqlite-support")]
    {
        Ok(Some(Box::new(SqliteResultStore::open(path)?)))
    }
    #[cfg(not(feature = "rusqlite-support"))]
    {
        Err(PotentialError::FatalConfiguration(format!(
            "store_path {} requires the rusqlite-support feature",
            path.display()
        )))
    }
}

/// Channels in delivery order: log, telegram, discord, email
fn configured_channels(config: &PublishConfig) -> Vec<Result<Box<dyn NotificationChannel>>> {
    let mut channels: Vec<Result<Box<dyn NotificationChannel>>> = Vec::new();

    if config.log {
        channels.push(Ok(Box::new(LogChannel)));
    }

    if config.telegram.enabled {
        channels.push(match (&config.telegram.bot_token, &config.telegram.channel_id) {
            (Some(token), Some(channel_id)) => http_channel::telegram(token, channel_id),
            _ => Err(PotentialError::FatalConfiguration(
                "telegram enabled without credentials".to_string(),
            )),
        });
    }

    if config.discord.enabled {
        channels.push(match &config.discord.webhook_url {
            Some(url) => http_channel::discord(url),
            None => Err(PotentialError::FatalConfiguration(
                "discord enabled without webhook url".to_string(),
            )),
        });
    }

    if config.email.enabled {
        channels.push(email_channel::build(&config.email));
    }
    channels
}

#[cfg(feature = "email")]
mod email_channel {
    use super::{EmailChannel, NotificationChannel};
    use crate::config::EmailConfig;
    use crate::error::{PotentialError, Result};

    pub fn build(config: &EmailConfig) -> Result<Box<dyn NotificationChannel>> {
        let (Some(server), Some(sender), Some(password)) = (&config.smtp_server, &config.sender, &config.password)
        else {
            return Err(PotentialError::FatalConfiguration(
                "email enabled without SMTP credentials".to_string(),
            ));
        };
        Ok(Box::new(EmailChannel::new(
            server,
            config.smtp_port,
            sender,
            password,
            &config.recipients,
        )?))
    }
}

#[cfg(not(feature = "email"))]
mod email_channel {
    use super::NotificationChannel;
    use crate::config::EmailConfig;
    use crate::error::{PotentialError, Result};

    pub fn build(_config: &EmailConfig) -> Result<Box<dyn NotificationChannel>> {
        Err(PotentialError::FatalConfiguration(
            "email channel requires the email feature".to_string(),
        ))
    }
}

#[cfg(feature = "http")]
mod http_channel {
    use super::{DiscordChannel, NotificationChannel, TelegramChannel};
    use crate::error::Result;

    pub fn telegram(token: &str, channel_id: &str) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(TelegramChannel::new(token, channel_id)?))
    }

    pub fn discord(url: &str) -> Result<Box<dyn NotificationChannel>> {
        Ok(Box::new(DiscordChannel::new(url)?))
    }
}

#[cfg(not(feature = "http"))]
mod http_channel {
    use super::NotificationChannel;
    use crate::error::{PotentialError, Result};

    fn unavailable(name: &str) -> PotentialError {
        PotentialError::FatalConfiguration(format!("{} channel requires the http feature", name))
    }

    pub fn telegram(_token: &str, _channel_id: &str) -> Result<Box<dyn NotificationChannel>> {
        Err(unavailable("telegram"))
    }

    pub fn discord(_url: &str) -> Result<Box<dyn NotificationChannel>> {
        Err(unavailable("discord"))
    }
}
