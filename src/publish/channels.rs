//! Notification channels

use super::summary::SummaryStyle;
use super::NotificationChannel;
use crate::error::Result;

/// Writes messages to the log at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    fn style(&self) -> SummaryStyle {
        SummaryStyle::Plain
    }

    fn send(&self, message: &str) -> Result<()> {
        for line in message.lines() {
            log::info!("{}", line);
        }
        Ok(())
    }
}

#[cfg(feature = "http")]
pub use http::{DiscordChannel, TelegramChannel};
#[cfg(feature = "email")]
pub use email::EmailChannel;

#[cfg(feature = "http")]
mod http {
    use super::super::summary::SummaryStyle;
    use super::super::NotificationChannel;
    use crate::error::{PotentialError, Result};
    use reqwest::blocking::Client;
    use serde::Serialize;
    use std::time::Duration;

    const TELEGRAM_API: &str = "https://api.telegram.org";
    const TELEGRAM_MAX_LEN: usize = 4096;
    const DISCORD_MAX_LEN: usize = 2000;

    fn client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PotentialError::FatalConfiguration(format!("Failed to create HTTP client: {}", e)))
    }

    fn check(channel: &str, response: reqwest::blocking::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        Err(PotentialError::Publish(format!("{} returned {}: {}", channel, status, body)))
    }

    #[derive(Serialize)]
    struct TelegramMessage<'a> {
        chat_id: &'a str,
        text: &'a str,
        parse_mode: &'a str,
    }

    /// Telegram bot channel, HTML formatted
    pub struct TelegramChannel {
        client: Client,
        api_base: String,
        bot_token: String,
        channel_id: String,
    }

    impl TelegramChannel {
        pub fn new(bot_token: impl Into<String>, channel_id: impl Into<String>) -> Result<Self> {
            Ok(Self {
                client: client()?,
                api_base: TELEGRAM_API.to_string(),
                bot_token: bot_token.into(),
                channel_id: channel_id.into(),
            })
        }

        pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
            self.api_base = api_base.into();
            self
        }

        fn endpoint(&self) -> String {
            format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
        }
    }

    impl NotificationChannel for TelegramChannel {
        fn name(&self) -> &str {
            "telegram"
        }

        fn style(&self) -> SummaryStyle {
            SummaryStyle::Html
        }

        fn max_len(&self) -> usize {
            TELEGRAM_MAX_LEN
        }

        fn send(&self, message: &str) -> Result<()> {
            let payload = TelegramMessage {
                chat_id: &self.channel_id,
                text: message,
                parse_mode: "HTML",
            };
            let response = self.client.post(self.endpoint()).json(&payload).send()?;
            check(self.name(), response)
        }
    }

    #[derive(Serialize)]
    struct DiscordMessage<'a> {
        content: &'a str,
    }

    /// Discord webhook channel, markdown formatted
    pub struct DiscordChannel {
        client: Client,
        webhook_url: String,
    }

    impl DiscordChannel {
        pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
            Ok(Self {
                client: client()?,
                webhook_url: webhook_url.into(),
            })
        }
    }

    impl NotificationChannel for DiscordChannel {
        fn name(&self) -> &str {
            "discord"
        }

        fn style(&self) -> SummaryStyle {
            SummaryStyle::Markdown
        }

        fn max_len(&self) -> usize {
            DISCORD_MAX_LEN
        }

        fn send(&self, message: &str) -> Result<()> {
            let response = self
                .client
                .post(&self.webhook_url)
                .json(&DiscordMessage { content: message })
                .send()?;
            check(self.name(), response)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_telegram_endpoint() {
            let channel = TelegramChannel::new("123:abc", "@potential")
                .unwrap()
                .with_api_base("http://localhost:9");
            assert_eq!(channel.endpoint(), "http://localhost:9/bot123:abc/sendMessage");
            assert_eq!(channel.style(), SummaryStyle::Html);
        }

        #[test]
        fn test_unreachable_channel_fails() {
            let channel = DiscordChannel::new("http://127.0.0.1:9/webhook").unwrap();
            assert!(channel.send("hello").is_err());
            assert_eq!(channel.max_len(), 2000);
        }

        #[test]
        fn test_payloads() {
            let json = serde_json::to_string(&TelegramMessage {
                chat_id: "@c",
                text: "<b>x</b>",
                parse_mode: "HTML",
            })
            .unwrap();
            assert_eq!(json, r#"{"chat_id":"@c","text":"<b>x</b>","parse_mode":"HTML"}"#);

            let json = serde_json::to_string(&DiscordMessage { content: "**x**" }).unwrap();
            assert_eq!(json, r#"{"content":"**x**"}"#);
        }
    }
}

#[cfg(feature = "email")]
mod email {
    use super::super::summary::{SummaryStyle, SUMMARY_TITLE};
    use super::super::NotificationChannel;
    use crate::error::{PotentialError, Result};
    use lettre::message::header::ContentType;
    use lettre::message::Mailbox;
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{Message, SmtpTransport, Transport};
    use std::time::Duration;

    const STARTTLS_PORT: u16 = 587;

    fn mailbox(address: &str) -> Result<Mailbox> {
        address
            .trim()
            .parse()
            .map_err(|e| PotentialError::FatalConfiguration(format!("invalid email address {}: {}", address, e)))
    }

    /// Plain-text mail to a fixed recipient list. Port 587 negotiates
    /// STARTTLS, every other port uses implicit TLS.
    pub struct EmailChannel {
        transport: SmtpTransport,
        sender: Mailbox,
        recipients: Vec<Mailbox>,
    }

    impl EmailChannel {
        pub fn new(server: &str, port: u16, sender: &str, password: &str, recipients: &[String]) -> Result<Self> {
            if recipients.is_empty() {
                return Err(PotentialError::FatalConfiguration(
                    "email channel needs at least one recipient".to_string(),
                ));
            }
            let recipients = recipients.iter().map(|r| mailbox(r)).collect::<Result<Vec<_>>>()?;

            let builder = if port == STARTTLS_PORT {
                SmtpTransport::starttls_relay(server)
            } else {
                SmtpTransport::relay(server)
            }
            .map_err(|e| PotentialError::FatalConfiguration(format!("invalid SMTP server {}: {}", server, e)))?;

            let transport = builder
                .port(port)
                .credentials(Credentials::new(sender.trim().to_string(), password.to_string()))
                .timeout(Some(Duration::from_secs(30)))
                .build();

            Ok(Self {
                transport,
                sender: mailbox(sender)?,
                recipients,
            })
        }

        pub fn build_message(&self, subject: &str, body: &str) -> Result<Message> {
            let mut builder = Message::builder().from(self.sender.clone()).subject(subject);
            for recipient in &self.recipients {
                builder = builder.to(recipient.clone());
            }
            builder
                .header(ContentType::TEXT_PLAIN)
                .body(body.to_string())
                .map_err(|e| PotentialError::Publish(format!("Failed to build email: {}", e)))
        }
    }

    impl NotificationChannel for EmailChannel {
        fn name(&self) -> &str {
            "email"
        }

        fn style(&self) -> SummaryStyle {
            SummaryStyle::Plain
        }

        fn send(&self, message: &str) -> Result<()> {
            self.send_titled(SUMMARY_TITLE, message)
        }

        fn send_titled(&self, subject: &str, message: &str) -> Result<()> {
            let email = self.build_message(subject, message)?;
            self.transport
                .send(&email)
                .map_err(|e| PotentialError::Publish(format!("SMTP delivery failed: {}", e)))?;
            log::debug!("Mailed {} recipient(s)", self.recipients.len());
            Ok(())
        }
    }

}
