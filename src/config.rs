//! Pipeline configuration
//!
//! Loaded from TOML, then overridden from the environment. Credentials are
//! never read from the file; they only come from the environment.

use crate::data::Period;
use crate::error::{PotentialError, Result};
use crate::features::DEFAULT_TIME_STEP;
use crate::models::{AttentionConfig, DecomposableConfig, RecurrentConfig};
use crate::ranking::DEFAULT_TOP_N;
use crate::strategy::DEFAULT_MIN_WINDOW_BARS;
use crate::universe::MarketIndex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub period: Period,
    #[serde(default = "default_indices")]
    pub indices: Vec<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_time_step")]
    pub time_step: usize,
    #[serde(default = "default_min_window_bars")]
    pub min_window_bars: usize,
    /// Worker threads evaluating tickers of one index
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub strategies: StrategyConfig,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub attention: bool,
    #[serde(default)]
    pub decomposable: bool,
    #[serde(default = "default_attention_period")]
    pub attention_period: Period,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub recurrent: RecurrentConfig,
    #[serde(default)]
    pub attention: AttentionConfig,
    #[serde(default)]
    pub decomposable: DecomposableConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub csv_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// SQLite file receiving every published index result
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub log: bool,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(skip)]
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip)]
    pub webhook_url: Option<String>,
}

/// SMTP delivery over implicit TLS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Sender address, also the SMTP login
    #[serde(skip)]
    pub sender: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: None,
            smtp_port: default_smtp_port(),
            recipients: Vec::new(),
            sender: None,
            password: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    465
}

fn default_indices() -> Vec<String> {
    vec![
        MarketIndex::Tw50.key().to_string(),
        MarketIndex::TwMid100.key().to_string(),
        MarketIndex::Sp500.key().to_string(),
    ]
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_time_step() -> usize {
    DEFAULT_TIME_STEP
}

fn default_min_window_bars() -> usize {
    DEFAULT_MIN_WINDOW_BARS
}

fn default_max_concurrency() -> usize {
    4
}

fn default_attention_period() -> Period {
    Period::Years(1)
}

fn default_true() -> bool {
    true
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            attention: false,
            decomposable: false,
            attention_period: default_attention_period(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            log: true,
            telegram: TelegramConfig::default(),
            discord: DiscordConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period: Period::default(),
            indices: default_indices(),
            top_n: default_top_n(),
            time_step: default_time_step(),
            min_window_bars: default_min_window_bars(),
            max_concurrency: default_max_concurrency(),
            strategies: StrategyConfig::default(),
            models: ModelConfig::default(),
            data: DataConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document; absent keys take their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a TOML file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Render as TOML, credentials excluded
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PotentialError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Recognised keys: `USE_ATTENTION`, `USE_DECOMPOSABLE`,
    /// `ATTENTION_PERIOD`, `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHANNEL_ID`,
    /// `DISCORD_WEBHOOK_URL`, `SMTP_SERVER`, `SMTP_PORT`, `SENDER_EMAIL`,
    /// `EMAIL_PASSWORD`, `TO_EMAILS`. Supplying a token, webhook or
    /// password enables its channel.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Older deployments name the strategies after the model families
        let lookup = |key: &str| {
            let alias = match key {
                "USE_ATTENTION" => Some("USE_TRANSFORMER"),
                "USE_DECOMPOSABLE" => Some("USE_PROPHET"),
                "ATTENTION_PERIOD" => Some("TRANSFORMER_PERIOD"),
                _ => None,
            };
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| alias.and_then(|a| lookup(a)).filter(|v| !v.trim().is_empty()))
        };

        // Credentials first so a bad flag below still leaves channels usable
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.publish.telegram.bot_token = Some(token);
            self.publish.telegram.enabled = true;
        }
        if let Some(channel) = lookup("TELEGRAM_CHANNEL_ID") {
            self.publish.telegram.channel_id = Some(channel);
        }
        if let Some(url) = lookup("DISCORD_WEBHOOK_URL") {
            self.publish.discord.webhook_url = Some(url);
            self.publish.discord.enabled = true;
        }

        let email = &mut self.publish.email;
        if let Some(server) = lookup("SMTP_SERVER") {
            email.smtp_server = Some(server);
        }
        if let Some(sender) = lookup("SENDER_EMAIL") {
            email.sender = Some(sender);
        }
        if let Some(password) = lookup("EMAIL_PASSWORD") {
            email.password = Some(password);
            email.enabled = true;
        }
        if let Some(to) = lookup("TO_EMAILS") {
            email.recipients = to
                .split(',')
                .map(str::trim)
                .filter(|addr| !addr.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(port) = lookup("SMTP_PORT") {
            email.smtp_port = port.trim().parse().map_err(|_| {
                PotentialError::FatalConfiguration(format!("invalid SMTP_PORT: {}", port))
            })?;
        }

        if let Some(v) = lookup("USE_ATTENTION") {
            self.strategies.attention = parse_flag(&v);
        }
        if let Some(v) = lookup("USE_DECOMPOSABLE") {
            self.strategies.decomposable = parse_flag(&v);
        }
        if let Some(v) = lookup("ATTENTION_PERIOD") {
            self.strategies.attention_period = v.parse()?;
        }
        Ok(())
    }

    /// Resolve the configured index keys
    pub fn selected_indices(&self) -> Result<Vec<MarketIndex>> {
        self.indices
            .iter()
            .map(|key| {
                key.parse::<MarketIndex>()
                    .map_err(|e| PotentialError::FatalConfiguration(e.to_string()))
            })
            .collect()
    }

    /// Check the configuration is runnable
    pub fn validate(&self) -> Result<()> {
        let fatal = |msg: &str| Err(PotentialError::FatalConfiguration(msg.to_string()));

        if self.top_n == 0 {
            return fatal("top_n must be positive");
        }
        if self.time_step == 0 {
            return fatal("time_step must be positive");
        }
        if self.max_concurrency == 0 {
            return fatal("max_concurrency must be positive");
        }
        if self.indices.is_empty() {
            return fatal("no indices selected");
        }
        self.selected_indices()?;

        if self.data.provider == ProviderKind::Csv {
            match &self.data.csv_dir {
                Some(dir) if dir.is_dir() => {}
                Some(dir) => {
                    return Err(PotentialError::FatalConfiguration(format!(
                        "CSV directory does not exist: {}",
                        dir.display()
                    )))
                }
                None => return fatal("csv provider requires data.csv_dir"),
            }
        }

        let telegram = &self.publish.telegram;
        if telegram.enabled && (telegram.bot_token.is_none() || telegram.channel_id.is_none()) {
            return fatal("telegram enabled without TELEGRAM_BOT_TOKEN and TELEGRAM_CHANNEL_ID");
        }
        if self.publish.discord.enabled && self.publish.discord.webhook_url.is_none() {
            return fatal("discord enabled without DISCORD_WEBHOOK_URL");
        }
        let email = &self.publish.email;
        if email.enabled {
            if email.smtp_server.is_none() {
                return fatal("email enabled without SMTP_SERVER");
            }
            if email.sender.is_none() || email.password.is_none() {
                return fatal("email enabled without SENDER_EMAIL and EMAIL_PASSWORD");
            }
            if email.recipients.is_empty() {
                return fatal("email enabled without TO_EMAILS");
            }
        }
        Ok(())
    }

    pub fn with_indices(mut self, indices: &[MarketIndex]) -> Self {
        self.indices = indices.iter().map(|i| i.key().to_string()).collect();
        self
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_attention(mut self, enabled: bool) -> Self {
        self.strategies.attention = enabled;
        self
    }

    pub fn with_decomposable(mut self, enabled: bool) -> Self {
        self.strategies.decomposable = enabled;
        self
    }

    pub fn with_csv_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data.provider = ProviderKind::Csv;
        self.data.csv_dir = Some(dir.into());
        self
    }
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.period, Period::Months(3));
        assert_eq!(config.indices, vec!["tw50", "tw_mid100", "sp500"]);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.time_step, 60);
        assert_eq!(config.min_window_bars, 60);
        assert!(!config.strategies.attention);
        assert!(!config.strategies.decomposable);
        assert_eq!(config.strategies.attention_period, Period::Years(1));
        assert!(config.publish.log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = PipelineConfig::from_toml_str(
            r#"
            period = "6mo"
            indices = ["sox", "dji"]
            top_n = 5

            [strategies]
            decomposable = true

            [models.recurrent]
            hidden_size = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.period, Period::Months(6));
        assert_eq!(
            config.selected_indices().unwrap(),
            vec![MarketIndex::Sox, MarketIndex::Dji]
        );
        assert_eq!(config.top_n, 5);
        assert!(config.strategies.decomposable);
        assert_eq!(config.models.recurrent.hidden_size, 16);
        assert_eq!(config.models.recurrent.num_layers, 2);
        assert_eq!(config.time_step, 60);
    }

    #[test]
    fn test_bad_period_in_file() {
        assert!(PipelineConfig::from_toml_str(r#"period = "3 months""#).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("USE_ATTENTION", "TRUE"),
                ("USE_DECOMPOSABLE", "false"),
                ("ATTENTION_PERIOD", "2y"),
                ("TELEGRAM_BOT_TOKEN", "123:abc"),
                ("TELEGRAM_CHANNEL_ID", "@potential"),
            ]))
            .unwrap();

        assert!(config.strategies.attention);
        assert!(!config.strategies.decomposable);
        assert_eq!(config.strategies.attention_period, Period::Years(2));
        assert!(config.publish.telegram.enabled);
        assert!(!config.publish.discord.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_aliases() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("USE_TRANSFORMER", "true"),
                ("USE_PROPHET", "True"),
                ("TRANSFORMER_PERIOD", "6mo"),
            ]))
            .unwrap();
        assert!(config.strategies.attention);
        assert!(config.strategies.decomposable);
        assert_eq!(config.strategies.attention_period, Period::Months(6));

        // The current name wins over the alias
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("USE_ATTENTION", "false"),
                ("USE_TRANSFORMER", "true"),
                ("ATTENTION_PERIOD", "2y"),
                ("TRANSFORMER_PERIOD", "6mo"),
            ]))
            .unwrap();
        assert!(!config.strategies.attention);
        assert_eq!(config.strategies.attention_period, Period::Years(2));
    }

    #[test]
    fn test_env_email() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("SMTP_SERVER", "smtp.example.com"),
                ("SMTP_PORT", "2465"),
                ("SENDER_EMAIL", "bot@example.com"),
                ("EMAIL_PASSWORD", "hunter2"),
                ("TO_EMAILS", "a@example.com, b@example.com,"),
            ]))
            .unwrap();

        let email = &config.publish.email;
        assert!(email.enabled);
        assert_eq!(email.smtp_server.as_deref(), Some("smtp.example.com"));
        assert_eq!(email.smtp_port, 2465);
        assert_eq!(email.recipients, vec!["a@example.com", "b@example.com"]);
        assert!(config.validate().is_ok());

        let rendered = config.to_toml_string().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("bot@example.com"));
    }

    #[test]
    fn test_env_credentials_survive_bad_flag() {
        let mut config = PipelineConfig::default();
        let outcome = config.apply_env(env(&[
            ("DISCORD_WEBHOOK_URL", "https://discord.example/hook"),
            ("SMTP_PORT", "many"),
        ]));

        assert!(matches!(outcome, Err(PotentialError::FatalConfiguration(_))));
        assert!(config.publish.discord.enabled);
    }

    #[test]
    fn test_env_bad_period() {
        let mut config = PipelineConfig::default();
        assert!(config.apply_env(env(&[("ATTENTION_PERIOD", "soon")])).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let fatal = |config: PipelineConfig| {
            matches!(config.validate(), Err(PotentialError::FatalConfiguration(_)))
        };

        assert!(fatal(PipelineConfig::default().with_top_n(0)));
        assert!(fatal(PipelineConfig {
            indices: vec!["ftse".to_string()],
            ..PipelineConfig::default()
        }));
        assert!(fatal(PipelineConfig::default().with_csv_dir("/definitely/not/here")));

        let mut telegram = PipelineConfig::default();
        telegram.publish.telegram.enabled = true;
        assert!(fatal(telegram));

        let mut discord = PipelineConfig::default();
        discord.publish.discord.enabled = true;
        assert!(fatal(discord));

        let mut email = PipelineConfig::default();
        email
            .apply_env(env(&[
                ("SMTP_SERVER", "smtp.example.com"),
                ("SENDER_EMAIL", "bot@example.com"),
                ("EMAIL_PASSWORD", "hunter2"),
            ]))
            .unwrap();
        assert!(fatal(email));
    }

    #[test]
    fn test_secrets_not_serialized() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[("DISCORD_WEBHOOK_URL", "https://discord.example/hook")]))
            .unwrap();

        let rendered = config.to_toml_string().unwrap();
        assert!(!rendered.contains("discord.example"));

        let back = PipelineConfig::from_toml_str(&rendered).unwrap();
        assert!(back.publish.discord.enabled);
        assert!(back.publish.discord.webhook_url.is_none());
    }

    #[test]
    fn test_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrency = 2\n[data]\nprovider = \"yahoo\"").unwrap();

        let config = PipelineConfig::load_file(file.path()).unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.data.provider, ProviderKind::Yahoo);
    }
}
