use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{DialolicalError, DialolicalResult};
use crate::poll::PollPolicy;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_BOT_MODEL: &str = "python-example-v1";
pub const DEFAULT_PROPOSITION: &str = "AI will surpass human intelligence within 10 years";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub bot: BotProfile,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_max_poll_interval")]
    pub max_interval_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Per-round limit on waiting for our turn. 0 waits forever.
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotProfile {
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    #[serde(default = "default_bot_model")]
    pub default_model: String,

    #[serde(default = "default_proposition")]
    pub proposition: String,

    #[serde(default = "default_reaction_emoji")]
    pub reaction_emoji: String,

    #[serde(default = "default_responses")]
    pub responses: Vec<String>,

    /// Closing statement submitted when the dialogue reaches scoring.
    #[serde(default)]
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_max_poll_interval() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_poll_timeout() -> u64 {
    600
}

fn default_name_prefix() -> String {
    "RustBot-".to_string()
}

fn default_bot_model() -> String {
    DEFAULT_BOT_MODEL.to_string()
}

fn default_proposition() -> String {
    DEFAULT_PROPOSITION.to_string()
}

fn default_reaction_emoji() -> String {
    "🦉".to_string()
}

fn default_responses() -> Vec<String> {
    vec![
        "An interesting position. Let me argue that...".to_string(),
        "Building on that point...".to_string(),
        "In conclusion...".to_string(),
    ]
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_interval_ms: default_max_poll_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            timeout_secs: default_poll_timeout(),
        }
    }
}

impl Default for BotProfile {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            default_model: default_bot_model(),
            proposition: default_proposition(),
            reaction_emoji: default_reaction_emoji(),
            responses: default_responses(),
            conclusion: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl PollingConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(self.interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            backoff_multiplier: self.backoff_multiplier,
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }
}

impl BotConfig {
    /// Load from the standard config files, `.env` files and the environment.
    pub fn load() -> DialolicalResult<Self> {
        Self::load_from_paths(get_config_paths())
    }

    pub fn load_from_paths(paths: Vec<PathBuf>) -> DialolicalResult<Self> {
        load_dotenv_files();

        let mut builder = ConfigBuilder::builder();

        for path in paths {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("DIALOLICAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut bot_config: BotConfig = builder.build()?.try_deserialize()?;
        bot_config.apply_env_overrides();
        bot_config.validate()?;

        Ok(bot_config)
    }

    /// Parse a TOML document on top of the defaults, without touching the
    /// environment.
    pub fn from_toml_str(toml: &str) -> DialolicalResult<Self> {
        let bot_config: BotConfig = ConfigBuilder::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        bot_config.validate()?;
        Ok(bot_config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DIALOLICAL_URL") {
            self.server.base_url = url;
        }

        if let Ok(level) = std::env::var("DIALOLICAL_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> DialolicalResult<()> {
        let url = self.server.base_url.trim();
        if url.is_empty() {
            return Err(DialolicalError::InvalidConfigValue {
                key: "server.base_url".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(DialolicalError::InvalidConfigValue {
                key: "server.base_url".to_string(),
                message: format!("'{}' must start with http:// or https://", url),
            });
        }

        if self.server.request_timeout_secs == 0 {
            return Err(DialolicalError::InvalidConfigValue {
                key: "server.request_timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.polling.interval_ms == 0 {
            return Err(DialolicalError::InvalidConfigValue {
                key: "polling.interval_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.polling.max_interval_ms < self.polling.interval_ms {
            return Err(DialolicalError::InvalidConfigValue {
                key: "polling.max_interval_ms".to_string(),
                message: "Cannot be less than interval_ms".to_string(),
            });
        }

        if !self.polling.backoff_multiplier.is_finite() || self.polling.backoff_multiplier < 1.0 {
            return Err(DialolicalError::InvalidConfigValue {
                key: "polling.backoff_multiplier".to_string(),
                message: "Must be a finite number >= 1.0".to_string(),
            });
        }

        if self.bot.reaction_emoji.trim().is_empty() {
            return Err(DialolicalError::InvalidConfigValue {
                key: "bot.reaction_emoji".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if self.bot.responses.is_empty() {
            return Err(DialolicalError::InvalidConfigValue {
                key: "bot.responses".to_string(),
                message: "At least one scripted response is required".to_string(),
            });
        }

        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(DialolicalError::InvalidConfigValue {
                key: "logging.level".to_string(),
                message: format!("Invalid log filter '{}': {}", self.logging.level, e),
            });
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.server.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.server.connect_timeout_secs)
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("config").join("local.toml"));
        paths.push(cwd.join("dialolical.toml"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join("config.toml"));
    }

    paths
}

fn load_dotenv_files() {
    let mut paths = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".env"));
        paths.push(cwd.join(".env.local"));
    }

    if let Some(config_dir) = get_config_dir() {
        paths.push(config_dir.join(".env"));
    }

    for path in paths {
        if path.exists() {
            let _ = dotenvy::from_path(&path);
        }
    }
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dialolical"))
}
