use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub mattermost: MattermostConfig,
    pub bot: BotConfig,
    pub webhook: WebhookConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct MattermostConfig {
    pub base_url: String,
    pub bot_token: SecretString,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub trigger_keyword: String,
    pub reconnect_delay_secs: u64,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub bind_address: String,
    pub port: u16,
    pub integration_url: String,
    pub slash_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mattermost: MattermostConfig {
                base_url: "http://localhost:8065".to_string(),
                bot_token: String::new().into(),
                request_timeout_secs: 30,
            },
            bot: BotConfig {
                trigger_keyword: "выбор".to_string(),
                reconnect_delay_secs: 5,
            },
            webhook: WebhookConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                integration_url: "http://localhost:8000".to_string(),
                slash_secret: None,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("gander.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(mattermost) = patch.mattermost {
            if let Some(base_url) = mattermost.base_url {
                self.mattermost.base_url = base_url;
            }
            if let Some(bot_token_value) = mattermost.bot_token {
                self.mattermost.bot_token = secret_value(bot_token_value);
            }
            if let Some(request_timeout_secs) = mattermost.request_timeout_secs {
                self.mattermost.request_timeout_secs = request_timeout_secs;
            }
        }

        if let Some(bot) = patch.bot {
            if let Some(trigger_keyword) = bot.trigger_keyword {
                self.bot.trigger_keyword = trigger_keyword;
            }
            if let Some(reconnect_delay_secs) = bot.reconnect_delay_secs {
                self.bot.reconnect_delay_secs = reconnect_delay_secs;
            }
        }

        if let Some(webhook) = patch.webhook {
            if let Some(bind_address) = webhook.bind_address {
                self.webhook.bind_address = bind_address;
            }
            if let Some(port) = webhook.port {
                self.webhook.port = port;
            }
            if let Some(integration_url) = webhook.integration_url {
                self.webhook.integration_url = integration_url;
            }
            if let Some(slash_secret_value) = webhook.slash_secret {
                self.webhook.slash_secret = Some(secret_value(slash_secret_value));
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("GANDER_MATTERMOST_URL") {
            self.mattermost.base_url = value;
        }
        if let Some(value) = read_env("GANDER_BOT_TOKEN") {
            self.mattermost.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("GANDER_MATTERMOST_TIMEOUT_SECS") {
            self.mattermost.request_timeout_secs =
                parse_u64("GANDER_MATTERMOST_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GANDER_BOT_TRIGGER_KEYWORD") {
            self.bot.trigger_keyword = value;
        }
        if let Some(value) = read_env("GANDER_BOT_RECONNECT_DELAY_SECS") {
            self.bot.reconnect_delay_secs = parse_u64("GANDER_BOT_RECONNECT_DELAY_SECS", &value)?;
        }

        if let Some(value) = read_env("GANDER_WEBHOOK_BIND_ADDRESS") {
            self.webhook.bind_address = value;
        }
        if let Some(value) = read_env("GANDER_WEBHOOK_PORT") {
            self.webhook.port = parse_u16("GANDER_WEBHOOK_PORT", &value)?;
        }
        if let Some(value) = read_env("GANDER_INTEGRATION_URL") {
            self.webhook.integration_url = value;
        }
        if let Some(value) = read_env("GANDER_SLASH_SECRET") {
            self.webhook.slash_secret = Some(secret_value(value));
        }

        if let Some(value) = read_env("GANDER_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("GANDER_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_mattermost(&self.mattermost)?;
        validate_bot(&self.bot)?;
        validate_webhook(&self.webhook)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl MattermostConfig {
    /// The bot token is optional for the webhook binary but required before
    /// the realtime client may start.
    pub fn require_bot_token(&self) -> Result<&SecretString, ConfigError> {
        if self.bot_token.expose_secret().is_empty() {
            return Err(ConfigError::Validation(
                "mattermost.bot_token is required to run the realtime bot. Set it in gander.toml or via GANDER_BOT_TOKEN".to_string()
            ));
        }
        Ok(&self.bot_token)
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("gander.toml"), PathBuf::from("config/gander.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let trimmed = url.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must be an http(s) URL, got `{url}`"
        )));
    }
    Ok(())
}

fn validate_mattermost(mattermost: &MattermostConfig) -> Result<(), ConfigError> {
    validate_url("mattermost.base_url", &mattermost.base_url)?;

    if mattermost.request_timeout_secs == 0 || mattermost.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "mattermost.request_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_bot(bot: &BotConfig) -> Result<(), ConfigError> {
    if bot.trigger_keyword.trim().is_empty() {
        return Err(ConfigError::Validation(
            "bot.trigger_keyword must not be empty".to_string(),
        ));
    }

    if bot.reconnect_delay_secs == 0 || bot.reconnect_delay_secs > 300 {
        return Err(ConfigError::Validation(
            "bot.reconnect_delay_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_webhook(webhook: &WebhookConfig) -> Result<(), ConfigError> {
    if webhook.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "webhook.bind_address must not be empty".to_string(),
        ));
    }

    validate_url("webhook.integration_url", &webhook.integration_url)?;

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        other => Err(ConfigError::Validation(format!(
            "unsupported log level `{other}` (expected trace|debug|info|warn|error)"
        ))),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    mattermost: Option<MattermostPatch>,
    bot: Option<BotPatch>,
    webhook: Option<WebhookPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct MattermostPatch {
    base_url: Option<String>,
    bot_token: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BotPatch {
    trigger_keyword: Option<String>,
    reconnect_delay_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    integration_url: Option<String>,
    slash_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    const GANDER_VARS: &[&str] = &[
        "GANDER_MATTERMOST_URL",
        "GANDER_BOT_TOKEN",
        "GANDER_MATTERMOST_TIMEOUT_SECS",
        "GANDER_BOT_TRIGGER_KEYWORD",
        "GANDER_BOT_RECONNECT_DELAY_SECS",
        "GANDER_WEBHOOK_BIND_ADDRESS",
        "GANDER_WEBHOOK_PORT",
        "GANDER_INTEGRATION_URL",
        "GANDER_SLASH_SECRET",
        "GANDER_LOG_LEVEL",
        "GANDER_LOG_FORMAT",
    ];

    fn clear_vars() {
        for var in GANDER_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_load_without_file_or_env() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        let config = AppConfig::load(LoadOptions::default()).expect("load defaults");

        assert_eq!(config.mattermost.base_url, "http://localhost:8065");
        assert_eq!(config.mattermost.request_timeout_secs, 30);
        assert_eq!(config.bot.trigger_keyword, "выбор");
        assert_eq!(config.bot.reconnect_delay_secs, 5);
        assert_eq!(config.webhook.port, 8000);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.webhook.slash_secret.is_none());
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("gander.toml");
        fs::write(
            &path,
            r#"
[mattermost]
base_url = "https://chat.example.com"
bot_token = "mm-token-1"

[bot]
trigger_keyword = "choose"

[webhook]
port = 9001
integration_url = "https://hooks.example.com"

[logging]
level = "debug"
format = "json"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
        })
        .expect("load from file");

        assert_eq!(config.mattermost.base_url, "https://chat.example.com");
        assert_eq!(config.mattermost.bot_token.expose_secret(), "mm-token-1");
        assert_eq!(config.bot.trigger_keyword, "choose");
        assert_eq!(config.webhook.port, 9001);
        assert_eq!(config.webhook.integration_url, "https://hooks.example.com");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn env_overrides_take_precedence_over_file() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("gander.toml");
        fs::write(
            &path,
            r#"
[mattermost]
base_url = "https://file.example.com"
"#,
        )
        .expect("write config");

        env::set_var("GANDER_MATTERMOST_URL", "https://env.example.com");
        env::set_var("GANDER_SLASH_SECRET", "hush");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
        });
        clear_vars();

        let config = result.expect("load with env overrides");
        assert_eq!(config.mattermost.base_url, "https://env.example.com");
        let secret = config.webhook.slash_secret.expect("slash secret set");
        assert_eq!(secret.expose_secret(), "hush");
    }

    #[test]
    fn interpolates_env_vars_in_config_file() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("gander.toml");
        fs::write(
            &path,
            r#"
[mattermost]
bot_token = "${GANDER_TEST_INTERP_TOKEN}"
"#,
        )
        .expect("write config");

        env::set_var("GANDER_TEST_INTERP_TOKEN", "interp-token");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
        });
        env::remove_var("GANDER_TEST_INTERP_TOKEN");

        let config = result.expect("load with interpolation");
        assert_eq!(config.mattermost.bot_token.expose_secret(), "interp-token");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        let result = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/gander.toml".into()),
            require_file: true,
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        env::set_var("GANDER_MATTERMOST_URL", "ftp://chat.example.com");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars();

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_unparseable_env_override() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        env::set_var("GANDER_WEBHOOK_PORT", "not-a-port");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars();

        assert!(matches!(result, Err(ConfigError::InvalidEnvOverride { .. })));
    }

    #[test]
    fn require_bot_token_rejects_empty_token() {
        let config = AppConfig::default();
        assert!(config.mattermost.require_bot_token().is_err());
    }

    #[test]
    fn rejects_zero_reconnect_delay() {
        let _guard = env_lock().lock().expect("env lock");
        clear_vars();

        env::set_var("GANDER_BOT_RECONNECT_DELAY_SECS", "0");
        let result = AppConfig::load(LoadOptions::default());
        clear_vars();

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
