use crate::error::{config_error, env_error, BotResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default activity text for the bot
pub const DEFAULT_ACTIVITY: &str = "Kirjaa tapahtumia kalenteriin";

/// Calendar that events are inserted into unless configured otherwise
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Optional file with non-secret overrides
pub const SETTINGS_FILE: &str = "config/settings.toml";

/// Main configuration structure for the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// OAuth client ID, empty when it should come from the credentials file
    pub client_id: String,
    /// OAuth client secret, empty when it should come from the credentials file
    pub client_secret: String,
    /// Calendar to insert events into
    pub calendar_id: String,
    /// Path of the persisted OAuth token
    pub token_path: PathBuf,
    /// Path of the OAuth client descriptor (credentials.json)
    pub credentials_path: PathBuf,
    /// Timezone used to resolve event times
    pub timezone: String,
    /// Bot activity status text
    pub activity: String,
    /// Locale for replies
    pub bot_locale: String,
    /// How many times to rebuild a lost chat session before giving up
    pub max_reconnect_attempts: u32,
}

/// Overrides read from `config/settings.toml`
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    calendar_id: Option<String>,
    token_path: Option<PathBuf>,
    credentials_path: Option<PathBuf>,
    timezone: Option<String>,
    activity: Option<String>,
    bot_locale: Option<String>,
    max_reconnect_attempts: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            token_path: PathBuf::from("token.json"),
            credentials_path: PathBuf::from("credentials/credentials.json"),
            timezone: String::from("UTC"),
            activity: String::from(DEFAULT_ACTIVITY),
            bot_locale: String::from("en"),
            max_reconnect_attempts: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let discord_token = env::var("DISCORD_TOKEN").map_err(|_| env_error("DISCORD_TOKEN"))?;

        let mut config = Self::load_oauth_only()?;
        config.discord_token = discord_token;
        Ok(config)
    }

    /// Load everything except the Discord token, for tools that only talk to Google
    pub fn load_oauth_only() -> BotResult<Self> {
        dotenv().ok();

        let mut config = Config::default();

        if Path::new(SETTINGS_FILE).exists() {
            let content = fs::read_to_string(SETTINGS_FILE)?;
            config.apply_settings(&content)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    /// Merge TOML overrides into this config
    pub fn apply_settings(&mut self, content: &str) -> BotResult<()> {
        let settings: FileSettings = toml::from_str(content)?;

        if let Some(calendar_id) = settings.calendar_id {
            self.calendar_id = calendar_id;
        }
        if let Some(token_path) = settings.token_path {
            self.token_path = token_path;
        }
        if let Some(credentials_path) = settings.credentials_path {
            self.credentials_path = credentials_path;
        }
        if let Some(timezone) = settings.timezone {
            self.timezone = timezone;
        }
        if let Some(activity) = settings.activity {
            self.activity = activity;
        }
        if let Some(bot_locale) = settings.bot_locale {
            self.bot_locale = bot_locale;
        }
        if let Some(attempts) = settings.max_reconnect_attempts {
            self.max_reconnect_attempts = attempts;
        }

        Ok(())
    }

    fn apply_env(&mut self) -> BotResult<()> {
        // Client credentials may also live in credentials.json
        if let Ok(client_id) = env::var("CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Ok(client_secret) = env::var("CLIENT_SECRET") {
            self.client_secret = client_secret;
        }

        if let Ok(calendar_id) = env::var("CALENDAR_ID") {
            self.calendar_id = calendar_id;
        }
        if let Ok(path) = env::var("TOKEN_PATH") {
            self.token_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("CREDENTIALS_PATH") {
            self.credentials_path = PathBuf::from(path);
        }
        if let Ok(timezone) = env::var("TIMEZONE") {
            self.timezone = timezone;
        }
        if let Ok(activity) = env::var("BOT_ACTIVITY") {
            self.activity = activity;
        }
        if let Ok(locale) = env::var("BOT_LOCALE") {
            self.bot_locale = locale;
        }
        if let Ok(attempts) = env::var("MAX_RECONNECT_ATTEMPTS") {
            self.max_reconnect_attempts = attempts
                .parse::<u32>()
                .map_err(|_| config_error("Invalid MAX_RECONNECT_ATTEMPTS format"))?;
        }

        Ok(())
    }

    /// Parse the configured timezone
    pub fn tz(&self) -> BotResult<chrono_tz::Tz> {
        self.timezone
            .parse()
            .map_err(|_| config_error(&format!("Invalid timezone: {}", self.timezone)))
    }
}
