use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub lookup: LookupConfig,
    pub quota: QuotaConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub poll_timeout_secs: u64,
    pub admin_id: i64,
    /// Contact shown to unregistered users asking for access.
    pub admin_contact: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LookupConfig {
    pub base_url: String,
    pub api_key: String,
    pub resource: String,
    pub timeout_secs: u64,  // per-request ceiling for the external API
    pub artifacts_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuotaConfig {
    pub daily_limit: u32,
    pub reset_timezone: ResetTimezone,
}

// Whether the midnight reset boundary follows the server's local clock or UTC.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResetTimezone {
    Local,
    Utc,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    pub path: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::Environment::with_prefix("APP").separator("_"))
            .build()?;

        config.try_deserialize()
    }
}
