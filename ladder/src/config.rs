use std::net::SocketAddr;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_METRICS_ADDR: &str = "127.0.0.1:3200";
const DEFAULT_STORE_URL: &str = "http://127.0.0.1:8090";
const DEFAULT_POP_BASE_MS: u64 = 1000;
const DEFAULT_POP_MIN_MS: u64 = 50;
const DEFAULT_POP_MAX_MS: u64 = 10_000;
const DEFAULT_ANTI_REPETITION_LIMIT: u32 = 3;
const DEFAULT_VIOLATION_BAN_SECS: u64 = 300;
pub const METRICS_PATH: &str = "/metrics";

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct LadderSettings {
    pub metrics_addr: String,
    pub store_url: String,
    pub pop_base_interval_ms: u64,
    pub pop_min_interval_ms: u64,
    pub pop_max_interval_ms: u64,
    pub anti_repetition_limit: u32,
    pub violation_ban_secs: u64,
}

impl Default for LadderSettings {
    fn default() -> Self {
        Self {
            metrics_addr: DEFAULT_METRICS_ADDR.into(),
            store_url: DEFAULT_STORE_URL.into(),
            pop_base_interval_ms: DEFAULT_POP_BASE_MS,
            pop_min_interval_ms: DEFAULT_POP_MIN_MS,
            pop_max_interval_ms: DEFAULT_POP_MAX_MS,
            anti_repetition_limit: DEFAULT_ANTI_REPETITION_LIMIT,
            violation_ban_secs: DEFAULT_VIOLATION_BAN_SECS,
        }
    }
}

impl LadderSettings {
    pub fn from_env() -> Result<Self, BoxError> {
        let defaults = Self::default();
        Ok(Self {
            metrics_addr: std::env::var("LADDER_METRICS_ADDR").unwrap_or(defaults.metrics_addr),
            store_url: std::env::var("LADDER_STORE_URL").unwrap_or(defaults.store_url),
            pop_base_interval_ms: env_u64("LADDER_POP_BASE_INTERVAL_MS", defaults.pop_base_interval_ms),
            pop_min_interval_ms: env_u64("LADDER_POP_MIN_INTERVAL_MS", defaults.pop_min_interval_ms),
            pop_max_interval_ms: env_u64("LADDER_POP_MAX_INTERVAL_MS", defaults.pop_max_interval_ms),
            anti_repetition_limit: env_u64("LADDER_ANTI_REPETITION_LIMIT", defaults.anti_repetition_limit as u64) as u32,
            violation_ban_secs: env_u64("LADDER_VIOLATION_BAN_SECS", defaults.violation_ban_secs),
        })
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, BoxError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn into_config(self) -> Result<LadderConfig, BoxError> {
        LadderConfig::from_settings(self)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct LadderConfig {
    pub metrics_addr: SocketAddr,
    pub store_url: String,
    pub pop_base_interval: Duration,
    pub pop_min_interval: Duration,
    pub pop_max_interval: Duration,
    pub anti_repetition_limit: u32,
    pub violation_ban: Duration,
}

impl LadderConfig {
    pub fn from_settings(s: LadderSettings) -> Result<Self, BoxError> {
        Ok(Self {
            metrics_addr: s.metrics_addr.parse()?,
            store_url: s.store_url,
            pop_base_interval: Duration::from_millis(s.pop_base_interval_ms),
            pop_min_interval: Duration::from_millis(s.pop_min_interval_ms),
            pop_max_interval: Duration::from_millis(s.pop_max_interval_ms),
            anti_repetition_limit: s.anti_repetition_limit,
            violation_ban: Duration::from_secs(s.violation_ban_secs),
        })
    }

    pub fn from_env() -> Result<Self, BoxError> {
        LadderSettings::from_env()?.into_config()
    }
}
