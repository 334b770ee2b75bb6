use std::time::Duration;

use clap::Parser;
use engine::{DiscoveryQuery, GestureThresholds, QuotaPolicy, SessionConfig};
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/swipedeck.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    pub state_path: String,
    pub level: String,
    pub request_timeout_secs: u64,
    pub debounce_ms: u64,
    pub reset_check_secs: u64,
    /// Fixed seed for the fallback shuffle, for reproducible sessions.
    pub shuffle_seed: Option<u64>,
    pub quota: Quota,
    pub gesture: Gesture,
    pub discovery: Discovery,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Quota {
    pub daily_free_limit: u32,
    pub paid_cost: u64,
    pub reset_period_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Gesture {
    pub tap: f64,
    pub commit: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Discovery {
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub max_distance_km: Option<u32>,
    pub tags: Vec<String>,
    pub limit: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            token: None,
            state_path: "state/swipedeck.json".to_string(),
            level: "info".to_string(),
            request_timeout_secs: 10,
            debounce_ms: 1_000,
            reset_check_secs: 60,
            shuffle_seed: None,
            quota: Quota::default(),
            gesture: Gesture::default(),
            discovery: Discovery::default(),
        }
    }
}

impl Default for Quota {
    fn default() -> Self {
        let policy = QuotaPolicy::default();
        Self {
            daily_free_limit: policy.daily_free_limit,
            paid_cost: policy.paid_cost,
            reset_period_hours: policy.reset_period.num_hours(),
        }
    }
}

impl Default for Gesture {
    fn default() -> Self {
        let thresholds = GestureThresholds::default();
        Self {
            tap: thresholds.tap,
            commit: thresholds.commit,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "swipedeck", disable_version_flag = true)]
struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:3000).
    #[arg(long)]
    base_url: Option<String>,
    /// Override the API bearer token.
    #[arg(long, env = "SWIPEDECK_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Override where the device state file lives.
    #[arg(long)]
    state_path: Option<String>,
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    level: Option<String>,
}

pub fn load() -> Result<Settings> {
    let args = Args::parse();

    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(
        config::Environment::with_prefix("SWIPEDECK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );
    let mut settings: Settings = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(token) = args.token {
        settings.token = Some(token);
    }
    if let Some(state_path) = args.state_path {
        settings.state_path = state_path;
    }
    if let Some(level) = args.level {
        settings.level = level;
    }

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.gesture.tap <= 0.0 || self.gesture.commit <= self.gesture.tap {
            return Err(AppError::Settings(format!(
                "gesture thresholds must satisfy 0 < tap < commit (tap = {}, commit = {})",
                self.gesture.tap, self.gesture.commit
            )));
        }
        if self.quota.reset_period_hours <= 0 {
            return Err(AppError::Settings(
                "quota.reset_period_hours must be positive".to_string(),
            ));
        }
        if self.reset_check_secs == 0 {
            return Err(AppError::Settings(
                "reset_check_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            policy: QuotaPolicy {
                daily_free_limit: self.quota.daily_free_limit,
                paid_cost: self.quota.paid_cost,
                reset_period: chrono::Duration::hours(self.quota.reset_period_hours),
            },
            debounce: Duration::from_millis(self.debounce_ms),
            shuffle_seed: self.shuffle_seed,
            ..SessionConfig::default()
        }
    }

    pub fn thresholds(&self) -> GestureThresholds {
        GestureThresholds {
            tap: self.gesture.tap,
            commit: self.gesture.commit,
        }
    }

    pub fn discovery_query(&self) -> DiscoveryQuery {
        DiscoveryQuery {
            min_age: self.discovery.min_age,
            max_age: self.discovery.max_age,
            max_distance_km: self.discovery.max_distance_km,
            tags: self.discovery.tags.clone(),
            limit: self.discovery.limit,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reset_check_interval(&self) -> Duration {
        Duration::from_secs(self.reset_check_secs)
    }
}
