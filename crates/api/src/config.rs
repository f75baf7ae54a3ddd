//! Service Configuration
//!
//! Built-in defaults, overridden by an optional file, overridden by
//! `TRANSIT__SECTION__KEY` environment variables.

use crate::rate_limit::RateLimitConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use feature_engine::ExtractorConfig;
use inference_engine::{ModelConfig, DEFAULT_CADENCE_MINUTES};
use lightcurve::{SeriesValidator, DEFAULT_MIN_POINTS};
use serde::Deserialize;

/// Environment variable naming the configuration file (extension optional)
pub const CONFIG_PATH_ENV: &str = "TRANSIT_API_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/default";
const ENV_PREFIX: &str = "TRANSIT";

/// Origins allowed by the public deployment
const DEFAULT_ORIGINS: [&str; 4] = [
    "https://www.oramax.space",
    "https://oramax.space",
    "https://oramax-landing.vercel.app",
    "http://localhost:3000",
];

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub model: ModelConfig,
    pub features: ExtractorConfig,
    pub input: InputConfig,
    pub rate_limit: RateLimitConfig,
    pub log: LogConfig,
}

/// Listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind_addr: String,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Cross-origin settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Exact origins, or `"*"` for any
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl CorsConfig {
    /// Whether every origin is allowed
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o.trim() == "*")
    }
}

/// Request input handling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Shortest accepted light curve
    pub min_points: usize,
    /// Cadence used when a request does not give one (minutes)
    pub default_cadence_min: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_points: DEFAULT_MIN_POINTS,
            default_cadence_min: DEFAULT_CADENCE_MINUTES,
        }
    }
}

impl InputConfig {
    pub fn validator(&self) -> SeriesValidator {
        SeriesValidator::new(self.min_points)
    }
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from the file named by `TRANSIT_API_CONFIG` (or `config/default`
    /// if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let explicit = std::env::var_os(CONFIG_PATH_ENV).is_some();

        let settings = Config::builder()
            .add_source(File::with_name(&path).required(explicit))
            .add_source(environment())
            .build()?;

        Self::finish(settings)
    }

    /// Load from TOML text only, ignoring the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;

        Self::finish(settings)
    }

    fn finish(settings: Config) -> Result<Self, ConfigError> {
        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.min_points == 0 {
            return Err(ConfigError::Message("input.min_points must be at least 1".into()));
        }
        if !(self.input.default_cadence_min.is_finite() && self.input.default_cadence_min > 0.0) {
            return Err(ConfigError::Message(format!(
                "input.default_cadence_min must be positive, got {}",
                self.input.default_cadence_min
            )));
        }
        if self.rate_limit.enabled && (self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0) {
            return Err(ConfigError::Message(
                "rate_limit.per_second and rate_limit.burst_size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("cors.allowed_origins")
        .try_parsing(true)
}
