use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Default listen port. `DEFAULT_CLASSIFIER_ENDPOINT` targets the proxy mounted on it.
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CLASSIFIER_ENDPOINT: &str = "http://localhost:3001/analyze-transaction-groq";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub groq: GroqConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
        }
    }
}

impl ServerConfig {
    /// Configured port, then `PORT`, then `DEFAULT_PORT`.
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationSettings {
    #[serde(alias = "intervalMs", default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(alias = "feedCapacity", default = "default_feed_capacity")]
    pub feed_capacity: usize,
    #[serde(alias = "fraudProbability", default = "default_fraud_probability")]
    pub fraud_probability: f64,
    #[serde(default)]
    pub autostart: bool,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            feed_capacity: default_feed_capacity(),
            fraud_probability: default_fraud_probability(),
            autostart: false,
            seed: None,
        }
    }
}

impl SimulationSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClassifierConfig {
    pub endpoint: Option<String>,
    #[serde(alias = "timeoutMs")]
    pub timeout_ms: Option<u64>,
}

impl ClassifierConfig {
    /// Configured endpoint, then `CLASSIFIER_ENDPOINT`, then the local proxy.
    pub fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .or_else(|| env::var("CLASSIFIER_ENDPOINT").ok())
            .unwrap_or_else(|| DEFAULT_CLASSIFIER_ENDPOINT.to_string())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GroqConfig {
    pub api_key: Option<String>,

    // Support JSON key: apiKey
    #[serde(alias = "apiKey")]
    pub api_key_alt: Option<String>,

    #[serde(alias = "baseUrl", default = "default_groq_base_url")]
    pub base_url: String,
    #[serde(default = "default_groq_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(alias = "maxTokens", default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_alt: None,
            base_url: default_groq_base_url(),
            model: default_groq_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GroqConfig {
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or(self.api_key_alt.clone())
            .or_else(|| env::var("GROQ_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_interval_ms() -> u64 {
    3_000
}

fn default_feed_capacity() -> usize {
    50
}

fn default_fraud_probability() -> f64 {
    0.2
}

fn default_groq_base_url() -> String {
    DEFAULT_GROQ_BASE_URL.to_string()
}

fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // 1. Project config from config/config.{toml,json}
            .add_source(File::with_name("config/config").required(false))
            // 2. Local overrides from config/local.{toml,json} (not checked in)
            .add_source(File::with_name("config/local").required(false))
            // 3. Environment overrides
            // e.g. FRAUD_MONITOR__SIMULATION__INTERVAL_MS=1000
            .add_source(Environment::with_prefix("FRAUD_MONITOR").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
