use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::query::Locale;
use crate::rng::RandomSource;

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Custom Search returns at most ten results per page.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Everything the service needs, resolved once at startup and handed to its components.
#[derive(Debug, Clone)]
pub struct Config {
    pub vision_api_key: Option<String>,
    pub search_api_key: Option<String>,
    pub search_engine_id: Option<String>,
    pub vision_endpoint: String,
    pub search_endpoint: String,
    pub search_result_count: usize,
    pub locale: Locale,
    pub http_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub bind_addr: String,
    pub random_source: RandomSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vision_api_key: None,
            search_api_key: None,
            search_engine_id: None,
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            search_result_count: MAX_SEARCH_RESULTS,
            locale: Locale::French,
            http_timeout: Duration::from_secs(15),
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            bind_addr: "0.0.0.0:3000".to_string(),
            random_source: RandomSource::Entropy,
        }
    }
}

impl Config {
    /// Reads the environment, loading `.env` first if present.
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        Config {
            vision_api_key: get_env_opt("GOOGLE_VISION_API_KEY"),
            search_api_key: get_env_opt("GOOGLE_CUSTOM_SEARCH_API_KEY"),
            search_engine_id: get_env_opt("GOOGLE_CUSTOM_SEARCH_ENGINE_ID"),
            vision_endpoint: get_env_or_default("VISION_ENDPOINT", &defaults.vision_endpoint),
            search_endpoint: get_env_or_default("SEARCH_ENDPOINT", &defaults.search_endpoint),
            search_result_count: get_env_parsed("SEARCH_RESULT_COUNT", defaults.search_result_count)
                .clamp(1, MAX_SEARCH_RESULTS),
            locale: get_env_parsed("SEARCH_LOCALE", defaults.locale),
            http_timeout: Duration::from_secs(get_env_parsed("HTTP_TIMEOUT_SECS", 15)),
            max_retries: get_env_parsed("HTTP_MAX_RETRIES", defaults.max_retries),
            retry_backoff: Duration::from_millis(get_env_parsed("HTTP_RETRY_BACKOFF_MS", 250)),
            upload_dir: PathBuf::from(get_env_or_default("UPLOAD_DIR", "uploads")),
            max_upload_bytes: get_env_parsed("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            bind_addr: get_env_or_default("BIND_ADDR", &defaults.bind_addr),
            random_source: get_env_opt("RNG_SEED")
                .and_then(|seed| match seed.parse::<u64>() {
                    Ok(seed) => Some(RandomSource::Seeded(seed)),
                    Err(_) => {
                        tracing::warn!("ignoring malformed RNG_SEED={seed:?}");
                        None
                    }
                })
                .unwrap_or(defaults.random_source),
        }
    }
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_env_opt(key).unwrap_or_else(|| default.to_string())
}

fn get_env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match get_env_opt(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring malformed {key}={raw:?}, using default");
            default
        }),
        None => default,
    }
}
