use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
/// Rule data (dictionaries, thresholds, weights) lives in the rule file
/// pointed to by `RULES_PATH`, not here.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub raw_store_dir: String,
    pub rules_path: String,
    pub load_concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            raw_store_dir: required_env("RAW_STORE_DIR"),
            rules_path: required_env("RULES_PATH"),
            load_concurrency: env::var("LOAD_CONCURRENCY")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .expect("LOAD_CONCURRENCY must be a number"),
        }
    }

    /// Log the non-secret parts of the config.
    pub fn log_redacted(&self) {
        info!(
            raw_store_dir = self.raw_store_dir.as_str(),
            rules_path = self.rules_path.as_str(),
            load_concurrency = self.load_concurrency,
            "Config loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
