// Runtime configuration
//
// Everything has a code default. The environment supplies only the
// analysis credential.

use crate::risk::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub file_prefix: String,
    /// Used when RUST_LOG is unset
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            file_prefix: "applemar-planner.log".to_string(),
            default_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub log: LogConfig,
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("applemar.db"),
            export_dir: PathBuf::from("exports"),
            log: LogConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Defaults plus the credential from `GEMINI_API_KEY` (or `API_KEY`)
    pub fn from_env() -> Self {
        let api_key = ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());

        let mut config = Self::default();
        config.analysis.api_key = api_key;
        config
    }
}
