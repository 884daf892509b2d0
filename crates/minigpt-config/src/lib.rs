pub mod config;
pub mod manager;

pub use config::{
    ClientConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, ServerConfig,
    UpstreamConfig, PLACEHOLDER_TOKEN,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// `~/.minigpt`
pub fn minigpt_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".minigpt"))
}

/// Default config file path
pub fn default_config_path() -> Option<PathBuf> {
    minigpt_dir().map(|dir| dir.join("config.json"))
}

/// Default directory for persisted conversations
pub fn default_data_dir() -> Option<PathBuf> {
    minigpt_dir().map(|dir| dir.join("data"))
}

/// Default directory for log files
pub fn default_log_dir() -> Option<PathBuf> {
    minigpt_dir().map(|dir| dir.join("logs"))
}

/// Expand a leading `~/` to the user's home directory
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        Some(PathBuf::from(path))
    }
}
