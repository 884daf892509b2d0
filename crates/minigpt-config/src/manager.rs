use crate::config::{Config, ConfigError, ConfigResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const ENV_UPSTREAM_URL: &str = "MINIGPT_UPSTREAM_URL";
pub const ENV_UPSTREAM_TOKEN: &str = "MINIGPT_UPSTREAM_TOKEN";
pub const ENV_PORT: &str = "MINIGPT_PORT";

/// Owns the loaded configuration and the file it came from
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// Load the config file, creating it with defaults when missing.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing,
    /// then `MINIGPT_*` environment overrides are applied.
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            info!("Loading config from {:?}", path);
            let content = tokio::fs::read_to_string(path).await?;
            let content = Self::expand_env_vars(&content)?;
            serde_json::from_str(&content)?
        } else {
            info!("Config file not found, creating default config at {:?}", path);
            let default_config = Config::default();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&default_config)?;
            tokio::fs::write(path, &content).await?;
            default_config
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Self::validate(&config)?;

        Ok(Self {
            path: path.to_path_buf(),
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// Load from `~/.minigpt/config.json`
    pub async fn load_default() -> ConfigResult<Self> {
        let config_path = Self::default_config_path()?;
        Self::load(&config_path).await
    }

    pub fn default_config_path() -> ConfigResult<PathBuf> {
        crate::default_config_path()
            .ok_or_else(|| ConfigError::InvalidPath("Could not find home directory".to_string()))
    }

    /// Wrap an in-memory config (used by tests)
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Clone of the current configuration
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn save(&self) -> ConfigResult<()> {
        let config = self.config.read().await;
        let content = serde_json::to_string_pretty(&*config)?;
        drop(config);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        info!("Config saved to {:?}", self.path);
        Ok(())
    }

    /// Mutate the config and persist it
    pub async fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write().await;
        f(&mut config);
        drop(config);
        self.save().await
    }

    pub fn validate(config: &Config) -> ConfigResult<()> {
        if config.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        let base = config.upstream.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "Upstream base_url must be an http(s) URL, got '{}'",
                config.upstream.base_url
            )));
        }

        if !(config.client.server_url.starts_with("http://")
            || config.client.server_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "Client server_url must be an http(s) URL, got '{}'",
                config.client.server_url
            )));
        }

        Ok(())
    }

    /// Apply `MINIGPT_UPSTREAM_URL`, `MINIGPT_UPSTREAM_TOKEN` and `MINIGPT_PORT`
    pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_UPSTREAM_URL).filter(|v| !v.is_empty()) {
            debug!("Upstream URL overridden from {}", ENV_UPSTREAM_URL);
            config.upstream.base_url = url;
        }
        if let Some(token) = lookup(ENV_UPSTREAM_TOKEN) {
            debug!("Upstream token overridden from {}", ENV_UPSTREAM_TOKEN);
            config.upstream.token = Some(token);
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.server.port = port.parse().map_err(|_| {
                ConfigError::Validation(format!("Invalid port number in {}: {}", ENV_PORT, port))
            })?;
        }
        Ok(())
    }

    /// Expand `${VAR}` or `${VAR:-default}`
    fn expand_env_vars(content: &str) -> ConfigResult<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let (Some(full_match), Some(var_expr)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let var_expr = var_expr.as_str();

            let (var_name, default_value) = match var_expr.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (var_expr, None),
            };

            let replacement = match std::env::var(var_name) {
                Ok(val) => val,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    None => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
                },
            };

            result = result.replace(full_match.as_str(), &replacement);
        }

        Ok(result)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::load(&config_path).await.unwrap();
        let config = manager.snapshot().await;

        assert!(config_path.exists());
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.cors);
    }

    #[tokio::test]
    async fn test_env_var_expansion() {
        std::env::set_var("MINIGPT_TEST_EXPANSION_VAR", "test_value");

        let content = r#"{"key": "${MINIGPT_TEST_EXPANSION_VAR}"}"#;
        let expanded = ConfigManager::expand_env_vars(content).unwrap();
        assert!(expanded.contains("test_value"));
    }

    #[test]
    fn test_env_var_default_and_missing() {
        let content = r#"{"key": "${MINIGPT_TEST_UNSET_VAR:-fallback}"}"#;
        let expanded = ConfigManager::expand_env_vars(content).unwrap();
        assert!(expanded.contains("fallback"));

        let missing = ConfigManager::expand_env_vars(r#"{"key": "${MINIGPT_TEST_UNSET_VAR}"}"#);
        assert!(matches!(missing, Err(ConfigError::EnvVarNotFound(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_UPSTREAM_URL, "http://localhost:9999"),
            (ENV_UPSTREAM_TOKEN, "secret"),
            (ENV_PORT, "4100"),
        ]);
        let mut config = Config::default();
        ConfigManager::apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.upstream.base_url, "http://localhost:9999");
        assert_eq!(config.upstream.token.as_deref(), Some("secret"));
        assert_eq!(config.server.port, 4100);
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = Config::default();
        let result = ConfigManager::apply_env_overrides(&mut config, |k| {
            (k == ENV_PORT).then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(ConfigManager::validate(&config).is_err());

        config.server.port = 8080;
        assert!(ConfigManager::validate(&config).is_ok());

        config.upstream.base_url = "ftp://nope".to_string();
        assert!(ConfigManager::validate(&config).is_err());
    }

    #[tokio::test]
    async fn test_update_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::new(Config::default(), config_path.clone());

        manager.update(|c| c.server.port = 5005).await.unwrap();

        let saved: Config =
            serde_json::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(saved.server.port, 5005);
    }
}
