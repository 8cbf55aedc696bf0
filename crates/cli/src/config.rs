use directories::ProjectDirs;
use eyre::Result;
use gitpad_client::{ClientConfig, FileTokenStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AuthConfig {
    /// Remember the token after `login` even without `--remember`.
    #[serde(default)]
    pub remember: bool,
    /// Where remembered tokens are kept. Defaults to the data directory.
    #[serde(default)]
    pub token_path: Option<String>,
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        get_default_config_dir().join("config.json")
    }

    pub fn token_path(&self) -> PathBuf {
        match &self.auth.token_path {
            Some(path) => PathBuf::from(path),
            None => FileTokenStore::default_path(),
        }
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()).await
    }

    pub async fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(config_path).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(config_path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()).await
    }

    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        let client = &mut self.client;

        match parts.as_slice() {
            ["client", "client_id"] => client.client_id = value.to_string(),
            ["client", "exchange_url"] => client.exchange_url = value.to_string(),
            ["client", "scope"] => client.scope = value.to_string(),
            ["client", "api_base"] => client.api_base = value.to_string(),
            ["client", "auth_base"] => client.auth_base = value.to_string(),
            ["client", "timeout_ms"] => {
                client.timeout_ms = value
                    .parse::<u64>()
                    .map_err(|_| eyre::eyre!("Invalid number of milliseconds: {}", value))?;
            }
            ["client", "max_file_size"] => {
                client.max_file_size = value
                    .parse::<usize>()
                    .map_err(|_| eyre::eyre!("Invalid size in bytes: {}", value))?;
            }
            ["client", "default_extension"] => client.default_extension = value.to_string(),
            ["auth", "remember"] => {
                self.auth.remember = value
                    .parse::<bool>()
                    .map_err(|_| eyre::eyre!("Invalid boolean value: {}", value))?;
            }
            ["auth", "token_path"] => {
                self.auth.token_path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();
        let client = &self.client;

        let value = match parts.as_slice() {
            ["client", "client_id"] => client.client_id.clone(),
            ["client", "exchange_url"] => client.exchange_url.clone(),
            ["client", "scope"] => client.scope.clone(),
            ["client", "api_base"] => client.api_base.clone(),
            ["client", "auth_base"] => client.auth_base.clone(),
            ["client", "timeout_ms"] => client.timeout_ms.to_string(),
            ["client", "max_file_size"] => client.max_file_size.to_string(),
            ["client", "default_extension"] => client.default_extension.clone(),
            ["auth", "remember"] => self.auth.remember.to_string(),
            ["auth", "token_path"] => self.auth.token_path.clone().unwrap_or_default(),
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        };

        Ok(value)
    }

    pub fn show_all(&self) -> String {
        let or_unset = |value: &str| {
            if value.is_empty() {
                "(not set)".to_string()
            } else {
                value.to_string()
            }
        };

        format!(
            "Configuration:\n\
             Client:\n\
             ├─ client_id: {}\n\
             ├─ exchange_url: {}\n\
             ├─ scope: {}\n\
             ├─ api_base: {}\n\
             ├─ auth_base: {}\n\
             ├─ timeout_ms: {}\n\
             ├─ max_file_size: {}\n\
             └─ default_extension: {}\n\
             Auth:\n\
             ├─ remember: {}\n\
             └─ token_path: {}",
            or_unset(&self.client.client_id),
            or_unset(&self.client.exchange_url),
            self.client.scope,
            self.client.api_base,
            self.client.auth_base,
            self.client.timeout_ms,
            self.client.max_file_size,
            self.client.default_extension,
            self.auth.remember,
            self.token_path().display(),
        )
    }

    pub async fn reset() -> Result<Self> {
        let config = Self::default();
        config.save().await?;
        Ok(config)
    }
}

/// Get the default configuration directory
fn get_default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "gitpad", "gitpad") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        PathBuf::from(".gitpad").join("config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get_values() {
        let mut config = Config::default();

        config.set_value("client.client_id", "abc").unwrap();
        config.set_value("client.timeout_ms", "1500").unwrap();
        config.set_value("auth.remember", "true").unwrap();

        assert_eq!(config.get_value("client.client_id").unwrap(), "abc");
        assert_eq!(config.client.timeout_ms, 1500);
        assert!(config.auth.remember);
        assert_eq!(
            config.get_value("client.api_base").unwrap(),
            "https://api.github.com"
        );
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        assert!(config.set_value("client.timeout_ms", "soon").is_err());
        assert!(config.set_value("auth.remember", "maybe").is_err());
        assert!(config.set_value("storage.path", "/tmp").is_err());
        assert!(config.get_value("client").is_err());
    }

    #[test]
    fn test_token_path_override() {
        let mut config = Config::default();
        config.set_value("auth.token_path", "/tmp/t.json").unwrap();
        assert_eq!(config.token_path(), PathBuf::from("/tmp/t.json"));

        config.set_value("auth.token_path", "").unwrap();
        assert_eq!(config.token_path(), FileTokenStore::default_path());
    }

    #[test]
    fn test_show_all_marks_unset_values() {
        let output = Config::default().show_all();
        assert!(output.contains("client_id: (not set)"));
        assert!(output.contains("scope: repo"));
    }

    #[tokio::test]
    async fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let config = Config::load_from(&path).await.unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let mut changed = config.clone();
        changed.set_value("client.client_id", "xyz").unwrap();
        changed.save_to(&path).await.unwrap();

        let reloaded = Config::load_from(&path).await.unwrap();
        assert_eq!(reloaded.client.client_id, "xyz");
    }
}
