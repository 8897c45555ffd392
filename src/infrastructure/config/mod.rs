//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::application::errors::{ConfigError, StorageError};
use crate::application::services::DEFAULT_KEY_PREFIX;
use crate::domain::entities::User;
use crate::domain::traits::Store;
use crate::infrastructure::database::SqliteStore;
use crate::infrastructure::storage::{FileStore, MemoryStore};

/// Favorites configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    Sqlite,
}

impl StorageBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(StorageBackend::Memory),
            "file" => Some(StorageBackend::File),
            "sqlite" => Some(StorageBackend::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for `file`, database file for `sqlite`
    pub path: PathBuf,
    pub key_prefix: String,
    pub quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::File,
                path: PathBuf::from("./data"),
                key_prefix: DEFAULT_KEY_PREFIX.to_string(),
                // browsers commonly allow ~5 MB per origin
                quota_bytes: Some(5 * 1024 * 1024),
            },
            session: SessionConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.key_prefix.is_empty() {
            return Err(ConfigError::MissingField("storage.key-prefix".to_string()));
        }
        if self.storage.backend != StorageBackend::Memory && self.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("storage.path".to_string()));
        }
        Ok(())
    }

    /// Defaults overridden by FAVORITES_* environment variables
    pub fn load_env() -> Result<Self, ConfigError> {
        Config::default().with_env()
    }

    /// Copy of this config with FAVORITES_* overrides applied. On error the
    /// original is untouched, so a bad variable never discards file settings.
    pub fn with_env(&self) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(backend) = std::env::var("FAVORITES_BACKEND") {
            self.storage.backend = StorageBackend::parse(&backend)
                .ok_or_else(|| ConfigError::InvalidValue(format!("FAVORITES_BACKEND={}", backend)))?;
        }

        if let Ok(path) = std::env::var("FAVORITES_PATH") {
            self.storage.path = PathBuf::from(path);
        }

        if let Ok(prefix) = std::env::var("FAVORITES_KEY_PREFIX") {
            self.storage.key_prefix = prefix;
        }

        if let Ok(user) = std::env::var("FAVORITES_USER") {
            self.session.user_id = Some(user);
        }

        self.validate()
    }

    /// The configured session user, if one is set
    pub fn session_user(&self) -> Option<User> {
        let id = self.session.user_id.as_ref()?;
        let user = User::new(id);
        Some(match &self.session.display_name {
            Some(name) => user.with_display_name(name),
            None => user,
        })
    }

    /// Opens the configured backend
    pub async fn open_store(&self) -> Result<Arc<dyn Store>, StorageError> {
        let store: Arc<dyn Store> = match self.storage.backend {
            StorageBackend::Memory => {
                let store = MemoryStore::new();
                Arc::new(match self.storage.quota_bytes {
                    Some(quota) => store.with_quota(quota),
                    None => store,
                })
            }
            StorageBackend::File => {
                let store = FileStore::new(&self.storage.path).with_quota(self.storage.quota_bytes);
                store.init().await?;
                Arc::new(store)
            }
            StorageBackend::Sqlite => {
                if let Some(parent) = self.storage.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Arc::new(SqliteStore::new(&self.storage.path)?)
            }
        };

        tracing::debug!(backend = ?self.storage.backend, path = %self.storage.path.display(), "Opened favorites store");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_yaml() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("key-prefix: favorites_"));

        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.storage.backend, StorageBackend::File);
        assert!(parsed.session_user().is_none());
    }

    #[test]
    fn test_parse_yaml() {
        let config: Config = serde_yaml::from_str(
            "storage:\n  backend: sqlite\n  path: /tmp/fav.db\n  key-prefix: likes_\n  quota-bytes: null\nsession:\n  user-id: u1\n  display-name: Ada\n",
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.key_prefix, "likes_");
        assert_eq!(config.session_user().unwrap().name(), "Ada");
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let mut config = Config::default();
        config.storage.key_prefix.clear();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn test_bad_env_override_keeps_file_settings() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = PathBuf::from("/x.db");

        std::env::set_var("FAVORITES_BACKEND", "sqlte");
        let result = config.with_env();
        let from_env = Config::load_env();
        std::env::remove_var("FAVORITES_BACKEND");

        assert!(from_env.is_err());
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, PathBuf::from("/x.db"));
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;

        let store = config.open_store().await.unwrap();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
