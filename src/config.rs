use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory (local) or object prefix (gcs) holding `<table>.json` documents
    pub db_path: String,
    /// Directory (local) or object prefix (gcs) holding blobs and sidecars
    pub file_path: String,
    /// GCS bucket name (required when backend is gcs)
    pub gcs_bucket: Option<String>,
    /// Path to GCS service account JSON (optional, defaults to the metadata server)
    pub gcs_credentials_file: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            db_path: "gallery_db".to_string(),
            file_path: "./files".to_string(),
            gcs_bucket: None,
            gcs_credentials_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = StorageConfig::default();

        let backend = match var("STORAGE_BACKEND")
            .unwrap_or_else(|| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageBackend::Local,
            "gcs" => StorageBackend::Gcs,
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "STORAGE_BACKEND must be local or gcs, got {other}"
                )))
            }
        };

        let config = Config {
            storage: StorageConfig {
                backend,
                db_path: var("DB_PATH").unwrap_or(defaults.db_path),
                file_path: var("FILE_PATH").unwrap_or(defaults.file_path),
                gcs_bucket: var("GCS_BUCKET").filter(|s| !s.is_empty()),
                gcs_credentials_file: var("GCS_CREDENTIALS_FILE").filter(|s| !s.is_empty()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.db_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DB_PATH cannot be empty".to_string(),
            ));
        }

        if self.storage.file_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "FILE_PATH cannot be empty".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Gcs && self.storage.gcs_bucket.is_none() {
            return Err(ConfigError::ValidationError(
                "GCS_BUCKET is required when STORAGE_BACKEND=gcs".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Local
            && self.storage.db_path == self.storage.file_path
        {
            tracing::warn!(
                "DB_PATH and FILE_PATH are the same directory; table documents may collide \
                 with blobs named <table>.json"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.db_path, "gallery_db");
        assert_eq!(config.storage.file_path, "./files");
    }

    #[test]
    fn test_gcs_requires_bucket() {
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "gcs")]),
            Err(ConfigError::ValidationError(_))
        ));

        let config = load(&[("STORAGE_BACKEND", "GCS"), ("GCS_BUCKET", "media")]).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Gcs);
        assert_eq!(config.storage.gcs_bucket.as_deref(), Some("media"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(load(&[("STORAGE_BACKEND", "s3")]).is_err());
    }

    #[test]
    fn test_rejects_empty_paths() {
        assert!(load(&[("DB_PATH", " ")]).is_err());
        assert!(load(&[("FILE_PATH", "")]).is_err());
    }
}
