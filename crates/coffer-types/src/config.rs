//! configuration types for coffer

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// main configuration for coffer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// database configuration.
    pub database: DatabaseConfig,

    /// encrypted blob store configuration.
    pub storage: StorageConfig,

    /// where the process-wide secret key comes from.
    pub secrets: SecretsConfig,

    /// log level (trace, debug, info, warn, error). defaults to info.
    pub log_level: Option<String>,
}

/// database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// database type: "sqlite" or "postgres".
    pub db_type: String,

    /// database connection string or file path.
    pub connection_string: String,

    /// sqlite specific options.
    pub sqlite: SqliteConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            connection_string: "/var/lib/coffer/db.sqlite".to_string(),
            sqlite: SqliteConfig::default(),
        }
    }
}

/// sqlite options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// enable write-ahead logging.
    pub write_ahead_log: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            write_ahead_log: true,
        }
    }
}

/// blob store configuration for file credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// directory holding encrypted file blobs. created on start.
    pub file_store_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_store_path: PathBuf::from("./filestore"),
        }
    }
}

/// secret key source.
///
/// the key is 32 bytes, hex encoded. `secret_key_file` wins over the
/// environment variable when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// name of the environment variable holding the hex key.
    pub secret_key_env: String,

    /// optional path to a file containing the hex key.
    pub secret_key_file: Option<PathBuf>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            secret_key_env: "COFFER_SECRET_KEY".to_string(),
            secret_key_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.db_type, "sqlite");
        assert!(config.database.sqlite.write_ahead_log);
        assert_eq!(config.storage.file_store_path, PathBuf::from("./filestore"));
        assert_eq!(config.secrets.secret_key_env, "COFFER_SECRET_KEY");
        assert!(config.secrets.secret_key_file.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            log_level = "debug"

            [database]
            connection_string = "/tmp/coffer.sqlite"

            [secrets]
            secret_key_file = "/run/secrets/coffer.key"
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.database.db_type, "sqlite");
        assert_eq!(config.database.connection_string, "/tmp/coffer.sqlite");
        assert!(config.database.sqlite.write_ahead_log);
        assert_eq!(config.secrets.secret_key_env, "COFFER_SECRET_KEY");
        assert_eq!(
            config.secrets.secret_key_file,
            Some(PathBuf::from("/run/secrets/coffer.key"))
        );
    }
}
