//! Configuration for the relq server
//!
//! Loaded from a YAML file with `server`, `logging` and `allowlist`
//! sections. Environment variables always override file values. The
//! allowlist section is deserialized once into the immutable snapshot the
//! translators share; the server never reloads it.

use relq_schema::Allowlist;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific filter
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub allowlist: Allowlist,
}

impl Config {
    /// Load configuration from a YAML file with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        if let Ok(host) = std::env::var("RELQ_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("RELQ_SERVER_PORT") {
            if let Ok(port) = port.parse() {
                config.server.port = port;
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            config.logging.output = output;
        }
        if let Ok(directory) = std::env::var("LOG_DIR") {
            config.logging.directory = directory;
        }

        Ok(config)
    }

    /// Publish the logging section as environment variables for the logging
    /// module, which reads its settings from the environment.
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert!(config.allowlist.is_empty());
    }

    #[test]
    fn loads_allowlist_section() {
        let config_yaml = r#"
server:
  host: "0.0.0.0"
  port: 9000
allowlist:
  orders:
    columns: [id, total]
    jsonb: ["meta->>'region'"]
"#;
        let temp_file = std::env::temp_dir().join("relq_test_config.yaml");
        std::fs::write(&temp_file, config_yaml).unwrap();

        let config = Config::load(&temp_file).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.allowlist.is_table_allowed("orders"));
        assert!(config.allowlist.is_jsonb_field_allowed("orders", "meta->>'region'"));

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn env_var_overrides_file() {
        std::env::set_var("RELQ_SERVER_PORT", "9090");

        let config_yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
"#;
        let temp_file = std::env::temp_dir().join("relq_test_config_env.yaml");
        std::fs::write(&temp_file, config_yaml).unwrap();

        let config = Config::load(&temp_file).unwrap();
        assert_eq!(config.server.port, 9090);

        std::env::remove_var("RELQ_SERVER_PORT");
        std::fs::remove_file(temp_file).ok();
    }
}
