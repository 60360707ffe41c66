//! CLI configuration.

use std::fmt;
use std::str::FromStr;

/// Table backend selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// Amazon DynamoDB (or DynamoDB Local).
    #[default]
    DynamoDb,
    /// Embedded `RocksDB` directory.
    RocksDb,
    /// Process memory; everything is lost on exit.
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamodb" | "dynamo" => Ok(Self::DynamoDb),
            "rocksdb" | "rocks" => Ok(Self::RocksDb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DynamoDb => "dynamodb",
            Self::RocksDb => "rocksdb",
            Self::Memory => "memory",
        })
    }
}

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Table backend (default: dynamodb).
    pub backend: Backend,

    /// DynamoDB endpoint override (default: `http://localhost:8000`).
    /// An empty `DYNAMODB_ENDPOINT` selects the regular AWS endpoint.
    pub dynamodb_endpoint: Option<String>,

    /// AWS region (default: "eu-west-1").
    pub region: String,

    /// Table name (default: "Listing").
    pub table_name: String,

    /// Path to the `RocksDB` data directory (default: "./data/bazaar").
    pub data_dir: String,

    /// DynamoDB operation timeout in milliseconds.
    pub timeout_ms: u64,

    /// Create the DynamoDB table at startup when missing.
    pub create_table: bool,

    /// How often `CREATE_LISTING` retries after losing an id race.
    pub allocation_retries: u32,
}

impl CliConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend = match std::env::var("BAZAAR_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, fallback = %defaults.backend, "Invalid BAZAAR_BACKEND");
                defaults.backend
            }),
            Err(_) => defaults.backend,
        };

        Self {
            backend,
            dynamodb_endpoint: match std::env::var("DYNAMODB_ENDPOINT") {
                Ok(endpoint) if endpoint.trim().is_empty() => None,
                Ok(endpoint) => Some(endpoint),
                Err(_) => defaults.dynamodb_endpoint,
            },
            region: std::env::var("AWS_REGION").unwrap_or(defaults.region),
            table_name: std::env::var("BAZAAR_TABLE").unwrap_or(defaults.table_name),
            data_dir: std::env::var("BAZAAR_DATA_DIR").unwrap_or(defaults.data_dir),
            timeout_ms: std::env::var("BAZAAR_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            create_table: std::env::var("BAZAAR_CREATE_TABLE")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.create_table),
            allocation_retries: std::env::var("BAZAAR_ALLOCATION_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.allocation_retries),
        }
    }

    /// Settings for the DynamoDB table handle.
    #[cfg(feature = "dynamodb-backend")]
    #[must_use]
    pub fn dynamo_config(&self) -> bazaar_store::DynamoConfig {
        bazaar_store::DynamoConfig {
            table_name: self.table_name.clone(),
            region: Some(self.region.clone()),
            endpoint: self.dynamodb_endpoint.clone(),
            timeout_ms: Some(self.timeout_ms),
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            dynamodb_endpoint: Some("http://localhost:8000".into()),
            region: "eu-west-1".into(),
            table_name: bazaar_store::schema::DEFAULT_TABLE_NAME.into(),
            data_dir: "./data/bazaar".into(),
            timeout_ms: 5000,
            create_table: true,
            allocation_retries: 3,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CliConfig::default();
        assert_eq!(config.backend, Backend::DynamoDb);
        assert_eq!(config.table_name, "Listing");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.allocation_retries, 3);
        assert!(config.create_table);
    }

    #[test]
    fn backend_names() {
        assert_eq!("memory".parse::<Backend>(), Ok(Backend::Memory));
        assert_eq!(" RocksDB ".parse::<Backend>(), Ok(Backend::RocksDb));
        assert!("postgres".parse::<Backend>().is_err());
        assert_eq!(Backend::DynamoDb.to_string(), "dynamodb");
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
