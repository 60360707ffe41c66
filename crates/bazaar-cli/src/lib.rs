//! Bazaar command dispatcher.
//!
//! Reads one command per line and replies with one line (or one line per
//! listing for `GET_CATEGORY`):
//!
//! - `REGISTER <username>`
//! - `CREATE_LISTING <username> <title> <description> <price> <category>`
//! - `GET_LISTING <username> <listing_id>`
//! - `GET_CATEGORY <username> <category> [sort_price|sort_time asc|dsc]`
//! - `GET_TOP_CATEGORY <username>`
//! - `DELETE_LISTING <username> <listing_id>`
//!
//! ## Configuration
//!
//! All settings come from environment variables, see [`CliConfig`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;

use std::sync::Arc;

use bazaar_store::{MemoryTable, Table, TableError};

pub use command::{tokenize, Command};
pub use config::{Backend, CliConfig};
pub use dispatch::Dispatcher;
pub use error::DispatchError;

/// How long startup waits for a newly created table to become active.
#[cfg(feature = "dynamodb-backend")]
const TABLE_READY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

/// Open the table selected by `config.backend`.
///
/// # Errors
///
/// Returns `TableError::Configuration` if the backend was not compiled in,
/// or the backend's error if it cannot be opened.
pub async fn open_table(config: &CliConfig) -> Result<Arc<dyn Table>, TableError> {
    match config.backend {
        Backend::Memory => {
            tracing::warn!("Using the in-memory backend; data is lost on exit");
            Ok(Arc::new(MemoryTable::new()))
        }

        #[cfg(feature = "dynamodb-backend")]
        Backend::DynamoDb => {
            let table = bazaar_store::DynamoTable::from_env(config.dynamo_config()).await;
            tracing::info!(
                table = %table.table_name(),
                endpoint = ?config.dynamodb_endpoint,
                "Using DynamoDB backend"
            );
            if config.create_table {
                table.ensure_table(TABLE_READY_TIMEOUT).await?;
            }
            Ok(Arc::new(table))
        }

        #[cfg(feature = "rocksdb-backend")]
        Backend::RocksDb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB table");
            Ok(Arc::new(bazaar_store::RocksTable::open(&config.data_dir)?))
        }

        #[allow(unreachable_patterns)]
        other => Err(TableError::Configuration(format!(
            "backend {other} is not enabled in this build"
        ))),
    }
}
