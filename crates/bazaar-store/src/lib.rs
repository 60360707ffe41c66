//! Single-table storage layer for bazaar.
//!
//! Users, listings, per-category counters and the listing id sequence all
//! live in one table keyed by `(ListingId, Username)`. Non-listing records
//! occupy reserved negative partitions (see [`schema`]).
//!
//! # Architecture
//!
//! - [`Table`]: the store capability (point get, conditional put, atomic
//!   multi-item writes, indexed queries)
//! - Backends: [`MemoryTable`], `DynamoTable` (feature `dynamodb-backend`)
//!   and `RocksTable` (feature `rocksdb-backend`)
//! - Repositories: [`UserRepository`], [`ListingRepository`],
//!   [`CategoryQueries`], sharing one table handle through [`Marketplace`]
//!
//! Every listing create and delete updates the category counter in the same
//! transaction, so `CategoryCount` always equals the number of live listings.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bazaar_core::Price;
//! use bazaar_store::{CreateOutcome, Marketplace, MemoryTable};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let market = Marketplace::new(Arc::new(MemoryTable::new()))?;
//! market.users().register("alice").await?;
//!
//! let price = Price::from_minor_units(1000)?;
//! if let CreateOutcome::Created(listing) = market
//!     .listings()
//!     .create_listing("alice", "Phone", "desc", price, "Electronics")
//!     .await?
//! {
//!     println!("{}", listing.id);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod allocator;
pub mod categories;
pub mod error;
pub mod expr;
pub mod item;
pub mod keys;
pub mod listings;
pub mod memory;
pub mod query;
pub mod record;
pub mod schema;
pub mod users;

#[cfg(feature = "dynamodb-backend")]
pub mod dynamo;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;

use std::sync::Arc;

use async_trait::async_trait;

pub use allocator::{IdAllocator, Reservation};
pub use categories::CategoryQueries;
pub use error::{CancellationReason, RepositoryError, Result, TableError};
pub use expr::{Condition, UpdateAction, WriteOp};
pub use item::{AttrValue, Item, Key};
pub use listings::{CreateOutcome, DeleteOutcome, ListingRepository};
pub use memory::MemoryTable;
pub use query::{Index, Query, SortKeyCondition};
pub use record::Record;
pub use users::{RegisterOutcome, UserRepository};

#[cfg(feature = "dynamodb-backend")]
pub use dynamo::{DynamoConfig, DynamoTable};
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksTable;

/// The table capability every backend provides.
///
/// Implementations must make `transact_write` all-or-nothing and evaluate
/// every condition against the state the writes are applied to.
#[async_trait]
pub trait Table: Send + Sync {
    /// Read one item by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get_item(&self, key: &Key) -> Result<Option<Item>>;

    /// Write one item, optionally conditioned on the item it replaces.
    ///
    /// # Errors
    ///
    /// Returns `TableError::ConditionalCheckFailed` if the condition does not
    /// hold, or a backend error.
    async fn put_item(&self, item: Item, condition: Option<Condition>) -> Result<()>;

    /// Apply several writes atomically.
    ///
    /// # Errors
    ///
    /// Returns `TableError::TransactionCanceled` with one reason per
    /// operation if any condition fails, or a backend error.
    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<()>;

    /// Run an indexed query, following every result page.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn query(&self, query: &Query) -> Result<Vec<Item>>;
}

/// The repositories over one shared table handle.
#[derive(Clone)]
pub struct Marketplace {
    users: UserRepository,
    listings: ListingRepository,
    categories: CategoryQueries,
}

impl Marketplace {
    /// Build the repositories after verifying the reserved key layout.
    ///
    /// # Errors
    ///
    /// Returns `TableError::InvalidKeyLayout` if the sentinel partitions
    /// overlap.
    pub fn new(table: Arc<dyn Table>) -> Result<Self> {
        schema::verify_key_layout()?;
        Ok(Self {
            users: UserRepository::new(Arc::clone(&table)),
            listings: ListingRepository::new(Arc::clone(&table)),
            categories: CategoryQueries::new(table),
        })
    }

    /// User registration and lookup.
    #[must_use]
    pub const fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Listing create, lookup and delete.
    #[must_use]
    pub const fn listings(&self) -> &ListingRepository {
        &self.listings
    }

    /// Category browse and top-category queries.
    #[must_use]
    pub const fn categories(&self) -> &CategoryQueries {
        &self.categories
    }
}
