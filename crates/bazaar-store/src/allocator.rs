//! Listing identifier allocation.
//!
//! The last committed id lives in a sequence record (partition `-3`). A
//! [`Reservation`] remembers the value it read, and its [`claim`] write only
//! succeeds while the record still holds that value, so two creates that
//! reserved the same id cannot both commit.
//!
//! Tables written before the sequence record existed are seeded from
//! `ListingIdIndex`.
//!
//! [`claim`]: Reservation::claim

use std::sync::Arc;

use bazaar_core::{ListingId, FIRST_LISTING_ID};

use crate::error::{Result, TableError};
use crate::expr::{Condition, UpdateAction, WriteOp};
use crate::keys;
use crate::query::{Index, Query};
use crate::schema::{attr, LISTING_ID_INDEX_PARTITION};
use crate::Table;

/// An id read from the sequence, not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    id: ListingId,
    previous: Option<i64>,
}

impl Reservation {
    /// The reserved identifier.
    #[must_use]
    pub const fn id(&self) -> ListingId {
        self.id
    }

    /// The sequence update that commits this reservation.
    ///
    /// Conditioned on the sequence still holding the value read at
    /// reservation time (or still being absent).
    #[must_use]
    pub fn claim(&self) -> WriteOp {
        let condition = match self.previous {
            Some(previous) => Condition::equals(attr::LAST_LISTING_ID, previous),
            None => Condition::not_exists(attr::LISTING_ID),
        };
        WriteOp::Update {
            key: keys::sequence_key(),
            actions: vec![UpdateAction::set(attr::LAST_LISTING_ID, self.id.get())],
            condition: Some(condition),
        }
    }
}

/// Hands out listing identifiers.
#[derive(Clone)]
pub struct IdAllocator {
    table: Arc<dyn Table>,
}

impl IdAllocator {
    /// Create an allocator over a table.
    #[must_use]
    pub fn new(table: Arc<dyn Table>) -> Self {
        Self { table }
    }

    /// The id the next successful create would receive.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or the sequence record
    /// is corrupt.
    pub async fn next_listing_id(&self) -> Result<ListingId> {
        Ok(self.reserve().await?.id)
    }

    /// Read the sequence and reserve the id after it.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or the sequence record
    /// is corrupt.
    pub async fn reserve(&self) -> Result<Reservation> {
        let (previous, last) = match self.table.get_item(&keys::sequence_key()).await? {
            Some(item) => {
                let last = item.n(attr::LAST_LISTING_ID)?;
                (Some(last), Some(last))
            }
            None => (None, self.highest_indexed_id().await?),
        };

        let next = match last {
            Some(last) => last
                .checked_add(1)
                .ok_or_else(|| TableError::Backend("listing id sequence exhausted".into()))?
                .max(FIRST_LISTING_ID),
            None => FIRST_LISTING_ID,
        };
        let id = ListingId::new(next).map_err(|e| TableError::Backend(e.to_string()))?;

        tracing::debug!(listing_id = %id, seeded = previous.is_none(), "Reserved listing id");
        Ok(Reservation { id, previous })
    }

    /// Highest listing id present in `ListingIdIndex`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the index query fails.
    pub async fn highest_indexed_id(&self) -> Result<Option<i64>> {
        let query = Query::new(Index::ListingId, LISTING_ID_INDEX_PARTITION)
            .ascending(false)
            .limit(1);
        self.table
            .query(&query)
            .await?
            .first()
            .map(|item| item.n(attr::LISTING_ID))
            .transpose()
    }
}
