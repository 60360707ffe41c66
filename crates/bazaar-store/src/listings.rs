//! Listing create, lookup and delete.
//!
//! Creates and deletes touch the listing and its category counter in one
//! transaction. A create additionally commits the id reservation, so the
//! transaction has a fixed layout:
//!
//! | index | operation |
//! |---|---|
//! | 0 | put listing, `attribute_not_exists(ListingId)` |
//! | 1 | `SET Category = :category ADD CategoryCount 1` |
//! | 2 | sequence claim |

use std::sync::Arc;

use bazaar_core::{Listing, ListingDraft, ListingId, Price};
use chrono::Utc;

use crate::allocator::{IdAllocator, Reservation};
use crate::error::{CancellationReason, RepositoryError, TableError};
use crate::expr::{Condition, UpdateAction, WriteOp};
use crate::keys;
use crate::query::{Index, Query};
use crate::record::Record;
use crate::schema::attr;
use crate::Table;

const LISTING_OP: usize = 0;
const CLAIM_OP: usize = 2;

/// Result of a create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The listing was stored under a fresh id.
    Created(Listing),
    /// A listing already occupies the key.
    AlreadyExists,
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The listing was removed and its category counter decremented.
    Deleted,
    /// No listing has that id.
    NotFound,
    /// The listing belongs to someone else; nothing was written.
    OwnershipMismatch,
}

/// Listings and the category counters they drive.
#[derive(Clone)]
pub struct ListingRepository {
    table: Arc<dyn Table>,
    allocator: IdAllocator,
}

impl ListingRepository {
    /// Create a repository over a table.
    #[must_use]
    pub fn new(table: Arc<dyn Table>) -> Self {
        Self {
            allocator: IdAllocator::new(Arc::clone(&table)),
            table,
        }
    }

    /// The id allocator used for creates.
    #[must_use]
    pub const fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    /// Create a listing under the next free id.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::Validation` for an empty username, title or
    ///   category (nothing is written)
    /// - `RepositoryError::IdCollision` if a concurrent create committed the
    ///   reserved id first; the call may be repeated
    /// - `RepositoryError::Store` for any other store failure
    pub async fn create_listing(
        &self,
        username: &str,
        title: &str,
        description: &str,
        price: Price,
        category: &str,
    ) -> Result<CreateOutcome, RepositoryError> {
        let draft = ListingDraft::new(username, title, description, price, category)?;
        let reservation = self.allocator.reserve().await?;
        self.insert_reserved(&reservation, draft).await
    }

    async fn insert_reserved(
        &self,
        reservation: &Reservation,
        draft: ListingDraft,
    ) -> Result<CreateOutcome, RepositoryError> {
        let listing = Listing::from_draft(reservation.id(), draft, Utc::now());
        let ops = vec![
            WriteOp::Put {
                item: listing.to_item(),
                condition: Some(Condition::not_exists(attr::LISTING_ID)),
            },
            WriteOp::Update {
                key: keys::category_metric_key(&listing.category),
                actions: vec![
                    UpdateAction::set(attr::CATEGORY, listing.category.as_str()),
                    UpdateAction::add(attr::CATEGORY_COUNT, 1),
                ],
                condition: None,
            },
            reservation.claim(),
        ];

        match self.table.transact_write(ops).await {
            Ok(()) => {
                tracing::info!(
                    listing_id = %listing.id,
                    username = %listing.username,
                    category = %listing.category,
                    "Listing created"
                );
                Ok(CreateOutcome::Created(listing))
            }
            Err(TableError::TransactionCanceled { reasons }) => {
                log_reasons("create_listing", listing.id, &reasons);
                if failed_condition(&reasons, LISTING_OP) {
                    Ok(CreateOutcome::AlreadyExists)
                } else if failed_condition(&reasons, CLAIM_OP) {
                    Err(RepositoryError::IdCollision {
                        listing_id: listing.id,
                    })
                } else {
                    Err(TableError::TransactionCanceled { reasons }.into())
                }
            }
            Err(e) => {
                tracing::error!(listing_id = %listing.id, error = %e, "Failed to create listing");
                Err(e.into())
            }
        }
    }

    /// Look up a listing by id.
    ///
    /// # Errors
    ///
    /// Returns a store error, including `TableError::Decode` for a corrupt
    /// record.
    pub async fn get_listing(&self, listing_id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        let items = self
            .table
            .query(&Query::new(Index::Primary, listing_id.get()))
            .await?;
        if items.len() > 1 {
            tracing::warn!(
                listing_id = %listing_id,
                count = items.len(),
                "Multiple items share a listing id; using the first"
            );
        }
        Ok(items.first().map(Listing::from_item).transpose()?)
    }

    /// Delete a listing owned by `username`.
    ///
    /// # Errors
    ///
    /// Returns a store error, including a cancelled transaction when a
    /// concurrent delete removed the listing first.
    pub async fn delete_listing(
        &self,
        username: &str,
        listing_id: ListingId,
    ) -> Result<DeleteOutcome, RepositoryError> {
        let Some(listing) = self.get_listing(listing_id).await? else {
            return Ok(DeleteOutcome::NotFound);
        };
        if listing.username != username {
            tracing::debug!(
                listing_id = %listing_id,
                owner = %listing.username,
                requester = %username,
                "Delete refused: not the owner"
            );
            return Ok(DeleteOutcome::OwnershipMismatch);
        }

        let ops = vec![
            WriteOp::Delete {
                key: listing.key(),
                condition: Some(
                    Condition::equals(attr::LISTING_ID, listing_id.get())
                        .and(Condition::equals(attr::USERNAME, username)),
                ),
            },
            WriteOp::Update {
                key: keys::category_metric_key(&listing.category),
                actions: vec![UpdateAction::add(attr::CATEGORY_COUNT, -1)],
                condition: Some(Condition::greater_than(attr::CATEGORY_COUNT, 0)),
            },
        ];

        match self.table.transact_write(ops).await {
            Ok(()) => {
                tracing::info!(
                    listing_id = %listing_id,
                    category = %listing.category,
                    "Listing deleted"
                );
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                if let TableError::TransactionCanceled { reasons } = &e {
                    log_reasons("delete_listing", listing_id, reasons);
                }
                tracing::error!(listing_id = %listing_id, error = %e, "Failed to delete listing");
                Err(e.into())
            }
        }
    }
}

fn failed_condition(reasons: &[CancellationReason], op: usize) -> bool {
    reasons
        .get(op)
        .is_some_and(CancellationReason::is_condition_failure)
}

fn log_reasons(operation: &str, listing_id: ListingId, reasons: &[CancellationReason]) {
    for (op, reason) in reasons.iter().enumerate() {
        if *reason != CancellationReason::None {
            tracing::warn!(
                operation,
                listing_id = %listing_id,
                op,
                reason = ?reason,
                "Transaction item cancelled"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, Key};
    use crate::memory::MemoryTable;
    use bazaar_core::CategoryMetric;

    fn price(minor: i64) -> Price {
        Price::from_minor_units(minor).unwrap()
    }

    fn draft(username: &str) -> ListingDraft {
        ListingDraft::new(username, "Lamp", "", price(500), "Home").unwrap()
    }

    async fn count(table: &MemoryTable, category: &str) -> i64 {
        let item = table
            .get_item(&keys::category_metric_key(category))
            .await
            .unwrap()
            .unwrap();
        CategoryMetric::from_item(&item).unwrap().count
    }

    #[tokio::test]
    async fn same_reservation_commits_once() {
        let table = Arc::new(MemoryTable::new());
        let repo = ListingRepository::new(table.clone());

        let first = repo.allocator().reserve().await.unwrap();
        let second = repo.allocator().reserve().await.unwrap();
        assert_eq!(first.id(), second.id());

        let created = repo.insert_reserved(&first, draft("alice")).await.unwrap();
        assert!(matches!(created, CreateOutcome::Created(_)));

        let err = repo.insert_reserved(&second, draft("bob")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            RepositoryError::IdCollision { listing_id } if listing_id == ListingId::FIRST
        ));
        assert_eq!(count(&table, "Home").await, 1);
    }

    #[tokio::test]
    async fn occupied_key_is_already_exists() {
        let table = Arc::new(MemoryTable::new());
        // Not indexed, so the allocator does not see it.
        table
            .put_item(Item::from_key(&Key::new(100_001, "alice")), None)
            .await
            .unwrap();

        let repo = ListingRepository::new(table.clone());
        let outcome = repo
            .create_listing("alice", "Lamp", "", price(1), "Home")
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::AlreadyExists);
        assert!(table
            .get_item(&keys::category_metric_key("Home"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn delete_race_surfaces_store_error() {
        let table = Arc::new(MemoryTable::new());
        let repo = ListingRepository::new(table.clone());
        let CreateOutcome::Created(listing) = repo
            .create_listing("alice", "Lamp", "", price(1), "Home")
            .await
            .unwrap()
        else {
            panic!("expected create");
        };

        // Counter already at zero, as if a concurrent delete won.
        table
            .put_item(
                CategoryMetric::new("Home", 0).unwrap().to_item(),
                None,
            )
            .await
            .unwrap();

        let err = repo.delete_listing("alice", listing.id).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Store(TableError::TransactionCanceled { .. })
        ));
        assert!(repo.get_listing(listing.id).await.unwrap().is_some());
    }
}
