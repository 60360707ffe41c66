//! Command execution.
//!
//! Every command is checked in the same order: arity, then the user (all
//! commands but `REGISTER`), then argument validation, then the store call.

use bazaar_core::{ListingId, Price, SortBy, SortOrder};
use bazaar_store::{CreateOutcome, DeleteOutcome, Marketplace, RegisterOutcome};

use crate::command::Command;
use crate::config::CliConfig;
use crate::error::DispatchError;

/// Runs commands against the marketplace, one at a time.
#[derive(Clone)]
pub struct Dispatcher {
    market: Marketplace,
    allocation_retries: u32,
}

impl Dispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(market: Marketplace, config: &CliConfig) -> Self {
        Self {
            market,
            allocation_retries: config.allocation_retries,
        }
    }

    /// Execute one input line and return the reply, or `None` for a blank
    /// line.
    pub async fn dispatch(&self, line: &str) -> Option<String> {
        let result = match Command::parse(line) {
            Ok(None) => return None,
            Ok(Some(command)) => self.execute(command).await,
            Err(e) => Err(e),
        };

        Some(match result {
            Ok(reply) => reply,
            Err(e) => {
                match &e {
                    DispatchError::Store(err) => {
                        tracing::error!(command = %line, error = %err, "Command failed");
                    }
                    DispatchError::UnknownCommand(name) => {
                        tracing::warn!(command = %name, "Unknown command");
                    }
                    other => tracing::debug!(error = %other, "Command rejected"),
                }
                e.reply().to_string()
            }
        })
    }

    async fn execute(&self, command: Command) -> Result<String, DispatchError> {
        if command.requires_user() {
            self.authenticate(command.username()).await?;
        }

        match command {
            Command::Register { username } => self.register(&username).await,
            Command::CreateListing {
                username,
                title,
                description,
                price,
                category,
            } => {
                let price: Price = price.parse()?;
                self.create_listing(&username, &title, &description, price, &category)
                    .await
            }
            Command::GetListing { listing_id, .. } => {
                let listing_id: ListingId = listing_id.parse()?;
                Ok(match self.market.listings().get_listing(listing_id).await? {
                    Some(listing) => listing.to_string(),
                    None => "Error - not found".into(),
                })
            }
            Command::GetCategory { category, sort, .. } => {
                let (sort_by, order) = match sort {
                    Some((key, order)) => (key.parse::<SortBy>()?, order.parse::<SortOrder>()?),
                    None => (SortBy::default(), SortOrder::default()),
                };
                let listings = self
                    .market
                    .categories()
                    .get_category(&category, sort_by, order)
                    .await?;
                if listings.is_empty() {
                    return Ok("Error - category not found".into());
                }
                Ok(listings
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::GetTopCategory { .. } => {
                Ok(match self.market.categories().get_top_category().await? {
                    Some(category) => category,
                    None => "Error - no category found".into(),
                })
            }
            Command::DeleteListing {
                username,
                listing_id,
            } => {
                let listing_id: ListingId = listing_id.parse()?;
                let outcome = self
                    .market
                    .listings()
                    .delete_listing(&username, listing_id)
                    .await?;
                Ok(match outcome {
                    DeleteOutcome::Deleted => "Success",
                    DeleteOutcome::OwnershipMismatch => "Error - listing owner mismatch",
                    DeleteOutcome::NotFound => "Error - listing does not exist",
                }
                .into())
            }
        }
    }

    async fn authenticate(&self, username: &str) -> Result<(), DispatchError> {
        match self.market.users().get_user(username).await? {
            Some(_) => Ok(()),
            None => Err(DispatchError::UnknownUser),
        }
    }

    async fn register(&self, username: &str) -> Result<String, DispatchError> {
        Ok(match self.market.users().register(username).await? {
            RegisterOutcome::Registered(_) => "Success",
            RegisterOutcome::AlreadyExists => "Error - user already existing",
        }
        .into())
    }

    async fn create_listing(
        &self,
        username: &str,
        title: &str,
        description: &str,
        price: Price,
        category: &str,
    ) -> Result<String, DispatchError> {
        let mut attempt = 0;
        loop {
            let result = self
                .market
                .listings()
                .create_listing(username, title, description, price, category)
                .await;

            match result {
                Ok(CreateOutcome::Created(listing)) => return Ok(listing.id.to_string()),
                Ok(CreateOutcome::AlreadyExists) => {
                    return Ok("Error - listing already existing".into())
                }
                Err(e) if e.is_retryable() && attempt < self.allocation_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "Retrying listing id allocation");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use bazaar_store::{
        CancellationReason, Condition, Item, Key, MemoryTable, Query, Table, TableError, WriteOp,
    };

    use super::*;

    /// Loses the id race on the first `losses` creates.
    struct ContendedTable {
        inner: MemoryTable,
        losses: AtomicU32,
    }

    #[async_trait]
    impl Table for ContendedTable {
        async fn get_item(&self, key: &Key) -> bazaar_store::Result<Option<Item>> {
            self.inner.get_item(key).await
        }

        async fn put_item(
            &self,
            item: Item,
            condition: Option<Condition>,
        ) -> bazaar_store::Result<()> {
            self.inner.put_item(item, condition).await
        }

        async fn transact_write(&self, ops: Vec<WriteOp>) -> bazaar_store::Result<()> {
            let lose = ops.len() == 3
                && self
                    .losses
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
            if lose {
                return Err(TableError::TransactionCanceled {
                    reasons: vec![
                        CancellationReason::None,
                        CancellationReason::None,
                        CancellationReason::ConditionalCheckFailed,
                    ],
                });
            }
            self.inner.transact_write(ops).await
        }

        async fn query(&self, query: &Query) -> bazaar_store::Result<Vec<Item>> {
            self.inner.query(query).await
        }
    }

    async fn dispatcher(losses: u32, retries: u32) -> Dispatcher {
        let table = Arc::new(ContendedTable {
            inner: MemoryTable::new(),
            losses: AtomicU32::new(losses),
        });
        let config = CliConfig {
            allocation_retries: retries,
            ..CliConfig::default()
        };
        let dispatcher = Dispatcher::new(Marketplace::new(table).unwrap(), &config);
        assert_eq!(dispatcher.dispatch("REGISTER alice").await.unwrap(), "Success");
        dispatcher
    }

    #[tokio::test]
    async fn create_retries_lost_id_race() {
        let dispatcher = dispatcher(2, 3).await;
        assert_eq!(
            dispatcher
                .dispatch("CREATE_LISTING alice Lamp '' 5 Home")
                .await
                .unwrap(),
            "100001"
        );
    }

    #[tokio::test]
    async fn create_gives_up_after_retries() {
        let dispatcher = dispatcher(5, 1).await;
        assert_eq!(
            dispatcher
                .dispatch("CREATE_LISTING alice Lamp '' 5 Home")
                .await
                .unwrap(),
            "Error - internal server error"
        );
    }

    #[tokio::test]
    async fn price_errors() {
        let dispatcher = dispatcher(0, 0).await;
        for price in ["abc", "12.134", "-1"] {
            assert_eq!(
                dispatcher
                    .dispatch(&format!("CREATE_LISTING alice Lamp '' {price} Home"))
                    .await
                    .unwrap(),
                "Error - invalid price"
            );
        }
    }

    #[tokio::test]
    async fn unknown_user_checked_before_arguments() {
        let dispatcher = dispatcher(0, 0).await;
        assert_eq!(
            dispatcher.dispatch("GET_LISTING bob 100xxx").await.unwrap(),
            "Error - unknown user"
        );
        assert_eq!(
            dispatcher.dispatch("GET_LISTING alice 100xxx").await.unwrap(),
            "Error - invalid input"
        );
    }

    #[tokio::test]
    async fn blank_lines_are_silent() {
        let dispatcher = dispatcher(0, 0).await;
        assert_eq!(dispatcher.dispatch("").await, None);
        assert_eq!(dispatcher.dispatch("   ").await, None);
        assert_eq!(
            dispatcher.dispatch("HELLO").await.as_deref(),
            Some("Unknown command")
        );
    }

    #[tokio::test]
    async fn top_category_when_empty() {
        let dispatcher = dispatcher(0, 0).await;
        assert_eq!(
            dispatcher.dispatch("GET_TOP_CATEGORY alice").await.unwrap(),
            "Error - no category found"
        );
    }
}
