//! In-memory table, used by tests and ephemeral sessions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, TableError};
use crate::expr::{plan_writes, Condition, Mutation, WriteOp};
use crate::item::{Item, Key};
use crate::query::{select, Index, Query};
use crate::Table;

/// A `BTreeMap` of items behind an async mutex.
///
/// Each operation holds the lock for its whole duration, so transactions are
/// checked and applied as one step.
#[derive(Debug, Default)]
pub struct MemoryTable {
    items: Mutex<BTreeMap<Key, Item>>,
}

impl MemoryTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items, sentinel records included.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Whether the table holds no items.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl Table for MemoryTable {
    async fn get_item(&self, key: &Key) -> Result<Option<Item>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn put_item(&self, item: Item, condition: Option<Condition>) -> Result<()> {
        let key = item.key()?;
        let mut items = self.items.lock().await;
        if let Some(condition) = condition {
            if !condition.evaluate(items.get(&key)) {
                return Err(TableError::ConditionalCheckFailed);
            }
        }
        items.insert(key, item);
        Ok(())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<()> {
        let mut items = self.items.lock().await;
        let mutations = plan_writes(ops, |key| Ok(items.get(key).cloned()))?;
        for mutation in mutations {
            match mutation {
                Mutation::Put(key, item) => {
                    items.insert(key, item);
                }
                Mutation::Delete(key) => {
                    items.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Item>> {
        let items = self.items.lock().await;
        let candidates: Vec<Item> = match (query.index, query.partition.as_n()) {
            (Index::Primary | Index::CategoryCount, Some(partition)) => items
                .range(Key::new(partition, "")..)
                .take_while(|(key, _)| key.partition == partition)
                .map(|(_, item)| item.clone())
                .collect(),
            _ => items.values().cloned().collect(),
        };
        Ok(select(candidates, query))
    }
}
