//! `RocksDB` table implementation.
//!
//! All items live in one column family, keyed by the ordered
//! `(ListingId, Username)` encoding from [`keys`](crate::keys). Secondary
//! indexes are not materialised; index queries scan and sort.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crate::error::{Result, TableError};
use crate::expr::{plan_writes, Condition, Mutation, WriteOp};
use crate::item::{Item, Key};
use crate::keys;
use crate::query::{select, Index, Query};
use crate::schema::{all_column_families, cf};
use crate::Table;

/// RocksDB-backed table.
pub struct RocksTable {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes conditional writes so checks and writes see the same state.
    write_lock: Mutex<()>,
}

impl RocksTable {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| TableError::Backend(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| TableError::Backend(format!("column family not found: {name}")))
    }

    /// Serialize an item using CBOR.
    fn serialize(item: &Item) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(item, &mut buf)
            .map_err(|e| TableError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize an item from CBOR.
    fn deserialize(data: &[u8]) -> Result<Item> {
        ciborium::from_reader(data).map_err(|e| TableError::Serialization(e.to_string()))
    }

    fn read(&self, key: &Key) -> Result<Option<Item>> {
        let cf = self.cf(cf::ITEMS)?;
        self.db
            .get_cf(&cf, keys::encode_key(key))
            .map_err(|e| TableError::Backend(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| TableError::Backend("write lock poisoned".into()))
    }

    /// Every item in one partition, in key order.
    fn scan_partition(&self, partition: i64) -> Result<Vec<Item>> {
        let cf = self.cf(cf::ITEMS)?;
        let prefix = keys::partition_prefix(partition);
        let mut items = Vec::new();

        for entry in self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) = entry.map_err(|e| TableError::Backend(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            items.push(Self::deserialize(&value)?);
        }
        Ok(items)
    }

    fn scan_all(&self) -> Result<Vec<Item>> {
        let cf = self.cf(cf::ITEMS)?;
        self.db
            .iterator_cf(&cf, IteratorMode::Start)
            .map(|entry| {
                let (_, value) = entry.map_err(|e| TableError::Backend(e.to_string()))?;
                Self::deserialize(&value)
            })
            .collect()
    }
}

#[async_trait]
impl Table for RocksTable {
    async fn get_item(&self, key: &Key) -> Result<Option<Item>> {
        self.read(key)
    }

    async fn put_item(&self, item: Item, condition: Option<Condition>) -> Result<()> {
        let key = item.key()?;
        let value = Self::serialize(&item)?;

        let _guard = self.lock()?;
        if let Some(condition) = condition {
            if !condition.evaluate(self.read(&key)?.as_ref()) {
                return Err(TableError::ConditionalCheckFailed);
            }
        }

        let cf = self.cf(cf::ITEMS)?;
        self.db
            .put_cf(&cf, keys::encode_key(&key), value)
            .map_err(|e| TableError::Backend(e.to_string()))
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<()> {
        let _guard = self.lock()?;
        let mutations = plan_writes(ops, |key| self.read(key))?;

        let cf = self.cf(cf::ITEMS)?;
        let mut batch = WriteBatch::default();
        for mutation in mutations {
            match mutation {
                Mutation::Put(key, item) => {
                    batch.put_cf(&cf, keys::encode_key(&key), Self::serialize(&item)?);
                }
                Mutation::Delete(key) => batch.delete_cf(&cf, keys::encode_key(&key)),
            }
        }

        self.db
            .write(batch)
            .map_err(|e| TableError::Backend(e.to_string()))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Item>> {
        let candidates = match (query.index, query.partition.as_n()) {
            (Index::Primary | Index::CategoryCount, Some(partition)) => {
                self.scan_partition(partition)?
            }
            _ => self.scan_all()?,
        };
        Ok(select(candidates, query))
    }
}
