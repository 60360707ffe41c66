//! Key construction for each record kind, plus the ordered byte encoding
//! used by the `RocksDB` backend.

use bazaar_core::ListingId;

use crate::item::Key;
use crate::schema::{
    CATEGORY_METRIC_PARTITION, SEQUENCE_PARTITION, SEQUENCE_SORT_KEY, USER_PARTITION,
};

/// Key of a user record.
#[must_use]
pub fn user_key(username: &str) -> Key {
    Key::new(USER_PARTITION, username)
}

/// Key of a listing record.
#[must_use]
pub fn listing_key(listing_id: ListingId, username: &str) -> Key {
    Key::new(listing_id.get(), username)
}

/// Key of a category metric record.
#[must_use]
pub fn category_metric_key(category: &str) -> Key {
    Key::new(CATEGORY_METRIC_PARTITION, category)
}

/// Key of the listing id sequence record.
#[must_use]
pub fn sequence_key() -> Key {
    Key::new(SEQUENCE_PARTITION, SEQUENCE_SORT_KEY)
}

/// Byte prefix shared by every key in a partition.
///
/// Format: big-endian `ListingId` with the sign bit flipped, so that byte
/// order matches numeric order for negative sentinels too.
#[must_use]
pub fn partition_prefix(partition: i64) -> [u8; 8] {
    #[allow(clippy::cast_sign_loss)]
    let flipped = (partition as u64) ^ (1 << 63);
    flipped.to_be_bytes()
}

/// Encode a key as `partition_prefix (8 bytes) || username (UTF-8)`.
#[must_use]
pub fn encode_key(key: &Key) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + key.sort.len());
    bytes.extend_from_slice(&partition_prefix(key.partition));
    bytes.extend_from_slice(key.sort.as_bytes());
    bytes
}
