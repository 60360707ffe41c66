//! Table layout: attribute names, index names and reserved partitions.
//!
//! Every record kind lives in one table keyed by `(ListingId, Username)`.
//! Non-listing records sit in negative sentinel partitions so they can never
//! collide with a real listing id.

use bazaar_core::FIRST_LISTING_ID;

use crate::error::{Result, TableError};

/// Default table name.
pub const DEFAULT_TABLE_NAME: &str = "Listing";

/// Attribute names as persisted.
pub mod attr {
    /// Partition key (number).
    pub const LISTING_ID: &str = "ListingId";
    /// Sort key (string).
    pub const USERNAME: &str = "Username";
    /// Listing title.
    pub const TITLE: &str = "Title";
    /// Listing description.
    pub const DESCRIPTION: &str = "Description";
    /// Price in minor units (number).
    pub const PRICE: &str = "Price";
    /// Category name.
    pub const CATEGORY: &str = "Category";
    /// Creation time in epoch seconds (number).
    pub const CREATED_AT: &str = "CreatedAt";
    /// Live listing count on metric records (number).
    pub const CATEGORY_COUNT: &str = "CategoryCount";
    /// Constant hash key of `ListingIdIndex` (number).
    pub const LISTING_ID_INDEX_ATTRIBUTE: &str = "ListingIdIndexAttribute";
    /// Last committed listing id on the sequence record (number).
    pub const LAST_LISTING_ID: &str = "LastListingId";
}

/// Secondary index names as persisted.
pub mod index {
    /// GSI over every listing, ordered by id.
    pub const LISTING_ID: &str = "ListingIdIndex";
    /// GSI: category browse by price.
    pub const CATEGORY_PRICE: &str = "CategoryPriceIndex";
    /// GSI: category browse by creation time.
    pub const CATEGORY_CREATED_AT: &str = "CategoryCreatedAtIndex";
    /// LSI: metric records ordered by count.
    pub const CATEGORY_COUNT: &str = "CategoryCountIndex";
}

/// Partition holding one record per registered user.
pub const USER_PARTITION: i64 = -1;

/// Partition holding one counter per category.
pub const CATEGORY_METRIC_PARTITION: i64 = -2;

/// Partition holding the listing id sequence record.
pub const SEQUENCE_PARTITION: i64 = -3;

/// Sort key of the sequence record.
pub const SEQUENCE_SORT_KEY: &str = "ListingId";

/// Value of `ListingIdIndexAttribute` on every listing.
pub const LISTING_ID_INDEX_PARTITION: i64 = 1;

const SENTINELS: [(&str, i64); 3] = [
    ("user", USER_PARTITION),
    ("category metric", CATEGORY_METRIC_PARTITION),
    ("sequence", SEQUENCE_PARTITION),
];

const _: () = assert!(USER_PARTITION < FIRST_LISTING_ID);
const _: () = assert!(CATEGORY_METRIC_PARTITION < FIRST_LISTING_ID);
const _: () = assert!(SEQUENCE_PARTITION < FIRST_LISTING_ID);
const _: () = assert!(USER_PARTITION != CATEGORY_METRIC_PARTITION);
const _: () = assert!(USER_PARTITION != SEQUENCE_PARTITION);
const _: () = assert!(CATEGORY_METRIC_PARTITION != SEQUENCE_PARTITION);

/// Check that the sentinel partitions are negative, pairwise distinct and
/// below the listing id range.
///
/// # Errors
///
/// Returns `TableError::InvalidKeyLayout` naming the offending partitions.
pub fn verify_key_layout() -> Result<()> {
    for (i, (name, value)) in SENTINELS.iter().enumerate() {
        if *value >= 0 {
            return Err(TableError::InvalidKeyLayout(format!(
                "{name} partition {value} overlaps the listing id range"
            )));
        }
        if let Some((other, _)) = SENTINELS[i + 1..].iter().find(|(_, v)| v == value) {
            return Err(TableError::InvalidKeyLayout(format!(
                "{name} and {other} partitions share key {value}"
            )));
        }
    }
    Ok(())
}

/// Column family names for the `RocksDB` backend.
#[cfg(feature = "rocksdb-backend")]
pub mod cf {
    /// Every item, keyed by the ordered `(ListingId, Username)` encoding.
    pub const ITEMS: &str = "items";
}

/// Returns all column family names for database initialization.
#[cfg(feature = "rocksdb-backend")]
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::ITEMS]
}
