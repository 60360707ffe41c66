//! Mapping between entities and table items.

use bazaar_core::{CategoryMetric, Listing, ListingId, Price, User};
use chrono::DateTime;

use crate::error::Result;
use crate::item::{Item, Key};
use crate::keys;
use crate::schema::{attr, LISTING_ID_INDEX_PARTITION, USER_PARTITION};

/// An entity stored as one table item.
pub trait Record: Sized {
    /// The item's primary key.
    fn key(&self) -> Key;

    /// Encode as a full item, key attributes included.
    fn to_item(&self) -> Item;

    /// Decode from a stored item.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Decode` if an attribute is missing, has the wrong
    /// type or holds an invalid value.
    fn from_item(item: &Item) -> Result<Self>;
}

impl Record for User {
    fn key(&self) -> Key {
        keys::user_key(&self.username)
    }

    fn to_item(&self) -> Item {
        Item::from_key(&self.key())
    }

    fn from_item(item: &Item) -> Result<Self> {
        let key = item.key()?;
        if key.partition != USER_PARTITION {
            return Err(item.decode_error("not in the user partition"));
        }
        User::new(key.sort).map_err(|e| item.decode_error(e.to_string()))
    }
}

impl Record for Listing {
    fn key(&self) -> Key {
        keys::listing_key(self.id, &self.username)
    }

    fn to_item(&self) -> Item {
        Item::from_key(&self.key())
            .with(attr::TITLE, self.title.as_str())
            .with(attr::DESCRIPTION, self.description.as_str())
            .with(attr::PRICE, self.price.minor_units())
            .with(attr::CATEGORY, self.category.as_str())
            .with(attr::CREATED_AT, self.created_at.timestamp())
            .with(attr::LISTING_ID_INDEX_ATTRIBUTE, LISTING_ID_INDEX_PARTITION)
    }

    fn from_item(item: &Item) -> Result<Self> {
        let key = item.key()?;
        let invalid = |e: bazaar_core::ValidationError| item.decode_error(e.to_string());

        let id = ListingId::new(key.partition).map_err(invalid)?;
        let price = Price::from_minor_units(item.n(attr::PRICE)?).map_err(invalid)?;
        let created_at_secs = item.n(attr::CREATED_AT)?;
        let created_at = DateTime::from_timestamp(created_at_secs, 0).ok_or_else(|| {
            item.decode_error(format!("CreatedAt {created_at_secs} out of range"))
        })?;

        let listing = Listing {
            id,
            username: key.sort,
            title: item.s(attr::TITLE)?.to_string(),
            description: item
                .get(attr::DESCRIPTION)
                .and_then(|v| v.as_s())
                .unwrap_or_default()
                .to_string(),
            price,
            category: item.s(attr::CATEGORY)?.to_string(),
            created_at,
        };
        listing.validate().map_err(invalid)?;
        Ok(listing)
    }
}

impl Record for CategoryMetric {
    fn key(&self) -> Key {
        keys::category_metric_key(&self.category)
    }

    fn to_item(&self) -> Item {
        Item::from_key(&self.key())
            .with(attr::CATEGORY, self.category.as_str())
            .with(attr::CATEGORY_COUNT, self.count)
    }

    /// Items written by the counter update always carry `Category`; older
    /// ones may only have it as the sort key.
    fn from_item(item: &Item) -> Result<Self> {
        let key = item.key()?;
        let category = match item.get(attr::CATEGORY).and_then(|v| v.as_s()) {
            Some(category) => category.to_string(),
            None => key.sort,
        };
        let count = item.n(attr::CATEGORY_COUNT)?;
        CategoryMetric::new(category, count).map_err(|e| item.decode_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::ListingDraft;
    use chrono::{TimeZone, Utc};

    fn sample_listing() -> Listing {
        let draft = ListingDraft::new(
            "user1",
            "Phone model 8",
            "",
            Price::from_minor_units(100_000).unwrap(),
            "Electronics",
        )
        .unwrap();
        let created_at = Utc.with_ymd_and_hms(2019, 2, 22, 12, 34, 56).unwrap();
        Listing::from_draft(ListingId::FIRST, draft, created_at)
    }

    #[test]
    fn listing_item_layout() {
        let item = sample_listing().to_item();
        assert_eq!(item.n(attr::LISTING_ID).unwrap(), 100_001);
        assert_eq!(item.s(attr::USERNAME).unwrap(), "user1");
        assert_eq!(item.n(attr::PRICE).unwrap(), 100_000);
        assert_eq!(item.n(attr::CREATED_AT).unwrap(), 1_550_838_896);
        assert_eq!(item.n(attr::LISTING_ID_INDEX_ATTRIBUTE).unwrap(), 1);
        assert_eq!(Listing::from_item(&item).unwrap(), sample_listing());
    }

    #[test]
    fn listing_missing_title_is_corrupt() {
        let item = Item::from_key(&Key::new(100_001, "user1"))
            .with(attr::PRICE, 1)
            .with(attr::CREATED_AT, 0)
            .with(attr::CATEGORY, "Books");
        assert!(matches!(
            Listing::from_item(&item),
            Err(crate::TableError::Decode { .. })
        ));
    }

    #[test]
    fn metric_falls_back_to_sort_key() {
        let item = Item::from_key(&Key::new(-2, "Sports")).with(attr::CATEGORY_COUNT, 4);
        let metric = CategoryMetric::from_item(&item).unwrap();
        assert_eq!(metric.category, "Sports");
        assert_eq!(metric.count, 4);
    }

    #[test]
    fn corrupt_counter_is_a_decode_error() {
        let negative = Item::from_key(&Key::new(-2, "Sports")).with(attr::CATEGORY_COUNT, -1);
        assert!(matches!(
            CategoryMetric::from_item(&negative),
            Err(crate::TableError::Decode { .. })
        ));

        let missing = Item::from_key(&Key::new(-2, "Sports"));
        assert!(matches!(
            CategoryMetric::from_item(&missing),
            Err(crate::TableError::Decode { .. })
        ));
    }

    #[test]
    fn user_item_is_key_only() {
        let user = User::new("alice").unwrap();
        let item = user.to_item();
        assert_eq!(item.key().unwrap(), Key::new(-1, "alice"));
        assert_eq!(User::from_item(&item).unwrap(), user);
    }
}
