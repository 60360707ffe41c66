//! Indexed range queries.

use std::cmp::Ordering;

use crate::item::{AttrValue, Item, Key};
use crate::schema::{attr, index};

/// The primary key or one of the secondary indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// The table itself: `ListingId` / `Username`.
    Primary,
    /// `ListingIdIndex`: `ListingIdIndexAttribute` / `ListingId`.
    ListingId,
    /// `CategoryPriceIndex`: `Category` / `Price`.
    CategoryPrice,
    /// `CategoryCreatedAtIndex`: `Category` / `CreatedAt`.
    CategoryCreatedAt,
    /// `CategoryCountIndex` (local): `ListingId` / `CategoryCount`.
    CategoryCount,
}

impl Index {
    /// Index name, `None` for the primary key.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::Primary => None,
            Self::ListingId => Some(index::LISTING_ID),
            Self::CategoryPrice => Some(index::CATEGORY_PRICE),
            Self::CategoryCreatedAt => Some(index::CATEGORY_CREATED_AT),
            Self::CategoryCount => Some(index::CATEGORY_COUNT),
        }
    }

    /// Hash key attribute.
    #[must_use]
    pub const fn hash_attribute(self) -> &'static str {
        match self {
            Self::Primary | Self::CategoryCount => attr::LISTING_ID,
            Self::ListingId => attr::LISTING_ID_INDEX_ATTRIBUTE,
            Self::CategoryPrice | Self::CategoryCreatedAt => attr::CATEGORY,
        }
    }

    /// Range key attribute.
    #[must_use]
    pub const fn range_attribute(self) -> &'static str {
        match self {
            Self::Primary => attr::USERNAME,
            Self::ListingId => attr::LISTING_ID,
            Self::CategoryPrice => attr::PRICE,
            Self::CategoryCreatedAt => attr::CREATED_AT,
            Self::CategoryCount => attr::CATEGORY_COUNT,
        }
    }

    /// Whether reads on this index can be strongly consistent.
    #[must_use]
    pub const fn supports_consistent_read(self) -> bool {
        matches!(self, Self::Primary | Self::CategoryCount)
    }
}

/// Condition on the range key of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyCondition {
    /// `range > value`
    GreaterThan(AttrValue),
}

impl SortKeyCondition {
    fn matches(&self, value: &AttrValue) -> bool {
        match self {
            Self::GreaterThan(bound) => {
                std::mem::discriminant(value) == std::mem::discriminant(bound) && value > bound
            }
        }
    }
}

/// A query over one partition of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Index to read.
    pub index: Index,
    /// Hash key value.
    pub partition: AttrValue,
    /// Optional range key condition.
    pub sort_condition: Option<SortKeyCondition>,
    /// Result order by range key.
    pub ascending: bool,
    /// Maximum number of items returned.
    pub limit: Option<usize>,
}

impl Query {
    /// Ascending, unbounded query of one partition.
    #[must_use]
    pub fn new(index: Index, partition: impl Into<AttrValue>) -> Self {
        Self {
            index,
            partition: partition.into(),
            sort_condition: None,
            ascending: true,
            limit: None,
        }
    }

    /// Restrict the range key.
    #[must_use]
    pub fn with_sort_condition(mut self, condition: SortKeyCondition) -> Self {
        self.sort_condition = Some(condition);
        self
    }

    /// Choose the result order.
    #[must_use]
    pub const fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Evaluate a query over candidate items in process.
///
/// Items missing either index key attribute are skipped. Ties on the range
/// key are broken by primary key, in the requested direction.
pub(crate) fn select<I>(items: I, query: &Query) -> Vec<Item>
where
    I: IntoIterator<Item = Item>,
{
    let hash = query.index.hash_attribute();
    let range = query.index.range_attribute();

    let mut hits: Vec<(AttrValue, Key, Item)> = items
        .into_iter()
        .filter(|item| item.get(hash) == Some(&query.partition))
        .filter_map(|item| {
            let range_value = item.get(range)?.clone();
            let key = item.key().ok()?;
            Some((range_value, key, item))
        })
        .filter(|(range_value, _, _)| {
            query
                .sort_condition
                .as_ref()
                .map_or(true, |c| c.matches(range_value))
        })
        .collect();

    hits.sort_by(|a, b| match a.0.cmp(&b.0) {
        Ordering::Equal => a.1.cmp(&b.1),
        other => other,
    });
    if !query.ascending {
        hits.reverse();
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    hits.into_iter().take(limit).map(|(_, _, item)| item).collect()
}
