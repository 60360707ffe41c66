//! Category browsing and the top-category query.

use std::sync::Arc;

use bazaar_core::{CategoryMetric, Listing, SortBy, SortOrder};

use crate::error::RepositoryError;
use crate::item::AttrValue;
use crate::keys;
use crate::query::{Index, Query, SortKeyCondition};
use crate::record::Record;
use crate::schema::CATEGORY_METRIC_PARTITION;
use crate::Table;

/// Read-only queries over listings by category and over category counters.
#[derive(Clone)]
pub struct CategoryQueries {
    table: Arc<dyn Table>,
}

impl CategoryQueries {
    /// Create the query service over a table.
    #[must_use]
    pub fn new(table: Arc<dyn Table>) -> Self {
        Self { table }
    }

    /// All live listings in a category, ordered by the store.
    ///
    /// An unknown category yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a store error, including `TableError::Decode` for a corrupt
    /// record.
    pub async fn get_category(
        &self,
        category: &str,
        sort_by: SortBy,
        order: SortOrder,
    ) -> Result<Vec<Listing>, RepositoryError> {
        let index = match sort_by {
            SortBy::Price => Index::CategoryPrice,
            SortBy::CreatedAt => Index::CategoryCreatedAt,
        };
        let query = Query::new(index, category).ascending(order.is_ascending());
        let items = self.table.query(&query).await?;
        tracing::debug!(category, %sort_by, %order, count = items.len(), "Category query");

        Ok(items
            .iter()
            .map(Listing::from_item)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// The category with the most live listings, if any has one.
    ///
    /// Ties are resolved by the store's index order.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn get_top_category(&self) -> Result<Option<String>, RepositoryError> {
        let query = Query::new(Index::CategoryCount, CATEGORY_METRIC_PARTITION)
            .with_sort_condition(SortKeyCondition::GreaterThan(AttrValue::N(0)))
            .ascending(false)
            .limit(1);
        let items = self.table.query(&query).await?;
        let top = items
            .first()
            .map(CategoryMetric::from_item)
            .transpose()?
            .map(|metric| metric.category);
        Ok(top)
    }

    /// The counter record of one category.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn get_metric(&self, category: &str) -> Result<Option<CategoryMetric>, RepositoryError> {
        let item = self.table.get_item(&keys::category_metric_key(category)).await?;
        Ok(item.as_ref().map(CategoryMetric::from_item).transpose()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use crate::memory::MemoryTable;
    use crate::schema::attr;

    #[tokio::test]
    async fn top_category_ignores_empty_counters() {
        let table = Arc::new(MemoryTable::new());
        for (category, count) in [("Books", 0), ("Sports", 2), ("Home", 1)] {
            let metric = CategoryMetric::new(category, count).unwrap();
            table.put_item(metric.to_item(), None).await.unwrap();
        }
        let queries = CategoryQueries::new(table.clone());
        assert_eq!(queries.get_top_category().await.unwrap().as_deref(), Some("Sports"));

        table
            .put_item(CategoryMetric::new("Sports", 0).unwrap().to_item(), None)
            .await
            .unwrap();
        table
            .put_item(CategoryMetric::new("Home", 0).unwrap().to_item(), None)
            .await
            .unwrap();
        assert_eq!(queries.get_top_category().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_listing_in_category_is_an_error() {
        let table = Arc::new(MemoryTable::new());
        let broken = Item::from_key(&keys::listing_key(bazaar_core::ListingId::FIRST, "alice"))
            .with(attr::CATEGORY, "Books")
            .with(attr::CREATED_AT, 10);
        table.put_item(broken, None).await.unwrap();

        let err = CategoryQueries::new(table)
            .get_category("Books", SortBy::CreatedAt, SortOrder::Descending)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Store(_)));
    }
}
