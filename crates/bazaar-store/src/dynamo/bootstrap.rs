//! Table provisioning.
//!
//! Creates the `Listing` table with its key schema, the `CategoryCountIndex`
//! local index and the three global indexes, then waits for it to become
//! active.

use std::time::{Duration, Instant};

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, KeyType, LocalSecondaryIndex,
    Projection, ProjectionType, ProvisionedThroughput, ScalarAttributeType, TableStatus,
};

use super::DynamoTable;
use crate::error::{Result, TableError};
use crate::query::Index;
use crate::schema::attr;

/// Read and write capacity units for the table and each global index.
const THROUGHPUT_UNITS: i64 = 5;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn invalid(what: &str, e: impl std::fmt::Display) -> TableError {
    TableError::Configuration(format!("invalid {what}: {e}"))
}

fn attribute(name: &str, kind: ScalarAttributeType) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(kind)
        .build()
        .map_err(|e| invalid("attribute definition", e))
}

fn key_schema(index: Index) -> Result<Vec<KeySchemaElement>> {
    [
        (index.hash_attribute(), KeyType::Hash),
        (index.range_attribute(), KeyType::Range),
    ]
    .into_iter()
    .map(|(name, key_type)| {
        KeySchemaElement::builder()
            .attribute_name(name)
            .key_type(key_type)
            .build()
            .map_err(|e| invalid("key schema", e))
    })
    .collect()
}

fn throughput() -> Result<ProvisionedThroughput> {
    ProvisionedThroughput::builder()
        .read_capacity_units(THROUGHPUT_UNITS)
        .write_capacity_units(THROUGHPUT_UNITS)
        .build()
        .map_err(|e| invalid("provisioned throughput", e))
}

fn projection() -> Projection {
    Projection::builder()
        .projection_type(ProjectionType::All)
        .build()
}

fn index_name(index: Index) -> Result<&'static str> {
    index
        .name()
        .ok_or_else(|| TableError::Configuration(format!("{index:?} is not a secondary index")))
}

fn global_index(index: Index) -> Result<GlobalSecondaryIndex> {
    GlobalSecondaryIndex::builder()
        .index_name(index_name(index)?)
        .set_key_schema(Some(key_schema(index)?))
        .projection(projection())
        .provisioned_throughput(throughput()?)
        .build()
        .map_err(|e| invalid("global secondary index", e))
}

fn local_index(index: Index) -> Result<LocalSecondaryIndex> {
    LocalSecondaryIndex::builder()
        .index_name(index_name(index)?)
        .set_key_schema(Some(key_schema(index)?))
        .projection(projection())
        .build()
        .map_err(|e| invalid("local secondary index", e))
}

impl DynamoTable {
    /// Whether the table exists.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than the table being absent.
    pub async fn table_exists(&self) -> Result<bool> {
        Ok(self.table_status().await?.is_some())
    }

    async fn table_status(&self) -> Result<Option<TableStatus>> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(output) => Ok(output
                .table()
                .and_then(|table| table.table_status())
                .cloned()),
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(DescribeTableError::ResourceNotFoundException(_))
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(TableError::Backend(format!(
                "DynamoDB DescribeTable failed: {}",
                DisplayErrorContext(&e)
            ))),
        }
    }

    /// Create the table and its indexes unless it already exists, then wait
    /// up to `timeout` for it to become active.
    ///
    /// Returns `true` if the table was created by this call.
    ///
    /// # Errors
    ///
    /// Returns an error if creation fails or the table is not active in time.
    pub async fn ensure_table(&self, timeout: Duration) -> Result<bool> {
        if self.table_exists().await? {
            tracing::debug!(table = %self.table_name, "Table already exists");
            self.wait_until_active(timeout).await?;
            return Ok(false);
        }

        tracing::info!(table = %self.table_name, "Creating table");
        self.client
            .create_table()
            .table_name(&self.table_name)
            .set_attribute_definitions(Some(vec![
                attribute(attr::LISTING_ID, ScalarAttributeType::N)?,
                attribute(attr::USERNAME, ScalarAttributeType::S)?,
                attribute(attr::LISTING_ID_INDEX_ATTRIBUTE, ScalarAttributeType::N)?,
                attribute(attr::CATEGORY, ScalarAttributeType::S)?,
                attribute(attr::PRICE, ScalarAttributeType::N)?,
                attribute(attr::CREATED_AT, ScalarAttributeType::N)?,
                attribute(attr::CATEGORY_COUNT, ScalarAttributeType::N)?,
            ]))
            .set_key_schema(Some(key_schema(Index::Primary)?))
            .local_secondary_indexes(local_index(Index::CategoryCount)?)
            .global_secondary_indexes(global_index(Index::ListingId)?)
            .global_secondary_indexes(global_index(Index::CategoryPrice)?)
            .global_secondary_indexes(global_index(Index::CategoryCreatedAt)?)
            .provisioned_throughput(throughput()?)
            .send()
            .await
            .map_err(|e| {
                TableError::Backend(format!(
                    "DynamoDB CreateTable failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        self.wait_until_active(timeout).await?;
        tracing::info!(table = %self.table_name, "Table created");
        Ok(true)
    }

    async fn wait_until_active(&self, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.table_status().await? == Some(TableStatus::Active) {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(TableError::Backend(format!(
                    "table {} not active after {timeout:?}",
                    self.table_name
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Delete the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be deleted.
    pub async fn delete_table(&self) -> Result<()> {
        self.client
            .delete_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| {
                TableError::Backend(format!(
                    "DynamoDB DeleteTable failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        tracing::info!(table = %self.table_name, "Table deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_key_schemas() {
        let schema = key_schema(Index::CategoryCount).unwrap();
        assert_eq!(schema[0].attribute_name(), "ListingId");
        assert_eq!(schema[0].key_type(), &KeyType::Hash);
        assert_eq!(schema[1].attribute_name(), "CategoryCount");

        let gsi = global_index(Index::CategoryCreatedAt).unwrap();
        assert_eq!(gsi.index_name(), "CategoryCreatedAtIndex");
    }

    #[test]
    fn primary_key_is_not_an_index() {
        assert!(global_index(Index::Primary).is_err());
    }
}
