//! DynamoDB table implementation.
//!
//! Items map one to one onto DynamoDB items: [`AttrValue::N`] becomes an `N`
//! attribute, [`AttrValue::S`] an `S` attribute. Conditions and updates are
//! rendered into expressions by [`expression`].

pub mod bootstrap;
mod expression;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use aws_smithy_types::timeout::TimeoutConfig;

use crate::error::{CancellationReason, Result, TableError};
use crate::expr::{Condition, WriteOp};
use crate::item::{AttrValue, Item, Key};
use crate::query::Query;
use crate::schema::{attr, DEFAULT_TABLE_NAME};
use crate::Table;
use expression::Expression;

/// DynamoDB table configuration.
#[derive(Debug, Clone)]
pub struct DynamoConfig {
    /// Table name.
    pub table_name: String,
    /// AWS region (uses the SDK default if not specified).
    pub region: Option<String>,
    /// Optional endpoint override (e.g. DynamoDB Local).
    pub endpoint: Option<String>,
    /// Operation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            region: None,
            endpoint: None,
            timeout_ms: None,
        }
    }
}

/// DynamoDB-backed table.
#[derive(Clone)]
pub struct DynamoTable {
    client: Client,
    table_name: String,
}

impl std::fmt::Debug for DynamoTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoTable")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl DynamoTable {
    /// Create a table handle from a loaded SDK configuration.
    ///
    /// The DynamoDB client inherits everything from `sdk_config` (HTTP
    /// client, retries, credentials), then applies the overrides in `config`.
    #[must_use]
    pub fn new(sdk_config: &aws_config::SdkConfig, config: DynamoConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region));
        }
        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table_name: config.table_name,
        }
    }

    /// Load the SDK configuration from the environment and create a handle.
    pub async fn from_env(config: DynamoConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self::new(&sdk_config, config)
    }

    /// The table name requests are sent to.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn transact_item(&self, op: WriteOp) -> Result<TransactWriteItem> {
        let mut expr = Expression::default();
        let item = match op {
            WriteOp::Put { item, condition } => {
                let condition = condition.map(|c| expr.condition(&c));
                let (names, values) = expr.into_parts();
                let put = Put::builder()
                    .table_name(&self.table_name)
                    .set_item(Some(to_attribute_map(&item)))
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(names)
                    .set_expression_attribute_values(values)
                    .build()
                    .map_err(|e| TableError::Backend(format!("invalid Put: {e}")))?;
                TransactWriteItem::builder().put(put).build()
            }
            WriteOp::Update {
                key,
                actions,
                condition,
            } => {
                let update_expression = expr.update(&actions);
                let condition = condition.map(|c| expr.condition(&c));
                let (names, values) = expr.into_parts();
                let update = Update::builder()
                    .table_name(&self.table_name)
                    .set_key(Some(key_map(&key)))
                    .update_expression(update_expression)
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(names)
                    .set_expression_attribute_values(values)
                    .build()
                    .map_err(|e| TableError::Backend(format!("invalid Update: {e}")))?;
                TransactWriteItem::builder().update(update).build()
            }
            WriteOp::Delete { key, condition } => {
                let condition = condition.map(|c| expr.condition(&c));
                let (names, values) = expr.into_parts();
                let delete = Delete::builder()
                    .table_name(&self.table_name)
                    .set_key(Some(key_map(&key)))
                    .set_condition_expression(condition)
                    .set_expression_attribute_names(names)
                    .set_expression_attribute_values(values)
                    .build()
                    .map_err(|e| TableError::Backend(format!("invalid Delete: {e}")))?;
                TransactWriteItem::builder().delete(delete).build()
            }
        };
        Ok(item)
    }
}

#[async_trait]
impl Table for DynamoTable {
    async fn get_item(&self, key: &Key) -> Result<Option<Item>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key_map(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                TableError::Backend(format!(
                    "DynamoDB GetItem failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        response.item().map(from_attribute_map).transpose()
    }

    async fn put_item(&self, item: Item, condition: Option<Condition>) -> Result<()> {
        let mut expr = Expression::default();
        let condition = condition.map(|c| expr.condition(&c));
        let (names, values) = expr.into_parts();

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attribute_map(&item)))
            .set_condition_expression(condition)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(PutItemError::ConditionalCheckFailedException(_))
                ) =>
            {
                Err(TableError::ConditionalCheckFailed)
            }
            Err(e) => Err(TableError::Backend(format!(
                "DynamoDB PutItem failed: {}",
                DisplayErrorContext(&e)
            ))),
        }
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<()> {
        let items = ops
            .into_iter()
            .map(|op| self.transact_item(op))
            .collect::<Result<Vec<_>>>()?;

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let Some(TransactWriteItemsError::TransactionCanceledException(cancelled)) =
                    e.as_service_error()
                {
                    let reasons = cancelled
                        .cancellation_reasons()
                        .iter()
                        .map(|reason| cancellation_reason(reason.code()))
                        .collect();
                    return Err(TableError::TransactionCanceled { reasons });
                }
                Err(TableError::Backend(format!(
                    "DynamoDB TransactWriteItems failed: {}",
                    DisplayErrorContext(&e)
                )))
            }
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut last_evaluated_key = None;

        loop {
            let remaining = query.limit.map(|limit| limit.saturating_sub(items.len()));
            if remaining == Some(0) {
                break;
            }

            let mut expr = Expression::default();
            let key_condition = expr.key_condition(query);
            let (names, values) = expr.into_parts();

            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .set_index_name(query.index.name().map(str::to_string))
                .key_condition_expression(key_condition)
                .set_expression_attribute_names(names)
                .set_expression_attribute_values(values)
                .scan_index_forward(query.ascending)
                .consistent_read(query.index.supports_consistent_read())
                .set_limit(remaining.map(|n| i32::try_from(n).unwrap_or(i32::MAX)));

            if let Some(key) = last_evaluated_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let response = request.send().await.map_err(|e| {
                TableError::Backend(format!(
                    "DynamoDB Query failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

            for item in response.items() {
                items.push(from_attribute_map(item)?);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => {
                    last_evaluated_key = Some(key.clone());
                }
                _ => break,
            }
        }

        if let Some(limit) = query.limit {
            items.truncate(limit);
        }
        Ok(items)
    }
}

fn cancellation_reason(code: Option<&str>) -> CancellationReason {
    match code {
        None | Some("None") => CancellationReason::None,
        Some("ConditionalCheckFailed") => CancellationReason::ConditionalCheckFailed,
        Some(other) => CancellationReason::Other(other.to_string()),
    }
}

/// Convert one attribute value to its SDK form.
pub(crate) fn to_attribute(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::N(n) => AttributeValue::N(n.to_string()),
        AttrValue::S(s) => AttributeValue::S(s.clone()),
    }
}

fn to_attribute_map(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(name, value)| (name.clone(), to_attribute(value)))
        .collect()
}

fn key_map(key: &Key) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (attr::LISTING_ID.to_string(), AttributeValue::N(key.partition.to_string())),
        (attr::USERNAME.to_string(), AttributeValue::S(key.sort.clone())),
    ])
}

fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Item> {
    let mut item = Item::default();
    let mut unsupported = Vec::new();

    for (name, value) in map {
        match value {
            AttributeValue::S(s) => item.insert(name, s.as_str()),
            AttributeValue::N(n) => match n.parse::<i64>() {
                Ok(n) => item.insert(name, n),
                Err(_) => unsupported.push(format!("{name} = {n} is not an integer")),
            },
            _ => unsupported.push(format!("{name} has an unsupported type")),
        }
    }

    if unsupported.is_empty() {
        Ok(item)
    } else {
        Err(item.decode_error(unsupported.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_maps_round_trip() {
        let item = Item::from_key(&Key::new(100_001, "alice"))
            .with(attr::PRICE, 1000)
            .with(attr::TITLE, "Phone");
        let map = to_attribute_map(&item);
        assert_eq!(map[attr::PRICE], AttributeValue::N("1000".into()));
        assert_eq!(from_attribute_map(&map).unwrap(), item);
    }

    #[test]
    fn fractional_numbers_are_corrupt() {
        let mut map = key_map(&Key::new(100_001, "alice"));
        map.insert(attr::PRICE.to_string(), AttributeValue::N("10.5".into()));
        assert!(matches!(
            from_attribute_map(&map),
            Err(TableError::Decode { .. })
        ));
    }

    #[test]
    fn cancellation_codes() {
        assert_eq!(cancellation_reason(Some("None")), CancellationReason::None);
        assert_eq!(cancellation_reason(None), CancellationReason::None);
        assert_eq!(
            cancellation_reason(Some("ConditionalCheckFailed")),
            CancellationReason::ConditionalCheckFailed
        );
        assert_eq!(
            cancellation_reason(Some("TransactionConflict")),
            CancellationReason::Other("TransactionConflict".into())
        );
    }
}
