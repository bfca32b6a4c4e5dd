//! DynamoDB-backed [`TableStore`].
//!
//! Transient engine errors (throttling, request limits, internal errors,
//! timeouts) are retried with bounded exponential backoff; everything else
//! propagates immediately. Conditional-write violations surface as
//! [`StoreError::ConditionFailed`], never as silent overwrites.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{
    AttributeValue, DeleteRequest, PutRequest, ReturnValue, WriteRequest,
};
use aws_sdk_dynamodb::Client;

use crate::config::StorageConfig;
use crate::envelope::{Item, ATTR_PK, ATTR_SK};

use super::{
    cursor, ItemPage, QueryRequest, SortCondition, StoreError, StoreResult, TableStore,
    UpdateAction, WriteOp, MAX_BATCH_SIZE,
};

/// Backoff settings for transient errors and unprocessed batch items.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2_000),
        }
    }
}

/// The production [`TableStore`] backend.
#[derive(Debug, Clone)]
pub struct DynamoTableStore {
    client: Client,
    table_name: String,
    retry: RetryConfig,
}

impl DynamoTableStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            retry: RetryConfig::default(),
        }
    }

    /// Creates a store from configuration, using the AWS SDK default
    /// credential chain and honoring the endpoint override for local
    /// DynamoDB.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let mut store = Self::new(Client::new(&sdk_config), config.table_name.clone());
        store.retry.max_retries = config.max_retries;
        store
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn send_with_retries<T, E, R, Fut, F>(
        &self,
        op_name: &'static str,
        mut send: F,
    ) -> StoreResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, SdkError<E, R>>> + Send,
        E: ProvideErrorMetadata + Debug,
        R: Debug,
    {
        let mut attempt = 0u32;
        let mut delay = self.retry.initial_delay;
        loop {
            match send().await {
                Ok(value) => return Ok(value),
                Err(err) => match classify(&err) {
                    ErrorClass::ConditionFailed => return Err(StoreError::ConditionFailed),
                    ErrorClass::Fatal => {
                        return Err(StoreError::Internal(format!("{op_name}: {err:?}")))
                    }
                    ErrorClass::Retryable => {
                        if attempt >= self.retry.max_retries {
                            return Err(StoreError::Unavailable(format!("{op_name}: {err:?}")));
                        }
                        attempt += 1;
                        tracing::warn!(
                            op = op_name,
                            attempt,
                            "transient storage error, backing off: {}",
                            err.message().unwrap_or("unknown")
                        );
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(self.retry.max_delay);
                    }
                },
            }
        }
    }
}

enum ErrorClass {
    Retryable,
    ConditionFailed,
    Fatal,
}

fn classify<E, R>(err: &SdkError<E, R>) -> ErrorClass
where
    E: ProvideErrorMetadata + Debug,
    R: Debug,
{
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => ErrorClass::Retryable,
        SdkError::ServiceError(_) => match err.code() {
            Some("ConditionalCheckFailedException") => ErrorClass::ConditionFailed,
            Some(
                "ProvisionedThroughputExceededException"
                | "ThrottlingException"
                | "RequestLimitExceeded"
                | "InternalServerError",
            ) => ErrorClass::Retryable,
            _ => ErrorClass::Fatal,
        },
        _ => ErrorClass::Fatal,
    }
}

/// Builds an UpdateExpression with attribute-name/value placeholders from a
/// list of set/remove/add actions. Dots in paths address nested map fields.
fn build_update_expression(
    actions: &[UpdateAction],
) -> (
    String,
    HashMap<String, String>,
    HashMap<String, AttributeValue>,
) {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut sets = Vec::new();
    let mut removes = Vec::new();
    let mut name_index = 0usize;

    let mut path_expr = |path: &str, names: &mut HashMap<String, String>| {
        let mut parts = Vec::new();
        for segment in path.split('.') {
            let placeholder = format!("#n{}", name_index);
            name_index += 1;
            names.insert(placeholder.clone(), segment.to_string());
            parts.push(placeholder);
        }
        parts.join(".")
    };

    for (i, action) in actions.iter().enumerate() {
        match action {
            UpdateAction::Set(path, value) => {
                let placeholder = format!(":v{}", i);
                let expr = path_expr(path, &mut names);
                values.insert(placeholder.clone(), value.clone());
                sets.push(format!("{expr} = {placeholder}"));
            }
            UpdateAction::Remove(path) => {
                removes.push(path_expr(path, &mut names));
            }
            // ADD only works on top-level attributes, so increments compile
            // to SET arithmetic, which is equally atomic per item.
            UpdateAction::Add(path, delta) => {
                let value_ph = format!(":v{}", i);
                let zero_ph = format!(":z{}", i);
                let expr = path_expr(path, &mut names);
                values.insert(value_ph.clone(), AttributeValue::N(delta.to_string()));
                values.insert(zero_ph.clone(), AttributeValue::N("0".to_string()));
                sets.push(format!(
                    "{expr} = if_not_exists({expr}, {zero_ph}) + {value_ph}"
                ));
            }
        }
    }

    let mut expression = String::new();
    if !sets.is_empty() {
        expression.push_str("SET ");
        expression.push_str(&sets.join(", "));
    }
    if !removes.is_empty() {
        if !expression.is_empty() {
            expression.push(' ');
        }
        expression.push_str("REMOVE ");
        expression.push_str(&removes.join(", "));
    }

    (expression, names, values)
}

fn key_map_to_cursor(key: &HashMap<String, AttributeValue>) -> String {
    let string_key: HashMap<String, String> = key
        .iter()
        .filter_map(|(k, v)| v.as_s().ok().map(|s| (k.clone(), s.clone())))
        .collect();
    cursor::encode(&string_key)
}

fn cursor_to_key_map(cursor: &str) -> StoreResult<HashMap<String, AttributeValue>> {
    Ok(cursor::decode(cursor)?
        .into_iter()
        .map(|(k, v)| (k, AttributeValue::S(v)))
        .collect())
}

#[async_trait]
impl TableStore for DynamoTableStore {
    async fn get_item(&self, pk: &str, sk: &str) -> StoreResult<Option<Item>> {
        let builder = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(pk.to_string()))
            .key(ATTR_SK, AttributeValue::S(sk.to_string()));

        let output = self
            .send_with_retries("GetItem", || builder.clone().send())
            .await?;
        Ok(output.item)
    }

    async fn put_item(&self, item: Item) -> StoreResult<()> {
        let builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item));

        self.send_with_retries("PutItem", || builder.clone().send())
            .await?;
        Ok(())
    }

    async fn put_item_if_absent(&self, item: Item) -> StoreResult<()> {
        let builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(PK)");

        self.send_with_retries("PutItem", || builder.clone().send())
            .await?;
        Ok(())
    }

    async fn update_item(
        &self,
        pk: &str,
        sk: &str,
        actions: Vec<UpdateAction>,
    ) -> StoreResult<Item> {
        let (expression, names, values) = build_update_expression(&actions);
        let builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(pk.to_string()))
            .key(ATTR_SK, AttributeValue::S(sk.to_string()))
            .update_expression(expression)
            .condition_expression("attribute_exists(PK)")
            .return_values(ReturnValue::AllNew)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(if values.is_empty() {
                None
            } else {
                Some(values)
            });

        let output = self
            .send_with_retries("UpdateItem", || builder.clone().send())
            .await?;
        Ok(output.attributes.unwrap_or_default())
    }

    async fn delete_item(&self, pk: &str, sk: &str) -> StoreResult<()> {
        let builder = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, AttributeValue::S(pk.to_string()))
            .key(ATTR_SK, AttributeValue::S(sk.to_string()));

        self.send_with_retries("DeleteItem", || builder.clone().send())
            .await?;
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> StoreResult<ItemPage> {
        let (hash_attr, range_attr) = match request.index {
            None => (ATTR_PK, ATTR_SK),
            Some(index) => (index.hash_attr(), index.range_attr()),
        };

        let mut builder = self
            .client
            .query()
            .table_name(&self.table_name)
            .expression_attribute_names("#hk", hash_attr)
            .expression_attribute_values(":hv", AttributeValue::S(request.hash_value.clone()))
            .scan_index_forward(request.forward);

        if let Some(index) = request.index {
            builder = builder.index_name(index.name());
        }

        builder = match &request.sort {
            SortCondition::All => builder.key_condition_expression("#hk = :hv"),
            SortCondition::Eq(value) => builder
                .key_condition_expression("#hk = :hv AND #rk = :rv")
                .expression_attribute_names("#rk", range_attr)
                .expression_attribute_values(":rv", AttributeValue::S(value.clone())),
            SortCondition::BeginsWith(prefix) => builder
                .key_condition_expression("#hk = :hv AND begins_with(#rk, :rv)")
                .expression_attribute_names("#rk", range_attr)
                .expression_attribute_values(":rv", AttributeValue::S(prefix.clone())),
            SortCondition::Between(lo, hi) => builder
                .key_condition_expression("#hk = :hv AND #rk BETWEEN :lo AND :hi")
                .expression_attribute_names("#rk", range_attr)
                .expression_attribute_values(":lo", AttributeValue::S(lo.clone()))
                .expression_attribute_values(":hi", AttributeValue::S(hi.clone())),
        };

        if let Some(limit) = request.limit {
            builder = builder.limit(limit as i32);
        }
        if let Some(cursor) = &request.cursor {
            builder = builder.set_exclusive_start_key(Some(cursor_to_key_map(cursor)?));
        }

        let output = self
            .send_with_retries("Query", || builder.clone().send())
            .await?;

        Ok(ItemPage {
            items: output.items.unwrap_or_default(),
            next_cursor: output.last_evaluated_key.as_ref().map(key_map_to_cursor),
        })
    }

    async fn scan(&self, limit: Option<u32>, cursor: Option<String>) -> StoreResult<ItemPage> {
        let mut builder = self.client.scan().table_name(&self.table_name);
        if let Some(limit) = limit {
            builder = builder.limit(limit as i32);
        }
        if let Some(cursor) = &cursor {
            builder = builder.set_exclusive_start_key(Some(cursor_to_key_map(cursor)?));
        }

        let output = self
            .send_with_retries("Scan", || builder.clone().send())
            .await?;

        Ok(ItemPage {
            items: output.items.unwrap_or_default(),
            next_cursor: output.last_evaluated_key.as_ref().map(key_map_to_cursor),
        })
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> StoreResult<u32> {
        let total = ops.len() as u32;

        for chunk in ops.chunks(MAX_BATCH_SIZE) {
            let mut pending: Vec<WriteRequest> = chunk
                .iter()
                .map(write_op_to_request)
                .collect::<StoreResult<_>>()?;

            let mut attempt = 0u32;
            let mut delay = self.retry.initial_delay;
            while !pending.is_empty() {
                let builder = self
                    .client
                    .batch_write_item()
                    .request_items(&self.table_name, pending.clone());

                let output = self
                    .send_with_retries("BatchWriteItem", || builder.clone().send())
                    .await?;

                pending = output
                    .unprocessed_items
                    .and_then(|mut m| m.remove(&self.table_name))
                    .unwrap_or_default();

                if pending.is_empty() {
                    break;
                }
                if attempt >= self.retry.max_retries {
                    return Err(StoreError::Unavailable(format!(
                        "BatchWriteItem: {} items unprocessed after {} retries",
                        pending.len(),
                        attempt
                    )));
                }
                attempt += 1;
                tracing::warn!(
                    unprocessed = pending.len(),
                    attempt,
                    "retrying unprocessed batch items"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(self.retry.max_delay);
            }
        }

        Ok(total)
    }
}

fn write_op_to_request(op: &WriteOp) -> StoreResult<WriteRequest> {
    let request = match op {
        WriteOp::Put(item) => WriteRequest::builder()
            .put_request(
                PutRequest::builder()
                    .set_item(Some(item.clone()))
                    .build()
                    .map_err(|e| StoreError::Internal(e.to_string()))?,
            )
            .build(),
        WriteOp::Delete { pk, sk } => WriteRequest::builder()
            .delete_request(
                DeleteRequest::builder()
                    .key(ATTR_PK, AttributeValue::S(pk.clone()))
                    .key(ATTR_SK, AttributeValue::S(sk.clone()))
                    .build()
                    .map_err(|e| StoreError::Internal(e.to_string()))?,
            )
            .build(),
    };
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_update_expression_set_and_remove() {
        let actions = vec![
            UpdateAction::set("dat.st", AttributeValue::S("COMPLETED".to_string())),
            UpdateAction::set("GSI1PK", AttributeValue::S("X".to_string())),
            UpdateAction::remove("dat.del"),
        ];
        let (expression, names, values) = build_update_expression(&actions);

        assert_eq!(expression, "SET #n0.#n1 = :v0, #n2 = :v1 REMOVE #n3.#n4");
        assert_eq!(names.get("#n0").unwrap(), "dat");
        assert_eq!(names.get("#n1").unwrap(), "st");
        assert_eq!(names.get("#n2").unwrap(), "GSI1PK");
        assert_eq!(names.get("#n3").unwrap(), "dat");
        assert_eq!(names.get("#n4").unwrap(), "del");
        assert_eq!(
            values.get(":v0").unwrap().as_s().unwrap(),
            "COMPLETED"
        );
    }

    #[test]
    fn test_build_update_expression_remove_only_has_no_values() {
        let actions = vec![UpdateAction::remove("GSI2PK")];
        let (expression, _, values) = build_update_expression(&actions);
        assert_eq!(expression, "REMOVE #n0");
        assert!(values.is_empty());
    }

    #[test]
    fn test_build_update_expression_increment() {
        let actions = vec![
            UpdateAction::set("upd", AttributeValue::N("1700000000".to_string())),
            UpdateAction::add("dat.tcc", 1),
        ];
        let (expression, names, values) = build_update_expression(&actions);

        assert_eq!(
            expression,
            "SET #n0 = :v0, #n1.#n2 = if_not_exists(#n1.#n2, :z1) + :v1"
        );
        assert_eq!(names.get("#n1").unwrap(), "dat");
        assert_eq!(names.get("#n2").unwrap(), "tcc");
        assert_eq!(values.get(":v1").unwrap().as_n().unwrap(), "1");
        assert_eq!(values.get(":z1").unwrap().as_n().unwrap(), "0");
    }
}
