//! Generic single-table primitives.
//!
//! [`TableStore`] is the seam between the entity repositories and the storage
//! engine: [`DynamoTableStore`] talks to DynamoDB, [`MemoryTableStore`]
//! emulates the same semantics (conditional writes, sparse GSIs,
//! lexicographic ordering, pagination) in process for tests.

pub mod cursor;
mod dynamo;
mod memory;

pub use dynamo::{DynamoTableStore, RetryConfig};
pub use memory::MemoryTableStore;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use thiserror::Error;

use crate::envelope::{
    Item, ATTR_GSI1_PK, ATTR_GSI1_SK, ATTR_GSI2_PK, ATTR_GSI2_SK, ATTR_GSI3_PK, ATTR_GSI3_SK,
    ATTR_PK, ATTR_SK,
};

/// DynamoDB caps batch writes at 25 items per request.
pub const MAX_BATCH_SIZE: usize = 25;

/// The named secondary indexes of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Index {
    Gsi1,
    Gsi2,
    Gsi3,
}

impl Index {
    pub fn name(&self) -> &'static str {
        match self {
            Index::Gsi1 => "GSI1",
            Index::Gsi2 => "GSI2",
            Index::Gsi3 => "GSI3",
        }
    }

    pub fn hash_attr(&self) -> &'static str {
        match self {
            Index::Gsi1 => ATTR_GSI1_PK,
            Index::Gsi2 => ATTR_GSI2_PK,
            Index::Gsi3 => ATTR_GSI3_PK,
        }
    }

    pub fn range_attr(&self) -> &'static str {
        match self {
            Index::Gsi1 => ATTR_GSI1_SK,
            Index::Gsi2 => ATTR_GSI2_SK,
            Index::Gsi3 => ATTR_GSI3_SK,
        }
    }
}

/// Condition on the range key of a query.
#[derive(Debug, Clone)]
pub enum SortCondition {
    /// No range condition; the whole partition.
    All,
    Eq(String),
    BeginsWith(String),
    /// Inclusive bounds.
    Between(String, String),
}

impl SortCondition {
    /// Whether a range-key value satisfies this condition. Used by the
    /// in-memory backend.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            SortCondition::All => true,
            SortCondition::Eq(v) => value == v,
            SortCondition::BeginsWith(prefix) => value.starts_with(prefix.as_str()),
            SortCondition::Between(lo, hi) => value >= lo.as_str() && value <= hi.as_str(),
        }
    }
}

/// A paginated query against the main table or one index.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub index: Option<Index>,
    pub hash_value: String,
    pub sort: SortCondition,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
    /// Ascending range-key order when true.
    pub forward: bool,
}

impl QueryRequest {
    /// Query the main table partition `hash_value`.
    pub fn table(hash_value: impl Into<String>) -> Self {
        Self {
            index: None,
            hash_value: hash_value.into(),
            sort: SortCondition::All,
            limit: None,
            cursor: None,
            forward: true,
        }
    }

    /// Query a secondary index partition.
    pub fn index(index: Index, hash_value: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            ..Self::table(hash_value)
        }
    }

    pub fn sort(mut self, sort: SortCondition) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Newest-first ordering.
    pub fn backward(mut self) -> Self {
        self.forward = false;
        self
    }
}

/// One page of raw items plus the continuation cursor.
#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub next_cursor: Option<String>,
}

/// A partial update: set, remove, or atomically add to attributes by path.
/// Nested paths use a dot, e.g. `dat.st`.
#[derive(Debug, Clone)]
pub enum UpdateAction {
    Set(String, AttributeValue),
    Remove(String),
    /// Atomic numeric increment; a missing attribute starts from zero.
    Add(String, i64),
}

impl UpdateAction {
    pub fn set(path: impl Into<String>, value: AttributeValue) -> Self {
        UpdateAction::Set(path.into(), value)
    }

    pub fn remove(path: impl Into<String>) -> Self {
        UpdateAction::Remove(path.into())
    }

    pub fn add(path: impl Into<String>, delta: i64) -> Self {
        UpdateAction::Add(path.into(), delta)
    }
}

/// One element of a batch write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put(Item),
    Delete { pk: String, sk: String },
}

/// Errors at the primitive-operation level. The entity repositories translate
/// these into `RepositoryError` with entity context attached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional write was violated (item existed / did not exist).
    #[error("conditional write failed")]
    ConditionFailed,
    /// Transient engine failure that survived the retry budget.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("storage error: {0}")]
    Internal(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Primitive operations of the single-table engine.
///
/// `scan` is O(table) and exists for maintenance procedures only;
/// request-serving code must use `query`.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn get_item(&self, pk: &str, sk: &str) -> StoreResult<Option<Item>>;

    /// Idempotent upsert.
    async fn put_item(&self, item: Item) -> StoreResult<()>;

    /// Insert that fails with [`StoreError::ConditionFailed`] when an item
    /// already exists at the key.
    async fn put_item_if_absent(&self, item: Item) -> StoreResult<()>;

    /// Partial update of an existing item, returning the item as it stands
    /// after the update; [`StoreError::ConditionFailed`] when the item is
    /// absent.
    async fn update_item(
        &self,
        pk: &str,
        sk: &str,
        actions: Vec<UpdateAction>,
    ) -> StoreResult<Item>;

    /// Unconditional delete; removing an absent item is a no-op.
    async fn delete_item(&self, pk: &str, sk: &str) -> StoreResult<()>;

    async fn query(&self, request: QueryRequest) -> StoreResult<ItemPage>;

    /// Full-table scan in primary-key order. Maintenance only.
    async fn scan(&self, limit: Option<u32>, cursor: Option<String>) -> StoreResult<ItemPage>;

    /// Batched put/delete, chunked to the engine's 25-item limit, retrying
    /// only unprocessed sub-batches. Returns the number of ops applied.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> StoreResult<u32>;
}

/// Primary key pair of an item, for cursors and batch deletes.
pub(crate) fn item_key(item: &Item) -> Option<(String, String)> {
    let pk = item.get(ATTR_PK)?.as_s().ok()?.clone();
    let sk = item.get(ATTR_SK)?.as_s().ok()?.clone();
    Some((pk, sk))
}
