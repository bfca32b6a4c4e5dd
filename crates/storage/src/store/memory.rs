//! In-memory [`TableStore`] emulating single-table DynamoDB semantics.
//!
//! Used by tests and local development. Faithful where it matters to the
//! repositories: conditional writes, sparse secondary indexes (an item enters
//! an index only when both key attributes are present), lexicographic
//! range-key ordering, and exclusive-start-key pagination.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use tokio::sync::RwLock;

use crate::envelope::{Item, ATTR_PK, ATTR_SK};

use super::{
    cursor, item_key, ItemPage, QueryRequest, StoreError, StoreResult, TableStore, UpdateAction,
    WriteOp,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryTableStore {
    items: Arc<RwLock<BTreeMap<(String, String), Item>>>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items. Test helper.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Raw access to one item, for attribute-level assertions in tests and
    /// for migration verification.
    pub async fn raw_item(&self, pk: &str, sk: &str) -> Option<Item> {
        self.items
            .read()
            .await
            .get(&(pk.to_string(), sk.to_string()))
            .cloned()
    }
}

fn string_attr(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

enum Delta<'a> {
    Set(&'a AttributeValue),
    Remove,
    Add(i64),
}

fn apply_action(item: &mut Item, action: &UpdateAction) -> StoreResult<()> {
    let (path, delta) = match action {
        UpdateAction::Set(path, value) => (path, Delta::Set(value)),
        UpdateAction::Remove(path) => (path, Delta::Remove),
        UpdateAction::Add(path, amount) => (path, Delta::Add(*amount)),
    };
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default().to_string();
    let target = match segments.next() {
        None => item,
        Some(_) => match item.get_mut(&head) {
            Some(AttributeValue::M(map)) => map,
            _ => {
                return Err(StoreError::Internal(format!(
                    "update path {path} does not address a map"
                )))
            }
        },
    };
    let leaf = path.rsplit('.').next().unwrap_or_default().to_string();
    match delta {
        Delta::Set(v) => {
            target.insert(leaf, v.clone());
        }
        Delta::Remove => {
            target.remove(&leaf);
        }
        Delta::Add(amount) => {
            // DynamoDB ADD semantics: a missing attribute starts from zero.
            let current = match target.get(&leaf) {
                Some(AttributeValue::N(n)) => n
                    .parse::<i64>()
                    .map_err(|e| StoreError::Internal(format!("non-numeric {path}: {e}")))?,
                None => 0,
                Some(_) => {
                    return Err(StoreError::Internal(format!(
                        "ADD on non-numeric attribute {path}"
                    )))
                }
            };
            target.insert(leaf, AttributeValue::N((current + amount).to_string()));
        }
    }
    Ok(())
}

/// Resolves the exclusive-start position: the index just past the row whose
/// primary key matches the cursor. An unmatched cursor restarts from the top,
/// which mirrors the accepted stale-cursor tradeoff.
fn start_position(rows: &[(String, String, String)], cursor: Option<&String>) -> StoreResult<usize> {
    match cursor {
        None => Ok(0),
        Some(cursor) => {
            let key = cursor::decode(cursor)?;
            let (pk, sk) = match (key.get(ATTR_PK), key.get(ATTR_SK)) {
                (Some(pk), Some(sk)) => (pk.clone(), sk.clone()),
                _ => return Err(StoreError::InvalidCursor("missing key attributes".into())),
            };
            Ok(rows
                .iter()
                .position(|(_, row_pk, row_sk)| *row_pk == pk && *row_sk == sk)
                .map(|i| i + 1)
                .unwrap_or(0))
        }
    }
}

fn page_cursor(item: &Item, index_attrs: Option<(&str, &str)>) -> String {
    let mut key = std::collections::HashMap::new();
    if let Some((pk, sk)) = item_key(item) {
        key.insert(ATTR_PK.to_string(), pk);
        key.insert(ATTR_SK.to_string(), sk);
    }
    if let Some((hash_attr, range_attr)) = index_attrs {
        if let Some(v) = string_attr(item, hash_attr) {
            key.insert(hash_attr.to_string(), v);
        }
        if let Some(v) = string_attr(item, range_attr) {
            key.insert(range_attr.to_string(), v);
        }
    }
    cursor::encode(&key)
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn get_item(&self, pk: &str, sk: &str) -> StoreResult<Option<Item>> {
        Ok(self
            .items
            .read()
            .await
            .get(&(pk.to_string(), sk.to_string()))
            .cloned())
    }

    async fn put_item(&self, item: Item) -> StoreResult<()> {
        let key = item_key(&item)
            .ok_or_else(|| StoreError::Internal("item is missing PK/SK".to_string()))?;
        self.items.write().await.insert(key, item);
        Ok(())
    }

    async fn put_item_if_absent(&self, item: Item) -> StoreResult<()> {
        let key = item_key(&item)
            .ok_or_else(|| StoreError::Internal("item is missing PK/SK".to_string()))?;
        let mut items = self.items.write().await;
        if items.contains_key(&key) {
            return Err(StoreError::ConditionFailed);
        }
        items.insert(key, item);
        Ok(())
    }

    async fn update_item(
        &self,
        pk: &str,
        sk: &str,
        actions: Vec<UpdateAction>,
    ) -> StoreResult<Item> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&(pk.to_string(), sk.to_string()))
            .ok_or(StoreError::ConditionFailed)?;
        for action in &actions {
            apply_action(item, action)?;
        }
        Ok(item.clone())
    }

    async fn delete_item(&self, pk: &str, sk: &str) -> StoreResult<()> {
        self.items
            .write()
            .await
            .remove(&(pk.to_string(), sk.to_string()));
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> StoreResult<ItemPage> {
        let index_attrs = request.index.map(|ix| (ix.hash_attr(), ix.range_attr()));
        let (hash_attr, range_attr) = index_attrs.unwrap_or((ATTR_PK, ATTR_SK));

        let items = self.items.read().await;
        // (range value, pk, sk) triples of matching rows, in index order.
        let mut rows: Vec<(String, String, String)> = items
            .values()
            .filter_map(|item| {
                let hash = string_attr(item, hash_attr)?;
                if hash != request.hash_value {
                    return None;
                }
                // Sparse index: an item without the range attribute is not in
                // the index at all.
                let range = string_attr(item, range_attr)?;
                if !request.sort.matches(&range) {
                    return None;
                }
                let (pk, sk) = item_key(item)?;
                Some((range, pk, sk))
            })
            .collect();
        rows.sort();
        if !request.forward {
            rows.reverse();
        }

        let start = start_position(&rows, request.cursor.as_ref())?;
        let limit = request.limit.unwrap_or(u32::MAX) as usize;
        let taken: Vec<&(String, String, String)> = rows.iter().skip(start).take(limit).collect();

        let page_items: Vec<Item> = taken
            .iter()
            .filter_map(|(_, pk, sk)| items.get(&(pk.clone(), sk.clone())).cloned())
            .collect();

        let next_cursor = if start + taken.len() < rows.len() {
            page_items.last().map(|item| page_cursor(item, index_attrs))
        } else {
            None
        };

        Ok(ItemPage {
            items: page_items,
            next_cursor,
        })
    }

    async fn scan(&self, limit: Option<u32>, cursor: Option<String>) -> StoreResult<ItemPage> {
        let items = self.items.read().await;
        let rows: Vec<(String, String, String)> = items
            .keys()
            .map(|(pk, sk)| (String::new(), pk.clone(), sk.clone()))
            .collect();

        let start = start_position(&rows, cursor.as_ref())?;
        let limit = limit.unwrap_or(u32::MAX) as usize;
        let taken: Vec<&(String, String, String)> = rows.iter().skip(start).take(limit).collect();

        let page_items: Vec<Item> = taken
            .iter()
            .filter_map(|(_, pk, sk)| items.get(&(pk.clone(), sk.clone())).cloned())
            .collect();

        let next_cursor = if start + taken.len() < rows.len() {
            page_items.last().map(|item| page_cursor(item, None))
        } else {
            None
        };

        Ok(ItemPage {
            items: page_items,
            next_cursor,
        })
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> StoreResult<u32> {
        let count = ops.len() as u32;
        let mut items = self.items.write().await;
        for op in ops {
            match op {
                WriteOp::Put(item) => {
                    let key = item_key(&item)
                        .ok_or_else(|| StoreError::Internal("item is missing PK/SK".to_string()))?;
                    items.insert(key, item);
                }
                WriteOp::Delete { pk, sk } => {
                    items.remove(&(pk, sk));
                }
            }
        }
        Ok(count)
    }
}
