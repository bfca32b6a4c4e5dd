//! The common item envelope shared by every entity family.
//!
//! Every stored item carries the primary key pair, a short type tag (`tp`), a
//! `dat` map holding the entity payload under short wire names, creation and
//! update timestamps (`crt`/`upd`, epoch seconds), an optional TTL (`exp`),
//! the key-format version (`kv`), and entity-specific GSI projections.
//!
//! The attribute names below are part of the persisted schema surface: the
//! maintenance CLI reads raw items and depends on them staying stable.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use algoprep_core::storage::RepositoryError;

use crate::keys::KEY_VERSION;

pub type Item = HashMap<String, AttributeValue>;

// ============================================================================
// Envelope attribute names
// ============================================================================

pub const ATTR_PK: &str = "PK";
pub const ATTR_SK: &str = "SK";
pub const ATTR_TYPE: &str = "tp";
pub const ATTR_DATA: &str = "dat";
pub const ATTR_CREATED: &str = "crt";
pub const ATTR_UPDATED: &str = "upd";
pub const ATTR_EXPIRES: &str = "exp";
pub const ATTR_KEY_VERSION: &str = "kv";
pub const ATTR_GSI1_PK: &str = "GSI1PK";
pub const ATTR_GSI1_SK: &str = "GSI1SK";
pub const ATTR_GSI2_PK: &str = "GSI2PK";
pub const ATTR_GSI2_SK: &str = "GSI2SK";
pub const ATTR_GSI3_PK: &str = "GSI3PK";
pub const ATTR_GSI3_SK: &str = "GSI3SK";

// ============================================================================
// Entity type tags
// ============================================================================

pub const TYPE_USER: &str = "usr";
pub const TYPE_PROBLEM: &str = "prob";
pub const TYPE_TEST_CASE: &str = "tc";
pub const TYPE_SCRIPT_JOB: &str = "sgjob";
pub const TYPE_EXTRACTION_JOB: &str = "pejob";
pub const TYPE_PROGRESS: &str = "prog";
pub const TYPE_HISTORY: &str = "shist";
pub const TYPE_USAGE: &str = "ulog";
pub const TYPE_PLAN: &str = "plan";

// ============================================================================
// Envelope construction
// ============================================================================

/// Builder for the common envelope around a `dat` payload.
pub struct Envelope {
    pub pk: String,
    pub sk: String,
    pub type_tag: &'static str,
    pub dat: Item,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Envelope {
    pub fn new(pk: String, sk: String, type_tag: &'static str) -> Self {
        let now = Utc::now();
        Self {
            pk,
            sk,
            type_tag,
            dat: HashMap::new(),
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    pub fn timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn expires(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn dat(mut self, dat: Item) -> Self {
        self.dat = dat;
        self
    }

    /// Assembles the full storage item. GSI projections are added by the
    /// caller afterwards since they are entity-specific.
    pub fn build(self) -> Item {
        let mut item = HashMap::new();
        item.insert(ATTR_PK.to_string(), AttributeValue::S(self.pk));
        item.insert(ATTR_SK.to_string(), AttributeValue::S(self.sk));
        item.insert(
            ATTR_TYPE.to_string(),
            AttributeValue::S(self.type_tag.to_string()),
        );
        item.insert(ATTR_DATA.to_string(), AttributeValue::M(self.dat));
        item.insert(
            ATTR_CREATED.to_string(),
            AttributeValue::N(self.created_at.timestamp().to_string()),
        );
        item.insert(
            ATTR_UPDATED.to_string(),
            AttributeValue::N(self.updated_at.timestamp().to_string()),
        );
        if let Some(exp) = self.expires_at {
            item.insert(
                ATTR_EXPIRES.to_string(),
                AttributeValue::N(exp.timestamp().to_string()),
            );
        }
        item.insert(
            ATTR_KEY_VERSION.to_string(),
            AttributeValue::N(KEY_VERSION.to_string()),
        );
        item
    }
}

/// True when the item carries an `exp` in the past. Readers must treat such
/// items as absent even before DynamoDB physically deletes them.
pub fn is_expired(item: &Item, now: DateTime<Utc>) -> bool {
    match item.get(ATTR_EXPIRES).and_then(|v| v.as_n().ok()) {
        Some(n) => n
            .parse::<i64>()
            .map(|secs| secs <= now.timestamp())
            .unwrap_or(false),
        None => false,
    }
}

// ============================================================================
// Typed attribute accessors
// ============================================================================

/// The `dat` payload map of an item.
pub fn dat(item: &Item) -> Result<&Item, RepositoryError> {
    item.get(ATTR_DATA)
        .and_then(|v| v.as_m().ok())
        .ok_or_else(|| RepositoryError::InvalidData("Missing dat map".to_string()))
}

/// Get a required top-level string attribute.
pub fn get_string(item: &Item, key: &str) -> Result<String, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get an optional string attribute.
pub fn get_optional_string(item: &Item, key: &str) -> Option<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
}

/// Get a required integer attribute (stored as `N`).
pub fn get_i64(item: &Item, key: &str) -> Result<i64, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get an optional integer attribute.
pub fn get_optional_i64(item: &Item, key: &str) -> Option<i64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse().ok())
}

/// Get a required boolean attribute.
pub fn get_bool(item: &Item, key: &str) -> Result<bool, RepositoryError> {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .ok_or_else(|| RepositoryError::InvalidData(format!("Missing or invalid field: {}", key)))
}

/// Get a boolean attribute that defaults to false when absent.
pub fn get_bool_or_false(item: &Item, key: &str) -> bool {
    item.get(key)
        .and_then(|v| v.as_bool().ok())
        .copied()
        .unwrap_or(false)
}

/// Get a required UUID attribute.
pub fn get_uuid(item: &Item, key: &str) -> Result<Uuid, RepositoryError> {
    let s = get_string(item, key)?;
    Uuid::parse_str(&s)
        .map_err(|e| RepositoryError::InvalidData(format!("Invalid UUID {}: {}", key, e)))
}

/// Get a required epoch-seconds attribute as a UTC datetime.
pub fn get_timestamp(item: &Item, key: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let secs = get_i64(item, key)?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| RepositoryError::InvalidData(format!("Invalid timestamp {}: {}", key, secs)))
}

/// Get a required epoch-milliseconds attribute as a UTC datetime.
pub fn get_timestamp_millis(item: &Item, key: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let millis = get_i64(item, key)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        RepositoryError::InvalidData(format!("Invalid timestamp {}: {}", key, millis))
    })
}
