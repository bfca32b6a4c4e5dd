//! Table configuration types (Functional Core - pure data).

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub gsis: Vec<GsiConfig>,
    pub billing_mode: BillingMode,
    /// Item attribute holding the epoch-seconds expiry, when TTL is wanted.
    pub ttl_attribute: Option<String>,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// DynamoDB attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
}

/// Global Secondary Index configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsiConfig {
    pub name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub projection: ProjectionType,
}

/// GSI projection type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionType {
    All,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

impl TableConfig {
    /// Sets the table name.
    pub fn with_table_name(mut self, name: &str) -> Self {
        self.table_name = name.to_string();
        self
    }
}

fn string_key(name: &str) -> KeyAttribute {
    KeyAttribute {
        name: name.to_string(),
        attribute_type: AttributeType::String,
    }
}

fn gsi(name: &str, pk: &str, sk: &str) -> GsiConfig {
    GsiConfig {
        name: name.to_string(),
        partition_key: string_key(pk),
        sort_key: Some(string_key(sk)),
        projection: ProjectionType::All,
    }
}

/// Returns the canonical table configuration for algoprep.
/// This is a pure function - no I/O.
///
/// GSI1 carries email lookups and the per-status / per-user listings, GSI2
/// the OAuth lookup, per-problem jobs, and the public history feed, GSI3 the
/// problem status buckets. TTL on `exp` reclaims progress and usage rows.
pub fn algoprep_table_config() -> TableConfig {
    TableConfig {
        table_name: "algoprep".to_string(),
        partition_key: string_key("PK"),
        sort_key: Some(string_key("SK")),
        gsis: vec![
            gsi("GSI1", "GSI1PK", "GSI1SK"),
            gsi("GSI2", "GSI2PK", "GSI2SK"),
            gsi("GSI3", "GSI3PK", "GSI3SK"),
        ],
        billing_mode: BillingMode::PayPerRequest,
        ttl_attribute: Some("exp".to_string()),
    }
}
