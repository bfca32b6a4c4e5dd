use std::env;

/// Storage configuration, constructed once at startup and passed to the
/// components that need it. There is no global singleton; reloading means
/// building a new value and swapping it at the composition root.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// DynamoDB table name (default: "algoprep").
    pub table_name: String,
    /// S3 bucket for offloaded test-case payloads (default: "algoprep-blobs").
    pub blob_bucket: String,
    /// Custom endpoint URL, for local DynamoDB/S3.
    pub endpoint_url: Option<String>,
    /// AWS region (default: "us-east-1").
    pub region: String,
    /// Combined input+output size above which a test-case payload is
    /// offloaded to blob storage (default: 50 000 bytes).
    pub inline_threshold: usize,
    /// Maximum retry attempts for transient storage errors (default: 3).
    pub max_retries: u32,
    /// Concurrency bound for fan-out writes such as bulk test-case inserts
    /// (default: 8).
    pub write_concurrency: usize,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ALGOPREP_TABLE_NAME` - DynamoDB table name (default: "algoprep")
    /// - `ALGOPREP_BLOB_BUCKET` - blob bucket name (default: "algoprep-blobs")
    /// - `AWS_ENDPOINT_URL` - local endpoint override
    /// - `AWS_REGION` - AWS region (default: "us-east-1")
    pub fn from_env() -> Self {
        Self {
            table_name: env::var("ALGOPREP_TABLE_NAME").unwrap_or_else(|_| "algoprep".to_string()),
            blob_bucket: env::var("ALGOPREP_BLOB_BUCKET")
                .unwrap_or_else(|_| "algoprep-blobs".to_string()),
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            ..Self::default()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            table_name: "algoprep".to_string(),
            blob_bucket: "algoprep-blobs".to_string(),
            endpoint_url: None,
            region: "us-east-1".to_string(),
            inline_threshold: 50_000,
            max_retries: 3,
            write_concurrency: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = StorageConfig::default();
        assert_eq!(config.table_name, "algoprep");
        assert_eq!(config.inline_threshold, 50_000);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.write_concurrency, 8);
    }
}
