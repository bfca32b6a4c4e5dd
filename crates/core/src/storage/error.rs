use thiserror::Error;

/// Errors surfaced by repository implementations.
///
/// `NotFound` is only raised by operations that require the item to exist
/// (updates, deletes); plain reads signal absence with `Ok(None)` and list
/// operations with an empty page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    /// Storage engine transient failure after the retry budget was exhausted.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    /// Malformed identifiers, keys, or cursors, rejected before any storage call.
    #[error("Validation error: {0}")]
    Validation(String),
    /// External payload store unreachable. Distinct from `Unavailable` because
    /// it affects only offloaded payloads, not the table itself.
    #[error("Blob store unavailable: {0}")]
    BlobUnavailable(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A stored item that does not decode into its domain type.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = RepositoryError::NotFound {
            entity_type: "Problem",
            id: "codeforces/2149G".to_string(),
        };
        assert_eq!(error.to_string(), "Problem not found: codeforces/2149G");
    }

    #[test]
    fn test_already_exists_display() {
        let error = RepositoryError::AlreadyExists {
            entity_type: "User",
            id: "abc-123".to_string(),
        };
        assert_eq!(error.to_string(), "User already exists: abc-123");
    }

    #[test]
    fn test_blob_unavailable_is_distinct_from_unavailable() {
        let blob = RepositoryError::BlobUnavailable("connection refused".to_string());
        let table = RepositoryError::Unavailable("connection refused".to_string());
        assert_ne!(blob, table);
    }
}
