//! Entity repositories over the single-table engine.
//!
//! [`SingleTableRepository`] implements every `algoprep_core::storage` trait
//! against a [`TableStore`] and a [`BlobStore`]. Each submodule covers one
//! entity family; this module holds the shared plumbing: error translation
//! with entity context, expired-item filtering, and page decoding.

mod history;
mod job;
mod plan;
mod problem;
mod progress;
mod usage;
mod user;

use chrono::Utc;

use algoprep_core::storage::{Page, RepositoryError};

use crate::blob::{BlobError, BlobStore};
use crate::config::StorageConfig;
use crate::envelope::{is_expired, Item};
use crate::store::{ItemPage, StoreError, TableStore};

/// Days until a progress entry is reclaimed by TTL.
pub(crate) const PROGRESS_TTL_DAYS: i64 = 30;

/// Days until a usage log is reclaimed by TTL.
pub(crate) const USAGE_TTL_DAYS: i64 = 90;

/// All entity repositories over one table and one blob bucket.
///
/// Generic over the backends so tests run the exact same repository logic
/// against the in-memory store.
#[derive(Debug, Clone)]
pub struct SingleTableRepository<S, B> {
    store: S,
    blobs: B,
    inline_threshold: usize,
    write_concurrency: usize,
}

impl<S: TableStore, B: BlobStore> SingleTableRepository<S, B> {
    pub fn new(store: S, blobs: B, config: &StorageConfig) -> Self {
        Self {
            store,
            blobs,
            inline_threshold: config.inline_threshold,
            write_concurrency: config.write_concurrency.max(1),
        }
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn blobs(&self) -> &B {
        &self.blobs
    }

    pub(crate) fn inline_threshold(&self) -> usize {
        self.inline_threshold
    }

    pub(crate) fn write_concurrency(&self) -> usize {
        self.write_concurrency
    }

    /// Drains a query to completion, following the continuation cursor.
    /// Bounded partitions only (test cases, jobs per problem, plans).
    pub(crate) async fn query_all(
        &self,
        request: crate::store::QueryRequest,
    ) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .store
                .query(request.clone().cursor(cursor.take()))
                .await?;
            items.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => return Ok(items),
            }
        }
    }

    /// Fetches one item, treating TTL-expired rows as absent.
    pub(crate) async fn get_live_item(
        &self,
        pk: &str,
        sk: &str,
    ) -> Result<Option<Item>, StoreError> {
        let now = Utc::now();
        Ok(self
            .store
            .get_item(pk, sk)
            .await?
            .filter(|item| !is_expired(item, now)))
    }
}

// ============================================================================
// Error translation
// ============================================================================

/// Maps a store error from a create path: a failed condition means the key
/// was already taken.
pub(crate) fn on_create(
    err: StoreError,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    match err {
        StoreError::ConditionFailed => RepositoryError::AlreadyExists {
            entity_type,
            id: id.into(),
        },
        other => infra(other),
    }
}

/// Maps a store error from an update path: a failed condition means the item
/// is gone.
pub(crate) fn on_update(
    err: StoreError,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    match err {
        StoreError::ConditionFailed => RepositoryError::NotFound {
            entity_type,
            id: id.into(),
        },
        other => infra(other),
    }
}

/// Maps store errors that carry no entity-level meaning.
pub(crate) fn infra(err: StoreError) -> RepositoryError {
    match err {
        StoreError::InvalidCursor(msg) => RepositoryError::Validation(format!("cursor: {msg}")),
        StoreError::Unavailable(msg) | StoreError::Internal(msg) => {
            RepositoryError::Unavailable(msg)
        }
        StoreError::ConditionFailed => {
            RepositoryError::Unavailable("unexpected conditional failure".to_string())
        }
    }
}

pub(crate) fn blob_err(err: BlobError) -> RepositoryError {
    RepositoryError::BlobUnavailable(err.to_string())
}

pub(crate) fn not_found(entity_type: &'static str, id: impl Into<String>) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type,
        id: id.into(),
    }
}

// ============================================================================
// Page decoding
// ============================================================================

/// Decodes a raw item page into a typed page, dropping TTL-expired rows.
///
/// The continuation cursor comes from the engine, so a page can run short of
/// `limit` when expired rows were filtered; callers keep paging until the
/// cursor is exhausted.
pub(crate) fn decode_page<T>(
    page: ItemPage,
    decode: impl Fn(&Item) -> Result<T, RepositoryError>,
) -> Result<Page<T>, RepositoryError> {
    let now = Utc::now();
    let items = page
        .items
        .iter()
        .filter(|item| !is_expired(item, now))
        .map(decode)
        .collect::<Result<Vec<T>, RepositoryError>>()?;
    Ok(Page {
        items,
        next_cursor: page.next_cursor,
    })
}
