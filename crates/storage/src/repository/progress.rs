use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use algoprep_core::model::{JobType, NewProgress, ProgressEntry};
use algoprep_core::storage::{Page, ProgressRepository, Result};

use crate::blob::BlobStore;
use crate::conversions::{item_to_progress, progress_to_item};
use crate::keys;
use crate::store::{item_key, QueryRequest, SortCondition, TableStore, WriteOp};

use super::{decode_page, infra, SingleTableRepository, PROGRESS_TTL_DAYS};

#[async_trait]
impl<S: TableStore, B: BlobStore> ProgressRepository for SingleTableRepository<S, B> {
    async fn append_progress(
        &self,
        job_type: JobType,
        job_id: Uuid,
        entry: &NewProgress,
    ) -> Result<()> {
        let now = Utc::now();
        let recorded = ProgressEntry {
            step: entry.step.clone(),
            message: entry.message.clone(),
            status: entry.status,
            recorded_at: now,
        };
        // A fresh entry id per append: two entries in the same millisecond
        // get distinct sort keys instead of overwriting each other.
        let item = progress_to_item(
            job_type,
            job_id,
            Uuid::new_v4(),
            &recorded,
            now + Duration::days(PROGRESS_TTL_DAYS),
        );
        self.store().put_item(item).await.map_err(infra)
    }

    async fn list_progress(
        &self,
        job_type: JobType,
        job_id: Uuid,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<ProgressEntry>> {
        let page = self
            .store()
            .query(
                QueryRequest::table(keys::progress_pk(job_type, job_id))
                    .sort(SortCondition::BeginsWith(keys::PROGRESS_PREFIX.to_string()))
                    .limit(limit)
                    .cursor(cursor),
            )
            .await
            .map_err(infra)?;
        decode_page(page, item_to_progress)
    }

    async fn purge_progress(&self, job_type: JobType, job_id: Uuid) -> Result<u32> {
        let items = self
            .query_all(
                QueryRequest::table(keys::progress_pk(job_type, job_id))
                    .sort(SortCondition::BeginsWith(keys::PROGRESS_PREFIX.to_string())),
            )
            .await
            .map_err(infra)?;
        if items.is_empty() {
            return Ok(0);
        }

        let deletes: Vec<WriteOp> = items
            .iter()
            .filter_map(item_key)
            .map(|(pk, sk)| WriteOp::Delete { pk, sk })
            .collect();
        self.store().batch_write(deletes).await.map_err(infra)
    }
}
