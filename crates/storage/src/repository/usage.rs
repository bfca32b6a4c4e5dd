use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use algoprep_core::model::UsageLog;
use algoprep_core::storage::{Page, Result, UsageRepository};

use crate::blob::BlobStore;
use crate::conversions::{item_to_usage, usage_to_item};
use crate::envelope::is_expired;
use crate::keys;
use crate::store::{QueryRequest, TableStore};

use super::{decode_page, infra, SingleTableRepository, USAGE_TTL_DAYS};

#[async_trait]
impl<S: TableStore, B: BlobStore> UsageRepository for SingleTableRepository<S, B> {
    async fn record_usage(&self, log: &UsageLog) -> Result<()> {
        let item = usage_to_item(log, log.recorded_at + Duration::days(USAGE_TTL_DAYS));
        self.store().put_item(item).await.map_err(infra)
    }

    async fn count_usage_for_day(&self, user_id: Uuid, day: NaiveDate) -> Result<u64> {
        // One day of one user's events is a small partition; draining it
        // keeps the count exact without a counter item to keep in sync.
        let items = self
            .query_all(QueryRequest::table(keys::usage_pk(user_id, day)))
            .await
            .map_err(infra)?;
        let now = Utc::now();
        Ok(items.iter().filter(|item| !is_expired(item, now)).count() as u64)
    }

    async fn list_usage_for_day(
        &self,
        user_id: Uuid,
        day: NaiveDate,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<UsageLog>> {
        let page = self
            .store()
            .query(
                QueryRequest::table(keys::usage_pk(user_id, day))
                    .limit(limit)
                    .cursor(cursor),
            )
            .await
            .map_err(infra)?;
        decode_page(page, item_to_usage)
    }
}
