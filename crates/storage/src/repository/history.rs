use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use algoprep_core::model::SearchHistory;
use algoprep_core::storage::{Page, Result, SearchHistoryRepository};

use crate::blob::BlobStore;
use crate::conversions::{history_to_item, item_to_history};
use crate::keys;
use crate::store::{Index, QueryRequest, SortCondition, TableStore};

use super::{decode_page, infra, not_found, on_create, SingleTableRepository};

const ENTITY: &str = "SearchHistory";

#[async_trait]
impl<S: TableStore, B: BlobStore> SearchHistoryRepository for SingleTableRepository<S, B> {
    async fn create_history(&self, history: &SearchHistory) -> Result<()> {
        self.store()
            .put_item_if_absent(history_to_item(history))
            .await
            .map_err(|e| on_create(e, ENTITY, history.id.to_string()))
    }

    async fn get_history(&self, id: Uuid) -> Result<Option<SearchHistory>> {
        match self
            .get_live_item(&keys::history_pk(id), keys::META_SK)
            .await
        {
            Ok(Some(item)) => Ok(Some(item_to_history(&item)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(infra(e)),
        }
    }

    async fn list_history_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<SearchHistory>> {
        // The user partition of GSI1 holds only history rows (user accounts
        // project under their email there), but the prefix keeps that true
        // if another family ever joins the partition.
        let page = self
            .store()
            .query(
                QueryRequest::index(Index::Gsi1, keys::history_gsi1_pk(user_id))
                    .sort(SortCondition::BeginsWith(keys::HISTORY_PREFIX.to_string()))
                    .limit(limit)
                    .cursor(cursor)
                    .backward(),
            )
            .await
            .map_err(infra)?;
        decode_page(page, item_to_history)
    }

    async fn set_history_public(&self, id: Uuid, public: bool) -> Result<()> {
        // Full replace so the feed projection follows the flag: turning
        // public off leaves no GSI2 attributes behind.
        let mut entry = self
            .get_history(id)
            .await?
            .ok_or_else(|| not_found(ENTITY, id.to_string()))?;
        entry.public = public;
        entry.updated_at = Utc::now();
        self.store()
            .put_item(history_to_item(&entry))
            .await
            .map_err(infra)
    }

    async fn list_public_history(
        &self,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<SearchHistory>> {
        let page = self
            .store()
            .query(
                QueryRequest::index(Index::Gsi2, keys::PUBLIC_HISTORY_PK)
                    .limit(limit)
                    .cursor(cursor)
                    .backward(),
            )
            .await
            .map_err(infra)?;
        decode_page(page, item_to_history)
    }
}
