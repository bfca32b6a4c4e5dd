use async_trait::async_trait;

use algoprep_core::model::SubscriptionPlan;
use algoprep_core::storage::{PlanRepository, Result};

use crate::blob::BlobStore;
use crate::conversions::{item_to_plan, plan_to_item};
use crate::keys;
use crate::store::{QueryRequest, SortCondition, TableStore};

use super::{infra, SingleTableRepository};

#[async_trait]
impl<S: TableStore, B: BlobStore> PlanRepository for SingleTableRepository<S, B> {
    async fn put_plan(&self, plan: &SubscriptionPlan) -> Result<()> {
        self.store()
            .put_item(plan_to_item(plan))
            .await
            .map_err(infra)
    }

    async fn get_plan(&self, id: &str) -> Result<Option<SubscriptionPlan>> {
        match self
            .get_live_item(&keys::plan_pk(), &keys::plan_sk(id))
            .await
        {
            Ok(Some(item)) => Ok(Some(item_to_plan(&item)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(infra(e)),
        }
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let items = self
            .query_all(
                QueryRequest::table(keys::plan_pk())
                    .sort(SortCondition::BeginsWith(format!("{}#", keys::META_SK))),
            )
            .await
            .map_err(infra)?;
        items.iter().map(item_to_plan).collect()
    }
}
