use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use algoprep_core::model::{
    JobStatus, JobSummary, JobType, ProblemExtractionJob, ScriptGenerationJob,
};
use algoprep_core::storage::{JobRepository, Page, ProgressRepository, Result};

use crate::blob::BlobStore;
use crate::conversions::{
    extraction_job_to_item, item_to_extraction_job, item_to_job_summary, item_to_script_job,
    script_job_to_item,
};
use crate::envelope::{ATTR_GSI1_PK, ATTR_UPDATED};
use crate::keys;
use crate::store::{Index, QueryRequest, TableStore, UpdateAction};

use super::{decode_page, infra, on_create, on_update, SingleTableRepository};

const ENTITY: &str = "Job";

fn now_attr() -> AttributeValue {
    AttributeValue::N(Utc::now().timestamp().to_string())
}

/// The status field and its index projection move together, so a status
/// listing never sees a half-updated job. The chronological range key embeds
/// the creation time and never changes.
fn status_actions(job_type: JobType, status: JobStatus) -> Vec<UpdateAction> {
    vec![
        UpdateAction::set(
            "dat.st",
            AttributeValue::S(status.as_str().to_string()),
        ),
        UpdateAction::set(
            ATTR_GSI1_PK,
            AttributeValue::S(keys::job_gsi1_pk(job_type, status)),
        ),
        UpdateAction::set(ATTR_UPDATED, now_attr()),
    ]
}

#[async_trait]
impl<S: TableStore, B: BlobStore> JobRepository for SingleTableRepository<S, B> {
    async fn create_script_job(&self, job: &ScriptGenerationJob) -> Result<()> {
        self.store()
            .put_item_if_absent(script_job_to_item(job))
            .await
            .map_err(|e| on_create(e, ENTITY, job.job_id.to_string()))
    }

    async fn create_extraction_job(&self, job: &ProblemExtractionJob) -> Result<()> {
        self.store()
            .put_item_if_absent(extraction_job_to_item(job))
            .await
            .map_err(|e| on_create(e, ENTITY, job.job_id.to_string()))
    }

    async fn get_script_job(&self, id: Uuid) -> Result<Option<ScriptGenerationJob>> {
        match self
            .get_live_item(&keys::job_pk(JobType::ScriptGeneration, id), keys::META_SK)
            .await
        {
            Ok(Some(item)) => Ok(Some(item_to_script_job(&item)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(infra(e)),
        }
    }

    async fn get_extraction_job(&self, id: Uuid) -> Result<Option<ProblemExtractionJob>> {
        match self
            .get_live_item(&keys::job_pk(JobType::ProblemExtraction, id), keys::META_SK)
            .await
        {
            Ok(Some(item)) => Ok(Some(item_to_extraction_job(&item)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(infra(e)),
        }
    }

    async fn update_job_status(
        &self,
        job_type: JobType,
        id: Uuid,
        status: JobStatus,
    ) -> Result<()> {
        self.store()
            .update_item(
                &keys::job_pk(job_type, id),
                keys::META_SK,
                status_actions(job_type, status),
            )
            .await
            .map_err(|e| on_update(e, ENTITY, id.to_string()))?;
        Ok(())
    }

    async fn fail_job(&self, job_type: JobType, id: Uuid, message: &str) -> Result<()> {
        let mut actions = status_actions(job_type, JobStatus::Failed);
        actions.push(UpdateAction::set(
            "dat.err",
            AttributeValue::S(message.to_string()),
        ));
        self.store()
            .update_item(&keys::job_pk(job_type, id), keys::META_SK, actions)
            .await
            .map_err(|e| on_update(e, ENTITY, id.to_string()))?;
        Ok(())
    }

    async fn list_jobs_by_status(
        &self,
        job_type: JobType,
        status: JobStatus,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<JobSummary>> {
        let page = self
            .store()
            .query(
                QueryRequest::index(Index::Gsi1, keys::job_gsi1_pk(job_type, status))
                    .limit(limit)
                    .cursor(cursor),
            )
            .await
            .map_err(infra)?;
        decode_page(page, item_to_job_summary)
    }

    async fn list_script_jobs_for_problem(
        &self,
        platform: &str,
        problem_id: &str,
    ) -> Result<Vec<ScriptGenerationJob>> {
        let items = self
            .query_all(QueryRequest::index(
                Index::Gsi2,
                keys::script_job_gsi2_pk(platform, problem_id),
            ))
            .await
            .map_err(infra)?;
        items.iter().map(item_to_script_job).collect()
    }

    async fn delete_job(&self, job_type: JobType, id: Uuid) -> Result<()> {
        let purged = self.purge_progress(job_type, id).await?;
        self.store()
            .delete_item(&keys::job_pk(job_type, id), keys::META_SK)
            .await
            .map_err(infra)?;
        debug!(job_id = %id, progress_entries = purged, "job deleted");
        Ok(())
    }
}
