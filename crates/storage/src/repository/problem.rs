use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use algoprep_core::model::{Deletion, Problem, TestCase};
use algoprep_core::storage::{Page, ProblemRepository, Result};

use crate::blob::{self, BlobStore};
use crate::conversions::{
    inline_test_case_to_item, item_to_problem, item_to_test_case_record,
    offloaded_test_case_to_item, problem_to_item, TestCaseRecord,
};
use crate::keys;
use crate::store::{Index, QueryRequest, SortCondition, TableStore, WriteOp};

use super::{blob_err, decode_page, infra, not_found, SingleTableRepository};

const ENTITY: &str = "Problem";

fn coords(platform: &str, problem_id: &str) -> String {
    format!("{platform}/{problem_id}")
}

impl<S: TableStore, B: BlobStore> SingleTableRepository<S, B> {
    async fn require_problem(&self, platform: &str, problem_id: &str) -> Result<Problem> {
        self.get_problem(platform, problem_id)
            .await?
            .ok_or_else(|| not_found(ENTITY, coords(platform, problem_id)))
    }

    /// Writes one test case, offloading the payload when it exceeds the
    /// inline threshold.
    async fn store_test_case(
        &self,
        platform: &str,
        problem_id: &str,
        index: u32,
        input: &str,
        output: &str,
    ) -> Result<()> {
        // Payloads up to and including the threshold stay inline.
        let size = blob::payload_size(input, output);
        let item = if size > self.inline_threshold() as u64 {
            let object_key = blob::test_case_object_key(platform, problem_id, index);
            let compressed = blob::encode_payload(input, output).map_err(blob_err)?;
            debug!(
                key = %object_key,
                raw = size,
                compressed = compressed.len(),
                "offloading test-case payload"
            );
            self.blobs()
                .put(&object_key, compressed)
                .await
                .map_err(blob_err)?;
            offloaded_test_case_to_item(platform, problem_id, index, &object_key, size)
        } else {
            inline_test_case_to_item(
                platform,
                problem_id,
                &TestCase {
                    index,
                    input: input.to_string(),
                    output: output.to_string(),
                },
            )
        };
        self.store().put_item(item).await.map_err(infra)
    }

    /// All raw test-case records of a problem, in index order.
    async fn test_case_records(
        &self,
        platform: &str,
        problem_id: &str,
    ) -> Result<Vec<TestCaseRecord>> {
        let items = self
            .query_all(
                QueryRequest::table(keys::problem_pk(platform, problem_id))
                    .sort(SortCondition::BeginsWith(keys::TEST_CASE_PREFIX.to_string())),
            )
            .await
            .map_err(infra)?;
        items.iter().map(item_to_test_case_record).collect()
    }

    /// Writes the parent's cached test-case count and bumps `upd`.
    async fn write_test_case_count(
        &self,
        platform: &str,
        problem_id: &str,
        count: u32,
    ) -> Result<()> {
        use crate::store::UpdateAction;
        use aws_sdk_dynamodb::types::AttributeValue;

        self.store()
            .update_item(
                &keys::problem_pk(platform, problem_id),
                keys::META_SK,
                vec![
                    UpdateAction::set("dat.tcc", AttributeValue::N(count.to_string())),
                    UpdateAction::set(
                        "upd",
                        AttributeValue::N(Utc::now().timestamp().to_string()),
                    ),
                ],
            )
            .await
            .map_err(|e| super::on_update(e, ENTITY, coords(platform, problem_id)))?;
        Ok(())
    }

    /// Deletes all test-case items and their offloaded payloads. Returns how
    /// many items were removed.
    async fn purge_test_cases(&self, platform: &str, problem_id: &str) -> Result<u32> {
        let records = self.test_case_records(platform, problem_id).await?;
        if records.is_empty() {
            return Ok(0);
        }

        let pk = keys::problem_pk(platform, problem_id);
        let deletes: Vec<WriteOp> = records
            .iter()
            .map(|record| WriteOp::Delete {
                pk: pk.clone(),
                sk: keys::test_case_sk(record.index()),
            })
            .collect();
        let removed = self.store().batch_write(deletes).await.map_err(infra)?;

        for record in &records {
            if let TestCaseRecord::Offloaded { object_key, .. } = record {
                self.blobs().delete(object_key).await.map_err(blob_err)?;
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl<S: TableStore, B: BlobStore> ProblemRepository for SingleTableRepository<S, B> {
    async fn put_problem(&self, problem: &Problem) -> Result<()> {
        self.store()
            .put_item(problem_to_item(problem))
            .await
            .map_err(infra)
    }

    async fn get_problem(&self, platform: &str, problem_id: &str) -> Result<Option<Problem>> {
        match self
            .get_live_item(&keys::problem_pk(platform, problem_id), keys::META_SK)
            .await
        {
            Ok(Some(item)) => Ok(Some(item_to_problem(&item)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(infra(e)),
        }
    }

    async fn list_problems_by_status(
        &self,
        completed: bool,
        limit: u32,
        cursor: Option<String>,
    ) -> Result<Page<Problem>> {
        let page = self
            .store()
            .query(
                QueryRequest::index(Index::Gsi3, keys::problem_gsi3_pk(completed))
                    .limit(limit)
                    .cursor(cursor)
                    .backward(),
            )
            .await
            .map_err(infra)?;
        decode_page(page, item_to_problem)
    }

    async fn add_test_case(
        &self,
        platform: &str,
        problem_id: &str,
        input: &str,
        output: &str,
    ) -> Result<u32> {
        use crate::store::UpdateAction;
        use aws_sdk_dynamodb::types::AttributeValue;

        // Claim the next index with an atomic increment on the parent's
        // cached count, so concurrent adds cannot collide on a sort key.
        let updated = self
            .store()
            .update_item(
                &keys::problem_pk(platform, problem_id),
                keys::META_SK,
                vec![
                    UpdateAction::add("dat.tcc", 1),
                    UpdateAction::set(
                        "upd",
                        AttributeValue::N(Utc::now().timestamp().to_string()),
                    ),
                ],
            )
            .await
            .map_err(|e| super::on_update(e, ENTITY, coords(platform, problem_id)))?;

        let count = crate::envelope::get_i64(crate::envelope::dat(&updated)?, "tcc")?;
        let index = count.saturating_sub(1) as u32;
        self.store_test_case(platform, problem_id, index, input, output)
            .await?;
        Ok(index)
    }

    async fn put_test_cases(
        &self,
        platform: &str,
        problem_id: &str,
        cases: &[(String, String)],
    ) -> Result<u32> {
        self.require_problem(platform, problem_id).await?;
        self.purge_test_cases(platform, problem_id).await?;

        let writes: Vec<_> = cases
            .iter()
            .enumerate()
            .map(|(index, (input, output))| {
                self.store_test_case(platform, problem_id, index as u32, input, output)
            })
            .collect();
        stream::iter(writes)
            .buffer_unordered(self.write_concurrency())
            .try_collect::<Vec<()>>()
            .await?;

        let count = cases.len() as u32;
        self.write_test_case_count(platform, problem_id, count)
            .await?;
        Ok(count)
    }

    async fn get_test_cases(&self, platform: &str, problem_id: &str) -> Result<Vec<TestCase>> {
        let records = self.test_case_records(platform, problem_id).await?;
        let mut cases = Vec::with_capacity(records.len());
        for record in records {
            match record {
                TestCaseRecord::Inline(tc) => cases.push(tc),
                TestCaseRecord::Offloaded {
                    index,
                    object_key,
                    size,
                } => {
                    let bytes = self.blobs().get(&object_key).await.map_err(blob_err)?;
                    let (input, output) = blob::decode_payload(&bytes, size).map_err(blob_err)?;
                    cases.push(TestCase {
                        index,
                        input,
                        output,
                    });
                }
            }
        }
        Ok(cases)
    }

    async fn set_problem_completed(
        &self,
        platform: &str,
        problem_id: &str,
        completed: bool,
    ) -> Result<()> {
        // Full replace: the status-bucket projection moves with the flag and
        // stays absent for soft-deleted problems.
        let mut problem = self.require_problem(platform, problem_id).await?;
        problem.completed = completed;
        problem.updated_at = Utc::now();
        self.put_problem(&problem).await
    }

    async fn soft_delete_problem(
        &self,
        platform: &str,
        problem_id: &str,
        reason: &str,
    ) -> Result<()> {
        let mut problem = self.require_problem(platform, problem_id).await?;
        let now = Utc::now();
        problem.deleted = Some(Deletion {
            at: now,
            reason: reason.to_string(),
        });
        problem.updated_at = now;
        self.put_problem(&problem).await
    }

    async fn undelete_problem(&self, platform: &str, problem_id: &str) -> Result<()> {
        let mut problem = self.require_problem(platform, problem_id).await?;
        problem.deleted = None;
        problem.updated_at = Utc::now();
        self.put_problem(&problem).await
    }

    async fn delete_problem(&self, platform: &str, problem_id: &str) -> Result<()> {
        let removed = self.purge_test_cases(platform, problem_id).await?;
        self.store()
            .delete_item(&keys::problem_pk(platform, problem_id), keys::META_SK)
            .await
            .map_err(infra)?;
        debug!(
            problem = %coords(platform, problem_id),
            test_cases = removed,
            "problem deleted"
        );
        Ok(())
    }
}
