//! Repairs the cached `test_case_count` on problem items by recounting the
//! actual child items. The cache is maintained by writers; this backfill
//! converges it after partial bulk writes or manual surgery.

use aws_sdk_dynamodb::types::AttributeValue;
use tracing::info;

use algoprep_core::storage::Result;

use crate::envelope::{self, Item, ATTR_KEY_VERSION, ATTR_PK, ATTR_TYPE, TYPE_PROBLEM};
use crate::keys::{self, KEY_VERSION};
use crate::repository::infra;
use crate::store::{QueryRequest, SortCondition, TableStore, UpdateAction};

use super::{MigrationOptions, MigrationReport};

fn cached_count(item: &Item) -> Option<i64> {
    envelope::dat(item)
        .ok()
        .and_then(|dat| envelope::get_optional_i64(dat, "tcc"))
}

async fn actual_count<S: TableStore>(store: &S, problem_pk: &str) -> Result<i64> {
    let mut count = 0i64;
    let mut cursor = None;
    loop {
        let page = store
            .query(
                QueryRequest::table(problem_pk)
                    .sort(SortCondition::BeginsWith(keys::TEST_CASE_PREFIX.to_string()))
                    .cursor(cursor.take()),
            )
            .await
            .map_err(infra)?;
        count += page.items.len() as i64;
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(count),
        }
    }
}

pub async fn backfill_test_case_counts<S: TableStore>(
    store: &S,
    options: &MigrationOptions,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    let mut cursor = None;

    loop {
        let page = store
            .scan(Some(options.page_size), cursor.take())
            .await
            .map_err(infra)?;

        for item in &page.items {
            if envelope::get_optional_string(item, ATTR_TYPE).as_deref() != Some(TYPE_PROBLEM) {
                continue;
            }
            report.scanned += 1;
            let Some(pk) = envelope::get_optional_string(item, ATTR_PK) else {
                continue;
            };

            let actual = match actual_count(store, &pk).await {
                Ok(actual) => actual,
                Err(e) => {
                    report.failure(&pk, &e);
                    continue;
                }
            };

            if cached_count(item) == Some(actual) {
                report.skipped += 1;
                continue;
            }
            if options.dry_run {
                report.updated += 1;
                continue;
            }

            let actions = vec![
                UpdateAction::set("dat.tcc", AttributeValue::N(actual.to_string())),
                UpdateAction::set(ATTR_KEY_VERSION, AttributeValue::N(KEY_VERSION.to_string())),
            ];
            match store.update_item(&pk, keys::META_SK, actions).await {
                Ok(_) => report.updated += 1,
                Err(e) => report.failure(&pk, &infra(e)),
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(dry_run = options.dry_run, %report, "test-case count backfill finished");
    Ok(report)
}
