//! Backfills status-index projections on job items written before the
//! indexes existed. Old rows are detected by a missing `GSI1PK` or a stale
//! key-format version; rewriting re-encodes the item, which adds the
//! projections and stamps the current version.

use tracing::info;

use algoprep_core::storage::Result;

use crate::conversions::{
    extraction_job_to_item, item_to_extraction_job, item_to_script_job, script_job_to_item,
};
use crate::envelope::{
    self, Item, ATTR_GSI1_PK, ATTR_KEY_VERSION, ATTR_PK, ATTR_TYPE, TYPE_EXTRACTION_JOB,
    TYPE_SCRIPT_JOB,
};
use crate::keys::KEY_VERSION;
use crate::repository::infra;
use crate::store::TableStore;

use super::{MigrationOptions, MigrationReport};

fn needs_rewrite(item: &Item) -> bool {
    let version = envelope::get_optional_i64(item, ATTR_KEY_VERSION).unwrap_or(0);
    !item.contains_key(ATTR_GSI1_PK) || version < KEY_VERSION as i64
}

fn rewrite(item: &Item, type_tag: &str) -> Result<Item> {
    if type_tag == TYPE_SCRIPT_JOB {
        Ok(script_job_to_item(&item_to_script_job(item)?))
    } else {
        Ok(extraction_job_to_item(&item_to_extraction_job(item)?))
    }
}

pub async fn backfill_job_indexes<S: TableStore>(
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
            let type_tag = match envelope::get_optional_string(item, ATTR_TYPE) {
                Some(tag) if tag == TYPE_SCRIPT_JOB || tag == TYPE_EXTRACTION_JOB => tag,
                _ => continue,
            };
            report.scanned += 1;

            if !needs_rewrite(item) {
                report.skipped += 1;
                continue;
            }

            let context = envelope::get_optional_string(item, ATTR_PK).unwrap_or_default();
            let rewritten = match rewrite(item, &type_tag) {
                Ok(rewritten) => rewritten,
                Err(e) => {
                    report.failure(&context, &e);
                    continue;
                }
            };

            if options.dry_run {
                report.updated += 1;
                continue;
            }
            match store.put_item(rewritten).await {
                Ok(()) => report.updated += 1,
                Err(e) => report.failure(&context, &infra(e)),
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(dry_run = options.dry_run, %report, "job index backfill finished");
    Ok(report)
}
