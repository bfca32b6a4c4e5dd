//! Moves subscription plans from per-plan partitions (`PLAN#<id>` / `META`)
//! into the shared `PLAN` partition, where listing all plans is one query.
//!
//! Two phases, run separately: [`migrate_plan_layout`] writes the new-shape
//! items, [`cleanup_legacy_plans`] deletes an old item only once its
//! new-shape counterpart exists. A crash between the phases leaves both
//! shapes present, which reads tolerate because lookups go to the new keys.

use tracing::{info, warn};

use algoprep_core::storage::Result;

use crate::conversions::{item_to_plan, plan_to_item};
use crate::envelope::{self, Item, ATTR_PK, ATTR_TYPE, TYPE_PLAN};
use crate::keys;
use crate::repository::infra;
use crate::store::{StoreError, TableStore};

use super::{MigrationOptions, MigrationReport};

fn is_legacy_plan(item: &Item) -> bool {
    let type_tag = envelope::get_optional_string(item, ATTR_TYPE);
    let pk = envelope::get_optional_string(item, ATTR_PK);
    type_tag.as_deref() == Some(TYPE_PLAN)
        && pk.as_deref().is_some_and(|pk| pk != keys::PLAN_PARTITION)
}

pub async fn migrate_plan_layout<S: TableStore>(
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
            if !is_legacy_plan(item) {
                continue;
            }
            report.scanned += 1;
            let context = envelope::get_optional_string(item, ATTR_PK).unwrap_or_default();

            let plan = match item_to_plan(item) {
                Ok(plan) => plan,
                Err(e) => {
                    report.failure(&context, &e);
                    continue;
                }
            };

            if options.dry_run {
                match store.get_item(&keys::plan_pk(), &keys::plan_sk(&plan.id)).await {
                    Ok(Some(_)) => report.skipped += 1,
                    Ok(None) => report.updated += 1,
                    Err(e) => report.failure(&context, &infra(e)),
                }
                continue;
            }

            // Conditional insert keeps re-runs from clobbering an item the
            // first run already wrote.
            match store.put_item_if_absent(plan_to_item(&plan)).await {
                Ok(()) => report.updated += 1,
                Err(StoreError::ConditionFailed) => report.skipped += 1,
                Err(e) => report.failure(&context, &infra(e)),
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(dry_run = options.dry_run, %report, "plan layout migration finished");
    Ok(report)
}

/// Deletes legacy plan items whose new-shape counterpart exists. Run only
/// after [`migrate_plan_layout`] reports clean.
pub async fn cleanup_legacy_plans<S: TableStore>(
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
            if !is_legacy_plan(item) {
                continue;
            }
            report.scanned += 1;
            let context = envelope::get_optional_string(item, ATTR_PK).unwrap_or_default();

            let plan_id = match item_to_plan(item) {
                Ok(plan) => plan.id,
                Err(e) => {
                    report.failure(&context, &e);
                    continue;
                }
            };

            let counterpart = store
                .get_item(&keys::plan_pk(), &keys::plan_sk(&plan_id))
                .await;
            match counterpart {
                Ok(Some(_)) => {
                    if options.dry_run {
                        report.updated += 1;
                    } else {
                        match store
                            .delete_item(&keys::legacy_plan_pk(&plan_id), keys::META_SK)
                            .await
                        {
                            Ok(()) => report.updated += 1,
                            Err(e) => report.failure(&context, &infra(e)),
                        }
                    }
                }
                Ok(None) => {
                    warn!(plan_id, "legacy plan has no migrated counterpart, keeping it");
                    report.skipped += 1;
                }
                Err(e) => report.failure(&context, &infra(e)),
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(dry_run = options.dry_run, %report, "legacy plan cleanup finished");
    Ok(report)
}
