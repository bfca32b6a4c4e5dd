use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use algoprep_core::model::{JobStatus, JobType, ProgressEntry};
use algoprep_core::storage::RepositoryError;

use crate::envelope::{self, Envelope, Item, TYPE_PROGRESS};
use crate::keys;

/// `dat` field names for progress items.
mod field {
    pub const STEP: &str = "stp";
    pub const MESSAGE: &str = "msg";
    pub const STATUS: &str = "st";
    pub const RECORDED_AT: &str = "rat";
}

/// Builds an append-only progress item. `entry_id` breaks sort-key ties for
/// appends landing in the same millisecond; `expires_at` is the TTL cutoff
/// after which the engine reclaims the row.
pub fn progress_to_item(
    job_type: JobType,
    job_id: Uuid,
    entry_id: Uuid,
    entry: &ProgressEntry,
    expires_at: DateTime<Utc>,
) -> Item {
    let mut dat = Item::new();
    dat.insert(
        field::STEP.to_string(),
        AttributeValue::S(entry.step.clone()),
    );
    dat.insert(
        field::MESSAGE.to_string(),
        AttributeValue::S(entry.message.clone()),
    );
    dat.insert(
        field::STATUS.to_string(),
        AttributeValue::S(entry.status.as_str().to_string()),
    );
    dat.insert(
        field::RECORDED_AT.to_string(),
        AttributeValue::N(entry.recorded_at.timestamp_millis().to_string()),
    );

    Envelope::new(
        keys::progress_pk(job_type, job_id),
        keys::progress_sk(entry.recorded_at.timestamp_millis(), entry_id),
        TYPE_PROGRESS,
    )
    .timestamps(entry.recorded_at, entry.recorded_at)
    .expires(Some(expires_at))
    .dat(dat)
    .build()
}

pub fn item_to_progress(item: &Item) -> Result<ProgressEntry, RepositoryError> {
    let dat = envelope::dat(item)?;
    let raw_status = envelope::get_string(dat, field::STATUS)?;
    Ok(ProgressEntry {
        step: envelope::get_string(dat, field::STEP)?,
        message: envelope::get_string(dat, field::MESSAGE)?,
        status: JobStatus::parse(&raw_status).ok_or_else(|| {
            RepositoryError::InvalidData(format!("Unknown job status: {}", raw_status))
        })?,
        recorded_at: envelope::get_timestamp_millis(dat, field::RECORDED_AT)?,
    })
}
