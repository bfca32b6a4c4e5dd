use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};

use algoprep_core::model::UsageLog;
use algoprep_core::storage::RepositoryError;

use crate::envelope::{self, Envelope, Item, TYPE_USAGE};
use crate::keys;

/// `dat` field names for usage items.
mod field {
    pub const ID: &str = "id";
    pub const USER_ID: &str = "uid";
    pub const ACTION: &str = "act";
    pub const DETAIL: &str = "dtl";
    pub const RECORDED_AT: &str = "rat";
}

/// Builds an append-only usage item. `expires_at` is the TTL cutoff after
/// which the engine reclaims the row.
pub fn usage_to_item(log: &UsageLog, expires_at: DateTime<Utc>) -> Item {
    let mut dat = Item::new();
    dat.insert(field::ID.to_string(), AttributeValue::S(log.id.to_string()));
    dat.insert(
        field::USER_ID.to_string(),
        AttributeValue::S(log.user_id.to_string()),
    );
    dat.insert(
        field::ACTION.to_string(),
        AttributeValue::S(log.action.clone()),
    );
    if let Some(detail) = &log.detail {
        dat.insert(field::DETAIL.to_string(), AttributeValue::S(detail.clone()));
    }
    dat.insert(
        field::RECORDED_AT.to_string(),
        AttributeValue::N(log.recorded_at.timestamp_millis().to_string()),
    );

    Envelope::new(
        keys::usage_pk(log.user_id, log.day()),
        keys::usage_sk(log.recorded_at.timestamp_millis(), log.id),
        TYPE_USAGE,
    )
    .timestamps(log.recorded_at, log.recorded_at)
    .expires(Some(expires_at))
    .dat(dat)
    .build()
}

pub fn item_to_usage(item: &Item) -> Result<UsageLog, RepositoryError> {
    let dat = envelope::dat(item)?;
    Ok(UsageLog {
        id: envelope::get_uuid(dat, field::ID)?,
        user_id: envelope::get_uuid(dat, field::USER_ID)?,
        action: envelope::get_string(dat, field::ACTION)?,
        detail: envelope::get_optional_string(dat, field::DETAIL),
        recorded_at: envelope::get_timestamp_millis(dat, field::RECORDED_AT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{ATTR_EXPIRES, ATTR_PK, ATTR_SK};
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn test_round_trip_and_day_partition() {
        let user_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap();
        let mut log = UsageLog::new(user_id, "submission");
        log.detail = Some("codeforces/2149G".to_string());
        // 2023-11-14T22:13:20.123Z
        log.recorded_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        let item = usage_to_item(&log, log.recorded_at + Duration::days(90));
        assert_eq!(
            item.get(ATTR_PK).unwrap().as_s().unwrap(),
            "USAGE#550e8400-e29b-41d4-a716-446655440001#2023-11-14"
        );
        assert!(item
            .get(ATTR_SK)
            .unwrap()
            .as_s()
            .unwrap()
            .starts_with("ULOG#01700000000123#"));
        assert!(item.contains_key(ATTR_EXPIRES));
        assert_eq!(item_to_usage(&item).unwrap(), log);
    }
}
