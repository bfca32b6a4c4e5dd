use aws_sdk_dynamodb::types::AttributeValue;

use algoprep_core::model::SearchHistory;
use algoprep_core::storage::RepositoryError;

use crate::envelope::{
    self, Envelope, Item, ATTR_GSI1_PK, ATTR_GSI1_SK, ATTR_GSI2_PK, ATTR_GSI2_SK, TYPE_HISTORY,
};
use crate::keys;

/// `dat` field names for search-history items.
mod field {
    pub const ID: &str = "hid";
    pub const USER_ID: &str = "uid";
    pub const PLATFORM: &str = "pf";
    pub const PROBLEM_ID: &str = "pid";
    pub const LANGUAGE: &str = "lng";
    pub const CODE: &str = "cod";
    pub const VERDICT: &str = "vd";
    pub const PUBLIC: &str = "pub";
    pub const CREATED_AT: &str = "cat";
    pub const UPDATED_AT: &str = "uat";
}

pub fn history_to_item(entry: &SearchHistory) -> Item {
    let mut dat = Item::new();
    dat.insert(
        field::ID.to_string(),
        AttributeValue::S(entry.id.to_string()),
    );
    dat.insert(
        field::USER_ID.to_string(),
        AttributeValue::S(entry.user_id.to_string()),
    );
    dat.insert(
        field::PLATFORM.to_string(),
        AttributeValue::S(entry.platform.clone()),
    );
    dat.insert(
        field::PROBLEM_ID.to_string(),
        AttributeValue::S(entry.problem_id.clone()),
    );
    dat.insert(
        field::LANGUAGE.to_string(),
        AttributeValue::S(entry.language.clone()),
    );
    dat.insert(
        field::CODE.to_string(),
        AttributeValue::S(entry.code.clone()),
    );
    if let Some(verdict) = &entry.verdict {
        dat.insert(
            field::VERDICT.to_string(),
            AttributeValue::S(verdict.clone()),
        );
    }
    dat.insert(field::PUBLIC.to_string(), AttributeValue::Bool(entry.public));
    // Listing order needs millisecond precision; the envelope timestamps are
    // whole seconds.
    dat.insert(
        field::CREATED_AT.to_string(),
        AttributeValue::N(entry.created_at.timestamp_millis().to_string()),
    );
    dat.insert(
        field::UPDATED_AT.to_string(),
        AttributeValue::N(entry.updated_at.timestamp_millis().to_string()),
    );

    let mut item = Envelope::new(
        keys::history_pk(entry.id),
        keys::META_SK.to_string(),
        TYPE_HISTORY,
    )
    .timestamps(entry.created_at, entry.updated_at)
    .dat(dat)
    .build();

    let created_millis = entry.created_at.timestamp_millis();
    item.insert(
        ATTR_GSI1_PK.to_string(),
        AttributeValue::S(keys::history_gsi1_pk(entry.user_id)),
    );
    item.insert(
        ATTR_GSI1_SK.to_string(),
        AttributeValue::S(keys::history_gsi1_sk(created_millis)),
    );
    // The public feed is a sparse projection: private entries carry no GSI2
    // attributes at all.
    if entry.public {
        item.insert(
            ATTR_GSI2_PK.to_string(),
            AttributeValue::S(keys::PUBLIC_HISTORY_PK.to_string()),
        );
        item.insert(
            ATTR_GSI2_SK.to_string(),
            AttributeValue::S(keys::history_gsi2_sk(created_millis)),
        );
    }

    item
}

pub fn item_to_history(item: &Item) -> Result<SearchHistory, RepositoryError> {
    let dat = envelope::dat(item)?;
    Ok(SearchHistory {
        id: envelope::get_uuid(dat, field::ID)?,
        user_id: envelope::get_uuid(dat, field::USER_ID)?,
        platform: envelope::get_string(dat, field::PLATFORM)?,
        problem_id: envelope::get_string(dat, field::PROBLEM_ID)?,
        language: envelope::get_string(dat, field::LANGUAGE)?,
        code: envelope::get_string(dat, field::CODE)?,
        verdict: envelope::get_optional_string(dat, field::VERDICT),
        public: envelope::get_bool(dat, field::PUBLIC)?,
        created_at: envelope::get_timestamp_millis(dat, field::CREATED_AT)?,
        updated_at: envelope::get_timestamp_millis(dat, field::UPDATED_AT)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use uuid::Uuid;

    fn fixture() -> SearchHistory {
        let ts = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let mut entry = SearchHistory::new(
            Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap(),
            "codeforces",
            "2149G",
            "python",
            "print('hello')",
        )
        .with_id(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440004").unwrap());
        entry.verdict = Some("12/12 passed".to_string());
        entry.created_at = ts;
        entry.updated_at = ts;
        entry
    }

    #[test]
    fn test_round_trip() {
        let entry = fixture();
        assert_eq!(item_to_history(&history_to_item(&entry)).unwrap(), entry);
    }

    #[test]
    fn test_private_entry_has_no_feed_projection() {
        let item = history_to_item(&fixture());
        assert!(!item.contains_key(ATTR_GSI2_PK));
        assert!(!item.contains_key(ATTR_GSI2_SK));
    }

    #[test]
    fn test_public_entry_joins_feed() {
        let mut entry = fixture();
        entry.public = true;
        let item = history_to_item(&entry);
        assert_eq!(
            item.get(ATTR_GSI2_PK).unwrap().as_s().unwrap(),
            "PUBLIC#HIST"
        );
        assert_eq!(
            item.get(ATTR_GSI2_SK).unwrap().as_s().unwrap(),
            "01700000000123"
        );
        assert_eq!(item_to_history(&item).unwrap(), entry);
    }

    #[test]
    fn test_user_feed_orders_by_millis() {
        let item = history_to_item(&fixture());
        assert_eq!(
            item.get(ATTR_GSI1_SK).unwrap().as_s().unwrap(),
            "HIST#01700000000123"
        );
    }
}
