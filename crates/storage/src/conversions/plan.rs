use aws_sdk_dynamodb::types::AttributeValue;

use algoprep_core::model::SubscriptionPlan;
use algoprep_core::storage::RepositoryError;

use crate::envelope::{self, Envelope, Item, TYPE_PLAN};
use crate::keys;

/// `dat` field names for plan items.
mod field {
    pub const ID: &str = "id";
    pub const NAME: &str = "nm";
    pub const PRICE_CENTS: &str = "prc";
    pub const DAILY_SUBMISSIONS: &str = "dsl";
    pub const DAILY_GENERATIONS: &str = "dgl";
}

pub fn plan_to_item(plan: &SubscriptionPlan) -> Item {
    let mut dat = Item::new();
    dat.insert(field::ID.to_string(), AttributeValue::S(plan.id.clone()));
    dat.insert(field::NAME.to_string(), AttributeValue::S(plan.name.clone()));
    dat.insert(
        field::PRICE_CENTS.to_string(),
        AttributeValue::N(plan.price_cents.to_string()),
    );
    dat.insert(
        field::DAILY_SUBMISSIONS.to_string(),
        AttributeValue::N(plan.daily_submission_limit.to_string()),
    );
    dat.insert(
        field::DAILY_GENERATIONS.to_string(),
        AttributeValue::N(plan.daily_generation_limit.to_string()),
    );

    Envelope::new(keys::plan_pk(), keys::plan_sk(&plan.id), TYPE_PLAN)
        .timestamps(plan.created_at, plan.updated_at)
        .dat(dat)
        .build()
}

pub fn item_to_plan(item: &Item) -> Result<SubscriptionPlan, RepositoryError> {
    let dat = envelope::dat(item)?;
    Ok(SubscriptionPlan {
        id: envelope::get_string(dat, field::ID)?,
        name: envelope::get_string(dat, field::NAME)?,
        price_cents: envelope::get_i64(dat, field::PRICE_CENTS)?,
        daily_submission_limit: envelope::get_i64(dat, field::DAILY_SUBMISSIONS)? as u32,
        daily_generation_limit: envelope::get_i64(dat, field::DAILY_GENERATIONS)? as u32,
        created_at: envelope::get_timestamp(item, envelope::ATTR_CREATED)?,
        updated_at: envelope::get_timestamp(item, envelope::ATTR_UPDATED)?,
    })
}
