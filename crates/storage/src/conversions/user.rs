use aws_sdk_dynamodb::types::AttributeValue;

use algoprep_core::model::User;
use algoprep_core::storage::RepositoryError;

use crate::envelope::{
    self, Envelope, Item, ATTR_GSI1_PK, ATTR_GSI1_SK, ATTR_GSI2_PK, ATTR_GSI2_SK, TYPE_USER,
};
use crate::keys;

/// `dat` field names for user items.
mod field {
    pub const ID: &str = "id";
    pub const EMAIL: &str = "em";
    pub const NAME: &str = "nm";
    pub const OAUTH_PROVIDER: &str = "oap";
    pub const OAUTH_SUBJECT: &str = "oas";
    pub const PLAN: &str = "pln";
    pub const ACTIVE: &str = "act";
}

pub fn user_to_item(user: &User) -> Item {
    let mut dat = Item::new();
    dat.insert(
        field::ID.to_string(),
        AttributeValue::S(user.id.to_string()),
    );
    dat.insert(
        field::EMAIL.to_string(),
        AttributeValue::S(user.email.clone()),
    );
    dat.insert(
        field::NAME.to_string(),
        AttributeValue::S(user.name.clone()),
    );
    if let Some(provider) = &user.oauth_provider {
        dat.insert(
            field::OAUTH_PROVIDER.to_string(),
            AttributeValue::S(provider.clone()),
        );
    }
    if let Some(subject) = &user.oauth_subject {
        dat.insert(
            field::OAUTH_SUBJECT.to_string(),
            AttributeValue::S(subject.clone()),
        );
    }
    if let Some(plan_id) = &user.plan_id {
        dat.insert(field::PLAN.to_string(), AttributeValue::S(plan_id.clone()));
    }
    dat.insert(field::ACTIVE.to_string(), AttributeValue::Bool(user.active));

    let mut item = Envelope::new(keys::user_pk(user.id), keys::META_SK.to_string(), TYPE_USER)
        .timestamps(user.created_at, user.updated_at)
        .dat(dat)
        .build();

    item.insert(
        ATTR_GSI1_PK.to_string(),
        AttributeValue::S(keys::user_gsi1_pk(&user.email)),
    );
    item.insert(
        ATTR_GSI1_SK.to_string(),
        AttributeValue::S(keys::user_gsi1_sk(user.id)),
    );
    // OAuth lookup projection is sparse: only accounts with an external
    // identity appear in GSI2.
    if let (Some(provider), Some(subject)) = (&user.oauth_provider, &user.oauth_subject) {
        item.insert(
            ATTR_GSI2_PK.to_string(),
            AttributeValue::S(keys::user_gsi2_pk(provider, subject)),
        );
        item.insert(
            ATTR_GSI2_SK.to_string(),
            AttributeValue::S(keys::user_gsi2_sk(user.id)),
        );
    }

    item
}

pub fn item_to_user(item: &Item) -> Result<User, RepositoryError> {
    let dat = envelope::dat(item)?;
    Ok(User {
        id: envelope::get_uuid(dat, field::ID)?,
        email: envelope::get_string(dat, field::EMAIL)?,
        name: envelope::get_string(dat, field::NAME)?,
        oauth_provider: envelope::get_optional_string(dat, field::OAUTH_PROVIDER),
        oauth_subject: envelope::get_optional_string(dat, field::OAUTH_SUBJECT),
        plan_id: envelope::get_optional_string(dat, field::PLAN),
        active: envelope::get_bool(dat, field::ACTIVE)?,
        created_at: envelope::get_timestamp(item, envelope::ATTR_CREATED)?,
        updated_at: envelope::get_timestamp(item, envelope::ATTR_UPDATED)?,
    })
}
