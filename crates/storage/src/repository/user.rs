use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::Utc;
use uuid::Uuid;

use algoprep_core::model::User;
use algoprep_core::storage::{Result, UserRepository};

use crate::blob::BlobStore;
use crate::conversions::{item_to_user, user_to_item};
use crate::keys;
use crate::store::{Index, QueryRequest, TableStore, UpdateAction};

use super::{infra, not_found, on_create, on_update, SingleTableRepository};

const ENTITY: &str = "User";

impl<S: TableStore, B: BlobStore> SingleTableRepository<S, B> {
    /// Single-item lookup through a sparse unique index.
    async fn find_user(&self, index: Index, hash_value: String) -> Result<Option<User>> {
        let page = self
            .store()
            .query(QueryRequest::index(index, hash_value).limit(1))
            .await
            .map_err(infra)?;
        match page.items.first() {
            Some(item) => Ok(Some(item_to_user(item)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<S: TableStore, B: BlobStore> UserRepository for SingleTableRepository<S, B> {
    async fn create_user(&self, user: &User) -> Result<()> {
        // Email uniqueness is enforced by lookup before the conditional
        // insert; the insert itself guards the id.
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(algoprep_core::storage::RepositoryError::AlreadyExists {
                entity_type: ENTITY,
                id: user.email.clone(),
            });
        }
        self.store()
            .put_item_if_absent(user_to_item(user))
            .await
            .map_err(|e| on_create(e, ENTITY, user.id.to_string()))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        match self.get_live_item(&keys::user_pk(id), keys::META_SK).await {
            Ok(Some(item)) => Ok(Some(item_to_user(&item)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(infra(e)),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user(Index::Gsi1, keys::user_gsi1_pk(email)).await
    }

    async fn get_user_by_oauth(&self, provider: &str, subject: &str) -> Result<Option<User>> {
        self.find_user(Index::Gsi2, keys::user_gsi2_pk(provider, subject))
            .await
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        // Full replace so the email and OAuth projections follow the new
        // field values; the existence check keeps updates from resurrecting
        // deleted accounts.
        if self.get_user(user.id).await?.is_none() {
            return Err(not_found(ENTITY, user.id.to_string()));
        }
        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        self.store()
            .put_item(user_to_item(&updated))
            .await
            .map_err(infra)
    }

    async fn set_user_plan(&self, id: Uuid, plan_id: Option<&str>) -> Result<()> {
        let mut actions = vec![UpdateAction::set(
            "upd",
            AttributeValue::N(Utc::now().timestamp().to_string()),
        )];
        match plan_id {
            Some(plan_id) => actions.push(UpdateAction::set(
                "dat.pln",
                AttributeValue::S(plan_id.to_string()),
            )),
            None => actions.push(UpdateAction::remove("dat.pln")),
        }
        self.store()
            .update_item(&keys::user_pk(id), keys::META_SK, actions)
            .await
            .map_err(|e| on_update(e, ENTITY, id.to_string()))?;
        Ok(())
    }
}

impl<S: TableStore, B: BlobStore> SingleTableRepository<S, B> {
    /// Looks up a user for token issuance. Inactive or missing accounts both
    /// surface as `NotFound`; the issuer never learns which.
    pub async fn token_subject(
        &self,
        email: &str,
    ) -> Result<algoprep_core::model::TokenSubject> {
        let user = self
            .get_user_by_email(email)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| not_found(ENTITY, email.to_string()))?;
        Ok(algoprep_core::model::TokenSubject::from(&user))
    }
}
