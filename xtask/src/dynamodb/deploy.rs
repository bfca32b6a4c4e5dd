//! Plan execution against DynamoDB (Imperative Shell).
//!
//! Pure plan calculation lives in `planning`; this module turns a plan into
//! SDK calls: create the table with its GSIs, add missing GSIs one at a time
//! (DynamoDB allows a single index mutation per UpdateTable), and switch on
//! TTL for the expiry attribute.

use super::client;
use super::config::{self, AttributeType, GsiConfig, KeyAttribute, TableConfig};
use super::error::{DynamodbError, Result};
use super::planning::{DeployPlan, DestroyPlan, GsiStatus, TableStatus};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, CreateGlobalSecondaryIndexAction, GlobalSecondaryIndex,
    GlobalSecondaryIndexUpdate, KeySchemaElement, KeyType, Projection, ProjectionType,
    ScalarAttributeType, TimeToLiveSpecification,
};
use aws_sdk_dynamodb::Client;
use std::time::Duration;

/// Execute a deploy plan.
pub async fn execute_deploy_plan(client: &Client, plan: &DeployPlan) -> Result<()> {
    match plan {
        DeployPlan::CreateTable { config } => {
            create_table(client, config).await?;
            wait_for_table_active(client, &config.table_name).await?;
            if let Some(attribute) = &config.ttl_attribute {
                enable_ttl(client, &config.table_name, attribute).await?;
            }
        }
        DeployPlan::UpdateTable {
            table_name,
            gsis_to_add,
            enable_ttl: ttl_attribute,
        } => {
            for gsi in gsis_to_add {
                add_gsi(client, table_name, gsi).await?;
                wait_for_table_active(client, table_name).await?;
            }
            if let Some(attribute) = ttl_attribute {
                enable_ttl(client, table_name, attribute).await?;
            }
        }
        DeployPlan::NoChanges { .. } => {}
    }
    Ok(())
}

/// Execute a destroy plan.
pub async fn execute_destroy_plan(client: &Client, plan: &DestroyPlan) -> Result<()> {
    if let DestroyPlan::DeleteTable { table_name } = plan {
        client
            .delete_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(sdk_err)?;
    }
    Ok(())
}

fn sdk_err(err: impl std::fmt::Display) -> DynamodbError {
    DynamodbError::AwsSdk(err.to_string())
}

fn scalar_type(attribute_type: AttributeType) -> ScalarAttributeType {
    match attribute_type {
        AttributeType::String => ScalarAttributeType::S,
    }
}

/// HASH element plus an optional RANGE element.
fn key_schema(
    partition_key: &KeyAttribute,
    sort_key: Option<&KeyAttribute>,
) -> Result<Vec<KeySchemaElement>> {
    let mut schema = Vec::with_capacity(2);
    for (attribute, key_type) in [(Some(partition_key), KeyType::Hash), (sort_key, KeyType::Range)]
    {
        if let Some(attribute) = attribute {
            schema.push(
                KeySchemaElement::builder()
                    .attribute_name(&attribute.name)
                    .key_type(key_type)
                    .build()
                    .map_err(sdk_err)?,
            );
        }
    }
    Ok(schema)
}

/// Attribute definitions for every key the table and its GSIs use, each
/// defined once even when shared between indexes.
fn attribute_definitions(config: &TableConfig) -> Result<Vec<AttributeDefinition>> {
    let mut keys: Vec<&KeyAttribute> = vec![&config.partition_key];
    keys.extend(config.sort_key.as_ref());
    for gsi in &config.gsis {
        keys.push(&gsi.partition_key);
        keys.extend(gsi.sort_key.as_ref());
    }
    let mut seen = std::collections::HashSet::new();
    keys.retain(|key| seen.insert(key.name.clone()));

    keys.into_iter()
        .map(|key| {
            AttributeDefinition::builder()
                .attribute_name(&key.name)
                .attribute_type(scalar_type(key.attribute_type))
                .build()
                .map_err(sdk_err)
        })
        .collect()
}

fn billing_mode(mode: config::BillingMode) -> BillingMode {
    match mode {
        config::BillingMode::PayPerRequest => BillingMode::PayPerRequest,
    }
}

fn gsi_projection(projection: &config::ProjectionType) -> Projection {
    match projection {
        config::ProjectionType::All => Projection::builder()
            .projection_type(ProjectionType::All)
            .build(),
    }
}

async fn create_table(client: &Client, config: &TableConfig) -> Result<()> {
    let mut request = client
        .create_table()
        .table_name(&config.table_name)
        .set_key_schema(Some(key_schema(
            &config.partition_key,
            config.sort_key.as_ref(),
        )?))
        .set_attribute_definitions(Some(attribute_definitions(config)?))
        .billing_mode(billing_mode(config.billing_mode));

    for gsi in &config.gsis {
        request = request.global_secondary_indexes(
            GlobalSecondaryIndex::builder()
                .index_name(&gsi.name)
                .set_key_schema(Some(key_schema(&gsi.partition_key, gsi.sort_key.as_ref())?))
                .projection(gsi_projection(&gsi.projection))
                .build()
                .map_err(sdk_err)?,
        );
    }

    request.send().await.map_err(sdk_err)?;
    Ok(())
}

async fn add_gsi(client: &Client, table_name: &str, gsi: &GsiConfig) -> Result<()> {
    let mut definitions = vec![AttributeDefinition::builder()
        .attribute_name(&gsi.partition_key.name)
        .attribute_type(scalar_type(gsi.partition_key.attribute_type))
        .build()
        .map_err(sdk_err)?];
    if let Some(sk) = &gsi.sort_key {
        definitions.push(
            AttributeDefinition::builder()
                .attribute_name(&sk.name)
                .attribute_type(scalar_type(sk.attribute_type))
                .build()
                .map_err(sdk_err)?,
        );
    }

    client
        .update_table()
        .table_name(table_name)
        .set_attribute_definitions(Some(definitions))
        .global_secondary_index_updates(
            GlobalSecondaryIndexUpdate::builder()
                .create(
                    CreateGlobalSecondaryIndexAction::builder()
                        .index_name(&gsi.name)
                        .set_key_schema(Some(key_schema(&gsi.partition_key, gsi.sort_key.as_ref())?))
                        .projection(gsi_projection(&gsi.projection))
                        .build()
                        .map_err(sdk_err)?,
                )
                .build(),
        )
        .send()
        .await
        .map_err(sdk_err)?;

    Ok(())
}

async fn enable_ttl(client: &Client, table_name: &str, attribute: &str) -> Result<()> {
    let spec = TimeToLiveSpecification::builder()
        .enabled(true)
        .attribute_name(attribute)
        .build()
        .map_err(sdk_err)?;

    client
        .update_time_to_live()
        .table_name(table_name)
        .time_to_live_specification(spec)
        .send()
        .await
        .map_err(sdk_err)?;
    Ok(())
}

/// Polls until the table and all its GSIs report ACTIVE.
async fn wait_for_table_active(client: &Client, table_name: &str) -> Result<()> {
    let max_attempts = 60;
    let delay = Duration::from_secs(2);

    for _ in 0..max_attempts {
        if let Some(state) = client::get_table_state(client, table_name).await? {
            if state.status == TableStatus::Active
                && state.gsis.iter().all(|g| g.status == GsiStatus::Active)
            {
                return Ok(());
            }
        }
        tokio::time::sleep(delay).await;
    }

    Err(DynamodbError::TableActivationTimeout)
}
