//! DynamoDB infrastructure management commands.

mod client;
mod config;
mod deploy;
mod error;
mod planning;
mod seed;

pub use error::{DynamodbError, Result};

use crate::prelude::*;
use dialoguer::Confirm;

/// DynamoDB infrastructure management commands.
#[derive(Debug, clap::Parser)]
pub struct DynamodbCommand {
    #[command(subcommand)]
    pub action: DynamodbAction,
}

/// Available DynamoDB actions.
#[derive(Debug, clap::Subcommand)]
pub enum DynamodbAction {
    /// Deploy or destroy DynamoDB table infrastructure.
    Deploy(DeployCommand),

    /// Show the current state of the table.
    Status(StatusCommand),

    /// Seed the table with demo plans and a sample problem.
    Seed(SeedCommand),
}

/// Deploy or update DynamoDB infrastructure.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Deploy or destroy DynamoDB table infrastructure.

By default, this command creates or updates the algoprep DynamoDB table
with the required schema, Global Secondary Indexes (GSIs), and the TTL
setting on the expiry attribute.

The command shows a plan of changes before applying and asks for confirmation.

Environment variables:
  AWS_ENDPOINT_URL    - Use local DynamoDB (e.g., http://localhost:8000)
  AWS_REGION          - AWS region (defaults to us-east-1)
  AWS_PROFILE         - AWS profile to use for credentials")]
pub struct DeployCommand {
    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,

    /// Destroy the table instead of creating/updating.
    #[arg(long)]
    pub destroy: bool,

    /// Table name to use.
    #[arg(long, default_value = "algoprep")]
    pub table_name: String,
}

/// Show the current state of the table.
#[derive(Debug, clap::Parser)]
pub struct StatusCommand {
    /// Table name to use.
    #[arg(long, default_value = "algoprep")]
    pub table_name: String,
}

/// Seed the table with demo data.
#[derive(Debug, clap::Parser)]
#[command(long_about = "Insert demo data into DynamoDB.

Writes the built-in subscription plans (free and pro) and one draft
problem with a handful of test cases. Re-running overwrites the same
rows, so this is safe to repeat against a development table.")]
pub struct SeedCommand {
    /// Table name to use.
    #[arg(long, default_value = "algoprep")]
    pub table_name: String,

    /// Skip confirmation prompts.
    #[arg(long)]
    pub force: bool,
}

/// Main entry point for dynamodb command.
pub async fn run(command: DynamodbCommand, global: crate::Global) -> Result<()> {
    match command.action {
        DynamodbAction::Deploy(deploy_cmd) => run_deploy(deploy_cmd, &global).await,
        DynamodbAction::Status(status_cmd) => run_status(status_cmd, &global).await,
        DynamodbAction::Seed(seed_cmd) => run_seed(seed_cmd, &global).await,
    }
}

async fn run_deploy(cmd: DeployCommand, global: &crate::Global) -> Result<()> {
    let aws_config = client::AwsConfig::default();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    let dynamo_client = client::create_client(&aws_config).await?;
    let current_state = client::get_table_state(&dynamo_client, &cmd.table_name).await?;

    if cmd.destroy {
        // Destroy flow
        let plan = planning::calculate_destroy_plan(current_state.as_ref(), &cmd.table_name);

        if !global.is_silent() {
            aprintln!("{}", p_y("Destroy Plan:"));
            for line in planning::format_destroy_plan(&plan) {
                aprintln!("  {}", p_r(&line));
            }
            aprintln!();
        }

        if matches!(plan, planning::DestroyPlan::AlreadyGone { .. }) {
            if !global.is_silent() {
                aprintln!("{}", p_g("Nothing to destroy."));
            }
            return Ok(());
        }

        if !cmd.force {
            let confirmed = Confirm::new()
                .with_prompt("Are you sure you want to delete this table? ALL DATA WILL BE LOST")
                .default(false)
                .interact()
                .map_err(|e| DynamodbError::AwsSdk(e.to_string()))?;

            if !confirmed {
                return Err(DynamodbError::UserCancelled);
            }
        }

        if !global.is_silent() {
            aprintln!("{}", p_b("Deleting table..."));
        }

        deploy::execute_destroy_plan(&dynamo_client, &plan).await?;

        if !global.is_silent() {
            aprintln!("{}", p_g("Table destroyed successfully."));
        }
    } else {
        // Deploy flow
        let table_config = config::algoprep_table_config().with_table_name(&cmd.table_name);

        let plan = planning::calculate_deploy_plan(current_state.as_ref(), &table_config);

        if !global.is_silent() {
            aprintln!("{}", p_c("Deploy Plan:"));
            for line in planning::format_deploy_plan(&plan) {
                if line.starts_with('+') {
                    aprintln!("  {}", p_g(&line));
                } else if line.starts_with('-') {
                    aprintln!("  {}", p_r(&line));
                } else if line.starts_with('~') {
                    aprintln!("  {}", p_y(&line));
                } else {
                    aprintln!("  {}", line);
                }
            }
            aprintln!();
        }

        if matches!(plan, planning::DeployPlan::NoChanges { .. }) {
            if !global.is_silent() {
                aprintln!("{}", p_g("Infrastructure is up to date."));
            }
            return Ok(());
        }

        if !cmd.force {
            let confirmed = Confirm::new()
                .with_prompt("Apply these changes?")
                .default(true)
                .interact()
                .map_err(|e| DynamodbError::AwsSdk(e.to_string()))?;

            if !confirmed {
                return Err(DynamodbError::UserCancelled);
            }
        }

        if !global.is_silent() {
            aprintln!("{}", p_b("Applying changes..."));
        }

        deploy::execute_deploy_plan(&dynamo_client, &plan).await?;

        if !global.is_silent() {
            aprintln!("{}", p_g("Infrastructure deployed successfully."));
        }
    }

    Ok(())
}

async fn run_status(cmd: StatusCommand, global: &crate::Global) -> Result<()> {
    let aws_config = client::AwsConfig::default();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!();
    }

    let dynamo_client = client::create_client(&aws_config).await?;
    let current_state = client::get_table_state(&dynamo_client, &cmd.table_name).await?;

    match current_state {
        None => {
            aprintln!("{}", p_y(&format!("Table '{}' does not exist", cmd.table_name)));
        }
        Some(state) => {
            aprintln!("{} {:?}", p_b("Table status:"), state.status);
            if state.gsis.is_empty() {
                aprintln!("{}", p_y("No GSIs"));
            } else {
                for gsi in &state.gsis {
                    aprintln!("  {} {} ({:?})", p_b("GSI:"), gsi.name, gsi.status);
                }
            }
            match &state.ttl_attribute {
                Some(attribute) => aprintln!("{} enabled on '{}'", p_b("TTL:"), attribute),
                None => aprintln!("{} disabled", p_b("TTL:")),
            }

            let desired = config::algoprep_table_config().with_table_name(&cmd.table_name);
            let plan = planning::calculate_deploy_plan(Some(&state), &desired);
            aprintln!();
            if matches!(plan, planning::DeployPlan::NoChanges { .. }) {
                aprintln!("{}", p_g("Schema matches the desired configuration."));
            } else {
                aprintln!("{}", p_y("Schema drift detected. Run `xtask dynamodb deploy`:"));
                for line in planning::format_deploy_plan(&plan) {
                    aprintln!("  {}", line);
                }
            }
        }
    }

    Ok(())
}

async fn run_seed(cmd: SeedCommand, global: &crate::Global) -> Result<()> {
    let aws_config = client::AwsConfig::default();

    if !global.is_silent() {
        aprintln!("{} {}", p_b("Target:"), aws_config.target_display());
        aprintln!("{} {}", p_b("Table:"), cmd.table_name);
        aprintln!();
    }

    let dynamo_client = client::create_client(&aws_config).await?;

    // Verify table exists
    let table_state = client::get_table_state(&dynamo_client, &cmd.table_name).await?;
    if table_state.is_none() {
        return Err(DynamodbError::TableNotFound {
            table_name: cmd.table_name,
        });
    }

    let data = seed::demo_seed_data();

    if !global.is_silent() {
        aprintln!("{}", p_c("Data to write:"));
        for plan in &data.plans {
            aprintln!("  Plan: {} ({})", plan.name, plan.id);
        }
        aprintln!(
            "  Problem: {}/{} with {} test cases",
            data.problem.platform,
            data.problem.problem_id,
            data.test_cases.len()
        );
        aprintln!();
    }

    if !cmd.force {
        let confirmed = Confirm::new()
            .with_prompt("Write demo data?")
            .default(true)
            .interact()
            .map_err(|e| DynamodbError::AwsSdk(e.to_string()))?;

        if !confirmed {
            return Err(DynamodbError::UserCancelled);
        }
    }

    let repository = seed::open_repository(&cmd.table_name).await;
    let written = seed::apply_seed(&repository, &data).await?;

    if !global.is_silent() {
        aprintln!("{} {} items written.", p_g("Success:"), written);
    }

    Ok(())
}
