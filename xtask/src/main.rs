//! See <https://github.com/matklad/cargo-xtask/>
//!
//! This binary defines auxiliary operational commands which are not
//! expressible with just `cargo`: DynamoDB infrastructure management,
//! data seeding, and table migrations.
//!
//! The binary is integrated into the `cargo` command line by using an
//! alias in `.cargo/config`.

use clap::Parser;

mod dynamodb;
mod migrate;
mod prelude;

/// Operational tasks for the algoprep repository
#[derive(Debug, Parser)]
#[command(name = "xtask")]
#[command(about = "Operational tasks for algoprep", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: Global,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Silence the command output
    #[clap(long, global = true)]
    pub silent: bool,

    /// Enable verbose output
    #[clap(long, global = true)]
    pub verbose: bool,
}

impl Global {
    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Manage DynamoDB infrastructure
    Dynamodb(dynamodb::DynamodbCommand),

    /// Run table migrations and backfills
    Migrate(migrate::MigrateCommand),
}

fn init_tracing(global: &Global) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if global.is_silent() {
        "error"
    } else if global.is_verbose() {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    match cli.command {
        Commands::Dynamodb(dynamodb_cmd) => {
            dynamodb::run(dynamodb_cmd, cli.global).await?;
        }
        Commands::Migrate(migrate_cmd) => {
            migrate::run(migrate_cmd, cli.global).await?;
        }
    }

    Ok(())
}
