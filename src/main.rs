use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::OsRng;
use std::path::PathBuf;
use tracing::info;

use check_manager::api::ApiClient;
use check_manager::checkmgr::broker::broker_cn;
use check_manager::checkmgr::search::{check_bundle_search, search_criteria};
use check_manager::checkmgr::secret::make_secret;
use check_manager::config::Config;
use check_manager::{logging, CheckManager};

#[derive(Parser)]
#[command(name = "checkmgr")]
#[command(about = "Locate or create the Circonus check this host submits metrics to")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = check_manager::constants::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the trap URL, creating a check bundle if none matches
    Resolve,
    /// Search check bundles (defaults to this instance's criteria)
    Search {
        #[arg(long)]
        criteria: Option<String>,
    },
    /// Generate a check secret
    Secret,
    /// Show the certificate CN to use for a trap URL on a broker
    BrokerCn {
        #[arg(long)]
        broker_id: u64,
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Secret = cli.command {
        println!("{}", make_secret(&mut OsRng)?);
        return Ok(());
    }

    let config = Config::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let _guard = logging::init_logging(&config.logging);

    match cli.command {
        Commands::Resolve => {
            let manager = CheckManager::from_config(&config)?;
            let trap = manager.initialize_trap_url().await?;
            info!(strategy = trap.strategy.as_str(), "resolution complete");

            println!("trap url:     {}", trap.url);
            println!("trap cn:      {}", trap.cn);
            if let Some(bundle) = &trap.check_bundle {
                println!("check bundle: {}", bundle.cid);
                println!("metrics:      {}", bundle.metrics.len());
            }
        }
        Commands::Search { criteria } => {
            let manager = CheckManager::from_config(&config)?;
            let settings = manager.settings();
            let criteria = criteria.unwrap_or_else(|| {
                search_criteria(&settings.instance_id, &settings.check_type, &settings.search_tag)
            });
            let client = ApiClient::new(&config.api)?;
            match check_bundle_search(&client, &criteria).await? {
                Some(bundle) => println!("{} {} {}", bundle.cid, bundle.display_name, bundle.config.submission_url),
                None => println!("no active check bundle matches {}", criteria),
            }
        }
        Commands::BrokerCn { broker_id, url } => {
            let client = ApiClient::new(&config.api)?;
            let broker = client.fetch_broker_by_id(broker_id).await?;
            println!("{}", broker_cn(&broker, &url)?);
        }
        Commands::Secret => unreachable!("handled before configuration is loaded"),
    }

    Ok(())
}
