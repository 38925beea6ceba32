mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use config::AppConfig;
use logging::init_logging;
use registry::{AbiSearch, PackageSearch, QueryEngine, RedisStore};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(
    name = "registry",
    version,
    about = "Query a package registry index stored in Redis"
)]
struct Cli {
    /// Optional TOML file with index names, key prefix and cache settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides `redis.url` from the config file.
    #[arg(long, env = "REDIS_URL", global = true)]
    redis_url: Option<String>,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fuzzy search over package names.
    Search {
        query: Option<String>,
        #[arg(long = "chain-id")]
        chain_ids: Vec<u64>,
        #[arg(long)]
        limit: Option<usize>,
        /// Also return per-namespace counts.
        #[arg(long, default_value_t = false)]
        namespaces: bool,
    },
    /// Resolve `name[:version][@preset]` on every known chain.
    Ref { package_ref: String },
    /// Every version of an exact package name.
    Name { name: String },
    /// Chain ids present in the index.
    Chains {
        #[arg(long, default_value_t = false)]
        with_count: bool,
    },
    /// Functions, events and errors by name, selector or address.
    Functions {
        query: Option<String>,
        #[arg(long = "chain-id")]
        chain_ids: Vec<u64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Contracts by name or address.
    Contracts {
        query: Option<String>,
        #[arg(long = "chain-id")]
        chain_ids: Vec<u64>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut cfg = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(url) = cli.redis_url.clone() {
        cfg.redis_url = url;
    }
    cfg.validate_config()?;

    debug!(
        stage = "startup",
        event = "store.connect.begin",
        package_index = %cfg.engine.package_index,
        abi_index = %cfg.engine.abi_index,
        "connecting to redis"
    );
    let store = RedisStore::connect(&cfg.redis_url)
        .await
        .context("failed to connect to redis")?;
    let engine = QueryEngine::new(store, cfg.engine);

    let started = std::time::Instant::now();
    match cli.command {
        Command::Search {
            query,
            chain_ids,
            limit,
            namespaces,
        } => {
            let request = PackageSearch {
                query,
                chain_ids,
                limit,
                include_namespaces: namespaces,
            };
            print_json(&engine.search_packages(&request).await?)?;
        }
        Command::Ref { package_ref } => {
            print_json(&engine.find_packages_by_ref(&package_ref).await?)?;
        }
        Command::Name { name } => {
            print_json(&engine.find_packages_by_name(&name).await?)?;
        }
        Command::Chains { with_count } => {
            if with_count {
                print_json(&engine.get_chain_ids_with_count().await?)?;
            } else {
                print_json(&engine.get_chain_ids().await?)?;
            }
        }
        Command::Functions {
            query,
            chain_ids,
            limit,
        } => {
            let request = AbiSearch {
                query,
                chain_ids,
                limit,
            };
            print_json(&engine.search_functions(&request).await?)?;
        }
        Command::Contracts {
            query,
            chain_ids,
            limit,
        } => {
            let request = AbiSearch {
                query,
                chain_ids,
                limit,
            };
            print_json(&engine.search_contracts(&request).await?)?;
        }
    }

    info!(
        event = "query.end",
        result = "ok",
        duration_ms = started.elapsed().as_millis(),
        "query completed"
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{out}");
    Ok(())
}
