use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use placekeeper::search::TicketMasterClient;
use placekeeper::{config, db, Gateway};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create any missing tables
    InitDb,
    /// Search the provider around a location and store the results
    Search {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value = "")]
        term: String,
    },
    /// Mark items as favorites for a user
    Favorite {
        user_id: String,
        #[arg(required = true)]
        item_ids: Vec<String>,
    },
    /// Remove items from a user's favorites
    Unfavorite {
        user_id: String,
        #[arg(required = true)]
        item_ids: Vec<String>,
    },
    /// List a user's favorite items
    Favorites { user_id: String },
    /// Print a user's full name
    Fullname { user_id: String },
    /// Check a user id and password
    Login { user_id: String, password: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let provider = Arc::new(TicketMasterClient::from_config(&cfg)?);
    let mut gateway = Gateway::connect(&cfg.database_url(), provider).await;

    let result = run(&gateway, args.command).await;
    gateway.close().await;
    result
}

async fn run(gateway: &Gateway, command: Command) -> Result<()> {
    match command {
        Command::InitDb => {
            let Some(pool) = gateway.pool() else {
                bail!("no database connection");
            };
            db::create_tables(pool).await?;
            info!("database initialised");
        }
        Command::Search { lat, lon, term } => {
            let items = gateway.search_items(lat, lon, &term).await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Command::Favorite { user_id, item_ids } => {
            gateway.set_favorite_items(&user_id, &item_ids).await;
        }
        Command::Unfavorite { user_id, item_ids } => {
            gateway.unset_favorite_items(&user_id, &item_ids).await;
        }
        Command::Favorites { user_id } => {
            let mut items: Vec<_> = gateway
                .get_favorite_items(&user_id)
                .await
                .into_iter()
                .collect();
            items.sort_by(|a, b| a.item_id.cmp(&b.item_id));
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Command::Fullname { user_id } => {
            println!("{}", gateway.get_fullname(&user_id).await);
        }
        Command::Login { user_id, password } => {
            let ok = gateway.verify_login(&user_id, &password).await;
            println!("{}", serde_json::json!({ "userId": user_id, "verified": ok }));
        }
    }
    Ok(())
}
