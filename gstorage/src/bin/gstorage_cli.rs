use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use gstorage::GStorage;
use gstorage::config::StorageConfig;
use gstorage::graph::GraphStore;
use gstorage::models::{Attributes, EntityType, SyncMarker};
use log::LevelFilter;

const ACCOUNT: EntityType = EntityType::new("aws", "AWSAccount");

#[derive(Parser, Debug)]
#[command(
    name = "gstorage-cli",
    about = "Inspect the resource graph and sync catalog of a gstorage deployment."
)]
struct Cli {
    /// Base path of the gstorage instance (directory containing graph.sqlite/catalog.sqlite).
    #[arg(
        short,
        long,
        env = "GSTORAGE_BASE_PATH",
        default_value = ".",
        value_hint = clap::ValueHint::DirPath
    )]
    base_path: PathBuf,

    /// Minimum log level to display.
    #[arg(long, default_value_t = LogLevelArg::Info, value_enum)]
    log_level: LogLevelArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Display entity counts per label and relationship counts per type.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// List entities carrying the provided label.
    Nodes {
        /// Entity label, e.g. S3GlacierVault or GlueTable.
        label: String,

        /// Maximum number of entities to display (0 = no limit).
        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long)]
        json: bool,
    },
    /// List relationships, optionally restricted to one type.
    Relationships {
        #[arg(long)]
        relation: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Register the account node that owns synced resources.
    SeedAccount {
        /// Account identifier, e.g. 000000000000.
        id: String,
    },
    /// Show the last fully reconciled marker for an account and family.
    LastScan {
        #[arg(long, env = "AWS_ACCOUNT_ID")]
        account: String,

        #[arg(long)]
        family: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default());
    logger.filter_level(LevelFilter::from(cli.log_level));
    let _ = logger.try_init();

    let base_path = if cli.base_path.is_absolute() {
        cli.base_path.clone()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(&cli.base_path)
    };

    let creates_state = matches!(cli.command, Commands::SeedAccount { .. });
    if !creates_state && !base_path.exists() {
        bail!("Base path '{}' does not exist", base_path.display());
    }

    let storage = GStorage::new(StorageConfig::new(base_path))
        .await
        .context("failed to open gstorage instance")?;

    match cli.command {
        Commands::Stats { json } => handle_stats(&storage, json),
        Commands::Nodes { label, limit, json } => handle_nodes(&storage, &label, limit, json),
        Commands::Relationships { relation, json } => {
            handle_relationships(&storage, relation.as_deref(), json)
        }
        Commands::SeedAccount { id } => handle_seed_account(&storage, &id),
        Commands::LastScan { account, family } => handle_last_scan(&storage, &account, &family),
    }
}

fn handle_stats(storage: &GStorage, json: bool) -> Result<()> {
    let stats = storage.store.stats().context("failed to collect graph stats")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{:<32} {}", "LABEL", "ENTITIES");
    println!("{}", "-".repeat(48));
    for (label, count) in &stats.entities {
        println!("{:<32} {}", label, count);
    }
    println!();
    println!("{:<32} {}", "RELATION", "EDGES");
    println!("{}", "-".repeat(48));
    for (relation, count) in &stats.relationships {
        println!("{:<32} {}", relation, count);
    }
    Ok(())
}

fn handle_nodes(storage: &GStorage, label: &str, limit: usize, json: bool) -> Result<()> {
    let mut nodes = storage
        .store
        .entities_by_label(label)
        .with_context(|| format!("failed to list entities with label '{label}'"))?;
    if nodes.is_empty() {
        println!("No nodes with label '{label}' were found.");
        return Ok(());
    }
    if limit > 0 {
        nodes.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }
    for node in nodes {
        println!("{} (lastupdated {}, firstseen {})", node.id, node.lastupdated, node.firstseen);
        for (key, value) in &node.properties {
            println!("    {key} = {value}");
        }
    }
    Ok(())
}

fn handle_relationships(storage: &GStorage, relation: Option<&str>, json: bool) -> Result<()> {
    let relationships = storage
        .store
        .relationships(relation)
        .context("failed to list relationships")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&relationships)?);
        return Ok(());
    }
    if relationships.is_empty() {
        println!("No relationships were found.");
        return Ok(());
    }
    for rel in relationships {
        println!(
            "{} -[{}]-> {} (lastupdated {})",
            rel.source, rel.relation, rel.target, rel.lastupdated
        );
    }
    Ok(())
}

fn handle_seed_account(storage: &GStorage, id: &str) -> Result<()> {
    let mut attributes = Attributes::new();
    attributes.insert("id".to_string(), serde_json::Value::String(id.to_string()));

    let entity = storage
        .store
        .merge_entity(&ACCOUNT, id, attributes, SyncMarker::now())
        .with_context(|| format!("failed to register account '{id}'"))?;
    if entity.created {
        println!("Registered {}", entity.node);
    } else {
        println!("{} already registered", entity.node);
    }
    Ok(())
}

fn handle_last_scan(storage: &GStorage, account: &str, family: &str) -> Result<()> {
    match storage.catalog.last_complete_scan(account, family)? {
        Some(scan) => println!(
            "{} / {}: marker {} reconciled at {}",
            scan.account_id, scan.family, scan.marker, scan.completed_at
        ),
        None => println!("No complete scan of '{family}' recorded for account '{account}'."),
    }
    Ok(())
}
