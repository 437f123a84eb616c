use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use awsfetcher::{default_overrides, enumerators, mapper, AwsService, FamilySelection, FixtureService};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gstorage::config::{StorageConfig, SyncConfig};
use gstorage::graph::GraphStore;
use gstorage::sync::{DataSynchronizer, SyncContext};
use gstorage::GStorage;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "awssync",
    about = "Synchronize AWS Glacier, Kinesis and Glue resources into a gstorage graph."
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
    /// Enumerate every selected family and reconcile the graph against it.
    Sync(SyncArgs),
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Account that owns the synced resources.
    #[arg(long, env = "AWS_ACCOUNT_ID")]
    account: Option<String>,

    /// Region to scan. Repeat for several regions.
    #[arg(long = "region")]
    regions: Vec<String>,

    /// Marker stamped on everything written by this run. Defaults to the current Unix time.
    #[arg(long)]
    update_tag: Option<i64>,

    /// JSON sync configuration. Flags given on the command line take precedence.
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Restrict the run to these families (glacier, kinesis, glue).
    #[arg(long = "family")]
    families: Vec<String>,

    /// Replay provider responses from a fixture file instead of calling AWS.
    #[arg(long, conflicts_with = "live", value_hint = clap::ValueHint::FilePath)]
    fixtures: Option<PathBuf>,

    /// Call AWS with credentials from the environment (requires the `aws` feature).
    #[arg(long)]
    live: bool,
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

    match cli.command {
        Commands::Sync(args) => handle_sync(cli.base_path, args).await,
    }
}

fn build_config(args: &SyncArgs) -> Result<SyncConfig> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("failed to load sync config {}", path.display()))?,
        None => {
            let Some(account) = &args.account else {
                bail!("--account (or AWS_ACCOUNT_ID) is required without --config");
            };
            SyncConfig::new(account.clone(), Vec::new())
        }
    };
    if let Some(account) = &args.account {
        config.account_id = account.clone();
    }
    if !args.regions.is_empty() {
        config.regions = args.regions.clone();
    }
    if args.update_tag.is_some() {
        config.update_tag = args.update_tag;
    }
    config.merge_defaults(default_overrides());
    config.validate().context("invalid sync configuration")?;
    if config.regions.is_empty() {
        bail!("no regions to scan; pass --region or list them in the config file");
    }
    Ok(config)
}

async fn build_service(args: &SyncArgs) -> Result<Arc<dyn AwsService>> {
    if let Some(path) = &args.fixtures {
        let service = FixtureService::from_file(path)
            .with_context(|| format!("failed to load fixtures {}", path.display()))?;
        return Ok(Arc::new(service));
    }
    if args.live {
        return live_service().await;
    }
    bail!("choose a data source: --fixtures <file> or --live")
}

#[cfg(feature = "aws")]
async fn live_service() -> Result<Arc<dyn AwsService>> {
    Ok(Arc::new(awsfetcher::sdk::SdkAwsService::from_env().await))
}

#[cfg(not(feature = "aws"))]
async fn live_service() -> Result<Arc<dyn AwsService>> {
    bail!("--live needs awssync built with the `aws` feature")
}

async fn handle_sync(base_path: PathBuf, args: SyncArgs) -> Result<()> {
    let config = build_config(&args)?;
    let selection = FamilySelection::parse(&args.families)?;
    let service = build_service(&args).await?;

    let storage = GStorage::with_region_concurrency(
        StorageConfig::new(&base_path),
        config.region_concurrency,
    )
    .await
    .with_context(|| format!("failed to open gstorage at {}", base_path.display()))?;

    let ctx = SyncContext::from_config(&config, mapper::ACCOUNT.label);
    if storage
        .store
        .entity(&ctx.account.label, &ctx.account.id)?
        .is_none()
    {
        log::warn!(
            "Account {} is not registered; ownership links will be reported missing. \
             Run `gstorage-cli seed-account {}` first.",
            ctx.account.id,
            ctx.account.id
        );
    }

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; abandoning in-flight scans");
            cancel.cancel();
        }
    });

    let enumerators = enumerators(service, config.lookup_concurrency, &selection);
    log::info!(
        "Syncing {} family(ies) across {} region(s) for account {} with marker {}",
        enumerators.len(),
        config.regions.len(),
        ctx.account.id,
        ctx.marker
    );
    let report = storage
        .synchronizer
        .sync_all(&enumerators, &ctx)
        .await
        .context("sync run failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
