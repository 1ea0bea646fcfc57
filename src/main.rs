use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use listing_sync::batch::run_batch;
use listing_sync::reextract::{reextract_dir, OutputFormat};
use listing_sync::{
    FetchOptions, Fetcher, ListingId, MissingTitlePolicy, Pipeline, PipelineOutcome,
    PostgrestStore, RecordStore, ReqwestTransport, StoreConfig, Synchronizer, Transport,
};

type CliPipeline = Pipeline<Box<dyn Transport>, PostgrestStore>;

#[derive(Parser)]
#[command(name = "listing-sync", version, about = "Sync rental listing titles into a Supabase rooms table")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch one listing, extract its metadata and sync the title
    Scrape {
        room_id: String,
        #[command(flatten)]
        fetch: FetchArgs,
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Process several listings and record a run summary
    Batch {
        room_ids: Vec<String>,
        /// Also process every id already in the rooms table
        #[arg(long)]
        from_store: bool,
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
        #[command(flatten)]
        fetch: FetchArgs,
    },
    /// Re-extract metadata from previously saved HTML files
    Extract {
        #[arg(long, default_value = "./output")]
        input_dir: PathBuf,
        #[arg(long, default_value = "./extracted")]
        output_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Both)]
        format: OutputFormat,
        /// Upsert extracted titles into the store
        #[arg(long)]
        sync: bool,
    },
    /// List every room id in the store
    Rooms,
    /// Set the label of one room directly
    Upsert { room_id: String, label: String },
}

#[derive(Args)]
struct FetchArgs {
    /// Keep the raw HTML under this directory
    #[arg(long, value_name = "DIR")]
    save_html: Option<PathBuf>,
    /// Extract only; don't touch the store
    #[arg(long)]
    no_sync: bool,
    /// Sync a marked placeholder label when no title is found
    #[arg(long)]
    placeholder_title: bool,
    /// Per-attempt timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// Total number of attempts
    #[arg(long, default_value_t = 3)]
    retries: u32,
    /// Seconds to wait between attempts
    #[arg(long, default_value_t = 2)]
    retry_delay: u64,
    /// Render pages in headless Chrome instead of plain HTTP
    #[cfg(feature = "browser")]
    #[arg(long)]
    browser: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Scrape {
            room_id,
            fetch,
            format,
        } => scrape(&room_id, &fetch, format).await,
        Command::Batch {
            room_ids,
            from_store,
            concurrency,
            fetch,
        } => batch(room_ids, from_store, concurrency, &fetch).await,
        Command::Extract {
            input_dir,
            output_dir,
            format,
            sync,
        } => {
            let sync = if sync {
                Some(Synchronizer::new(store_from_env()?))
            } else {
                None
            };
            let processed = reextract_dir(&input_dir, &output_dir, format, sync.as_ref()).await?;
            println!("{processed}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Rooms => {
            let ids = store_from_env()?
                .list_ids()
                .await
                .context("Failed to list rooms")?;
            for id in ids {
                println!("{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Upsert { room_id, label } => {
            let sync = Synchronizer::new(store_from_env()?);
            let result = sync.upsert(&room_id, &label).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn scrape(room_id: &str, args: &FetchArgs, format: Format) -> Result<ExitCode> {
    // reject bad input before loading config or opening connections
    ListingId::parse(room_id)?;

    info!("🏠 Listing sync - room {}", room_id);
    let pipeline = build_pipeline(args)?;

    match pipeline.run(room_id).await {
        Ok(outcome) => {
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                Format::Text => print_outcome(&outcome),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("❌ {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn batch(
    mut room_ids: Vec<String>,
    from_store: bool,
    concurrency: usize,
    args: &FetchArgs,
) -> Result<ExitCode> {
    let pipeline = Arc::new(build_pipeline(args)?);

    if from_store {
        let stored = match pipeline.synchronizer() {
            Some(sync) => sync.store().list_ids().await,
            None => store_from_env()?.list_ids().await,
        }
        .context("Failed to list rooms")?;
        info!("Loaded {} room ids from store", stored.len());
        room_ids.extend(stored.into_iter().map(|id| id.to_string()));
    }
    if room_ids.is_empty() {
        bail!("no room ids given; pass ids or --from-store");
    }

    let report = run_batch(pipeline, room_ids, concurrency).await;
    if let Some(warning) = &report.log_warning {
        warn!("⚠️ {}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.success_count > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_pipeline(args: &FetchArgs) -> Result<CliPipeline> {
    let options = FetchOptions::default()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_retries(args.retries)
        .with_retry_delay(Duration::from_secs(args.retry_delay));
    options.validate()?;

    let synchronizer = if args.no_sync {
        info!("Sync disabled; extracting only");
        None
    } else {
        Some(Synchronizer::new(store_from_env()?))
    };

    let transport = transport(args, &options)?;
    let mut pipeline = Pipeline::new(Fetcher::new(transport, options), synchronizer);
    if let Some(dir) = &args.save_html {
        pipeline = pipeline.archive_to(dir);
    }
    if args.placeholder_title {
        pipeline = pipeline.missing_title(MissingTitlePolicy::Placeholder);
    }
    Ok(pipeline)
}

#[cfg(feature = "browser")]
fn transport(args: &FetchArgs, options: &FetchOptions) -> Result<Box<dyn Transport>> {
    if args.browser {
        return Ok(Box::new(listing_sync::fetch::BrowserTransport::new(options)?));
    }
    Ok(Box::new(ReqwestTransport::new(options)?))
}

#[cfg(not(feature = "browser"))]
fn transport(_args: &FetchArgs, options: &FetchOptions) -> Result<Box<dyn Transport>> {
    Ok(Box::new(ReqwestTransport::new(options)?))
}

fn store_from_env() -> Result<PostgrestStore> {
    let config = StoreConfig::from_env().context("Store configuration missing")?;
    PostgrestStore::new(&config)
}

fn print_outcome(outcome: &PipelineOutcome) {
    let meta = &outcome.metadata;
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("Room {}", outcome.id);
    println!("   Title: {}", show(&meta.title));
    println!("   Price: {}", show(&meta.price));
    println!("   Rating: {} ({} reviews)", show(&meta.rating), show(&meta.review_count));
    println!("   Location: {}", show(&meta.location));
    println!(
        "   {} bedrooms, {} bathrooms, {} guests",
        show(&meta.bedroom_count),
        show(&meta.bathroom_count),
        show(&meta.guest_capacity)
    );
    match &outcome.sync {
        Some(sync) => println!("   Sync: {}", sync.action),
        None => println!("   Sync: skipped"),
    }
    if let Some(path) = &outcome.archived {
        println!("   HTML: {}", path.display());
    }
    for warning in &outcome.warnings {
        println!("   ⚠️ {}", warning);
    }
}
