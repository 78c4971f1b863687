//! # docsync CLI
//!
//! Command-line interface over the docsync library.
//!
//! - `crawl`: crawl a site, optionally saving per-page snapshots
//! - `index`: crawl (or load snapshots), split and sync the vector index
//! - `search`: top-k retrieval over the index
//! - `records`: inspect the record store
//!
//! Indexing and search embed text with Gemini (`GEMINI_API_KEY`) or, with
//! `--embedder hashing`, with the offline hashing embedder. A database must be
//! searched with the embedder it was indexed with.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use docsync::crawler::storage::{PageEntry, SnapshotLoader, Storage, StorageConfig};
use docsync::crawler::{Crawler, CrawlerConfig, RecursiveUrlLoader};
use docsync::index::{Database, LibSqlVectorStore, ListKeysOptions, RecordManager};
use docsync::indexing::{CleanupMode, DocumentSource, IndexingConfig, index_documents};
use docsync::model::{HashingEmbeddingModel, gemini_embedding_from_env};
use docsync::processor::{ChunkOptions, SplittingLoader};
use docsync::search::Retriever;
use indicatif::{ProgressBar, ProgressStyle};
use rig::embeddings::EmbeddingModel;
use tracing::instrument;

#[derive(Parser)]
#[command(author, version, about = "Crawl a documentation site and keep a vector index in sync with it", long_about = None)]
struct Cli {
    /// Export traces and metrics over OTLP/HTTP
    #[arg(long, global = true)]
    otlp: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a site and report what was found
    Crawl(CrawlArgs),

    /// Crawl a site (or load its snapshots) and sync the index
    Index(IndexArgs),

    /// Search the index
    Search(SearchArgs),

    /// List records in the record store
    Records(RecordsArgs),
}

#[derive(Args, Debug, Clone)]
struct CrawlOptions {
    /// Depth limit; the seed is depth 0
    #[arg(short, long, default_value = "2")]
    depth: u32,

    /// Per-request timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    timeout: u64,

    /// Directory prefixes to skip (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Maximum number of fetches in flight
    #[arg(short, long, default_value = "64")]
    concurrency: usize,

    /// Retries after a failed fetch
    #[arg(short, long, default_value = "0")]
    retries: u32,

    /// Follow links outside the seed's origin
    #[arg(long)]
    allow_outside: bool,
}

impl CrawlOptions {
    fn to_config(&self) -> CrawlerConfig {
        CrawlerConfig::builder()
            .max_depth(self.depth)
            .timeout_ms(self.timeout)
            .exclude_dirs(self.exclude.clone())
            .max_concurrency(self.concurrency)
            .max_retries(self.retries)
            .prevent_outside(!self.allow_outside)
            .build()
    }
}

#[derive(Args, Debug, Clone)]
struct StoreOptions {
    /// Database path
    #[arg(long, default_value = "docsync.db")]
    database: PathBuf,

    /// Namespace of the record and vector stores
    #[arg(short, long, default_value = "local/docs")]
    namespace: String,

    /// Embedding model
    #[arg(long, value_enum, default_value = "gemini")]
    embedder: Embedder,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Embedder {
    Gemini,
    Hashing,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URL
    #[arg(required = true)]
    url: String,

    #[command(flatten)]
    crawl: CrawlOptions,

    /// Save page snapshots under this directory
    #[arg(short, long)]
    save: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Seed URL to crawl
    #[arg(required_unless_present = "snapshot", conflicts_with = "snapshot")]
    url: Option<String>,

    /// Index the saved snapshots of this host instead of crawling
    #[arg(long)]
    snapshot: Option<String>,

    /// Directory holding snapshots
    #[arg(long, default_value = ".docsync/crawl")]
    snapshot_dir: PathBuf,

    #[command(flatten)]
    crawl: CrawlOptions,

    #[command(flatten)]
    store: StoreOptions,

    /// Maximum characters per chunk
    #[arg(long, default_value = "512")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value = "50")]
    chunk_overlap: usize,

    /// Cleanup mode (incremental|full|none)
    #[arg(long, default_value = "incremental")]
    cleanup: CleanupMode,

    /// Metadata key used as the source id
    #[arg(long, default_value = "source")]
    source_id_key: String,

    /// Documents per batch
    #[arg(long, default_value = "100")]
    batch_size: usize,

    /// Re-embed documents that are already indexed
    #[arg(short, long)]
    force: bool,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: String,

    /// Number of results
    #[arg(short, default_value = "4")]
    k: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(flatten)]
    store: StoreOptions,
}

#[derive(Args, Debug)]
struct RecordsArgs {
    /// Only records last seen before this Unix timestamp
    #[arg(long)]
    before: Option<f64>,

    /// Maximum number of records to show
    #[arg(short, long)]
    limit: Option<usize>,

    /// Database path
    #[arg(long, default_value = "docsync.db")]
    database: PathBuf,

    /// Namespace of the record store
    #[arg(short, long, default_value = "local/docs")]
    namespace: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _otel = telemetry::init_tracing_subscriber(cli.otlp)?;

    match cli.command {
        Commands::Crawl(args) => crawl_command(args).await,
        Commands::Index(args) => match args.store.embedder {
            Embedder::Gemini => index_command(args, gemini_embedding_from_env()?).await,
            Embedder::Hashing => index_command(args, HashingEmbeddingModel::default()).await,
        },
        Commands::Search(args) => match args.store.embedder {
            Embedder::Gemini => search_command(args, gemini_embedding_from_env()?).await,
            Embedder::Hashing => search_command(args, HashingEmbeddingModel::default()).await,
        },
        Commands::Records(args) => records_command(args).await,
    }
}

fn spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

async fn open_database(path: &std::path::Path) -> anyhow::Result<Database> {
    let path = path.to_str().context("Database path must be valid UTF-8")?;
    Ok(Database::new_from_path(path).await?)
}

#[instrument(skip(args), fields(url = %args.url))]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let crawler = Crawler::http(args.crawl.to_config())?;

    let progress = spinner(format!("Crawling {}", args.url));
    let pages = crawler.crawl_pages(&args.url).await?;
    progress.finish_with_message(format!("Crawled {} pages", pages.len()));

    for page in &pages {
        println!("{}", page.url);
    }

    if let Some(base_path) = args.save {
        let storage = Storage::with_config(StorageConfig {
            base_path: base_path.clone(),
        });
        let entries: Vec<PageEntry> = pages.into_iter().map(PageEntry::from).collect();
        let stored = storage.store_batch(&entries).await?;
        println!("Saved {} snapshots to {}", stored, base_path.display());
    }

    Ok(())
}

#[instrument(skip(args, model))]
async fn index_command<E>(args: IndexArgs, model: E) -> anyhow::Result<()>
where
    E: EmbeddingModel + 'static,
{
    let chunk_options = ChunkOptions {
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
    };
    let config = IndexingConfig::builder()
        .cleanup(args.cleanup)
        .source_id_key(args.source_id_key.clone())
        .batch_size(args.batch_size)
        .force_update(args.force)
        .build();

    let (label, source) = match (&args.snapshot, &args.url) {
        (Some(host), _) => {
            let storage = Storage::with_config(StorageConfig {
                base_path: args.snapshot_dir.clone(),
            });
            let loader = SplittingLoader::new(SnapshotLoader::new(storage, host.clone()), chunk_options)?;
            (format!("snapshots of {}", host), DocumentSource::loader(loader))
        }
        (None, Some(url)) => {
            let loader = SplittingLoader::new(
                RecursiveUrlLoader::new(url.clone(), args.crawl.to_config()),
                chunk_options,
            )?;
            (url.clone(), DocumentSource::loader(loader))
        }
        (None, None) => anyhow::bail!("Either a URL or --snapshot is required"),
    };

    let db = open_database(&args.store.database).await?;
    let records = RecordManager::new(db.clone(), args.store.namespace.clone());
    let vectors = LibSqlVectorStore::new(db, args.store.namespace.clone(), model).await?;

    let progress = spinner(format!("Indexing {}", label));
    let stats = index_documents(source, &records, &vectors, config).await?;
    progress.finish_with_message(format!(
        "Indexed {}: {} added, {} skipped, {} deleted",
        label, stats.num_added, stats.num_skipped, stats.num_deleted
    ));

    println!("{}", serde_json::to_string(&stats)?);
    Ok(())
}

#[instrument(skip(args, model), fields(k = args.k))]
async fn search_command<E>(args: SearchArgs, model: E) -> anyhow::Result<()>
where
    E: EmbeddingModel + 'static,
{
    let db = open_database(&args.store.database).await?;
    let vectors = LibSqlVectorStore::new(db, args.store.namespace.clone(), model).await?;

    let results = Retriever::new(&vectors, args.k)
        .retrieve_scored(&args.query)
        .await?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Text => {
            println!("Found {} results", results.len());
            for (i, result) in results.iter().enumerate() {
                let source = result.document.source().unwrap_or("<unknown>");
                println!("{}. [{:.3}] {}", i + 1, result.score, source);
                println!("   {}", result.document.content_prefix(160).replace('\n', " "));
                println!();
            }
        }
    }

    Ok(())
}

fn format_timestamp(seconds: f64) -> String {
    let millis = (seconds * 1000.0) as i64;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| seconds.to_string())
}

#[instrument(skip(args))]
async fn records_command(args: RecordsArgs) -> anyhow::Result<()> {
    let db = open_database(&args.database).await?;
    let records = RecordManager::new(db, args.namespace.clone());

    let listed = records
        .list_records(ListKeysOptions {
            before: args.before,
            limit: args.limit,
            ..Default::default()
        })
        .await?;

    println!("{} records in {}", listed.len(), args.namespace);
    for record in listed {
        println!(
            "{}  {}  {}",
            format_timestamp(record.updated_at),
            record.key,
            record.group_id.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
