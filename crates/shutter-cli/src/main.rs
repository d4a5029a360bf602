use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shutter_core::domain::{OwnerId, RecordId, RecordView};
use shutter_core::impls::{FsObjectStore, FsPayloadSource, JsonFileRecordStore, JsonFileTaskStore};
use shutter_core::{NewUpload, ShutterConfig, UploadService, UploadServiceBuilder};

#[derive(Parser)]
#[command(name = "shutter", about = "Offline-first photo upload queue")]
struct Cli {
    /// JSON config file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the config's data directory (objects go to <dir>/objects).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue photos for upload.
    Enqueue {
        /// Project the photos belong to.
        #[arg(long)]
        owner: String,

        /// Record id to use (only with a single photo).
        #[arg(long)]
        id: Option<String>,

        /// Local photo paths.
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
    /// Print the queue and the known records.
    Status,
    /// Run passes until the queue is empty or stops making progress.
    Drain,
    /// Keep processing in the background until Ctrl-C.
    Run,
}

fn load_config(cli: &Cli) -> Result<ShutterConfig> {
    let mut config = match &cli.config {
        Some(path) => ShutterConfig::from_json_file(path)?,
        None => ShutterConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config = ShutterConfig {
            policy: config.policy,
            ..ShutterConfig::in_dir(dir)
        };
    }
    config.validate()?;
    Ok(config)
}

fn build_service(config: &ShutterConfig, records: Arc<JsonFileRecordStore>) -> Result<UploadService> {
    let service = UploadServiceBuilder::new()
        .task_store(Arc::new(JsonFileTaskStore::new(config.queue_file())))
        .record_store(records)
        .payload_source(Arc::new(FsPayloadSource))
        .object_store(Arc::new(FsObjectStore::new(&config.object_root)))
        .policy(config.policy.clone())
        .build()?;
    Ok(service)
}

async fn enqueue(service: &UploadService, owner: String, id: Option<String>, sources: Vec<PathBuf>) -> Result<()> {
    if id.is_some() && sources.len() > 1 {
        anyhow::bail!("--id can only be used with a single photo");
    }
    let owner = OwnerId::new(owner);
    for source in sources {
        let source = std::fs::canonicalize(&source)
            .with_context(|| format!("photo not found: {}", source.display()))?;
        let mut request = NewUpload::new(owner.clone(), source.display().to_string());
        if let Some(id) = &id {
            request = request.with_record_id(RecordId::new(id.as_str()));
        }
        let task = service.enqueue(request).await?;
        println!("{}", serde_json::to_string(&task)?);
    }
    // Let an upload that already started finish before exiting.
    service.scheduler().processor().wait_idle().await;
    Ok(())
}

async fn status(service: &UploadService, records: &JsonFileRecordStore) -> Result<()> {
    let snapshot = service.snapshot().await;
    let records: Vec<_> = records
        .list()
        .await?
        .into_iter()
        .map(|record| {
            let badge = RecordView {
                record: record.clone(),
                from_cache: false,
                has_pending_writes: false,
            }
            .badge();
            json!({ "record": record, "badge": badge })
        })
        .collect();
    let out = json!({ "queue": snapshot, "records": records });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn drain(service: &UploadService) -> Result<()> {
    loop {
        let Some(report) = service.process_now().await else {
            continue;
        };
        println!("{}", serde_json::to_string(&report)?);
        let progressed = !report.uploaded.is_empty() || !report.failed.is_empty();
        if report.is_drained() || !progressed {
            break;
        }
    }
    service.shutdown().await;
    Ok(())
}

async fn run(service: &UploadService) -> Result<()> {
    service.start(None).await;
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("shutting down");
    service.shutdown().await;
    service.scheduler().processor().wait_idle().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let records = Arc::new(JsonFileRecordStore::new(config.records_file()));
    let service = build_service(&config, records.clone())?;

    match cli.command {
        Command::Enqueue { owner, id, sources } => enqueue(&service, owner, id, sources).await,
        Command::Status => status(&service, &records).await,
        Command::Drain => drain(&service).await,
        Command::Run => run(&service).await,
    }
}
