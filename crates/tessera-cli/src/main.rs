//! Tessera CLI: upload files into a training session's archive and inspect it.
//!
//! Reads configuration from the environment (see `TesseraConfig::from_env`).
//! The uploader id comes from TESSERA_UPLOADER_ID.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tessera_cli::{
    content_type_for_path, describe_error, init_tracing, progress_line, require_session,
};
use tessera_core::constants::RECENT_UPLOAD_WINDOW_DAYS;
use tessera_core::models::{
    AdmissionRejection, DescriptorFilter, RawFile, StoredObjectDescriptor,
};
use tessera_core::{StaticIdentity, TesseraConfig};
use tessera_db::{setup_database, DescriptorStore, PgDescriptorRepository};
use tessera_processing::{BucketRouter, FileIntake};
use tessera_services::upload::{event_capacity_for, format_file_size};
use tessera_services::{
    ProgressBoard, ProgressProjector, TaskView, UploadBatch, UploadOrchestrator,
};
use tessera_storage::{create_storage, Storage};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tessera", about = "Training session archive uploader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload photos and documents into a session
    Upload {
        /// Owning training session id
        #[arg(long)]
        session: String,
        /// Caption applied to every file
        #[arg(long)]
        caption: Option<String>,
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List uploads, newest first
    List {
        /// Only this training session
        #[arg(long)]
        session: Option<String>,
        /// Case-insensitive match on caption or file name
        #[arg(long)]
        search: Option<String>,
    },
    /// Archive statistics
    Stats,
    /// Print the public URL of a stored object
    Url {
        /// Storage key
        key: String,
        /// MIME type of the object (selects the bucket)
        #[arg(long)]
        mime: String,
    },
    /// Download a stored object to a local file
    Download {
        /// Storage key
        key: String,
        /// MIME type of the object (selects the bucket)
        #[arg(long)]
        mime: String,
        /// Destination path
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct OrphanedObject {
    bucket: String,
    storage_key: String,
}

#[derive(Serialize)]
struct UploadSummary {
    batch_id: Uuid,
    session_id: String,
    succeeded: Vec<TaskView>,
    failed: Vec<TaskView>,
    rejected: Vec<AdmissionRejection>,
    orphaned: Vec<OrphanedObject>,
}

#[derive(Serialize)]
struct ListedObject {
    #[serde(flatten)]
    descriptor: StoredObjectDescriptor,
    bucket: String,
    size: String,
    url: String,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

async fn descriptor_store(config: &TesseraConfig) -> anyhow::Result<Arc<dyn DescriptorStore>> {
    let pool = setup_database(config).await?;
    Ok(Arc::new(PgDescriptorRepository::new(pool)))
}

async fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<RawFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        files.push(RawFile::new(name, content_type_for_path(path), data));
    }
    Ok(files)
}

async fn upload(
    config: &TesseraConfig,
    session: String,
    caption: Option<String>,
    paths: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let session = require_session(&session)?;
    let files = read_files(&paths).await?;
    let admission = FileIntake::from_config(config).admit(files);
    for rejection in &admission.rejected {
        eprintln!(
            "Skipped {}: {} ({})",
            rejection.file_name, rejection.reason, rejection.detail
        );
    }

    let router = BucketRouter::from_config(config);
    let mut batch = UploadBatch::new(session, caption);
    for candidate in admission.candidates {
        batch.add(candidate, &router);
    }

    let storage = create_storage(config).await?;
    let store = descriptor_store(config).await?;
    let uploader = std::env::var("TESSERA_UPLOADER_ID").unwrap_or_default();
    let orchestrator = UploadOrchestrator::new(
        storage,
        store,
        Arc::new(StaticIdentity::new(uploader)),
        event_capacity_for(config.event_channel_capacity, batch.len()),
    );

    let events = orchestrator.subscribe();
    let handle = orchestrator.spawn_batch(batch);
    drop(orchestrator);

    ProgressBoard::new()
        .run(events, |views| {
            for view in views {
                eprintln!("{}", progress_line(view));
            }
            eprintln!();
        })
        .await;

    let result = handle.await.context("Upload batch panicked")??;

    let summary = UploadSummary {
        batch_id: result.batch_id,
        session_id: result.session_id.clone(),
        succeeded: ProgressProjector::project(&result.succeeded),
        failed: ProgressProjector::project(&result.failed),
        rejected: admission.rejected,
        orphaned: result
            .orphaned()
            .into_iter()
            .map(|(bucket, storage_key)| OrphanedObject {
                bucket,
                storage_key,
            })
            .collect(),
    };
    print_json(&summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Upload { session, .. } = &cli.command {
        require_session(session)?;
    }
    let config = TesseraConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Upload {
            session,
            caption,
            files,
        } => {
            upload(&config, session, caption, files).await?;
        }
        Commands::List { session, search } => {
            let storage = create_storage(&config).await?;
            let store = descriptor_store(&config).await?;
            let router = BucketRouter::from_config(&config);
            let filter = DescriptorFilter::new(session, search);

            let listed: Vec<ListedObject> = store
                .list(&filter)
                .await?
                .into_iter()
                .map(|descriptor| {
                    let bucket = router.bucket_for_mime(&descriptor.mime_type).name;
                    ListedObject {
                        url: storage.public_url(&bucket, &descriptor.storage_key),
                        size: format_file_size(descriptor.file_size.max(0) as u64),
                        bucket,
                        descriptor,
                    }
                })
                .collect();
            print_json(&listed)?;
        }
        Commands::Stats => {
            let store = descriptor_store(&config).await?;
            let since = Utc::now() - Duration::days(RECENT_UPLOAD_WINDOW_DAYS);
            let stats = store.stats(since).await?;
            print_json(&stats)?;
        }
        Commands::Url { key, mime } => {
            let storage = create_storage(&config).await?;
            let bucket = BucketRouter::from_config(&config).bucket_for_mime(&mime);
            let url = storage.public_url(&bucket.name, &key);
            print_json(&serde_json::json!({
                "bucket": bucket.name,
                "storage_key": key,
                "url": url,
            }))?;
        }
        Commands::Download { key, mime, out } => {
            let storage: Arc<dyn Storage> = create_storage(&config).await?;
            let bucket = BucketRouter::from_config(&config).bucket_for_mime(&mime);
            let data = storage.download(&bucket.name, &key).await?;
            tokio::fs::write(&out, &data)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            print_json(&serde_json::json!({
                "bucket": bucket.name,
                "storage_key": key,
                "path": out.display().to_string(),
                "size_bytes": data.len(),
            }))?;
        }
    }

    Ok(())
}
