use chrono::Utc;
use clap::Parser;
use docask_core::{
    DocumentPipeline, FileStatus, GenerationClient, PipelineOptions, UploadedFile,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "docask", version)]
struct Cli {
    /// Files or folders to read; folders are expanded recursively.
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Instruction sent to the model alongside the extracted text.
    #[arg(long)]
    prompt: String,

    /// Model identifier forwarded unchanged to the relay.
    #[arg(long, default_value = "gemini-1.5-flash")]
    model: String,

    /// Relay generate endpoint.
    #[arg(
        long,
        env = "DOCASK_ENDPOINT",
        default_value = "https://mlvoca.com/api/generate"
    )]
    endpoint: String,

    /// Combined-context budget in characters.
    #[arg(long, default_value = "50000")]
    max_context_chars: usize,

    /// Timeout in seconds for the generation call.
    #[arg(long, default_value = "120")]
    timeout_secs: u64,
}

fn collect_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(path).into_iter().filter_map(|item| item.ok()) {
                if entry.file_type().is_file() {
                    found.push(entry.path().to_path_buf());
                }
            }
            found.sort_unstable();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn load_files(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadedFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(path)
            .map_err(|error| anyhow::anyhow!("unable to read {}: {error}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        // No declared MIME type on disk; format detection falls back to the
        // file extension.
        files.push(UploadedFile::new(name, "", bytes));
    }
    Ok(files)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docask boot"
    );

    let files = load_files(&collect_paths(&cli.paths))?;
    info!(file_count = files.len(), model = %cli.model, "running pipeline");

    let client =
        GenerationClient::with_timeout(&cli.endpoint, Duration::from_secs(cli.timeout_secs))
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;
    let options = PipelineOptions {
        model_id: cli.model,
        max_context_chars: cli.max_context_chars,
    };
    let pipeline = DocumentPipeline::new(client, options);

    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let narrator = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            eprintln!("{event}");
        }
    });

    let result = pipeline.run(&cli.prompt, &files, Some(&sender)).await;
    drop(sender);
    let _ = narrator.await;

    let run = result.map_err(|error| anyhow::anyhow!(error.to_string()))?;

    for outcome in &run.files {
        match &outcome.status {
            FileStatus::Extracted => info!(file = %outcome.name, "extracted"),
            FileStatus::Unsupported => warn!(file = %outcome.name, "unsupported format, skipped"),
            FileStatus::Failed(reason) => {
                warn!(file = %outcome.name, reason = %reason, "failed to read")
            }
        }
    }

    println!("{}", run.answer);
    Ok(())
}
