//! burrow - A sandboxed file store with an HTTP API.
//!
//! Usage:
//!   burrow serve [--root DIR]            Serve a store over HTTP
//!   burrow ls [PATH] [--query TEXT]      List or search a store folder
//!   burrow tree                          Print the folder tree of a store
//!   burrow upload --server URL FILES...  Upload files to a running server
//!   burrow --help                        Show help

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use burrow_core::{Entry, PathResolver, StoreConfig, TreeNode, store_path};
use burrow_scan::{EntryReader, TreeBuilder};
use burrow_server::ApiServer;
use burrow_transfer::{HttpUploader, UploadCoordinator, UploadRecord, UploadStatus};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PRINTER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(
    name = "burrow",
    version,
    about = "A sandboxed file store with an HTTP API",
    long_about = "burrow keeps every file operation inside a single root directory.\n\n\
                  Run `burrow serve` to expose a store over HTTP, or use the other \
                  subcommands to inspect a store and upload files to a server."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StoreArgs {
    /// Sandbox root directory
    #[arg(short, long, env = "BURROW_ROOT")]
    root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "BURROW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve a store over HTTP
    Serve {
        #[command(flatten)]
        store: StoreArgs,

        /// Address to bind to
        #[arg(short, long)]
        bind: Option<IpAddr>,

        /// Port to listen on (0 picks a free port)
        #[arg(short, long, env = "BURROW_PORT")]
        port: Option<u16>,

        /// Disable archive extraction
        #[arg(long)]
        no_archives: bool,
    },

    /// List a store folder, or search beneath it
    Ls {
        #[command(flatten)]
        store: StoreArgs,

        /// Store path to list
        #[arg(default_value = "/")]
        path: String,

        /// Search recursively for names containing this text
        #[arg(short, long)]
        query: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the folder tree of a store
    Tree {
        #[command(flatten)]
        store: StoreArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Upload local files to a running server
    Upload {
        /// Base URL of the server
        #[arg(short, long, default_value = "http://127.0.0.1:3000")]
        server: String,

        /// Destination folder in the store
        #[arg(short, long, default_value = "/")]
        dest: String,

        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            store,
            bind,
            port,
            no_archives,
        } => {
            let mut config = load_config(&store)?;
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if no_archives {
                config.archives_enabled = false;
            }
            run_serve(config).await?;
        }
        Command::Ls {
            store,
            path,
            query,
            format,
        } => {
            let config = load_config(&store)?;
            run_ls(&config, &path, query.as_deref(), format)?;
        }
        Command::Tree { store, format } => {
            let config = load_config(&store)?;
            run_tree(&config, format)?;
        }
        Command::Upload {
            server,
            dest,
            files,
        } => {
            run_upload(&server, &dest, &files).await?;
        }
    }

    Ok(())
}

/// Build the store config from an optional TOML file and the `--root` flag.
fn load_config(args: &StoreArgs) -> Result<StoreConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str::<StoreConfig>(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => StoreConfig::default(),
    };
    if let Some(root) = &args.root {
        config.root = root.clone();
    }
    if config.root.as_os_str().is_empty() {
        bail!("Root path cannot be empty");
    }
    Ok(config)
}

/// Serve until Ctrl-C.
async fn run_serve(config: StoreConfig) -> Result<()> {
    let server = ApiServer::start(&config)
        .await
        .context("Failed to start server")?;
    eprintln!("Serving {} at {}", config.root.display(), server.url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    server.stop().await;
    Ok(())
}

fn run_ls(config: &StoreConfig, path: &str, query: Option<&str>, format: OutputFormat) -> Result<()> {
    let reader = EntryReader::new(PathResolver::new(&config.root)?);
    let entries = match query {
        Some(query) => reader.search(path, query)?,
        None => reader.list(path)?,
    };

    match format {
        OutputFormat::Text => print_entries(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

fn run_tree(config: &StoreConfig, format: OutputFormat) -> Result<()> {
    let builder = TreeBuilder::new(PathResolver::new(&config.root)?);
    let tree = builder.build_tree(store_path::ROOT, &config.root_label)?;

    match format {
        OutputFormat::Text => print_tree(&tree),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tree)?),
    }
    Ok(())
}

/// Upload `files`, printing progress as records change.
async fn run_upload(server: &str, dest: &str, files: &[PathBuf]) -> Result<()> {
    let coordinator = Arc::new(UploadCoordinator::default());
    let uploader = HttpUploader::new(server, coordinator.clone())
        .with_context(|| format!("Invalid server URL {server}"))?;

    let printer = spawn_printer(coordinator.subscribe());

    let total: u64 = files
        .iter()
        .filter_map(|f| std::fs::metadata(f).ok())
        .map(|m| m.len())
        .sum();
    eprintln!("Uploading {} file(s), {} to {dest}", files.len(), format_size(total));

    let report = uploader.upload_batch(files, dest).await;
    // The printer drains queued updates and exits once the coordinator is
    // gone. A request body still owned by the HTTP client can keep it alive
    // briefly, so the wait is bounded.
    drop(uploader);
    drop(coordinator);
    let _ = tokio::time::timeout(PRINTER_DRAIN_TIMEOUT, printer).await;

    println!(
        "{} uploaded, {} failed, {} cancelled",
        report.succeeded, report.failed, report.cancelled
    );
    if !report.is_success() {
        bail!("{} upload(s) did not complete", report.failed + report.cancelled);
    }
    Ok(())
}

/// Print every update until the coordinator goes away. Resolves to the
/// number of lines printed.
fn spawn_printer(mut updates: broadcast::Receiver<UploadRecord>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut printed = 0;
        loop {
            match updates.recv().await {
                Ok(record) => {
                    eprintln!("{}", progress_line(&record));
                    printed += 1;
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        printed
    })
}

fn progress_line(record: &UploadRecord) -> String {
    let name = truncate(&record.name, 40);
    match record.status {
        UploadStatus::Uploading => format!("  {name:<40} {:>3}%", record.progress),
        UploadStatus::Done => format!("  {name:<40} done"),
        UploadStatus::Error => format!(
            "  {name:<40} failed: {}",
            record.error.as_deref().unwrap_or_default()
        ),
    }
}

fn print_entries(entries: &[Entry]) {
    if entries.is_empty() {
        println!(" (empty)");
        return;
    }
    for entry in entries {
        let size = if entry.kind.is_folder() {
            "-".to_string()
        } else {
            format_size(entry.size)
        };
        println!(
            " {:<50} {:>10}  {}",
            truncate(&display_path(entry), 50),
            size,
            entry.last_modified.format("%Y-%m-%d %H:%M")
        );
    }
}

fn display_path(entry: &Entry) -> String {
    if entry.kind.is_folder() {
        format!("{}/", entry.path)
    } else {
        entry.path.clone()
    }
}

fn print_tree(root: &TreeNode) {
    for line in tree_lines(root) {
        println!("{line}");
    }
}

/// One indented line per folder, parents before children.
fn tree_lines(root: &TreeNode) -> Vec<String> {
    let mut lines = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let indent = "  ".repeat(depth);
        let marker = if node.children.is_empty() { "  " } else { "▼ " };
        lines.push(format!("{indent}{marker}{}", node.name));
        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
    lines
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}
