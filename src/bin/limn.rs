//! Limn CLI — annotate documents and manage the classification cache.
//!
//! Usage:
//!   limn annotate <file> [--db path]
//!   limn cache <stats|clear> [--db path]
//!   limn config <show|set ...> [--db path]

use clap::{Parser, Subcommand};
use limn::annotate::ANNOTATION_ATTR;
use limn::{dom, Document, HighlightEngine, NodeId, OpenStore, ProviderMode, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "limn",
    version,
    about = "Incremental semantic annotation engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate a text file and print the result
    Annotate {
        /// Path to the text file (paragraphs separated by blank lines)
        path: PathBuf,
        /// Path to the cache database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Inspect or empty the classification cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
        /// Path to the cache database
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
    /// Show or change the provider configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
        /// Path to the cache database
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print the number of cached classifications
    Stats,
    /// Remove every cached classification
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored configuration
    Show,
    /// Update the stored configuration
    Set {
        /// Provider mode: local or remote
        #[arg(long)]
        mode: Option<String>,
        /// Remote endpoint URL
        #[arg(long)]
        endpoint: Option<String>,
        /// Remote credential
        #[arg(long)]
        credential: Option<String>,
        /// Enable or disable the cache
        #[arg(long)]
        cache_enabled: Option<bool>,
        /// Cache entry lifetime in milliseconds
        #[arg(long)]
        ttl_ms: Option<u64>,
    },
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("limn")
        .join("cache.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    let path = db.unwrap_or_else(default_db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqliteStore::open(path)?)
}

/// Build a document from plain text: one paragraph element per blank-line
/// separated block.
fn document_from_text(text: &str) -> Document {
    let mut doc = Document::new();
    let root = doc.root();
    for block in text.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let p = doc.create_element("p");
        let t = doc.create_text(block.trim());
        // Appends into a fresh document cannot fail.
        let _ = doc.append_child(root, p);
        let _ = doc.append_child(p, t);
    }
    doc
}

/// Render the tree back to text, marking annotated spans
fn write_annotated(doc: &Document, id: NodeId, out: &mut String) {
    if let Some(text) = doc.text(id) {
        out.push_str(text);
        return;
    }
    if let Some(label) = doc.attr(id, ANNOTATION_ATTR) {
        out.push_str(&format!("[{}|{}]", label, doc.text_content(id)));
        return;
    }
    for &child in doc.children(id) {
        write_annotated(doc, child, out);
    }
    if doc.tag(id) == Some("p") {
        out.push_str("\n\n");
    }
}

async fn annotate(path: PathBuf, db: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&path)?;
    let store = Arc::new(open_store(db)?);
    let engine = Arc::new(HighlightEngine::new(store));
    engine.initialize().await?;

    let doc = dom::shared(document_from_text(&text));
    let root = doc.lock().unwrap().root();
    let report = engine.scan(&doc, root).await;

    let doc = doc.lock().unwrap();
    let mut out = String::new();
    write_annotated(&doc, root, &mut out);
    println!("{}", out.trim_end());
    eprintln!(
        "annotated {} sentence(s) across {} node(s), {} skipped",
        report.rendered, report.units, report.skipped
    );
    Ok(())
}

fn run_config_set(
    store: &SqliteStore,
    mode: Option<String>,
    endpoint: Option<String>,
    credential: Option<String>,
    cache_enabled: Option<bool>,
    ttl_ms: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    use limn::AnnotationStore;
    let mut config = store.load_config()?.unwrap_or_default();
    if let Some(mode) = mode {
        config.mode = match mode.as_str() {
            "local" => ProviderMode::Local,
            "remote" => ProviderMode::Remote,
            other => return Err(format!("unknown mode '{other}'").into()),
        };
    }
    if endpoint.is_some() {
        config.endpoint = endpoint;
    }
    if credential.is_some() {
        config.credential = credential;
    }
    if let Some(cache_enabled) = cache_enabled {
        config.cache_enabled = cache_enabled;
    }
    if let Some(ttl_ms) = ttl_ms {
        config.ttl_ms = ttl_ms;
    }
    config.validate()?;
    store.save_config(&config)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Annotate { path, db } => annotate(path, db).await,
        Commands::Cache { action, db } => {
            use limn::AnnotationStore;
            let store = open_store(db)?;
            match action {
                CacheAction::Stats => {
                    println!("{} cached classification(s)", store.entry_count()?);
                }
                CacheAction::Clear => {
                    println!("removed {} cached classification(s)", store.clear()?);
                }
            }
            Ok(())
        }
        Commands::Config { action, db } => {
            use limn::AnnotationStore;
            let store = open_store(db)?;
            match action {
                ConfigAction::Show => {
                    let config = store.load_config()?.unwrap_or_default();
                    println!("{}", serde_json::to_string_pretty(&config)?);
                    Ok(())
                }
                ConfigAction::Set {
                    mode,
                    endpoint,
                    credential,
                    cache_enabled,
                    ttl_ms,
                } => run_config_set(&store, mode, endpoint, credential, cache_enabled, ttl_ms),
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
