//! seguente CLI: thin shell over `seguente-core`.
//!
//! The core is transport-agnostic; this binary is the stand-in for the
//! transport layer. It maps subcommands onto the registry's CRUD
//! operations, building `RequestParts` the same way an HTTP front end
//! would (positional id → path segment, flags → query parameters,
//! `--json` → body).

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use seguente_core::RegistryError;
use seguente_core::config::RegistryConfig;
use seguente_core::registry::Registry;
use seguente_core::resolve::RequestParts;
use seguente_core::store::{MemoryStore, SqliteStore, Store};

#[derive(Parser)]
#[command(name = "sgt", version, about = "Peer descriptor registry")]
struct Cli {
    /// Path to the SQLite database (defaults to ./seguente.db).
    #[arg(long, global = true, env = "SGT_DB")]
    db: Option<PathBuf>,

    /// Optional TOML config file.
    #[arg(long, global = true, env = "SGT_CONFIG")]
    config: Option<PathBuf>,

    /// Use an in-memory store (useful for smoke tests).
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all registered descriptors.
    List,
    /// Register a descriptor from a JSON file (or stdin).
    Register {
        /// Path to the descriptor JSON; reads stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Fetch one descriptor.
    Get(Target),
    /// Delete one descriptor.
    Delete(Target),
}

/// Ways to identify the target record, mirroring the resolver's
/// strategies.
#[derive(Args)]
struct Target {
    /// Peer id as a path segment.
    id: Option<String>,

    /// Peer id as the `peerId` query parameter.
    #[arg(long = "peer-id")]
    peer_id: Option<String>,

    /// Peer id as the `id` query parameter.
    #[arg(long = "query-id")]
    query_id: Option<String>,

    /// JSON request body carrying `peerId` or `id`.
    #[arg(long)]
    json: Option<String>,
}

impl Target {
    fn into_request(self) -> RequestParts {
        let mut request = RequestParts::new();
        if let Some(id) = self.id {
            request = request.with_path(format!("/{id}"));
        }
        if let Some(peer_id) = self.peer_id {
            request = request.with_query("peerId", peer_id);
        }
        if let Some(id) = self.query_id {
            request = request.with_query("id", id);
        }
        if let Some(json) = self.json {
            request = request.with_body(json);
        }
        request
    }
}

/// File-level configuration; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    db_path: Option<PathBuf>,
    key_prefix: Option<String>,
    reserved_segment: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    fn registry_config(&self) -> RegistryConfig {
        let mut config = RegistryConfig::default();
        if let Some(prefix) = &self.key_prefix {
            config.key_prefix.clone_from(prefix);
        }
        if let Some(segment) = &self.reserved_segment {
            config.reserved_segment.clone_from(segment);
        }
        config
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SGT_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        let code = err
            .downcast_ref::<RegistryError>()
            .is_some_and(RegistryError::is_client_error)
            .then_some(2)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let store: Box<dyn Store> = if cli.ephemeral {
        debug!("using ephemeral in-memory store");
        Box::new(MemoryStore::new())
    } else {
        let path = cli
            .db
            .or_else(|| file_config.db_path.clone())
            .unwrap_or_else(|| PathBuf::from("seguente.db"));
        debug!(db = %path.display(), "opening sqlite store");
        Box::new(SqliteStore::open(&path).context("failed to open database")?)
    };
    let registry = Registry::new(store, file_config.registry_config());

    match cli.command {
        Command::List => print_json(&registry.list()?),
        Command::Register { file } => {
            let body = read_body(file.as_deref())?;
            print_json(&registry.register(&body)?)
        }
        Command::Get(target) => print_json(&registry.fetch(&target.into_request())?),
        Command::Delete(target) => print_json(&registry.remove(&target.into_request())?),
    }
}

fn read_body(file: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read payload {}", path.display())),
        None => {
            let mut body = Vec::new();
            std::io::stdin()
                .read_to_end(&mut body)
                .context("failed to read payload from stdin")?;
            Ok(body)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
