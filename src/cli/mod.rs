//! Command-line interface for stemshelf.
//!
//! Provides commands for submitting links and uploads, browsing the
//! library, renaming and deleting entries, and saving individual stems.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::adapters::{FileUpload, HttpBackend};
use crate::blobs::BlobRegistry;
use crate::config::{self, ResolvedConfig};
use crate::domain::{EntryId, LibraryEntry, SourceRef};
use crate::library::{DownloadOutcome, FileStorage, LibraryStore};
use crate::session::{prepare_storage, IdentityChange};

/// stemshelf - Library manager for stem separation results
#[derive(Parser, Debug)]
#[command(name = "stemshelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Separate a remote video link and add it to the library
    Add {
        /// Video URL
        url: String,
    },

    /// Upload a local audio file and add the result to the library
    Upload {
        /// Path to the audio file
        path: PathBuf,
    },

    /// List library entries (newest first)
    List {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show details of an entry
    Show {
        /// Entry ID
        id: String,
    },

    /// Rename an entry
    Rename {
        /// Entry ID
        id: String,

        /// New title
        title: String,
    },

    /// Delete an entry (press Enter during the grace window to undo)
    Remove {
        /// Entry ID
        id: String,

        /// Skip the undo window
        #[arg(long)]
        now: bool,
    },

    /// Delete every entry (press Enter during the grace window to undo)
    Clear {
        /// Skip the undo window
        #[arg(long)]
        now: bool,
    },

    /// Save one stem of an entry to the download directory
    Download {
        /// Entry ID
        id: String,

        /// File name within the entry's archive
        file: String,
    },

    /// Forget the local library (as after signing in with a new account)
    Reset {
        /// Treat as a freshly created account
        #[arg(long)]
        new_account: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = config::config()?;

        match self.command {
            Commands::Add { url } => add_link(config, &url).await,
            Commands::Upload { path } => upload_file(config, path).await,
            Commands::List { limit } => list_entries(config, limit).await,
            Commands::Show { id } => show_entry(config, &id).await,
            Commands::Rename { id, title } => rename_entry(config, &id, &title).await,
            Commands::Remove { id, now } => remove_entry(config, &id, now).await,
            Commands::Clear { now } => clear_library(config, now).await,
            Commands::Download { id, file } => download(config, &id, &file).await,
            Commands::Reset { new_account } => reset(config, new_account),
            Commands::Config => show_config(config),
        }
    }
}

/// Build a store over the configured backend and storage file
fn open_store(config: &ResolvedConfig) -> LibraryStore {
    let backend = Arc::new(HttpBackend::new(config.backend_url.clone()));
    let storage = Arc::new(FileStorage::new(config.storage_path()));
    LibraryStore::open(backend, storage, BlobRegistry::new(), config.store_settings())
}

fn parse_id(id: &str) -> EntryId {
    EntryId::from(id.trim())
}

fn print_entry_line(entry: &LibraryEntry) {
    let kind = match entry.source {
        SourceRef::Link { .. } => "link",
        SourceRef::LocalFile { .. } => "file",
    };
    println!(
        "{}  [{}]  {}  ({} files)  {}",
        entry.id,
        kind,
        entry.title,
        entry.extracted_files.len(),
        entry.added_at.format("%Y-%m-%d %H:%M")
    );
}

/// Read one line on a plain thread; `true` if a line arrived before EOF.
///
/// The thread is detached, so an unanswered prompt never holds up exit.
fn spawn_line_reader<R>(mut reader: R) -> oneshot::Receiver<bool>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let got_line = matches!(reader.read_line(&mut line), Ok(n) if n > 0);
        let _ = tx.send(got_line);
    });
    rx
}

/// Wait for the reader's answer until `grace` elapses
async fn wait_for_undo(answer: oneshot::Receiver<bool>, grace: Duration) -> bool {
    tokio::select! {
        got_line = answer => got_line.unwrap_or(false),
        _ = tokio::time::sleep(grace) => false,
    }
}

/// Wait for Enter during the grace window
async fn offer_undo(grace: Duration) -> bool {
    eprintln!(
        "Press Enter within {}s to undo...",
        grace.as_secs_f32().round() as u64
    );
    let answer = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    wait_for_undo(answer, grace).await
}

async fn add_link(config: &ResolvedConfig, url: &str) -> Result<()> {
    let store = open_store(config);
    eprintln!("Processing {} ...", url);

    let entry = store
        .add_from_link(url)
        .await
        .with_context(|| format!("Failed to process {}", url))?;

    print_entry_line(&entry);
    for file in &entry.extracted_files {
        println!("  - {}", file.filename);
    }
    Ok(())
}

async fn upload_file(config: &ResolvedConfig, path: PathBuf) -> Result<()> {
    let upload = FileUpload::from_path(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    config.limits.validate(&upload)?;

    let store = open_store(config);
    eprintln!("Uploading {} ({} bytes) ...", upload.file_name, upload.len());

    let entry = store
        .add_from_file(upload)
        .await
        .with_context(|| format!("Failed to process {}", path.display()))?;

    print_entry_line(&entry);
    for file in &entry.extracted_files {
        println!("  - {}", file.filename);
    }
    Ok(())
}

async fn list_entries(config: &ResolvedConfig, limit: usize) -> Result<()> {
    let store = open_store(config);
    let entries = store.entries().await;

    if entries.is_empty() {
        println!("Library is empty. Add something with: stemshelf add <url>");
        return Ok(());
    }

    println!("Library ({} entries):\n", entries.len());
    for entry in entries.iter().take(limit) {
        print_entry_line(entry);
    }
    Ok(())
}

async fn show_entry(config: &ResolvedConfig, id: &str) -> Result<()> {
    let store = open_store(config);
    let id = parse_id(id);
    let entry = store
        .get(&id)
        .await
        .with_context(|| format!("Entry not found: {}", id))?;

    println!("ID: {}", entry.id);
    println!("Title: {}", entry.title);
    println!("Source: {}", entry.source);
    if let Some(thumbnail) = &entry.thumbnail {
        println!("Thumbnail: {}", thumbnail);
    }
    println!("Added: {}", entry.added_at);
    if let Some(key) = &entry.cache_key {
        println!("Cache key: {}", key);
    }

    println!("\nLayers:");
    for layer in &entry.layers {
        println!("  {:<8} {:>3}%  ({:?})", layer.name, layer.volume, layer.icon);
    }

    println!("\nFiles:");
    for file in &entry.extracted_files {
        println!("  {:<16} {}", file.display_name(), file.filename);
    }
    Ok(())
}

async fn rename_entry(config: &ResolvedConfig, id: &str, title: &str) -> Result<()> {
    let store = open_store(config);
    store.update_title(&parse_id(id), title).await?;
    println!("Renamed {} to \"{}\"", id, title);
    Ok(())
}

async fn remove_entry(config: &ResolvedConfig, id: &str, now: bool) -> Result<()> {
    let store = open_store(config);
    let id = parse_id(id);

    if now {
        store.remove(&id).await?;
        println!("Removed {}", id);
        return Ok(());
    }

    let grace = store.settings().grace_window;
    store.schedule_remove(&id, grace).await?;
    println!("Removed {}", id);

    if offer_undo(grace).await && store.undo_remove(&id).await {
        println!("Restored {}", id);
    }
    Ok(())
}

async fn clear_library(config: &ResolvedConfig, now: bool) -> Result<()> {
    let store = open_store(config);

    if now {
        let cleared = store.clear().await;
        println!("Cleared {} entries", cleared);
        return Ok(());
    }

    let grace = store.settings().grace_window;
    let cleared = store.schedule_clear(grace).await;
    println!("Cleared {} entries", cleared);

    if cleared > 0 && offer_undo(grace).await && store.undo_clear().await {
        println!("Restored {} entries", cleared);
    }
    Ok(())
}

async fn download(config: &ResolvedConfig, id: &str, file: &str) -> Result<()> {
    let store = open_store(config);
    let id = parse_id(id);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match store.download_file(&id, file, &cancel).await? {
        DownloadOutcome::Saved(path) => println!("Saved {}", path.display()),
        DownloadOutcome::Cancelled => eprintln!("Download cancelled"),
    }
    Ok(())
}

fn reset(config: &ResolvedConfig, new_account: bool) -> Result<()> {
    let storage = FileStorage::new(config.storage_path());
    let change = if new_account {
        IdentityChange::AccountCreated
    } else {
        IdentityChange::SignedIn { first_time: true }
    };

    if prepare_storage(&storage, change) {
        println!("Local library cleared");
    } else {
        anyhow::bail!("Failed to clear {}", storage.path().display());
    }
    Ok(())
}

fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("stemshelf configuration:\n");

    if let Some(ref path) = config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file: (none - using defaults)");
    }

    println!("Home:        {}", config.home.display());
    println!("Storage:     {}", config.storage_path().display());
    println!("Downloads:   {}", config.downloads.display());
    println!("Backend:     {}", config.backend_url);
    println!("Grace:       {}s", config.grace_window.as_secs());
    println!("Max upload:  {} bytes", config.limits.max_upload_bytes);

    println!("\nEnvironment overrides:");
    for var in ["STEMSHELF_HOME", "STEMSHELF_BACKEND_URL", "STEMSHELF_DOWNLOADS"] {
        if let Ok(value) = std::env::var(var) {
            println!("  {}={}", var, value);
        }
    }

    Ok(())
}
