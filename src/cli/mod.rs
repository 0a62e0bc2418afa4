//! Command-line interface for barcoder.
//!
//! Provides commands for serving the web interface and for operating on the
//! artifact directory directly: creating, listing and deleting barcodes.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::Pattern;

use crate::barcode::BarcodeEncoder;
use crate::cipher::CipherKey;
use crate::config::{self, ResolvedConfig};
use crate::core::PipelineOrchestrator;
use crate::domain::CreateRequest;
use crate::server::{self, AppState};
use crate::store::{ArtifactStore, StoreError};

/// barcoder - Serial-number barcode generator
#[derive(Parser, Debug)]
#[command(name = "barcoder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web interface
    Serve {
        /// Address to bind to (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Create the artifact directory if it is missing
        #[arg(long)]
        create_dir: bool,
    },

    /// Generate one barcode
    Create {
        /// Serial number to encode
        serial_number: String,

        /// Customer name (used in the filename only)
        #[arg(short = 'n', long, default_value = "")]
        customer_name: String,

        /// Customer number (used in the filename only)
        #[arg(short = 'u', long, default_value = "")]
        customer_number: String,

        /// Do not draw the serial number under the bars
        #[arg(long)]
        no_text: bool,
    },

    /// List barcodes in the artifact directory
    List {
        /// Show size and modification time
        #[arg(short, long)]
        long: bool,

        /// Only names matching this glob (e.g. "SN001*")
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// Delete a barcode by filename
    Delete {
        /// Filename as shown by `list`
        filename: String,
    },

    /// Show resolved configuration (debug)
    Config,

    /// Print a fresh cipher key for BARCODER_KEY
    Keygen,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { bind, create_dir } => serve(bind, create_dir).await,
            Commands::Create {
                serial_number,
                customer_name,
                customer_number,
                no_text,
            } => {
                let request = CreateRequest::new(serial_number, customer_name, customer_number);
                create_barcode(request, !no_text).await
            }
            Commands::List { long, pattern } => list_barcodes(long, pattern).await,
            Commands::Delete { filename } => delete_barcode(&filename).await,
            Commands::Config => show_config().await,
            Commands::Keygen => {
                println!("{}", CipherKey::generate().encoded());
                Ok(())
            }
        }
    }
}

fn build_orchestrator(config: &ResolvedConfig, show_text: bool) -> Result<PipelineOrchestrator> {
    let key = Arc::new(config::cipher_key()?);
    Ok(PipelineOrchestrator::new(
        key,
        BarcodeEncoder::new(config.render.clone()),
        config.artifact_dir.clone(),
    )
    .with_show_text(show_text))
}

fn open_store(config: &ResolvedConfig) -> Result<ArtifactStore> {
    ArtifactStore::open_existing(&config.artifact_dir)
        .context("Artifact directory must exist before use (create it or run `barcoder serve --create-dir`)")
}

/// Start the HTTP server
async fn serve(bind: Option<String>, create_dir: bool) -> Result<()> {
    let config = config::config()?;

    if create_dir && !config.artifact_dir.exists() {
        std::fs::create_dir_all(&config.artifact_dir).with_context(|| {
            format!(
                "Failed to create artifact directory: {}",
                config.artifact_dir.display()
            )
        })?;
    }

    let store = open_store(config)?;
    let orchestrator = build_orchestrator(config, config.show_text)?;

    let bind = bind.unwrap_or_else(|| config.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;

    server::serve(AppState::new(orchestrator, store), addr).await
}

/// Run the pipeline once from the command line
async fn create_barcode(request: CreateRequest, show_text: bool) -> Result<()> {
    let config = config::config()?;
    open_store(config)?;
    let orchestrator = build_orchestrator(config, show_text)?;

    let artifact = tokio::task::spawn_blocking(move || orchestrator.create(&request))
        .await
        .context("Pipeline task panicked")??;

    println!("{}", artifact.name);
    eprintln!("[Saved to {}]", artifact.path.display());
    Ok(())
}

/// List barcodes
async fn list_barcodes(long: bool, pattern: Option<String>) -> Result<()> {
    let store = open_store(config::config()?)?;

    let pattern = pattern
        .map(|p| Pattern::new(&p).with_context(|| format!("Invalid pattern: {}", p)))
        .transpose()?;

    if !long {
        let names = match pattern {
            Some(ref pattern) => store.list_matching(pattern)?,
            None => store.list()?,
        };
        if names.is_empty() {
            println!("No barcodes found");
        }
        for name in names {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut entries = store.list_entries()?;
    if let Some(ref pattern) = pattern {
        entries.retain(|e| pattern.matches(&e.name));
    }

    if entries.is_empty() {
        println!("No barcodes found");
        return Ok(());
    }

    println!("{:<10} {:<20} {}", "SIZE", "MODIFIED", "NAME");
    println!("{}", "-".repeat(60));
    for entry in entries {
        let modified = entry
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<10} {:<20} {}", entry.size_bytes, modified, entry.name);
    }

    Ok(())
}

/// Delete a barcode
async fn delete_barcode(filename: &str) -> Result<()> {
    let store = open_store(config::config()?)?;

    match store.delete(filename) {
        Ok(()) => {
            println!("Deleted {}", filename);
            Ok(())
        }
        Err(e @ StoreError::NotFound(_)) | Err(e @ StoreError::PathEscape(_)) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("barcoder configuration");
    println!("======================");
    match &config.config_file {
        Some(path) => println!("Config file:   {}", path.display()),
        None => println!("Config file:   (none, using defaults)"),
    }
    println!("Home:          {}", config.home.display());
    println!(
        "Artifact dir:  {}{}",
        config.artifact_dir.display(),
        if config.artifact_dir.is_dir() { "" } else { "  (missing)" }
    );
    println!("Bind:          {}", config.bind);
    println!("Show text:     {}", config.show_text);
    println!(
        "Render:        module {}px, bars {}px, quiet zone {} modules",
        config.render.module_width, config.render.bar_height, config.render.quiet_zone
    );
    println!(
        "Cipher key:    {}",
        if config::key_from_environment() {
            "from BARCODER_KEY"
        } else {
            "ephemeral (generated at startup)"
        }
    );

    Ok(())
}
