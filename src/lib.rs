//! barcoder - Serial-number barcode generator
//!
//! Takes a serial number plus customer metadata, renders a Code128 barcode
//! image for the serial number, and manages the resulting files through a
//! small web interface.
//!
//! # Architecture
//!
//! A creation request flows through a short pipeline:
//! - Validate: the serial number must be non-empty
//! - Round-trip: encrypt then decrypt the serial with the process key
//! - Render: Code128 PNG named `"{serial} {name} {number}.png"`
//!
//! The artifact directory is the store. Listing, deleting and downloading
//! read it directly; nothing is cached.
//!
//! # Modules
//!
//! - `cipher`: AES-GCM round-trip and the process key
//! - `barcode`: Code128 encoder and PNG renderer
//! - `store`: Artifact directory operations
//! - `core`: Pipeline orchestrator
//! - `domain`: Data structures (CreateRequest, Artifact)
//! - `server`: HTTP interface
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the web interface
//! barcoder serve --bind 127.0.0.1:5000
//!
//! # Create a barcode without the server
//! barcoder create SN001 --customer-name Acme --customer-number 555
//!
//! # List and delete
//! barcoder list --long
//! barcoder delete "SN001 Acme 555.png"
//! ```

pub mod barcode;
pub mod cipher;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod store;

// Re-export main types at crate root for convenience
pub use barcode::{BarcodeEncoder, RenderOptions};
pub use cipher::{CipherKey, CipherRoundTrip, RoundTrip};
pub use crate::core::{PipelineError, PipelineOrchestrator, PipelineState};
pub use domain::{Artifact, CreateRequest};
pub use store::{ArtifactStore, StoreError};
