//! Domain types for barcoder.
//!
//! - CreateRequest: operator input for one barcode
//! - Artifact: a rendered barcode file

pub mod artifact;
pub mod request;

// Re-export commonly used types
pub use artifact::Artifact;
pub use request::CreateRequest;
