//! Rendered barcode artifacts.
//!
//! An artifact is a file in the artifact directory; this struct only exists
//! for the duration of the request that produced it.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A barcode image written by a successful pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Final filename component, e.g. `SN001 Acme 555.png`
    pub name: String,

    /// Full path on disk
    pub path: PathBuf,

    /// When the render completed
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Build from the path returned by the encoder
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            name,
            path,
            created_at: Utc::now(),
        })
    }
}
