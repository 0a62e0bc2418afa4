//! Pipeline orchestrator for barcode creation.
//!
//! One call to [`PipelineOrchestrator::create`] walks a single request
//! through the pipeline:
//!
//! ```text
//! Received -> Validating -> RoundTripping -> Rendering -> Stored
//!                 |               |              |
//!      RejectedEmptyInput  AbortedCipherFailure  AbortedRenderFailure
//! ```
//!
//! No collision check is made before rendering. Two requests with the same
//! serial/name/number write the same file and the later one wins.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::barcode::{with_image_extension, BarcodeEncoder};
use crate::cipher::{CipherKey, CipherRoundTrip, RoundTrip};
use crate::domain::{Artifact, CreateRequest};
use crate::store::is_local_name;

/// States of a single creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Received,
    Validating,
    RoundTripping,
    Rendering,

    /// Artifact written
    Stored,

    /// Serial number was empty; nothing touched
    RejectedEmptyInput,

    /// Encrypt or decrypt failed; nothing written
    AbortedCipherFailure,

    /// Encoding or writing failed; nothing written
    AbortedRenderFailure,
}

impl PipelineState {
    /// Whether the request has finished
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Stored
                | PipelineState::RejectedEmptyInput
                | PipelineState::AbortedCipherFailure
                | PipelineState::AbortedRenderFailure
        )
    }
}

/// Which half of the round-trip failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherStage {
    Encrypt,
    Decrypt,
}

impl fmt::Display for CipherStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherStage::Encrypt => write!(f, "encrypt"),
            CipherStage::Decrypt => write!(f, "decrypt"),
        }
    }
}

/// Why a creation request produced no artifact
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Serial number is empty")]
    EmptyInput,

    #[error("Cipher round-trip failed at {0}")]
    CipherFailure(CipherStage),

    #[error("Barcode rendering failed: {0}")]
    RenderFailure(String),
}

impl PipelineError {
    /// Terminal state this error corresponds to
    pub fn terminal_state(&self) -> PipelineState {
        match self {
            PipelineError::EmptyInput => PipelineState::RejectedEmptyInput,
            PipelineError::CipherFailure(_) => PipelineState::AbortedCipherFailure,
            PipelineError::RenderFailure(_) => PipelineState::AbortedRenderFailure,
        }
    }
}

/// Composes the cipher gate, the encoder and the artifact directory
#[derive(Debug, Clone)]
pub struct PipelineOrchestrator {
    cipher: Arc<dyn RoundTrip>,
    encoder: BarcodeEncoder,
    artifact_dir: PathBuf,
    show_text: bool,
}

impl PipelineOrchestrator {
    /// Create an orchestrator writing into `artifact_dir`.
    ///
    /// The directory is expected to exist already.
    pub fn new(key: Arc<CipherKey>, encoder: BarcodeEncoder, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            cipher: Arc::new(CipherRoundTrip::new(key)),
            encoder,
            artifact_dir: artifact_dir.into(),
            show_text: true,
        }
    }

    /// Replace the AES-GCM round-trip with another gate
    pub fn with_cipher(mut self, cipher: impl RoundTrip + 'static) -> Self {
        self.cipher = Arc::new(cipher);
        self
    }

    /// Draw the serial number under the bars (default: on)
    pub fn with_show_text(mut self, show_text: bool) -> Self {
        self.show_text = show_text;
        self
    }

    /// Directory artifacts are written to
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Run one creation request to a terminal state
    #[instrument(skip(self, request), fields(request_id = %Uuid::new_v4()))]
    pub fn create(&self, request: &CreateRequest) -> Result<Artifact, PipelineError> {
        let result = self.run(request);

        match &result {
            Ok(artifact) => info!(
                state = ?PipelineState::Stored,
                artifact = %artifact.name,
                "Pipeline stored artifact"
            ),
            Err(e) => warn!(state = ?e.terminal_state(), error = %e, "Pipeline aborted"),
        }

        result
    }

    fn run(&self, request: &CreateRequest) -> Result<Artifact, PipelineError> {
        let mut state = PipelineState::Received;

        advance(&mut state, PipelineState::Validating);
        if request.serial_number.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        advance(&mut state, PipelineState::RoundTripping);
        let token = self
            .cipher
            .encrypt(&request.serial_number)
            .ok_or(PipelineError::CipherFailure(CipherStage::Encrypt))?;
        let serial = self
            .cipher
            .decrypt(&token)
            .ok_or(PipelineError::CipherFailure(CipherStage::Decrypt))?;

        advance(&mut state, PipelineState::Rendering);
        let stem = request.artifact_stem();
        let file_name = with_image_extension(Path::new(&stem));
        if !file_name.to_str().map(is_local_name).unwrap_or(false) {
            return Err(PipelineError::RenderFailure(format!(
                "artifact name {:?} is not a plain filename",
                stem
            )));
        }

        let path = self
            .encoder
            .render(&serial, self.show_text, &self.artifact_dir.join(&stem))
            .map_err(|e| PipelineError::RenderFailure(e.to_string()))?;

        let artifact = Artifact::from_path(path).ok_or_else(|| {
            PipelineError::RenderFailure("rendered path has no filename".to_string())
        })?;

        advance(&mut state, PipelineState::Stored);
        Ok(artifact)
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!(from = ?*state, to = ?next, "Pipeline transition");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn orchestrator(dir: &Path) -> PipelineOrchestrator {
        PipelineOrchestrator::new(
            Arc::new(CipherKey::generate()),
            BarcodeEncoder::default(),
            dir,
        )
    }

    #[test]
    fn test_terminal_states() {
        assert!(PipelineState::Stored.is_terminal());
        assert!(PipelineState::RejectedEmptyInput.is_terminal());
        assert!(!PipelineState::Rendering.is_terminal());
        assert!(!PipelineState::Received.is_terminal());
    }

    #[test]
    fn test_error_terminal_states() {
        assert_eq!(
            PipelineError::EmptyInput.terminal_state(),
            PipelineState::RejectedEmptyInput
        );
        assert_eq!(
            PipelineError::CipherFailure(CipherStage::Decrypt).terminal_state(),
            PipelineState::AbortedCipherFailure
        );
        assert_eq!(
            PipelineError::RenderFailure("x".into()).terminal_state(),
            PipelineState::AbortedRenderFailure
        );
    }

    #[test]
    fn test_create_reports_final_filename() {
        let temp = TempDir::new().unwrap();
        let artifact = orchestrator(temp.path())
            .create(&CreateRequest::new("SN001", "Acme", "555"))
            .unwrap();

        assert_eq!(artifact.name, "SN001 Acme 555.png");
        assert_eq!(artifact.path, temp.path().join("SN001 Acme 555.png"));
        assert!(artifact.path.is_file());
    }

    #[test]
    fn test_separator_in_fields_is_render_failure() {
        let temp = TempDir::new().unwrap();
        let result = orchestrator(temp.path()).create(&CreateRequest::new("SN001", "../x", "1"));

        assert!(matches!(result, Err(PipelineError::RenderFailure(_))));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    /// Gate that refuses to encrypt
    #[derive(Debug)]
    struct SealedCipher;

    impl RoundTrip for SealedCipher {
        fn encrypt(&self, _plaintext: &str) -> Option<String> {
            None
        }

        fn decrypt(&self, _token: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_encrypt_failure_aborts_without_file() {
        let temp = TempDir::new().unwrap();
        let result = orchestrator(temp.path())
            .with_cipher(SealedCipher)
            .create(&CreateRequest::new("SN001", "Acme", "555"));

        let err = result.unwrap_err();
        assert_eq!(err, PipelineError::CipherFailure(CipherStage::Encrypt));
        assert_eq!(err.terminal_state(), PipelineState::AbortedCipherFailure);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_oversized_serial_is_render_failure() {
        let temp = TempDir::new().unwrap();
        let serial = "7".repeat(10_000);
        let result = orchestrator(temp.path()).create(&CreateRequest::new(serial, "a", "b"));

        assert!(matches!(result, Err(PipelineError::RenderFailure(_))));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_show_text_toggle() {
        let temp = TempDir::new().unwrap();
        let with_text = orchestrator(temp.path())
            .create(&CreateRequest::new("T1", "a", "1"))
            .unwrap();
        let without_text = orchestrator(temp.path())
            .with_show_text(false)
            .create(&CreateRequest::new("T1", "a", "2"))
            .unwrap();

        let tall = image::open(&with_text.path).unwrap();
        let short = image::open(&without_text.path).unwrap();
        assert!(tall.height() > short.height());
    }
}
