//! Barcode rendering.
//!
//! [`BarcodeEncoder`] turns a payload into a Code128 PNG written next to an
//! output stem. The encoder owns the extension: `render("out/SN001 Acme 555")`
//! produces `out/SN001 Acme 555.png`.
//!
//! Files are written to a temporary sibling and renamed into place, so a
//! failed render leaves nothing behind and concurrent renders of the same
//! name resolve last-writer-wins.

pub mod code128;
mod font;
mod raster;

use std::ffi::OsString;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

pub use code128::{Code128, CodeSet, EncodeError};

/// Extension appended to every rendered artifact
pub const IMAGE_EXTENSION: &str = "png";

/// Errors from rendering a barcode to disk
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Barcode encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Payload too long: {len} characters (max {max})")]
    PayloadTooLong { len: usize, max: usize },

    #[error("Barcode of {modules} modules does not fit the canvas limit")]
    Oversized { modules: usize },
}

/// Raster layout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Width of one module in pixels (default: 2)
    #[serde(default = "default_module_width")]
    pub module_width: u32,

    /// Bar height in pixels (default: 100)
    #[serde(default = "default_bar_height")]
    pub bar_height: u32,

    /// Quiet zone on each side, in modules (default: 10)
    #[serde(default = "default_quiet_zone")]
    pub quiet_zone: u32,

    /// Integer scale of the 5x7 font (default: 2)
    #[serde(default = "default_font_scale")]
    pub font_scale: u32,

    /// Top/bottom margin in pixels (default: 10)
    #[serde(default = "default_margin")]
    pub margin: u32,

    /// Longest payload accepted, in characters (default: 128)
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

fn default_module_width() -> u32 {
    2
}
fn default_bar_height() -> u32 {
    100
}
fn default_quiet_zone() -> u32 {
    10
}
fn default_font_scale() -> u32 {
    2
}
fn default_margin() -> u32 {
    10
}
fn default_max_payload_len() -> usize {
    128
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            module_width: default_module_width(),
            bar_height: default_bar_height(),
            quiet_zone: default_quiet_zone(),
            font_scale: default_font_scale(),
            margin: default_margin(),
            max_payload_len: default_max_payload_len(),
        }
    }
}

/// Code128 to PNG renderer
#[derive(Debug, Clone, Default)]
pub struct BarcodeEncoder {
    options: RenderOptions,
}

impl BarcodeEncoder {
    /// Create an encoder with the given layout
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Layout settings in use
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Encode and rasterize without touching the filesystem
    pub fn rasterize(&self, payload: &str, show_text: bool) -> Result<GrayImage, RenderError> {
        let len = payload.chars().count();
        if len > self.options.max_payload_len {
            return Err(RenderError::PayloadTooLong {
                len,
                max: self.options.max_payload_len,
            });
        }

        let code = Code128::encode(payload)?;
        debug!(
            symbols = code.symbols().len(),
            start = ?code.start_set(),
            "Encoded Code128 payload"
        );
        let text = show_text.then_some(payload);
        raster::draw(&code, text, &self.options)
    }

    /// Render `payload` to `output_stem` + `.png` and return the final path.
    ///
    /// The specific failure cause is logged here; callers only need the
    /// error kind.
    pub fn render(
        &self,
        payload: &str,
        show_text: bool,
        output_stem: &Path,
    ) -> Result<PathBuf, RenderError> {
        let final_path = with_image_extension(output_stem);

        match self.write(payload, show_text, &final_path) {
            Ok(()) => {
                info!(path = %final_path.display(), "Barcode generated successfully");
                Ok(final_path)
            }
            Err(e) => {
                error!(error = %e, "Barcode generation error");
                Err(e)
            }
        }
    }

    fn write(&self, payload: &str, show_text: bool, final_path: &Path) -> Result<(), RenderError> {
        let image = self.rasterize(payload, show_text)?;

        let dir = match final_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        // Suffix keeps in-flight files out of the image listing
        let mut tmp = tempfile::Builder::new()
            .prefix(".barcoder-")
            .suffix(".tmp")
            .tempfile_in(dir)?;

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            image.write_to(&mut writer, ImageFormat::Png)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;

        tmp.persist(final_path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Append `.png` to a stem without treating dots in the stem as an extension
pub fn with_image_extension(stem: &Path) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(IMAGE_EXTENSION);
    PathBuf::from(name)
}
