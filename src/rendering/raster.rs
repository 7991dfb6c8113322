//! Artifact encoding
//!
//! Turns a composed canvas into the exported PNG artifact, named after
//! the harvest scope and layout that produced it.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::rendering::layout::LayoutMode;
use crate::site::HarvestScope;

/// The exported result of a harvest run
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
}

impl Artifact {
    /// Hex SHA-256 of the encoded bytes, for logs and golden tests
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }

    /// Write the artifact into `dir` under its own filename
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Filename pattern: `{scope}-{layout}.png`
pub fn artifact_filename(scope: HarvestScope, mode: LayoutMode) -> String {
    format!("{}-{}.png", scope.label(), mode.label())
}

/// Encode a canvas as PNG bytes
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new(Cursor::new(&mut bytes));
    encoder
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| Error::EncodeError(e.to_string()))?;
    Ok(bytes)
}

/// Encode and name the final artifact
pub fn rasterize(canvas: &RgbaImage, scope: HarvestScope, mode: LayoutMode) -> Result<Artifact> {
    let bytes = encode_png(canvas)?;
    Ok(Artifact {
        bytes,
        mime_type: "image/png",
        filename: artifact_filename(scope, mode),
    })
}
