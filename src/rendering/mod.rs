//! Stitching pipeline: grid planning, compositing, artifact encoding

pub mod layout;
pub mod paint;
pub mod raster;

pub use layout::{FitMode, GridShape, LayoutMode};
pub use raster::Artifact;

use image::RgbaImage;

use crate::error::Result;
use crate::site::HarvestScope;

/// Everything the stitcher needs to know beyond the images themselves
#[derive(Debug, Clone)]
pub struct StitchOptions {
    pub mode: LayoutMode,
    pub fit: FitMode,
    pub padding: u32,
    pub background: String,
    pub scope: HarvestScope,
}

impl Default for StitchOptions {
    fn default() -> Self {
        StitchOptions {
            mode: LayoutMode::default(),
            fit: FitMode::default(),
            padding: 16,
            background: "#ffffff".into(),
            scope: HarvestScope::Single,
        }
    }
}

/// Compose the images into a grid and encode the named PNG artifact
pub fn stitch(images: &[RgbaImage], options: &StitchOptions) -> Result<Artifact> {
    let background = paint::parse_color(&options.background)?;
    let canvas = paint::compose(images, options.mode, options.fit, options.padding, background)?;
    log::debug!(
        "composed {} images onto a {}x{} canvas",
        images.len(),
        canvas.width(),
        canvas.height()
    );
    raster::rasterize(&canvas, options.scope, options.mode)
}
