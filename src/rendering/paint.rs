//! Canvas compositing
//!
//! Fills the planned canvas with the background color and places each
//! image into its cell. Placement order is collection order, row-major.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::{Error, Result};
use crate::rendering::layout::{self, CanvasPlan, FitMode, LayoutMode};

/// Parse a `#rgb` or `#rrggbb` hex color into an opaque pixel
pub fn parse_color(spec: &str) -> Result<Rgba<u8>> {
    let hex = spec
        .strip_prefix('#')
        .ok_or_else(|| Error::ConfigError(format!("background {:?} is not a hex color", spec)))?;
    let expand = |v: u8| v << 4 | v;
    let channels = match hex.len() {
        3 => {
            let v = u16::from_str_radix(hex, 16)
                .map_err(|_| Error::ConfigError(format!("invalid hex color {:?}", spec)))?;
            [
                expand(((v >> 8) & 0xf) as u8),
                expand(((v >> 4) & 0xf) as u8),
                expand((v & 0xf) as u8),
            ]
        }
        6 => {
            let v = u32::from_str_radix(hex, 16)
                .map_err(|_| Error::ConfigError(format!("invalid hex color {:?}", spec)))?;
            [((v >> 16) & 0xff) as u8, ((v >> 8) & 0xff) as u8, (v & 0xff) as u8]
        }
        _ => {
            return Err(Error::ConfigError(format!(
                "invalid hex color {:?} (expected #rgb or #rrggbb)",
                spec
            )))
        }
    };
    Ok(Rgba([channels[0], channels[1], channels[2], 0xff]))
}

/// Compose `images` into a single grid canvas.
///
/// The cell edge is the largest single dimension across all images, so
/// every image fits its cell without the grid deciding to crop.
pub fn compose(
    images: &[RgbaImage],
    mode: LayoutMode,
    fit: FitMode,
    padding: u32,
    background: Rgba<u8>,
) -> Result<RgbaImage> {
    if images.is_empty() {
        return Err(Error::EmptyInput("no images to compose".into()));
    }

    let dimensions: Vec<(u32, u32)> = images.iter().map(|i| i.dimensions()).collect();
    let tile = layout::tile_edge(&dimensions);
    if tile == 0 {
        return Err(Error::EmptyInput("all images have zero area".into()));
    }

    let shape = layout::plan_grid(images.len(), mode);
    let plan = CanvasPlan::new(shape, tile, padding);
    let mut canvas = RgbaImage::from_pixel(plan.width(), plan.height(), background);

    for (index, img) in images.iter().enumerate() {
        let (cell_x, cell_y) = plan.cell_origin(index);
        let (w, h) = img.dimensions();
        let (target_w, target_h) = match fit {
            FitMode::Contain => layout::fit_within(w, h, tile),
            FitMode::Cover => layout::cover_within(w, h, tile),
        };
        if target_w == 0 || target_h == 0 {
            log::debug!("skipping zero-area image at cell {}", index);
            continue;
        }

        match fit {
            FitMode::Contain => {
                let x = cell_x + layout::centered_offset(tile, target_w);
                let y = cell_y + layout::centered_offset(tile, target_h);
                if (target_w, target_h) == (w, h) {
                    imageops::overlay(&mut canvas, img, x as i64, y as i64);
                } else {
                    let scaled = imageops::resize(img, target_w, target_h, FilterType::Lanczos3);
                    imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
                }
            }
            FitMode::Cover => {
                // keep the centered tile-sized window of the scaled image
                let window_x = layout::centered_offset(target_w, tile);
                let window_y = layout::centered_offset(target_h, tile);
                let window = if (target_w, target_h) == (w, h) {
                    imageops::crop_imm(img, window_x, window_y, tile, tile).to_image()
                } else {
                    let scaled = imageops::resize(img, target_w, target_h, FilterType::Lanczos3);
                    imageops::crop_imm(&scaled, window_x, window_y, tile, tile).to_image()
                };
                imageops::overlay(&mut canvas, &window, cell_x as i64, cell_y as i64);
            }
        }
    }

    Ok(canvas)
}
