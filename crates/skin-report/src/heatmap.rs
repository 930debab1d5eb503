//! Raster confusion matrix heatmap.
//!
//! Rows are true classes (top to bottom), columns are predicted classes (left
//! to right). Cells are shaded by count relative to the largest cell and
//! carry their count in a blocky digit font. Class labels are in the SVG.

use std::path::Path;

use image::{Rgb, RgbImage};

use skin_core::{ConfusionMatrix, Error, Result};

use crate::colormap::{count_color, is_dark};

/// Pixel size of one matrix cell
pub const CELL_SIZE: u32 = 96;
/// Width of the white grid lines between cells
pub const GRID_WIDTH: u32 = 2;
/// Pixels per font dot
const DOT: u32 = 4;

/// 3x5 digit glyphs, one row per entry, high bit on the left
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
    for y in y0..(y0 + h).min(img.height()) {
        for x in x0..(x0 + w).min(img.width()) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Draws `count` centred in the cell whose top-left corner is `(x0, y0)`
fn draw_count(img: &mut RgbImage, x0: u32, y0: u32, count: usize, color: Rgb<u8>) {
    let text = count.to_string();
    let glyph_w = 3 * DOT;
    let advance = glyph_w + DOT;
    let text_w = text.len() as u32 * advance - DOT;
    let text_h = 5 * DOT;
    let left = x0 + CELL_SIZE.saturating_sub(text_w) / 2;
    let top = y0 + (CELL_SIZE - text_h) / 2;

    for (i, ch) in text.chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            continue;
        };
        let gx = left + i as u32 * advance;
        for (row, bits) in DIGITS[digit as usize].iter().enumerate() {
            for col in 0..3 {
                if bits & (0b100 >> col) != 0 {
                    fill_rect(img, gx + col * DOT, top + row as u32 * DOT, DOT, DOT, color);
                }
            }
        }
    }
}

/// Renders the matrix into an RGB image
pub fn render_heatmap(cm: &ConfusionMatrix) -> Result<RgbImage> {
    if cm.num_classes == 0 {
        return Err(Error::InvalidArgument(
            "Cannot render an empty confusion matrix".to_string(),
        ));
    }

    let n = cm.num_classes as u32;
    let side = n * CELL_SIZE + (n + 1) * GRID_WIDTH;
    let mut img = RgbImage::from_pixel(side, side, Rgb([255, 255, 255]));
    let max = cm.max_count();

    for row in 0..cm.num_classes {
        for col in 0..cm.num_classes {
            let count = cm.get(row, col);
            let fill = count_color(count, max);
            let x0 = GRID_WIDTH + col as u32 * (CELL_SIZE + GRID_WIDTH);
            let y0 = GRID_WIDTH + row as u32 * (CELL_SIZE + GRID_WIDTH);
            fill_rect(&mut img, x0, y0, CELL_SIZE, CELL_SIZE, Rgb(fill));

            let ink = if is_dark(fill) { [255, 255, 255] } else { [33, 33, 33] };
            draw_count(&mut img, x0, y0, count, Rgb(ink));
        }
    }

    Ok(img)
}

/// Renders the matrix and saves it as PNG
pub fn save_heatmap_png(cm: &ConfusionMatrix, path: &Path) -> Result<()> {
    let img = render_heatmap(cm)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save_with_format(path, image::ImageFormat::Png)?;
    tracing::info!("Confusion matrix saved to {}", path.display());
    Ok(())
}
