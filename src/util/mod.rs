//! Rendering collaborator and image helpers.
//!
//! The viewers never draw anything themselves: they build an [`Overlay`] (a set
//! of labelled marker layers in image coordinates) and hand it, together with
//! the decoded image, to a [`Renderer`]. [`PngRenderer`] draws the markers, the
//! title and a legend and writes one PNG per overlay, [`CsvRenderer`] dumps the
//! marker coordinates. Text is drawn with a small built-in bitmap font.

use crate::camera::Resolution;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use nalgebra::Point2;
use std::fs;
use std::path::Path;

mod font;
mod render;

pub use font::{draw_text, measure_text};
pub use render::{add_header, draw_dot, draw_star, header_height, CsvRenderer, PngRenderer};
use render::{TEXT_COLOR, TEXT_PADDING, TEXT_SCALE};

#[derive(thiserror::Error, Debug)]
pub enum UtilError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error("Image error: {0}")]
    ImageError(String),
    #[error("CSV error: {0}")]
    CsvError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for UtilError {
    fn from(err: std::io::Error) -> Self {
        UtilError::IOError(err.to_string())
    }
}

impl From<image::ImageError> for UtilError {
    fn from(err: image::ImageError) -> Self {
        UtilError::ImageError(err.to_string())
    }
}

impl From<csv::Error> for UtilError {
    fn from(err: csv::Error) -> Self {
        UtilError::CsvError(err.to_string())
    }
}

pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);

const PLACEHOLDER_BACKGROUND: Rgb<u8> = Rgb([230, 230, 230]);
const PLACEHOLDER_TEXT: Rgb<u8> = Rgb([60, 60, 60]);
const AXIS_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Width of the left and height of the bottom band added by [`label_grid_axes`].
pub const AXIS_LABEL_BAND: u32 = font::GLYPH_HEIGHT * TEXT_SCALE + 2 * TEXT_PADDING;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerShape {
    /// Filled disc.
    Dot { radius: i32 },
    /// Eight-armed star, `size` pixels per arm.
    Star { size: i32 },
}

/// Points sharing a label, color and marker shape.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub label: String,
    pub color: Rgb<u8>,
    pub shape: MarkerShape,
    pub points: Vec<Point2<f64>>,
}

impl OverlayLayer {
    /// Creates a layer drawing every point of `points` as `shape` in `color`.
    ///
    /// # Arguments
    ///
    /// * `label` - Legend text; also the CSV label of the points.
    /// * `color` - Marker and legend swatch color.
    /// * `shape` - Marker drawn at each point.
    /// * `points` - Marker centers in image coordinates (top-left origin).
    pub fn new(label: &str, color: Rgb<u8>, shape: MarkerShape, points: Vec<Point2<f64>>) -> Self {
        OverlayLayer {
            label: label.to_string(),
            color,
            shape,
            points,
        }
    }
}

/// Everything drawn on top of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// File-friendly identifier, e.g. `136_cam_1`.
    pub name: String,
    /// Human readable title, e.g. `cam_1 - Image 136`.
    pub title: String,
    /// Canvas size used when no image is supplied.
    pub canvas: Resolution,
    pub layers: Vec<OverlayLayer>,
}

impl Overlay {
    /// First layer with the given label, if any.
    pub fn layer(&self, label: &str) -> Option<&OverlayLayer> {
        self.layers.iter().find(|layer| layer.label == label)
    }
}

/// Receives overlays produced by the viewers.
pub trait Renderer {
    /// Renders `overlay`, on top of `image` when one is given.
    fn render(&mut self, overlay: &Overlay, image: Option<&RgbImage>) -> Result<(), UtilError>;

    /// Renders a composed image that carries no markers, such as a sample grid.
    fn render_image(&mut self, name: &str, image: &RgbImage) -> Result<(), UtilError>;
}

/// Ensure the output directory exists
pub fn ensure_output_dir(output_dir: &Path) -> Result<(), UtilError> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir).map_err(|e| {
            UtilError::InvalidParams(format!(
                "Failed to create output directory {}: {e}",
                output_dir.display()
            ))
        })?;
    }
    Ok(())
}

/// Load an image from file path as 8-bit RGB.
pub fn load_image(image_path: &Path) -> Result<RgbImage, UtilError> {
    let img = image::open(image_path).map_err(|e| {
        UtilError::ImageError(format!(
            "Failed to load image {}: {e}",
            image_path.display()
        ))
    })?;

    Ok(img.to_rgb8())
}

/// Tile used in place of a missing grid image: grey with a centered "N/A".
///
/// The text is scaled to about half the tile width.
pub fn placeholder_tile(tile: Resolution) -> RgbImage {
    const TEXT: &str = "N/A";
    let mut img = RgbImage::from_pixel(tile.width, tile.height, PLACEHOLDER_BACKGROUND);

    let unit_width = measure_text(TEXT, 1);
    let scale = (tile.width / (2 * unit_width))
        .min(tile.height / (2 * font::GLYPH_HEIGHT))
        .max(1);
    let x = (tile.width as i32 - measure_text(TEXT, scale) as i32) / 2;
    let y = (tile.height as i32 - (font::GLYPH_HEIGHT * scale) as i32) / 2;
    draw_text(&mut img, x, y, TEXT, PLACEHOLDER_TEXT, scale);
    img
}

/// Adds axis titles around a composed grid.
///
/// `x_label` is centered in a band below the grid, `y_label` is written
/// bottom-to-top in a band on its left. Both bands are [`AXIS_LABEL_BAND`]
/// pixels wide.
///
/// # Arguments
///
/// * `grid` - Composed grid, see [`compose_grid`].
/// * `x_label` - Title of the columns, e.g. `Camera number`.
/// * `y_label` - Title of the rows, e.g. `Sample number`.
///
/// # Return Value
///
/// A new image of `(grid.width + band) x (grid.height + band)`.
pub fn label_grid_axes(grid: &RgbImage, x_label: &str, y_label: &str) -> RgbImage {
    let band = AXIS_LABEL_BAND;
    let (width, height) = grid.dimensions();
    let mut canvas = RgbImage::from_pixel(width + band, height + band, AXIS_BACKGROUND);
    imageops::replace(&mut canvas, grid, band as i64, 0);

    let x_text_width = measure_text(x_label, TEXT_SCALE) as i32;
    draw_text(
        &mut canvas,
        band as i32 + (width as i32 - x_text_width) / 2,
        (height + TEXT_PADDING) as i32,
        x_label,
        TEXT_COLOR,
        TEXT_SCALE,
    );

    let y_text_width = measure_text(y_label, TEXT_SCALE);
    if y_text_width > 0 {
        let mut text = RgbImage::from_pixel(
            y_text_width,
            font::GLYPH_HEIGHT * TEXT_SCALE,
            AXIS_BACKGROUND,
        );
        draw_text(&mut text, 0, 0, y_label, TEXT_COLOR, TEXT_SCALE);
        let rotated = imageops::rotate270(&text);
        let y = (height as i64 - y_text_width as i64) / 2;
        imageops::replace(&mut canvas, &rotated, TEXT_PADDING as i64, y);
    }

    canvas
}

/// Tiles images row-major into a `rows x cols` grid without spacing.
///
/// `tiles` must hold exactly `rows * cols` entries; `None` entries become a
/// placeholder. Images whose size differs from `tile` are resized.
///
/// # Errors
///
/// [`UtilError::InvalidParams`] on a tile count mismatch or an empty grid or tile.
pub fn compose_grid(
    tiles: &[Option<RgbImage>],
    rows: u32,
    cols: u32,
    tile: Resolution,
) -> Result<RgbImage, UtilError> {
    if tile.width == 0 || tile.height == 0 {
        return Err(UtilError::InvalidParams("Tile size must be non-zero".to_string()));
    }
    if rows == 0 || cols == 0 {
        return Err(UtilError::InvalidParams("Grid needs at least one row and column".to_string()));
    }
    if tiles.len() != (rows * cols) as usize {
        return Err(UtilError::InvalidParams(format!(
            "Expected {} tiles for a {rows}x{cols} grid, got {}",
            rows * cols,
            tiles.len()
        )));
    }

    let mut grid = RgbImage::new(cols * tile.width, rows * tile.height);
    let placeholder = placeholder_tile(tile);

    for (idx, entry) in tiles.iter().enumerate() {
        let row = idx as u32 / cols;
        let col = idx as u32 % cols;
        let x = (col * tile.width) as i64;
        let y = (row * tile.height) as i64;

        match entry {
            Some(img) if img.dimensions() == (tile.width, tile.height) => {
                imageops::replace(&mut grid, img, x, y);
            }
            Some(img) => {
                let resized = imageops::resize(img, tile.width, tile.height, FilterType::Triangle);
                imageops::replace(&mut grid, &resized, x, y);
            }
            None => imageops::replace(&mut grid, &placeholder, x, y),
        }
    }

    Ok(grid)
}
