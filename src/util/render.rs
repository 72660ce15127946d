use super::font::{self, GLYPH_HEIGHT};
use super::{ensure_output_dir, MarkerShape, Overlay, Renderer, UtilError};
use image::imageops;
use image::{Rgb, RgbImage};
use log::{debug, info};
use nalgebra::Point2;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

pub(super) const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const HEADER_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
/// Font pixel size of titles and legends.
pub(super) const TEXT_SCALE: u32 = 2;
/// Margin around text, also the gap between header lines.
pub(super) const TEXT_PADDING: u32 = 4;

pub(super) fn put_clipped(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && x < img.width() as i32 && y >= 0 && y < img.height() as i32 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Pixel center of a marker, `None` for non-finite coordinates.
fn marker_center(point: &Point2<f64>) -> Option<(i32, i32)> {
    if point.x.is_finite() && point.y.is_finite() {
        Some((point.x.round() as i32, point.y.round() as i32))
    } else {
        None
    }
}

/// Draws a filled disc; pixels outside the image are skipped.
pub fn draw_dot(img: &mut RgbImage, center: &Point2<f64>, radius: i32, color: Rgb<u8>) {
    let Some((center_x, center_y)) = marker_center(center) else {
        return;
    };

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_clipped(img, center_x.saturating_add(dx), center_y.saturating_add(dy), color);
            }
        }
    }
}

/// Draws a star made of a plus and a diagonal cross.
pub fn draw_star(img: &mut RgbImage, center: &Point2<f64>, size: i32, color: Rgb<u8>) {
    let Some((center_x, center_y)) = marker_center(center) else {
        return;
    };

    for d in -size..=size {
        let x = center_x.saturating_add(d);
        put_clipped(img, x, center_y, color);
        put_clipped(img, center_x, center_y.saturating_add(d), color);
        put_clipped(img, x, center_y.saturating_add(d), color);
        put_clipped(img, x, center_y.saturating_sub(d), color);
    }
}

/// Draws every layer of `overlay` onto `img` in layer order.
pub fn draw_overlay(img: &mut RgbImage, overlay: &Overlay) {
    for layer in &overlay.layers {
        for point in &layer.points {
            match layer.shape {
                MarkerShape::Dot { radius } => draw_dot(img, point, radius, layer.color),
                MarkerShape::Star { size } => draw_star(img, point, size, layer.color),
            }
        }
    }
}

fn header_line_height() -> u32 {
    GLYPH_HEIGHT * TEXT_SCALE + TEXT_PADDING
}

/// Height of the band holding the title and one legend line per layer.
pub fn header_height(overlay: &Overlay) -> u32 {
    TEXT_PADDING + (1 + overlay.layers.len() as u32) * header_line_height()
}

/// Stacks a white header with the title and legend on top of `img`.
///
/// Each legend line is a swatch in the layer color followed by its label.
pub fn add_header(img: &RgbImage, overlay: &Overlay) -> RgbImage {
    let header = header_height(overlay);
    let mut canvas = RgbImage::from_pixel(img.width(), img.height() + header, HEADER_BACKGROUND);
    imageops::replace(&mut canvas, img, 0, header as i64);

    let pad = TEXT_PADDING as i32;
    let line = header_line_height() as i32;
    let swatch = (GLYPH_HEIGHT * TEXT_SCALE) as i32;
    font::draw_text(&mut canvas, pad, pad, &overlay.title, TEXT_COLOR, TEXT_SCALE);

    for (i, layer) in overlay.layers.iter().enumerate() {
        let y = pad + (i as i32 + 1) * line;
        for dy in 0..swatch {
            for dx in 0..swatch {
                put_clipped(&mut canvas, pad + dx, y + dy, layer.color);
            }
        }
        font::draw_text(
            &mut canvas,
            pad + swatch + pad,
            y,
            &layer.label,
            TEXT_COLOR,
            TEXT_SCALE,
        );
    }
    canvas
}

/// Replaces path separators so a name always stays inside the output directory.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match stem.as_str() {
        "" | "." | ".." => stem.replace('.', "_") + "_",
        _ => stem,
    }
}

/// Writes `<output_dir>/<name>.png` for every overlay.
///
/// The markers are drawn on the image, below a header holding the overlay
/// title and a legend line per layer.
pub struct PngRenderer {
    output_dir: PathBuf,
}

impl PngRenderer {
    /// Creates the renderer, creating `output_dir` if needed.
    ///
    /// # Errors
    ///
    /// [`UtilError::InvalidParams`] if the directory cannot be created.
    pub fn new(output_dir: &Path) -> Result<Self, UtilError> {
        ensure_output_dir(output_dir)?;
        Ok(PngRenderer {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Path of the PNG written for `name`. Path separators in `name` are
    /// replaced by `_`.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}.png", file_stem(name)))
    }

    fn save(&self, name: &str, image: &RgbImage) -> Result<(), UtilError> {
        let path = self.output_path(name);
        image.save(&path).map_err(|e| {
            UtilError::ImageError(format!("Failed to save {}: {e}", path.display()))
        })?;
        info!("Saved {}", path.display());
        Ok(())
    }
}

impl Renderer for PngRenderer {
    fn render(&mut self, overlay: &Overlay, image: Option<&RgbImage>) -> Result<(), UtilError> {
        let mut canvas = match image {
            Some(img) => img.clone(),
            None => RgbImage::new(overlay.canvas.width, overlay.canvas.height),
        };
        draw_overlay(&mut canvas, overlay);
        let canvas = add_header(&canvas, overlay);

        for layer in &overlay.layers {
            debug!(
                "{}: {} x {} ({:?})",
                overlay.title,
                layer.label,
                layer.points.len(),
                layer.color
            );
        }

        self.save(&overlay.name, &canvas)
    }

    fn render_image(&mut self, name: &str, image: &RgbImage) -> Result<(), UtilError> {
        self.save(name, image)
    }
}

#[derive(Debug, Serialize)]
struct PointRow<'a> {
    overlay: &'a str,
    label: &'a str,
    u: f64,
    v: f64,
}

/// Appends the marker coordinates of every overlay to one CSV file.
///
/// Columns are `overlay,label,u,v`. Composed images are ignored.
pub struct CsvRenderer {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl CsvRenderer {
    /// Creates (or truncates) the CSV file; the header row comes with the first overlay.
    ///
    /// # Errors
    ///
    /// * [`UtilError::InvalidParams`] if the parent directory cannot be created.
    /// * [`UtilError::CsvError`] if the file cannot be opened.
    pub fn new(path: &Path) -> Result<Self, UtilError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_output_dir(parent)?;
        }
        let writer = csv::Writer::from_path(path)?;
        Ok(CsvRenderer {
            writer,
            path: path.to_path_buf(),
        })
    }
}

impl Renderer for CsvRenderer {
    fn render(&mut self, overlay: &Overlay, _image: Option<&RgbImage>) -> Result<(), UtilError> {
        for layer in &overlay.layers {
            for point in &layer.points {
                self.writer.serialize(PointRow {
                    overlay: &overlay.name,
                    label: &layer.label,
                    u: point.x,
                    v: point.y,
                })?;
            }
        }
        self.writer.flush()?;
        debug!("Appended {} to {}", overlay.name, self.path.display());
        Ok(())
    }

    fn render_image(&mut self, name: &str, _image: &RgbImage) -> Result<(), UtilError> {
        debug!("CSV output has no place for image {name}, skipping");
        Ok(())
    }
}
