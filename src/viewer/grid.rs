use super::{RunSummary, ViewerError};
use crate::camera::Resolution;
use crate::util::{self, Renderer};
use image::RgbImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

pub const X_AXIS_LABEL: &str = "Camera number";
pub const Y_AXIS_LABEL: &str = "Sample number";

/// Contact sheet of `<sample>_<prefix><camera>.jpg` images.
///
/// Rows are samples (top to bottom), columns are cameras (left to right).
/// Missing images become a placeholder tile.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    dataset_dir: PathBuf,
    pub samples: Vec<u64>,
    pub cameras: Vec<u64>,
    pub camera_prefix: String,
    /// Tile size; defaults to the size of the first image found.
    pub tile: Option<Resolution>,
    /// Tile size used when no image is found at all.
    pub fallback_tile: Resolution,
}

impl SampleGrid {
    /// Samples 5 to 8 of cameras `cam_1` to `cam_4`.
    ///
    /// # Arguments
    ///
    /// * `dataset_dir` - Folder holding the sample images.
    /// * `fallback_tile` - Tile size used when no image is found at all.
    pub fn new(dataset_dir: &Path, fallback_tile: Resolution) -> Self {
        SampleGrid {
            dataset_dir: dataset_dir.to_path_buf(),
            samples: (5..=8).collect(),
            cameras: (1..=4).collect(),
            camera_prefix: "cam_".to_string(),
            tile: None,
            fallback_tile,
        }
    }

    /// `<dataset>/<sample>_<prefix><camera>.jpg`, e.g. `imgs/5_cam_3.jpg`.
    pub fn tile_path(&self, sample: u64, camera: u64) -> PathBuf {
        self.dataset_dir
            .join(format!("{sample}_{}{camera}.jpg", self.camera_prefix))
    }

    /// Loads every tile, `None` where the image is missing or unreadable.
    pub fn load_tiles(&self) -> Vec<Option<RgbImage>> {
        let mut tiles = Vec::with_capacity(self.samples.len() * self.cameras.len());
        for &sample in &self.samples {
            for &camera in &self.cameras {
                let path = self.tile_path(sample, camera);
                debug!("Checking {}...", path.display());
                let tile = if path.is_file() {
                    match util::load_image(&path) {
                        Ok(img) => Some(img),
                        Err(e) => {
                            warn!("{e}");
                            None
                        }
                    }
                } else {
                    None
                };
                tiles.push(tile);
            }
        }
        tiles
    }

    /// Composes the grid, labels its axes and renders it under the name `grid`.
    ///
    /// # Return Value
    ///
    /// Found tiles count as rendered, missing or unreadable ones as skipped.
    ///
    /// # Errors
    ///
    /// * [`ViewerError::Render`] if the grid is empty (no samples or cameras)
    ///   or the renderer fails.
    pub fn run(&self, renderer: &mut dyn Renderer) -> Result<RunSummary, ViewerError> {
        let tiles = self.load_tiles();

        let tile = self.tile.unwrap_or_else(|| {
            tiles
                .iter()
                .flatten()
                .next()
                .map(|img| Resolution {
                    width: img.width(),
                    height: img.height(),
                })
                .unwrap_or(self.fallback_tile)
        });

        let found = tiles.iter().filter(|t| t.is_some()).count();
        let summary = RunSummary {
            rendered: found,
            skipped: tiles.len() - found,
        };

        let grid = util::compose_grid(
            &tiles,
            self.samples.len() as u32,
            self.cameras.len() as u32,
            tile,
        )?;
        let grid = util::label_grid_axes(&grid, X_AXIS_LABEL, Y_AXIS_LABEL);
        renderer.render_image("grid", &grid)?;

        info!("Sample grid: {summary}");
        Ok(summary)
    }
}
