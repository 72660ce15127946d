use super::{RunSummary, ViewerError};
use crate::annotation::{self, AnnotationError, AnnotationFile, SingleCameraRecord};
use crate::camera::Resolution;
use crate::geometry::{flip_vertical, parse_point2};
use crate::util::{self, MarkerShape, Overlay, OverlayLayer, Renderer, BLUE};
use log::{info, warn};
use std::path::{Path, PathBuf};

pub const IRIS_LAYER: &str = "2D Iris Points";

/// Overlays the iris landmarks of a single-camera dataset (`<N>.json` + `<N>.jpg`).
#[derive(Debug, Clone)]
pub struct LandmarkViewer {
    dataset_dir: PathBuf,
    resolution: Resolution,
}

impl LandmarkViewer {
    /// Creates a viewer over a dataset folder.
    ///
    /// # Arguments
    ///
    /// * `dataset_dir` - Folder holding `<N>.json` and `<N>.jpg`.
    /// * `resolution` - Rendered image size; its height is used to flip the
    ///   landmarks into image space.
    pub fn new(dataset_dir: &Path, resolution: Resolution) -> Self {
        LandmarkViewer {
            dataset_dir: dataset_dir.to_path_buf(),
            resolution,
        }
    }

    /// Builds the overlay of one record and returns it with its image path.
    ///
    /// # Arguments
    ///
    /// * `file` - Record to load, as listed by [`annotation::list_annotation_files`].
    ///
    /// # Return Value
    ///
    /// The overlay, named after the record number, and the path of `<N>.jpg`.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::Json`] if the record cannot be decoded.
    /// * [`AnnotationError::Parse`] if a landmark is malformed.
    /// * [`AnnotationError::MissingFile`] if `<N>.jpg` does not exist.
    pub fn build_overlay(&self, file: &AnnotationFile) -> Result<(Overlay, PathBuf), AnnotationError> {
        let record: SingleCameraRecord = file.load()?;

        let height = self.resolution.height as f64;
        let iris_points = record
            .iris_2d
            .iter()
            .map(|s| parse_point2(s).map(|p| flip_vertical(&p, height)))
            .collect::<Result<Vec<_>, _>>()?;

        let image_path = annotation::require_file(file.image_path(&self.dataset_dir))?;

        let mut layers = Vec::new();
        if iris_points.is_empty() {
            warn!("No iris points found in {}.", file.file_name());
        } else {
            layers.push(OverlayLayer::new(
                IRIS_LAYER,
                BLUE,
                MarkerShape::Dot { radius: 2 },
                iris_points,
            ));
        }

        let overlay = Overlay {
            name: file.stem.clone(),
            title: format!("Image {}", file.stem),
            canvas: self.resolution,
            layers,
        };

        Ok((overlay, image_path))
    }

    /// Renders every record of the dataset in numeric order.
    ///
    /// Records that cannot be decoded or lack their image are logged and skipped.
    ///
    /// # Arguments
    ///
    /// * `renderer` - Receives one overlay per record, drawn on its image.
    ///
    /// # Return Value
    ///
    /// Counts of rendered and skipped records.
    ///
    /// # Errors
    ///
    /// * [`ViewerError::Annotation`] if the dataset folder cannot be listed.
    /// * [`ViewerError::Render`] if the renderer fails.
    pub fn run(&self, renderer: &mut dyn Renderer) -> Result<RunSummary, ViewerError> {
        let mut summary = RunSummary::default();

        for file in annotation::list_annotation_files(&self.dataset_dir)? {
            let (overlay, image_path) = match self.build_overlay(&file) {
                Ok(built) => built,
                Err(e) => {
                    warn!("Skipping {}: {e}", file.file_name());
                    summary.skipped += 1;
                    continue;
                }
            };

            let image = match util::load_image(&image_path) {
                Ok(image) => image,
                Err(e) => {
                    warn!("Skipping {}: {e}", file.file_name());
                    summary.skipped += 1;
                    continue;
                }
            };

            renderer.render(&overlay, Some(&image))?;
            summary.rendered += 1;
        }

        info!("Landmark viewer: {summary}");
        Ok(summary)
    }
}
