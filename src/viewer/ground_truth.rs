use super::{RunSummary, ViewerError};
use crate::annotation::{
    self, AnnotationError, AnnotationFile, CameraAnnotation, GroundTruth, MultiCameraRecord,
};
use crate::camera::PinholeModel;
use crate::geometry::{flip_vertical, gaze_endpoint, parse_direction3, parse_point2, parse_point3};
use crate::util::{self, MarkerShape, Overlay, OverlayLayer, Renderer, BLUE, GREEN, MAGENTA, RED};
use log::{debug, info, warn};
use nalgebra::{Point2, Point3};
use std::path::{Path, PathBuf};

pub const IRIS_LAYER: &str = "Iris Points";
pub const IRIS_CENTER_LAYER: &str = "GT Iris Center";
pub const GAZE_ENDPOINT_LAYER: &str = "GT Gaze Endpoint";
pub const EYE_CENTER_LAYER: &str = "GT Eye Center";

/// Overlays landmarks and projected ground truth of a multi-camera dataset
/// (`<N>.json` + `<N>_<camera>.jpg`).
#[derive(Debug, Clone)]
pub struct GroundTruthViewer {
    dataset_dir: PathBuf,
    camera: PinholeModel,
    records: Vec<u64>,
}

impl GroundTruthViewer {
    /// Creates a viewer over every record of a dataset folder.
    ///
    /// # Arguments
    ///
    /// * `dataset_dir` - Folder holding `<N>.json` and `<N>_<camera>.jpg`.
    /// * `camera` - Pinhole camera used to project the ground truth; its
    ///   resolution height also flips the raw landmarks.
    pub fn new(dataset_dir: &Path, camera: PinholeModel) -> Self {
        GroundTruthViewer {
            dataset_dir: dataset_dir.to_path_buf(),
            camera,
            records: Vec::new(),
        }
    }

    /// Restricts the run to the given record numbers. Empty means all records.
    pub fn with_records(mut self, records: Vec<u64>) -> Self {
        self.records = records;
        self
    }

    fn selected(&self, file: &AnnotationFile) -> bool {
        self.records.is_empty() || self.records.contains(&file.index)
    }

    fn project_logged(&self, label: &str, camera_name: &str, point: &Point3<f64>) -> Point2<f64> {
        let pixel = self.camera.project(point);
        if !self.camera.contains(&pixel) {
            debug!(
                "{camera_name}: {label} projects outside the image at ({:.1}, {:.1})",
                pixel.x, pixel.y
            );
        }
        pixel
    }

    /// Builds the overlay of one camera of a record.
    ///
    /// Raw `iris_2d` landmarks are flipped into image space, ground-truth
    /// points are projected with the pinhole camera and left as they are.
    /// The gaze direction may be written in homogeneous form `(x, y, z, 0)`.
    ///
    /// # Arguments
    ///
    /// * `file` - Record the camera belongs to.
    /// * `camera_name` - Key of the camera in the record, e.g. `cam_1`.
    /// * `annotation` - Landmarks and ground truth of that camera.
    ///
    /// # Return Value
    ///
    /// The overlay, named `<N>_<camera>`, and the path of the matching image.
    ///
    /// # Errors
    ///
    /// * [`AnnotationError::InvalidCameraName`] if the camera name is not a plain file name part.
    /// * [`AnnotationError::Parse`] if a coordinate is malformed.
    /// * [`AnnotationError::MissingField`] if `iris_center` or the gaze direction is absent.
    /// * [`AnnotationError::MissingFile`] if `<N>_<camera>.jpg` does not exist.
    pub fn build_camera_overlay(
        &self,
        file: &AnnotationFile,
        camera_name: &str,
        annotation: &CameraAnnotation,
    ) -> Result<(Overlay, PathBuf), AnnotationError> {
        let camera_name = annotation::validate_camera_name(camera_name)?;

        let raw_iris = annotation
            .iris_2d
            .iter()
            .map(|s| parse_point2(s))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(first) = raw_iris.first() {
            debug!("First iris point for {camera_name}: ({}, {})", first.x, first.y);
        }

        let gt = &annotation.ground_truth;
        let iris_center_str =
            GroundTruth::require(gt.iris_center.as_deref(), camera_name, "iris_center")?;
        let gaze_vector_str = GroundTruth::require(gt.gaze_direction(), camera_name, "gaze_vector")?;

        let iris_center = parse_point3(iris_center_str)?;
        let gaze_vector = parse_direction3(gaze_vector_str)?;
        let endpoint = gaze_endpoint(&iris_center, &gaze_vector);

        let proj_center = self.project_logged(IRIS_CENTER_LAYER, camera_name, &iris_center);
        let proj_endpoint = self.project_logged(GAZE_ENDPOINT_LAYER, camera_name, &endpoint);
        let proj_eye_center = match gt.eye_center.as_deref() {
            Some(s) => Some(self.project_logged(EYE_CENTER_LAYER, camera_name, &parse_point3(s)?)),
            None => None,
        };

        let height = self.camera.resolution.height as f64;
        let iris_points = raw_iris
            .iter()
            .map(|p| flip_vertical(p, height))
            .collect();

        let image_path =
            annotation::require_file(file.camera_image_path(&self.dataset_dir, camera_name))?;

        let mut layers = vec![
            OverlayLayer::new(IRIS_LAYER, BLUE, MarkerShape::Dot { radius: 2 }, iris_points),
            OverlayLayer::new(
                IRIS_CENTER_LAYER,
                RED,
                MarkerShape::Star { size: 7 },
                vec![proj_center],
            ),
            OverlayLayer::new(
                GAZE_ENDPOINT_LAYER,
                GREEN,
                MarkerShape::Dot { radius: 4 },
                vec![proj_endpoint],
            ),
        ];
        if let Some(eye_center) = proj_eye_center {
            layers.push(OverlayLayer::new(
                EYE_CENTER_LAYER,
                MAGENTA,
                MarkerShape::Dot { radius: 4 },
                vec![eye_center],
            ));
        }

        let overlay = Overlay {
            name: format!("{}_{}", file.stem, camera_name),
            title: format!("{} - Image {}", camera_name, file.stem),
            canvas: self.camera.resolution,
            layers,
        };

        Ok((overlay, image_path))
    }

    /// Renders every selected record, camera by camera.
    ///
    /// Cameras with malformed or missing data, or without an image, are logged
    /// and skipped.
    ///
    /// # Arguments
    ///
    /// * `renderer` - Receives one overlay per camera, drawn on its image.
    ///
    /// # Return Value
    ///
    /// Counts of rendered and skipped cameras, plus whole records whose JSON
    /// is unreadable.
    ///
    /// # Errors
    ///
    /// * [`ViewerError::Annotation`] if the dataset folder cannot be listed.
    /// * [`ViewerError::Render`] if the renderer fails.
    pub fn run(&self, renderer: &mut dyn Renderer) -> Result<RunSummary, ViewerError> {
        let mut summary = RunSummary::default();

        for file in annotation::list_annotation_files(&self.dataset_dir)? {
            if !self.selected(&file) {
                continue;
            }

            let record: MultiCameraRecord = match file.load() {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping {}: {e}", file.file_name());
                    summary.skipped += 1;
                    continue;
                }
            };

            for (camera_name, annotation) in &record.cameras {
                info!(
                    "Processing JSON file {} for camera {camera_name}...",
                    file.file_name()
                );

                let (overlay, image_path) =
                    match self.build_camera_overlay(&file, camera_name, annotation) {
                        Ok(built) => built,
                        Err(e) => {
                            warn!("Skipping {camera_name} in {}: {e}", file.file_name());
                            summary.skipped += 1;
                            continue;
                        }
                    };

                let image = match util::load_image(&image_path) {
                    Ok(image) => image,
                    Err(e) => {
                        warn!("Skipping {camera_name} in {}: {e}", file.file_name());
                        summary.skipped += 1;
                        continue;
                    }
                };

                renderer.render(&overlay, Some(&image))?;
                summary.rendered += 1;
            }
        }

        info!("Ground-truth viewer: {summary}");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{project, Resolution};
    use crate::geometry::VectorParseError;
    use crate::viewer::test_support::{write_image, RecordingRenderer};
    use approx::assert_abs_diff_eq;
    use image::Rgb;
    use std::fs;

    fn vga_camera() -> PinholeModel {
        PinholeModel::from_vertical_fov(
            Resolution {
                width: 640,
                height: 480,
            },
            44.61998,
        )
        .unwrap()
    }

    const RECORD_136: &str = r#"{
        "cameras": {
            "cam_2": {
                "iris_2d": ["(100, 50, 3)", "(110, 55, 3)"],
                "ground_truth": {
                    "iris_center": "(1.0, 2.0, 40.0)",
                    "gaze_vector": "(0.0, 0.0, -10.0)",
                    "eye_center": "(0.0, 0.0, 50.0)"
                }
            },
            "cam_1": {
                "iris_2d": ["(10, 20)"],
                "ground_truth": {
                    "gaze_vector": "(0.0, 0.0, -1.0)"
                }
            }
        }
    }"#;

    fn write_dataset(dir: &Path) {
        fs::write(dir.join("136.json"), RECORD_136).unwrap();
        fs::write(
            dir.join("137.json"),
            r#"{"cameras": {"cam_2": {"ground_truth": {"iris_center": "(0, 0, 1)", "gaze_vector": "(0, 0, 1)"}}}}"#,
        )
        .unwrap();
        write_image(&dir.join("136_cam_1.jpg"), 8, 6, Rgb([0, 0, 0]));
        write_image(&dir.join("136_cam_2.jpg"), 8, 6, Rgb([0, 0, 0]));
        write_image(&dir.join("137_cam_2.jpg"), 8, 6, Rgb([0, 0, 0]));
    }

    #[test]
    fn test_projects_ground_truth_without_flipping() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());
        let camera = vga_camera();

        let mut renderer = RecordingRenderer::default();
        let summary = GroundTruthViewer::new(dir.path(), camera.clone())
            .with_records(vec![136])
            .run(&mut renderer)
            .unwrap();

        // cam_1 lacks iris_center
        assert_eq!(summary, RunSummary { rendered: 1, skipped: 1 });
        let (overlay, _) = &renderer.overlays[0];
        assert_eq!(overlay.name, "136_cam_2");
        assert_eq!(overlay.title, "cam_2 - Image 136");

        let iris = &overlay.layer(IRIS_LAYER).unwrap().points;
        assert_eq!(iris, &vec![Point2::new(100.0, 430.0), Point2::new(110.0, 425.0)]);

        let center = overlay.layer(IRIS_CENTER_LAYER).unwrap().points[0];
        let expected = project(&Point3::new(1.0, 2.0, 40.0), &camera.intrinsics);
        assert_eq!(center, expected);
        assert!(center.y > camera.intrinsics.cy);

        let endpoint = overlay.layer(GAZE_ENDPOINT_LAYER).unwrap().points[0];
        let f = camera.intrinsics.focal_length;
        assert_abs_diff_eq!(endpoint.x, f * (1.0 / 30.0) + 320.0, epsilon = 1e-9);
        assert_abs_diff_eq!(endpoint.y, f * (2.0 / 30.0) + 240.0, epsilon = 1e-9);

        let eye_center = overlay.layer(EYE_CENTER_LAYER).unwrap().points[0];
        assert_eq!(eye_center, Point2::new(320.0, 240.0));
    }

    #[test]
    fn test_without_filter_all_records_are_processed() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(dir.path());

        let mut renderer = RecordingRenderer::default();
        let summary = GroundTruthViewer::new(dir.path(), vga_camera())
            .run(&mut renderer)
            .unwrap();

        assert_eq!(summary, RunSummary { rendered: 2, skipped: 1 });
        let names: Vec<_> = renderer.overlays.iter().map(|(o, _)| o.name.as_str()).collect();
        assert_eq!(names, vec!["136_cam_2", "137_cam_2"]);
        // no eye_center in 137
        assert!(renderer.overlays[1].0.layer(EYE_CENTER_LAYER).is_none());
    }

    #[test]
    fn test_zero_depth_ground_truth_is_rendered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("5.json"),
            r#"{"cameras": {"cam_1": {"ground_truth": {"iris_center": "(1, 1, 0)", "gaze_vector": "(0, 0, 0)"}}}}"#,
        )
        .unwrap();
        write_image(&dir.path().join("5_cam_1.jpg"), 8, 6, Rgb([0, 0, 0]));

        let mut renderer = RecordingRenderer::default();
        let summary = GroundTruthViewer::new(dir.path(), vga_camera())
            .run(&mut renderer)
            .unwrap();

        assert_eq!(summary.rendered, 1);
        let center = renderer.overlays[0].0.layer(IRIS_CENTER_LAYER).unwrap().points[0];
        assert!(center.x.is_finite() && center.y.is_finite());
    }

    #[test]
    fn test_homogeneous_gaze_vec_is_rendered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("1.json"),
            r#"{"cameras": {"cam_1": {"ground_truth": {"iris_center": "(0.1,0.2,3.0)", "gaze_vec": "(0.1,0.2,-0.9,0.0)"}}}}"#,
        )
        .unwrap();
        write_image(&dir.path().join("1_cam_1.jpg"), 8, 6, Rgb([0, 0, 0]));
        let camera = vga_camera();

        let mut renderer = RecordingRenderer::default();
        let summary = GroundTruthViewer::new(dir.path(), camera.clone())
            .run(&mut renderer)
            .unwrap();

        assert_eq!(summary, RunSummary { rendered: 1, skipped: 0 });
        let endpoint = renderer.overlays[0].0.layer(GAZE_ENDPOINT_LAYER).unwrap().points[0];
        let expected = project(&Point3::new(0.2, 0.4, 2.1), &camera.intrinsics);
        assert_abs_diff_eq!(endpoint.x, expected.x, epsilon = 1e-9);
        assert_abs_diff_eq!(endpoint.y, expected.y, epsilon = 1e-9);
    }

    #[test]
    fn test_camera_name_cannot_leave_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("imgs");
        fs::create_dir(&dataset).unwrap();
        fs::write(
            dataset.join("1.json"),
            r#"{"cameras": {"../x": {"ground_truth": {"iris_center": "(0, 0, 1)", "gaze_vector": "(0, 0, 1)"}}}}"#,
        )
        .unwrap();
        // would be picked up as imgs/1_../x.jpg
        fs::create_dir(dataset.join("1_..")).unwrap();
        write_image(&dataset.join("1_..").join("x.jpg"), 8, 6, Rgb([0, 0, 0]));

        let mut renderer = RecordingRenderer::default();
        let summary = GroundTruthViewer::new(&dataset, vga_camera())
            .run(&mut renderer)
            .unwrap();

        assert_eq!(summary, RunSummary { rendered: 0, skipped: 1 });
        assert!(renderer.overlays.is_empty());

        let file = annotation::list_annotation_files(&dataset).unwrap().remove(0);
        let mut camera = CameraAnnotation::default();
        camera.ground_truth.iris_center = Some("(0, 0, 1)".to_string());
        camera.ground_truth.gaze_vector = Some("(0, 0, 1)".to_string());
        assert!(matches!(
            GroundTruthViewer::new(&dataset, vga_camera()).build_camera_overlay(&file, "../x", &camera),
            Err(AnnotationError::InvalidCameraName(_))
        ));
    }

    #[test]
    fn test_build_camera_overlay_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("9.json"), "{}").unwrap();
        let file = annotation::list_annotation_files(dir.path()).unwrap().remove(0);
        let viewer = GroundTruthViewer::new(dir.path(), vga_camera());

        let mut annotation = CameraAnnotation::default();
        annotation.ground_truth.iris_center = Some("(0, 0, 1)".to_string());
        assert!(matches!(
            viewer.build_camera_overlay(&file, "cam_1", &annotation),
            Err(AnnotationError::MissingField { field: "gaze_vector", .. })
        ));

        annotation.ground_truth.gaze_vector = Some("(0, 1)".to_string());
        assert!(matches!(
            viewer.build_camera_overlay(&file, "cam_1", &annotation),
            Err(AnnotationError::Parse(_))
        ));

        // a homogeneous point is not a direction
        annotation.ground_truth.gaze_vector = Some("(0, 0, 1, 1)".to_string());
        assert!(matches!(
            viewer.build_camera_overlay(&file, "cam_1", &annotation),
            Err(AnnotationError::Parse(VectorParseError::NotADirection(_)))
        ));

        annotation.ground_truth.gaze_vector = Some("(0, 0, 1)".to_string());
        assert!(matches!(
            viewer.build_camera_overlay(&file, "cam_1", &annotation),
            Err(AnnotationError::MissingFile(_))
        ));
    }
}
