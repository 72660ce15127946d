//! Annotation files of the gaze datasets.
//!
//! A dataset folder holds numbered JSON records (`1.json`, `2.json`, ...) next
//! to the rendered images. Single-camera datasets name the image `<N>.jpg`,
//! multi-camera datasets `<N>_<camera>.jpg`. All coordinates inside the records
//! are tuple strings, parsed with [`crate::geometry::parse_vector`].

use crate::geometry::VectorParseError;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum AnnotationError {
    #[error("File not found: {0}")]
    MissingFile(PathBuf),
    #[error("Camera name {0:?} cannot be used in a file name")]
    InvalidCameraName(String),
    #[error("Missing ground truth field '{field}' for camera {camera}")]
    MissingField { camera: String, field: &'static str },
    #[error("Parse error: {0}")]
    Parse(#[from] VectorParseError),
    #[error("Failed to decode JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

/// Record of a single-camera dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SingleCameraRecord {
    #[serde(default)]
    pub iris_2d: Vec<String>,
}

/// Record of a multi-camera dataset, keyed by camera name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiCameraRecord {
    #[serde(default)]
    pub cameras: BTreeMap<String, CameraAnnotation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CameraAnnotation {
    #[serde(default)]
    pub iris_2d: Vec<String>,
    #[serde(default)]
    pub ground_truth: GroundTruth,
}

/// Ground-truth eye state in camera space. Every field is optional.
///
/// The dataset generator writes the gaze direction as `gaze_vec`, older
/// records use `gaze_vector`. Both are kept as separate fields so a record
/// carrying both still decodes; [`GroundTruth::gaze_direction`] picks one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundTruth {
    pub iris_center: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze_vector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gaze_vec: Option<String>,
    pub eye_center: Option<String>,
}

impl GroundTruth {
    /// Gaze direction string, `gaze_vector` taking precedence over `gaze_vec`.
    pub fn gaze_direction(&self) -> Option<&str> {
        self.gaze_vector.as_deref().or(self.gaze_vec.as_deref())
    }

    /// Returns a required field or [`AnnotationError::MissingField`].
    ///
    /// # Arguments
    ///
    /// * `field` - Field value, usually `gt.iris_center.as_deref()`.
    /// * `camera` - Camera name, reported in the error.
    /// * `name` - Field name, reported in the error.
    ///
    /// # Errors
    ///
    /// [`AnnotationError::MissingField`] if `field` is `None`.
    pub fn require<'a>(
        field: Option<&'a str>,
        camera: &str,
        name: &'static str,
    ) -> Result<&'a str, AnnotationError> {
        field.ok_or_else(|| AnnotationError::MissingField {
            camera: camera.to_string(),
            field: name,
        })
    }
}

/// Checks that a camera name taken from a record is a plain file name part.
///
/// Camera names end up in image and output file names, so anything that could
/// leave the dataset or output directory is refused.
///
/// # Errors
///
/// [`AnnotationError::InvalidCameraName`] if the name is empty, `.` or `..`,
/// or contains a path separator or a NUL byte.
pub fn validate_camera_name(name: &str) -> Result<&str, AnnotationError> {
    let forbidden = |c: char| c == '/' || c == '\\' || c == '\0';
    if name.is_empty() || name == "." || name == ".." || name.contains(forbidden) {
        return Err(AnnotationError::InvalidCameraName(name.to_string()));
    }
    Ok(name)
}

/// A numbered annotation file found in a dataset folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationFile {
    /// Numeric value of the file stem, used for ordering.
    pub index: u64,
    /// File stem exactly as written, e.g. `"007"`; image names reuse it.
    pub stem: String,
    pub path: PathBuf,
}

impl AnnotationFile {
    /// Decodes the JSON record.
    pub fn load<T: DeserializeOwned>(&self) -> Result<T, AnnotationError> {
        let contents = fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents).map_err(|source| AnnotationError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// `<dir>/<N>.jpg`
    pub fn image_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.jpg", self.stem))
    }

    /// `<dir>/<N>_<camera>.jpg`
    pub fn camera_image_path(&self, dir: &Path, camera: &str) -> PathBuf {
        dir.join(format!("{}_{}.jpg", self.stem, camera))
    }

    /// Name of the JSON file, used in log messages.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.stem)
    }
}

/// Returns the stem of `<digits>.json`, or `None` for any other name.
fn numbered_json_stem(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".json")?;
    if !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()) {
        Some(stem)
    } else {
        None
    }
}

/// Lists the `<N>.json` files of a dataset folder, sorted by `N`.
///
/// Other files are ignored. Stems that compare equal numerically (`7` and
/// `007`) are ordered by their text.
///
/// # Errors
///
/// Propagates the IO error if the directory cannot be read.
pub fn list_annotation_files(dir: &Path) -> Result<Vec<AnnotationFile>, AnnotationError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(stem) = numbered_json_stem(file_name) else {
            continue;
        };
        let Ok(index) = stem.parse::<u64>() else {
            warn!("Ignoring {file_name}: record number does not fit in 64 bits");
            continue;
        };
        files.push(AnnotationFile {
            index,
            stem: stem.to_string(),
            path: entry.path(),
        });
    }

    files.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.stem.cmp(&b.stem)));
    debug!("Found {} annotation files in {}", files.len(), dir.display());

    Ok(files)
}

/// Returns `path` if it exists, [`AnnotationError::MissingFile`] otherwise.
pub fn require_file(path: PathBuf) -> Result<PathBuf, AnnotationError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(AnnotationError::MissingFile(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_json_stem() {
        assert_eq!(numbered_json_stem("136.json"), Some("136"));
        assert_eq!(numbered_json_stem("007.json"), Some("007"));
        assert_eq!(numbered_json_stem(".json"), None);
        assert_eq!(numbered_json_stem("1a.json"), None);
        assert_eq!(numbered_json_stem("1.jpg"), None);
        assert_eq!(numbered_json_stem("-1.json"), None);
        assert_eq!(numbered_json_stem("1.json.bak"), None);
    }

    #[test]
    fn test_list_annotation_files_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10.json", "2.json", "1.json", "1.jpg", "notes.json", "3_cam_1.jpg"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }

        let files = list_annotation_files(dir.path()).unwrap();
        let stems: Vec<_> = files.iter().map(|f| f.stem.as_str()).collect();
        assert_eq!(stems, vec!["1", "2", "10"]);
        assert_eq!(files[2].index, 10);
    }

    #[test]
    fn test_list_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            list_annotation_files(&missing),
            Err(AnnotationError::IOError(_))
        ));
    }

    #[test]
    fn test_image_paths_keep_stem() {
        let file = AnnotationFile {
            index: 7,
            stem: "007".to_string(),
            path: PathBuf::from("imgs/007.json"),
        };
        let dir = Path::new("imgs");
        assert_eq!(file.image_path(dir), PathBuf::from("imgs/007.jpg"));
        assert_eq!(
            file.camera_image_path(dir, "cam_2"),
            PathBuf::from("imgs/007_cam_2.jpg")
        );
    }

    #[test]
    fn test_decode_multi_camera_record() {
        let json = r#"{
            "cameras": {
                "cam_1": {
                    "iris_2d": ["(1, 2)", "(3, 4)"],
                    "ground_truth": {
                        "iris_center": "(0.0, 0.0, 10.0)",
                        "gaze_vec": "(0.0, 0.0, -1.0)"
                    }
                },
                "cam_0": {}
            }
        }"#;
        let record: MultiCameraRecord = serde_json::from_str(json).unwrap();
        let names: Vec<_> = record.cameras.keys().cloned().collect();
        assert_eq!(names, vec!["cam_0", "cam_1"]);

        let cam = &record.cameras["cam_1"];
        assert_eq!(cam.iris_2d.len(), 2);
        assert_eq!(cam.ground_truth.gaze_direction(), Some("(0.0, 0.0, -1.0)"));
        assert!(cam.ground_truth.eye_center.is_none());

        let empty = &record.cameras["cam_0"];
        assert!(empty.iris_2d.is_empty());
        assert!(matches!(
            GroundTruth::require(
                empty.ground_truth.iris_center.as_deref(),
                "cam_0",
                "iris_center"
            ),
            Err(AnnotationError::MissingField { field: "iris_center", .. })
        ));
    }

    #[test]
    fn test_decode_both_gaze_spellings() {
        let json = r#"{
            "iris_center": "(0, 0, 1)",
            "gaze_vector": "(0, 0, -1)",
            "gaze_vec": "(0, 1, 0, 0.0000)"
        }"#;
        let gt: GroundTruth = serde_json::from_str(json).unwrap();
        assert_eq!(gt.gaze_direction(), Some("(0, 0, -1)"));

        let gt: GroundTruth = serde_json::from_str(r#"{"gaze_vec": "(0, 1, 0, 0)"}"#).unwrap();
        assert_eq!(gt.gaze_direction(), Some("(0, 1, 0, 0)"));
        assert!(GroundTruth::default().gaze_direction().is_none());
    }

    #[test]
    fn test_validate_camera_name() {
        assert_eq!(validate_camera_name("cam_1").unwrap(), "cam_1");
        assert_eq!(validate_camera_name("left.eye").unwrap(), "left.eye");
        for bad in ["", ".", "..", "../x", "a/b", "a\\b", "/abs"] {
            assert!(
                matches!(
                    validate_camera_name(bad),
                    Err(AnnotationError::InvalidCameraName(_))
                ),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_decode_single_camera_record_defaults() {
        let record: SingleCameraRecord = serde_json::from_str("{}").unwrap();
        assert!(record.iris_2d.is_empty());
    }

    #[test]
    fn test_load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.json");
        fs::write(&path, "{ not json").unwrap();
        let file = AnnotationFile {
            index: 1,
            stem: "1".to_string(),
            path,
        };
        assert!(matches!(
            file.load::<SingleCameraRecord>(),
            Err(AnnotationError::Json { .. })
        ));
    }
}
