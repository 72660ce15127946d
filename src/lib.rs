//! Eye-Gaze Tools Library
//!
//! Visual QA for synthetic eye-gaze datasets. The library parses the tuple
//! strings stored in the JSON annotations, projects ground-truth points with a
//! pinhole camera derived from the vertical field of view, and renders:
//! - 2D iris landmark overlays
//! - projected ground-truth iris center, gaze endpoint and eye center
//! - sample x camera contact sheets
//!
//! Rendering goes through the [`util::Renderer`] trait; PNG and CSV outputs
//! are provided.

pub mod annotation;
pub mod camera;
pub mod geometry;
pub mod util;
pub mod viewer;

// Re-export commonly used types
pub use annotation::{AnnotationError, AnnotationFile};
pub use camera::{project, CameraModelError, Intrinsics, PinholeModel, Resolution};
pub use geometry::{flip_vertical, parse_direction3, parse_vector, VectorParseError};
pub use util::{CsvRenderer, Overlay, PngRenderer, Renderer, UtilError};
pub use viewer::{GroundTruthViewer, LandmarkViewer, RunSummary, SampleGrid, ViewerError};
