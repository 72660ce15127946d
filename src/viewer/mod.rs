//! The dataset viewers.
//!
//! Each viewer walks a dataset folder in record order, turns every record into
//! one or more [`Overlay`](crate::util::Overlay)s and passes them to a
//! [`Renderer`](crate::util::Renderer):
//!
//! * [`LandmarkViewer`] - iris landmarks of a single-camera dataset.
//! * [`GroundTruthViewer`] - iris landmarks plus projected ground-truth iris
//!   center, gaze endpoint and eye center of a multi-camera dataset.
//! * [`SampleGrid`] - a samples x cameras contact sheet.
//!
//! A broken record (missing image, missing ground truth, malformed coordinate,
//! undecodable JSON) is logged and skipped. Only failures that affect the whole
//! run, such as an unreadable dataset folder or a renderer error, are returned.

use crate::annotation::AnnotationError;
use crate::util::UtilError;
use std::fmt;

mod grid;
mod ground_truth;
mod landmarks;

pub use grid::SampleGrid;
pub use ground_truth::GroundTruthViewer;
pub use landmarks::LandmarkViewer;

#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Render(#[from] UtilError),
}

/// Outcome of a viewer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rendered: usize,
    pub skipped: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rendered, {} skipped", self.rendered, self.skipped)
    }
}
