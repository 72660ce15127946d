//! Coordinate parsing and the small amount of point arithmetic the viewers need.
//!
//! Annotation files store every coordinate as a tuple string such as
//! `"(1.0, 2.5, -3.0)"`. [`parse_vector`] turns those into numbers, the
//! `to_point*` adapters check dimensionality, and [`flip_vertical`] converts
//! raw landmark coordinates from the dataset's bottom-left origin to image space.

use nalgebra::{Point2, Point3, Vector3};

/// Accepted opening/closing delimiter pairs.
const DELIMITERS: [(char, char); 2] = [('(', ')'), ('[', ']')];

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum VectorParseError {
    #[error("Vector string {0:?} is too short to hold a delimited tuple")]
    TooShort(String),
    #[error("Vector string {0:?} is not wrapped in matching delimiters")]
    UnmatchedDelimiters(String),
    #[error("Invalid number {segment:?} in vector string {input:?}")]
    InvalidNumber { input: String, segment: String },
    #[error("Homogeneous direction must end in 0, found {0}")]
    NotADirection(f64),
    #[error("Expected {expected} components, found {found}")]
    Dimension { expected: usize, found: usize },
}

/// Parses a delimited tuple of numbers such as `"(1.0, 2.5, -3.0)"`.
///
/// Leading and trailing whitespace is ignored, the first and last characters
/// must be `(`/`)` or `[`/`]`, and every comma-separated segment must be a
/// float literal. The number of components is not checked here; see
/// [`to_point2`] and [`to_point3`].
///
/// # Errors
///
/// * [`VectorParseError::TooShort`] if fewer than two characters remain after trimming.
/// * [`VectorParseError::UnmatchedDelimiters`] if the delimiters are missing or mismatched.
/// * [`VectorParseError::InvalidNumber`] if any segment is not numeric.
///
/// # Examples
///
/// ```rust
/// use eyegaze_tools::geometry::parse_vector;
///
/// assert_eq!(parse_vector("(1.0, 2.5, -3.0)").unwrap(), vec![1.0, 2.5, -3.0]);
/// assert_eq!(parse_vector("(0)").unwrap(), vec![0.0]);
/// assert!(parse_vector("bad").is_err());
/// ```
pub fn parse_vector(text: &str) -> Result<Vec<f64>, VectorParseError> {
    let trimmed = text.trim();

    let mut chars = trimmed.chars();
    let (first, last) = match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(VectorParseError::TooShort(text.to_string())),
    };

    if !DELIMITERS.contains(&(first, last)) {
        return Err(VectorParseError::UnmatchedDelimiters(text.to_string()));
    }

    chars
        .as_str()
        .split(',')
        .map(|segment| {
            let segment = segment.trim();
            segment
                .parse::<f64>()
                .map_err(|_| VectorParseError::InvalidNumber {
                    input: text.to_string(),
                    segment: segment.to_string(),
                })
        })
        .collect()
}

/// Uses the first two components as a 2D point.
///
/// Landmark strings may carry a trailing depth component which is ignored.
pub fn to_point2(components: &[f64]) -> Result<Point2<f64>, VectorParseError> {
    match components {
        [x, y, ..] => Ok(Point2::new(*x, *y)),
        _ => Err(VectorParseError::Dimension {
            expected: 2,
            found: components.len(),
        }),
    }
}

/// Requires exactly three components.
pub fn to_point3(components: &[f64]) -> Result<Point3<f64>, VectorParseError> {
    match components {
        [x, y, z] => Ok(Point3::new(*x, *y, *z)),
        _ => Err(VectorParseError::Dimension {
            expected: 3,
            found: components.len(),
        }),
    }
}

/// Direction vector from three components, or four in homogeneous form.
///
/// The dataset generator writes gaze directions after multiplying them with a
/// 4x4 view matrix, so they arrive as `(x, y, z, 0.0000)`. A fourth component
/// other than zero would be a point, not a direction, and is rejected.
///
/// # Arguments
///
/// * `components` - Output of [`parse_vector`].
///
/// # Return Value
///
/// The `(x, y, z)` direction.
///
/// # Errors
///
/// * [`VectorParseError::NotADirection`] if a fourth component is present and non-zero.
/// * [`VectorParseError::Dimension`] for any other component count.
pub fn to_direction3(components: &[f64]) -> Result<Vector3<f64>, VectorParseError> {
    match components {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        [x, y, z, w] if *w == 0.0 => Ok(Vector3::new(*x, *y, *z)),
        [_, _, _, w] => Err(VectorParseError::NotADirection(*w)),
        _ => Err(VectorParseError::Dimension {
            expected: 3,
            found: components.len(),
        }),
    }
}

/// Parses a landmark string into a 2D point, see [`to_point2`].
pub fn parse_point2(text: &str) -> Result<Point2<f64>, VectorParseError> {
    to_point2(&parse_vector(text)?)
}

/// Parses a 3D camera-space point, see [`to_point3`].
pub fn parse_point3(text: &str) -> Result<Point3<f64>, VectorParseError> {
    to_point3(&parse_vector(text)?)
}

/// Parses a gaze direction, see [`to_direction3`].
pub fn parse_direction3(text: &str) -> Result<Vector3<f64>, VectorParseError> {
    to_direction3(&parse_vector(text)?)
}

/// Moves a landmark from the dataset's bottom-left origin to the image's
/// top-left origin: `(u, v) -> (u, height - v)`.
///
/// Only raw annotation landmarks need this. Points produced by
/// [`crate::camera::project`] are already in image space and must not be flipped.
pub fn flip_vertical(point: &Point2<f64>, image_height: f64) -> Point2<f64> {
    Point2::new(point.x, image_height - point.y)
}

/// Point reached by following the gaze direction from the iris center.
pub fn gaze_endpoint(iris_center: &Point3<f64>, gaze_vector: &Vector3<f64>) -> Point3<f64> {
    iris_center + gaze_vector
}
