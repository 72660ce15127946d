//! Camera intrinsics shared by every viewer.
//!
//! The datasets handled by this crate are rendered with a plain pinhole camera
//! whose focal length is derived from the vertical field of view and the image
//! height. [`Intrinsics`] is computed once per run and passed explicitly to
//! every projection.

use serde::{Deserialize, Serialize};

pub mod pinhole;

pub use pinhole::{project, PinholeModel, DEPTH_EPSILON};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub focal_length: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    #[error("Vertical field of view must lie strictly between 0 and 180 degrees, got {0}")]
    InvalidFieldOfView(f64),
    #[error("Resolution must be non-zero, got {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for CameraModelError {
    fn from(err: std::io::Error) -> Self {
        CameraModelError::IOError(err.to_string())
    }
}

impl From<yaml_rust::ScanError> for CameraModelError {
    fn from(err: yaml_rust::ScanError) -> Self {
        CameraModelError::YamlError(err.to_string())
    }
}

impl Intrinsics {
    /// Derives intrinsics from the vertical field of view.
    ///
    /// `focal_length = (height / 2) / tan(radians(fov) / 2)` and the principal
    /// point sits at the image center.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::InvalidResolution`] if either dimension is zero.
    /// * [`CameraModelError::InvalidFieldOfView`] if `vertical_fov_deg` is not
    ///   finite or not strictly inside (0, 180).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eyegaze_tools::camera::{Intrinsics, Resolution};
    ///
    /// let resolution = Resolution { width: 640, height: 480 };
    /// let intrinsics = Intrinsics::from_vertical_fov(&resolution, 44.61998).unwrap();
    /// assert!((intrinsics.focal_length - 585.02).abs() < 0.1);
    /// assert_eq!(intrinsics.cx, 320.0);
    /// assert_eq!(intrinsics.cy, 240.0);
    /// ```
    pub fn from_vertical_fov(
        resolution: &Resolution,
        vertical_fov_deg: f64,
    ) -> Result<Self, CameraModelError> {
        validation::validate_resolution(resolution)?;
        validation::validate_vertical_fov(vertical_fov_deg)?;

        let half_height = resolution.height as f64 / 2.0;
        let focal_length = half_height / (vertical_fov_deg.to_radians() / 2.0).tan();

        let intrinsics = Intrinsics {
            focal_length,
            cx: resolution.width as f64 / 2.0,
            cy: half_height,
        };
        validation::validate_intrinsics(&intrinsics)?;

        Ok(intrinsics)
    }
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), CameraModelError> {
        if intrinsics.focal_length <= 0.0 || !intrinsics.focal_length.is_finite() {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        Ok(())
    }

    pub fn validate_resolution(resolution: &Resolution) -> Result<(), CameraModelError> {
        if resolution.width == 0 || resolution.height == 0 {
            return Err(CameraModelError::InvalidResolution {
                width: resolution.width,
                height: resolution.height,
            });
        }
        Ok(())
    }

    /// 0 and 180 degrees make the focal length infinite or zero.
    pub fn validate_vertical_fov(vertical_fov_deg: f64) -> Result<(), CameraModelError> {
        if !vertical_fov_deg.is_finite() || vertical_fov_deg <= 0.0 || vertical_fov_deg >= 180.0 {
            return Err(CameraModelError::InvalidFieldOfView(vertical_fov_deg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    #[test]
    fn test_focal_length_regression() {
        let intrinsics = Intrinsics::from_vertical_fov(&VGA, 44.61998).unwrap();
        assert_abs_diff_eq!(intrinsics.focal_length, 585.02, epsilon = 0.1);
        assert_eq!(intrinsics.cx, 320.0);
        assert_eq!(intrinsics.cy, 240.0);
    }

    #[test]
    fn test_ninety_degree_fov() {
        // tan(45deg) == 1, so f == H / 2
        let intrinsics = Intrinsics::from_vertical_fov(&VGA, 90.0).unwrap();
        assert_abs_diff_eq!(intrinsics.focal_length, 240.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_fov_is_rejected() {
        for fov in [0.0, 180.0, -10.0, 200.0, f64::NAN, f64::INFINITY] {
            let result = Intrinsics::from_vertical_fov(&VGA, fov);
            assert!(
                matches!(result, Err(CameraModelError::InvalidFieldOfView(_))),
                "fov {fov} should be rejected"
            );
        }
    }

    #[test]
    fn test_zero_resolution_is_rejected() {
        let resolution = Resolution {
            width: 640,
            height: 0,
        };
        assert!(matches!(
            Intrinsics::from_vertical_fov(&resolution, 45.0),
            Err(CameraModelError::InvalidResolution { .. })
        ));
    }

    #[test]
    fn test_validate_intrinsics() {
        let bad_focal = Intrinsics {
            focal_length: 0.0,
            cx: 320.0,
            cy: 240.0,
        };
        assert!(matches!(
            validation::validate_intrinsics(&bad_focal),
            Err(CameraModelError::FocalLengthMustBePositive)
        ));

        let bad_center = Intrinsics {
            focal_length: 500.0,
            cx: f64::NAN,
            cy: 240.0,
        };
        assert!(matches!(
            validation::validate_intrinsics(&bad_center),
            Err(CameraModelError::PrincipalPointMustBeFinite)
        ));
    }
}
