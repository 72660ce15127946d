//! Implements the pinhole camera used to render the gaze datasets.
//!
//! This module provides the [`PinholeModel`] struct, the free [`project`]
//! function and the YAML camera file format. The pinhole model assumes no lens
//! distortion; its focal length comes from the vertical field of view.

use crate::camera::{validation, CameraModelError, Intrinsics, Resolution};
use log::debug;
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

/// Depth substituted for a point lying exactly on the camera plane.
pub const DEPTH_EPSILON: f64 = 1e-6;

/// Projects a 3D camera-space point to pixel coordinates.
///
/// Applies `u = f * X / Z + cx` and `v = f * Y / Z + cy`. A depth of exactly
/// zero is replaced with [`DEPTH_EPSILON`]. The result is not clamped to the
/// image: points behind the camera or far off-axis land outside the frame and
/// it is up to the caller to decide whether to show them.
///
/// # Arguments
///
/// * `point_3d` - Point in camera coordinates, `Z` pointing into the scene.
/// * `intrinsics` - Focal length and principal point.
///
/// # Return Value
///
/// Pixel coordinates with the origin at the top-left image corner.
///
/// # Examples
///
/// ```rust
/// use eyegaze_tools::camera::{project, Intrinsics};
/// use nalgebra::Point3;
///
/// let intrinsics = Intrinsics { focal_length: 500.0, cx: 320.0, cy: 240.0 };
/// let pixel = project(&Point3::new(0.0, 0.0, 5.0), &intrinsics);
/// assert_eq!((pixel.x, pixel.y), (320.0, 240.0));
/// ```
pub fn project(point_3d: &Point3<f64>, intrinsics: &Intrinsics) -> Point2<f64> {
    let z = if point_3d.z == 0.0 {
        DEPTH_EPSILON
    } else {
        point_3d.z
    };
    let u = intrinsics.focal_length * (point_3d.x / z) + intrinsics.cx;
    let v = intrinsics.focal_length * (point_3d.y / z) + intrinsics.cy;
    Point2::new(u, v)
}

/// Pinhole camera described by its resolution and vertical field of view.
///
/// # Examples
///
/// ```rust
/// use eyegaze_tools::camera::{PinholeModel, Resolution};
/// use nalgebra::Point3;
///
/// let model = PinholeModel::from_vertical_fov(Resolution { width: 640, height: 480 }, 44.61998)
///     .unwrap();
/// let pixel = model.project(&Point3::new(0.0, 0.0, 1.0));
/// assert!(model.contains(&pixel));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinholeModel {
    /// Focal length and principal point, see [`Intrinsics`].
    pub intrinsics: Intrinsics,
    /// Size of the rendered images.
    pub resolution: Resolution,
    /// Vertical field of view in degrees the focal length was derived from.
    pub vertical_fov_deg: f64,
}

impl PinholeModel {
    /// Builds a model with the principal point at the image center.
    ///
    /// # Arguments
    ///
    /// * `resolution` - Image size in pixels.
    /// * `vertical_fov_deg` - Vertical field of view, strictly between 0 and 180 degrees.
    ///
    /// # Return Value
    ///
    /// A model with `f = (height / 2) / tan(fov / 2)`.
    ///
    /// # Errors
    ///
    /// Fails with [`CameraModelError::InvalidFieldOfView`] or
    /// [`CameraModelError::InvalidResolution`] for degenerate configurations.
    pub fn from_vertical_fov(
        resolution: Resolution,
        vertical_fov_deg: f64,
    ) -> Result<Self, CameraModelError> {
        let intrinsics = Intrinsics::from_vertical_fov(&resolution, vertical_fov_deg)?;
        Ok(PinholeModel {
            intrinsics,
            resolution,
            vertical_fov_deg,
        })
    }

    /// Projects a camera-space point, see [`project`].
    pub fn project(&self, point_3d: &Point3<f64>) -> Point2<f64> {
        project(point_3d, &self.intrinsics)
    }

    /// Whether a pixel lies inside `[0, width) x [0, height)`.
    pub fn contains(&self, point_2d: &Point2<f64>) -> bool {
        point_2d.x >= 0.0
            && point_2d.x < self.resolution.width as f64
            && point_2d.y >= 0.0
            && point_2d.y < self.resolution.height as f64
    }

    /// Loads a camera from a YAML file.
    ///
    /// The expected layout is
    ///
    /// ```yaml
    /// cam0:
    ///   camera_model: pinhole
    ///   resolution: [640, 480]
    ///   vertical_fov: 44.61998
    ///   principal_point: [320.0, 240.0]   # optional
    /// ```
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::IOError`] if the file cannot be read.
    /// * [`CameraModelError::YamlError`] if the content is not valid YAML.
    /// * [`CameraModelError::InvalidParams`] if a field is missing or mistyped.
    /// * Any validation error from [`PinholeModel::validate_params`].
    pub fn load_from_yaml(path: &Path) -> Result<Self, CameraModelError> {
        let contents = fs::read_to_string(path)?;
        let docs = YamlLoader::load_from_str(&contents)?;

        if docs.is_empty() {
            return Err(CameraModelError::InvalidParams(
                "Empty YAML document".to_string(),
            ));
        }

        let cam = &docs[0]["cam0"];

        let resolution_yaml = cam["resolution"].as_vec().ok_or_else(|| {
            CameraModelError::InvalidParams("YAML missing 'resolution' or not an array".to_string())
        })?;
        if resolution_yaml.len() != 2 {
            return Err(CameraModelError::InvalidParams(
                "'resolution' must hold exactly [width, height]".to_string(),
            ));
        }

        let resolution = Resolution {
            width: yaml_dimension(&resolution_yaml[0], "width")?,
            height: yaml_dimension(&resolution_yaml[1], "height")?,
        };

        let vertical_fov_deg = yaml_number(&cam["vertical_fov"]).ok_or_else(|| {
            CameraModelError::InvalidParams("YAML missing 'vertical_fov' or not a number".to_string())
        })?;

        let mut model = PinholeModel::from_vertical_fov(resolution, vertical_fov_deg)?;

        if let Some(principal_point) = cam["principal_point"].as_vec() {
            if principal_point.len() != 2 {
                return Err(CameraModelError::InvalidParams(
                    "'principal_point' must hold exactly [cx, cy]".to_string(),
                ));
            }
            model.intrinsics.cx = yaml_number(&principal_point[0]).ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid cx: not a number".to_string())
            })?;
            model.intrinsics.cy = yaml_number(&principal_point[1]).ok_or_else(|| {
                CameraModelError::InvalidParams("Invalid cy: not a number".to_string())
            })?;
        }

        model.validate_params()?;
        debug!(
            "Loaded pinhole camera from {}: f = {:.3}, c = ({:.1}, {:.1})",
            path.display(),
            model.intrinsics.focal_length,
            model.intrinsics.cx,
            model.intrinsics.cy
        );

        Ok(model)
    }

    /// Saves the camera to a YAML file readable by [`PinholeModel::load_from_yaml`].
    ///
    /// The derived focal length is written as well for reference; it is
    /// recomputed from the field of view when loading.
    pub fn save_to_yaml(&self, path: &Path) -> Result<(), CameraModelError> {
        let yaml = serde_yaml::to_value(serde_yaml::Mapping::from_iter([(
            serde_yaml::Value::String("cam0".to_string()),
            serde_yaml::to_value(serde_yaml::Mapping::from_iter([
                (
                    serde_yaml::Value::String("camera_model".to_string()),
                    serde_yaml::Value::String("pinhole".to_string()),
                ),
                (
                    serde_yaml::Value::String("resolution".to_string()),
                    serde_yaml::to_value(vec![self.resolution.width, self.resolution.height])
                        .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
                ),
                (
                    serde_yaml::Value::String("vertical_fov".to_string()),
                    serde_yaml::to_value(self.vertical_fov_deg)
                        .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
                ),
                (
                    serde_yaml::Value::String("principal_point".to_string()),
                    serde_yaml::to_value(vec![self.intrinsics.cx, self.intrinsics.cy])
                        .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
                ),
                (
                    serde_yaml::Value::String("focal_length".to_string()),
                    serde_yaml::to_value(self.intrinsics.focal_length)
                        .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
                ),
            ]))
            .map_err(|e| CameraModelError::YamlError(e.to_string()))?,
        )]))
        .map_err(|e| CameraModelError::YamlError(e.to_string()))?;

        let yaml_string =
            serde_yaml::to_string(&yaml).map_err(|e| CameraModelError::YamlError(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(yaml_string.as_bytes())?;

        Ok(())
    }

    /// Validates resolution, field of view and intrinsics.
    pub fn validate_params(&self) -> Result<(), CameraModelError> {
        validation::validate_resolution(&self.resolution)?;
        validation::validate_vertical_fov(self.vertical_fov_deg)?;
        validation::validate_intrinsics(&self.intrinsics)?;
        Ok(())
    }
}

/// yaml-rust keeps integers and reals apart; `45` and `45.0` are both accepted.
fn yaml_number(value: &Yaml) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}

fn yaml_dimension(value: &Yaml, name: &str) -> Result<u32, CameraModelError> {
    value
        .as_i64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| {
            CameraModelError::InvalidParams(format!("Invalid {name}: not a non-negative integer"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn test_intrinsics() -> Intrinsics {
        Intrinsics {
            focal_length: 500.0,
            cx: 320.0,
            cy: 240.0,
        }
    }

    fn vga_model() -> PinholeModel {
        PinholeModel::from_vertical_fov(
            Resolution {
                width: 640,
                height: 480,
            },
            44.61998,
        )
        .unwrap()
    }

    #[test]
    fn test_optical_axis_maps_to_principal_point() {
        let pixel = project(&Point3::new(0.0, 0.0, 5.0), &test_intrinsics());
        assert_eq!(pixel, Point2::new(320.0, 240.0));
    }

    #[test]
    fn test_project_off_axis() {
        let pixel = project(&Point3::new(0.1, 0.2, 1.0), &test_intrinsics());
        assert_abs_diff_eq!(pixel.x, 370.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pixel.y, 340.0, epsilon = 1e-9);
    }

    #[test]
    fn test_project_is_deterministic() {
        let intrinsics = test_intrinsics();
        let point = Point3::new(-12.345, 6.789, 31.4159);
        let first = project(&point, &intrinsics);
        let second = project(&point, &intrinsics);
        assert_eq!(first.x.to_bits(), second.x.to_bits());
        assert_eq!(first.y.to_bits(), second.y.to_bits());
    }

    #[test]
    fn test_zero_depth_uses_epsilon() {
        let intrinsics = test_intrinsics();
        let pixel = project(&Point3::new(1.0, -2.0, 0.0), &intrinsics);
        assert!(pixel.x.is_finite() && pixel.y.is_finite());
        assert_abs_diff_eq!(pixel.x, 500.0 / DEPTH_EPSILON + 320.0, epsilon = 1e-3);
        assert_abs_diff_eq!(pixel.y, -1000.0 / DEPTH_EPSILON + 240.0, epsilon = 1e-3);

        let on_axis = project(&Point3::new(0.0, 0.0, 0.0), &intrinsics);
        assert_eq!(on_axis, Point2::new(320.0, 240.0));
    }

    #[test]
    fn test_negative_zero_depth_uses_epsilon() {
        let pixel = project(&Point3::new(1.0, 1.0, -0.0), &test_intrinsics());
        assert!(pixel.x.is_finite() && pixel.y.is_finite());
        assert!(pixel.x > 320.0);
    }

    #[test]
    fn test_points_behind_camera_are_not_clamped() {
        let model = vga_model();
        let pixel = model.project(&Point3::new(10.0, 10.0, -1.0));
        assert!(pixel.x < 0.0 && pixel.y < 0.0);
        assert!(!model.contains(&pixel));
    }

    #[test]
    fn test_contains() {
        let model = vga_model();
        assert!(model.contains(&Point2::new(0.0, 0.0)));
        assert!(model.contains(&Point2::new(639.9, 479.9)));
        assert!(!model.contains(&Point2::new(640.0, 100.0)));
        assert!(!model.contains(&Point2::new(100.0, -0.5)));
    }

    #[test]
    fn test_pinhole_save_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinhole.yaml");

        let model = vga_model();
        model.save_to_yaml(&path).unwrap();
        let loaded = PinholeModel::load_from_yaml(&path).unwrap();

        assert_eq!(loaded.resolution, model.resolution);
        assert_abs_diff_eq!(loaded.vertical_fov_deg, 44.61998, epsilon = 1e-12);
        assert_abs_diff_eq!(
            loaded.intrinsics.focal_length,
            model.intrinsics.focal_length,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_load_yaml_with_integer_fov_and_principal_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.yaml");
        fs::write(
            &path,
            "cam0:\n  resolution: [800, 600]\n  vertical_fov: 90\n  principal_point: [400.5, 299.5]\n",
        )
        .unwrap();

        let model = PinholeModel::load_from_yaml(&path).unwrap();
        assert_abs_diff_eq!(model.intrinsics.focal_length, 300.0, epsilon = 1e-9);
        assert_eq!(model.intrinsics.cx, 400.5);
        assert_eq!(model.intrinsics.cy, 299.5);
    }

    #[test]
    fn test_load_yaml_rejects_degenerate_fov() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.yaml");
        fs::write(&path, "cam0:\n  resolution: [640, 480]\n  vertical_fov: 180.0\n").unwrap();

        assert!(matches!(
            PinholeModel::load_from_yaml(&path),
            Err(CameraModelError::InvalidFieldOfView(_))
        ));
    }

    #[test]
    fn test_load_yaml_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cam.yaml");
        fs::write(&path, "cam0:\n  resolution: [640, 480]\n").unwrap();

        assert!(matches!(
            PinholeModel::load_from_yaml(&path),
            Err(CameraModelError::InvalidParams(_))
        ));
    }
}
