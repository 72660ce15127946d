//! Project ground-truth eye points with the dataset camera
//!
//! Prints where an iris center, its gaze endpoint and an optional eye center
//! land in the image, without touching any dataset files.
//!
//! Usage:
//! ```bash
//! cargo run --example project_ground_truth -- \
//!   --iris-center "(1.2, -0.4, 38.0)" \
//!   --gaze-vector "(0.05, 0.1, -1.0)"
//! ```

use clap::Parser;
use eyegaze_tools::camera::{PinholeModel, Resolution};
use eyegaze_tools::geometry::{gaze_endpoint, parse_direction3, parse_point3};
use log::info;

/// Ground-truth projection demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Iris center in camera space, e.g. "(1.2, -0.4, 38.0)"
    #[arg(long)]
    iris_center: String,

    /// Gaze direction added to the iris center
    #[arg(long)]
    gaze_vector: String,

    /// Eye ball center in camera space
    #[arg(long)]
    eye_center: Option<String>,

    /// Image width in pixels
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 480)]
    height: u32,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 44.61998)]
    fov: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();

    let camera = PinholeModel::from_vertical_fov(
        Resolution {
            width: cli.width,
            height: cli.height,
        },
        cli.fov,
    )?;
    info!("Focal length: {:.3}", camera.intrinsics.focal_length);

    let iris_center = parse_point3(&cli.iris_center)?;
    let gaze_vector = parse_direction3(&cli.gaze_vector)?;
    let endpoint = gaze_endpoint(&iris_center, &gaze_vector);

    let mut points = vec![("iris center", iris_center), ("gaze endpoint", endpoint)];
    if let Some(eye_center) = &cli.eye_center {
        points.push(("eye center", parse_point3(eye_center)?));
    }

    println!("Camera {}x{}, f = {:.3}", cli.width, cli.height, camera.intrinsics.focal_length);
    for (name, point) in points {
        let pixel = camera.project(&point);
        let note = if camera.contains(&pixel) { "" } else { "  (outside image)" };
        println!(
            "{name:>14}: ({:.3}, {:.3}, {:.3}) -> ({:.1}, {:.1}){note}",
            point.x, point.y, point.z, pixel.x, pixel.y
        );
    }

    Ok(())
}
