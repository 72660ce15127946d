//! Command line front end for the dataset viewers.
//!
//! ```bash
//! eyegaze-tools landmarks --dataset unityeyes1
//! eyegaze-tools ground-truth --dataset imgs --record 136 --fov 44.61998
//! eyegaze-tools grid --dataset imgs --samples 5,6,7,8 --cameras 1,2,3,4
//! ```

use clap::{Args, Parser, Subcommand};
use eyegaze_tools::camera::{PinholeModel, Resolution};
use eyegaze_tools::util::{CsvRenderer, PngRenderer, Renderer};
use eyegaze_tools::viewer::{GroundTruthViewer, LandmarkViewer, SampleGrid};
use flexi_logger::{colored_detailed_format, detailed_format, Duplicate, FileSpec, Logger};
use log::info;
use std::path::PathBuf;

/// Visual QA for eye-gaze datasets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory the rendered PNG files are written to
    #[arg(short = 'o', long, global = true, default_value = "output")]
    output_dir: PathBuf,

    /// Write marker coordinates to this CSV file instead of rendering PNGs
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Also write logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overlay iris landmarks of a single-camera dataset (<N>.json + <N>.jpg)
    Landmarks {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[command(flatten)]
        camera: CameraArgs,
    },
    /// Overlay landmarks and projected ground truth of a multi-camera dataset
    /// (<N>.json + <N>_<camera>.jpg)
    GroundTruth {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[command(flatten)]
        camera: CameraArgs,
        /// Only process these record numbers (repeatable); all records by default
        #[arg(short = 'r', long = "record")]
        records: Vec<u64>,
    },
    /// Tile <sample>_<prefix><camera>.jpg images into one grid
    Grid {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[command(flatten)]
        camera: CameraArgs,
        /// Sample numbers, one grid row each
        #[arg(long, value_delimiter = ',', default_value = "5,6,7,8")]
        samples: Vec<u64>,
        /// Camera numbers, one grid column each
        #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
        cameras: Vec<u64>,
        /// Camera part of the image name
        #[arg(long, default_value = "cam_")]
        camera_prefix: String,
    },
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Folder holding the JSON annotations and images
    #[arg(short = 'd', long, default_value = "imgs")]
    dataset: PathBuf,
}

#[derive(Args, Debug)]
struct CameraArgs {
    /// Camera YAML file; overrides --width, --height and --fov
    #[arg(short = 'c', long)]
    camera: Option<PathBuf>,

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

impl CameraArgs {
    fn load(&self) -> Result<PinholeModel, Box<dyn std::error::Error>> {
        let model = match &self.camera {
            Some(path) => {
                info!("Loading pinhole camera from: {}", path.display());
                PinholeModel::load_from_yaml(path)?
            }
            None => PinholeModel::from_vertical_fov(
                Resolution {
                    width: self.width,
                    height: self.height,
                },
                self.fov,
            )?,
        };
        info!(
            "Camera: {}x{}, vertical fov {} deg, f = {:.3}, c = ({}, {})",
            model.resolution.width,
            model.resolution.height,
            model.vertical_fov_deg,
            model.intrinsics.focal_length,
            model.intrinsics.cx,
            model.intrinsics.cy
        );
        Ok(model)
    }
}

fn make_renderer(cli: &Cli) -> Result<Box<dyn Renderer>, Box<dyn std::error::Error>> {
    let renderer: Box<dyn Renderer> = match &cli.csv {
        Some(path) => {
            info!("Writing marker coordinates to {}", path.display());
            Box::new(CsvRenderer::new(path)?)
        }
        None => {
            info!("Writing images to {}", cli.output_dir.display());
            Box::new(PngRenderer::new(&cli.output_dir)?)
        }
    };
    Ok(renderer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let logger = Logger::try_with_env_or_str("info")?;
    let logger = match &cli.log_dir {
        Some(dir) => logger
            .log_to_file(
                FileSpec::default()
                    .directory(dir)
                    .suppress_timestamp()
                    .suffix("log"),
            )
            .duplicate_to_stdout(Duplicate::All)
            .format_for_files(detailed_format)
            .format_for_stdout(colored_detailed_format),
        None => logger.log_to_stdout().format(colored_detailed_format),
    };
    // Keep the handle alive so file output is flushed on exit.
    let _logger = logger.set_palette("196;208;76;39;178".to_string()).start()?;

    // Configuration errors (bad FOV, unreadable camera file) abort here.
    let summary = match &cli.command {
        Command::Landmarks { dataset, camera } => {
            let camera = camera.load()?;
            let mut renderer = make_renderer(&cli)?;
            LandmarkViewer::new(&dataset.dataset, camera.resolution).run(renderer.as_mut())?
        }
        Command::GroundTruth {
            dataset,
            camera,
            records,
        } => {
            let camera = camera.load()?;
            let mut renderer = make_renderer(&cli)?;
            GroundTruthViewer::new(&dataset.dataset, camera)
                .with_records(records.clone())
                .run(renderer.as_mut())?
        }
        Command::Grid {
            dataset,
            camera,
            samples,
            cameras,
            camera_prefix,
        } => {
            let camera = camera.load()?;
            let mut renderer = make_renderer(&cli)?;
            let mut grid = SampleGrid::new(&dataset.dataset, camera.resolution);
            grid.samples = samples.clone();
            grid.cameras = cameras.clone();
            grid.camera_prefix = camera_prefix.clone();
            grid.run(renderer.as_mut())?
        }
    };

    info!("Done: {summary}");
    Ok(())
}
