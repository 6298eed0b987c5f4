use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use template_pose::blob::DetectorConfig;
use template_pose::camera::CameraParams;
use template_pose::io::{format_vec3, object_from_json};
use template_pose::pipeline::PosePipeline;
use template_pose::template::Template;
use template_pose::visualization::{DEFAULT_AXIS_LENGTH, render_overlay, show_overlay};
use template_pose::{PoseError, Result};

#[derive(Parser)]
#[command(version, about, author)]
struct TposeCli {
    /// path to the photograph
    image: PathBuf,

    /// camera parameters json with intrinsics.K and intrinsics.distortion
    camera_params: PathBuf,

    /// svg template built from rect and polygon elements
    template: PathBuf,

    /// anything other than "0" opens the pose overlay viewer
    print: Option<String>,

    /// template units per object unit
    #[arg(long, default_value_t = 10000.0)]
    scale: f64,

    /// detector parameters json, missing keys fall back to defaults
    #[arg(long)]
    detector_config: Option<PathBuf>,

    /// write the full pose report as json
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// write the overlay image
    #[arg(long)]
    save_overlay: Option<PathBuf>,
}

fn run(cli: &TposeCli) -> Result<()> {
    let detector = match &cli.detector_config {
        Some(path) => object_from_json::<DetectorConfig>(path)?,
        None => DetectorConfig::default(),
    };
    let camera = CameraParams::from_json_file(&cli.camera_params)?;
    let template = Template::from_svg_file(&cli.template)?;
    let image = image::open(&cli.image).map_err(|e| match e {
        image::ImageError::IoError(source) => PoseError::Io {
            path: cli.image.clone(),
            source,
        },
        other => PoseError::Image(other),
    })?;

    let now = Instant::now();
    let pipeline = PosePipeline::new(template, cli.scale, detector);
    let report = pipeline.run(&image, &camera)?;
    log::info!("pose took {:.6} sec", now.elapsed().as_secs_f64());

    if let Some(output) = &cli.output {
        template_pose::io::object_to_json(output, &report.to_json_value()?)?;
    }

    let show = cli.print.as_deref().is_some_and(|p| p != "0");
    if show || cli.save_overlay.is_some() {
        let overlay = render_overlay(&image, &camera, &report, DEFAULT_AXIS_LENGTH)?;
        if let Some(path) = &cli.save_overlay {
            overlay.save(path)?;
        }
        if show {
            show_overlay(&overlay, &report)?;
        }
    }

    println!("Rotation vector:");
    println!("{}", format_vec3(&report.pose.rvec));
    println!("Translation vector:");
    println!("{}", format_vec3(&report.pose.tvec));
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = TposeCli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
