use clap::{Parser, Subcommand};
use nalgebra as na;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use template_pose::camera::CameraParams;
use template_pose::synthetic::{house_template, random_pose, write_scene};
use template_pose::types::Pose;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a house shaped target under a known pose
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Camera parameters JSON, a distortion free 800x800 pinhole if omitted
        #[arg(short, long)]
        camera_params: Option<String>,

        /// Template units per object unit
        #[arg(long, default_value = "10000")]
        scale: f64,

        /// Seed for a random pose; without it the target faces the camera
        #[arg(long)]
        seed: Option<u64>,

        /// Image width
        #[arg(long, default_value = "800")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "600")]
        height: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            camera_params,
            scale,
            seed,
            width,
            height,
        } => {
            let camera = match camera_params {
                Some(path) => CameraParams::from_json_file(path)?,
                None => CameraParams::pinhole(
                    800.0,
                    800.0,
                    width as f64 / 2.0,
                    height as f64 / 2.0,
                ),
            };
            let pose = match seed {
                Some(seed) => random_pose(&mut ChaCha8Rng::seed_from_u64(seed), 0.2, 0.35),
                None => Pose::new(na::Vector3::zeros(), na::Vector3::new(0.0, 0.0, 0.25)),
            };
            let ground_truth =
                write_scene(&output, &house_template(), scale, &camera, &pose, width, height)?;
            println!(
                "Generated {} with rvec {:?} tvec {:?}",
                output, ground_truth.rvec, ground_truth.tvec
            );
        }
    }

    Ok(())
}
