use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use retarget_render::{
    config::Config,
    export::ArtifactStem,
    pipeline::{MotionRequest, RequestPlan, DEFAULT_INPUT_TYPE},
    render::SoftwareRenderBackend,
};

#[derive(Parser)]
#[command(
    name = "retarget-render",
    version,
    about = "Retarget human motion onto robots and export videos, trajectories and CSV tables",
    long_about = "Retarget-Render validates motion conversion requests, drives a retargeting engine frame by frame and exports tracked-camera videos, trajectory pickles, CSV tables or a zip of these."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a request against the configuration without running it
    Check {
        /// Motion input file (.pt for gvhmr, .npz for smplx_npz)
        input: PathBuf,

        /// Input family (gvhmr, smplx_npz)
        #[arg(short, long, default_value = DEFAULT_INPUT_TYPE)]
        input_type: String,

        /// Target robot (defaults to export.default_robot)
        #[arg(short, long)]
        robot: Option<String>,

        /// Comma separated output formats (mp4, traj, csv, both)
        #[arg(short = 'f', long)]
        formats: Option<String>,

        /// Legacy single output format
        #[arg(long)]
        return_format: Option<String>,

        /// Coordinate fix (none, yup_to_zup)
        #[arg(long)]
        coord_fix: Option<String>,

        /// Video width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Video height in pixels
        #[arg(long)]
        height: Option<u32>,
    },

    /// Write the default configuration to a TOML file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "retarget-render.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting Retarget-Render v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            info!("Default configuration written to {:?}", output);
        }
        Command::Check {
            input,
            input_type,
            robot,
            formats,
            return_format,
            coord_fix,
            width,
            height,
        } => {
            let config = load_config(cli.config)?;

            let metadata = tokio::fs::metadata(&input)
                .await
                .with_context(|| format!("cannot read input {:?}", input))?;
            let file_name = input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let request = MotionRequest {
                file_name,
                contents: Vec::new(),
                input_type,
                robot,
                width,
                height,
                output_formats: formats,
                return_format,
                coord_fix,
            };

            let plan = RequestPlan::resolve(&config, &request).map_err(|e| anyhow::anyhow!(e.user_message()))?;

            info!("Input: {:?} ({} bytes, {})", input, metadata.len(), plan.family);
            info!("Robot: {}", plan.robot);
            info!("Outputs: {}", plan.request);
            info!("Coordinate fix: {}", plan.coord_fix);
            if let Some(view) = &plan.render {
                info!(
                    "Video: {}x{} tracking '{}' at {} m",
                    view.width, view.height, view.base_link, view.camera_distance
                );
            }

            let preview = ArtifactStem::new(&config.paths.output_dir, "<stem>");
            let (produced, delivered) = plan.artifact_names(&preview);
            for path in &produced {
                info!("  produces {:?}", path);
            }
            info!("  returns {:?}", delivered);

            if !config.paths.body_model_dir.exists() {
                warn!("Body model directory {:?} does not exist", config.paths.body_model_dir);
            }
            if plan.render.is_some() && !SoftwareRenderBackend::new(&config.render).encoder_available() {
                warn!("'{}' not found, video export will fail", config.render.ffmpeg_binary);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = match path {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    let config = config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
