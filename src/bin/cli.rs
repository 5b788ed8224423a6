use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use image::DynamicImage;
use log::info;

use imagelab::{transforms, Error, Predictor, RandomPredictor};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// MLOps image classification command line interface.
#[derive(Debug, Parser)]
#[command(name = "imagelab", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Predicts the class of the image at PATH (randomly chosen for now).
    Predict { path: PathBuf },
    /// Resizes the image at PATH to exactly WIDTH x HEIGHT.
    Resize {
        path: PathBuf,
        #[arg(allow_negative_numbers = true)]
        width: i64,
        #[arg(allow_negative_numbers = true)]
        height: i64,
        /// Where to write the JPEG result. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Converts the image at PATH to grayscale.
    Grayscale {
        path: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rotates the image at PATH counter-clockwise by DEGREES.
    Rotate {
        path: PathBuf,
        #[arg(allow_negative_numbers = true)]
        degrees: f32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    imagelab::init_logging();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Predict { path } => {
            let image = load_image(&path)?;
            let prediction = RandomPredictor::default().predict(Some(&image))?;
            println!(
                "The class predicted for {} is: {}",
                display_name(&path),
                prediction.label
            );
        }
        Command::Resize {
            path,
            width,
            height,
            output,
        } => {
            let resized = transforms::resize(&load_image(&path)?, width, height)?;
            if let Some(out) = write_output(&resized, output.as_deref())? {
                println!(
                    "Image resized from {} to {}x{} and saved to {}",
                    display_name(&path),
                    width,
                    height,
                    display_name(out)
                );
            }
        }
        Command::Grayscale { path, output } => {
            let gray = transforms::grayscale(&load_image(&path)?);
            if let Some(out) = write_output(&gray, output.as_deref())? {
                println!(
                    "Image {} converted to grayscale and saved to {}",
                    display_name(&path),
                    display_name(out)
                );
            }
        }
        Command::Rotate {
            path,
            degrees,
            output,
        } => {
            let rotated = transforms::rotate(&load_image(&path)?, degrees)?;
            if let Some(out) = write_output(&rotated, output.as_deref())? {
                println!(
                    "Image {} rotated by {} degrees and saved to {}",
                    display_name(&path),
                    degrees,
                    display_name(out)
                );
            }
        }
    }
    Ok(())
}

fn load_image(path: &Path) -> imagelab::Result<DynamicImage> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if !supported {
        return Err(Error::UnsupportedFormat);
    }

    info!("Loading {}", path.display());
    transforms::decode(&fs::read(path)?)
}

/// Writes the JPEG to `output`, or to stdout when no path is given.
/// Returns the path written, if any.
fn write_output<'a>(
    image: &DynamicImage,
    output: Option<&'a Path>,
) -> anyhow::Result<Option<&'a Path>> {
    let bytes = transforms::encode_jpeg(image)?;
    match output {
        Some(path) => {
            fs::write(path, &bytes)
                .with_context(|| format!("cannot write {}", path.display()))?;
            Ok(Some(path))
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(None)
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
