use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use segodec::logger::{self, debug, warn};
use segodec::{Decoder, DecoderConfig, FileImageSource};

#[derive(Parser)]
#[command(name = "segodec")]
#[command(about = "Read the digits shown on a seven-segment display")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a captured display image and print its digits
    Decode {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// JSON configuration describing the display geometry
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Save debug outputs to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the built-in configuration as JSON
    DefaultConfig,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();

    match args.command {
        Command::Decode {
            image_path,
            config,
            debug_out,
            verbose,
        } => {
            logger::init(verbose);

            let config = match config {
                Some(path) => {
                    debug!(path = %path.display(), "loading config");
                    DecoderConfig::load(&path)?
                }
                None => DecoderConfig::default(),
            };

            let mut decoder = Decoder::new(config)?;
            if let Some(debug_dir) = debug_out {
                decoder = decoder.with_debug(debug_dir)?;
            }
            let source = FileImageSource::new(decoder.config().crop);

            match decoder.decode_file(&source, &image_path) {
                Ok(reading) => {
                    println!("{reading}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) if e.is_indeterminate() => {
                    warn!("{e}");
                    println!("Indeterminate");
                    Ok(ExitCode::FAILURE)
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::DefaultConfig => {
            println!("{}", DecoderConfig::default().to_json_pretty()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
