use crate::error::ConfigError;
use crate::pipeline::{self, FailureRendering, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;

/// Reports the most prevalent colors of each image in a list of files or URLs.
#[derive(Debug, Parser)]
#[command(name = "top_colors", version, about)]
pub struct Cli {
    /// Comma-delimited file of image paths or URLs.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write results to this file instead of standard output.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of references buffered between the reader and the workers.
    #[arg(long, alias = "maxlinks", default_value_t = pipeline::DEFAULT_INTAKE_CAPACITY)]
    pub intake_capacity: usize,

    /// Number of images processed concurrently [default: 4 per CPU].
    #[arg(long, alias = "maximgprocs")]
    pub max_workers: Option<usize>,

    /// Number of colors reported per image.
    #[arg(short = 'k', long = "colors", default_value_t = pipeline::DEFAULT_TOP_COLORS)]
    pub top_colors: usize,

    /// Include error messages in the output instead of `ERR`.
    #[arg(short = 'e', long)]
    pub show_errors: bool,

    /// Decode HTTP response bodies as base64 before decoding the image.
    #[arg(long)]
    pub remote_base64: bool,

    /// Log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Image paths or URLs, used when no input file is given.
    #[arg(value_name = "REFERENCE", conflicts_with = "input")]
    pub references: Vec<String>,
}

impl Cli {
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        if self.input.is_none() && self.references.is_empty() {
            return Err(ConfigError::NoInput);
        }

        let config = PipelineConfig {
            intake_capacity: self.intake_capacity,
            max_workers: self.max_workers.unwrap_or_else(pipeline::default_max_workers),
            top_colors: self.top_colors,
            failure_rendering: if self.show_errors {
                FailureRendering::Descriptive
            } else {
                FailureRendering::Marker
            },
            remote_base64: self.remote_base64,
        };
        config.validate()?;
        Ok(config)
    }
}
