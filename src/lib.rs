// THEORY:
// This file is the entry point for the `top_colors` library crate. It exposes
// the `Pipeline` and its configuration as the high-level interface. The
// collaborators the pipeline is built from, the reference sources, the image
// resolver, the color summarizer and the outcome sinks, live in `core_modules`
// and are public so callers can swap any of them for their own.

pub mod cli;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use error::{ConfigError, PipelineError, ResolveError, SourceError};
pub use pipeline::{FailureRendering, Outcome, Pipeline, PipelineConfig, PipelineState, RunSummary};
