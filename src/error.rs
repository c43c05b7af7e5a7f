// THEORY:
// Errors are split by how far they are allowed to travel. A `ResolveError`
// belongs to exactly one image and never leaves its worker except as data
// inside a failure outcome. A `SourceError` ends intake but lets in-flight
// work finish. `ConfigError` is raised before any task is spawned, and
// `PipelineError` is what a whole run can fail with.

use std::io;
use std::path::PathBuf;

/// The reference source could not produce further references.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to open reference file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read reference stream")]
    Read(#[from] io::Error),

    #[error("reference is not valid ASCII/UTF-8: {0:?}")]
    InvalidEncoding(Vec<u8>),
}

/// One reference could not be turned into a raster.
///
/// Display text names only this layer; the underlying cause is reachable through
/// `source()`. Use [`describe`] for a single-line rendering of the whole chain.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to read {path}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("empty response body")]
    EmptyBody,

    #[error("remote payload is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to decode image")]
    Decode(#[from] image::ImageError),

    #[error("decoder task failed: {0}")]
    Task(String),
}

/// Invalid settings detected before the pipeline starts.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("either an input file or at least one reference is required")]
    NoInput,
}

/// A run of the pipeline failed as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reference source failed")]
    Source(#[from] SourceError),

    #[error("failed to write outcome")]
    Sink(#[source] io::Error),

    #[error("pipeline task panicked")]
    Task(#[from] tokio::task::JoinError),
}

/// Renders an error and every cause beneath it as `outer: inner: innermost`.
pub fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        cause = inner.source();
    }
    text
}
