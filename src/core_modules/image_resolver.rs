// THEORY:
// The `ImageResolver` turns a reference string into a decoded raster. It sits on
// the boundary between the pipeline and the outside world, and its only promise
// to the pipeline is a `Result`: it never panics on bad input and never retries.
//
// Key architectural principles:
// 1.  **Closed Classification**: A reference is either `Remote` (an http or https
//     URL) or `Local` (everything else, treated as a path). The two variants share
//     a single capability, producing bytes, so adding a source means adding a
//     variant.
// 2.  **One Decoder**: Bytes from either variant go through the same
//     container-sniffing decoder. Animated containers yield their first frame.
// 3.  **Off the Reactor**: Decoding is CPU work and runs on the blocking pool so a
//     large JPEG cannot stall the tasks that are waiting on the network.

use crate::core_modules::pixel::{Raster, Rgba16Image};
use crate::error::ResolveError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageReader;
use std::io::Cursor;
use std::path::PathBuf;

/// The raster type every resolver hands to the summarizer.
pub type DecodedImage = Rgba16Image;

/// Turns references into rasters. Implementations must be shareable across workers.
#[async_trait]
pub trait Resolve: Send + Sync {
    type Output: Raster + Send + 'static;

    async fn resolve(&self, reference: &str) -> Result<Self::Output, ResolveError>;
}

/// Where the bytes for a reference come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    Local(PathBuf),
    Remote(String),
}

impl ReferenceKind {
    pub fn classify(reference: &str) -> Self {
        let lowered = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            Self::Remote(reference.to_owned())
        } else {
            Self::Local(PathBuf::from(reference))
        }
    }
}

/// Resolves local paths from disk and URLs over HTTP.
#[derive(Debug, Clone, Default)]
pub struct ImageResolver {
    client: reqwest::Client,
    remote_base64: bool,
}

impl ImageResolver {
    pub fn new(remote_base64: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            remote_base64,
        }
    }

    async fn fetch(&self, kind: ReferenceKind) -> Result<Vec<u8>, ResolveError> {
        let bytes = match kind {
            ReferenceKind::Local(path) => tokio::fs::read(&path)
                .await
                .map_err(|source| ResolveError::File { path, source })?,
            ReferenceKind::Remote(url) => {
                let http = |source| ResolveError::Http {
                    url: url.clone(),
                    source,
                };
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(http)?;
                let body = response.bytes().await.map_err(http)?;
                if self.remote_base64 {
                    STANDARD.decode(body.trim_ascii())?
                } else {
                    body.to_vec()
                }
            }
        };

        if bytes.is_empty() {
            return Err(ResolveError::EmptyBody);
        }
        Ok(bytes)
    }
}

/// Sniffs the container format and decodes the first frame.
pub fn decode(bytes: &[u8]) -> Result<DecodedImage, ResolveError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?;
    Ok(image.into_rgba16())
}

#[async_trait]
impl Resolve for ImageResolver {
    type Output = DecodedImage;

    async fn resolve(&self, reference: &str) -> Result<DecodedImage, ResolveError> {
        let bytes = self.fetch(ReferenceKind::classify(reference)).await?;
        tokio::task::spawn_blocking(move || decode(&bytes))
            .await
            .map_err(|err| ResolveError::Task(err.to_string()))?
    }
}
