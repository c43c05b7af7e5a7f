// THEORY:
// A `ReferenceSource` is the front door of the pipeline. It hands out image
// references one at a time to a single consumer, the intake loop, and says so
// plainly when it has nothing more to give.
//
// Key architectural principles:
// 1.  **Laziness**: Nothing is read ahead. The streaming variant pulls bytes from
//     its file only when asked for the next reference, so an enormous input file
//     costs no more memory than its longest reference.
// 2.  **Unambiguous Exhaustion**: `Ok(None)` means exhausted, forever.
//     `Ok(Some(_))` is always a non-empty reference. Any I/O failure is an `Err`
//     and ends intake.
// 3.  **Owned Handles**: The streaming variant owns its reader. Dropping the
//     source, which the intake loop does on every exit path, releases the file.

use crate::error::SourceError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncReadExt, BufReader};

const DELIMITER: u8 = b',';

/// Produces image references for the intake loop.
#[async_trait]
pub trait ReferenceSource: Send {
    /// Returns the next reference, or `None` once the source is exhausted.
    async fn next_reference(&mut self) -> Result<Option<String>, SourceError>;
}

#[async_trait]
impl<S: ReferenceSource + ?Sized> ReferenceSource for Box<S> {
    async fn next_reference(&mut self) -> Result<Option<String>, SourceError> {
        (**self).next_reference().await
    }
}

/// References held in memory, e.g. taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct ListSource {
    references: VecDeque<String>,
}

impl ListSource {
    pub fn new<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            references: references.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.references.len()
    }
}

#[async_trait]
impl ReferenceSource for ListSource {
    async fn next_reference(&mut self) -> Result<Option<String>, SourceError> {
        Ok(self.references.pop_front())
    }
}

/// References streamed from a comma-delimited ASCII file.
///
/// Newlines also separate references, surrounding whitespace is trimmed and
/// empty fields are skipped.
pub struct DelimitedSource<R> {
    reader: R,
    exhausted: bool,
}

impl DelimitedSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|source| SourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R> DelimitedSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            exhausted: false,
        }
    }

    /// Reads one raw field. `None` only at end of stream with nothing pending.
    async fn read_field(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let mut field = Vec::new();
        loop {
            match self.reader.read_u8().await {
                Ok(DELIMITER | b'\n' | b'\r') => return Ok(Some(field)),
                Ok(byte) => field.push(byte),
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    self.exhausted = true;
                    return Ok((!field.is_empty()).then_some(field));
                }
                Err(err) => return Err(SourceError::Read(err)),
            }
        }
    }
}

#[async_trait]
impl<R> ReferenceSource for DelimitedSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_reference(&mut self) -> Result<Option<String>, SourceError> {
        while !self.exhausted {
            let Some(field) = self.read_field().await? else {
                break;
            };
            let reference = String::from_utf8(field)
                .map_err(|err| SourceError::InvalidEncoding(err.into_bytes()))?;
            let reference = reference.trim();
            if !reference.is_empty() {
                return Ok(Some(reference.to_owned()));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, ReadBuf};

    async fn drain(source: &mut impl ReferenceSource) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(reference) = source.next_reference().await.unwrap() {
            out.push(reference);
        }
        out
    }

    #[tokio::test]
    async fn list_source_stays_exhausted() {
        let mut source = ListSource::new(["a.png", "b.png"]);
        assert_eq!(drain(&mut source).await, vec!["a.png", "b.png"]);
        for _ in 0..3 {
            assert!(source.next_reference().await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn delimited_source_splits_on_commas_and_newlines() {
        let input = "a.png,b.png\nhttp://x/c.jpg , d.gif\r\n";
        let mut source = DelimitedSource::new(Cursor::new(input.as_bytes().to_vec()));
        assert_eq!(
            drain(&mut source).await,
            vec!["a.png", "b.png", "http://x/c.jpg", "d.gif"]
        );
        assert!(source.next_reference().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_fields_do_not_end_the_stream() {
        let mut source = DelimitedSource::new(Cursor::new(b",,a.png,,,b.png,".to_vec()));
        assert_eq!(drain(&mut source).await, vec!["a.png", "b.png"]);
    }

    #[tokio::test]
    async fn empty_file_is_exhausted_immediately() {
        let mut source = DelimitedSource::new(Cursor::new(Vec::new()));
        assert!(source.next_reference().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn last_field_without_trailing_delimiter_is_returned() {
        let mut source = DelimitedSource::new(Cursor::new(b"only.png".to_vec()));
        assert_eq!(source.next_reference().await.unwrap().as_deref(), Some("only.png"));
        assert!(source.next_reference().await.unwrap().is_none());
    }

    struct FailingReader {
        served: bool,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if self.served {
                return Poll::Ready(Err(std::io::Error::other("disk on fire")));
            }
            self.served = true;
            buf.put_slice(b"a.png,b.p");
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn read_errors_are_fatal() {
        let mut source = DelimitedSource::new(BufReader::new(FailingReader { served: false }));
        assert_eq!(source.next_reference().await.unwrap().as_deref(), Some("a.png"));
        assert!(matches!(source.next_reference().await, Err(SourceError::Read(_))));
    }

    #[tokio::test]
    async fn boxed_sources_delegate() {
        let mut source: Box<dyn ReferenceSource> = Box::new(ListSource::new(["x.png"]));
        assert_eq!(drain(&mut source).await, vec!["x.png"]);
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let result = DelimitedSource::open("/definitely/not/here.csv").await;
        assert!(matches!(result, Err(SourceError::Open { .. })));
    }
}
