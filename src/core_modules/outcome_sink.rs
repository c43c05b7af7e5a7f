use crate::pipeline::{FAILURE_MARKER, FailureRendering, Outcome};
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

pub const CONSOLE_SEPARATOR: char = ';';
pub const FILE_SEPARATOR: char = ',';

/// Receives outcomes from the aggregation loop, one at a time, in completion order.
pub trait OutcomeSink {
    fn emit(&mut self, outcome: &Outcome) -> io::Result<()>;

    /// Called once after the last outcome of a run.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<K: OutcomeSink + ?Sized> OutcomeSink for Box<K> {
    fn emit(&mut self, outcome: &Outcome) -> io::Result<()> {
        (**self).emit(outcome)
    }

    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Collects outcomes in memory.
impl OutcomeSink for Vec<Outcome> {
    fn emit(&mut self, outcome: &Outcome) -> io::Result<()> {
        self.push(outcome.clone());
        Ok(())
    }
}

/// Formats one outcome as `<reference><separator><colors or failure>`.
pub fn render_line(outcome: &Outcome, separator: char, failures: FailureRendering) -> String {
    match (outcome, failures) {
        (Outcome::Success { reference, colors }, _) => {
            format!("{reference}{separator}{}", colors.render())
        }
        (Outcome::Failure { reference, error }, FailureRendering::Descriptive) => {
            format!("{reference}{separator}{error}")
        }
        (Outcome::Failure { reference, .. }, FailureRendering::Marker) => {
            format!("{reference}{separator}{FAILURE_MARKER}")
        }
    }
}

/// Writes one line per outcome to any writer.
pub struct LineSink<W: Write> {
    writer: W,
    separator: char,
    failures: FailureRendering,
}

impl<W: Write> LineSink<W> {
    pub fn new(writer: W, separator: char, failures: FailureRendering) -> Self {
        Self {
            writer,
            separator,
            failures,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineSink<Stdout> {
    pub fn console(failures: FailureRendering) -> Self {
        Self::new(io::stdout(), CONSOLE_SEPARATOR, failures)
    }
}

impl LineSink<BufWriter<File>> {
    /// Creates (or truncates) a delimited output file.
    pub fn create(path: impl AsRef<Path>, failures: FailureRendering) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), FILE_SEPARATOR, failures))
    }
}

impl<W: Write> OutcomeSink for LineSink<W> {
    fn emit(&mut self, outcome: &Outcome) -> io::Result<()> {
        writeln!(self.writer, "{}", render_line(outcome, self.separator, self.failures))
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
