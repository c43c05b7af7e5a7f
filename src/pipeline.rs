// THEORY:
// The `pipeline` module is the top-level API of the crate. It owns one run of the
// staged flow: references come in through a bounded queue, are fanned out to
// workers by the `WorkerPool`, and come back as `Outcome`s in whatever order the
// workers finish.
//
// Key architectural principles:
// 1.  **Backpressure at the Door**: The intake queue has a fixed capacity. When
//     dispatch falls behind, the intake loop waits instead of reading further
//     ahead in the source.
// 2.  **Failures Are Data**: A reference that cannot be fetched or decoded becomes
//     a `Failure` outcome and travels the same channel as a success. Only the
//     source or the sink can end a run early.
// 3.  **Counted Shutdown**: Every worker holds a clone of the outcome sender and
//     the dispatch loop drops its own once the intake queue is drained, so the
//     aggregation loop sees the channel close exactly when the last outcome has
//     been delivered. An atomic in-flight counter mirrors that count for
//     observers.
// 4.  **Explicit Configuration**: Everything tunable lives in `PipelineConfig`,
//     validated once before any task is spawned.

use crate::core_modules::color_summarizer::{ColorSummarizer, TopColors};
use crate::core_modules::image_resolver::{ImageResolver, Resolve};
use crate::core_modules::outcome_sink::OutcomeSink;
use crate::core_modules::reference_source::ReferenceSource;
use crate::error::{ConfigError, PipelineError, SourceError};
use crate::parallel_pipeline::WorkerPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

pub const DEFAULT_INTAKE_CAPACITY: usize = 400;
pub const DEFAULT_TOP_COLORS: usize = 3;
const WORKERS_PER_CPU: usize = 4;

/// The line written in place of a failure's description when errors are hidden.
pub const FAILURE_MARKER: &str = "ERR";

/// How a failed reference is rendered by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureRendering {
    /// Write the error's description.
    Descriptive,
    /// Write `ERR`.
    #[default]
    Marker,
}

/// Configuration for a `Pipeline`, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of the bounded queue between the source and the dispatch loop.
    pub intake_capacity: usize,
    /// Maximum number of workers resolving or summarizing at the same time.
    pub max_workers: usize,
    /// Number of colors reported per image (K).
    pub top_colors: usize,
    pub failure_rendering: FailureRendering,
    /// Treat HTTP bodies as base64 text and decode them before the image decoder.
    pub remote_base64: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            max_workers: default_max_workers(),
            top_colors: DEFAULT_TOP_COLORS,
            failure_rendering: FailureRendering::default(),
            remote_base64: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake_capacity == 0 {
            return Err(ConfigError::Zero("intake capacity"));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Zero("max workers"));
        }
        if self.top_colors == 0 {
            return Err(ConfigError::Zero("top colors"));
        }
        Ok(())
    }
}

pub fn default_max_workers() -> usize {
    num_cpus::get().max(1) * WORKERS_PER_CPU
}

/// The result of processing one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { reference: String, colors: TopColors },
    Failure { reference: String, error: String },
}

impl Outcome {
    pub fn reference(&self) -> &str {
        match self {
            Outcome::Success { reference, .. } | Outcome::Failure { reference, .. } => reference,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }
}

/// Where a run currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Created but not yet run.
    #[default]
    Idle,
    /// Reading references; nothing dispatched yet.
    Intaking,
    /// At least one worker has been spawned.
    Dispatching,
    /// The intake queue is closed and drained; waiting on outstanding workers.
    Draining,
    /// Every outcome has been delivered.
    Closed,
}

/// Counts collected by the aggregation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &Outcome) {
        if outcome.is_failure() {
            self.failed += 1;
        } else {
            self.succeeded += 1;
        }
    }

    pub fn delivered(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// The main, top-level struct of the crate.
pub struct Pipeline<R> {
    config: PipelineConfig,
    resolver: Arc<R>,
    state: Arc<watch::Sender<PipelineState>>,
}

impl Pipeline<ImageResolver> {
    /// Builds a pipeline that resolves files from disk and URLs over HTTP.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        let resolver = ImageResolver::new(config.remote_base64);
        Self::new(config, resolver)
    }
}

impl<R> Pipeline<R>
where
    R: Resolve + 'static,
{
    pub fn new(config: PipelineConfig, resolver: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let (state, _) = watch::channel(PipelineState::Idle);
        Ok(Self {
            config,
            resolver: Arc::new(resolver),
            state: Arc::new(state),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Observe state transitions of the current or next run.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Processes every reference from `source`, writing each outcome to `sink` in
    /// completion order.
    ///
    /// A source error stops intake; the outcomes of references already dispatched
    /// are still written before the error is returned.
    pub async fn run<S, K>(&self, source: S, sink: &mut K) -> Result<RunSummary, PipelineError>
    where
        S: ReferenceSource + 'static,
        K: OutcomeSink + ?Sized,
    {
        info!(
            intake_capacity = self.config.intake_capacity,
            max_workers = self.config.max_workers,
            top_colors = self.config.top_colors,
            "pipeline starting"
        );
        self.state.send_replace(PipelineState::Intaking);

        let (reference_tx, reference_rx) = mpsc::channel(self.config.intake_capacity);
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let pool = WorkerPool::new(
            Arc::clone(&self.resolver),
            ColorSummarizer::new(self.config.top_colors),
            self.config.max_workers,
            outcome_tx,
            Arc::clone(&in_flight),
            Arc::clone(&self.state),
        );
        let intake = tokio::spawn(intake(source, reference_tx));
        let dispatch = tokio::spawn(pool.dispatch(reference_rx));

        let mut summary = RunSummary::default();
        while let Some(outcome) = outcome_rx.recv().await {
            in_flight.fetch_sub(1, Ordering::AcqRel);
            summary.record(&outcome);
            if let Err(err) = sink.emit(&outcome) {
                error!(error = %err, "sink failed; aborting run");
                intake.abort();
                dispatch.abort();
                self.state.send_replace(PipelineState::Closed);
                return Err(PipelineError::Sink(err));
            }
        }
        let finished = sink.finish();

        let (intake_result, dispatched) = futures::future::join(intake, dispatch).await;

        let outstanding = in_flight.load(Ordering::Acquire);
        if outstanding != 0 {
            warn!(outstanding, "outcome channel closed with workers unaccounted for");
        }
        self.state.send_replace(PipelineState::Closed);
        summary.dispatched = dispatched?;
        info!(
            dispatched = summary.dispatched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "pipeline closed"
        );

        finished.map_err(PipelineError::Sink)?;
        intake_result??;
        Ok(summary)
    }
}

/// Moves references from `source` into the intake queue until the source is
/// exhausted, fails, or the dispatch side hangs up.
///
/// Dropping `references` on return closes the queue; dropping `source` releases
/// whatever handle it holds.
pub async fn intake<S>(mut source: S, references: mpsc::Sender<String>) -> Result<u64, SourceError>
where
    S: ReferenceSource,
{
    let mut accepted = 0;
    loop {
        match source.next_reference().await {
            Ok(Some(reference)) => {
                if references.send(reference).await.is_err() {
                    debug!("dispatch loop stopped; ending intake");
                    break;
                }
                accepted += 1;
            }
            Ok(None) => break,
            Err(err) => {
                error!(error = %err, accepted, "reference source failed; closing intake");
                return Err(err);
            }
        }
    }
    debug!(accepted, "intake exhausted");
    Ok(accepted)
}
