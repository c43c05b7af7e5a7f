use crate::core_modules::color_summarizer::ColorSummarizer;
use crate::core_modules::image_resolver::Resolve;
use crate::error::describe;
use crate::pipeline::{Outcome, PipelineState};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch};
use tracing::{debug, info, warn};

/// Fans references out to concurrently running workers.
///
/// Admission is bounded twice: by the intake queue the pool reads from and by a
/// semaphore holding `max_workers` permits. A permit is held from the moment a
/// worker is spawned until it has produced its outcome.
pub struct WorkerPool<R> {
    resolver: Arc<R>,
    summarizer: ColorSummarizer,
    permits: Arc<Semaphore>,
    outcome_sender: mpsc::UnboundedSender<Outcome>,
    in_flight: Arc<AtomicUsize>,
    state: Arc<watch::Sender<PipelineState>>,
}

impl<R> WorkerPool<R>
where
    R: Resolve + 'static,
{
    pub fn new(
        resolver: Arc<R>,
        summarizer: ColorSummarizer,
        max_workers: usize,
        outcome_sender: mpsc::UnboundedSender<Outcome>,
        in_flight: Arc<AtomicUsize>,
        state: Arc<watch::Sender<PipelineState>>,
    ) -> Self {
        Self {
            resolver,
            summarizer,
            permits: Arc::new(Semaphore::new(max_workers)),
            outcome_sender,
            in_flight,
            state,
        }
    }

    /// The dispatch loop. Runs until the intake queue is closed and drained, then
    /// drops the pool's own outcome sender and returns the number of references
    /// dispatched.
    pub async fn dispatch(self, mut references: mpsc::Receiver<String>) -> u64 {
        let mut dispatched = 0;
        while let Some(reference) = references.recv().await {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                warn!("worker permits closed; dropping remaining references");
                break;
            };
            if dispatched == 0 {
                self.state.send_replace(PipelineState::Dispatching);
            }
            self.in_flight.fetch_add(1, Ordering::AcqRel);
            self.spawn_worker(reference, permit);
            dispatched += 1;
        }

        self.state.send_replace(PipelineState::Draining);
        info!(dispatched, in_flight = self.in_flight.load(Ordering::Acquire), "intake drained");
        dispatched
    }

    fn spawn_worker(&self, reference: String, permit: OwnedSemaphorePermit) {
        let resolver = Arc::clone(&self.resolver);
        let summarizer = self.summarizer;
        let outcome_sender = self.outcome_sender.clone();

        tokio::spawn(async move {
            let outcome = process_reference(resolver.as_ref(), summarizer, reference).await;
            drop(permit);
            if outcome_sender.send(outcome).is_err() {
                debug!("aggregation loop gone; outcome discarded");
            }
        });
    }
}

/// Resolves one reference and, if that succeeds, summarizes it. Never fails:
/// every error is folded into a `Failure` outcome.
pub async fn process_reference<R>(
    resolver: &R,
    summarizer: ColorSummarizer,
    reference: String,
) -> Outcome
where
    R: Resolve + ?Sized,
{
    let raster = match resolver.resolve(&reference).await {
        Ok(raster) => raster,
        Err(err) => {
            let error = describe(&err);
            debug!(%reference, %error, "failed to resolve image");
            return Outcome::Failure { error, reference };
        }
    };

    match tokio::task::spawn_blocking(move || summarizer.summarize(&raster)).await {
        Ok(colors) => {
            debug!(%reference, colors = %colors.render(), "summarized image");
            Outcome::Success { reference, colors }
        }
        Err(err) => {
            warn!(%reference, error = %err, "summarizer task failed");
            Outcome::Failure {
                error: format!("summarizer task failed: {err}"),
                reference,
            }
        }
    }
}
