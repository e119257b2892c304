//! Background matching runtime.
//!
//! Fuzzy matching a large column is CPU bound and must not block the thread
//! serving the interface. [`MatchRuntime`] owns one worker thread fed through a
//! bounded channel. Each submission is a one-shot job: the JSON-encoded
//! [`BatchRequest`] goes in, the JSON-encoded response comes back on a
//! dedicated reply channel held by the caller's [`BatchHandle`].
//!
//! Only the latest submission matters. Every submit discards the jobs still
//! queued and bumps a generation counter, so the worker also skips a job that
//! was dequeued concurrently. Handles of discarded jobs report a disconnect,
//! which nobody is waiting on.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::protocol::{self, BatchRequest};
use crate::config::{MatcherConfig, RuntimeConfig};
use crate::error::{TownError, TownResult};
use crate::verdict::Verdict;

/// Identifier of one processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Reply = TownResult<Vec<u8>>;

enum Job {
    Match {
        run_id: RunId,
        generation: u64,
        request: Vec<u8>,
        reply: Sender<Reply>,
    },

    #[cfg(test)]
    Block {
        release: Receiver<()>,
        started: Sender<()>,
    },
}

/// Verdicts for one batch, keyed by cell text.
pub type VerdictMap = std::collections::HashMap<String, Verdict>;

/// Caller's end of a submitted batch.
pub struct BatchHandle {
    run_id: RunId,
    rx: Receiver<Reply>,
}

impl fmt::Debug for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchHandle").field("run_id", &self.run_id).finish_non_exhaustive()
    }
}

impl BatchHandle {
    /// The run this handle belongs to.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Waits for the worker's answer.
    ///
    /// # Errors
    ///
    /// Returns [`TownError::ProcessingFailed`] when the worker failed, dropped
    /// the job, or answered with an invalid response.
    pub fn join(self) -> TownResult<VerdictMap> {
        let bytes = self.rx.recv().map_err(|_| disconnected(self.run_id))??;
        protocol::decode_response(&bytes)
    }

    /// Waits for the worker's answer for at most `timeout`.
    ///
    /// # Errors
    ///
    /// As [`Self::join`]; a timeout is also reported as
    /// [`TownError::ProcessingFailed`].
    pub fn join_timeout(self, timeout: Duration) -> TownResult<VerdictMap> {
        let bytes = self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => TownError::processing(format!(
                "run {} did not finish within {}ms",
                self.run_id,
                timeout.as_millis()
            )),
            RecvTimeoutError::Disconnected => disconnected(self.run_id),
        })??;
        protocol::decode_response(&bytes)
    }

    /// Returns the answer if it has arrived, without blocking.
    ///
    /// # Errors
    ///
    /// As [`Self::join`].
    pub fn try_result(&self) -> TownResult<Option<VerdictMap>> {
        match self.rx.try_recv() {
            Ok(reply) => protocol::decode_response(&reply?).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected(self.run_id)),
        }
    }
}

fn disconnected(run_id: RunId) -> TownError {
    TownError::processing(format!("worker dropped run {run_id}"))
}

/// Owns the matching worker thread.
pub struct MatchRuntime {
    tx: Option<Sender<Job>>,
    // Submitter's end of the queue, used to discard superseded jobs.
    queued: Receiver<Job>,
    worker: Option<JoinHandle<()>>,
    generation: Arc<AtomicU64>,
    queue_capacity: usize,
}

impl fmt::Debug for MatchRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchRuntime")
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

impl MatchRuntime {
    /// Starts the worker thread.
    #[must_use]
    pub fn start(config: &RuntimeConfig, matcher: MatcherConfig) -> Self {
        let queue_capacity = config.queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);
        let generation = Arc::new(AtomicU64::new(0));

        let latest = Arc::clone(&generation);
        let queued = rx.clone();
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_loop(&rx, &latest, &matcher))
            .expect("failed to spawn townmatch worker");

        Self {
            tx: Some(tx),
            queued,
            worker: Some(worker),
            generation,
            queue_capacity,
        }
    }

    /// Submits a batch, superseding any earlier submission.
    ///
    /// # Errors
    ///
    /// Returns [`TownError::ProcessingFailed`] when the request cannot be
    /// encoded, the worker is gone, or concurrent submitters filled the queue.
    pub fn submit(&self, run_id: RunId, request: &BatchRequest) -> TownResult<BatchHandle> {
        let bytes = protocol::encode_request(request)?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let discarded = self.discard_queued();
        if discarded > 0 {
            tracing::debug!(%run_id, discarded, "discarded superseded batches");
        }
        let (reply, rx) = bounded::<Reply>(1);
        let job = Job::Match {
            run_id,
            generation,
            request: bytes,
            reply,
        };
        self.try_submit(job)?;
        tracing::debug!(%run_id, generation, values = request.unique_values.len(), "submitted batch");
        Ok(BatchHandle { run_id, rx })
    }

    fn try_submit(&self, job: Job) -> TownResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| TownError::processing("match runtime is shut down"))?;
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(TownError::processing(format!(
                "match queue is full (capacity {})",
                self.queue_capacity
            ))),
            Err(TrySendError::Disconnected(_)) => Err(TownError::processing("match worker is gone")),
        }
    }

    fn discard_queued(&self) -> usize {
        self.queued.try_iter().count()
    }

    #[cfg(test)]
    pub(crate) fn submit_block(&self) -> (Sender<()>, Receiver<()>) {
        let (release_tx, release) = bounded::<()>(1);
        let (started, started_rx) = bounded::<()>(1);
        self.try_submit(Job::Block { release, started }).unwrap();
        (release_tx, started_rx)
    }
}

impl Drop for MatchRuntime {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit.
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(rx: &Receiver<Job>, latest: &AtomicU64, matcher: &MatcherConfig) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Match {
                run_id,
                generation,
                request,
                reply,
            } => {
                if generation < latest.load(Ordering::SeqCst) {
                    tracing::debug!(%run_id, generation, "skipping superseded batch");
                    continue;
                }
                let result = panic::catch_unwind(AssertUnwindSafe(|| protocol::serve(&request, matcher)))
                    .unwrap_or_else(|_| {
                        tracing::warn!(%run_id, "matching panicked");
                        Err(TownError::processing(format!("matching panicked for run {run_id}")))
                    });
                // The caller may have abandoned the run.
                let _ = reply.send(result);
            }

            #[cfg(test)]
            Job::Block { release, started } => {
                let _ = started.send(());
                let _ = release.recv();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::directory::DirectoryPayload;
    use crate::verdict::BaseStatus;

    fn request(values: Vec<serde_json::Value>) -> BatchRequest {
        let lookup_data: DirectoryPayload = serde_json::from_value(json!({
            "towns": { "Burlington": { "geoid": "5000710675" } },
            "aliases": { "burlington": "Burlington" }
        }))
        .unwrap();
        BatchRequest {
            unique_values: values,
            lookup_data,
        }
    }

    fn runtime(queue_capacity: usize) -> MatchRuntime {
        MatchRuntime::start(
            &RuntimeConfig {
                queue_capacity,
                ..RuntimeConfig::default()
            },
            MatcherConfig::default(),
        )
    }

    #[test]
    fn resolves_on_worker() {
        let rt = runtime(4);
        let handle = rt.submit(RunId::new(), &request(vec![json!("Burlingten"), json!("Zzyzx")])).unwrap();
        let verdicts = handle.join_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(verdicts["Burlingten"].status(), BaseStatus::Fuzzy);
        assert_eq!(verdicts["Zzyzx"].status(), BaseStatus::NotFound);
    }

    #[test]
    fn try_result_is_non_blocking() {
        let rt = runtime(4);
        let (release, started) = rt.submit_block();
        started.recv_timeout(Duration::from_secs(5)).unwrap();

        let handle = rt.submit(RunId::new(), &request(vec![json!("Burlington")])).unwrap();
        assert!(handle.try_result().unwrap().is_none());

        release.send(()).unwrap();
        let verdicts = handle.join_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(verdicts["Burlington"].status(), BaseStatus::Exact);
    }

    #[test]
    fn superseded_run_is_dropped() {
        let rt = runtime(4);
        let (release, started) = rt.submit_block();
        started.recv_timeout(Duration::from_secs(5)).unwrap();

        let stale = rt.submit(RunId::new(), &request(vec![json!("Burlington")])).unwrap();
        let fresh = rt.submit(RunId::new(), &request(vec![json!("Burlington")])).unwrap();
        release.send(()).unwrap();

        assert!(fresh.join_timeout(Duration::from_secs(5)).is_ok());
        let err = stale.join_timeout(Duration::from_secs(5)).unwrap_err();
        assert!(err.is_processing_failed());
    }

    #[test]
    fn restarts_beyond_queue_capacity_are_accepted() {
        let rt = runtime(2);
        let (release, started) = rt.submit_block();
        started.recv_timeout(Duration::from_secs(5)).unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            handles.push(rt.submit(RunId::new(), &request(vec![json!("Burlington")])).unwrap());
        }
        release.send(()).unwrap();

        let latest = handles.pop().unwrap();
        let verdicts = latest.join_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(verdicts["Burlington"].status(), BaseStatus::Exact);
        for stale in handles {
            let err = stale.join_timeout(Duration::from_secs(5)).unwrap_err();
            assert!(err.is_processing_failed());
        }
    }

    #[test]
    fn shut_down_runtime_rejects_work() {
        let mut rt = runtime(1);
        drop(rt.tx.take());
        let err = rt.submit(RunId::new(), &request(vec![json!("Burlington")])).unwrap_err();
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("shut down"));
    }

    #[test]
    fn join_reports_disconnected_when_reply_sender_dropped() {
        let (tx, rx) = bounded::<Reply>(1);
        drop(tx);
        let handle = BatchHandle { run_id: RunId::new(), rx };
        let err = handle.join().unwrap_err();
        assert!(err.is_processing_failed());
    }

    #[test]
    fn worker_error_is_forwarded() {
        let (tx, rx) = bounded::<Reply>(1);
        tx.send(Err(TownError::processing("boom"))).unwrap();
        let handle = BatchHandle { run_id: RunId::new(), rx };
        let err = handle.join().unwrap_err();
        assert!(format!("{err}").contains("boom"));
    }

    #[test]
    fn drop_joins_worker() {
        let rt = runtime(2);
        let handle = rt.submit(RunId::new(), &request(vec![json!("Burlington")])).unwrap();
        drop(rt);
        // The queued job was drained before the worker exited.
        assert!(handle.join().is_ok());
    }
}
