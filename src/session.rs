//! Interactive resolution session.
//!
//! A [`Session`] ties the pieces together for one user: the directory loaded
//! at startup, the background [`MatchRuntime`], the run currently being
//! processed and the last completed run with its overrides.
//!
//! ```text
//! start_run ──► pending ──wait/poll──► current ──apply/clear──► current'
//!                  │                      │
//!                  └──── reset ───────────┴──► empty
//! ```
//!
//! Starting a run supersedes any pending one. A completed run replaces the
//! previous run together with its overrides; a failed run leaves the previous
//! run untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::batch::protocol::BatchRequest;
use crate::batch::{self, PreparedBatch, ResultRecord, Row};
use crate::config::EngineConfig;
use crate::directory::{DirectoryIndex, DirectoryPayload};
use crate::error::{OverrideError, TownResult};
use crate::matcher::Matcher;
use crate::resolution::{OverrideKind, ResolutionState};
use crate::runtime::{BatchHandle, MatchRuntime, RunId, VerdictMap};

/// Bookkeeping for one processing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMeta {
    /// Run identifier.
    pub run_id: RunId,
    /// Selected column.
    pub column: String,
    /// When the run was started.
    pub started_at: DateTime<Utc>,
    /// When the run completed; `None` while pending.
    pub finished_at: Option<DateTime<Utc>>,
    /// Fingerprint of the directory the run matched against.
    pub directory_fingerprint: String,
    /// Number of data rows.
    pub rows: usize,
    /// Number of distinct values in the column.
    pub distinct_values: usize,
}

/// A completed run and its overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRun {
    /// Run bookkeeping.
    pub meta: RunMeta,
    /// Records and overrides.
    pub state: ResolutionState,
}

struct PendingRun {
    meta: RunMeta,
    batch: PreparedBatch,
    // `None` when there was nothing to match.
    handle: Option<BatchHandle>,
}

/// One user's resolution session.
pub struct Session {
    directory: Arc<DirectoryIndex>,
    snapshot: DirectoryPayload,
    matcher: Matcher,
    runtime: MatchRuntime,
    pending: Option<PendingRun>,
    current: Option<CompletedRun>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("directory", &self.directory.fingerprint())
            .field("pending", &self.pending.as_ref().map(|p| p.meta.run_id))
            .field("current", &self.current.as_ref().map(|c| c.meta.run_id))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session and starts its matching worker.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TownError::Config`] when `config` fails validation.
    pub fn new(directory: DirectoryIndex, config: EngineConfig) -> TownResult<Self> {
        config.validate()?;
        let directory = Arc::new(directory);
        let snapshot = directory.snapshot();
        let matcher = Matcher::new(Arc::clone(&directory), config.matcher.clone());
        let runtime = MatchRuntime::start(&config.runtime, config.matcher);
        tracing::debug!(
            towns = directory.town_count(),
            aliases = directory.alias_count(),
            fingerprint = directory.fingerprint(),
            "session ready"
        );
        Ok(Self {
            directory,
            snapshot,
            matcher,
            runtime,
            pending: None,
            current: None,
        })
    }

    /// The session's directory.
    #[must_use]
    pub fn directory(&self) -> &DirectoryIndex {
        &self.directory
    }

    /// The matcher used for synchronous runs.
    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Starts processing `column` on the worker, superseding any pending run.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TownError::InvalidColumn`] before anything is submitted
    /// when the column is not in the header, or
    /// [`crate::TownError::ProcessingFailed`] when the worker rejects the job.
    pub fn start_run(&mut self, rows: Vec<Row>, column: &str) -> TownResult<RunId> {
        let batch = batch::prepare(rows, column)?;
        let meta = self.new_meta(&batch);
        let run_id = meta.run_id;

        let handle = if batch.is_empty() {
            None
        } else {
            let request = BatchRequest {
                unique_values: batch.unique_values().to_vec(),
                lookup_data: self.snapshot.clone(),
            };
            Some(self.runtime.submit(run_id, &request)?)
        };

        tracing::info!(%run_id, column, rows = meta.rows, distinct = meta.distinct_values, "run started");
        if let Some(stale) = self.pending.replace(PendingRun { meta, batch, handle }) {
            tracing::debug!(run_id = %stale.meta.run_id, "superseded pending run");
        }
        Ok(run_id)
    }

    /// Blocks until the pending run finishes and makes it current.
    ///
    /// Returns `None` when no run is pending.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TownError::ProcessingFailed`] when the worker failed;
    /// the pending run is dropped and the current run is kept.
    pub fn wait(&mut self) -> TownResult<Option<RunId>> {
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        let verdicts = match pending.handle {
            Some(handle) => handle.join(),
            None => Ok(VerdictMap::new()),
        };
        self.finish(pending.meta, pending.batch, verdicts).map(Some)
    }

    /// Completes the pending run if its answer has arrived, without blocking.
    ///
    /// Returns the run ID when a run completed during this call.
    ///
    /// # Errors
    ///
    /// As [`Self::wait`].
    pub fn poll(&mut self) -> TownResult<Option<RunId>> {
        let verdicts = match self.pending.as_ref().map(|p| p.handle.as_ref()) {
            None => return Ok(None),
            Some(None) => Ok(VerdictMap::new()),
            Some(Some(handle)) => match handle.try_result() {
                Ok(None) => return Ok(None),
                Ok(Some(verdicts)) => Ok(verdicts),
                Err(err) => Err(err),
            },
        };
        let Some(pending) = self.pending.take() else {
            return Ok(None);
        };
        self.finish(pending.meta, pending.batch, verdicts).map(Some)
    }

    /// Processes `column` on the calling thread and makes the result current.
    ///
    /// Any pending run is superseded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TownError::InvalidColumn`] when the column is not in
    /// the header.
    pub fn resolve_now(&mut self, rows: Vec<Row>, column: &str) -> TownResult<RunId> {
        let batch = batch::prepare(rows, column)?;
        let meta = self.new_meta(&batch);
        self.pending = None;
        tracing::info!(run_id = %meta.run_id, column, rows = meta.rows, "synchronous run started");
        let verdicts = batch::match_values(&self.matcher, batch.unique_values());
        self.finish(meta, batch, Ok(verdicts))
    }

    /// Whether a run is waiting on the worker.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The last completed run.
    #[must_use]
    pub fn current(&self) -> Option<&CompletedRun> {
        self.current.as_ref()
    }

    /// Applies an override to the current run.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::NoActiveRun`] without a completed run, or any
    /// error of [`ResolutionState::apply_override`].
    pub fn apply_override(
        &mut self,
        index: usize,
        town: &str,
        kind: OverrideKind,
    ) -> Result<&ResolutionState, OverrideError> {
        let current = self.current.as_mut().ok_or(OverrideError::NoActiveRun)?;
        current.state = current.state.apply_override(&self.directory, index, town, kind)?;
        tracing::debug!(index, town, ?kind, "override applied");
        Ok(&current.state)
    }

    /// Clears the override on one row of the current run.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::NoActiveRun`] without a completed run, or any
    /// error of [`ResolutionState::clear_override`].
    pub fn clear_override(&mut self, index: usize) -> Result<&ResolutionState, OverrideError> {
        let current = self.current.as_mut().ok_or(OverrideError::NoActiveRun)?;
        current.state = current.state.clear_override(index)?;
        Ok(&current.state)
    }

    /// Drops the current and pending runs.
    pub fn reset(&mut self) {
        if self.pending.is_some() || self.current.is_some() {
            tracing::info!("session reset");
        }
        self.pending = None;
        self.current = None;
    }

    fn new_meta(&self, batch: &PreparedBatch) -> RunMeta {
        RunMeta {
            run_id: RunId::new(),
            column: batch.column().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            directory_fingerprint: self.directory.fingerprint().to_string(),
            rows: batch.rows().len(),
            distinct_values: batch.unique_values().len(),
        }
    }

    fn finish(
        &mut self,
        mut meta: RunMeta,
        batch: PreparedBatch,
        verdicts: TownResult<VerdictMap>,
    ) -> TownResult<RunId> {
        let verdicts = verdicts.map_err(|err| {
            tracing::warn!(run_id = %meta.run_id, error = %err, "run failed; keeping previous results");
            err
        })?;
        let records: Vec<ResultRecord> = batch::project(batch, &verdicts);
        meta.finished_at = Some(Utc::now());
        let run_id = meta.run_id;
        tracing::info!(%run_id, rows = records.len(), "run finished");
        self.current = Some(CompletedRun {
            meta,
            state: ResolutionState::new(records),
        });
        Ok(run_id)
    }
}
