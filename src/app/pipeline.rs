//! One pull: fetch, merge with stored history, persist, format.
//!
//! The store is written at most once per run and only with a fully merged
//! dataset. Fetch and store failures abort before that write; a formatting
//! failure after it is logged and tolerated.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Batch, CaptureTime, Period};
use crate::fetcher::{FetchError, FetchOutcome, TrendsRequest, TrendsSource};
use crate::merger;
use crate::presenter::Presenter;
use crate::store::{DatasetStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Fetching,
    Merging,
    Persisting,
    Formatting,
    Done,
    Failed,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Fetching => "fetching",
            RunStage::Merging => "merging",
            RunStage::Persisting => "persisting",
            RunStage::Formatting => "formatting",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RunError {
    pub fn category(&self) -> &'static str {
        match self {
            RunError::Fetch(_) => "fetch",
            RunError::Store(_) => "store",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Fetch(err) => err.kind(),
            RunError::Store(err) => err.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub location: String,
    pub fetched_rows: usize,
    pub partial_rows: usize,
    /// First and last period of this run's fetch.
    pub fetched_range: Option<(Period, Period)>,
    /// `None` on the first run.
    pub previous_rows: Option<usize>,
    pub total_rows: usize,
    pub duplicates_removed: usize,
    pub captured_at: CaptureTime,
    pub formatted: bool,
}

type Clock = Arc<dyn Fn() -> CaptureTime + Send + Sync>;

pub struct Pipeline {
    source: Arc<dyn TrendsSource>,
    store: Arc<dyn DatasetStore>,
    presenter: Arc<dyn Presenter>,
    request: TrendsRequest,
    table: String,
    clock: Clock,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn TrendsSource>,
        store: Arc<dyn DatasetStore>,
        presenter: Arc<dyn Presenter>,
        request: TrendsRequest,
        table: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            presenter,
            request,
            table: table.into(),
            clock: Arc::new(CaptureTime::now),
        }
    }

    /// Replaces the wall clock used to stamp batches.
    pub fn with_clock(mut self, clock: impl Fn() -> CaptureTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        let result = self.execute().await;
        match &result {
            Ok(_) => enter(RunStage::Done),
            Err(err) => {
                enter(RunStage::Failed);
                debug!(category = err.category(), kind = err.kind(), "run aborted");
            }
        }
        result
    }

    async fn execute(&self) -> Result<RunReport, RunError> {
        enter(RunStage::Fetching);
        info!(queries = %self.request.terms.join(", "), "requesting data from the trends service");
        let table = match self.source.fetch(&self.request).await? {
            FetchOutcome::Table(table) => table,
            FetchOutcome::Empty => return Err(FetchError::EmptyResult.into()),
        };
        let fetched_range = table.period_range();
        let partial_rows = table.partial_rows();
        let batch = Batch::stamp(table, (self.clock)()).ok_or(FetchError::EmptyResult)?;
        info!(points = batch.len(), partial = partial_rows, "retrieved data points");

        enter(RunStage::Merging);
        let existing = self.store.read(&self.table)?;
        if let Some(stored) = &existing {
            if stored.terms() != batch.terms() {
                return Err(StoreError::SchemaMismatch {
                    stored: stored.terms().to_vec(),
                    configured: batch.terms().to_vec(),
                }
                .into());
            }
            info!(rows = stored.len(), "existing data found, updating with new data");
        } else {
            info!("no existing data, creating new table");
        }

        let outcome = merger::merge(existing.as_ref(), &batch);
        if outcome.discarded > 0 {
            info!(removed = outcome.discarded, "removed duplicate entries");
        }

        enter(RunStage::Persisting);
        self.store.write(&self.table, &outcome.dataset)?;
        info!(location = %self.store.location(), rows = outcome.dataset.len(), "dataset written");

        enter(RunStage::Formatting);
        let formatted = match self.presenter.format(&self.table) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "formatting failed; data is already saved");
                false
            }
        };

        Ok(RunReport {
            location: self.store.location(),
            fetched_rows: batch.len(),
            partial_rows,
            fetched_range,
            previous_rows: existing.as_ref().map(|dataset| dataset.len()),
            total_rows: outcome.dataset.len(),
            duplicates_removed: outcome.discarded,
            captured_at: batch.captured_at(),
            formatted,
        })
    }
}

fn enter(stage: RunStage) {
    debug!(%stage, "pipeline stage");
}
