//! Human overrides layered over matcher verdicts.
//!
//! A [`ResolutionState`] pairs the immutable records of one processing run with
//! a table of overrides keyed by row index. Transitions never mutate: each one
//! returns a new state sharing whatever did not change. The displayed value of
//! a row is either its base verdict or its override, never a mix of the two.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::batch::ResultRecord;
use crate::directory::DirectoryIndex;
use crate::error::OverrideError;
use crate::verdict::{BaseStatus, Status};

/// Which override transition produced an [`Override`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideKind {
    /// Free assignment to any row; the town may be empty.
    Manual,
    /// Picking one candidate of an ambiguous row.
    Resolved,
}

impl OverrideKind {
    /// Display status for rows carrying this override.
    #[must_use]
    pub const fn status(self) -> Status {
        match self {
            Self::Manual => Status::Manual,
            Self::Resolved => Status::Resolved,
        }
    }
}

/// A human decision for one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    /// How the decision was made.
    pub kind: OverrideKind,
    /// Chosen official name.
    pub town: String,
    /// GEOID looked up when the override was applied; empty if unknown.
    pub geoid: String,
}

/// What the interface shows for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayedRecord<'a> {
    /// Row index.
    pub index: usize,
    /// Text of the selected cell.
    pub raw_value: &'a str,
    /// The row's original cells.
    pub row: &'a [Value],
    /// Base status or override status.
    pub status: Status,
    /// Official name shown.
    pub official: &'a str,
    /// GEOID shown.
    pub geoid: &'a str,
    /// Candidates; empty once an override applies.
    pub options: &'a [String],
}

/// Records of one run plus the overrides applied to them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionState {
    records: Arc<[ResultRecord]>,
    overrides: Arc<BTreeMap<usize, Override>>,
}

impl Default for ResolutionState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ResolutionState {
    /// Starts a state with no overrides.
    ///
    /// Records are addressed by [`ResultRecord::index`], not by position, and
    /// are kept sorted by it. When two records share an index the first one
    /// wins.
    #[must_use]
    pub fn new(mut records: Vec<ResultRecord>) -> Self {
        records.sort_by_key(|r| r.index);
        let total = records.len();
        records.dedup_by_key(|r| r.index);
        if records.len() < total {
            tracing::warn!(dropped = total - records.len(), "records with duplicate row index dropped");
        }
        Self {
            records: records.into(),
            overrides: Arc::default(),
        }
    }

    /// The run's records, sorted by row index.
    #[must_use]
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when the run had no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The override on row `index`, if any.
    #[must_use]
    pub fn override_at(&self, index: usize) -> Option<&Override> {
        self.overrides.get(&index)
    }

    /// Number of rows carrying an override.
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Assigns `town` to row `index`, replacing any earlier override.
    ///
    /// The GEOID is looked up in `directory`; a town the directory does not
    /// know (including the empty string) gets an empty GEOID.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::RowNotFound`] for an out-of-range index and
    /// [`OverrideError::NotAmbiguous`] when `kind` is
    /// [`OverrideKind::Resolved`] on a row whose base status is not ambiguous.
    pub fn apply_override(
        &self,
        directory: &DirectoryIndex,
        index: usize,
        town: &str,
        kind: OverrideKind,
    ) -> Result<Self, OverrideError> {
        let record = self.record(index)?;
        let base = record.base.status();
        if kind == OverrideKind::Resolved && base != BaseStatus::Ambiguous {
            return Err(OverrideError::NotAmbiguous { index, status: base });
        }

        let geoid = directory.geoid_of(town).to_string();
        if geoid.is_empty() && !town.is_empty() {
            tracing::debug!(index, town, "override target not in directory");
        }

        let mut overrides = (*self.overrides).clone();
        overrides.insert(
            index,
            Override {
                kind,
                town: town.to_string(),
                geoid,
            },
        );
        Ok(Self {
            records: Arc::clone(&self.records),
            overrides: Arc::new(overrides),
        })
    }

    /// Removes the override on row `index`; a row without one is left as is.
    ///
    /// # Errors
    ///
    /// Returns [`OverrideError::RowNotFound`] for an out-of-range index.
    pub fn clear_override(&self, index: usize) -> Result<Self, OverrideError> {
        self.record(index)?;
        if !self.overrides.contains_key(&index) {
            return Ok(self.clone());
        }
        let mut overrides = (*self.overrides).clone();
        overrides.remove(&index);
        Ok(Self {
            records: Arc::clone(&self.records),
            overrides: Arc::new(overrides),
        })
    }

    /// What row `index` displays, or `None` when out of range.
    #[must_use]
    pub fn displayed(&self, index: usize) -> Option<DisplayedRecord<'_>> {
        self.position(index).map(|pos| self.project(&self.records[pos]))
    }

    /// Every row's displayed value, by row index.
    pub fn iter_displayed(&self) -> impl Iterator<Item = DisplayedRecord<'_>> + '_ {
        self.records.iter().map(|record| self.project(record))
    }

    fn project<'a>(&'a self, record: &'a ResultRecord) -> DisplayedRecord<'a> {
        match self.overrides.get(&record.index) {
            Some(ov) => DisplayedRecord {
                index: record.index,
                raw_value: &record.raw_value,
                row: &record.row,
                status: ov.kind.status(),
                official: &ov.town,
                geoid: &ov.geoid,
                options: &[],
            },
            None => DisplayedRecord {
                index: record.index,
                raw_value: &record.raw_value,
                row: &record.row,
                status: record.base.status().into(),
                official: record.base.official(),
                geoid: record.base.geoid(),
                options: record.base.options(),
            },
        }
    }

    fn position(&self, index: usize) -> Option<usize> {
        self.records.binary_search_by_key(&index, |r| r.index).ok()
    }

    fn record(&self, index: usize) -> Result<&ResultRecord, OverrideError> {
        self.position(index)
            .map(|pos| &self.records[pos])
            .ok_or(OverrideError::RowNotFound {
                index,
                rows: self.records.len(),
            })
    }
}
