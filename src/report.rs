//! Summaries, review ordering and export formatting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::resolution::{DisplayedRecord, ResolutionState};
use crate::verdict::Status;

impl Status {
    /// Review priority; rows needing attention come first.
    #[must_use]
    pub const fn review_priority(self) -> u8 {
        match self {
            Self::Ambiguous => 0,
            Self::Fuzzy => 1,
            Self::NotFound => 2,
            Self::Manual => 3,
            Self::Resolved => 4,
            Self::Alias => 5,
            Self::Exact => 6,
        }
    }
}

/// Row counts per displayed status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Total rows.
    pub total: usize,
    /// Count per status; statuses with no rows are absent.
    pub by_status: BTreeMap<Status, usize>,
}

impl Summary {
    /// Counts the displayed statuses of `state`.
    #[must_use]
    pub fn of(state: &ResolutionState) -> Self {
        let mut summary = Self::default();
        for shown in state.iter_displayed() {
            summary.total += 1;
            *summary.by_status.entry(shown.status).or_insert(0) += 1;
        }
        summary
    }

    /// Rows with `status`.
    #[must_use]
    pub fn count(&self, status: Status) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Rows that still need a human decision.
    #[must_use]
    pub fn needs_review(&self) -> usize {
        self.count(Status::Ambiguous) + self.count(Status::Fuzzy) + self.count(Status::NotFound)
    }
}

/// Displayed rows, most urgent first. Ties keep row order.
#[must_use]
pub fn review_order(state: &ResolutionState) -> Vec<DisplayedRecord<'_>> {
    let mut rows: Vec<_> = state.iter_displayed().collect();
    rows.sort_by_key(|r| r.status.review_priority());
    rows
}

/// Row filter for the review table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Every row.
    #[default]
    All,
    /// Rows with exactly this status. The ambiguous filter also keeps rows
    /// that were ambiguous and have since been resolved.
    Only(Status),
}

impl StatusFilter {
    /// Whether `row` passes.
    #[must_use]
    pub fn accepts(self, row: &DisplayedRecord<'_>) -> bool {
        match self {
            Self::All => true,
            Self::Only(Status::Ambiguous) => matches!(row.status, Status::Ambiguous | Status::Resolved),
            Self::Only(status) => row.status == status,
        }
    }

    /// Applies the filter in review order.
    #[must_use]
    pub fn apply(self, state: &ResolutionState) -> Vec<DisplayedRecord<'_>> {
        review_order(state).into_iter().filter(|r| self.accepts(r)).collect()
    }
}

/// Casing of official names in exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Casing {
    /// `SAINT JOHNSBURY`
    #[default]
    Upper,
    /// `Saint Johnsbury`
    Mixed,
}

/// Upper-cases the first letter after the start, whitespace or a hyphen and
/// lower-cases the rest.
///
/// ```
/// assert_eq!(townmatch::report::title_case("BARRE-TOWN east"), "Barre-Town East");
/// ```
#[must_use]
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut boundary = true;
    for c in name.chars() {
        if boundary {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        boundary = c.is_whitespace() || c == '-';
    }
    out
}

/// Formats an official name for export.
#[must_use]
pub fn format_town(name: &str, casing: Casing) -> String {
    match casing {
        Casing::Upper => name.to_uppercase(),
        Casing::Mixed => title_case(name),
    }
}
