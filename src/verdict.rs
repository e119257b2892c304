//! Resolution statuses and verdicts.
//!
//! A [`Verdict`] is the matcher's base-layer answer for one raw value. Its
//! constructors keep `status == Ambiguous` and "options non-empty" in lockstep,
//! so no code path can build a verdict that breaks that invariant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status produced by the matcher. These are terminal: only a human override
/// changes what is displayed for a row, never the base status itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseStatus {
    /// Cleaned key equals the official name.
    Exact,
    /// Cleaned key is a known alias of the official name.
    Alias,
    /// Approximate match above the acceptance threshold.
    Fuzzy,
    /// Key maps to more than one municipality.
    Ambiguous,
    /// No match.
    NotFound,
}

impl BaseStatus {
    /// All base statuses, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Exact,
        Self::Alias,
        Self::Fuzzy,
        Self::Ambiguous,
        Self::NotFound,
    ];

    /// Returns the snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Alias => "alias",
            Self::Fuzzy => "fuzzy",
            Self::Ambiguous => "ambiguous",
            Self::NotFound => "not_found",
        }
    }

    /// Returns true for statuses that carry an official town.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Exact | Self::Alias | Self::Fuzzy)
    }
}

impl fmt::Display for BaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shown for a row: the base status, or one of the two override states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// See [`BaseStatus::Exact`].
    Exact,
    /// See [`BaseStatus::Alias`].
    Alias,
    /// See [`BaseStatus::Fuzzy`].
    Fuzzy,
    /// See [`BaseStatus::Ambiguous`].
    Ambiguous,
    /// See [`BaseStatus::NotFound`].
    NotFound,
    /// A human assigned the town (or blanked it).
    Manual,
    /// A human picked one of the ambiguous options.
    Resolved,
}

impl Status {
    /// All display statuses, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Exact,
        Self::Alias,
        Self::Fuzzy,
        Self::Ambiguous,
        Self::NotFound,
        Self::Manual,
        Self::Resolved,
    ];

    /// Returns the snake_case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Alias => "alias",
            Self::Fuzzy => "fuzzy",
            Self::Ambiguous => "ambiguous",
            Self::NotFound => "not_found",
            Self::Manual => "manual",
            Self::Resolved => "resolved",
        }
    }

    /// Returns true for the override states.
    #[must_use]
    pub const fn is_override(self) -> bool {
        matches!(self, Self::Manual | Self::Resolved)
    }
}

impl From<BaseStatus> for Status {
    fn from(status: BaseStatus) -> Self {
        match status {
            BaseStatus::Exact => Self::Exact,
            BaseStatus::Alias => Self::Alias,
            BaseStatus::Fuzzy => Self::Fuzzy,
            BaseStatus::Ambiguous => Self::Ambiguous,
            BaseStatus::NotFound => Self::NotFound,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The matcher's answer for one raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    status: BaseStatus,
    official: String,
    geoid: String,
    options: Vec<String>,
}

impl Verdict {
    /// A verdict naming a single town.
    ///
    /// `status` must be one of `Exact`, `Alias` or `Fuzzy`; anything else
    /// degrades to [`Verdict::not_found`].
    #[must_use]
    pub fn matched(status: BaseStatus, official: impl Into<String>, geoid: impl Into<String>) -> Self {
        if !status.is_resolved() {
            return Self::not_found();
        }
        Self {
            status,
            official: official.into(),
            geoid: geoid.into(),
            options: Vec::new(),
        }
    }

    /// An ambiguous verdict. An empty option list degrades to `NotFound`.
    #[must_use]
    pub fn ambiguous(options: Vec<String>) -> Self {
        if options.is_empty() {
            return Self::not_found();
        }
        Self {
            status: BaseStatus::Ambiguous,
            official: String::new(),
            geoid: String::new(),
            options,
        }
    }

    /// The empty verdict.
    #[must_use]
    pub const fn not_found() -> Self {
        Self {
            status: BaseStatus::NotFound,
            official: String::new(),
            geoid: String::new(),
            options: Vec::new(),
        }
    }

    /// Base status.
    #[must_use]
    pub const fn status(&self) -> BaseStatus {
        self.status
    }

    /// Official town name; empty unless resolved.
    #[must_use]
    pub fn official(&self) -> &str {
        &self.official
    }

    /// GEOID of the official town; empty unless resolved (or when the
    /// directory has no record for it).
    #[must_use]
    pub fn geoid(&self) -> &str {
        &self.geoid
    }

    /// Candidate towns; non-empty only when ambiguous.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

impl Default for Verdict {
    fn default() -> Self {
        Self::not_found()
    }
}
