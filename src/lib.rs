//! # townmatch - Vermont town-name resolution
//!
//! Spreadsheet columns of "town" values are rarely clean: `ST. JOHNSBURY VT 05819`,
//! `Apt 4 Burlingten`, `Barre`. townmatch maps each raw value to an official
//! Vermont town and its census GEOID, or says why it cannot.
//!
//! ## Core Concepts
//!
//! - **Normalizer**: reduces a raw value to a lookup key
//! - **Directory**: the official towns plus an alias table keyed by normalized text
//! - **Matcher**: direct, suffix, raw and Jaro-Winkler fuzzy lookups producing a [`Verdict`]
//! - **Batch**: one verdict per distinct value, projected back onto every row
//! - **Resolution**: human overrides layered over the verdicts, reversible per row
//!
//! ## Usage
//!
//! ```rust,ignore
//! use townmatch::{resolve_batch, DirectoryIndex, Matcher, OverrideKind, ResolutionState};
//!
//! let directory = Arc::new(DirectoryIndex::from_path("vt_towns.json")?);
//! let matcher = Matcher::with_defaults(Arc::clone(&directory));
//!
//! let records = resolve_batch(rows, "Town", &matcher)?;
//! let state = ResolutionState::new(records)
//!     .apply_override(&directory, 3, "Barre Town", OverrideKind::Resolved)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod normalize;
pub mod similarity;
pub mod verdict;

pub mod batch;
pub mod directory;
pub mod matcher;
pub mod resolution;

pub mod report;
pub mod runtime;
pub mod session;

// Re-export primary types at crate root for convenience
pub use batch::protocol::{BatchRequest, BatchResponse, WireVerdict};
pub use batch::{resolve_batch, ResultRecord, Row};
pub use config::{EngineConfig, MatcherConfig, RuntimeConfig};
pub use directory::{AliasEntry, DirectoryIndex, DirectoryPayload, TownAttribute, TownRecord};
pub use error::{ConfigError, DirectoryError, OverrideError, TownError, TownResult};
pub use matcher::{Explanation, MatchStep, Matcher};
pub use normalize::normalize;
pub use report::{Casing, StatusFilter, Summary};
pub use resolution::{DisplayedRecord, Override, OverrideKind, ResolutionState};
pub use runtime::{BatchHandle, MatchRuntime, RunId};
pub use session::{CompletedRun, RunMeta, Session};
pub use similarity::jaro_winkler;
pub use verdict::{BaseStatus, Status, Verdict};
