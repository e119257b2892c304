//! Resolution of one raw value against the directory.
//!
//! Lookup order, stopping at the first hit:
//! 1. blocklist (short-circuits to `not_found`)
//! 2. alias table on the normalized key
//! 3. alias table on trailing token runs of the normalized key
//! 4. alias table on the raw (trimmed, lower-cased) key
//! 5. best Jaro-Winkler alias above the threshold

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::config::MatcherConfig;
use crate::directory::{AliasEntry, DirectoryIndex};
use crate::normalize::{normalize, raw_key};
use crate::similarity::jaro_winkler_chars;
use crate::verdict::{BaseStatus, Verdict};

/// Which lookup produced a verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum MatchStep {
    /// Key is on the blocklist.
    Blocked,
    /// Normalized key is an alias.
    Direct,
    /// A trailing run of tokens is an alias.
    Suffix {
        /// The matching suffix.
        key: String,
    },
    /// Raw key is an alias.
    RawKey,
    /// Approximate match.
    Fuzzy {
        /// The matching alias key.
        key: String,
        /// Jaro-Winkler score.
        score: f64,
    },
    /// Nothing matched.
    NoMatch,
}

/// A verdict together with how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    /// Trimmed, lower-cased input.
    pub raw_key: String,
    /// Normalized input.
    pub clean_key: String,
    /// Lookup that decided the verdict.
    pub step: MatchStep,
    /// The verdict.
    pub verdict: Verdict,
}

struct Candidate {
    key: String,
    chars: Vec<char>,
}

/// Resolves raw values against a [`DirectoryIndex`].
pub struct Matcher {
    directory: Arc<DirectoryIndex>,
    config: MatcherConfig,
    blocklist: HashSet<String>,
    candidates: Vec<Candidate>,
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("directory", &self.directory.fingerprint())
            .field("config", &self.config)
            .field("candidates", &self.candidates.len())
            .finish()
    }
}

impl Matcher {
    /// Creates a matcher over `directory`.
    #[must_use]
    pub fn new(directory: Arc<DirectoryIndex>, config: MatcherConfig) -> Self {
        let blocklist = config.blocklist.iter().map(|b| b.trim().to_lowercase()).collect();
        let candidates = directory
            .alias_keys()
            .map(|key| Candidate {
                key: key.to_string(),
                chars: key.chars().collect(),
            })
            .collect();
        Self {
            directory,
            config,
            blocklist,
            candidates,
        }
    }

    /// Creates a matcher with the default configuration.
    #[must_use]
    pub fn with_defaults(directory: Arc<DirectoryIndex>) -> Self {
        Self::new(directory, MatcherConfig::default())
    }

    /// The directory this matcher resolves against.
    #[must_use]
    pub fn directory(&self) -> &Arc<DirectoryIndex> {
        &self.directory
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Resolves one raw value.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Verdict {
        self.explain(raw).verdict
    }

    /// Resolves one raw value and reports which lookup decided it.
    #[must_use]
    pub fn explain(&self, raw: &str) -> Explanation {
        let raw_key = raw_key(raw);
        let clean_key = normalize(raw);
        let (step, verdict) = self.decide(&clean_key, &raw_key);
        tracing::trace!(raw, clean_key = %clean_key, ?step, status = %verdict.status(), "resolved value");
        Explanation {
            raw_key,
            clean_key,
            step,
            verdict,
        }
    }

    fn decide(&self, clean_key: &str, raw_key: &str) -> (MatchStep, Verdict) {
        if self.blocklist.contains(clean_key) || self.blocklist.contains(raw_key) {
            return (MatchStep::Blocked, Verdict::not_found());
        }

        if let Some(entry) = self.directory.alias(clean_key) {
            return (MatchStep::Direct, self.lookup_verdict(entry, clean_key));
        }

        if clean_key.contains(' ') {
            let parts: Vec<&str> = clean_key.split(' ').collect();
            for start in 1..parts.len() {
                let suffix = parts[start..].join(" ");
                if let Some(entry) = self.directory.alias(&suffix) {
                    return (
                        MatchStep::Suffix { key: suffix },
                        self.lookup_verdict(entry, clean_key),
                    );
                }
            }
        }

        if clean_key != raw_key {
            if let Some(entry) = self.directory.alias(raw_key) {
                return (MatchStep::RawKey, self.lookup_verdict(entry, clean_key));
            }
        }

        if clean_key.chars().count() >= self.config.min_fuzzy_len {
            if let Some((key, score)) = self.best_fuzzy(clean_key) {
                if let Some(entry) = self.directory.alias(key) {
                    let verdict = match entry {
                        AliasEntry::Ambiguous(options) => Verdict::ambiguous(options.clone()),
                        AliasEntry::Direct(name) => {
                            Verdict::matched(BaseStatus::Fuzzy, name.clone(), self.directory.geoid_of(name))
                        }
                    };
                    return (
                        MatchStep::Fuzzy {
                            key: key.to_string(),
                            score,
                        },
                        verdict,
                    );
                }
            }
        }

        (MatchStep::NoMatch, Verdict::not_found())
    }

    fn lookup_verdict(&self, entry: &AliasEntry, clean_key: &str) -> Verdict {
        match entry {
            AliasEntry::Ambiguous(options) => Verdict::ambiguous(options.clone()),
            AliasEntry::Direct(name) => {
                let status = if clean_key == name.to_lowercase() {
                    BaseStatus::Exact
                } else {
                    BaseStatus::Alias
                };
                Verdict::matched(status, name.clone(), self.directory.geoid_of(name))
            }
        }
    }

    /// Best-scoring alias key strictly above the threshold. Earlier keys in
    /// payload order win ties.
    fn best_fuzzy(&self, clean_key: &str) -> Option<(&str, f64)> {
        let input: Vec<char> = clean_key.chars().collect();
        let mut best: Option<(&str, f64)> = None;
        let mut max_score = 0.0;

        for candidate in &self.candidates {
            if candidate.chars.len().abs_diff(input.len()) > self.config.max_length_delta {
                continue;
            }
            let score = jaro_winkler_chars(&input, &candidate.chars);
            if score > max_score {
                max_score = score;
                best = Some((candidate.key.as_str(), score));
            }
            if score >= 1.0 {
                break;
            }
        }

        best.filter(|(_, score)| *score > self.config.fuzzy_threshold)
    }
}
