//! Read-only reference directory.
//!
//! [`DirectoryIndex`] holds the town records and the alias table for one
//! session. It is built once from a [`DirectoryPayload`] and never mutated;
//! [`DirectoryIndex::snapshot`] turns it back into the payload so it can be
//! shipped to the matching worker.

mod alias;
mod payload;
mod town;

use std::collections::BTreeMap;
use std::path::Path;

pub use alias::AliasEntry;
pub use payload::{AliasTable, AliasValue, DirectoryPayload, TaggedAlias, TownFields};
pub use town::{TownAttribute, TownRecord};

use crate::error::DirectoryError;

/// Lookup surface over the reference directory.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryIndex {
    towns: BTreeMap<String, TownRecord>,
    aliases: BTreeMap<String, AliasEntry>,
    /// Alias keys in payload order.
    alias_order: Vec<String>,
    fingerprint: String,
}

impl DirectoryIndex {
    /// Builds the index from a parsed payload.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidAmbiguousGroup`] when an ambiguous alias
    /// names fewer than two distinct towns, or [`DirectoryError::Fingerprint`]
    /// when the snapshot cannot be serialized for hashing.
    pub fn from_payload(payload: DirectoryPayload) -> Result<Self, DirectoryError> {
        let towns: BTreeMap<String, TownRecord> = payload
            .towns
            .into_iter()
            .map(|(name, fields)| (name.clone(), TownRecord::from_fields(name, fields)))
            .collect();

        let mut aliases = BTreeMap::new();
        let mut alias_order = Vec::with_capacity(payload.aliases.len());
        let mut dangling = 0usize;
        for (key, value) in payload.aliases {
            let entry = AliasEntry::from_wire(&key, value)?;
            let targets: &[String] = match &entry {
                AliasEntry::Direct(name) => std::slice::from_ref(name),
                AliasEntry::Ambiguous(options) => options,
            };
            dangling += targets.iter().filter(|t| !towns.contains_key(*t)).count();
            if aliases.insert(key.clone(), entry).is_none() {
                alias_order.push(key);
            }
        }

        if dangling > 0 {
            tracing::warn!(
                dangling,
                "directory aliases reference towns missing from the town table; their geoid resolves to empty"
            );
        }

        let mut index = Self {
            towns,
            aliases,
            alias_order,
            fingerprint: String::new(),
        };
        index.fingerprint = fingerprint_of(&index.snapshot())?;
        tracing::debug!(
            towns = index.towns.len(),
            aliases = index.aliases.len(),
            fingerprint = %index.fingerprint,
            "directory index built"
        );
        Ok(index)
    }

    /// Parses and builds the index from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Malformed`] when the JSON does not have the
    /// `towns`/`aliases` shape, or any error from [`Self::from_payload`].
    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        let payload: DirectoryPayload =
            serde_json::from_str(json).map_err(|e| DirectoryError::Malformed { message: e.to_string() })?;
        Self::from_payload(payload)
    }

    /// Reads and builds the index from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Io`] when the file cannot be read, or any
    /// error from [`Self::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DirectoryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }

    /// Looks up a normalized key in the alias table.
    #[must_use]
    pub fn alias(&self, key: &str) -> Option<&AliasEntry> {
        self.aliases.get(key)
    }

    /// Looks up a town by official name.
    #[must_use]
    pub fn town(&self, name: &str) -> Option<&TownRecord> {
        self.towns.get(name)
    }

    /// GEOID of a town, or `""` when the directory has no record for it.
    #[must_use]
    pub fn geoid_of(&self, name: &str) -> &str {
        self.towns.get(name).map_or("", |t| t.geoid.as_str())
    }

    /// All alias keys, in payload order.
    pub fn alias_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.alias_order.iter().map(String::as_str)
    }

    /// All towns, sorted by official name.
    pub fn towns(&self) -> impl Iterator<Item = &TownRecord> + '_ {
        self.towns.values()
    }

    /// Number of towns.
    #[must_use]
    pub fn town_count(&self) -> usize {
        self.towns.len()
    }

    /// Number of alias keys.
    #[must_use]
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// blake3 hex digest of the canonical snapshot JSON.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Serializable copy of the directory.
    #[must_use]
    pub fn snapshot(&self) -> DirectoryPayload {
        DirectoryPayload {
            towns: self
                .towns
                .iter()
                .map(|(name, town)| (name.clone(), town.to_fields()))
                .collect(),
            aliases: self
                .alias_order
                .iter()
                .filter_map(|key| self.aliases.get(key).map(|entry| (key.clone(), entry.to_wire())))
                .collect(),
        }
    }
}

fn fingerprint_of(payload: &DirectoryPayload) -> Result<String, DirectoryError> {
    // Sorted towns, alias order and fixed field order make the JSON canonical.
    let bytes = serde_json::to_vec(payload).map_err(|e| DirectoryError::Fingerprint { message: e.to_string() })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}
