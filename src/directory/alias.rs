//! Alias table entries.

use serde::Serialize;

use crate::error::DirectoryError;

use super::payload::{AliasValue, TaggedAlias};

/// What a normalized key resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AliasEntry {
    /// A single official name.
    Direct(String),
    /// Two or more official names, in payload order, without duplicates.
    Ambiguous(Vec<String>),
}

impl AliasEntry {
    /// Validates a wire value for `key`.
    pub(crate) fn from_wire(key: &str, value: AliasValue) -> Result<Self, DirectoryError> {
        match value {
            AliasValue::Direct(name) => Ok(Self::Direct(name)),
            AliasValue::Tagged(TaggedAlias::Ambiguous { options }) => {
                let mut distinct: Vec<String> = Vec::with_capacity(options.len());
                for option in options {
                    if !distinct.contains(&option) {
                        distinct.push(option);
                    }
                }
                if distinct.len() < 2 {
                    return Err(DirectoryError::InvalidAmbiguousGroup {
                        key: key.to_string(),
                        count: distinct.len(),
                    });
                }
                Ok(Self::Ambiguous(distinct))
            }
        }
    }

    pub(crate) fn to_wire(&self) -> AliasValue {
        match self {
            Self::Direct(name) => AliasValue::Direct(name.clone()),
            Self::Ambiguous(options) => AliasValue::Tagged(TaggedAlias::Ambiguous {
                options: options.clone(),
            }),
        }
    }

    /// Returns true for ambiguous groups.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous(_))
    }
}
