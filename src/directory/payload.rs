//! Wire format of the reference directory.
//!
//! ```json
//! {
//!   "towns":   { "Barre City": { "geoid": "5002303175", "county": "Washington" } },
//!   "aliases": { "barre city": "Barre City",
//!                "barre": { "type": "ambiguous", "options": ["Barre City", "Barre Town"] } }
//! }
//! ```
//!
//! Unknown town attributes are ignored. Codes may be JSON strings or numbers.
//! The alias table keeps the order of the document, which decides fuzzy ties.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The directory payload as fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryPayload {
    /// Town attributes keyed by official name.
    pub towns: BTreeMap<String, TownFields>,
    /// Alias table keyed by normalized key, in document order.
    pub aliases: AliasTable,
}

/// Alias entries in document order.
///
/// A key repeated in the document keeps its first position and its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable(Vec<(String, AliasValue)>);

impl AliasTable {
    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AliasValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts or replaces `key`, keeping the position of an existing entry.
    pub fn insert(&mut self, key: String, value: AliasValue) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AliasValue)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, AliasValue)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (String, AliasValue)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}

impl IntoIterator for AliasTable {
    type Item = (String, AliasValue);
    type IntoIter = std::vec::IntoIter<(String, AliasValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for AliasTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AliasTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = AliasTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of alias entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AliasTable, A::Error> {
                let mut table = AliasTable(Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096)));
                while let Some((key, value)) = access.next_entry::<String, AliasValue>()? {
                    table.insert(key, value);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Attributes of one town as they appear on the wire.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TownFields {
    #[serde(default, deserialize_with = "de_text")]
    pub geoid: String,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub ct_code: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub mcode: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub aoe_code: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text", skip_serializing_if = "Option::is_none")]
    pub rpc: Option<String>,
}

/// An alias table value: a bare official name, or a tagged ambiguous group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasValue {
    /// `"key": "Official Name"`
    Direct(String),
    /// `"key": { "type": "ambiguous", "options": [...] }`
    Tagged(TaggedAlias),
}

/// Tagged alias object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaggedAlias {
    /// More than one municipality answers to the key.
    Ambiguous {
        /// Candidate official names.
        options: Vec<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(serde_json::Number),
}

impl TextOrNumber {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?
        .map(TextOrNumber::into_string)
        .unwrap_or_default())
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(TextOrNumber::into_string))
}
