//! Town records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::payload::TownFields;

/// Optional attributes a caller may request alongside the official name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TownAttribute {
    /// County name.
    County,
    /// Latitude of the town centroid.
    Latitude,
    /// Longitude of the town centroid.
    Longitude,
    /// Agency of Transportation code.
    CtCode,
    /// E911 municipal code.
    Mcode,
    /// Agency of Education code.
    AoeCode,
    /// Regional planning commission.
    Rpc,
}

impl TownAttribute {
    /// All attributes, in display order.
    pub const ALL: [Self; 7] = [
        Self::County,
        Self::Latitude,
        Self::Longitude,
        Self::CtCode,
        Self::Mcode,
        Self::AoeCode,
        Self::Rpc,
    ];

    /// Payload field name.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::County => "county",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::CtCode => "ct_code",
            Self::Mcode => "mcode",
            Self::AoeCode => "aoe_code",
            Self::Rpc => "rpc",
        }
    }

    /// Column header used when the attribute is exported.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::County => "County",
            Self::Latitude => "Latitude",
            Self::Longitude => "Longitude",
            Self::CtCode => "CT_CODE (AOT)",
            Self::Mcode => "MCODE (E911)",
            Self::AoeCode => "AOE_CODE (AOE)",
            Self::Rpc => "RPC",
        }
    }

    /// Parses a payload field name.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.id() == id)
    }
}

impl fmt::Display for TownAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// An authoritative municipality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownRecord {
    /// Official name; unique within a directory.
    pub name: String,
    /// Geographic identifier.
    pub geoid: String,
    /// County name.
    pub county: Option<String>,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Agency of Transportation code.
    pub ct_code: Option<String>,
    /// E911 municipal code.
    pub mcode: Option<String>,
    /// Agency of Education code.
    pub aoe_code: Option<String>,
    /// Regional planning commission.
    pub rpc: Option<String>,
}

impl TownRecord {
    /// Creates a record with only the core fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, geoid: impl Into<String>) -> Self {
        Self::from_fields(name.into(), TownFields {
            geoid: geoid.into(),
            ..TownFields::default()
        })
    }

    pub(crate) fn from_fields(name: String, fields: TownFields) -> Self {
        Self {
            name,
            geoid: fields.geoid,
            county: fields.county,
            latitude: fields.latitude,
            longitude: fields.longitude,
            ct_code: fields.ct_code,
            mcode: fields.mcode,
            aoe_code: fields.aoe_code,
            rpc: fields.rpc,
        }
    }

    pub(crate) fn to_fields(&self) -> TownFields {
        TownFields {
            geoid: self.geoid.clone(),
            county: self.county.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            ct_code: self.ct_code.clone(),
            mcode: self.mcode.clone(),
            aoe_code: self.aoe_code.clone(),
            rpc: self.rpc.clone(),
        }
    }

    /// Returns an attribute rendered as text, if present.
    #[must_use]
    pub fn attribute(&self, attr: TownAttribute) -> Option<String> {
        match attr {
            TownAttribute::County => self.county.clone(),
            TownAttribute::Latitude => self.latitude.map(|v| v.to_string()),
            TownAttribute::Longitude => self.longitude.map(|v| v.to_string()),
            TownAttribute::CtCode => self.ct_code.clone(),
            TownAttribute::Mcode => self.mcode.clone(),
            TownAttribute::AoeCode => self.aoe_code.clone(),
            TownAttribute::Rpc => self.rpc.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_ids_roundtrip() {
        for attr in TownAttribute::ALL {
            assert_eq!(TownAttribute::from_id(attr.id()), Some(attr));
        }
        assert_eq!(TownAttribute::from_id("population"), None);
    }

    #[test]
    fn attribute_lookup() {
        let mut town = TownRecord::new("Peru", "5000354925");
        town.latitude = Some(43.26);
        town.rpc = Some("BCRC".into());

        assert_eq!(town.attribute(TownAttribute::Latitude).as_deref(), Some("43.26"));
        assert_eq!(town.attribute(TownAttribute::Rpc).as_deref(), Some("BCRC"));
        assert_eq!(town.attribute(TownAttribute::County), None);
    }

    #[test]
    fn labels() {
        assert_eq!(TownAttribute::CtCode.label(), "CT_CODE (AOT)");
        assert_eq!(TownAttribute::Mcode.to_string(), "mcode");
    }
}
