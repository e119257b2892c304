//! Request/response messages exchanged with the matching worker.
//!
//! Both messages travel as JSON so the worker boundary behaves the same
//! whether it is a thread, a pool or a separate process:
//!
//! ```json
//! { "uniqueValues": ["Barre", 12, null], "lookupData": { "towns": {}, "aliases": {} } }
//! { "Barre": { "baseStatus": "ambiguous", "baseOfficial": "", "baseGeoid": "",
//!              "baseOptions": ["Barre City", "Barre Town"] } }
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MatcherConfig;
use crate::directory::{DirectoryIndex, DirectoryPayload};
use crate::error::{TownError, TownResult};
use crate::matcher::Matcher;
use crate::verdict::{BaseStatus, Verdict};

use super::match_values;

/// Work for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Distinct raw cell values.
    pub unique_values: Vec<Value>,
    /// Directory snapshot to match against.
    pub lookup_data: DirectoryPayload,
}

/// A verdict on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVerdict {
    /// Base status.
    pub base_status: BaseStatus,
    /// Official name, empty unless resolved.
    pub base_official: String,
    /// GEOID, empty unless resolved.
    pub base_geoid: String,
    /// Candidates; `null` unless ambiguous.
    pub base_options: Option<Vec<String>>,
}

impl From<&Verdict> for WireVerdict {
    fn from(verdict: &Verdict) -> Self {
        Self {
            base_status: verdict.status(),
            base_official: verdict.official().to_string(),
            base_geoid: verdict.geoid().to_string(),
            base_options: (!verdict.options().is_empty()).then(|| verdict.options().to_vec()),
        }
    }
}

impl TryFrom<WireVerdict> for Verdict {
    type Error = TownError;

    fn try_from(wire: WireVerdict) -> Result<Self, Self::Error> {
        let options = wire.base_options.unwrap_or_default();
        match wire.base_status {
            BaseStatus::Ambiguous => {
                if options.is_empty() {
                    return Err(TownError::processing("ambiguous verdict without options"));
                }
                Ok(Self::ambiguous(options))
            }
            status => {
                if !options.is_empty() {
                    return Err(TownError::processing(format!("{status} verdict carries options")));
                }
                if status == BaseStatus::NotFound {
                    return Ok(Self::not_found());
                }
                if wire.base_official.is_empty() {
                    return Err(TownError::processing(format!("{status} verdict without an official name")));
                }
                Ok(Self::matched(status, wire.base_official, wire.base_geoid))
            }
        }
    }
}

/// Verdicts keyed by the stringified original value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResponse {
    /// One entry per distinct value.
    pub verdicts: BTreeMap<String, WireVerdict>,
}

impl BatchResponse {
    /// Builds the wire form of resolved verdicts.
    #[must_use]
    pub fn from_verdicts(verdicts: &HashMap<String, Verdict>) -> Self {
        Self {
            verdicts: verdicts
                .iter()
                .map(|(text, verdict)| (text.clone(), WireVerdict::from(verdict)))
                .collect(),
        }
    }

    /// Validates and converts back to verdicts.
    ///
    /// # Errors
    ///
    /// Returns [`TownError::ProcessingFailed`] when any entry breaks the
    /// verdict invariants.
    pub fn into_verdicts(self) -> TownResult<HashMap<String, Verdict>> {
        self.verdicts
            .into_iter()
            .map(|(text, wire)| Verdict::try_from(wire).map(|v| (text, v)))
            .collect()
    }
}

/// Answers a request: builds an index from the snapshot and resolves every value.
///
/// # Errors
///
/// Returns [`TownError::ProcessingFailed`] when the snapshot is not a valid directory.
pub fn answer(request: BatchRequest, config: &MatcherConfig) -> TownResult<BatchResponse> {
    let directory = DirectoryIndex::from_payload(request.lookup_data)
        .map_err(|e| TownError::processing(format!("directory snapshot: {e}")))?;
    let matcher = Matcher::new(std::sync::Arc::new(directory), config.clone());
    let verdicts = match_values(&matcher, &request.unique_values);
    Ok(BatchResponse::from_verdicts(&verdicts))
}

/// Serializes a request.
///
/// # Errors
///
/// Returns [`TownError::ProcessingFailed`] on serialization failure.
pub fn encode_request(request: &BatchRequest) -> TownResult<Vec<u8>> {
    serde_json::to_vec(request).map_err(|e| TownError::processing(format!("serialize request: {e}")))
}

/// Deserializes a request.
///
/// # Errors
///
/// Returns [`TownError::ProcessingFailed`] on malformed input.
pub fn decode_request(bytes: &[u8]) -> TownResult<BatchRequest> {
    serde_json::from_slice(bytes).map_err(|e| TownError::processing(format!("deserialize request: {e}")))
}

/// Serializes a response.
///
/// # Errors
///
/// Returns [`TownError::ProcessingFailed`] on serialization failure.
pub fn encode_response(response: &BatchResponse) -> TownResult<Vec<u8>> {
    serde_json::to_vec(response).map_err(|e| TownError::processing(format!("serialize response: {e}")))
}

/// Deserializes and validates a response.
///
/// # Errors
///
/// Returns [`TownError::ProcessingFailed`] on malformed input or invalid verdicts.
pub fn decode_response(bytes: &[u8]) -> TownResult<HashMap<String, Verdict>> {
    let response: BatchResponse = serde_json::from_slice(bytes)
        .map_err(|e| TownError::processing(format!("deserialize response: {e}")))?;
    response.into_verdicts()
}

/// Decodes a request, answers it and encodes the response.
///
/// # Errors
///
/// Returns [`TownError::ProcessingFailed`] on any decode, match or encode failure.
pub fn serve(request: &[u8], config: &MatcherConfig) -> TownResult<Vec<u8>> {
    let request = decode_request(request)?;
    let response = answer(request, config)?;
    encode_response(&response)
}
