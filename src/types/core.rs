//! Shared scalar and envelope types used across protocol records (§3).

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A session identifier: an opaque, URL-safe random string minted by
/// `session/new`, or echoed back by `session/load`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `protocolVersion`: an integer, constrained to be `>= 1` (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct ProtocolVersion(pub u32);

impl ProtocolVersion {
    pub const LATEST: ProtocolVersion = ProtocolVersion(1);

    /// Validates the `>= 1` range invariant declared in §4.3.
    pub fn validate(self) -> Result<Self, String> {
        if self.0 >= 1 {
            Ok(self)
        } else {
            Err("protocolVersion must be >= 1".to_string())
        }
    }
}

// Enforced on decode, not just on demand: the schema codec's range checks
// (§4.3) apply wherever a record is deserialized, so this is a manual
// `Deserialize` impl rather than the usual `#[serde(transparent)]` derive.
impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        ProtocolVersion(value).validate().map_err(serde::de::Error::custom)
    }
}

/// A name-value pair for passing environment variables to a spawned process
/// (used by `terminal/create` and by `session/new`'s `mcpServers`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVariable {
    pub name: String,
    pub value: String,
}

/// An MCP server the agent should connect additional tools through. Opaque
/// to the connection engine; forwarded verbatim to the handler.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct McpServer {
    pub name: String,
    pub command: std::path::PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVariable>,
}

/// Extension-point data every record carries under the wire key `_meta`
/// (§3). Absent fields are omitted on encode (the "nil omission" invariant,
/// §8).
pub type Meta = Option<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_version_decodes_when_in_range() {
        let v: ProtocolVersion = serde_json::from_value(serde_json::json!(1)).unwrap();
        assert_eq!(v, ProtocolVersion(1));
    }

    #[test]
    fn protocol_version_zero_is_rejected_on_decode() {
        let err = serde_json::from_value::<ProtocolVersion>(serde_json::json!(0)).unwrap_err();
        assert!(err.to_string().contains(">= 1"));
    }
}
