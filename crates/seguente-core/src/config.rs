//! Registry configuration.

use serde::Deserialize;

/// Default canonical key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "/peer/";

/// Default path segment reserved for the delete route.
pub const DEFAULT_RESERVED_SEGMENT: &str = "delete";

/// Tunables for key layout and identifier resolution. Every field has a
/// default, so a partial config file (or none at all) is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Canonical storage key prefix; the canonical key for a peer is
    /// `key_prefix + peerId`.
    pub key_prefix: String,

    /// Path segment that belongs to a different route and must never be
    /// treated as a peer id by the resolver.
    pub reserved_segment: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            reserved_segment: DEFAULT_RESERVED_SEGMENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.key_prefix, "/peer/");
        assert_eq!(config.reserved_segment, "delete");
    }

    #[test]
    fn partial_deserialization_fills_defaults() {
        let config: RegistryConfig =
            serde_json::from_str(r#"{"key_prefix": "/node/"}"#).unwrap();
        assert_eq!(config.key_prefix, "/node/");
        assert_eq!(config.reserved_segment, "delete");
    }
}
