//! Identifier resolution.
//!
//! Operations that target a single existing record (fetch, remove) must
//! first determine which peer the request means. `resolve_peer_id` walks a
//! fixed precedence of strategies over the transport-agnostic
//! `RequestParts`; `find_by_peer_id` then locates the storage record,
//! falling back to a full scan for records written under a legacy key
//! scheme.

use serde::Deserialize;
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::store::Store;

/// The slice of an inbound request the core consumes: path, query pairs,
/// and raw body bytes. The transport layer owns everything else.
#[derive(Debug, Clone, Default)]
pub struct RequestParts {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RequestParts {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for the named query parameter.
    fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Typed view of the fields an identifier may hide in. Used for request
/// bodies and for matching embedded ids in stored values; keeping it
/// typed (rather than probing untyped maps) makes corrupt-record skipping
/// precise.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EmbeddedIdentifier {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "peerId")]
    pub peer_id: Option<String>,
}

/// Determine the target peer id for a single-record operation.
///
/// Precedence, stopping at the first non-empty result:
/// 1. last non-empty path segment, unless it equals `reserved_segment`
///    (a route token, not an id)
/// 2. query parameter `peerId`
/// 3. query parameter `id`
/// 4. JSON body fields, `peerId` over `id`
///
/// Every candidate is whitespace-trimmed. Fails with `MissingIdentifier`
/// when all strategies come up empty, or `MalformedBody` when strategy 4
/// meets a non-empty body that is not valid JSON.
pub fn resolve_peer_id(request: &RequestParts, reserved_segment: &str) -> Result<String> {
    if let Some(segment) = last_path_segment(&request.path) {
        if segment != reserved_segment {
            return Ok(segment.to_string());
        }
    }

    for name in ["peerId", "id"] {
        if let Some(value) = request.query_value(name) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }

    if request.body.is_empty() {
        return Err(RegistryError::MissingIdentifier);
    }
    let body: EmbeddedIdentifier =
        serde_json::from_slice(&request.body).map_err(|_| RegistryError::MalformedBody)?;
    for candidate in [body.peer_id, body.id] {
        if let Some(value) = candidate {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }

    Err(RegistryError::MissingIdentifier)
}

fn last_path_segment(path: &str) -> Option<&str> {
    path.trim_matches('/')
        .rsplit('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
}

/// Locate the storage record for `peer_id`.
///
/// Tries the canonical key first. On a miss, scans every stored key and
/// matches on the `peerId` field embedded in the value; this bridge keeps
/// records written under a legacy key scheme reachable without a one-time
/// migration job. The scan is O(records) and skips undecodable entries
/// rather than failing, so one corrupt legacy record cannot block
/// resolution of valid ones.
pub fn find_by_peer_id<S: Store>(
    store: &S,
    key_prefix: &str,
    peer_id: &str,
) -> Result<(String, Vec<u8>)> {
    let canonical = format!("{key_prefix}{peer_id}");
    if let Some(data) = store.get(&canonical)? {
        return Ok((canonical, data));
    }

    for key in store.list("")? {
        let Some(data) = store.get(&key)? else {
            continue;
        };
        let Ok(probe) = serde_json::from_slice::<EmbeddedIdentifier>(&data) else {
            debug!(key = %key, "skipping undecodable record during scan");
            continue;
        };
        if probe.peer_id.as_deref().map(str::trim) == Some(peer_id) {
            return Ok((key, data));
        }
    }

    Err(RegistryError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const RESERVED: &str = "delete";

    #[test]
    fn path_segment_wins_over_query() {
        let request = RequestParts::new()
            .with_path("/values/abc")
            .with_query("peerId", "xyz");
        assert_eq!(resolve_peer_id(&request, RESERVED).unwrap(), "abc");
    }

    #[test]
    fn reserved_segment_falls_through_to_query() {
        let request = RequestParts::new()
            .with_path("/values/delete")
            .with_query("peerId", "xyz");
        assert_eq!(resolve_peer_id(&request, RESERVED).unwrap(), "xyz");
    }

    #[test]
    fn query_peer_id_beats_query_id() {
        let request = RequestParts::new()
            .with_query("id", "second")
            .with_query("peerId", "first");
        assert_eq!(resolve_peer_id(&request, RESERVED).unwrap(), "first");
    }

    #[test]
    fn blank_query_values_are_skipped() {
        let request = RequestParts::new()
            .with_query("peerId", "   ")
            .with_query("id", "fallback");
        assert_eq!(resolve_peer_id(&request, RESERVED).unwrap(), "fallback");
    }

    #[test]
    fn body_peer_id_beats_body_id() {
        let request = RequestParts::new().with_body(r#"{"id":"b","peerId":"a"}"#);
        assert_eq!(resolve_peer_id(&request, RESERVED).unwrap(), "a");
    }

    #[test]
    fn body_id_used_when_peer_id_absent() {
        let request = RequestParts::new().with_body(r#"{"id":" b "}"#);
        assert_eq!(resolve_peer_id(&request, RESERVED).unwrap(), "b");
    }

    #[test]
    fn empty_request_is_missing_identifier() {
        let err = resolve_peer_id(&RequestParts::new(), RESERVED).unwrap_err();
        assert!(matches!(err, RegistryError::MissingIdentifier));
    }

    #[test]
    fn non_json_body_is_malformed() {
        let request = RequestParts::new().with_body("not json");
        let err = resolve_peer_id(&request, RESERVED).unwrap_err();
        assert!(matches!(err, RegistryError::MalformedBody));
    }

    #[test]
    fn json_body_without_ids_is_missing_identifier() {
        let request = RequestParts::new().with_body(r#"{"other":"field"}"#);
        let err = resolve_peer_id(&request, RESERVED).unwrap_err();
        assert!(matches!(err, RegistryError::MissingIdentifier));
    }

    #[test]
    fn path_segments_are_trimmed() {
        let request = RequestParts::new().with_path("/values/ abc ");
        assert_eq!(resolve_peer_id(&request, RESERVED).unwrap(), "abc");
    }

    #[test]
    fn find_prefers_canonical_key() {
        let store = MemoryStore::new();
        store.put("/peer/p1", br#"{"peerId":"p1"}"#).unwrap();
        store.put("p1-old", br#"{"peerId":"p1"}"#).unwrap();

        let (key, _) = find_by_peer_id(&store, "/peer/", "p1").unwrap();
        assert_eq!(key, "/peer/p1");
    }

    #[test]
    fn find_falls_back_to_embedded_field_scan() {
        let store = MemoryStore::new();
        store.put("legacy-17", br#"{"peerId":" p1 "}"#).unwrap();
        store.put("noise", b"not json").unwrap();

        let (key, data) = find_by_peer_id(&store, "/peer/", "p1").unwrap();
        assert_eq!(key, "legacy-17");
        assert_eq!(data, br#"{"peerId":" p1 "}"#);
    }

    #[test]
    fn find_on_empty_store_is_not_found() {
        let store = MemoryStore::new();
        let err = find_by_peer_id(&store, "/peer/", "ghost").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound));
    }
}
