//! Legacy record cleanup.
//!
//! Earlier addressing schemes stored descriptors under bare peer ids or
//! unrelated numeric keys. After a canonical write those records become
//! stale duplicates: reachable by the scan fallback, but no longer the
//! record of truth. Cleanup runs after every successful registration and
//! removes every other key whose embedded peer id matches the one just
//! written.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::resolve::EmbeddedIdentifier;
use crate::store::Store;

/// Delete every record other than `keep_key` whose embedded `peerId`
/// field matches `peer_id`. Returns how many records were removed.
///
/// Undecodable entries are skipped silently; they are not this peer's
/// legacy data and one corrupt record must not block the sweep. A failed
/// delete aborts the scan and surfaces the storage error; keys already
/// deleted stay deleted (cleanup is not transactional).
pub fn cleanup_legacy<S: Store>(store: &S, peer_id: &str, keep_key: &str) -> Result<usize> {
    let target = peer_id.trim();
    if target.is_empty() {
        return Ok(0);
    }

    let mut removed = 0;
    for key in store.list("")? {
        if key == keep_key {
            continue;
        }
        let Some(data) = store.get(&key)? else {
            continue;
        };
        let Ok(probe) = serde_json::from_slice::<EmbeddedIdentifier>(&data) else {
            debug!(key = %key, "skipping undecodable record during cleanup");
            continue;
        };
        let Some(embedded) = probe.peer_id else {
            continue;
        };
        if embedded.trim() != target {
            continue;
        }
        if let Err(err) = store.delete(&key) {
            warn!(key = %key, peer_id = %target, removed, error = %err,
                "aborting legacy cleanup after delete failure");
            return Err(err.into());
        }
        removed += 1;
    }

    if removed > 0 {
        info!(peer_id = %target, removed, "removed superseded legacy records");
    }
    Ok(removed)
}
