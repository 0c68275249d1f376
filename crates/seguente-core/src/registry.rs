//! CRUD orchestration over the store.
//!
//! `Registry` wires the decode/repair pipeline, the identifier resolver,
//! and legacy cleanup to the four transport-level operations. Reads that
//! trigger a repair use a read-then-write pattern with no
//! compare-and-swap; a concurrent delete between the read and the rewrite
//! can resurrect a key. That race, like the non-atomic write+cleanup pair
//! in `register`, is an accepted limitation of the per-key-atomic store.

use serde::Serialize;
use tracing::info;

use crate::cleanup::cleanup_legacy;
use crate::config::RegistryConfig;
use crate::descriptor::{Descriptor, decode_descriptor};
use crate::error::{RegistryError, Result};
use crate::metric::{METRIC_KEY, MetricMap, normalize_values};
use crate::migrate::migrate_legacy;
use crate::resolve::{RequestParts, find_by_peer_id, resolve_peer_id};
use crate::store::Store;

/// Result of a list operation.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub count: usize,
    pub values: Vec<Descriptor>,
}

/// Acknowledgement for a write or delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReceipt {
    pub peer_id: String,
    pub status: &'static str,
}

/// The registry: CRUD operations over a storage collaborator.
pub struct Registry<S: Store> {
    store: S,
    config: RegistryConfig,
}

impl<S: Store> Registry<S> {
    pub fn new(store: S, config: RegistryConfig) -> Self {
        Self { store, config }
    }

    /// Borrow the underlying store (tests and diagnostics).
    pub fn store(&self) -> &S {
        &self.store
    }

    fn canonical_key(&self, peer_id: &str) -> String {
        format!("{}{}", self.config.key_prefix, peer_id)
    }

    /// List every descriptor under the canonical prefix.
    ///
    /// Each record goes through the full decode/repair pipeline; records
    /// repaired along the way are rewritten in place. An invalid stored
    /// record fails the whole listing, surfaced with its key.
    pub fn list(&self) -> Result<Listing> {
        let keys = self.store.list(&self.config.key_prefix)?;
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            // A record deleted mid-iteration simply drops out of the page.
            let Some(data) = self.store.get(&key)? else {
                continue;
            };
            let (descriptor, modified) =
                decode_descriptor(&data, &key, &self.config.key_prefix)
                    .map_err(|err| annotate_stored(err, &key))?;
            if modified {
                self.rewrite(&key, &descriptor)?;
            }
            values.push(descriptor);
        }
        Ok(Listing {
            count: values.len(),
            values,
        })
    }

    /// Register (or wholesale re-register) a descriptor from request body
    /// bytes. Last write wins; there is no merge.
    pub fn register(&self, body: &[u8]) -> Result<WriteReceipt> {
        let mut descriptor: Descriptor = serde_json::from_slice(body)?;

        // Legacy-shaped registration bodies migrate too, not just stored
        // records.
        if descriptor.values.is_empty() {
            if let Some(migrated) = migrate_legacy(body) {
                descriptor.values = migrated;
            }
        }

        descriptor.validate()?;
        normalize_values(&mut descriptor.values)?;

        // Persist only the single recognized metric entry.
        let metric = *descriptor
            .values
            .get(METRIC_KEY)
            .ok_or_else(|| RegistryError::validation(format!("values.{METRIC_KEY} is required")))?;
        descriptor.values = MetricMap::from([(METRIC_KEY.to_string(), metric)]);

        descriptor.peer_id = descriptor.peer_id.trim().to_string();
        let key = self.canonical_key(&descriptor.peer_id);
        self.store.put(&key, &descriptor.encode()?)?;

        // Two-step write+cleanup is not atomic: a cleanup failure can
        // leave a reachable duplicate until the next registration.
        let removed = cleanup_legacy(&self.store, &descriptor.peer_id, &key)?;
        info!(peer_id = %descriptor.peer_id, legacy_removed = removed, "registered descriptor");

        Ok(WriteReceipt {
            peer_id: descriptor.peer_id,
            status: "created",
        })
    }

    /// Fetch the descriptor targeted by a request, repairing the stored
    /// record in place when the decode reports a modification.
    pub fn fetch(&self, request: &RequestParts) -> Result<Descriptor> {
        let peer_id = resolve_peer_id(request, &self.config.reserved_segment)?;
        let (key, data) = find_by_peer_id(&self.store, &self.config.key_prefix, &peer_id)?;
        let (descriptor, modified) = decode_descriptor(&data, &key, &self.config.key_prefix)
            .map_err(|err| annotate_stored(err, &key))?;
        if modified {
            self.rewrite(&key, &descriptor)?;
        }
        Ok(descriptor)
    }

    /// Delete the descriptor targeted by a request.
    pub fn remove(&self, request: &RequestParts) -> Result<WriteReceipt> {
        let peer_id = resolve_peer_id(request, &self.config.reserved_segment)?;
        let (key, _) = find_by_peer_id(&self.store, &self.config.key_prefix, &peer_id)?;
        self.store.delete(&key)?;
        info!(peer_id = %peer_id, key = %key, "deleted descriptor");
        Ok(WriteReceipt {
            peer_id,
            status: "deleted",
        })
    }

    fn rewrite(&self, key: &str, descriptor: &Descriptor) -> Result<()> {
        self.store.put(key, &descriptor.encode()?)?;
        info!(key = %key, "rewrote record after lazy repair");
        Ok(())
    }
}

/// Stored-record failures carry the offending key and become
/// `CorruptRecord`: the request was fine, the storage was not, so the
/// failure classifies as a server error rather than a client one.
fn annotate_stored(err: RegistryError, key: &str) -> RegistryError {
    match err {
        RegistryError::Decode(source) => RegistryError::CorruptRecord {
            key: key.to_string(),
            message: source.to_string(),
        },
        RegistryError::Validation(message) => RegistryError::CorruptRecord {
            key: key.to_string(),
            message,
        },
        other => other,
    }
}
