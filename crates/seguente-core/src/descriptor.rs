//! Descriptor model and the decode/repair pipeline.
//!
//! A descriptor is the unit of storage: one record per logical peer,
//! addressed by `key_prefix + peerId`. `decode_descriptor` is the single
//! entry point for reading stored bytes. It is deterministic and never
//! touches storage itself; it reports whether the in-memory record
//! diverged from the stored bytes so the caller can decide to rewrite.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::metric::{METRIC_KEY, MetricMap, normalize_values};
use crate::migrate::migrate_legacy;

/// Network address of a peer. Replaced wholesale on re-registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// The persisted record for one peer.
///
/// Every field defaults so that partial or legacy-shaped bytes still
/// decode; strict validation runs afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub peer_id: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub values: MetricMap,
    #[serde(default)]
    pub raw: String,
}

impl Descriptor {
    /// Strict validation: required fields non-empty, recognized metric
    /// present, in range, and well-ordered.
    pub fn validate(&self) -> Result<()> {
        if self.peer_id.trim().is_empty() {
            return Err(RegistryError::validation("peerId is required"));
        }
        if self.address.ip.trim().is_empty() {
            return Err(RegistryError::validation("address.ip is required"));
        }
        if self.raw.trim().is_empty() {
            return Err(RegistryError::validation("raw is required"));
        }
        let Some(metric) = self.values.get(METRIC_KEY) else {
            return Err(RegistryError::validation(format!(
                "values.{METRIC_KEY} is required"
            )));
        };
        metric.validate()
    }

    /// Wire encoding used for persistence.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(RegistryError::Encode)
    }
}

/// Decode stored bytes into a reconciled descriptor.
///
/// The pipeline: decode, migrate an empty metric map from the legacy
/// shape, normalize the metric, derive a missing peer id from the storage
/// key (stripping `key_prefix`, or keeping the raw key when the prefix is
/// absent), then strictly re-validate. The returned flag tells the caller
/// whether the repaired record differs from what was read and should be
/// persisted again.
pub fn decode_descriptor(
    data: &[u8],
    storage_key: &str,
    key_prefix: &str,
) -> Result<(Descriptor, bool)> {
    let mut descriptor: Descriptor = serde_json::from_slice(data)?;
    let mut modified = false;

    if descriptor.values.is_empty() {
        if let Some(migrated) = migrate_legacy(data) {
            descriptor.values = migrated;
            modified = true;
        }
    }

    if normalize_values(&mut descriptor.values)? {
        modified = true;
    }

    if descriptor.peer_id.trim().is_empty() {
        let derived = storage_key
            .strip_prefix(key_prefix)
            .filter(|rest| !rest.is_empty())
            .unwrap_or(storage_key);
        descriptor.peer_id = derived.to_string();
        modified = true;
    }

    descriptor.validate()?;
    Ok((descriptor, modified))
}
