//! Legacy schema migration.
//!
//! The predecessor schema stored a bare `{"limits": {soft, hard}}` object
//! instead of the named metric map. Migration is lazy: it runs when a
//! decode finds an empty metric map, synthesizing the current shape from
//! the original bytes. The legacy shape is read-only input and is never
//! written back.

use serde::Deserialize;

use crate::metric::{METRIC_KEY, Metric, MetricMap, clamp};

/// The predecessor limit pair. Missing fields default to zero, matching
/// how absent JSON numbers decoded under the old schema.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct LegacyLimits {
    pub soft: f64,
    pub hard: f64,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyEnvelope {
    limits: Option<LegacyLimits>,
}

/// Attempt to synthesize a current-schema metric map from legacy bytes.
///
/// Returns `None` when the bytes do not decode or carry no `limits`
/// object. That is not an error: it signals "nothing to migrate" and lets
/// the caller treat the record as already-current or invalid.
///
/// On success both fields are clamped, `soft` is lowered to `hard` if
/// inverted, and the soft limit doubles as the initial `current` value
/// (the legacy schema had no separate current field). Pure and
/// idempotent.
pub fn migrate_legacy(data: &[u8]) -> Option<MetricMap> {
    let envelope: LegacyEnvelope = serde_json::from_slice(data).ok()?;
    let limits = envelope.limits?;

    let hard = clamp(limits.hard);
    let mut soft = clamp(limits.soft);
    if soft > hard {
        soft = hard;
    }

    let mut values = MetricMap::new();
    values.insert(
        METRIC_KEY.to_string(),
        Metric {
            current: soft,
            soft_limit: soft,
            hard_limit: hard,
        },
    );
    Some(values)
}
