//! Metric bounds policy: strict validation and lenient normalization.
//!
//! A metric is a `(current, softLimit, hardLimit)` triple, each field
//! constrained to `[0, 100]` with `softLimit <= hardLimit` and
//! `current <= hardLimit`. Validation rejects out-of-range raw input;
//! normalization repairs it (clamp, then reorder). The two paths are
//! deliberately distinct: writes are validated, reads are repaired.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// The single metric name recognized by the current schema. The map type
/// leaves room for future names, but only this one is validated or
/// consumed.
pub const METRIC_KEY: &str = "metric";

/// Lower bound for every metric field.
pub const METRIC_MIN: f64 = 0.0;

/// Upper bound for every metric field.
pub const METRIC_MAX: f64 = 100.0;

/// Named metric slots of a descriptor.
pub type MetricMap = BTreeMap<String, Metric>;

/// One metric triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub soft_limit: f64,
    #[serde(default)]
    pub hard_limit: f64,
}

/// Map `value` to the nearest point in `[METRIC_MIN, METRIC_MAX]`.
/// Non-finite input (NaN, ±infinity) maps to the minimum.
pub fn clamp(value: f64) -> f64 {
    if !value.is_finite() {
        return METRIC_MIN;
    }
    value.clamp(METRIC_MIN, METRIC_MAX)
}

impl Metric {
    /// Strict validation against the raw, unclamped fields.
    pub fn validate(&self) -> Result<()> {
        if !self.current.is_finite() || !self.soft_limit.is_finite() || !self.hard_limit.is_finite()
        {
            return Err(RegistryError::validation(format!(
                "values.{METRIC_KEY} contains invalid numbers"
            )));
        }
        if self.soft_limit < METRIC_MIN || self.soft_limit > METRIC_MAX {
            return Err(RegistryError::validation(format!(
                "values.{METRIC_KEY}.softLimit must be between {METRIC_MIN:.0} and {METRIC_MAX:.0}"
            )));
        }
        if self.hard_limit < METRIC_MIN || self.hard_limit > METRIC_MAX {
            return Err(RegistryError::validation(format!(
                "values.{METRIC_KEY}.hardLimit must be between {METRIC_MIN:.0} and {METRIC_MAX:.0}"
            )));
        }
        if self.current < METRIC_MIN || self.current > METRIC_MAX {
            return Err(RegistryError::validation(format!(
                "values.{METRIC_KEY}.current must be between {METRIC_MIN:.0} and {METRIC_MAX:.0}"
            )));
        }
        if self.soft_limit > self.hard_limit {
            return Err(RegistryError::validation(format!(
                "values.{METRIC_KEY}.softLimit must be <= hardLimit"
            )));
        }
        Ok(())
    }

    /// Lenient repair: clamp each field independently, pull `softLimit`
    /// down to `hardLimit` if inverted, and force `current` into
    /// `[0, hardLimit]`. Returns the repaired metric and whether any
    /// field changed.
    pub fn normalized(&self) -> (Self, bool) {
        let mut repaired = Self {
            current: clamp(self.current),
            soft_limit: clamp(self.soft_limit),
            hard_limit: clamp(self.hard_limit),
        };
        if repaired.soft_limit > repaired.hard_limit {
            repaired.soft_limit = repaired.hard_limit;
        }
        if repaired.current > repaired.hard_limit {
            repaired.current = repaired.hard_limit;
        }
        if repaired.current < METRIC_MIN {
            repaired.current = METRIC_MIN;
        }

        // NaN compares unequal to everything, so a NaN input always
        // registers as changed.
        let changed = repaired.current != self.current
            || repaired.soft_limit != self.soft_limit
            || repaired.hard_limit != self.hard_limit;
        (repaired, changed)
    }
}

/// Normalize the recognized metric slot in place.
///
/// Fails with a validation error if the slot is absent; returns whether
/// the stored value was repaired.
pub fn normalize_values(values: &mut MetricMap) -> Result<bool> {
    let Some(metric) = values.get(METRIC_KEY) else {
        return Err(RegistryError::validation(format!(
            "values.{METRIC_KEY} is required"
        )));
    };
    let (repaired, changed) = metric.normalized();
    if changed {
        values.insert(METRIC_KEY.to_string(), repaired);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn metric(current: f64, soft: f64, hard: f64) -> Metric {
        Metric {
            current,
            soft_limit: soft,
            hard_limit: hard,
        }
    }

    #[test]
    fn clamp_maps_non_finite_to_minimum() {
        assert_eq!(clamp(f64::NAN), METRIC_MIN);
        assert_eq!(clamp(f64::INFINITY), METRIC_MIN);
        assert_eq!(clamp(f64::NEG_INFINITY), METRIC_MIN);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(clamp(-3.0), 0.0);
        assert_eq!(clamp(150.0), 100.0);
        assert_eq!(clamp(42.5), 42.5);
    }

    proptest! {
        #[test]
        fn clamp_stays_in_range(v in proptest::num::f64::ANY) {
            let clamped = clamp(v);
            prop_assert!((METRIC_MIN..=METRIC_MAX).contains(&clamped));
        }

        #[test]
        fn clamp_is_idempotent(v in proptest::num::f64::ANY) {
            prop_assert_eq!(clamp(clamp(v)), clamp(v));
        }

        #[test]
        fn inverted_limits_collapse(soft in 0.0f64..=100.0, hard in 0.0f64..=100.0) {
            prop_assume!(soft > hard);
            let (repaired, _) = metric(0.0, soft, hard).normalized();
            prop_assert_eq!(repaired.soft_limit, repaired.hard_limit);
        }
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let err = metric(10.0, 120.0, 90.0).validate().unwrap_err();
        assert!(err.to_string().contains("softLimit"));

        let err = metric(10.0, 20.0, -1.0).validate().unwrap_err();
        assert!(err.to_string().contains("hardLimit"));

        let err = metric(101.0, 20.0, 90.0).validate().unwrap_err();
        assert!(err.to_string().contains("current"));
    }

    #[test]
    fn validate_rejects_inverted_limits() {
        let err = metric(10.0, 80.0, 40.0).validate().unwrap_err();
        assert!(err.to_string().contains("softLimit must be <= hardLimit"));
    }

    #[test]
    fn validate_rejects_non_finite() {
        let err = metric(f64::NAN, 20.0, 90.0).validate().unwrap_err();
        assert!(err.to_string().contains("invalid numbers"));
    }

    #[test]
    fn validate_accepts_well_formed() {
        metric(30.0, 40.0, 90.0).validate().unwrap();
    }

    #[test]
    fn normalize_repairs_range_and_order() {
        let (repaired, changed) = metric(150.0, -5.0, 80.0).normalized();
        assert!(changed);
        assert_eq!(repaired, metric(80.0, 0.0, 80.0));
    }

    #[test]
    fn normalize_reports_unchanged_for_legal_input() {
        let (repaired, changed) = metric(30.0, 40.0, 90.0).normalized();
        assert!(!changed);
        assert_eq!(repaired, metric(30.0, 40.0, 90.0));
    }

    #[test]
    fn normalize_values_requires_recognized_slot() {
        let mut values = MetricMap::new();
        let err = normalize_values(&mut values).unwrap_err();
        assert_eq!(err.to_string(), "values.metric is required");

        values.insert("other".to_string(), metric(1.0, 2.0, 3.0));
        assert!(normalize_values(&mut values).is_err());
    }

    #[test]
    fn normalize_values_updates_slot_in_place() {
        let mut values = MetricMap::new();
        values.insert(METRIC_KEY.to_string(), metric(150.0, -5.0, 80.0));
        assert!(normalize_values(&mut values).unwrap());
        assert_eq!(values[METRIC_KEY], metric(80.0, 0.0, 80.0));

        // Second pass is a no-op.
        assert!(!normalize_values(&mut values).unwrap());
    }
}
