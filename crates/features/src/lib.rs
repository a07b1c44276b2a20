//! LinkGuard Feature Engineering
//!
//! Produces the fixed-width numeric feature vector the classifier was
//! trained on. The schema (length, ordering, defaults) is frozen in
//! `data/feature_schema.json`; see [`schema`] for the in-code mirror.

pub mod extractor;
pub mod schema;

use serde::{Deserialize, Serialize};

pub use extractor::extract;
pub use schema::{feature_index, is_high_abuse_tld, FeatureSpec, FEATURE_COUNT, SCHEMA};

/// Fixed-width feature vector, parallel to [`schema::SCHEMA`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub(crate) fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Vector filled with schema defaults
    pub fn defaults() -> Self {
        Self {
            values: SCHEMA.iter().map(|s| s.default).collect(),
        }
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for a named slot; `None` for unknown names
    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|i| self.values[i])
    }

    /// Stable slot name for an index
    pub fn name(index: usize) -> Option<&'static str> {
        SCHEMA.get(index).map(|s| s.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_schema() {
        let v = FeatureVector::defaults();
        assert_eq!(v.len(), FEATURE_COUNT);
        assert_eq!(v.get("port_number"), Some(-1.0));
        assert_eq!(v.get("url_length"), Some(0.0));
    }

    #[test]
    fn test_name_round_trip() {
        for (i, spec) in SCHEMA.iter().enumerate() {
            assert_eq!(FeatureVector::name(i), Some(spec.name));
            assert_eq!(feature_index(spec.name), Some(i));
        }
    }
}
