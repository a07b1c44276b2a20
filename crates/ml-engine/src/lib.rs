//! LinkGuard ML Engine
//!
//! Wraps the pre-trained gradient-boosted URL classifier:
//! - artifact loading with schema validation against the frozen feature
//!   schema
//! - thread-safe inference (the model is immutable after load)
//! - decision-path attribution exposing the top per-feature
//!   contributions of each prediction

pub mod attribution;
pub mod model;

use linkguard_features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub use model::GbdtModel;

/// Number of explanation entries returned per prediction
pub const DEFAULT_TOP_K: usize = 6;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to load model artifact: {0}")]
    Load(String),

    #[error("model expects {found} features but the schema has {expected}")]
    SchemaMismatch { expected: usize, found: usize },

    #[error("malformed model artifact: {0}")]
    Malformed(String),
}

/// Whether a contribution pushed the prediction toward risk or safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Risk,
    Safe,
}

/// One entry of the per-prediction explanation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: String,
    pub shap_value: f64,
    pub feature_value: f64,
    pub direction: Direction,
}

/// ML block of the scan response. `dampened_score` starts equal to
/// `xgb_score` and is overwritten by the verdict fuser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlDetails {
    pub ml_score: f64,
    pub xgb_score: f64,
    pub dampened_score: f64,
    pub explanation: Vec<FeatureContribution>,
}

/// Predictor handle shared across requests.
pub struct MlPredictor {
    model: Arc<GbdtModel>,
    top_k: usize,
}

impl MlPredictor {
    pub fn new(model: Arc<GbdtModel>) -> Self {
        Self {
            model,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Load from `model_path`, or fall back to the compiled-in default.
    pub fn from_path(path: Option<&Path>) -> Result<Self, ModelError> {
        let model = match path {
            Some(p) => GbdtModel::load(p)?,
            None => GbdtModel::builtin()?,
        };
        Ok(Self::new(Arc::new(model)))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Score one feature vector. Pure and thread-safe.
    pub fn predict(&self, features: &FeatureVector) -> Result<MlDetails, ModelError> {
        if features.len() != linkguard_features::FEATURE_COUNT {
            return Err(ModelError::SchemaMismatch {
                expected: linkguard_features::FEATURE_COUNT,
                found: features.len(),
            });
        }

        let xgb_score = self.model.predict_proba(features.values());
        let explanation = attribution::top_contributions(&self.model, features, self.top_k);

        debug!(score = xgb_score, explained = explanation.len(), "ML prediction");

        // ml_score mirrors xgb_score; the legacy field is kept for
        // response-schema stability.
        Ok(MlDetails {
            ml_score: xgb_score,
            xgb_score,
            dampened_score: xgb_score,
            explanation,
        })
    }

    pub fn model(&self) -> &Arc<GbdtModel> {
        &self.model
    }
}
