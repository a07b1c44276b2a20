//! Per-prediction feature attribution
//!
//! Walks each tree's decision path and credits the change in expected
//! margin at every split to the feature that was split on. The part of
//! the prediction no split explains (each tree's root expectation) is
//! featureless bias, carried by [`GbdtModel::expected_value`]:
//! contributions plus the expected value sum exactly to the predicted
//! margin, so signs are directly interpretable: positive pushes toward
//! risk.

use linkguard_features::{FeatureVector, FEATURE_COUNT};

use crate::model::GbdtModel;
use crate::{Direction, FeatureContribution};

/// Signed margin contribution per feature slot.
pub fn attribute(model: &GbdtModel, x: &[f64]) -> Vec<f64> {
    let mut contributions = vec![0.0; FEATURE_COUNT];

    for tree in &model.trees {
        let path = tree.decision_path(x);
        for pair in path.windows(2) {
            let parent = &tree.nodes[pair[0]];
            let child = &tree.nodes[pair[1]];
            if let crate::model::Node::Split { feature, .. } = parent {
                contributions[*feature] += child.value() - parent.value();
            }
        }
    }

    contributions
}

/// Top-K contributions by magnitude, largest first, for the response's
/// explanation block.
pub fn top_contributions(
    model: &GbdtModel,
    features: &FeatureVector,
    k: usize,
) -> Vec<FeatureContribution> {
    let contributions = attribute(model, features.values());

    let mut ranked: Vec<(usize, f64)> = contributions
        .into_iter()
        .enumerate()
        .filter(|(_, c)| *c != 0.0)
        .collect();
    ranked.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(k);

    ranked
        .into_iter()
        .map(|(index, shap_value)| FeatureContribution {
            feature: FeatureVector::name(index).unwrap_or("unknown").to_string(),
            shap_value,
            feature_value: features.values()[index],
            direction: if shap_value > 0.0 {
                Direction::Risk
            } else {
                Direction::Safe
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkguard_features::extract;
    use linkguard_url_core::normalize;

    #[test]
    fn test_contributions_sum_to_margin() {
        let model = GbdtModel::builtin().unwrap();
        for raw in [
            "http://185.23.14.9/login",
            "https://example.com/",
            "https://secure-login-verify.example.tk/account",
        ] {
            let url = normalize(raw).unwrap();
            let features = extract(&url);

            let contributions = attribute(&model, features.values());
            let total: f64 = contributions.iter().sum();
            let margin = model.predict_margin(features.values());

            assert!(
                (model.expected_value() + total - margin).abs() < 1e-9,
                "{}: expected_value {} + contributions {} != margin {}",
                raw,
                model.expected_value(),
                total,
                margin
            );
        }
    }

    #[test]
    fn test_builtin_base_score_reconciles() {
        // The shipped artifact is root-normalized (every tree's root
        // expectation is zero), so the additive property also holds
        // against its literal base_score.
        let model = GbdtModel::builtin().unwrap();
        let url = normalize("http://185.23.14.9/login").unwrap();
        let features = extract(&url);

        let total: f64 = attribute(&model, features.values()).iter().sum();
        let margin = model.predict_margin(features.values());

        assert_eq!(model.expected_value(), model.base_score());
        assert!((model.base_score() + total - margin).abs() < 1e-9);
    }

    #[test]
    fn test_total_attribution_finite() {
        let model = GbdtModel::builtin().unwrap();
        let url = normalize("https://example.com/").unwrap();
        let features = extract(&url);
        let contributions = attribute(&model, features.values());
        let magnitude: f64 = contributions.iter().map(|c| c.abs()).sum();
        assert!(magnitude.is_finite());
    }

    #[test]
    fn test_ip_literal_ranks_as_risk() {
        let model = GbdtModel::builtin().unwrap();
        let url = normalize("http://185.23.14.9/login").unwrap();
        let features = extract(&url);

        let top = top_contributions(&model, &features, 6);
        assert!(!top.is_empty());
        assert!(top.len() <= 6);
        let ip_contribution = top.iter().find(|c| c.feature == "is_ip_literal").unwrap();
        assert!(matches!(ip_contribution.direction, Direction::Risk));
        assert!(ip_contribution.shap_value > 0.0);
        assert_eq!(ip_contribution.feature_value, 1.0);
    }

    #[test]
    fn test_ranking_by_magnitude() {
        let model = GbdtModel::builtin().unwrap();
        let url = normalize("https://secure-login-verify.example.tk/account").unwrap();
        let features = extract(&url);

        let top = top_contributions(&model, &features, 6);
        for pair in top.windows(2) {
            assert!(pair[0].shap_value.abs() >= pair[1].shap_value.abs());
        }
    }
}
