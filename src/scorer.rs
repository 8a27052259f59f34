//! Scoring a feature vector and explaining the score.

use log::{debug, warn};
use serde::Serialize;

use crate::classifier::RiskClassifier;
use crate::error::{ExplanationUnavailable, ScoringError};
use crate::features::{self, Feature, FeatureVector, FEATURE_COUNT};

pub const DEFAULT_TOP_FACTORS: usize = 5;

/// One feature's share of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedFactor {
    pub feature: Feature,
    /// Input value on its original scale; `None` for derived columns.
    pub raw_value: Option<f64>,
    /// Signed contribution to the model margin.
    pub impact: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// Probability of the positive (stroke) class.
    pub probability: f64,
    /// Largest contributions first. An `Err` leaves `probability` valid.
    pub ranked_factors: Result<Vec<RankedFactor>, ExplanationUnavailable>,
}

impl PredictionResult {
    /// Ranked factors, or an empty slice when no explanation was produced.
    pub fn factors(&self) -> &[RankedFactor] {
        match &self.ranked_factors {
            Ok(factors) => factors,
            Err(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOptions {
    pub top_n: usize,
    pub explain: bool,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        ScoreOptions {
            top_n: DEFAULT_TOP_FACTORS,
            explain: true,
        }
    }
}

fn positive_class(row: &[f64]) -> Result<f64, ScoringError> {
    let p = *row
        .get(1)
        .ok_or(ScoringError::MissingPositiveClass { classes: row.len() })?;
    if !(0.0..=1.0).contains(&p) {
        return Err(ScoringError::InvalidProbability { value: p });
    }
    Ok(p)
}

fn probabilities<C: RiskClassifier + ?Sized>(
    vectors: &[FeatureVector],
    classifier: &C,
) -> Result<Vec<f64>, ScoringError> {
    let proba = classifier.predict_proba(&features::stack(vectors))?;
    if proba.len() != vectors.len() {
        return Err(ScoringError::RowCountMismatch {
            expected: vectors.len(),
            actual: proba.len(),
        });
    }
    proba.iter().map(|row| positive_class(row)).collect()
}

/// Stroke probability for one patient.
pub fn predict_probability<C: RiskClassifier + ?Sized>(
    vector: &FeatureVector,
    classifier: &C,
) -> Result<f64, ScoringError> {
    let p = probabilities(std::slice::from_ref(vector), classifier)?[0];
    debug!("stroke probability {:.4}", p);
    Ok(p)
}

/// Pairs attributions with their features and keeps the `top_n` largest by
/// magnitude. Zero contributions are dropped; ties keep column order.
pub fn rank_factors(
    vector: &FeatureVector,
    attributions: &[f64],
    top_n: usize,
) -> Result<Vec<RankedFactor>, ExplanationUnavailable> {
    if attributions.len() != FEATURE_COUNT {
        return Err(ExplanationUnavailable::new(format!(
            "expected {} attributions, got {}",
            FEATURE_COUNT,
            attributions.len()
        )));
    }
    if let Some(i) = attributions.iter().position(|a| !a.is_finite()) {
        return Err(ExplanationUnavailable::new(format!(
            "attribution for {} is not finite",
            Feature::ALL[i]
        )));
    }

    let mut factors: Vec<RankedFactor> = Feature::ALL
        .iter()
        .zip(attributions)
        .filter(|(_, impact)| **impact != 0.0)
        .map(|(feature, impact)| RankedFactor {
            feature: *feature,
            raw_value: vector.raw_value(*feature),
            impact: *impact,
        })
        .collect();
    // stable, so equal magnitudes stay in column order
    factors.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    factors.truncate(top_n);
    Ok(factors)
}

/// Top contributing features for one patient.
pub fn explain<C: RiskClassifier + ?Sized>(
    vector: &FeatureVector,
    classifier: &C,
    top_n: usize,
) -> Result<Vec<RankedFactor>, ExplanationUnavailable> {
    let attributions = classifier.attribute(&vector.to_matrix())?;
    let row = attributions
        .first()
        .ok_or_else(|| ExplanationUnavailable::new("classifier returned no attribution rows"))?;
    rank_factors(vector, row, top_n)
}

/// Probability plus the top five factors.
pub fn score<C: RiskClassifier + ?Sized>(
    vector: &FeatureVector,
    classifier: &C,
) -> Result<PredictionResult, ScoringError> {
    score_with(vector, classifier, ScoreOptions::default())
}

pub fn score_with<C: RiskClassifier + ?Sized>(
    vector: &FeatureVector,
    classifier: &C,
    options: ScoreOptions,
) -> Result<PredictionResult, ScoringError> {
    let probability = predict_probability(vector, classifier)?;
    let ranked_factors = if options.explain {
        explain(vector, classifier, options.top_n)
    } else {
        Err(ExplanationUnavailable::new("explanation disabled"))
    };
    if let Err(e) = &ranked_factors {
        debug!("{}", e);
    }
    Ok(PredictionResult {
        probability,
        ranked_factors,
    })
}

/// Scores many patients with one classifier call per operation.
pub fn score_batch<C: RiskClassifier + ?Sized>(
    vectors: &[FeatureVector],
    classifier: &C,
    options: ScoreOptions,
) -> Result<Vec<PredictionResult>, ScoringError> {
    if vectors.is_empty() {
        return Ok(Vec::new());
    }
    let probabilities = probabilities(vectors, classifier)?;

    let explanations: Vec<Result<Vec<RankedFactor>, ExplanationUnavailable>> = if !options.explain {
        let disabled = ExplanationUnavailable::new("explanation disabled");
        vec![Err(disabled); vectors.len()]
    } else {
        match classifier.attribute(&features::stack(vectors)) {
            Ok(rows) if rows.len() == vectors.len() => vectors
                .iter()
                .zip(&rows)
                .map(|(vector, row)| rank_factors(vector, row, options.top_n))
                .collect(),
            Ok(rows) => {
                let e = ExplanationUnavailable::new(format!(
                    "classifier returned {} attribution rows for {} inputs",
                    rows.len(),
                    vectors.len()
                ));
                warn!("{}", e);
                vec![Err(e); vectors.len()]
            }
            Err(e) => {
                warn!("{}", e);
                vec![Err(e); vectors.len()]
            }
        }
    };

    Ok(probabilities
        .into_iter()
        .zip(explanations)
        .map(|(probability, ranked_factors)| PredictionResult {
            probability,
            ranked_factors,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use smartcore::linalg::basic::arrays::Array;
    use smartcore::linalg::basic::matrix::DenseMatrix;

    struct Fixed {
        proba: Vec<f64>,
        attributions: Option<Vec<f64>>,
    }

    impl RiskClassifier for Fixed {
        fn predict_proba(&self, _features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ScoringError> {
            Ok(vec![self.proba.clone()])
        }

        fn attribute(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ExplanationUnavailable> {
            match &self.attributions {
                Some(a) => Ok(vec![a.clone()]),
                None => Err(ExplanationUnavailable::new(format!("unsupported for {:?}", features.shape()))),
            }
        }
    }

    fn vector() -> FeatureVector {
        let mut v = [0.0; FEATURE_COUNT];
        v[Feature::Age.index()] = 70.0;
        v[Feature::Hypertension.index()] = 1.0;
        v[Feature::AgeSquared.index()] = 4900.0;
        FeatureVector::from_array(v)
    }

    fn attributions(pairs: &[(Feature, f64)]) -> Vec<f64> {
        let mut a = vec![0.0; FEATURE_COUNT];
        for (f, value) in pairs {
            a[f.index()] = *value;
        }
        a
    }

    #[test]
    fn ranks_by_magnitude_and_keeps_sign() {
        let a = attributions(&[
            (Feature::Hypertension, 0.2),
            (Feature::Age, 0.9),
            (Feature::Bmi, -0.5),
            (Feature::AgeSquared, 0.3),
        ]);
        let ranked = rank_factors(&vector(), &a, 5).unwrap();
        let order: Vec<Feature> = ranked.iter().map(|f| f.feature).collect();
        assert_eq!(
            order,
            vec![Feature::Age, Feature::Bmi, Feature::AgeSquared, Feature::Hypertension]
        );
        assert_eq!(ranked[1].impact, -0.5);
        assert_eq!(ranked[0].raw_value, Some(70.0));
        assert_eq!(ranked[2].raw_value, None);
    }

    #[test]
    fn truncates_to_top_n_with_stable_ties() {
        let a = attributions(&[
            (Feature::BmiSquared, 0.1),
            (Feature::Age, -0.1),
            (Feature::GenderMale, 0.1),
            (Feature::Bmi, 0.1),
            (Feature::EverMarried, 0.1),
            (Feature::HeartDisease, 0.1),
        ]);
        let ranked = rank_factors(&vector(), &a, 5).unwrap();
        let order: Vec<Feature> = ranked.iter().map(|f| f.feature).collect();
        assert_eq!(
            order,
            vec![
                Feature::Age,
                Feature::HeartDisease,
                Feature::EverMarried,
                Feature::Bmi,
                Feature::GenderMale
            ]
        );
    }

    #[test]
    fn wrong_attribution_length_is_unavailable() {
        assert!(rank_factors(&vector(), &[0.1, 0.2], 5).is_err());
        let mut a = attributions(&[]);
        a[3] = f64::NAN;
        assert!(rank_factors(&vector(), &a, 5).is_err());
    }

    #[test]
    fn missing_explanation_keeps_probability() {
        let model = Fixed {
            proba: vec![0.7, 0.3],
            attributions: None,
        };
        let result = score(&vector(), &model).unwrap();
        assert_eq!(result.probability, 0.3);
        assert!(result.ranked_factors.is_err());
        assert!(result.factors().is_empty());
    }

    #[test]
    fn single_class_output_is_a_scoring_error() {
        let model = Fixed {
            proba: vec![1.0],
            attributions: None,
        };
        assert_eq!(
            score(&vector(), &model).unwrap_err(),
            ScoringError::MissingPositiveClass { classes: 1 }
        );
    }

    #[test]
    fn out_of_range_probability_is_a_scoring_error() {
        let model = Fixed {
            proba: vec![-0.2, 1.2],
            attributions: None,
        };
        assert!(matches!(
            predict_probability(&vector(), &model),
            Err(ScoringError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn explanation_can_be_skipped() {
        let model = Fixed {
            proba: vec![0.4, 0.6],
            attributions: Some(attributions(&[(Feature::Age, 1.0)])),
        };
        let options = ScoreOptions {
            explain: false,
            ..ScoreOptions::default()
        };
        let result = score_with(&vector(), &model, options).unwrap();
        assert_eq!(result.probability, 0.6);
        assert!(result.ranked_factors.is_err());

        let explained = score(&vector(), &model).unwrap();
        assert_eq!(explained.factors().len(), 1);
    }
}
