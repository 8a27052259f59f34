//! The classifier's input schema.
//!
//! The model was trained on positional columns, so the order of [`Feature::ALL`]
//! is part of the model contract and must never change independently of it.

use std::fmt;
use std::ops::Index;

use serde::{Serialize, Serializer};
use smartcore::linalg::basic::matrix::DenseMatrix;

pub const FEATURE_COUNT: usize = 25;

/// Column names, in training order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "hypertension",
    "heart_disease",
    "ever_married",
    "avg_glucose_level",
    "bmi",
    "residence_urban",
    "gender_male",
    "work_type_govt_job",
    "work_type_never_worked",
    "work_type_private",
    "work_type_self-employed",
    "work_type_children",
    "smoking_status_never_smoked",
    "smoking_status_formerly_smoked",
    "smoking_status_smokes",
    "age_under_45",
    "age_squared",
    "age_over_65",
    "age_glucose_interaction",
    "age_hypertension_interaction",
    "smoking_age_interaction",
    "bmi_glucose_interaction",
    "glucose_squared",
    "bmi_squared",
];

/// One column of the feature vector. The discriminant is the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Age,
    Hypertension,
    HeartDisease,
    EverMarried,
    AvgGlucoseLevel,
    Bmi,
    ResidenceUrban,
    GenderMale,
    WorkTypeGovtJob,
    WorkTypeNeverWorked,
    WorkTypePrivate,
    WorkTypeSelfEmployed,
    WorkTypeChildren,
    SmokingNeverSmoked,
    SmokingFormerlySmoked,
    SmokingSmokes,
    AgeUnder45,
    AgeSquared,
    AgeOver65,
    AgeGlucoseInteraction,
    AgeHypertensionInteraction,
    SmokingAgeInteraction,
    BmiGlucoseInteraction,
    GlucoseSquared,
    BmiSquared,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Age,
        Feature::Hypertension,
        Feature::HeartDisease,
        Feature::EverMarried,
        Feature::AvgGlucoseLevel,
        Feature::Bmi,
        Feature::ResidenceUrban,
        Feature::GenderMale,
        Feature::WorkTypeGovtJob,
        Feature::WorkTypeNeverWorked,
        Feature::WorkTypePrivate,
        Feature::WorkTypeSelfEmployed,
        Feature::WorkTypeChildren,
        Feature::SmokingNeverSmoked,
        Feature::SmokingFormerlySmoked,
        Feature::SmokingSmokes,
        Feature::AgeUnder45,
        Feature::AgeSquared,
        Feature::AgeOver65,
        Feature::AgeGlucoseInteraction,
        Feature::AgeHypertensionInteraction,
        Feature::SmokingAgeInteraction,
        Feature::BmiGlucoseInteraction,
        Feature::GlucoseSquared,
        Feature::BmiSquared,
    ];

    pub const WORK_TYPE: [Feature; 5] = [
        Feature::WorkTypeGovtJob,
        Feature::WorkTypeNeverWorked,
        Feature::WorkTypePrivate,
        Feature::WorkTypeSelfEmployed,
        Feature::WorkTypeChildren,
    ];

    pub const SMOKING_STATUS: [Feature; 3] = [
        Feature::SmokingNeverSmoked,
        Feature::SmokingFormerlySmoked,
        Feature::SmokingSmokes,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        FEATURE_NAMES[self as usize]
    }

    /// Thresholds, interactions and squares computed from other columns.
    /// Everything before `AgeUnder45` is a direct mapping of one input field.
    #[inline]
    pub const fn is_derived(self) -> bool {
        self as usize >= Feature::AgeUnder45 as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Encoded input for one patient, always `FEATURE_COUNT` floats in
/// [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        FeatureVector { values }
    }

    #[inline]
    pub fn get(&self, feature: Feature) -> f64 {
        self.values[feature.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Value as entered on the form. Derived columns have no such value.
    pub fn raw_value(&self, feature: Feature) -> Option<f64> {
        if feature.is_derived() {
            None
        } else {
            Some(self.get(feature))
        }
    }

    /// A 1 x `FEATURE_COUNT` matrix, the shape the classifier scores.
    pub fn to_matrix(&self) -> DenseMatrix<f64> {
        stack(std::slice::from_ref(self))
    }
}

impl Index<Feature> for FeatureVector {
    type Output = f64;

    fn index(&self, feature: Feature) -> &f64 {
        &self.values[feature.index()]
    }
}

/// Row-major stack of vectors, one row per patient.
pub fn stack(vectors: &[FeatureVector]) -> DenseMatrix<f64> {
    let values: Vec<f64> = vectors
        .iter()
        .flat_map(|v| v.values.iter().copied())
        .collect();
    DenseMatrix::new(vectors.len(), FEATURE_COUNT, values, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcore::linalg::basic::arrays::Array;

    #[test]
    fn names_and_variants_line_up() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(feature.name(), FEATURE_NAMES[i]);
        }
        assert_eq!(Feature::WorkTypeSelfEmployed.name(), "work_type_self-employed");
        assert_eq!(Feature::BmiSquared.name(), "bmi_squared");
    }

    #[test]
    fn only_trailing_columns_are_derived() {
        let derived: Vec<_> = Feature::ALL.iter().filter(|f| f.is_derived()).collect();
        assert_eq!(derived.len(), 9);
        assert!(!Feature::SmokingSmokes.is_derived());
        assert!(Feature::AgeUnder45.is_derived());
    }

    #[test]
    fn stacked_matrix_is_row_major() {
        let mut a = [0.0; FEATURE_COUNT];
        a[Feature::Bmi.index()] = 31.0;
        let mut b = [0.0; FEATURE_COUNT];
        b[Feature::Age.index()] = 80.0;
        let m = stack(&[FeatureVector::from_array(a), FeatureVector::from_array(b)]);

        assert_eq!(m.shape(), (2, FEATURE_COUNT));
        assert_eq!(*m.get((0, Feature::Bmi.index())), 31.0);
        assert_eq!(*m.get((1, Feature::Age.index())), 80.0);
        assert_eq!(*m.get((1, Feature::Bmi.index())), 0.0);
    }

    #[test]
    fn serializes_as_column_name() {
        let json = serde_json::to_string(&Feature::SmokingAgeInteraction).unwrap();
        assert_eq!(json, "\"smoking_age_interaction\"");
    }
}
