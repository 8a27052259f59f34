//! Raw record to feature vector.

use crate::features::{Feature, FeatureVector, FEATURE_COUNT};
use crate::records::{Gender, RawRecord, ResidenceType, SmokingStatus, WorkType};

#[inline]
fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

fn work_type_column(work_type: &WorkType) -> Option<Feature> {
    match work_type {
        WorkType::GovtJob => Some(Feature::WorkTypeGovtJob),
        WorkType::NeverWorked => Some(Feature::WorkTypeNeverWorked),
        WorkType::Private => Some(Feature::WorkTypePrivate),
        WorkType::SelfEmployed => Some(Feature::WorkTypeSelfEmployed),
        WorkType::Children => Some(Feature::WorkTypeChildren),
        WorkType::Unrecognized(_) => None,
    }
}

fn smoking_column(status: &SmokingStatus) -> Option<Feature> {
    match status {
        SmokingStatus::NeverSmoked => Some(Feature::SmokingNeverSmoked),
        SmokingStatus::FormerlySmoked => Some(Feature::SmokingFormerlySmoked),
        SmokingStatus::Smokes => Some(Feature::SmokingSmokes),
        SmokingStatus::Unknown | SmokingStatus::Unrecognized(_) => None,
    }
}

/// Encodes one record in the classifier's column order. Total and pure:
/// out-of-range numbers pass through unchanged and unrecognized categories
/// leave their indicator group at zero.
pub fn encode(record: &RawRecord) -> FeatureVector {
    let mut v = [0.0; FEATURE_COUNT];

    let age = record.age;
    let glucose = record.avg_glucose_level;
    let bmi = record.bmi;
    let hypertension = indicator(record.hypertension);

    v[Feature::Age.index()] = age;
    v[Feature::Hypertension.index()] = hypertension;
    v[Feature::HeartDisease.index()] = indicator(record.heart_disease);
    v[Feature::EverMarried.index()] = indicator(record.ever_married);
    v[Feature::AvgGlucoseLevel.index()] = glucose;
    v[Feature::Bmi.index()] = bmi;
    v[Feature::ResidenceUrban.index()] = indicator(record.residence_type == ResidenceType::Urban);
    v[Feature::GenderMale.index()] = indicator(record.gender == Gender::Male);

    if let Some(column) = work_type_column(&record.work_type) {
        v[column.index()] = 1.0;
    }
    if let Some(column) = smoking_column(&record.smoking_status) {
        v[column.index()] = 1.0;
    }
    let smokes = v[Feature::SmokingSmokes.index()];

    v[Feature::AgeUnder45.index()] = indicator(age < 45.0);
    v[Feature::AgeSquared.index()] = age * age;
    v[Feature::AgeOver65.index()] = indicator(age > 65.0);
    v[Feature::AgeGlucoseInteraction.index()] = age * glucose;
    v[Feature::AgeHypertensionInteraction.index()] = age * hypertension;
    v[Feature::SmokingAgeInteraction.index()] = age * smokes;
    v[Feature::BmiGlucoseInteraction.index()] = bmi * glucose;
    v[Feature::GlucoseSquared.index()] = glucose * glucose;
    v[Feature::BmiSquared.index()] = bmi * bmi;

    FeatureVector::from_array(v)
}

pub fn encode_all(records: &[RawRecord]) -> Vec<FeatureVector> {
    records.iter().map(encode).collect()
}
