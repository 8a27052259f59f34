//! Human-facing reading of a prediction: risk bands, confidence and the
//! rule-of-thumb clinical factors shown next to the model's own ranking.

use std::fmt;

use serde::Serialize;

use crate::records::{RawRecord, SmokingStatus};
use crate::scorer::{PredictionResult, RankedFactor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    ModerateLow,
    ModerateHigh,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> RiskLevel {
        if probability < 0.2 {
            RiskLevel::Low
        } else if probability < 0.4 {
            RiskLevel::ModerateLow
        } else if probability < 0.6 {
            RiskLevel::ModerateHigh
        } else {
            RiskLevel::High
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            RiskLevel::Low => {
                "Patient shows minimal stroke risk indicators. Continue regular health monitoring."
            }
            RiskLevel::ModerateLow => {
                "Some risk factors present. Recommend lifestyle modifications and regular check-ups."
            }
            RiskLevel::ModerateHigh => {
                "Multiple risk factors detected. Consider preventive interventions and closer monitoring."
            }
            RiskLevel::High => {
                "Significant stroke risk detected. Immediate medical consultation and intervention recommended."
            }
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::ModerateLow => write!(f, "Moderate-Low"),
            RiskLevel::ModerateHigh => write!(f, "Moderate-High"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Distance of the probability from the 0.5 decision boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_probability(probability: f64) -> Confidence {
        let distance = (probability - 0.5).abs();
        if distance > 0.3 {
            Confidence::High
        } else if distance > 0.15 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

pub fn is_high_risk(probability: f64) -> bool {
    probability > 0.5
}

/// Well-known stroke risk factors present in the raw input, independent of
/// what the model weighted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ClinicalFactor {
    AdvancedAge(f64),
    Hypertension,
    HeartDisease,
    ElevatedGlucose(f64),
    Obesity(f64),
    CurrentSmoker,
}

impl fmt::Display for ClinicalFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClinicalFactor::AdvancedAge(age) => {
                write!(f, "Age: {:.0} years (increased risk after 65)", age)
            }
            ClinicalFactor::Hypertension => write!(f, "Hypertension: present (major risk factor)"),
            ClinicalFactor::HeartDisease => {
                write!(f, "Heart disease: present (significant risk factor)")
            }
            ClinicalFactor::ElevatedGlucose(level) => {
                write!(f, "Glucose level: {:.0} mg/dL (elevated)", level)
            }
            ClinicalFactor::Obesity(bmi) => write!(f, "BMI: {:.1} (obese category)", bmi),
            ClinicalFactor::CurrentSmoker => write!(f, "Smoking: current smoker (major risk factor)"),
        }
    }
}

pub fn clinical_factors(record: &RawRecord) -> Vec<ClinicalFactor> {
    let mut factors = Vec::new();
    if record.age > 65.0 {
        factors.push(ClinicalFactor::AdvancedAge(record.age));
    }
    if record.hypertension {
        factors.push(ClinicalFactor::Hypertension);
    }
    if record.heart_disease {
        factors.push(ClinicalFactor::HeartDisease);
    }
    if record.avg_glucose_level > 140.0 {
        factors.push(ClinicalFactor::ElevatedGlucose(record.avg_glucose_level));
    }
    if record.bmi > 30.0 {
        factors.push(ClinicalFactor::Obesity(record.bmi));
    }
    if record.smoking_status == SmokingStatus::Smokes {
        factors.push(ClinicalFactor::CurrentSmoker);
    }
    factors
}

/// Everything the front end shows for one patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub confidence: Confidence,
    pub high_risk: bool,
    pub ranked_factors: Vec<RankedFactor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation_error: Option<String>,
    pub clinical_factors: Vec<ClinicalFactor>,
}

impl PredictionReport {
    pub fn new(record: &RawRecord, result: &PredictionResult) -> PredictionReport {
        let p = result.probability;
        PredictionReport {
            probability: p,
            risk_level: RiskLevel::from_probability(p),
            confidence: Confidence::from_probability(p),
            high_risk: is_high_risk(p),
            ranked_factors: result.factors().to_vec(),
            explanation_error: result.ranked_factors.as_ref().err().map(|e| e.reason.clone()),
            clinical_factors: clinical_factors(record),
        }
    }

    /// `name:+impact` pairs joined with `;`, for flat outputs like CSV.
    pub fn factor_summary(&self) -> String {
        self.ranked_factors
            .iter()
            .map(|f| format!("{}:{:+.4}", f.feature, f.impact))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for PredictionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Risk level:  {} ({})",
            if self.high_risk { "High" } else { "Low" },
            self.risk_level
        )?;
        writeln!(f, "Probability: {:.1}%", self.probability * 100.0)?;
        writeln!(f, "Confidence:  {}", self.confidence)?;
        writeln!(f, "{}", self.risk_level.advice())?;

        if !self.ranked_factors.is_empty() {
            writeln!(f, "\nTop factors influencing the prediction:")?;
            for factor in &self.ranked_factors {
                match factor.raw_value {
                    Some(value) => writeln!(
                        f,
                        "  {:<32} {:+.4}  (input {})",
                        factor.feature.name(),
                        factor.impact,
                        value
                    )?,
                    None => writeln!(f, "  {:<32} {:+.4}", factor.feature.name(), factor.impact)?,
                }
            }
        } else if let Some(reason) = &self.explanation_error {
            writeln!(f, "\nNo model explanation: {}", reason)?;
        }

        writeln!(f, "\nKey clinical risk factors:")?;
        if self.clinical_factors.is_empty() {
            writeln!(f, "  none detected in this assessment")?;
        }
        for factor in &self.clinical_factors {
            writeln!(f, "  - {}", factor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplanationUnavailable;
    use crate::features::Feature;

    #[test]
    fn risk_bands() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.2), RiskLevel::ModerateLow);
        assert_eq!(RiskLevel::from_probability(0.59), RiskLevel::ModerateHigh);
        assert_eq!(RiskLevel::from_probability(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::ModerateHigh.to_string(), "Moderate-High");
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(Confidence::from_probability(0.95), Confidence::High);
        assert_eq!(Confidence::from_probability(0.3), Confidence::Medium);
        assert_eq!(Confidence::from_probability(0.55), Confidence::Low);
    }

    #[test]
    fn clinical_factors_follow_thresholds() {
        let record = RawRecord {
            age: 66.0,
            hypertension: true,
            avg_glucose_level: 140.0,
            bmi: 30.5,
            smoking_status: SmokingStatus::Smokes,
            ..RawRecord::default()
        };
        assert_eq!(
            clinical_factors(&record),
            vec![
                ClinicalFactor::AdvancedAge(66.0),
                ClinicalFactor::Hypertension,
                ClinicalFactor::Obesity(30.5),
                ClinicalFactor::CurrentSmoker,
            ]
        );
        assert!(clinical_factors(&RawRecord::default()).is_empty());
    }

    #[test]
    fn report_carries_explanation_failure() {
        let result = PredictionResult {
            probability: 0.72,
            ranked_factors: Err(ExplanationUnavailable::new("no attribution")),
        };
        let report = PredictionReport::new(&RawRecord::default(), &result);
        assert!(report.high_risk);
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.explanation_error.as_deref(), Some("no attribution"));
        assert!(report.to_string().contains("No model explanation: no attribution"));
    }

    #[test]
    fn factor_summary_is_flat() {
        let result = PredictionResult {
            probability: 0.1,
            ranked_factors: Ok(vec![
                RankedFactor {
                    feature: Feature::Age,
                    raw_value: Some(70.0),
                    impact: 0.5,
                },
                RankedFactor {
                    feature: Feature::BmiSquared,
                    raw_value: None,
                    impact: -0.25,
                },
            ]),
        };
        let report = PredictionReport::new(&RawRecord::default(), &result);
        assert_eq!(report.factor_summary(), "age:+0.5000;bmi_squared:-0.2500");
    }
}
