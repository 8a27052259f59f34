//! Raw patient input, as collected by the front end.

use std::fmt;
use std::ops::RangeInclusive;

use log::warn;
use polars::prelude::{DataFrame, DataType, Field, Float64Chunked, Schema, TakeRandom, TakeRandomUtf8, Utf8Chunked};

use crate::error::{EncodingError, Result};

/// Input ranges the collection layer enforces. The encoder accepts anything.
pub const AGE_RANGE: RangeInclusive<f64> = 0.0..=120.0;
pub const GLUCOSE_RANGE: RangeInclusive<f64> = 50.0..=300.0;
pub const BMI_RANGE: RangeInclusive<f64> = 10.0..=60.0;

/// Column names of a raw input table, in the order the form collects them.
pub const RAW_COLUMNS: [&str; 10] = [
    "age",
    "hypertension",
    "heart_disease",
    "ever_married",
    "avg_glucose_level",
    "bmi",
    "residence_type",
    "gender",
    "work_type",
    "smoking_status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl From<&str> for Gender {
    fn from(value: &str) -> Self {
        match value.trim() {
            "Male" => Gender::Male,
            "Female" => Gender::Female,
            _ => Gender::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidenceType {
    Urban,
    Rural,
}

impl From<&str> for ResidenceType {
    fn from(value: &str) -> Self {
        if value.trim() == "Urban" {
            ResidenceType::Urban
        } else {
            ResidenceType::Rural
        }
    }
}

/// Work category. Values outside the five known categories are kept as
/// `Unrecognized` and encode to all-zero indicators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkType {
    GovtJob,
    NeverWorked,
    Private,
    SelfEmployed,
    Children,
    Unrecognized(String),
}

impl From<&str> for WorkType {
    fn from(value: &str) -> Self {
        // underscore spellings are the ones used by the public stroke dataset
        match value.trim() {
            "Govt job" | "Govt_job" => WorkType::GovtJob,
            "Never worked" | "Never_worked" => WorkType::NeverWorked,
            "Private" => WorkType::Private,
            "Self-employed" => WorkType::SelfEmployed,
            "Children" | "children" => WorkType::Children,
            other => WorkType::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkType::GovtJob => write!(f, "Govt job"),
            WorkType::NeverWorked => write!(f, "Never worked"),
            WorkType::Private => write!(f, "Private"),
            WorkType::SelfEmployed => write!(f, "Self-employed"),
            WorkType::Children => write!(f, "Children"),
            WorkType::Unrecognized(other) => write!(f, "{}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokingStatus {
    NeverSmoked,
    FormerlySmoked,
    Smokes,
    Unknown,
    Unrecognized(String),
}

impl From<&str> for SmokingStatus {
    fn from(value: &str) -> Self {
        match value.trim() {
            "never smoked" => SmokingStatus::NeverSmoked,
            "formerly smoked" => SmokingStatus::FormerlySmoked,
            "smokes" => SmokingStatus::Smokes,
            "Unknown" => SmokingStatus::Unknown,
            other => SmokingStatus::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for SmokingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmokingStatus::NeverSmoked => write!(f, "never smoked"),
            SmokingStatus::FormerlySmoked => write!(f, "formerly smoked"),
            SmokingStatus::Smokes => write!(f, "smokes"),
            SmokingStatus::Unknown => write!(f, "Unknown"),
            SmokingStatus::Unrecognized(other) => write!(f, "{}", other),
        }
    }
}

/// Reads a Yes/No style flag. Anything that is not an explicit yes is a no.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim(),
        "Yes" | "yes" | "1" | "1.0" | "true" | "True"
    )
}

/// One patient's clinical attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub age: f64,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub ever_married: bool,
    pub avg_glucose_level: f64,
    pub bmi: f64,
    pub residence_type: ResidenceType,
    pub gender: Gender,
    pub work_type: WorkType,
    pub smoking_status: SmokingStatus,
}

impl Default for RawRecord {
    /// The values the input form starts with.
    fn default() -> Self {
        RawRecord {
            age: 50.0,
            hypertension: false,
            heart_disease: false,
            ever_married: true,
            avg_glucose_level: 100.0,
            bmi: 25.0,
            residence_type: ResidenceType::Urban,
            gender: Gender::Male,
            work_type: WorkType::Private,
            smoking_status: SmokingStatus::NeverSmoked,
        }
    }
}

impl RawRecord {
    /// Schema used when reading a raw input CSV. Flags are read as text so
    /// both `Yes`/`No` and `1`/`0` spellings survive.
    pub fn raw_schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("age", DataType::Float64),
            Field::new("hypertension", DataType::Utf8),
            Field::new("heart_disease", DataType::Utf8),
            Field::new("ever_married", DataType::Utf8),
            Field::new("avg_glucose_level", DataType::Float64),
            Field::new("bmi", DataType::Float64),
            Field::new("residence_type", DataType::Utf8),
            Field::new("gender", DataType::Utf8),
            Field::new("work_type", DataType::Utf8),
            Field::new("smoking_status", DataType::Utf8),
        ])
    }

    /// Builds one record per row of `df`. Fails on a missing column or an
    /// empty cell; unrecognized categories are accepted with a warning.
    pub fn from_frame(df: &DataFrame) -> Result<Vec<RawRecord>> {
        let names = df.get_column_names();
        if let Some(column) = RAW_COLUMNS.iter().copied().find(|c| !names.contains(c)) {
            return Err(EncodingError::MissingColumn { column }.into());
        }

        let age = numeric_column(df, "age")?;
        let glucose = numeric_column(df, "avg_glucose_level")?;
        let bmi = numeric_column(df, "bmi")?;
        let hypertension = text_column(df, "hypertension")?;
        let heart_disease = text_column(df, "heart_disease")?;
        let ever_married = text_column(df, "ever_married")?;
        let residence = text_column(df, "residence_type")?;
        let gender = text_column(df, "gender")?;
        let work_type = text_column(df, "work_type")?;
        let smoking = text_column(df, "smoking_status")?;

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let record = RawRecord {
                age: cell(age.get(row), row, "age")?,
                hypertension: parse_flag(cell(hypertension.get(row), row, "hypertension")?),
                heart_disease: parse_flag(cell(heart_disease.get(row), row, "heart_disease")?),
                ever_married: parse_flag(cell(ever_married.get(row), row, "ever_married")?),
                avg_glucose_level: cell(glucose.get(row), row, "avg_glucose_level")?,
                bmi: cell(bmi.get(row), row, "bmi")?,
                residence_type: cell(residence.get(row), row, "residence_type")?.into(),
                gender: cell(gender.get(row), row, "gender")?.into(),
                work_type: cell(work_type.get(row), row, "work_type")?.into(),
                smoking_status: cell(smoking.get(row), row, "smoking_status")?.into(),
            };
            for hint in record.input_hints() {
                warn!("row {}: {}", row, hint);
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Values outside the ranges the form would allow.
    pub fn range_warnings(&self) -> Vec<String> {
        let checks = [
            ("age", self.age, &AGE_RANGE),
            ("avg_glucose_level", self.avg_glucose_level, &GLUCOSE_RANGE),
            ("bmi", self.bmi, &BMI_RANGE),
        ];
        checks
            .iter()
            .filter(|(_, value, range)| !range.contains(value))
            .map(|(name, value, range)| {
                format!(
                    "{} {} outside [{}, {}]",
                    name,
                    value,
                    range.start(),
                    range.end()
                )
            })
            .collect()
    }

    /// Categorical fields whose value fell outside the known set.
    pub fn unrecognized_categories(&self) -> Vec<(&'static str, String)> {
        let mut found = Vec::new();
        if matches!(self.work_type, WorkType::Unrecognized(_)) {
            found.push(("work_type", self.work_type.to_string()));
        }
        if matches!(self.smoking_status, SmokingStatus::Unrecognized(_)) {
            found.push(("smoking_status", self.smoking_status.to_string()));
        }
        found
    }

    /// Everything the collection layer would have flagged: unrecognized
    /// categories and out-of-range numbers.
    pub fn input_hints(&self) -> Vec<String> {
        let mut hints: Vec<String> = self
            .unrecognized_categories()
            .into_iter()
            .map(|(field, value)| {
                format!(
                    "unrecognized {} {:?}, its indicator columns will all be 0",
                    field, value
                )
            })
            .collect();
        hints.extend(self.range_warnings());
        hints
    }
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

fn text_column(df: &DataFrame, name: &str) -> Result<Utf8Chunked> {
    let series = df.column(name)?.cast(&DataType::Utf8)?;
    Ok(series.utf8()?.clone())
}

fn cell<T>(value: Option<T>, row: usize, field: &'static str) -> std::result::Result<T, EncodingError> {
    value.ok_or(EncodingError::MissingField { row, field })
}
