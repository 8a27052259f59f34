use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use polars_io::parquet::ParquetWriter;
use serde::Serialize;

use crate::error::Result;
use crate::features::{Feature, FeatureVector};
use crate::records::RawRecord;
use crate::report::PredictionReport;

pub async fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;

    Ok(CsvReader::new(file)
        .has_header(true)
        .with_dtypes(Option::from(Arc::new(RawRecord::raw_schema())))
        .finish()?)
}

/// Reads a raw input CSV into records, one per row.
pub async fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>> {
    let df = read_csv(path).await?;
    RawRecord::from_frame(&df)
}

/// Encoded vectors as a frame whose columns carry the model's feature names.
pub fn feature_frame(vectors: &[FeatureVector]) -> PolarsResult<DataFrame> {
    let columns: Vec<Series> = Feature::ALL
        .iter()
        .map(|f| {
            let values: Vec<f64> = vectors.iter().map(|v| v.get(*f)).collect();
            Series::new(f.name(), values)
        })
        .collect();
    DataFrame::new(columns)
}

pub async fn write_csv<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    CsvWriter::new(&mut file).finish(df)?;

    Ok(())
}

pub async fn write_parquet<P: AsRef<Path>>(path: P, df: &mut DataFrame) -> Result<()> {
    let mut file = File::create(path)?;

    ParquetWriter::new(&mut file).finish(df)?;

    Ok(())
}

/// One line of a batch prediction file.
#[derive(Debug, Serialize)]
pub struct PredictionRow {
    pub row: usize,
    pub probability: f64,
    pub risk_level: String,
    pub confidence: String,
    pub high_risk: bool,
    pub top_factors: String,
    pub explanation_error: String,
}

impl PredictionRow {
    pub fn new(row: usize, report: &PredictionReport) -> PredictionRow {
        PredictionRow {
            row,
            probability: report.probability,
            risk_level: report.risk_level.to_string(),
            confidence: report.confidence.to_string(),
            high_risk: report.high_risk,
            top_factors: report.factor_summary(),
            explanation_error: report.explanation_error.clone().unwrap_or_default(),
        }
    }
}

pub async fn write_predictions<P: AsRef<Path>>(path: P, rows: &[PredictionRow]) -> Result<()> {
    let mut writer = ::csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
