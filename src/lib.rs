//! Stroke risk scoring.
//!
//! A [`RawRecord`] is turned into the 25-column [`FeatureVector`] the model was
//! trained on by [`encode`], then scored by any [`RiskClassifier`]:
//!
//! ```no_run
//! # async fn run() -> stroke_risk::Result<()> {
//! use stroke_risk::{encode, score, RawRecord, TreeEnsemble};
//!
//! let model = TreeEnsemble::load("models/stroke_model.json").await?;
//! let result = score(&encode(&RawRecord::default()), &model)?;
//! println!("{:.3}", result.probability);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod io;
pub mod model;
pub mod records;
pub mod report;
pub mod scorer;

pub use classifier::RiskClassifier;
pub use encoder::{encode, encode_all};
pub use error::{EncodingError, ExplanationUnavailable, ModelError, Result, ScoringError, StrokeRiskError};
pub use features::{Feature, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use model::TreeEnsemble;
pub use records::{Gender, RawRecord, ResidenceType, SmokingStatus, WorkType};
pub use scorer::{explain, predict_probability, score, score_batch, score_with, PredictionResult, RankedFactor, ScoreOptions};
