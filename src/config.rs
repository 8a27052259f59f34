use std::path::PathBuf;

use crate::error::{Result, StrokeRiskError};
use crate::model::TreeEnsemble;
use crate::scorer::{ScoreOptions, DEFAULT_TOP_FACTORS};

pub static DEFAULT_MODEL_PATH: &str = "models/stroke_model.json";
pub static MODEL_PATH_ENV: &str = "STROKE_RISK_MODEL";
pub static LOG_ENV: &str = "STROKE_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub top_factors: usize,
    pub explain: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            top_factors: DEFAULT_TOP_FACTORS,
            explain: true,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.top_factors == 0 {
            return Err(StrokeRiskError::Settings(
                "top_factors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn score_options(&self) -> ScoreOptions {
        ScoreOptions {
            top_n: self.top_factors,
            explain: self.explain,
        }
    }

    /// Loads the classifier named by `model_path`. Called once at startup.
    pub async fn load_model(&self) -> Result<TreeEnsemble> {
        Ok(TreeEnsemble::load(&self.model_path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.score_options(), ScoreOptions::default());
    }

    #[test]
    fn zero_factors_rejected() {
        let settings = Settings {
            top_factors: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(StrokeRiskError::Settings(_))));
    }

    #[tokio::test]
    async fn missing_model_file_is_a_model_error() {
        let settings = Settings {
            model_path: PathBuf::from("does/not/exist.json"),
            ..Settings::default()
        };
        assert!(matches!(
            settings.load_model().await,
            Err(StrokeRiskError::Model(crate::error::ModelError::Read { .. }))
        ));
    }
}
