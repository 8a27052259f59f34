use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{ExplanationUnavailable, ScoringError};

/// A loaded binary classifier. Loaded once and shared read-only, so
/// implementors must be `Send + Sync`.
pub trait RiskClassifier: Send + Sync {
    /// Class probabilities for each row of `features`; index 1 is the
    /// positive (stroke) class.
    fn predict_proba(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ScoringError>;

    /// Signed per-feature contribution for each row, in column order.
    fn attribute(&self, _features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ExplanationUnavailable> {
        Err(ExplanationUnavailable::new(
            "classifier does not support feature attribution",
        ))
    }
}

impl<C: RiskClassifier + ?Sized> RiskClassifier for &C {
    fn predict_proba(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ScoringError> {
        (**self).predict_proba(features)
    }

    fn attribute(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ExplanationUnavailable> {
        (**self).attribute(features)
    }
}

impl<C: RiskClassifier + ?Sized> RiskClassifier for Box<C> {
    fn predict_proba(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ScoringError> {
        (**self).predict_proba(features)
    }

    fn attribute(&self, features: &DenseMatrix<f64>) -> Result<Vec<Vec<f64>>, ExplanationUnavailable> {
        (**self).attribute(features)
    }
}

/// Rejects a matrix whose width is not `expected`.
pub fn check_width(features: &DenseMatrix<f64>, expected: usize) -> Result<(), ScoringError> {
    let (_, actual) = features.shape();
    if actual != expected {
        return Err(ScoringError::ShapeMismatch { expected, actual });
    }
    Ok(())
}

/// Copies matrix rows out, for models that walk one row at a time.
pub fn rows(features: &DenseMatrix<f64>) -> Vec<Vec<f64>> {
    let (nrows, ncols) = features.shape();
    (0..nrows)
        .map(|r| (0..ncols).map(|c| *features.get((r, c))).collect())
        .collect()
}
