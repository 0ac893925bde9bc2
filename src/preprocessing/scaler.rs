//! Feature scaling implementations

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Type of scaler to use.
///
/// Configured by name: `"standard"` selects z-scoring, any other name falls
/// back to min-max scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    #[default]
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
}

impl From<String> for ScalerType {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "standard" => ScalerType::Standard,
            _ => ScalerType::MinMax,
        }
    }
}

impl From<ScalerType> for String {
    fn from(value: ScalerType) -> Self {
        match value {
            ScalerType::Standard => "standard".to_string(),
            ScalerType::MinMax => "minmax".to_string(),
        }
    }
}

/// Column-wise scaler over a dense feature matrix.
///
/// Fitted once on training rows and then frozen; `center` and `scale` hold the
/// mean/std (standard) or min/range (min-max) of each column. A zero spread is
/// stored as 1 so constant columns map to 0 instead of NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    scaler_type: ScalerType,
    center: Array1<f64>,
    scale: Array1<f64>,
    is_fitted: bool,
}

impl FeatureScaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            center: Array1::zeros(0),
            scale: Array1::zeros(0),
            is_fitted: false,
        }
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Number of columns seen during fit
    pub fn n_features(&self) -> usize {
        self.center.len()
    }

    /// Per-column center (mean or min)
    pub fn center(&self) -> &Array1<f64> {
        &self.center
    }

    /// Per-column scale (std or range)
    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    /// Fit the scaler to the rows of `x`
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(ChurnError::TrainingError(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let (center, spread) = match self.scaler_type {
            ScalerType::Standard => {
                let mean = x
                    .mean_axis(Axis(0))
                    .ok_or_else(|| ChurnError::ComputationError("mean of empty axis".to_string()))?;
                // population std
                let std = x.std_axis(Axis(0), 0.0);
                (mean, std)
            }
            ScalerType::MinMax => {
                let min = x.fold_axis(Axis(0), f64::INFINITY, |acc, v| acc.min(*v));
                let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, v| acc.max(*v));
                let range = &max - &min;
                (min, range)
            }
        };

        self.scale = spread.mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });
        self.center = center;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale `x` with the fitted parameters
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        Ok((x - &self.center) / &self.scale)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Map scaled values back to the original units
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_input(x)?;
        Ok(x * &self.scale + &self.center)
    }

    fn check_input(&self, x: &Array2<f64>) -> Result<()> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }
        if x.ncols() != self.n_features() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} columns", self.n_features()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0], [5.0, 10.0]];

        let mut scaler = FeatureScaler::new(ScalerType::Standard);
        let result = scaler.fit_transform(&x).unwrap();

        let means = result.mean_axis(Axis(0)).unwrap();
        assert!(means[0].abs() < 1e-10); // Mean should be ~0
        // population std of 1..5 is sqrt(2)
        assert!((scaler.scale()[0] - 2f64.sqrt()).abs() < 1e-12);
        // constant column maps to zero
        assert!(result.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_minmax_scaler() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];

        let mut scaler = FeatureScaler::new(ScalerType::MinMax);
        let result = scaler.fit_transform(&x).unwrap();

        assert!((result[[0, 0]] - 0.0).abs() < 1e-10);
        assert!((result[[4, 0]] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_inverse_transform() {
        let x = array![[1.0, -3.0], [2.0, 0.5], [7.0, 2.0]];

        let mut scaler = FeatureScaler::new(ScalerType::Standard);
        let scaled = scaler.fit_transform(&x).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();

        for (o, r) in x.iter().zip(restored.iter()) {
            assert!((o - r).abs() < 1e-10);
        }
    }

    #[test]
    fn test_transform_checks_width() {
        let mut scaler = FeatureScaler::new(ScalerType::Standard);
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, ChurnError::ShapeError { .. }));
    }

    #[test]
    fn test_scaler_type_from_name() {
        assert_eq!(ScalerType::from("standard".to_string()), ScalerType::Standard);
        assert_eq!(ScalerType::from("minmax".to_string()), ScalerType::MinMax);
        assert_eq!(ScalerType::from("robust".to_string()), ScalerType::MinMax);
    }
}
