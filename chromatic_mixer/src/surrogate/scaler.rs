use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::SurrogateError;

/// Per-column min-max scaling fitted on the training mixtures.
///
/// A column whose observed range is zero keeps a unit scale, so its training
/// values map to 0 and candidates are only shifted.
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    scale: Array1<f64>,
}

impl MinMaxScaler {
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self, SurrogateError> {
        if x.nrows() == 0 {
            return Err(SurrogateError::EmptyTrainingSet);
        }

        let min = x.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let scale = (&max - &min).mapv(|range| if range > 0.0 { 1.0 / range } else { 1.0 });

        Ok(Self { min, scale })
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, SurrogateError> {
        if x.ncols() != self.min.len() {
            return Err(SurrogateError::DimensionMismatch {
                expected: self.min.len(),
                got: x.ncols(),
            });
        }
        Ok((&x - &self.min) * &self.scale)
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn scales_each_column_to_unit_range() {
        let x = array![[0.0, 50.0], [100.0, 150.0], [50.0, 100.0]];
        let scaler = MinMaxScaler::fit(x.view()).unwrap();
        let scaled = scaler.transform(x.view()).unwrap();
        assert_eq!(scaled, array![[0.0, 0.0], [1.0, 1.0], [0.5, 0.5]]);
    }

    #[test]
    fn constant_column_maps_to_zero() {
        let x = array![[7.0, 1.0], [7.0, 3.0]];
        let scaler = MinMaxScaler::fit(x.view()).unwrap();
        let scaled = scaler.transform(x.view()).unwrap();
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.0]);

        let queries = array![[9.0, 2.0]];
        let shifted = scaler.transform(queries.view()).unwrap();
        assert_eq!(shifted, array![[2.0, 0.5]]);
    }

    #[test]
    fn unseen_values_may_leave_unit_range() {
        let x = array![[10.0], [20.0]];
        let scaler = MinMaxScaler::fit(x.view()).unwrap();
        let scaled = scaler.transform(array![[40.0]].view()).unwrap();
        assert!((scaled[[0, 0]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_and_mismatched_input() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert_eq!(
            MinMaxScaler::fit(empty.view()).unwrap_err(),
            SurrogateError::EmptyTrainingSet
        );

        let scaler = MinMaxScaler::fit(array![[1.0, 2.0]].view()).unwrap();
        let err = scaler.transform(array![[1.0, 2.0, 3.0]].view()).unwrap_err();
        assert_eq!(err, SurrogateError::DimensionMismatch { expected: 2, got: 3 });
    }
}
