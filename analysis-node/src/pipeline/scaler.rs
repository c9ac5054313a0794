use ndarray::Array2;

use crate::error::{AnalysisError, Result};
use crate::pipeline::encoder::EncodedTable;

/// Normalized feature table, every column scaled into [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    /// Column names, unchanged from the encoded table
    pub columns: Vec<String>,
    /// Scaled feature matrix
    pub matrix: Array2<f64>,
}

/// Fitted min-max bounds, one pair per column.
///
/// Batch-local: bounds come from the batch being analyzed and are not
/// retained across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingModel {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl ScalingModel {
    /// Fit per-column min/max over a batch
    pub fn fit(table: &EncodedTable) -> Result<Self> {
        if table.matrix.nrows() == 0 {
            return Err(AnalysisError::EmptyDataset);
        }

        let mut mins = Vec::with_capacity(table.matrix.ncols());
        let mut maxs = Vec::with_capacity(table.matrix.ncols());
        for column in table.matrix.columns() {
            mins.push(column.fold(f64::INFINITY, |acc, &v| acc.min(v)));
            maxs.push(column.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v)));
        }

        Ok(Self { mins, maxs })
    }

    /// Scale a batch with the fitted bounds.
    ///
    /// A constant column maps to all zeros instead of dividing by zero.
    pub fn apply(&self, table: &EncodedTable) -> Result<NormalizedTable> {
        if table.matrix.ncols() != self.mins.len() {
            return Err(AnalysisError::Internal(format!(
                "scaling model fitted on {} columns, applied to {}",
                self.mins.len(),
                table.matrix.ncols()
            )));
        }

        let mut matrix = table.matrix.clone();
        for (index, mut column) in matrix.columns_mut().into_iter().enumerate() {
            let min = self.mins[index];
            let range = self.maxs[index] - min;
            if range == 0.0 {
                column.fill(0.0);
            } else {
                column.mapv_inplace(|v| (v - min) / range);
            }
        }

        Ok(NormalizedTable {
            columns: table.columns.clone(),
            matrix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn encoded(matrix: Array2<f64>) -> EncodedTable {
        let columns = (0..matrix.ncols()).map(|i| format!("c{i}")).collect();
        EncodedTable { columns, matrix }
    }

    #[test]
    fn test_min_max_scaling() {
        let table = encoded(array![[0.0], [5.0], [10.0]]);

        let model = ScalingModel::fit(&table).unwrap();
        let scaled = model.apply(&table).unwrap();

        assert_eq!(scaled.matrix.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_constant_column_scales_to_zero() {
        let table = encoded(array![[7.0], [7.0], [7.0]]);

        let model = ScalingModel::fit(&table).unwrap();
        let scaled = model.apply(&table).unwrap();

        assert_eq!(scaled.matrix.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_columns_scale_independently() {
        let table = encoded(array![[0.0, 2.0], [10.0, 4.0]]);

        let model = ScalingModel::fit(&table).unwrap();
        let scaled = model.apply(&table).unwrap();

        assert_eq!(scaled.matrix.column(0).to_vec(), vec![0.0, 1.0]);
        assert_eq!(scaled.matrix.column(1).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_empty_table_fails_fast() {
        let table = encoded(Array2::zeros((0, 3)));
        assert!(matches!(
            ScalingModel::fit(&table),
            Err(AnalysisError::EmptyDataset)
        ));
    }

    #[test]
    fn test_width_mismatch_is_internal_error() {
        let fit_table = encoded(array![[0.0, 1.0]]);
        let model = ScalingModel::fit(&fit_table).unwrap();

        let other = encoded(array![[0.0]]);
        assert!(matches!(
            model.apply(&other),
            Err(AnalysisError::Internal(_))
        ));
    }
}
