// Feature selection and per-column standardization.
//
// Each clustering stage fits its own scaler on the table it is given and
// discards it afterwards. Stages only agree on scaling when they are handed
// the same table.

use hoopstype_core::table::PlayerTable;

use crate::error::ModelError;

/// Threshold below which standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// Mean and standard deviation of one feature column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Population mean and standard deviation (N denominator).
pub fn column_stats(values: &[f64]) -> ColumnStats {
    if values.is_empty() {
        return ColumnStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    ColumnStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Pull the named columns out of `table` as a row-major matrix.
pub fn feature_matrix(table: &PlayerTable, columns: &[String]) -> Result<Vec<Vec<f64>>, ModelError> {
    if columns.is_empty() {
        return Err(ModelError::InvalidParameter {
            name: "feature_columns",
            message: "at least one feature column is required".into(),
        });
    }
    let by_column = columns
        .iter()
        .map(|c| table.numeric_column(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((0..table.len())
        .map(|row| by_column.iter().map(|col| col[row]).collect())
        .collect())
}

/// Zero-mean, unit-variance scaling fitted on one matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    stats: Vec<ColumnStats>,
}

impl StandardScaler {
    pub fn fit(matrix: &[Vec<f64>]) -> Self {
        let dims = matrix.first().map_or(0, Vec::len);
        let stats = (0..dims)
            .map(|d| {
                let column: Vec<f64> = matrix.iter().map(|row| row[d]).collect();
                column_stats(&column)
            })
            .collect();
        Self { stats }
    }

    /// A constant column scales to all zeros.
    pub fn transform(&self, matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
        matrix
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.stats)
                    .map(|(v, s)| {
                        if s.stdev < STDEV_EPSILON {
                            v - s.mean
                        } else {
                            (v - s.mean) / s.stdev
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Map a point in scaled space back to feature units.
    pub fn inverse_transform_point(&self, point: &[f64]) -> Vec<f64> {
        point
            .iter()
            .zip(&self.stats)
            .map(|(z, s)| {
                if s.stdev < STDEV_EPSILON {
                    z + s.mean
                } else {
                    z * s.stdev + s.mean
                }
            })
            .collect()
    }
}

/// Select `columns` from `table` and standardize them with a scaler fitted on
/// this table alone. Returns the scaled matrix and the scaler.
pub fn scaled_features(
    table: &PlayerTable,
    columns: &[String],
) -> Result<(Vec<Vec<f64>>, StandardScaler), ModelError> {
    let matrix = feature_matrix(table, columns)?;
    if matrix.is_empty() {
        return Err(ModelError::EmptyFeatures);
    }
    let scaler = StandardScaler::fit(&matrix);
    Ok((scaler.transform(&matrix), scaler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoopstype_core::table::Value;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn column_stats_uses_population_stdev() {
        let s = column_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!(approx(s.mean, 5.0));
        assert!(approx(s.stdev, 2.0));
    }

    #[test]
    fn column_stats_empty() {
        let s = column_stats(&[]);
        assert_eq!(s, ColumnStats { mean: 0.0, stdev: 0.0 });
    }

    #[test]
    fn transform_centers_and_scales_each_column() {
        let matrix = vec![vec![1.0, 10.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix);
        assert!(approx(scaled[0][0], -1.0));
        assert!(approx(scaled[1][0], 1.0));
        assert!(approx(scaled[0][1], -1.0));
        assert!(approx(scaled[1][1], 1.0));
    }

    #[test]
    fn constant_column_scales_to_zero() {
        let matrix = vec![vec![5.0, 1.0], vec![5.0, 2.0], vec![5.0, 3.0]];
        let scaled = StandardScaler::fit(&matrix).transform(&matrix);
        assert!(scaled.iter().all(|row| row[0] == 0.0));
    }

    #[test]
    fn inverse_transform_recovers_original_point() {
        let matrix = vec![vec![1.0, 7.0], vec![3.0, 7.0], vec![8.0, 7.0]];
        let scaler = StandardScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix);
        let back = scaler.inverse_transform_point(&scaled[2]);
        assert!(approx(back[0], 8.0));
        assert!(approx(back[1], 7.0));
    }

    #[test]
    fn feature_matrix_is_row_major() {
        let table = PlayerTable::new(
            vec!["a".into(), "b".into(), "name".into()],
            vec![
                vec![Value::Int(1), Value::Float(0.5), "x".into()],
                vec![Value::Int(2), Value::Float(1.5), "y".into()],
            ],
        )
        .unwrap();
        let m = feature_matrix(&table, &["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(m, vec![vec![0.5, 1.0], vec![1.5, 2.0]]);
    }

    #[test]
    fn scaled_features_rejects_empty_table() {
        let table = PlayerTable::new(vec!["a".into()], vec![]).unwrap();
        let err = scaled_features(&table, &["a".to_string()]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyFeatures));
    }
}
