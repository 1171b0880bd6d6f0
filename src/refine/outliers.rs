//! Interquartile-range rejection over fit-table columns.
//!
//! Rows with any undefined value are dropped before quartiles are taken. Each
//! selected column then flags values beyond `Q3 + f·IQR` and/or below
//! `Q1 − f·IQR`; a row survives only if no selected column flags it. A
//! threshold that evaluates to NaN (for instance an infinite factor on a
//! zero IQR) flags nothing.
use super::fit::{FitColumn, FitTable};
use log::debug;
use serde::{Deserialize, Serialize};

/// Which tail(s) of a column are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMode {
    Above,
    Below,
    Both,
}

/// Thresholds applied to one column.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnThresholds {
    pub column: String,
    pub q1: f64,
    pub q3: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub flagged: usize,
}

/// Counts and thresholds of one filter pass.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlierFilterDiagnostics {
    pub total: usize,
    pub undefined: usize,
    pub rejected: usize,
    pub kept: usize,
    pub columns: Vec<ColumnThresholds>,
}

#[derive(Clone, Copy, Debug)]
pub struct OutlierFilter {
    pub factor: f64,
    pub mode: OutlierMode,
}

impl OutlierFilter {
    pub fn new(factor: f64, mode: OutlierMode) -> Self {
        Self { factor, mode }
    }

    /// Remove undefined rows, then IQR outliers in `columns`, in place.
    pub fn apply(&self, table: &mut FitTable, columns: &[FitColumn]) -> OutlierFilterDiagnostics {
        let mut diag = OutlierFilterDiagnostics {
            total: table.len(),
            ..Default::default()
        };
        let defined: Vec<bool> = (0..table.len()).map(|i| !table.is_undefined(i)).collect();
        table.retain_mask(&defined);
        diag.undefined = diag.total - table.len();

        let mut keep = vec![true; table.len()];
        if !table.is_empty() {
            for &column in columns {
                let values = table.column(column);
                let mut sorted = values.clone();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let q1 = quantile(&sorted, 0.25);
                let q3 = quantile(&sorted, 0.75);
                let iqr = q3 - q1;
                let lower = matches!(self.mode, OutlierMode::Below | OutlierMode::Both)
                    .then(|| q1 - self.factor * iqr);
                let upper = matches!(self.mode, OutlierMode::Above | OutlierMode::Both)
                    .then(|| q3 + self.factor * iqr);

                let mut flagged = 0usize;
                for (k, v) in keep.iter_mut().zip(values.iter()) {
                    let low = lower.is_some_and(|t| *v < t);
                    let high = upper.is_some_and(|t| *v > t);
                    if low || high {
                        flagged += 1;
                        *k = false;
                    }
                }
                diag.columns.push(ColumnThresholds {
                    column: table.column_name(column),
                    q1,
                    q3,
                    lower,
                    upper,
                    flagged,
                });
            }
        }
        table.retain_mask(&keep);
        diag.kept = table.len();
        diag.rejected = diag.total - diag.undefined - diag.kept;
        debug!(
            "outlier filter ({:?}, f={}): total={} undefined={} rejected={} kept={}",
            self.mode, self.factor, diag.total, diag.undefined, diag.rejected, diag.kept
        );
        diag
    }
}

/// Linear-interpolation quantile of ascending `sorted` values, `q ∈ [0, 1]`.
/// Empty input yields NaN.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let t = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * t
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::fit::FitResult;
    use nalgebra::{Point3, Vector3};

    fn row(i: usize, border: f64, err: f64) -> FitResult {
        FitResult {
            source_index: i,
            border_index: border,
            params: vec![border],
            errors: vec![err],
            refined: Point3::new(border, 0.0, 0.0),
            projection: Vector3::zeros(),
        }
    }

    fn table(borders: &[f64]) -> FitTable {
        FitTable::new(
            vec!["center".into()],
            borders.iter().enumerate().map(|(i, &b)| row(i, b, 0.1)).collect(),
        )
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.25), 1.75);
        assert_eq!(quantile(&sorted, 0.75), 3.25);
        assert_eq!(quantile(&sorted, 0.5), 2.5);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn both_tails_are_rejected() {
        let mut t = table(&[10.0, 10.1, 9.9, 10.05, 9.95, 30.0, -5.0]);
        let diag =
            OutlierFilter::new(1.5, OutlierMode::Both).apply(&mut t, &[FitColumn::BorderIndex]);
        assert_eq!(diag.rejected, 2);
        assert_eq!(t.len(), 5);
        assert!(t.rows().iter().all(|r| (r.border_index - 10.0).abs() < 0.2));
    }

    #[test]
    fn above_mode_keeps_low_values() {
        let mut t = table(&[10.0, 10.1, 9.9, 10.05, 9.95, 30.0, -5.0]);
        OutlierFilter::new(1.5, OutlierMode::Above).apply(&mut t, &[FitColumn::BorderIndex]);
        assert_eq!(t.len(), 6);
        assert!(t.rows().iter().any(|r| r.border_index == -5.0));
    }

    #[test]
    fn below_mode_keeps_high_values() {
        let mut t = table(&[10.0, 10.1, 9.9, 10.05, 9.95, 30.0, -5.0]);
        let diag =
            OutlierFilter::new(1.5, OutlierMode::Below).apply(&mut t, &[FitColumn::BorderIndex]);
        assert_eq!(diag.rejected, 1);
        assert_eq!(t.len(), 6);
        assert!(t.rows().iter().any(|r| r.border_index == 30.0));
        assert!(t.rows().iter().all(|r| r.border_index != -5.0));
    }

    #[test]
    fn infinite_factor_keeps_everything_defined() {
        let mut t = table(&[1.0, 1.0, 1.0, 5.0, f64::NAN]);
        let diag = OutlierFilter::new(f64::INFINITY, OutlierMode::Both)
            .apply(&mut t, &[FitColumn::BorderIndex]);
        assert_eq!(diag.undefined, 1);
        assert_eq!(diag.rejected, 0);
        assert_eq!(t.len(), 4);

        let mut constant = table(&[2.0, 2.0, 2.0]);
        OutlierFilter::new(f64::INFINITY, OutlierMode::Both)
            .apply(&mut constant, &[FitColumn::BorderIndex]);
        assert_eq!(constant.len(), 3);
    }

    #[test]
    fn zero_factor_rejects_values_outside_the_quartiles() {
        let mut t = table(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        OutlierFilter::new(0.0, OutlierMode::Both).apply(&mut t, &[FitColumn::BorderIndex]);
        let kept: Vec<f64> = t.rows().iter().map(|r| r.border_index).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn undefined_rows_are_dropped_even_without_columns() {
        let mut t = table(&[1.0, f64::NAN, 3.0]);
        let diag = OutlierFilter::new(1.5, OutlierMode::Above).apply(&mut t, &[]);
        assert_eq!(diag.undefined, 1);
        assert_eq!(t.len(), 2);
    }
}
