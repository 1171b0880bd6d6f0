//! Per-point edge fits and the table that carries them through filtering.
use super::edge::{EdgeStrategy, EdgeEstimate};
use super::sampling::RaySamples;
use crate::error::Result;
use crate::optimize::LmOptions;
use crate::types::PointCloud;
use log::debug;
use nalgebra::{Point3, Vector3};
use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of localizing the edge on one ray. Failed fits carry NaN in every
/// numeric field.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitResult {
    /// Index of the seed point in the input cloud.
    pub source_index: usize,
    /// Continuous sample index of the edge along the ray.
    pub border_index: f64,
    pub params: Vec<f64>,
    pub errors: Vec<f64>,
    /// Edge position in physical coordinates.
    pub refined: Point3<f64>,
    /// `-border_index · step`, in voxel units.
    pub projection: Vector3<f64>,
}

impl FitResult {
    fn failed(source_index: usize, n_params: usize) -> Self {
        Self {
            source_index,
            border_index: f64::NAN,
            params: vec![f64::NAN; n_params],
            errors: vec![f64::NAN; n_params],
            refined: Point3::new(f64::NAN, f64::NAN, f64::NAN),
            projection: Vector3::new(f64::NAN, f64::NAN, f64::NAN),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.border_index.is_nan()
    }
}

/// Column selector over a [`FitTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitColumn {
    BorderIndex,
    Parameter(usize),
    Error(usize),
}

/// Fit rows plus the parameter names of the strategy that produced them.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitTable {
    parameter_names: Vec<String>,
    rows: Vec<FitResult>,
}

impl FitTable {
    pub fn new(parameter_names: Vec<String>, rows: Vec<FitResult>) -> Self {
        Self {
            parameter_names,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FitResult] {
        &self.rows
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// `border_index`, then every parameter name, then every `<name>_err`.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec!["border_index".to_string()];
        names.extend(self.parameter_names.iter().cloned());
        names.extend(self.parameter_names.iter().map(|n| format!("{n}_err")));
        names
    }

    pub fn column_by_name(&self, name: &str) -> Option<FitColumn> {
        if name == "border_index" {
            return Some(FitColumn::BorderIndex);
        }
        if let Some(base) = name.strip_suffix("_err") {
            if let Some(i) = self.parameter_names.iter().position(|n| n == base) {
                return Some(FitColumn::Error(i));
            }
        }
        self.parameter_names
            .iter()
            .position(|n| n == name)
            .map(FitColumn::Parameter)
    }

    pub fn column_name(&self, column: FitColumn) -> String {
        let param = |i: usize| self.parameter_names.get(i).map(String::as_str).unwrap_or("?");
        match column {
            FitColumn::BorderIndex => "border_index".to_string(),
            FitColumn::Parameter(i) => param(i).to_string(),
            FitColumn::Error(i) => format!("{}_err", param(i)),
        }
    }

    pub fn error_columns(&self) -> Vec<FitColumn> {
        (0..self.parameter_names.len()).map(FitColumn::Error).collect()
    }

    #[inline]
    pub fn value(&self, row: usize, column: FitColumn) -> f64 {
        let r = &self.rows[row];
        match column {
            FitColumn::BorderIndex => r.border_index,
            FitColumn::Parameter(i) => r.params.get(i).copied().unwrap_or(f64::NAN),
            FitColumn::Error(i) => r.errors.get(i).copied().unwrap_or(f64::NAN),
        }
    }

    pub fn column(&self, column: FitColumn) -> Vec<f64> {
        (0..self.rows.len()).map(|i| self.value(i, column)).collect()
    }

    /// `true` when any numeric field of the row is NaN.
    pub fn is_undefined(&self, row: usize) -> bool {
        let r = &self.rows[row];
        r.border_index.is_nan()
            || r.params.iter().any(|v| v.is_nan())
            || r.errors.iter().any(|v| v.is_nan())
    }

    pub fn failure_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_failed()).count()
    }

    /// Keep the rows whose mask entry is `true`.
    pub fn retain_mask(&mut self, keep: &[bool]) {
        let mut flags = keep.iter();
        self.rows.retain(|_| flags.next().copied().unwrap_or(false));
    }

    /// Refined coordinates of the surviving rows.
    pub fn points(&self) -> Result<PointCloud> {
        PointCloud::new(self.rows.iter().map(|r| r.refined).collect())
    }
}

/// Localize the edge on every ray and map it back to physical coordinates.
pub fn localize_edges(
    samples: &RaySamples,
    strategy: EdgeStrategy,
    scale: [f64; 3],
    options: &LmOptions,
) -> FitTable {
    let n_params = strategy.parameter_names().len();
    let fit_one = |idx: usize| -> FitResult {
        match strategy.locate(&samples.profiles[idx], options) {
            Ok(EdgeEstimate {
                border_index,
                params,
                errors,
            }) if border_index.is_finite() => {
                let voxel = samples.position(idx, border_index);
                FitResult {
                    source_index: idx,
                    border_index,
                    params,
                    errors,
                    refined: Point3::new(
                        voxel.x * scale[0],
                        voxel.y * scale[1],
                        voxel.z * scale[2],
                    ),
                    projection: -samples.steps[idx] * border_index,
                }
            }
            Ok(_) => FitResult::failed(idx, n_params),
            Err(err) => {
                debug!("localize_edges: point {idx} failed: {err}");
                FitResult::failed(idx, n_params)
            }
        }
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<FitResult> = (0..samples.len()).into_par_iter().map(fit_one).collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<FitResult> = (0..samples.len()).map(fit_one).collect();

    let table = FitTable::new(
        strategy
            .parameter_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    );
    debug!(
        "localize_edges: {} rays, {} failed fits ({:?})",
        table.len(),
        table.failure_count(),
        strategy
    );
    table
}
