//! Snap a rough surface point cloud onto the object boundary in a volume.
//!
//! Pipeline per call:
//!
//! 1. [`normals`](crate::normals): outward unit normal per seed point.
//! 2. [`sampling`]: intensity profile along each normal, centred on the seed.
//! 3. [`edge`] + [`fit`]: sub-sample edge position per profile; failed fits
//!    become NaN rows instead of aborting the batch.
//! 4. [`outliers`]: undefined rows are dropped, then (optionally) rows with
//!    unusually large fit uncertainties and rows whose edge sits unusually far
//!    from the others along the ray.
//!
//! The surviving rows' refined coordinates form the output cloud. Seeds whose
//! rows were rejected are dropped, so the output may be shorter than the
//! input; [`FitResult::source_index`] links rows back to their seed.
pub mod edge;
pub mod fit;
pub mod outliers;
pub mod sampling;

pub use self::edge::{EdgeEstimate, EdgeModel, EdgeStrategy, FitMode, QuickGradient};
pub use self::fit::{localize_edges, FitColumn, FitResult, FitTable};
pub use self::outliers::{quantile, OutlierFilter, OutlierFilterDiagnostics, OutlierMode};
pub use self::sampling::{sample_rays, RayGeometry, RaySamples};

use crate::diagnostics::{RefinementReport, TimingBreakdown};
use crate::error::Result;
use crate::normals::{estimate_normals, NormalParams};
use crate::optimize::LmOptions;
use crate::types::PointCloud;
use crate::volume::IntensityVolume;
use log::debug;
use serde::Deserialize;
use std::time::Instant;

/// Parameters of [`refine`] / [`SurfaceRefiner`].
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    /// Ray length, centred on the seed point.
    pub trace_length: f64,
    /// Distance between consecutive samples along the ray.
    pub sampling_distance: f64,
    pub fit_mode: FitMode,
    pub edge_model: EdgeModel,
    /// Physical voxel size; `None` uses the volume's own scale.
    pub scale: Option<[f64; 3]>,
    pub remove_outliers: bool,
    /// IQR multiplier of both outlier passes.
    pub interquartile_factor: f64,
    pub normals: NormalParams,
    pub lm: LmOptions,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            trace_length: 2.0,
            sampling_distance: 0.1,
            fit_mode: FitMode::Fancy,
            edge_model: EdgeModel::Interior,
            scale: None,
            remove_outliers: true,
            interquartile_factor: 1.5,
            normals: NormalParams::default(),
            lm: LmOptions::default(),
        }
    }
}

/// Refined cloud together with the kept fit rows and a run report.
#[derive(Clone, Debug)]
pub struct RefinementOutput {
    pub points: PointCloud,
    pub fits: FitTable,
    pub report: RefinementReport,
}

pub struct SurfaceRefiner {
    params: RefineParams,
}

impl SurfaceRefiner {
    pub fn new(params: RefineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RefineParams {
        &self.params
    }

    pub fn refine(&self, volume: &IntensityVolume, points: &PointCloud) -> Result<PointCloud> {
        self.refine_with_diagnostics(volume, points).map(|out| out.points)
    }

    /// Run the full pipeline and keep everything a caller may want to inspect.
    ///
    /// Returns [`SurfaceError::EmptyPointCloud`](crate::SurfaceError::EmptyPointCloud)
    /// when every row is rejected.
    pub fn refine_with_diagnostics(
        &self,
        volume: &IntensityVolume,
        points: &PointCloud,
    ) -> Result<RefinementOutput> {
        let params = &self.params;
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();

        let geometry = RayGeometry {
            trace_length: params.trace_length,
            sampling_distance: params.sampling_distance,
            scale: params.scale.unwrap_or_else(|| volume.scale()),
        };
        let samples_per_ray = geometry.sample_count()?;

        let normals = timings.record("normals", || estimate_normals(points, &params.normals))?;
        let samples = timings.record("sampling", || {
            sample_rays(volume, points, &normals, &geometry)
        })?;

        let strategy = EdgeStrategy::resolve(params.fit_mode, params.edge_model);
        let mut table = timings.record("edge_fit", || {
            localize_edges(&samples, strategy, geometry.scale, &params.lm)
        });
        let failed_fits = table.failure_count();

        let filter_start = Instant::now();
        let undefined_filter =
            OutlierFilter::new(params.interquartile_factor, OutlierMode::Both).apply(&mut table, &[]);
        let (error_filter, border_filter) = if params.remove_outliers {
            let error_columns = table.error_columns();
            let errors = OutlierFilter::new(params.interquartile_factor, OutlierMode::Above)
                .apply(&mut table, &error_columns);
            let border = OutlierFilter::new(params.interquartile_factor, OutlierMode::Both)
                .apply(&mut table, &[FitColumn::BorderIndex]);
            (Some(errors), Some(border))
        } else {
            (None, None)
        };
        timings.push("outliers", filter_start.elapsed().as_secs_f64() * 1000.0);

        let refined = table.points()?;
        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "refine: {} seeds -> {} points ({} failed fits, strategy {:?})",
            points.len(),
            refined.len(),
            failed_fits,
            strategy
        );

        let report = RefinementReport {
            input_points: points.len(),
            refined_points: refined.len(),
            samples_per_ray,
            strategy: format!("{strategy:?}"),
            parameter_names: table.parameter_names().to_vec(),
            failed_fits,
            undefined_filter,
            error_filter,
            border_filter,
            timings,
        };
        Ok(RefinementOutput {
            points: refined,
            fits: table,
            report,
        })
    }
}

/// Refine `points` against `volume` with `params`.
pub fn refine(
    volume: &IntensityVolume,
    points: &PointCloud,
    params: &RefineParams,
) -> Result<PointCloud> {
    SurfaceRefiner::new(params.clone()).refine(volume, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurfaceError;
    use crate::types::sphere_point_cloud;
    use crate::volume::synthetic::solid_ball;
    use nalgebra::Point3;

    fn quick_params() -> RefineParams {
        RefineParams {
            trace_length: 10.0,
            sampling_distance: 1.0,
            fit_mode: FitMode::Quick {
                gradient: QuickGradient::Absolute,
            },
            remove_outliers: false,
            ..Default::default()
        }
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: RefineParams = serde_json::from_str(
            r#"{"trace_length": 8.0, "fit_mode": {"quick": {"gradient": "signed"}}, "edge_model": "surface"}"#,
        )
        .unwrap();
        assert_eq!(params.trace_length, 8.0);
        assert_eq!(params.sampling_distance, 0.1);
        assert_eq!(
            params.fit_mode,
            FitMode::Quick {
                gradient: QuickGradient::Signed
            }
        );
        assert_eq!(params.edge_model, EdgeModel::Surface);
        assert!(params.remove_outliers);
    }

    #[test]
    fn quick_refinement_snaps_to_binary_ball() {
        let center = Point3::new(16.0, 16.0, 16.0);
        let volume = solid_ball([33, 33, 33], center, 10.0, 1.0).unwrap();
        let seeds = sphere_point_cloud(center, 11.5, 200).unwrap();
        let out = SurfaceRefiner::new(quick_params())
            .refine_with_diagnostics(&volume, &seeds)
            .unwrap();
        assert_eq!(out.points.len(), 200);
        assert_eq!(out.report.samples_per_ray, 10);
        assert_eq!(out.report.failed_fits, 0);
        let mean_radius: f64 =
            out.points.iter().map(|p| (p - center).norm()).sum::<f64>() / out.points.len() as f64;
        assert!((mean_radius - 10.0).abs() < 1.0, "mean radius {mean_radius}");
    }

    #[test]
    fn invalid_sampling_is_rejected_before_any_work() {
        let volume = IntensityVolume::zeros([4, 4, 4]).unwrap();
        let seeds = sphere_point_cloud(Point3::new(2.0, 2.0, 2.0), 1.0, 20).unwrap();
        let params = RefineParams {
            trace_length: 1.0,
            sampling_distance: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            refine(&volume, &seeds, &params),
            Err(SurfaceError::InvalidParameter(_))
        ));
    }
}
