//! JSON configuration of the `surface_demo` binary.
use crate::analysis::AnalysisParams;
use crate::refine::RefineParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct SurfaceDemoConfig {
    #[serde(default)]
    pub volume: PhantomConfig,
    #[serde(default)]
    pub seeds: SeedConfig,
    #[serde(default)]
    pub refine: RefineParams,
    pub analysis: AnalysisParams,
    pub output: SurfaceDemoOutputConfig,
}

/// Blurred binary ball used as the demo volume.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PhantomConfig {
    pub shape: [usize; 3],
    pub center: [f64; 3],
    pub radius: f64,
    pub intensity: f32,
    pub blur_sigma: f64,
    pub scale: [f64; 3],
}

impl Default for PhantomConfig {
    fn default() -> Self {
        Self {
            shape: [100, 100, 100],
            center: [50.0, 50.0, 50.0],
            radius: 30.0,
            intensity: 1.0,
            blur_sigma: 5.0,
            scale: [1.0, 1.0, 1.0],
        }
    }
}

/// Seed points: read from `file` when given, otherwise a Fibonacci sphere of
/// `count` points at `radius` around the phantom centre.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub file: Option<PathBuf>,
    pub radius: f64,
    pub count: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            file: None,
            radius: 30.0,
            count: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SurfaceDemoOutputConfig {
    pub dir: PathBuf,
}

pub fn load_config(path: &Path) -> Result<SurfaceDemoConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&data).map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

fn parse_config(data: &str) -> Result<SurfaceDemoConfig, serde_json::Error> {
    serde_json::from_str(data)
}
