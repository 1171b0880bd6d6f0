//! JSON helpers for the demo binary.
//!
//! - `read_points_json`: load a point cloud stored as `[[x, y, z], ...]`.
//! - `write_json_file`: pretty-print a serializable value to disk.
use crate::types::PointCloud;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Read a point cloud from a JSON array of coordinate triples.
pub fn read_points_json(path: &Path) -> Result<PointCloud, String> {
    let data =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let coords: Vec<[f64; 3]> = serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse points {}: {e}", path.display()))?;
    PointCloud::from_arrays(&coords).map_err(|e| format!("Invalid points in {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_survive_a_json_file() {
        let dir = std::env::temp_dir().join(format!("surface_refine_io_{}", std::process::id()));
        let path = dir.join("points.json");
        let cloud = PointCloud::from_arrays(&[[0.0, 1.0, 2.0], [3.0, 4.0, 5.5]]).unwrap();
        write_json_file(&path, &cloud).unwrap();
        let back = read_points_json(&path).unwrap();
        assert_eq!(back.to_arrays(), cloud.to_arrays());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_points_json(Path::new("/nonexistent/points.json")).unwrap_err();
        assert!(err.contains("/nonexistent/points.json"));
    }
}
