use nalgebra::{Point3, Vector3};
use surface_refine::types::{fibonacci_sphere, PointCloud};
use surface_refine::volume::{gaussian_blur, synthetic, IntensityVolume};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Cubic volume holding a blurred binary ball centred in the grid.
pub fn blurred_ball(size: usize, radius: f64, sigma: f64) -> (IntensityVolume, Point3<f64>) {
    let c = size as f64 / 2.0;
    let center = Point3::new(c, c, c);
    let ball = synthetic::solid_ball([size; 3], center, radius, 1.0).expect("ball phantom");
    let volume = gaussian_blur(&ball, sigma).expect("blur");
    (volume, center)
}

/// Cubic volume holding a blurred thin spherical membrane.
pub fn blurred_shell(size: usize, radius: f64, sigma: f64) -> (IntensityVolume, Point3<f64>) {
    let c = size as f64 / 2.0;
    let center = Point3::new(c, c, c);
    let shell =
        synthetic::spherical_shell([size; 3], center, radius, 2.0, 1.0).expect("shell phantom");
    let volume = gaussian_blur(&shell, sigma).expect("blur");
    (volume, center)
}

/// Points `center + diag(axes) · d · (1 + bump · dx·dy·dz)` over a Fibonacci
/// sphere of directions `d`.
pub fn bumpy_ellipsoid(center: Point3<f64>, axes: [f64; 3], bump: f64, samples: usize) -> PointCloud {
    let points = fibonacci_sphere(samples)
        .into_iter()
        .map(|d| {
            let scale = 1.0 + bump * d.x * d.y * d.z;
            center + Vector3::new(axes[0] * d.x, axes[1] * d.y, axes[2] * d.z) * scale
        })
        .collect();
    PointCloud::new(points).expect("non-empty ellipsoid")
}

/// Fibonacci sphere of `samples` points whose radii are jittered
/// deterministically within `±jitter` of `radius`.
pub fn jittered_sphere(center: Point3<f64>, radius: f64, jitter: f64, samples: usize) -> PointCloud {
    let points = fibonacci_sphere(samples)
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let offset = jitter * ((i as f64 * 0.618).fract() * 2.0 - 1.0);
            center + d * (radius + offset)
        })
        .collect();
    PointCloud::new(points).expect("non-empty sphere")
}

pub fn mean_distance(points: &PointCloud, center: &Point3<f64>) -> f64 {
    points.iter().map(|p| (p - center).norm()).sum::<f64>() / points.len() as f64
}
