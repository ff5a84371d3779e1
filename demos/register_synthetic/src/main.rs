use argh::FromArgs;
use std::path::PathBuf;

use vasreg::k3d::{
    mask::{BinaryMask, ImageGeometry},
    transforms::{axis_angle_to_rotation_matrix, AffineTransform, PointTransform},
};
use vasreg::{evaluate_transforms, register_masks, RegistrationConfig};

#[derive(FromArgs)]
/// Register two synthetic vessel masks related by a known transform
struct Args {
    /// path to a JSON registration config
    #[argh(option)]
    config: Option<PathBuf>,

    /// rotation of the moving scan around the z axis, in degrees
    #[argh(option, default = "4.0")]
    rotation_deg: f64,

    /// translation of the moving scan along x, in mm
    #[argh(option, default = "3.0")]
    tx: f64,

    /// translation of the moving scan along y, in mm
    #[argh(option, default = "-2.0")]
    ty: f64,

    /// translation of the moving scan along z, in mm
    #[argh(option, default = "1.5")]
    tz: f64,

    /// number of annealing steps, overrides the config
    #[argh(option)]
    icp_steps: Option<usize>,

    /// write the result as JSON to this path
    #[argh(option)]
    output: Option<PathBuf>,
}

#[derive(serde::Serialize)]
struct Report {
    transform: [[f64; 4]; 4],
    truth: [[f64; 4]; 4],
    translation_error_mm: f64,
    rotation_error_deg: f64,
    ransac_fitness: f64,
    icp_fitness: f64,
    icp_inlier_rmse: f64,
}

const SIZE: usize = 100;

/// Centerline segments of the synthetic vessel tree in mm, with their radius.
const TREE: [([f64; 3], [f64; 3], f64); 5] = [
    ([6.0, 6.0, 6.0], [24.0, 22.0, 15.0], 2.0),
    ([24.0, 22.0, 15.0], [42.0, 30.0, 22.0], 1.75),
    ([24.0, 22.0, 15.0], [30.0, 9.0, 37.0], 1.5),
    ([15.0, 15.0, 10.0], [8.0, 30.0, 15.0], 1.0),
    ([42.0, 30.0, 22.0], [38.0, 44.0, 30.0], 1.25),
];

fn distance_to_segment(p: &[f64; 3], a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ap = [p[0] - a[0], p[1] - a[1], p[2] - a[2]];
    let len2 = ab[0] * ab[0] + ab[1] * ab[1] + ab[2] * ab[2];
    let t = ((ap[0] * ab[0] + ap[1] * ab[1] + ap[2] * ab[2]) / len2).clamp(0.0, 1.0);
    let d = [ap[0] - t * ab[0], ap[1] - t * ab[1], ap[2] - t * ab[2]];
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

/// Rasterize the vessel tree, seen through `to_tree` (scan space to tree space).
fn rasterize(geometry: ImageGeometry, to_tree: &AffineTransform) -> Result<BinaryMask, Box<dyn std::error::Error>> {
    let mut data = vec![0u8; SIZE * SIZE * SIZE];
    for z in 0..SIZE {
        for y in 0..SIZE {
            for x in 0..SIZE {
                let p = geometry.index_to_physical(&[x as f64, y as f64, z as f64]);
                let q = to_tree.transform_point(&p);
                if TREE.iter().any(|(a, b, r)| distance_to_segment(&q, a, b) <= *r) {
                    data[x + SIZE * (y + SIZE * z)] = 1;
                }
            }
        }
    }
    Ok(BinaryMask::new(&[SIZE, SIZE, SIZE], data, geometry)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => RegistrationConfig::from_json_file(path)?,
        None => RegistrationConfig::default(),
    };
    if let Some(steps) = args.icp_steps {
        config.icp_steps = steps;
    }
    config.validate()?;

    // the truth maps fixed-space points to moving-space points
    let rotation = axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], args.rotation_deg.to_radians())?;
    let truth = AffineTransform::from_rotation_translation(rotation, [args.tx, args.ty, args.tz]);
    let to_fixed = truth.inverse().ok_or("the truth transform is singular")?;

    let geometry = ImageGeometry {
        spacing: [0.5; 3],
        ..Default::default()
    };
    let fixed = rasterize(geometry, &AffineTransform::identity())?;
    let moving = rasterize(geometry, &to_fixed)?;
    println!(
        "Fixed mask: #{} voxels, moving mask: #{} voxels",
        fixed.count(),
        moving.count()
    );

    let now = std::time::Instant::now();
    let registration = register_masks(&fixed, &moving, &config)?;
    println!("Finished registration in {:.2?}", now.elapsed());

    let pred: PointTransform = registration.transform.into();
    let evaluation = evaluate_transforms(&pred, &truth.into(), &fixed.center())?;
    println!("Results:");
    println!("* translation error: {:.3} mm", evaluation.translation_error);
    println!("* rotation error: {:.3}°", evaluation.rotation_error);

    if let Some(path) = args.output {
        let report = Report {
            transform: registration.transform.to_matrix4(),
            truth: truth.to_matrix4(),
            translation_error_mm: evaluation.translation_error,
            rotation_error_deg: evaluation.rotation_error,
            ransac_fitness: registration.ransac.fitness,
            icp_fitness: registration.icp.fitness,
            icp_inlier_rmse: registration.icp.inlier_rmse,
        };
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        log::info!("wrote report to {}", path.display());
    }

    Ok(())
}
