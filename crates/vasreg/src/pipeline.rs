use vasreg_3d::{
    mask::{mask_to_points, BinaryMask, LabelVolume},
    pointcloud::PointCloud,
    sampling::PoissonDiskSampler,
    transforms::AffineTransform,
};
use vasreg_icp::{icp_annealed, AnnealSchedule, IcpResult};
use vasreg_ransac::{register_ransac, RansacResult};

use crate::{RegistrationConfig, RegistrationError};

/// Outcome of the coarse-to-fine registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Final transform, mapping moving points onto fixed points.
    pub transform: AffineTransform,
    /// Result of the global stage.
    pub ransac: RansacResult,
    /// Result of the refinement, seeded with the global transform.
    pub icp: IcpResult,
}

/// Register a moving point cloud onto a fixed one.
///
/// The clouds are Poisson-disk subsampled at `spacing_search` for the global
/// RANSAC stage, then at `spacing_refine` for an annealed ICP going from
/// `5 * spacing_refine` down to `0.5 * spacing_refine` over `icp_steps` steps.
pub fn register_points(
    moving: &PointCloud,
    fixed: &PointCloud,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    config.validate()?;
    if moving.is_empty() || fixed.is_empty() {
        return Err(RegistrationError::EmptyInput(moving.len(), fixed.len()));
    }

    let sampler = PoissonDiskSampler::new(config.spacing_search).with_seed(config.sampling_seed);
    let moving_down = sampler.downsample(moving);
    let fixed_down = sampler.downsample(fixed);
    log::info!(
        "global stage: {} / {} points at {} mm",
        moving_down.len(),
        fixed_down.len(),
        config.spacing_search
    );
    let ransac = register_ransac(
        &moving_down,
        &fixed_down,
        config.spacing_search,
        &config.ransac,
    )?;

    let sampler = PoissonDiskSampler::new(config.spacing_refine).with_seed(config.sampling_seed);
    let moving_down = sampler.downsample(moving);
    let fixed_down = sampler.downsample(fixed);
    log::info!(
        "refinement: {} / {} points at {} mm, {} steps",
        moving_down.len(),
        fixed_down.len(),
        config.spacing_refine,
        config.icp_steps
    );
    let schedule = AnnealSchedule::new(
        5.0 * config.spacing_refine,
        0.5 * config.spacing_refine,
        config.icp_steps,
    )?
    .with_max_iterations(config.icp_max_inner_iterations);
    let icp = icp_annealed(&moving_down, &fixed_down, Some(&ransac.transform), &schedule)?;

    log::info!(
        "registration done: fitness {:.4}, inlier rmse {:.4} mm, {} icp iterations",
        icp.fitness,
        icp.inlier_rmse,
        icp.num_iterations
    );

    Ok(Registration {
        transform: icp.transform,
        ransac,
        icp,
    })
}

/// Register two vessel masks.
///
/// The fixed cloud is registered onto the moving cloud, so the transform maps
/// fixed-space points to moving-space points. This is the convention of
/// resampling transforms, in which ground truths are usually stored.
pub fn register_masks(
    fixed: &BinaryMask,
    moving: &BinaryMask,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    let fixed_points = mask_to_points(fixed, config.extraction);
    let moving_points = mask_to_points(moving, config.extraction);
    log::info!(
        "extracted {} fixed and {} moving points",
        fixed_points.len(),
        moving_points.len()
    );
    register_points(&fixed_points, &moving_points, config)
}

/// Register two label volumes through the vessel labels selected by
/// `config.labels`, see [`register_masks`].
pub fn register_label_volumes(
    fixed: &LabelVolume,
    moving: &LabelVolume,
    config: &RegistrationConfig,
) -> Result<Registration, RegistrationError> {
    register_masks(
        &fixed.select(&config.labels),
        &moving.select(&config.labels),
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vasreg_3d::mask::ImageGeometry;

    fn small_config() -> RegistrationConfig {
        RegistrationConfig {
            icp_steps: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input() {
        let cloud = PointCloud::from_points(vec![[0.0; 3]]);
        let result = register_points(&PointCloud::default(), &cloud, &small_config());
        assert!(matches!(result, Err(RegistrationError::EmptyInput(0, 1))));
    }

    #[test]
    fn test_empty_mask() -> Result<(), RegistrationError> {
        let empty = BinaryMask::new(&[4, 4, 4], vec![0; 64], ImageGeometry::default())?;
        let result = register_masks(&empty, &empty, &small_config());
        assert!(matches!(result, Err(RegistrationError::EmptyInput(0, 0))));
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        let cloud = PointCloud::from_points(vec![[0.0; 3]]);
        let config = RegistrationConfig {
            spacing_search: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            register_points(&cloud, &cloud, &config),
            Err(RegistrationError::InvalidConfig(_))
        ));
    }
}
