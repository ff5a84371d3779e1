use std::path::Path;

use serde::{Deserialize, Serialize};
use vasreg_3d::mask::{ExtractionMethod, LabelSelection};
use vasreg_ransac::RansacConfig;

use crate::RegistrationError;

/// Parameters of the coarse-to-fine registration.
///
/// Every field has a default, so a configuration file only needs to list the
/// values it changes:
///
/// ```
/// use vasreg::RegistrationConfig;
///
/// let config = RegistrationConfig::from_json_str(r#"{"icp_steps": 50}"#).unwrap();
/// assert_eq!(config.icp_steps, 50);
/// assert_eq!(config.spacing_search, 1.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Point spacing (mm) of the global registration.
    pub spacing_search: f64,
    /// Point spacing (mm) of the local refinement.
    pub spacing_refine: f64,
    /// Global registration parameters.
    pub ransac: RansacConfig,
    /// Number of annealing steps of the refinement.
    pub icp_steps: usize,
    /// Maximum number of ICP iterations per annealing step.
    pub icp_max_inner_iterations: usize,
    /// Seed of the Poisson-disk sampler.
    pub sampling_seed: u64,
    /// Labels forming the vessel mask of a label volume.
    pub labels: LabelSelection,
    /// Mapping of mask voxels to physical points.
    pub extraction: ExtractionMethod,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            spacing_search: 1.5,
            spacing_refine: 1.0,
            ransac: RansacConfig::default(),
            icp_steps: 1000,
            icp_max_inner_iterations: 100,
            sampling_seed: 0,
            labels: LabelSelection::AnyOf(vec![4, 5]),
            extraction: ExtractionMethod::Batch,
        }
    }
}

impl RegistrationConfig {
    /// Parse a configuration from JSON, missing fields take their default.
    pub fn from_json_str(json: &str) -> Result<Self, RegistrationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegistrationError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        for (name, spacing) in [
            ("spacing_search", self.spacing_search),
            ("spacing_refine", self.spacing_refine),
        ] {
            if !(spacing > 0.0) || !spacing.is_finite() {
                return Err(RegistrationError::InvalidConfig(format!(
                    "{name} must be positive, got {spacing}"
                )));
            }
        }
        if self.icp_steps == 0 {
            return Err(RegistrationError::InvalidConfig(
                "icp_steps must be at least 1".to_string(),
            ));
        }
        if !(self.ransac.confidence > 0.0 && self.ransac.confidence < 1.0) {
            return Err(RegistrationError::InvalidConfig(format!(
                "ransac.confidence must be in (0, 1), got {}",
                self.ransac.confidence
            )));
        }
        Ok(())
    }
}
