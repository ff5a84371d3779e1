//! Volumetric masks and their conversion to physical-space point clouds.
//!
//! Voxel buffers are stored x-fastest: the voxel at index `[x, y, z]` lives at
//! `x + nx * (y + ny * z)`. Physical coordinates follow the usual medical
//! image convention
//!
//! ```text
//! p = origin + (direction · diag(spacing)) · index
//! ```

use crate::pointcloud::PointCloud;

/// Error type for mask construction and conversion.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MaskError {
    /// Only three-dimensional volumes are supported.
    #[error("Expected a 3D volume, got {0} dimensions")]
    InvalidDimension(usize),

    /// The voxel buffer does not match the volume size.
    #[error("Data length ({0}) does not match the volume size ({1})")]
    InvalidDataLength(usize, usize),

    /// The geometry contains non-finite values or non-positive spacing.
    #[error("Invalid image geometry: {0}")]
    InvalidGeometry(&'static str),
}

/// Physical placement of a voxel grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGeometry {
    /// Physical position of voxel `[0, 0, 0]`.
    pub origin: [f64; 3],
    /// Voxel size along each index axis.
    pub spacing: [f64; 3],
    /// Direction cosines, row-major. Column `j` is the physical direction of index axis `j`.
    pub direction: [[f64; 3]; 3],
}

impl Default for ImageGeometry {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            spacing: [1.0; 3],
            direction: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

impl ImageGeometry {
    /// Create a geometry from slices, checking that it describes a 3D volume.
    ///
    /// `direction` holds the 9 direction cosines in row-major order.
    pub fn from_slices(origin: &[f64], spacing: &[f64], direction: &[f64]) -> Result<Self, MaskError> {
        if origin.len() != 3 {
            return Err(MaskError::InvalidDimension(origin.len()));
        }
        if spacing.len() != 3 {
            return Err(MaskError::InvalidDimension(spacing.len()));
        }
        if direction.len() != 9 {
            return Err(MaskError::InvalidGeometry("direction must hold 3x3 values"));
        }
        let geometry = Self {
            origin: [origin[0], origin[1], origin[2]],
            spacing: [spacing[0], spacing[1], spacing[2]],
            direction: std::array::from_fn(|i| [direction[3 * i], direction[3 * i + 1], direction[3 * i + 2]]),
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Check that all values are finite and the spacing is positive.
    pub fn validate(&self) -> Result<(), MaskError> {
        if !self.origin.iter().all(|v| v.is_finite()) {
            return Err(MaskError::InvalidGeometry("origin must be finite"));
        }
        if !self.spacing.iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(MaskError::InvalidGeometry("spacing must be finite and positive"));
        }
        if !self.direction.iter().flatten().all(|v| v.is_finite()) {
            return Err(MaskError::InvalidGeometry("direction must be finite"));
        }
        Ok(())
    }

    /// Physical position of a (possibly fractional) voxel index.
    pub fn index_to_physical(&self, index: &[f64; 3]) -> [f64; 3] {
        let d = &self.direction;
        let s = &self.spacing;
        let scaled = [index[0] * s[0], index[1] * s[1], index[2] * s[2]];
        std::array::from_fn(|i| {
            self.origin[i] + d[i][0] * scaled[0] + d[i][1] * scaled[1] + d[i][2] * scaled[2]
        })
    }

    /// Physical position of the volume center, the continuous index `size / 2`.
    pub fn center(&self, size: &[usize; 3]) -> [f64; 3] {
        self.index_to_physical(&[
            size[0] as f64 / 2.0,
            size[1] as f64 / 2.0,
            size[2] as f64 / 2.0,
        ])
    }
}

fn check_volume(size: &[usize], data_len: usize) -> Result<[usize; 3], MaskError> {
    if size.len() != 3 {
        return Err(MaskError::InvalidDimension(size.len()));
    }
    let numel = size.iter().product::<usize>();
    if numel != data_len {
        return Err(MaskError::InvalidDataLength(data_len, numel));
    }
    Ok([size[0], size[1], size[2]])
}

/// A binary volumetric mask, non-zero voxels are foreground.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    size: [usize; 3],
    data: Vec<u8>,
    geometry: ImageGeometry,
}

impl BinaryMask {
    /// Create a mask from its size, x-fastest voxel buffer and geometry.
    pub fn new(size: &[usize], data: Vec<u8>, geometry: ImageGeometry) -> Result<Self, MaskError> {
        let size = check_volume(size, data.len())?;
        geometry.validate()?;
        Ok(Self {
            size,
            data,
            geometry,
        })
    }

    /// Volume size `[nx, ny, nz]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Physical placement of the mask.
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Raw voxel buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Number of foreground voxels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Foreground voxel value at `[x, y, z]`, `false` outside the volume.
    pub fn get(&self, index: [usize; 3]) -> bool {
        let [nx, ny, nz] = self.size;
        if index[0] >= nx || index[1] >= ny || index[2] >= nz {
            return false;
        }
        self.data[index[0] + nx * (index[1] + ny * index[2])] != 0
    }

    /// Indices of the foreground voxels.
    ///
    /// The order is deterministic: x varies slowest and z fastest.
    pub fn foreground_indices(&self) -> Vec<[usize; 3]> {
        let [nx, ny, nz] = self.size;
        let mut indices = Vec::with_capacity(self.count());
        for x in 0..nx {
            for y in 0..ny {
                for z in 0..nz {
                    if self.data[x + nx * (y + ny * z)] != 0 {
                        indices.push([x, y, z]);
                    }
                }
            }
        }
        indices
    }

    /// Physical position of the volume center.
    pub fn center(&self) -> [f64; 3] {
        self.geometry.center(&self.size)
    }
}

/// Rule deriving a binary mask from a label volume.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum LabelSelection {
    /// Every voxel whose label differs from the given one.
    NotEqual(u16),
    /// Every voxel whose label is one of the given ones.
    AnyOf(Vec<u16>),
}

impl LabelSelection {
    /// Whether a label is selected.
    pub fn contains(&self, label: u16) -> bool {
        match self {
            LabelSelection::NotEqual(excluded) => label != *excluded,
            LabelSelection::AnyOf(labels) => labels.contains(&label),
        }
    }
}

/// A label volume, such as a multi-class vessel segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    size: [usize; 3],
    data: Vec<u16>,
    geometry: ImageGeometry,
}

impl LabelVolume {
    /// Create a label volume from its size, x-fastest label buffer and geometry.
    pub fn new(size: &[usize], data: Vec<u16>, geometry: ImageGeometry) -> Result<Self, MaskError> {
        let size = check_volume(size, data.len())?;
        geometry.validate()?;
        Ok(Self {
            size,
            data,
            geometry,
        })
    }

    /// Volume size `[nx, ny, nz]`.
    pub fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Physical placement of the volume.
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Derive a binary mask sharing this volume's geometry.
    pub fn select(&self, selection: &LabelSelection) -> BinaryMask {
        BinaryMask {
            size: self.size,
            data: self
                .data
                .iter()
                .map(|&label| selection.contains(label) as u8)
                .collect(),
            geometry: self.geometry,
        }
    }
}

/// Strategy used to map voxel indices to physical points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExtractionMethod {
    /// Map each index on its own, the reference implementation.
    Direct,
    /// Map all indices with a single matrix product.
    #[default]
    Batch,
}

/// Convert a binary mask to the physical positions of its foreground voxels.
///
/// Both methods produce the points in the same order and agree to within
/// floating-point round-off (well below `1e-9`).
///
/// Example:
///
/// ```
/// use vasreg_3d::mask::{mask_to_points, BinaryMask, ExtractionMethod, ImageGeometry};
///
/// let mask = BinaryMask::new(&[2, 1, 1], vec![0, 1], ImageGeometry::default()).unwrap();
/// let points = mask_to_points(&mask, ExtractionMethod::Batch);
/// assert_eq!(points.points(), &[[1.0, 0.0, 0.0]]);
/// ```
pub fn mask_to_points(mask: &BinaryMask, method: ExtractionMethod) -> PointCloud {
    let indices = mask.foreground_indices();
    if indices.is_empty() {
        return PointCloud::default();
    }

    let geometry = mask.geometry();
    let points = match method {
        ExtractionMethod::Direct => indices
            .iter()
            .map(|index| {
                geometry.index_to_physical(&[index[0] as f64, index[1] as f64, index[2] as f64])
            })
            .collect(),
        ExtractionMethod::Batch => {
            let (d, s) = (&geometry.direction, &geometry.spacing);
            let dir_scale = faer::Mat::<f64>::from_fn(3, 3, |i, j| d[i][j] * s[j]);
            let coords = faer::Mat::<f64>::from_fn(3, indices.len(), |i, j| indices[j][i] as f64);
            let physical = &dir_scale * &coords;
            (0..indices.len())
                .map(|j| std::array::from_fn(|i| geometry.origin[i] + physical[(i, j)]))
                .collect()
        }
    };

    log::debug!("mask_to_points: {} foreground voxels", indices.len());

    PointCloud::from_points(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn oblique_geometry() -> ImageGeometry {
        let (s, c) = 0.4f64.sin_cos();
        ImageGeometry {
            origin: [-12.5, 40.25, 3.0],
            spacing: [0.45, 0.45, 0.8],
            direction: [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, -1.0]],
        }
    }

    fn sphere_mask(n: usize, geometry: ImageGeometry) -> Result<BinaryMask, MaskError> {
        let c = n as f64 / 2.0;
        let mut data = vec![0u8; n * n * n];
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let r2 = (x as f64 - c).powi(2) + (y as f64 - c).powi(2) + (z as f64 - c).powi(2);
                    if r2 < (c * 0.8).powi(2) {
                        data[x + n * (y + n * z)] = 1;
                    }
                }
            }
        }
        BinaryMask::new(&[n, n, n], data, geometry)
    }

    #[test]
    fn test_methods_agree() -> Result<(), MaskError> {
        let mask = sphere_mask(17, oblique_geometry())?;
        let direct = mask_to_points(&mask, ExtractionMethod::Direct);
        let batch = mask_to_points(&mask, ExtractionMethod::Batch);

        assert_eq!(direct.len(), mask.count());
        assert_eq!(direct.len(), batch.len());
        assert!(batch.is_finite());
        for (p, q) in direct.points().iter().zip(batch.points()) {
            for k in 0..3 {
                assert!((p[k] - q[k]).abs() < 1e-9, "{p:?} != {q:?}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_index_order_and_mapping() -> Result<(), MaskError> {
        // voxels [1, 0, 0] and [0, 1, 1] are set
        let mut data = vec![0u8; 8];
        data[1] = 1;
        data[2 + 4] = 1;
        let geometry = ImageGeometry {
            origin: [10.0, 20.0, 30.0],
            spacing: [0.5, 2.0, 3.0],
            ..Default::default()
        };
        let mask = BinaryMask::new(&[2, 2, 2], data, geometry)?;
        assert_eq!(mask.foreground_indices(), vec![[0, 1, 1], [1, 0, 0]]);

        let points = mask_to_points(&mask, ExtractionMethod::Direct);
        assert_eq!(points.points(), &[[10.0, 22.0, 33.0], [10.5, 20.0, 30.0]]);
        Ok(())
    }

    #[test]
    fn test_empty_mask() -> Result<(), MaskError> {
        let mask = BinaryMask::new(&[3, 3, 3], vec![0; 27], ImageGeometry::default())?;
        assert!(mask_to_points(&mask, ExtractionMethod::Batch).is_empty());
        assert!(mask_to_points(&mask, ExtractionMethod::Direct).is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_dimensions() {
        assert_eq!(
            BinaryMask::new(&[4, 4], vec![0; 16], ImageGeometry::default()),
            Err(MaskError::InvalidDimension(2))
        );
        assert_eq!(
            BinaryMask::new(&[2, 2, 2], vec![0; 7], ImageGeometry::default()),
            Err(MaskError::InvalidDataLength(7, 8))
        );
        assert_eq!(
            ImageGeometry::from_slices(&[0.0; 2], &[1.0; 2], &[1.0, 0.0, 0.0, 1.0]),
            Err(MaskError::InvalidDimension(2))
        );
        let geometry = ImageGeometry {
            spacing: [1.0, 0.0, 1.0],
            ..Default::default()
        };
        assert!(matches!(
            BinaryMask::new(&[1, 1, 1], vec![1], geometry),
            Err(MaskError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_label_selection() -> Result<(), MaskError> {
        let labels = LabelVolume::new(&[5, 1, 1], vec![0, 1, 4, 5, 2], ImageGeometry::default())?;
        let vessels = labels.select(&LabelSelection::AnyOf(vec![4, 5]));
        assert_eq!(vessels.as_slice(), &[0, 0, 1, 1, 0]);
        let binary = labels.select(&LabelSelection::NotEqual(1));
        assert_eq!(binary.as_slice(), &[1, 0, 1, 1, 1]);
        assert!(binary.get([0, 0, 0]));
        assert!(!binary.get([9, 0, 0]));
        Ok(())
    }

    #[test]
    fn test_center() {
        let geometry = ImageGeometry {
            origin: [1.0, 2.0, 3.0],
            spacing: [0.5, 0.5, 2.0],
            ..Default::default()
        };
        let center = geometry.center(&[10, 20, 5]);
        assert_relative_eq!(center[0], 3.5);
        assert_relative_eq!(center[1], 7.0);
        assert_relative_eq!(center[2], 8.0);
    }
}
