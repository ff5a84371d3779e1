use glam::{DMat3, DVec3};

use crate::linalg::transform_points3d;

/// Error type for the transforms module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TransformError {
    /// The homogeneous matrix is not square.
    #[error("Invalid transform matrix shape: ({0}, {1})")]
    InvalidShape(usize, usize),

    /// The homogeneous matrix does not describe a 3D transform.
    #[error("Invalid transform matrix dimension: {0}, expected 4")]
    InvalidDimension(usize),

    /// Source and destination buffers differ in length.
    #[error("Source and destination lengths differ ({0} != {1})")]
    LengthMismatch(usize, usize),

    /// The rotation axis has zero length.
    #[error("Cannot compute rotation matrix from a zero vector")]
    ZeroAxis,
}

/// An affine map `p ↦ A p + t` in 3D.
///
/// The linear part `matrix` is stored row-major. This is the value type handed
/// between the registration stages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    /// Linear part, row-major.
    pub matrix: [[f64; 3]; 3],
    /// Translation part.
    pub translation: [f64; 3],
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    /// The identity transform.
    pub const fn identity() -> Self {
        Self {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }

    /// Create a transform from its linear part and translation.
    pub const fn new(matrix: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            matrix,
            translation,
        }
    }

    /// Create a rigid transform from a rotation matrix and a translation.
    pub fn from_rotation_translation(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self::new(rotation, translation)
    }

    /// Create a transform from a 4×4 homogeneous matrix, ignoring its last row.
    pub fn from_matrix4(m: &[[f64; 4]; 4]) -> Self {
        Self {
            matrix: std::array::from_fn(|i| [m[i][0], m[i][1], m[i][2]]),
            translation: [m[0][3], m[1][3], m[2][3]],
        }
    }

    /// The 4×4 homogeneous matrix with last row `[0, 0, 0, 1]`.
    pub fn to_matrix4(&self) -> [[f64; 4]; 4] {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().take(3).enumerate() {
            row[..3].copy_from_slice(&self.matrix[i]);
            row[3] = self.translation[i];
        }
        m[3][3] = 1.0;
        m
    }

    pub(crate) fn linear(&self) -> DMat3 {
        DMat3::from_cols_array_2d(&self.matrix).transpose()
    }

    pub(crate) fn from_glam(linear: DMat3, translation: DVec3) -> Self {
        Self {
            matrix: linear.transpose().to_cols_array_2d(),
            translation: translation.to_array(),
        }
    }

    /// Map a point: `A p + t`.
    pub fn transform_point(&self, p: &[f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        let t = &self.translation;
        [
            m[0][0] * p[0] + m[0][1] * p[1] + m[0][2] * p[2] + t[0],
            m[1][0] * p[0] + m[1][1] * p[1] + m[1][2] * p[2] + t[1],
            m[2][0] * p[0] + m[2][1] * p[1] + m[2][2] * p[2] + t[2],
        ]
    }

    /// Map a direction vector: `A v`. Translation does not apply to vectors.
    pub fn transform_vector(&self, v: &[f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }

    /// Composition `self ∘ other`: first `other`, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        let linear = self.linear() * other.linear();
        let translation =
            self.linear() * DVec3::from_array(other.translation) + DVec3::from_array(self.translation);
        Self::from_glam(linear, translation)
    }

    /// The inverse transform, `None` when the linear part is singular.
    pub fn inverse(&self) -> Option<AffineTransform> {
        let linear = self.linear();
        let det = linear.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = linear.inverse();
        Some(Self::from_glam(inv, -(inv * DVec3::from_array(self.translation))))
    }
}

/// A transform accepted by the point-mapping utilities.
///
/// `Matrix` holds a caller supplied homogeneous matrix which is validated when
/// applied, `Affine` is an already validated transform.
#[derive(Debug, Clone)]
pub enum PointTransform {
    /// Homogeneous matrix, must be 4×4.
    Matrix(faer::Mat<f64>),
    /// Affine transform.
    Affine(AffineTransform),
}

impl From<AffineTransform> for PointTransform {
    fn from(transform: AffineTransform) -> Self {
        PointTransform::Affine(transform)
    }
}

impl PointTransform {
    /// Resolve to an affine transform, validating the matrix shape.
    pub fn to_affine(&self) -> Result<AffineTransform, TransformError> {
        match self {
            PointTransform::Affine(transform) => Ok(*transform),
            PointTransform::Matrix(m) => {
                if m.nrows() != m.ncols() {
                    return Err(TransformError::InvalidShape(m.nrows(), m.ncols()));
                }
                if m.nrows() != 4 {
                    return Err(TransformError::InvalidDimension(m.nrows()));
                }
                Ok(AffineTransform {
                    matrix: std::array::from_fn(|i| std::array::from_fn(|j| m[(i, j)])),
                    translation: std::array::from_fn(|i| m[(i, 3)]),
                })
            }
        }
    }

    /// Map a point.
    pub fn apply_point(&self, p: &[f64; 3]) -> Result<[f64; 3], TransformError> {
        Ok(self.to_affine()?.transform_point(p))
    }

    /// Map a direction vector.
    pub fn apply_vector(&self, v: &[f64; 3]) -> Result<[f64; 3], TransformError> {
        Ok(self.to_affine()?.transform_vector(v))
    }
}

/// Transform a list of points with any supported transform.
pub fn transform_points(
    points: &[[f64; 3]],
    transform: &PointTransform,
) -> Result<Vec<[f64; 3]>, TransformError> {
    let affine = transform.to_affine()?;
    let mut dst_points = vec![[0.0; 3]; points.len()];
    transform_points3d(points, &affine.matrix, &affine.translation, &mut dst_points)?;
    Ok(dst_points)
}

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation, normalized internally.
/// * `angle` - The angle of rotation in radians.
///
/// Example:
///
/// ```
/// use vasreg_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let rotation = axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], 0.0).unwrap();
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], TransformError> {
    let axis = DVec3::from_array(*axis);
    if axis.length() < 1e-10 {
        return Err(TransformError::ZeroAxis);
    }
    let rotation = DMat3::from_axis_angle(axis.normalize(), angle);
    Ok(rotation.transpose().to_cols_array_2d())
}
