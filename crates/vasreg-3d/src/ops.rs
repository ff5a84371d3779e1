/// Utility function to compute the Euclidean distance between two points.
///
/// # Arguments
///
/// * `a` - A point in 3D space.
/// * `b` - Another point in 3D space.
///
/// # Returns
///
/// The Euclidean distance between the two points.
///
/// Example:
/// ```
/// use vasreg_3d::ops::euclidean_distance;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 5.0, 6.0];
/// let dst = euclidean_distance(&a, &b);
/// ```
pub fn euclidean_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}

/// Euclidean norm of a vector.
#[inline]
pub fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Dot product of two vectors.
#[inline]
pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Normalize a vector to unit length.
///
/// A zero-length vector cannot be normalized: every component of the result is
/// set to `div0` instead. Use [`unit_vector_or_nan`] to get an undefined (NaN)
/// direction that propagates through later computations.
///
/// Example:
/// ```
/// use vasreg_3d::ops::unit_vector;
///
/// assert_eq!(unit_vector(&[0.0, 3.0, 4.0], f64::NAN), [0.0, 0.6, 0.8]);
/// assert_eq!(unit_vector(&[0.0, 0.0, 0.0], 0.0), [0.0, 0.0, 0.0]);
/// ```
pub fn unit_vector(v: &[f64; 3], div0: f64) -> [f64; 3] {
    let n = norm(v);
    if n == 0.0 {
        return [div0; 3];
    }
    [v[0] / n, v[1] / n, v[2] / n]
}

/// Normalize a vector to unit length, yielding NaN components for a zero vector.
pub fn unit_vector_or_nan(v: &[f64; 3]) -> [f64; 3] {
    unit_vector(v, f64::NAN)
}
