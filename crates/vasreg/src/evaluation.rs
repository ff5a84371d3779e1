use vasreg_3d::{
    ops::{dot, euclidean_distance, unit_vector_or_nan},
    transforms::{PointTransform, TransformError},
};

/// Distance between a predicted and a ground-truth transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationResult {
    /// Distance between the two images of the reference point (mm).
    pub translation_error: f64,
    /// Mean angle between the two images of the coordinate axes (degrees).
    pub rotation_error: f64,
}

/// Compare a predicted transform with the ground truth around a reference point.
///
/// The rotation error averages, over the three coordinate axes, the angle
/// between the axis mapped by each transform. Angles beyond 90 degrees are
/// clipped to 90. A transform collapsing an axis to zero length yields a NaN
/// rotation error.
///
/// Example:
///
/// ```
/// use vasreg::{evaluate_transforms, k3d::transforms::{AffineTransform, PointTransform}};
///
/// let identity: PointTransform = AffineTransform::identity().into();
/// let result = evaluate_transforms(&identity, &identity, &[1.0, 2.0, 3.0]).unwrap();
/// assert_eq!(result.translation_error, 0.0);
/// assert_eq!(result.rotation_error, 0.0);
/// ```
pub fn evaluate_transforms(
    pred: &PointTransform,
    truth: &PointTransform,
    reference: &[f64; 3],
) -> Result<EvaluationResult, TransformError> {
    let pred = pred.to_affine()?;
    let truth = truth.to_affine()?;

    let translation_error = euclidean_distance(
        &pred.transform_point(reference),
        &truth.transform_point(reference),
    );

    let mut angles = [0.0; 3];
    for (k, angle) in angles.iter_mut().enumerate() {
        let mut axis = [0.0; 3];
        axis[k] = 1.0;
        let v_pred = unit_vector_or_nan(&pred.transform_vector(&axis));
        let v_truth = unit_vector_or_nan(&truth.transform_vector(&axis));
        let cos = dot(&v_pred, &v_truth);
        // f64::clamp keeps NaN
        *angle = cos.clamp(0.0, 1.0).acos();
    }
    let rotation_error = (angles.iter().sum::<f64>() / 3.0).to_degrees();

    Ok(EvaluationResult {
        translation_error,
        rotation_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vasreg_3d::transforms::{axis_angle_to_rotation_matrix, AffineTransform};

    #[test]
    fn test_equal_transforms() -> Result<(), TransformError> {
        let rotation = axis_angle_to_rotation_matrix(&[1.0, 2.0, 3.0], 0.3)?;
        let tf: PointTransform = AffineTransform::new(rotation, [1.0, -2.0, 0.5]).into();
        let result = evaluate_transforms(&tf, &tf, &[10.0, 20.0, 30.0])?;
        assert_eq!(result.translation_error, 0.0);
        assert_relative_eq!(result.rotation_error, 0.0, epsilon = 1e-5);
        Ok(())
    }

    #[test]
    fn test_translation_only() -> Result<(), TransformError> {
        let pred: PointTransform = AffineTransform::new(AffineTransform::identity().matrix, [3.0, 4.0, 0.0]).into();
        let truth: PointTransform = AffineTransform::identity().into();
        let result = evaluate_transforms(&pred, &truth, &[0.0; 3])?;
        assert_relative_eq!(result.translation_error, 5.0);
        assert_eq!(result.rotation_error, 0.0);
        Ok(())
    }

    #[test]
    fn test_rotation_about_z() -> Result<(), TransformError> {
        // x and y axes turn by 10 degrees, z does not move
        let rotation = axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], 10f64.to_radians())?;
        let pred: PointTransform = AffineTransform::new(rotation, [0.0; 3]).into();
        let truth: PointTransform = AffineTransform::identity().into();
        let result = evaluate_transforms(&pred, &truth, &[0.0; 3])?;
        assert_relative_eq!(result.translation_error, 0.0);
        assert_relative_eq!(result.rotation_error, 20.0 / 3.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn test_opposite_axes_are_clipped() -> Result<(), TransformError> {
        let rotation = axis_angle_to_rotation_matrix(&[0.0, 0.0, 1.0], std::f64::consts::PI)?;
        let pred: PointTransform = AffineTransform::new(rotation, [0.0; 3]).into();
        let result = evaluate_transforms(&pred, &AffineTransform::identity().into(), &[0.0; 3])?;
        assert_relative_eq!(result.rotation_error, 60.0, epsilon = 1e-9);
        assert!(result.rotation_error <= 180.0);
        Ok(())
    }

    #[test]
    fn test_degenerate_axis_is_nan() -> Result<(), TransformError> {
        let flat = AffineTransform::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]], [0.0; 3]);
        let result = evaluate_transforms(&flat.into(), &AffineTransform::identity().into(), &[0.0; 3])?;
        assert!(result.rotation_error.is_nan());
        assert!(result.translation_error >= 0.0);
        Ok(())
    }

    #[test]
    fn test_invalid_matrix() {
        let pred = PointTransform::Matrix(faer::Mat::<f64>::zeros(3, 4));
        let truth: PointTransform = AffineTransform::identity().into();
        assert!(evaluate_transforms(&pred, &truth, &[0.0; 3]).is_err());
    }
}
