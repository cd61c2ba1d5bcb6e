use crate::error::{check_dimension, Result};

/// Trait for calculating the squared distance between two vectors. An optimization for when the true
/// L2 distance is not needed.
///
/// Implementations do not validate lengths. Callers validate dimensions once up front.
pub trait CalculateSquared {
    fn calculate_squared(&self, a: &[f32], b: &[f32]) -> f32;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct L2DistanceCalculator {}

impl L2DistanceCalculator {
    pub fn new() -> Self {
        Self {}
    }

    pub fn calculate_scalar(&self, a: &[f32], b: &[f32]) -> f32 {
        self.calculate_squared(a, b).sqrt()
    }
}

impl CalculateSquared for L2DistanceCalculator {
    fn calculate_squared(&self, a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| {
                let diff = x - y;
                diff * diff
            })
            .sum::<f32>()
    }
}

/// Sum of element-wise squared differences.
pub fn squared_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimension(a.len(), b.len())?;
    Ok(L2DistanceCalculator::new().calculate_squared(a, b))
}

pub fn norm_squared(x: &[f32]) -> f32 {
    x.iter().map(|v| v * v).sum::<f32>()
}

pub fn l2_norm(x: &[f32]) -> f32 {
    norm_squared(x).sqrt()
}

/// Scales `x` to unit length and returns its original norm. A zero vector is left untouched.
pub fn normalize_in_place(x: &mut [f32]) -> f32 {
    let norm = l2_norm(x);
    if norm == 0.0 {
        return norm;
    }
    x.iter_mut().for_each(|v| *v /= norm);
    norm
}

/// Returns `x / ||x||`, or `x` unchanged when its norm is exactly zero.
pub fn normalize(x: &[f32]) -> Vec<f32> {
    let mut result = x.to_vec();
    normalize_in_place(&mut result);
    result
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::QuantizationError;
    use crate::test_utils::generate_random_vector;

    #[test]
    fn test_squared_distance() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 6.0, 3.0];
        assert_eq!(squared_distance(&a, &b).unwrap(), 25.0);
        assert_eq!(squared_distance(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_squared_distance_dimension_mismatch() {
        let err = squared_distance(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            QuantizationError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_l2_impls() {
        let a = generate_random_vector(128);
        let b = generate_random_vector(128);

        let distance_calculator = L2DistanceCalculator::new();
        let squared = distance_calculator.calculate_squared(&a, &b);
        let distance = distance_calculator.calculate_scalar(&a, &b);
        assert_relative_eq!(distance * distance, squared, max_relative = 1e-5);
        assert_relative_eq!(squared_distance(&a, &b).unwrap(), squared);
    }

    #[test]
    fn test_normalize() {
        let x = [3.0, 4.0];
        let n = normalize(&x);
        assert_relative_eq!(n[0], 0.6);
        assert_relative_eq!(n[1], 0.8);
        assert_relative_eq!(l2_norm(&n), 1.0, max_relative = 1e-6);

        let mut y = x.to_vec();
        let norm = normalize_in_place(&mut y);
        assert_relative_eq!(norm, 5.0);
        assert_eq!(y, n);
    }

    #[test]
    fn test_normalize_zero_vector_is_unchanged() {
        let zero = vec![0.0; 4];
        assert_eq!(normalize(&zero), zero);

        let mut z = zero.clone();
        assert_eq!(normalize_in_place(&mut z), 0.0);
        assert_eq!(z, zero);
    }
}
