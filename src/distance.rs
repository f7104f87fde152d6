//! Distance metrics between embedding vectors.
//!
//! Pure, stateless functions over two equal-length vectors. These feed
//! the per-provider feature compositions, so they must be deterministic:
//! identical inputs always produce identical outputs.
//!
//! Inputs are the `f32` vectors the embedding API returns; accumulation
//! and outputs are `f64` so that sums over wide vectors (L1 over 1536
//! dimensions) don't lose precision before reaching a classifier.

/// Cosine similarity of two vectors.
///
/// Defined as 0 when either vector has zero norm. That degenerate-case
/// policy keeps all-zero embeddings (e.g. from placeholder text) flowing
/// through the pipeline instead of dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let norm = norm_a.sqrt() * norm_b.sqrt();
    if norm == 0.0 {
        return 0.0;
    }
    dot / norm
}

/// Cosine distance: `1 - cosine_similarity`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    1.0 - cosine_similarity(a, b)
}

/// Euclidean (L2) distance.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// L1 (Manhattan) distance: sum of absolute differences.
pub fn l1_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    a.iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs())
        .sum()
}

/// Element-wise absolute difference; same dimensionality as the inputs.
pub fn difference_vector(a: &[f32], b: &[f32]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());

    a.iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs())
        .collect()
}

/// Element-wise product; same dimensionality as the inputs.
pub fn overlap_product_vector(a: &[f32], b: &[f32]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());

    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_cosine_distance_symmetry() {
        let a = [1.0f32, 2.0, 3.0];
        let b = [-0.5f32, 0.25, 4.0];
        assert!((cosine_distance(&a, &b) - cosine_distance(&b, &a)).abs() < EPS);
    }

    #[test]
    fn test_cosine_distance_identical_is_zero() {
        let a = [0.3f32, -0.7, 0.64];
        assert!(cosine_distance(&a, &a).abs() < EPS);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = [0.0f32, 0.0, 0.0];
        let b = [1.0f32, 2.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&b, &a), 0.0);
        assert_eq!(cosine_distance(&a, &b), 1.0);
    }

    #[test]
    fn test_cosine_distance_opposite_is_two() {
        let a = [1.0f32, 0.0];
        let b = [-1.0f32, 0.0];
        assert!((cosine_distance(&a, &b) - 2.0).abs() < EPS);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = [0.0f32, 0.0];
        let b = [3.0f32, 4.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < EPS);
        assert!((euclidean_distance(&b, &a) - 5.0).abs() < EPS);
        assert_eq!(euclidean_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_l1_distance() {
        let a = [1.0f32, -2.0, 3.0];
        let b = [2.0f32, 2.0, 1.0];
        assert!((l1_distance(&a, &b) - 7.0).abs() < EPS);
        assert_eq!(l1_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_difference_vector() {
        let a = [1.0f32, -2.0, 3.0];
        let b = [2.0f32, 2.0, 1.0];
        assert_eq!(difference_vector(&a, &b), vec![1.0, 4.0, 2.0]);
    }

    #[test]
    fn test_overlap_product_vector() {
        let a = [1.0f32, -2.0, 3.0];
        let b = [2.0f32, 2.0, 0.5];
        assert_eq!(overlap_product_vector(&a, &b), vec![2.0, -4.0, 1.5]);
    }
}
