//! Vector similarity and fitment percentage

use log::warn;

/// Cosine similarity of two embeddings, in `[-1, 1]`.
///
/// Returns `0.0` when either vector is empty, the lengths differ, or either
/// magnitude is exactly zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot_product, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, na, nb), (&x, &y)| {
            let (x, y) = (x as f64, y as f64);
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot_product / (norm_a.sqrt() * norm_b.sqrt());
    score.clamp(-1.0, 1.0) as f32
}

/// Rescale a cosine similarity to a percentage rounded to two decimals.
///
/// Negative similarity is floored at zero so the percentage stays in
/// `[0, 100]`; the floor is logged so callers can surface it.
pub fn fitment_percentage(similarity: f32) -> f64 {
    if similarity < 0.0 {
        warn!(
            "Negative semantic similarity ({:.4}) floored to 0% fitment",
            similarity
        );
    }

    let scaled = (similarity.max(0.0) as f64 * 100.0).min(100.0);
    (scaled * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-6;

    #[test]
    fn test_identical_vectors_score_one() {
        for v in [vec![1.0, 0.0], vec![0.3, -2.5, 7.0], vec![1e-3; 256]] {
            assert!((cosine_similarity(&v, &v) - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let a = [0.2, 0.9, -0.4, 1.5];
        let b = [1.1, -0.3, 0.8, 0.05];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_percentage_rescaling() {
        assert_eq!(fitment_percentage(1.0), 100.0);
        assert_eq!(fitment_percentage(0.0), 0.0);
        assert_eq!(fitment_percentage(0.87654), 87.65);
    }

    #[test]
    fn test_negative_similarity_is_floored() {
        assert_eq!(fitment_percentage(-0.5), 0.0);
        assert_eq!(fitment_percentage(-1.0), 0.0);
    }
}
