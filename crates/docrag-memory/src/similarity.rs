//! Vector normalization and cosine similarity.

/// L2-normalize `vector`. The zero vector normalizes to zeros.
///
/// The norm is accumulated in `f64` so very large or very small finite
/// components neither overflow nor vanish.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let sum_squares: f64 = vector.iter().map(|x| f64::from(*x).powi(2)).sum();
    if sum_squares == 0.0 {
        return vec![0.0; vector.len()];
    }
    let norm = sum_squares.sqrt();
    vector.iter().map(|x| (f64::from(*x) / norm) as f32).collect()
}

/// Dot product; 0 when lengths differ or either side is empty.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    dot(&normalize(a), &normalize(b))
}
