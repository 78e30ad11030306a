use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimilarityError {
    #[error("Vectors have different dimensions: {0} vs {1}")]
    DimensionMismatch(usize, usize),

    #[error("Cosine similarity is undefined for a zero vector")]
    ZeroVector,

    #[error("Cosine similarity is not a finite number")]
    NotFinite,
}

fn max_magnitude(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |max, x| max.max(x.abs()))
}

/// Cosine of the angle between `a` and `b`, always within [-1, 1].
///
/// Each vector is divided by its largest absolute component before summing,
/// so components anywhere in the finite f64 range neither overflow nor
/// underflow the squared norms.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Result<f64, SimilarityError> {
    if a.len() != b.len() {
        return Err(SimilarityError::DimensionMismatch(a.len(), b.len()));
    }

    let (scale_a, scale_b) = (max_magnitude(a), max_magnitude(b));
    if scale_a == 0.0 || scale_b == 0.0 {
        return Err(SimilarityError::ZeroVector);
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x / scale_a, y / scale_b))
        .fold((0.0, 0.0, 0.0), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    // Both norms are at least 1 after scaling. The root of their product keeps
    // identical vectors at exactly 1.0.
    let score = dot / (norm_a * norm_b).sqrt();
    if !score.is_finite() {
        return Err(SimilarityError::NotFinite);
    }
    Ok(score.clamp(-1.0, 1.0))
}

/// Human readable form of a score, truncated toward zero: 0.8765 -> "Similarity: 87%".
pub fn match_reason(score: f64) -> String {
    format!("Similarity: {}%", (score * 100.0).trunc() as i64)
}
