// Vector operations: cosine similarity and the cosine distance convention
// shared with LanceDB.

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `None` when the lengths differ or either vector is empty, and
/// `0.0` when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if !denom.is_finite() || denom < f64::EPSILON {
        return Some(0.0);
    }

    let raw = dot / denom;
    if !raw.is_finite() {
        return Some(0.0);
    }
    Some(raw.clamp(-1.0, 1.0))
}

/// LanceDB reports cosine *distance* (`1 - similarity`).
pub fn similarity_from_cosine_distance(distance: f64) -> f64 {
    1.0 - distance
}
