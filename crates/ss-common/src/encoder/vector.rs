/// L2 norm of a vector, accumulated in f64.
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt()
}

/// Scale `v` to unit length in place. Returns `false` and leaves `v` untouched when the
/// norm is zero or not finite.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }

    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

/// Inner product. Mismatched lengths yield `None` rather than a truncated sum.
pub fn inner_product(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; skipping inner product"
        );
        return None;
    }

    Some(
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| f64::from(*x) * f64::from(*y))
            .sum(),
    )
}

/// Inner-product distance, `1 - <a, b>`. For unit vectors this equals cosine distance, so
/// `1 - distance` gives back cosine similarity.
pub fn inner_product_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    inner_product(a, b).map(|dot| 1.0 - dot)
}
