//! Vector math used for ranking and validation.
//!
//! Accumulation is done in `f64` so long `f32` embeddings do not lose
//! precision in the dot product.

use lexis_core::error::{LexisError, Result};

fn check_dims(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(LexisError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Dot product of two equally sized vectors.
pub fn dot(a: &[f32], b: &[f32]) -> Result<f64> {
    check_dims(a, b)?;
    Ok(a.iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum())
}

/// Euclidean length of a vector.
pub fn magnitude(a: &[f32]) -> f64 {
    a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt()
}

/// Compute cosine similarity between two vectors.
///
/// Fails with `DimensionMismatch` when the lengths differ. Returns 0.0 if
/// either vector has zero magnitude or the quotient is not finite, so
/// rankings never see `NaN`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    let dot = dot(a, b)?;

    let mag_a = magnitude(a);
    let mag_b = magnitude(b);

    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }

    let sim = dot / (mag_a * mag_b);
    if !sim.is_finite() {
        return Ok(0.0);
    }

    // Rounding can push identical vectors a hair past 1.0.
    Ok(sim.clamp(-1.0, 1.0))
}

/// Return true if every component is a finite number.
pub fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}
