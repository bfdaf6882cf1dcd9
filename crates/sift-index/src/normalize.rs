//! Unit-length normalization.
//!
//! Every vector that enters an index or a query is normalized first, so
//! the inner product of any two of them is their cosine similarity.

use thiserror::Error;

/// The vector has zero (or non-finite) L2 norm and has no direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("vector has zero or non-finite norm and cannot be normalized")]
pub struct DegenerateVector;

/// A vector with L2 norm 1 (within floating tolerance).
#[derive(Debug, Clone, PartialEq)]
pub struct UnitVector(Vec<f32>);

impl UnitVector {
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for UnitVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

/// L2 norm, accumulated in `f64`.
#[must_use]
pub fn l2_norm(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Divide every component of `v` by its L2 norm.
///
/// Fails with [`DegenerateVector`] instead of dividing by zero: a zero vector
/// scores 0 against everything and would silently corrupt rankings.
pub fn normalize(v: &[f32]) -> Result<UnitVector, DegenerateVector> {
    let norm = l2_norm(v);
    if norm == 0.0 || !norm.is_finite() {
        return Err(DegenerateVector);
    }

    Ok(UnitVector(
        v.iter().map(|&x| (f64::from(x) / norm) as f32).collect(),
    ))
}
