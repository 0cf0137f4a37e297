//! Labelled points in profile space.

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// An immutable n-dimensional vector with an opaque label.
///
/// The label is carried through clustering untouched; in practice it echoes
/// the group key the profile was computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointVector {
    label: String,
    values: Vec<f64>,
}

impl PointVector {
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of dimensions.
    #[inline]
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn into_parts(self) -> (String, Vec<f64>) {
        (self.label, self.values)
    }
}

/// Check that every point has the same dimensionality and return it.
pub(crate) fn common_dim(points: &[PointVector]) -> Result<usize> {
    let first = points.first().ok_or(ProfileError::EmptyInput)?;
    let dim = first.dim();
    for p in &points[1..] {
        if p.dim() != dim {
            return Err(ProfileError::DimensionMismatch {
                expected: dim,
                actual: p.dim(),
            });
        }
    }
    Ok(dim)
}
