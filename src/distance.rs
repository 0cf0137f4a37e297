//! Distance metrics for profile vectors.
//!
//! Both metrics are symmetric, non-negative and zero exactly for equal
//! vectors. They differ in what they emphasize:
//!
//! - [`DistanceMetric::Euclidean`] accumulates every coordinate difference.
//! - [`DistanceMetric::Maxdiff`] (Chebyshev, $L_\infty$) only looks at the single
//!   most divergent coordinate, which makes it cheaper and less sensitive to
//!   small differences spread over many dimensions.

use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// Distance metric used by k-means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// $\sqrt{\sum_i (a_i - b_i)^2}$.
    #[default]
    Euclidean,
    /// $\max_i |a_i - b_i|$.
    Maxdiff,
}

impl DistanceMetric {
    /// Compute distance between two vectors.
    #[inline]
    pub fn distance(self, a: &[f64], b: &[f64]) -> Result<f64> {
        match self {
            DistanceMetric::Euclidean => euclidean(a, b),
            DistanceMetric::Maxdiff => maxdiff(a, b),
        }
    }

    /// Like [`distance`](Self::distance), for callers that already checked
    /// both slices have the same length.
    #[inline]
    #[must_use]
    pub(crate) fn distance_unchecked(self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            DistanceMetric::Euclidean => squared_euclidean(a, b).sqrt(),
            DistanceMetric::Maxdiff => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs())
                .fold(0.0, f64::max),
        }
    }
}

#[inline]
fn check_dims(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(ProfileError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Euclidean (L2) distance.
#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> Result<f64> {
    check_dims(a, b)?;
    Ok(DistanceMetric::Euclidean.distance_unchecked(a, b))
}

/// Maxdiff (Chebyshev, L-infinity) distance.
#[inline]
pub fn maxdiff(a: &[f64], b: &[f64]) -> Result<f64> {
    check_dims(a, b)?;
    Ok(DistanceMetric::Maxdiff.distance_unchecked(a, b))
}

/// Squared Euclidean distance; callers guarantee equal lengths.
#[inline]
#[must_use]
pub(crate) fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_of_3_4_is_5() {
        let d = euclidean(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn maxdiff_picks_largest_coordinate_gap() {
        let d = maxdiff(&[0.0, 0.5, 1.0], &[0.1, 0.0, 0.7]).unwrap();
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn mismatched_lengths_fail() {
        for metric in [DistanceMetric::Euclidean, DistanceMetric::Maxdiff] {
            assert_eq!(
                metric.distance(&[0.0, 1.0], &[0.0]),
                Err(ProfileError::DimensionMismatch {
                    expected: 2,
                    actual: 1
                })
            );
        }
    }

    #[test]
    fn empty_vectors_are_at_distance_zero() {
        assert_eq!(euclidean(&[], &[]).unwrap(), 0.0);
        assert_eq!(maxdiff(&[], &[]).unwrap(), 0.0);
    }
}
