//! Clustering of profile vectors.
//!
//! ## Algorithms
//!
//! ### DBSCAN ([`Dbscan`])
//!
//! Density-based: a point with at least `min_points` neighbors (itself
//! included) is a core point, and clusters grow transitively through core
//! points. Points no core point reaches are noise. The neighborhood here is
//! an axis-aligned box with a separate tolerance per dimension, not a
//! ball:
//!
//! ```text
//! q ∈ N(p)  ⇔  ∀i: |p_i - q_i| ≤ eps_i
//! ```
//!
//! Each profile position can therefore be given its own slack, at the cost
//! of rotational invariance.
//!
//! ### K-means ([`KMeans`])
//!
//! Partitions into exactly `k` clusters by alternating nearest-centroid
//! assignment and centroid recomputation, under either
//! [`DistanceMetric`](crate::DistanceMetric).
//!
//! ## Determinism
//!
//! Both algorithms visit points in input order and use no randomness, so the
//! same input in the same order always gives the same clusters. Neither
//! sorts its output; [`DensityClusters::by_size`] and
//! [`KMeansResult::by_size`] give a presentation order without touching the
//! result.
//!
//! ## Usage
//!
//! ```rust
//! use hexprofile::cluster::{Dbscan, KMeans, KMeansConfig};
//! use hexprofile::PointVector;
//!
//! let points = vec![
//!     PointVector::new("a", vec![0.0, 0.0]),
//!     PointVector::new("b", vec![0.05, 0.0]),
//!     PointVector::new("c", vec![0.95, 1.0]),
//!     PointVector::new("d", vec![1.0, 0.95]),
//! ];
//!
//! let density = Dbscan::uniform(0.1, 2, 2).unwrap().search(&points).unwrap();
//! assert_eq!(density.len(), 2);
//! assert!(density.noise().is_empty());
//!
//! let config = KMeansConfig { k: 2, ..Default::default() };
//! let result = KMeans::new(config).unwrap().fit(&points).unwrap();
//! assert_eq!(result.clusters().len(), 2);
//! ```

mod dbscan;
mod kmeans;
pub mod stats;

pub use dbscan::{Dbscan, DbscanConfig, DensityClusters};
pub use kmeans::{KMeans, KMeansConfig, KMeansResult};
pub use stats::{ClusterSummary, Errors, RunSummary};

use crate::error::Result;
use crate::point::PointVector;

/// Points assigned together, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    points: Vec<PointVector>,
}

impl Cluster {
    pub fn new(points: Vec<PointVector>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PointVector] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointVector> {
        self.points.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.points.iter().map(|p| p.label())
    }

    pub fn into_points(self) -> Vec<PointVector> {
        self.points
    }

    pub(crate) fn push(&mut self, point: PointVector) {
        self.points.push(point);
    }

    pub fn mean(&self) -> Result<Vec<f64>> {
        stats::mean(&self.points)
    }

    pub fn median(&self) -> Result<Vec<f64>> {
        stats::median(&self.points)
    }

    pub fn stddev(&self, mean: &[f64]) -> Result<Vec<f64>> {
        stats::stddev(&self.points, mean)
    }

    pub fn errors(&self, mean: &[f64]) -> Result<Errors> {
        stats::errors(&self.points, mean)
    }

    /// Within-cluster sum of squares; 0 for an empty cluster.
    pub fn wss(&self) -> Result<f64> {
        if self.is_empty() {
            return Ok(0.0);
        }
        let mean = self.mean()?;
        Ok(self.errors(&mean)?.sum())
    }
}

impl<'a> IntoIterator for &'a Cluster {
    type Item = &'a PointVector;
    type IntoIter = std::slice::Iter<'a, PointVector>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Clusters ordered by descending size; ties keep their original order.
pub(crate) fn by_size(clusters: &[Cluster]) -> Vec<&Cluster> {
    let mut sorted: Vec<&Cluster> = clusters.iter().collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(sizes: &[usize]) -> Vec<Cluster> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                Cluster::new(
                    (0..n)
                        .map(|j| PointVector::new(format!("{i}-{j}"), vec![i as f64]))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn by_size_is_stable_and_descending() {
        let clusters = cluster(&[1, 3, 2, 3]);
        let sizes: Vec<_> = by_size(&clusters)
            .iter()
            .map(|c| (c.len(), c.labels().next().unwrap().to_string()))
            .collect();
        assert_eq!(
            sizes,
            vec![
                (3, "1-0".to_string()),
                (3, "3-0".to_string()),
                (2, "2-0".to_string()),
                (1, "0-0".to_string()),
            ]
        );
    }

    #[test]
    fn empty_cluster_has_zero_wss() {
        assert_eq!(Cluster::default().wss().unwrap(), 0.0);
    }
}
