//! k-means clustering of profile vectors.
//!
//! Seeding is deterministic: the first `k` pairwise-distinct points in
//! input order become the initial centroids. When the input has fewer than
//! `k` distinct points the remaining seeds are the earliest points not yet
//! used, so every `1 <= k <= n` is accepted.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Cluster;
use crate::distance::DistanceMetric;
use crate::error::{ProfileError, Result};
use crate::point::{common_dim, PointVector};

/// k-means parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of clusters.
    pub k: usize,
    /// Upper bound on assign/update rounds.
    pub max_iterations: usize,
    /// Stop once total centroid movement in a round falls below this.
    pub min_change: f64,
    pub metric: DistanceMetric,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 10,
            max_iterations: 50,
            min_change: 0.01,
            metric: DistanceMetric::Euclidean,
        }
    }
}

impl KMeansConfig {
    /// Check the stopping rule. `k` is checked against the input in
    /// [`KMeans::fit`].
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ProfileError::InvalidParameter(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        if !self.min_change.is_finite() || self.min_change < 0.0 {
            return Err(ProfileError::InvalidParameter(format!(
                "min_change must be finite and non-negative, got {}",
                self.min_change
            )));
        }
        Ok(())
    }
}

/// Outcome of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    clusters: Vec<Cluster>,
    centroids: Vec<Vec<f64>>,
    assignments: Vec<usize>,
    iterations: usize,
    converged: bool,
}

impl KMeansResult {
    /// Exactly `k` clusters; some may be empty.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn into_clusters(self) -> Vec<Cluster> {
        self.clusters
    }

    /// Final centroid of each cluster.
    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Cluster index of each input point.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// Completed assign/update rounds.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether centroid movement dropped below `min_change`.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Clusters by descending size.
    pub fn by_size(&self) -> Vec<&Cluster> {
        super::by_size(&self.clusters)
    }
}

/// k-means clustering.
#[derive(Debug, Clone)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Initial centroids, see the module docs.
    fn seed(&self, points: &[PointVector]) -> Vec<Vec<f64>> {
        let k = self.config.k;
        let mut used = vec![false; points.len()];
        let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);

        for (i, p) in points.iter().enumerate() {
            if centroids.len() == k {
                break;
            }
            if centroids.iter().all(|c| c.as_slice() != p.values()) {
                centroids.push(p.values().to_vec());
                used[i] = true;
            }
        }

        let mut spare = used.iter().enumerate().filter(|&(_, &u)| !u).map(|(i, _)| i);
        while centroids.len() < k {
            match spare.next() {
                Some(i) => centroids.push(points[i].values().to_vec()),
                None => break,
            }
        }

        centroids
    }

    /// Nearest centroid; ties go to the lowest index.
    #[inline]
    fn nearest(&self, point: &[f64], centroids: &[Vec<f64>]) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (idx, centroid) in centroids.iter().enumerate() {
            let dist = self.config.metric.distance_unchecked(point, centroid);
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
        }
        best
    }

    /// Assign every point to its nearest centroid.
    #[cfg(not(feature = "parallel"))]
    fn assign(&self, points: &[PointVector], centroids: &[Vec<f64>], out: &mut [usize]) {
        for (slot, p) in out.iter_mut().zip(points) {
            *slot = self.nearest(p.values(), centroids);
        }
    }

    #[cfg(feature = "parallel")]
    fn assign(&self, points: &[PointVector], centroids: &[Vec<f64>], out: &mut [usize]) {
        out.par_iter_mut()
            .zip(points.par_iter())
            .for_each(|(slot, p)| *slot = self.nearest(p.values(), centroids));
    }

    /// Coordinate-wise means of each cluster; an empty cluster keeps its
    /// previous centroid.
    fn update(
        &self,
        points: &[PointVector],
        assignments: &[usize],
        previous: &[Vec<f64>],
        dim: usize,
    ) -> Vec<Vec<f64>> {
        let k = previous.len();
        let mut sums = vec![vec![0.0f64; dim]; k];
        let mut counts = vec![0usize; k];

        for (p, &c) in points.iter().zip(assignments) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(p.values()) {
                *s += v;
            }
        }

        sums.into_iter()
            .zip(counts)
            .zip(previous)
            .map(|((sum, count), old)| {
                if count == 0 {
                    old.clone()
                } else {
                    sum.into_iter().map(|s| s / count as f64).collect()
                }
            })
            .collect()
    }

    /// Partition `points` into `k` clusters.
    pub fn fit(&self, points: &[PointVector]) -> Result<KMeansResult> {
        if points.is_empty() {
            return Err(ProfileError::EmptyInput);
        }
        let k = self.config.k;
        if k == 0 || k > points.len() {
            return Err(ProfileError::InvalidK {
                k,
                points: points.len(),
            });
        }
        let dim = common_dim(points)?;

        let mut centroids = self.seed(points);
        let mut assignments = vec![0usize; points.len()];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.config.max_iterations {
            self.assign(points, &centroids, &mut assignments);
            let updated = self.update(points, &assignments, &centroids, dim);

            let displacement: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| self.config.metric.distance_unchecked(old, new))
                .sum();

            centroids = updated;
            iterations += 1;
            debug!(iteration = iterations, displacement, "k-means round");

            if displacement < self.config.min_change {
                converged = true;
                break;
            }
        }

        let mut clusters = vec![Cluster::default(); k];
        for (p, &c) in points.iter().zip(&assignments) {
            clusters[c].push(p.clone());
        }

        info!(
            points = points.len(),
            k,
            iterations,
            converged,
            metric = ?self.config.metric,
            "k-means finished"
        );

        Ok(KMeansResult {
            clusters,
            centroids,
            assignments,
            iterations,
            converged,
        })
    }
}
