//! Aggregate statistics over clusters.
//!
//! All functions are pure and recompute from the members they are given.
//! An empty point set has no mean, median or spread: those return
//! [`ProfileError::EmptyInput`] instead of a vector of NaNs.
//!
//! The median of an even number of values is the average of the two middle
//! values.

use serde::{Deserialize, Serialize};

use super::{Cluster, DensityClusters, KMeansResult};
use crate::distance::squared_euclidean;
use crate::error::{ProfileError, Result};
use crate::point::{common_dim, PointVector};

fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(ProfileError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Coordinate-wise arithmetic mean.
pub fn mean(points: &[PointVector]) -> Result<Vec<f64>> {
    let dim = common_dim(points)?;
    let mut sums = vec![0.0; dim];
    for p in points {
        for (s, v) in sums.iter_mut().zip(p.values()) {
            *s += v;
        }
    }
    let n = points.len() as f64;
    Ok(sums.into_iter().map(|s| s / n).collect())
}

/// Coordinate-wise median, each dimension on its own.
pub fn median(points: &[PointVector]) -> Result<Vec<f64>> {
    let dim = common_dim(points)?;
    let n = points.len();
    let mut column = Vec::with_capacity(n);

    Ok((0..dim)
        .map(|i| {
            column.clear();
            column.extend(points.iter().map(|p| p.values()[i]));
            column.sort_by(f64::total_cmp);
            let mid = n / 2;
            if n % 2 == 0 {
                (column[mid - 1] + column[mid]) / 2.0
            } else {
                column[mid]
            }
        })
        .collect())
}

/// Coordinate-wise population standard deviation around `mean`.
pub fn stddev(points: &[PointVector], mean: &[f64]) -> Result<Vec<f64>> {
    let dim = common_dim(points)?;
    check_len(dim, mean.len())?;

    let mut acc = vec![0.0; dim];
    for p in points {
        for ((a, v), m) in acc.iter_mut().zip(p.values()).zip(mean) {
            let d = v - m;
            *a += d * d;
        }
    }
    let n = points.len() as f64;
    Ok(acc.into_iter().map(|a| (a / n).sqrt()).collect())
}

/// Squared distance of each point to a reference vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Errors(Vec<f64>);

impl Errors {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-point squared Euclidean distance to `mean`.
///
/// `errors(points, &mean(points)?)?.sum()` is the within-cluster sum of
/// squares. An empty set has no errors.
pub fn errors(points: &[PointVector], mean: &[f64]) -> Result<Errors> {
    let mut out = Vec::with_capacity(points.len());
    for p in points {
        check_len(mean.len(), p.dim())?;
        out.push(squared_euclidean(p.values(), mean));
    }
    Ok(Errors(out))
}

/// Total SSE: the sum of every cluster's WSS.
pub fn total_sse(clusters: &[Cluster]) -> Result<f64> {
    clusters.iter().map(Cluster::wss).sum()
}

/// Statistics of one cluster, relative to a run of `total` points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub size: usize,
    /// `size / total`.
    pub share: f64,
    /// `None` for an empty cluster, likewise below.
    pub mean: Option<Vec<f64>>,
    pub median: Option<Vec<f64>>,
    pub stddev: Option<Vec<f64>>,
    pub wss: f64,
}

impl ClusterSummary {
    pub fn new(cluster: &Cluster, total: usize) -> Result<Self> {
        let share = if total == 0 {
            0.0
        } else {
            cluster.len() as f64 / total as f64
        };
        if cluster.is_empty() {
            return Ok(Self {
                size: 0,
                share,
                mean: None,
                median: None,
                stddev: None,
                wss: 0.0,
            });
        }

        let mean = cluster.mean()?;
        let stddev = cluster.stddev(&mean)?;
        let wss = cluster.errors(&mean)?.sum();
        Ok(Self {
            size: cluster.len(),
            share,
            median: Some(cluster.median()?),
            stddev: Some(stddev),
            mean: Some(mean),
            wss,
        })
    }
}

/// Summary of a whole clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Points that went into clustering.
    pub points: usize,
    /// One entry per cluster, in the order given.
    pub clusters: Vec<ClusterSummary>,
    /// Sum of WSS over `clusters`.
    pub sse: f64,
    /// Noise set of a density run; not part of `clusters` or `sse`.
    pub noise: Option<ClusterSummary>,
}

impl RunSummary {
    pub fn from_clusters(clusters: &[Cluster], points: usize) -> Result<Self> {
        let clusters = clusters
            .iter()
            .map(|c| ClusterSummary::new(c, points))
            .collect::<Result<Vec<_>>>()?;
        let sse = clusters.iter().map(|c| c.wss).sum();
        Ok(Self {
            points,
            clusters,
            sse,
            noise: None,
        })
    }

    pub fn from_density(result: &DensityClusters) -> Result<Self> {
        let points = result.total_points();
        let mut summary = Self::from_clusters(result.clusters(), points)?;
        summary.noise = Some(ClusterSummary::new(result.noise(), points)?);
        Ok(summary)
    }

    pub fn from_kmeans(result: &KMeansResult) -> Result<Self> {
        let points = result.assignments().len();
        Self::from_clusters(result.clusters(), points)
    }

    /// Points assigned to a cluster (noise excluded).
    pub fn in_clusters(&self) -> usize {
        self.clusters.iter().map(|c| c.size).sum()
    }

    pub fn noise_count(&self) -> usize {
        self.noise.as_ref().map_or(0, |n| n.size)
    }
}
