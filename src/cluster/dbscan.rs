//! DBSCAN with per-dimension box neighborhoods.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::Cluster;
use crate::error::{ProfileError, Result};
use crate::point::{common_dim, PointVector};

/// Scalar DBSCAN parameters, as an outer layer would supply them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbscanConfig {
    /// Tolerance applied to every dimension.
    pub eps: f64,
    /// Neighbors (the point itself included) needed for a core point.
    pub min_points: usize,
}

impl Default for DbscanConfig {
    fn default() -> Self {
        Self {
            eps: 0.1,
            min_points: 2,
        }
    }
}

impl DbscanConfig {
    pub fn validate(&self) -> Result<()> {
        check_eps(self.eps)?;
        check_min_points(self.min_points)
    }

    /// Broadcast `eps` across `dim` dimensions.
    pub fn eps_vector(&self, dim: usize) -> Vec<f64> {
        vec![self.eps; dim]
    }
}

/// Result of a density search: noise plus clusters in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DensityClusters {
    noise: Cluster,
    clusters: Vec<Cluster>,
}

impl DensityClusters {
    /// Points no core point reaches.
    pub fn noise(&self) -> &Cluster {
        &self.noise
    }

    /// Discovered clusters, in the order their first core point was found.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of discovered clusters (noise not counted).
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Points assigned to some cluster.
    pub fn assigned_count(&self) -> usize {
        self.clusters.iter().map(Cluster::len).sum()
    }

    pub fn total_points(&self) -> usize {
        self.assigned_count() + self.noise.len()
    }

    /// Fraction of all points left as noise.
    pub fn noise_ratio(&self) -> f64 {
        match self.total_points() {
            0 => 0.0,
            n => self.noise.len() as f64 / n as f64,
        }
    }

    /// Clusters by descending size.
    pub fn by_size(&self) -> Vec<&Cluster> {
        super::by_size(&self.clusters)
    }

    /// Positional view: noise at index 0, clusters from index 1.
    pub fn into_indexed(self) -> Vec<Cluster> {
        let mut out = Vec::with_capacity(self.clusters.len() + 1);
        out.push(self.noise);
        out.extend(self.clusters);
        out
    }
}

fn check_eps(eps: f64) -> Result<()> {
    if !eps.is_finite() || eps < 0.0 {
        return Err(ProfileError::InvalidParameter(format!(
            "eps must be finite and non-negative, got {eps}"
        )));
    }
    Ok(())
}

fn check_min_points(min_points: usize) -> Result<()> {
    if min_points == 0 {
        return Err(ProfileError::InvalidParameter(
            "min_points must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Unvisited,
    Noise,
    Cluster(usize),
}

/// Give every unclaimed point of `reach` to `cluster`, queueing the
/// unvisited ones for expansion.
fn claim(reach: &[usize], cluster: usize, labels: &mut [Label], queue: &mut VecDeque<usize>) {
    for &j in reach {
        match labels[j] {
            Label::Cluster(_) => {}
            // border point: joins, does not expand
            Label::Noise => labels[j] = Label::Cluster(cluster),
            Label::Unvisited => {
                labels[j] = Label::Cluster(cluster);
                queue.push_back(j);
            }
        }
    }
}

/// Density-based clustering over axis-aligned box neighborhoods.
#[derive(Debug, Clone)]
pub struct Dbscan {
    eps: Vec<f64>,
    min_points: usize,
}

impl Dbscan {
    /// Create with one tolerance per dimension.
    pub fn new(eps: Vec<f64>, min_points: usize) -> Result<Self> {
        for &e in &eps {
            check_eps(e)?;
        }
        check_min_points(min_points)?;
        Ok(Self { eps, min_points })
    }

    /// Same tolerance on each of `dim` dimensions.
    pub fn uniform(eps: f64, dim: usize, min_points: usize) -> Result<Self> {
        Self::new(vec![eps; dim], min_points)
    }

    pub fn from_config(config: &DbscanConfig, dim: usize) -> Result<Self> {
        config.validate()?;
        Self::new(config.eps_vector(dim), config.min_points)
    }

    pub fn eps(&self) -> &[f64] {
        &self.eps
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    #[inline]
    fn is_neighbor(&self, p: &[f64], q: &[f64]) -> bool {
        p.iter()
            .zip(q)
            .zip(&self.eps)
            .all(|((a, b), eps)| (a - b).abs() <= *eps)
    }

    /// Indices of every point inside the box around `points[idx]`, itself included.
    fn region(&self, points: &[PointVector], idx: usize) -> Vec<usize> {
        let p = points[idx].values();
        points
            .iter()
            .enumerate()
            .filter(|(_, q)| self.is_neighbor(p, q.values()))
            .map(|(j, _)| j)
            .collect()
    }

    /// Per-point labels; `None` is noise, `Some(c)` the `c`-th cluster.
    ///
    /// Points are visited in input order. A border point reachable from two
    /// clusters belongs to whichever reaches it first.
    pub fn fit_predict(&self, points: &[PointVector]) -> Result<Vec<Option<usize>>> {
        let dim = common_dim(points)?;
        if self.eps.len() != dim {
            return Err(ProfileError::DimensionMismatch {
                expected: dim,
                actual: self.eps.len(),
            });
        }

        let n = points.len();
        let mut labels = vec![Label::Unvisited; n];
        let mut next_cluster = 0;

        for i in 0..n {
            if labels[i] != Label::Unvisited {
                continue;
            }

            let neighbors = self.region(points, i);
            if neighbors.len() < self.min_points {
                labels[i] = Label::Noise;
                continue;
            }

            let cluster = next_cluster;
            next_cluster += 1;
            labels[i] = Label::Cluster(cluster);

            // every index enters the queue at most once
            let mut queue = VecDeque::new();
            claim(&neighbors, cluster, &mut labels, &mut queue);
            while let Some(j) = queue.pop_front() {
                let reach = self.region(points, j);
                if reach.len() >= self.min_points {
                    claim(&reach, cluster, &mut labels, &mut queue);
                }
            }
        }

        Ok(labels
            .into_iter()
            .map(|l| match l {
                Label::Cluster(c) => Some(c),
                _ => None,
            })
            .collect())
    }

    /// Cluster `points`, returning noise and the discovered clusters.
    pub fn search(&self, points: &[PointVector]) -> Result<DensityClusters> {
        let labels = self.fit_predict(points)?;
        let count = labels.iter().flatten().max().map_or(0, |c| c + 1);

        let mut out = DensityClusters {
            noise: Cluster::default(),
            clusters: vec![Cluster::default(); count],
        };
        for (point, label) in points.iter().zip(labels) {
            match label {
                Some(c) => out.clusters[c].push(point.clone()),
                None => out.noise.push(point.clone()),
            }
        }

        info!(
            points = points.len(),
            clusters = out.len(),
            noise = out.noise.len(),
            min_points = self.min_points,
            "dbscan finished"
        );

        Ok(out)
    }
}
