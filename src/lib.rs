//! hexprofile: positional entropy profiles and clustering.
//!
//! Computes, for groups of fixed-length hex-digit sequences, how random each
//! digit position is, then clusters the resulting profile vectors so that
//! groups with a similar internal structure end up together. The motivating
//! use is IPv6: group addresses by prefix, and networks that allocate the
//! bits below their prefixes the same way land in the same cluster.
//!
//! - `entropy/`: per-group digit counting and the concurrent pipeline
//! - `distance`: Euclidean and Maxdiff metrics
//! - `cluster/`: DBSCAN, k-means and cluster statistics
//!
//! # Pipeline
//!
//! ```text
//! (group key, hex digits) ──► ProfilePipeline ──► PointVector per group (≥ m observations)
//!                                                     │
//!                                     Dbscan / KMeans ◄┘
//!                                            │
//!                                            ▼
//!                                  clusters ──► stats (mean, median, stddev, WSS)
//! ```
//!
//! # Example
//!
//! ```rust
//! use hexprofile::cluster::{Dbscan, RunSummary};
//! use hexprofile::entropy::{ProfileConfig, ProfilePipeline};
//!
//! let config = ProfileConfig {
//!     sequence_len: 8,
//!     min_observations: 16,
//!     ..Default::default()
//! };
//! let pipeline = ProfilePipeline::new(config)?;
//!
//! // two networks numbering hosts sequentially in the last digit,
//! // one filling the last two digits with random-looking values
//! let mut records = Vec::new();
//! for i in 0..16u32 {
//!     records.push(("aaaa".to_string(), format!("aaaa000{i:x}")));
//!     records.push(("bbbb".to_string(), format!("bbbb000{i:x}")));
//!     records.push(("cccc".to_string(), format!("cccc00{:02x}", i * 37 % 256)));
//! }
//! let profiles = pipeline.run(records)?;
//! let points = profiles.into_points();
//!
//! let clusters = Dbscan::uniform(0.05, 8, 2)?.search(&points)?;
//! assert_eq!(clusters.len(), 1);
//! assert_eq!(clusters.noise().labels().collect::<Vec<_>>(), ["cccc"]);
//!
//! let summary = RunSummary::from_density(&clusters)?;
//! assert_eq!(summary.in_clusters(), 2);
//! # Ok::<(), hexprofile::ProfileError>(())
//! ```

pub mod cluster;
pub mod distance;
pub mod entropy;
pub mod error;
pub mod point;

// Re-exports
pub use cluster::{Cluster, Dbscan, DensityClusters, KMeans, KMeansConfig, KMeansResult};
pub use distance::DistanceMetric;
pub use entropy::{EntropyAccumulator, ProfileConfig, ProfilePipeline};
pub use error::{ProfileError, Result};
pub use point::PointVector;
