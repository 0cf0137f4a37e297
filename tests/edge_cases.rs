//! Edge case tests for hexprofile.
//!
//! Degenerate parameters and inputs must fail loudly, never produce NaN.

use hexprofile::cluster::{Cluster, Dbscan, KMeans, KMeansConfig, RunSummary};
use hexprofile::entropy::{ProfileConfig, ProfilePipeline};
use hexprofile::{PointVector, ProfileError};

fn line(n: usize) -> Vec<PointVector> {
    (0..n)
        .map(|i| PointVector::new(format!("p{i}"), vec![i as f64 / n as f64]))
        .collect()
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn empty_input_yields_no_profiles() {
    let pipeline = ProfilePipeline::new(ProfileConfig::default()).unwrap();
    let out = pipeline.run(Vec::<(String, String)>::new()).unwrap();
    assert!(out.is_empty());
    assert_eq!(out.stats.groups_seen, 0);
}

#[test]
fn ignoring_every_position_is_rejected() {
    let config = ProfileConfig {
        sequence_len: 8,
        ignore_leading: 4,
        ignore_trailing: 4,
        ..Default::default()
    };
    assert!(matches!(
        ProfilePipeline::new(config),
        Err(ProfileError::InvalidParameter(_))
    ));
}

#[test]
fn uppercase_and_lowercase_profiles_match() {
    let config = ProfileConfig {
        sequence_len: 4,
        min_observations: 1,
        ..Default::default()
    };
    let pipeline = ProfilePipeline::new(config).unwrap();
    let out = pipeline
        .run([
            ("lower", "abcd"),
            ("lower", "ef01"),
            ("upper", "ABCD"),
            ("upper", "EF01"),
        ])
        .unwrap();
    assert_eq!(out.profiles[0].point.values(), out.profiles[1].point.values());
    assert_eq!(out.profiles[0].counts, out.profiles[1].counts);
}

#[test]
fn tens_of_thousands_of_groups_share_the_pool() {
    let config = ProfileConfig {
        sequence_len: 8,
        min_observations: 1,
        ..Default::default()
    };
    let pipeline = ProfilePipeline::new(config).unwrap();
    let records = (0..25_000u32).map(|i| (format!("{i:08x}"), format!("{i:08x}")));
    let out = pipeline.run(records).unwrap();
    assert_eq!(out.len(), 25_000);
    assert_eq!(out.stats.groups_emitted, 25_000);
}

#[test]
fn many_groups_with_tiny_queues() {
    let config = ProfileConfig {
        sequence_len: 4,
        min_observations: 2,
        queue_capacity: 1,
        ..Default::default()
    };
    let pipeline = ProfilePipeline::new(config).unwrap();
    let records = (0..2000u32).map(|i| (format!("{:03}", i % 200), format!("{:04x}", i)));
    let out = pipeline.run(records).unwrap();
    assert_eq!(out.len(), 200);
    assert!(out.profiles.iter().all(|p| p.observations == 10));
    assert!(out
        .profiles
        .windows(2)
        .all(|w| w[0].group() < w[1].group()));
}

// =============================================================================
// Clustering parameters
// =============================================================================

#[test]
fn kmeans_with_k_equal_to_n_gives_singletons() {
    let points = line(5);
    let result = KMeans::new(KMeansConfig {
        k: 5,
        ..Default::default()
    })
    .unwrap()
    .fit(&points)
    .unwrap();
    assert!(result.clusters().iter().all(|c| c.len() == 1));
    assert_eq!(RunSummary::from_kmeans(&result).unwrap().sse, 0.0);
}

#[test]
fn kmeans_rejects_ragged_points() {
    let points = vec![
        PointVector::new("a", vec![0.0, 0.0]),
        PointVector::new("b", vec![1.0]),
    ];
    let km = KMeans::new(KMeansConfig {
        k: 1,
        ..Default::default()
    })
    .unwrap();
    assert!(matches!(
        km.fit(&points),
        Err(ProfileError::DimensionMismatch { .. })
    ));
}

#[test]
fn dbscan_zero_eps_groups_only_duplicates() {
    let mut points = line(4);
    points.push(PointVector::new("dup", vec![0.0]));
    let result = Dbscan::uniform(0.0, 1, 2).unwrap().search(&points).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.clusters()[0].labels().collect::<Vec<_>>(), ["p0", "dup"]);
    assert_eq!(result.noise().len(), 3);
}

#[test]
fn summary_of_empty_cluster_is_not_nan() {
    let summary = RunSummary::from_clusters(&[Cluster::default()], 0).unwrap();
    let c = &summary.clusters[0];
    assert_eq!(c.size, 0);
    assert_eq!(c.share, 0.0);
    assert!(c.mean.is_none() && c.median.is_none() && c.stddev.is_none());
    assert_eq!(summary.sse, 0.0);
}
