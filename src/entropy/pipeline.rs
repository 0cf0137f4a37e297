//! Concurrent per-group profile extraction.
//!
//! A fixed pool of worker threads, each draining its own bounded queue.
//! Every group key is routed to exactly one worker by hashing the key, and
//! that worker owns the group's [`FrequencyTable`](super::FrequencyTable)
//! outright, so nothing is shared between groups and no locks are taken.
//! The calling thread is the only producer and blocks when the target
//! queue is full. The pool size does not grow with the number of groups.
//!
//! ```text
//!  (key, digits) ──► producer ──┬──► [queue 0] ──► worker 0 {g1, g4, ..} ──┐
//!                   hash(key)   ├──► [queue 1] ──► worker 1 {g2, ..}     ──┼──► sort by key ──► Profiles
//!                               └──► [queue N] ──► worker N {g3, ..}     ──┘
//! ```
//!
//! Once input ends every queue is closed, then workers are joined and
//! their groups merged in lexicographic key order. That order is what
//! makes the output (and the choice of reported error under
//! [`SymbolPolicy::Abort`]) deterministic; worker scheduling and routing
//! have no effect on any value.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::accumulator::{EntropyAccumulator, GroupProfile, Window};
use crate::error::{ProfileError, Result};
use crate::point::PointVector;

/// What to do with a record holding a non-hex symbol or the wrong length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolPolicy {
    /// Fail the run.
    #[default]
    Abort,
    /// Drop the whole record.
    SkipRecord,
    /// Drop only the offending positions; the record still counts.
    ///
    /// Records of the wrong length are dropped whole.
    SkipSymbol,
}

/// Configuration for profile extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Digits per input sequence.
    pub sequence_len: usize,
    /// Leading digits left out of the profile.
    pub ignore_leading: usize,
    /// Trailing digits left out of the profile.
    pub ignore_trailing: usize,
    /// Groups with fewer observations produce no profile.
    pub min_observations: u64,
    /// Capacity of each worker's input queue.
    pub queue_capacity: usize,
    /// Worker threads; 0 uses the available parallelism.
    pub workers: usize,
    pub symbol_policy: SymbolPolicy,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            sequence_len: 32,
            ignore_leading: 0,
            ignore_trailing: 0,
            min_observations: 100,
            queue_capacity: 1000,
            workers: 0,
            symbol_policy: SymbolPolicy::Abort,
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ProfileError::InvalidParameter(
                "queue_capacity must be greater than 0".to_string(),
            ));
        }
        self.window().map(|_| ())
    }

    pub fn window(&self) -> Result<Window> {
        Window::new(self.sequence_len, self.ignore_leading, self.ignore_trailing)
    }

    /// Profile dimensionality.
    pub fn dim(&self) -> Result<usize> {
        self.window().map(|w| w.dim())
    }

    /// Number of worker threads a run starts.
    pub fn pool_size(&self) -> usize {
        match self.workers {
            0 => thread::available_parallelism().map_or(1, NonZeroUsize::get),
            n => n,
        }
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub records_read: u64,
    pub groups_seen: usize,
    pub groups_emitted: usize,
    /// Groups below `min_observations`.
    pub groups_dropped: usize,
    pub records_skipped: u64,
    pub positions_skipped: u64,
}

/// Output of a run: qualifying profiles in group key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profiles {
    pub profiles: Vec<GroupProfile>,
    pub stats: PipelineStats,
}

impl Profiles {
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = &PointVector> {
        self.profiles.iter().map(|p| &p.point)
    }

    /// Drop counts and keep only the vectors.
    pub fn into_points(self) -> Vec<PointVector> {
        self.profiles.into_iter().map(|p| p.point).collect()
    }
}

/// Group key of a sequence: its first `len` digits.
///
/// Returns `None` if the sequence is shorter than that.
pub fn prefix_key(sequence: &str, len: usize) -> Option<&str> {
    if len == 0 {
        return Some("");
    }
    let end = sequence
        .char_indices()
        .nth(len - 1)
        .map(|(i, c)| i + c.len_utf8())?;
    Some(&sequence[..end])
}

/// Worker index a group key is routed to.
fn route(key: &str, pool: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % pool as u64) as usize
}

/// What a worker hands back for one group when its queue closes.
#[derive(Debug, Default)]
struct GroupOutput {
    profile: Option<GroupProfile>,
    observations: u64,
    records_skipped: u64,
    positions_skipped: u64,
}

type GroupResult = (String, Result<GroupOutput>);

/// One group as seen by its worker.
struct GroupState {
    acc: EntropyAccumulator,
    out: GroupOutput,
    /// First error under [`SymbolPolicy::Abort`]; later records are ignored.
    failed: Option<ProfileError>,
}

impl GroupState {
    fn accept(&mut self, sequence: &str, policy: SymbolPolicy) {
        if self.failed.is_some() {
            return;
        }
        let outcome = match policy {
            SymbolPolicy::SkipSymbol => self.acc.accept_lenient(sequence).map(|n| n as u64),
            _ => self.acc.accept(sequence).map(|()| 0),
        };
        match outcome {
            Ok(dropped) => {
                if dropped > 0 {
                    warn!(group = self.acc.group(), dropped, "dropped non-hex symbols");
                }
                self.out.positions_skipped += dropped;
            }
            Err(err) if policy == SymbolPolicy::Abort => self.failed = Some(err),
            Err(err) => {
                warn!(group = self.acc.group(), error = %err, "skipping record");
                self.out.records_skipped += 1;
            }
        }
    }

    fn finish(self, min_observations: u64) -> Result<GroupOutput> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        let mut out = self.out;
        out.observations = self.acc.observations();
        out.profile = self.acc.finalize(min_observations);
        Ok(out)
    }
}

/// Drain one worker's queue, keeping an accumulator per group it owns.
fn drain(
    queue: Receiver<(String, String)>,
    window: Window,
    policy: SymbolPolicy,
    min_observations: u64,
) -> Vec<GroupResult> {
    let mut groups: HashMap<String, GroupState> = HashMap::new();

    for (group, sequence) in queue {
        groups
            .entry(group)
            .or_insert_with_key(|group| GroupState {
                acc: EntropyAccumulator::new(group.as_str(), window),
                out: GroupOutput::default(),
                failed: None,
            })
            .accept(&sequence, policy);
    }

    groups
        .into_iter()
        .map(|(group, state)| (group, state.finish(min_observations)))
        .collect()
}

/// Results of a joined worker; a panicked worker fails every group routed to it.
fn settle(joined: thread::Result<Vec<GroupResult>>, routed: Vec<String>) -> Vec<GroupResult> {
    match joined {
        Ok(results) => results,
        Err(_) => routed
            .into_iter()
            .map(|group| {
                let err = ProfileError::WorkerFailed {
                    group: group.clone(),
                };
                (group, Err(err))
            })
            .collect(),
    }
}

struct Worker<'scope> {
    queue: Sender<(String, String)>,
    handle: ScopedJoinHandle<'scope, Vec<GroupResult>>,
    /// Worker stopped early; further records are discarded.
    closed: bool,
}

/// Computes entropy profiles for grouped hex-digit sequences.
///
/// # Example
///
/// ```rust
/// use hexprofile::entropy::{ProfileConfig, ProfilePipeline};
///
/// let config = ProfileConfig {
///     sequence_len: 4,
///     min_observations: 2,
///     ..Default::default()
/// };
/// let pipeline = ProfilePipeline::new(config).unwrap();
/// let out = pipeline
///     .run([("a", "0000"), ("a", "000f"), ("b", "1234")])
///     .unwrap();
///
/// // "b" has a single observation and is dropped
/// assert_eq!(out.len(), 1);
/// assert_eq!(out.profiles[0].group(), "a");
/// assert_eq!(out.profiles[0].point.values()[..3], [0.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ProfilePipeline {
    config: ProfileConfig,
    window: Window,
}

impl ProfilePipeline {
    pub fn new(config: ProfileConfig) -> Result<Self> {
        config.validate()?;
        let window = config.window()?;
        Ok(Self { config, window })
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Profile dimensionality.
    pub fn dim(&self) -> usize {
        self.window.dim()
    }

    fn spawn<'scope>(&self, scope: &'scope Scope<'scope, '_>, id: usize) -> Result<Worker<'scope>> {
        let (queue, rx) = bounded(self.config.queue_capacity);
        let window = self.window;
        let policy = self.config.symbol_policy;
        let min_observations = self.config.min_observations;

        let handle = thread::Builder::new()
            .name(format!("hexprofile-{id}"))
            .spawn_scoped(scope, move || drain(rx, window, policy, min_observations))
            .map_err(|err| ProfileError::SpawnFailed {
                reason: err.to_string(),
            })?;
        debug!(worker = id, "started profile worker");

        Ok(Worker {
            queue,
            handle,
            closed: false,
        })
    }

    /// Profile every group found in `records`.
    ///
    /// Records are `(group key, sequence)` pairs. Output is ordered by
    /// group key; groups below `min_observations` are silently left out.
    pub fn run<I, K, S>(&self, records: I) -> Result<Profiles>
    where
        I: IntoIterator<Item = (K, S)>,
        K: AsRef<str>,
        S: Into<String>,
    {
        let mut stats = PipelineStats::default();
        let pool = self.config.pool_size();

        let mut joined = thread::scope(|scope| -> Result<Vec<GroupResult>> {
            // on early return the queues drop and the scope joins what started
            let mut workers = Vec::with_capacity(pool);
            for id in 0..pool {
                workers.push(self.spawn(scope, id)?);
            }
            let mut routes: HashMap<String, usize> = HashMap::new();

            for (key, sequence) in records {
                stats.records_read += 1;
                let key = key.as_ref();
                let id = *routes
                    .entry(key.to_owned())
                    .or_insert_with(|| route(key, pool));
                let worker = &mut workers[id];
                if worker.closed {
                    continue;
                }
                // blocks while the queue is full
                if worker.queue.send((key.to_owned(), sequence.into())).is_err() {
                    debug!(worker = id, "worker stopped early, discarding its input");
                    worker.closed = true;
                }
            }

            let mut routed = vec![Vec::new(); pool];
            for (group, id) in routes {
                routed[id].push(group);
            }

            // close every queue before waiting on any worker
            let handles: Vec<_> = workers
                .into_iter()
                .map(|worker| {
                    drop(worker.queue);
                    worker.handle
                })
                .collect();

            Ok(handles
                .into_iter()
                .zip(routed)
                .flat_map(|(handle, routed)| settle(handle.join(), routed))
                .collect())
        })?;
        joined.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        stats.groups_seen = joined.len();
        let mut profiles = Vec::new();
        for (group, result) in joined {
            let out = result?;
            stats.records_skipped += out.records_skipped;
            stats.positions_skipped += out.positions_skipped;
            match out.profile {
                Some(profile) => profiles.push(profile),
                None => {
                    debug!(
                        group = group.as_str(),
                        observations = out.observations,
                        min = self.config.min_observations,
                        "group below minimum size"
                    );
                    stats.groups_dropped += 1;
                }
            }
        }
        stats.groups_emitted = profiles.len();

        info!(
            records = stats.records_read,
            groups = stats.groups_seen,
            workers = pool,
            emitted = stats.groups_emitted,
            dropped = stats.groups_dropped,
            skipped = stats.records_skipped,
            "entropy profiles computed"
        );

        Ok(Profiles { profiles, stats })
    }

    /// Profile sequences grouped by their first `prefix_len` digits.
    ///
    /// The prefix is constant within a group, so it is also left out of
    /// the profile: the leading ignore count becomes at least `prefix_len`.
    pub fn run_by_prefix<I, S>(&self, sequences: I, prefix_len: usize) -> Result<Profiles>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = self.config.clone();
        config.ignore_leading = config.ignore_leading.max(prefix_len);
        let pipeline = Self::new(config)?;

        pipeline.run(sequences.into_iter().map(|s| {
            let s: String = s.into();
            let key = prefix_key(&s, prefix_len).unwrap_or(s.as_str()).to_owned();
            (key, s)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(len: usize, min: u64) -> ProfileConfig {
        ProfileConfig {
            sequence_len: len,
            min_observations: min,
            queue_capacity: 4,
            ..Default::default()
        }
    }

    #[test]
    fn prefix_key_takes_leading_digits() {
        assert_eq!(prefix_key("20010db8abcd", 8), Some("20010db8"));
        assert_eq!(prefix_key("2001", 8), None);
        assert_eq!(prefix_key("2001", 4), Some("2001"));
        assert_eq!(prefix_key("2001", 0), Some(""));
    }

    #[test]
    fn config_rejects_zero_capacity() {
        let cfg = ProfileConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(ProfilePipeline::new(cfg).is_err());
    }

    #[test]
    fn output_is_in_key_order() {
        let pipeline = ProfilePipeline::new(config(2, 1)).unwrap();
        let out = pipeline
            .run([("c", "00"), ("a", "01"), ("b", "02"), ("a", "03")])
            .unwrap();
        let groups: Vec<_> = out.profiles.iter().map(|p| p.group()).collect();
        assert_eq!(groups, ["a", "b", "c"]);
        assert_eq!(out.stats.records_read, 4);
        assert_eq!(out.stats.groups_seen, 3);
    }

    #[test]
    fn more_records_than_queue_capacity() {
        let pipeline = ProfilePipeline::new(config(2, 1)).unwrap();
        let records = (0..1000).map(|i| ("g", format!("{:02x}", i % 256)));
        let out = pipeline.run(records).unwrap();
        assert_eq!(out.profiles[0].observations, 1000);
    }

    #[test]
    fn more_groups_than_workers() {
        let mut cfg = config(4, 1);
        cfg.workers = 3;
        cfg.queue_capacity = 1;
        let pipeline = ProfilePipeline::new(cfg).unwrap();
        let out = pipeline
            .run((0..5000u32).map(|i| (format!("{i:05}"), format!("{:04x}", i))))
            .unwrap();
        assert_eq!(out.len(), 5000);
        assert_eq!(out.stats.groups_seen, 5000);
        assert!(out.profiles.windows(2).all(|w| w[0].group() < w[1].group()));
    }

    #[test]
    fn routing_is_stable_and_in_range() {
        for key in ["", "20010db8", "ffff"] {
            assert_eq!(route(key, 7), route(key, 7));
            assert!(route(key, 7) < 7);
            assert_eq!(route(key, 1), 0);
        }
    }

    #[test]
    fn pool_size_defaults_to_available_parallelism() {
        assert!(ProfileConfig::default().pool_size() >= 1);
        let cfg = ProfileConfig {
            workers: 5,
            ..Default::default()
        };
        assert_eq!(cfg.pool_size(), 5);
    }

    #[test]
    fn panicked_worker_fails_every_group_routed_to_it() {
        let joined = thread::spawn(|| -> Vec<GroupResult> { panic!("worker died") }).join();
        let results = settle(joined, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(results.len(), 2);
        for (group, result) in &results {
            assert_eq!(
                result.as_ref().unwrap_err(),
                &ProfileError::WorkerFailed {
                    group: group.clone()
                }
            );
        }
    }

    #[test]
    fn finished_worker_results_pass_through() {
        let joined = thread::spawn(|| -> Vec<GroupResult> {
            vec![("a".to_string(), Ok(GroupOutput::default()))]
        })
        .join();
        let results = settle(joined, vec!["a".to_string()]);
        assert!(matches!(results.as_slice(), [(g, Ok(_))] if g == "a"));
    }

    #[test]
    fn failed_group_does_not_stop_its_worker() {
        let mut cfg = config(2, 1);
        cfg.workers = 1;
        let pipeline = ProfilePipeline::new(cfg).unwrap();
        let err = pipeline
            .run([("b", "zz"), ("a", "00"), ("a", "0g")])
            .unwrap_err();
        // both groups share the one worker; "a" sorts first
        assert!(matches!(err, ProfileError::InvalidSymbol { ref group, .. } if group == "a"));
    }

    #[test]
    fn small_groups_are_dropped_silently() {
        let pipeline = ProfilePipeline::new(config(2, 2)).unwrap();
        let out = pipeline
            .run([("big", "00"), ("big", "11"), ("small", "22")])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.stats.groups_dropped, 1);
        assert_eq!(out.stats.groups_emitted, 1);
    }

    #[test]
    fn abort_policy_surfaces_invalid_symbol() {
        let pipeline = ProfilePipeline::new(config(2, 1)).unwrap();
        let err = pipeline
            .run([("a", "00"), ("b", "0x"), ("b", "00")])
            .unwrap_err();
        assert_eq!(
            err,
            ProfileError::InvalidSymbol {
                group: "b".to_string(),
                position: 1,
                symbol: 'x'
            }
        );
    }

    #[test]
    fn abort_reports_first_failing_group_in_key_order() {
        let pipeline = ProfilePipeline::new(config(2, 1)).unwrap();
        let err = pipeline.run([("z", "zz"), ("m", "m0")]).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidSymbol { ref group, .. } if group == "m"));
    }

    #[test]
    fn skip_record_policy_counts_skips() {
        let mut cfg = config(2, 1);
        cfg.symbol_policy = SymbolPolicy::SkipRecord;
        let pipeline = ProfilePipeline::new(cfg).unwrap();
        let out = pipeline
            .run([("a", "00"), ("a", "0x"), ("a", "000")])
            .unwrap();
        assert_eq!(out.profiles[0].observations, 1);
        assert_eq!(out.stats.records_skipped, 2);
    }

    #[test]
    fn skip_symbol_policy_keeps_the_record() {
        let mut cfg = config(2, 1);
        cfg.symbol_policy = SymbolPolicy::SkipSymbol;
        let pipeline = ProfilePipeline::new(cfg).unwrap();
        let out = pipeline.run([("a", "00"), ("a", "0x")]).unwrap();
        assert_eq!(out.profiles[0].observations, 2);
        assert_eq!(out.stats.positions_skipped, 1);
        assert_eq!(out.stats.records_skipped, 0);
    }

    #[test]
    fn run_by_prefix_groups_and_strips_prefix() {
        let pipeline = ProfilePipeline::new(config(6, 1)).unwrap();
        let out = pipeline
            .run_by_prefix(["ab0000", "ab00ff", "cd1234"], 2)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.profiles[0].group(), "ab");
        assert_eq!(out.profiles[0].point.dim(), 4);
        assert_eq!(out.profiles[0].point.values()[..2], [0.0, 0.0]);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = ProfileConfig {
            ignore_leading: 8,
            symbol_policy: SymbolPolicy::SkipSymbol,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"skip_symbol\""));
        let parsed: ProfileConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cfg);

        let partial: ProfileConfig = serde_json::from_str(r#"{"min_observations": 5}"#).unwrap();
        assert_eq!(partial.min_observations, 5);
        assert_eq!(partial.sequence_len, 32);
    }
}
