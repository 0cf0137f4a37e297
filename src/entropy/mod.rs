//! Positional entropy profiles.
//!
//! For every group of fixed-length hex-digit sequences, each position gets
//! the Shannon entropy of its digit distribution, normalized by
//! `log2(16) = 4` bits:
//!
//! ```text
//! H_i = -Σ_v p_v · log2(p_v)      p_v = count_v / observations
//! profile_i = H_i / 4             ∈ [0, 1]
//! ```
//!
//! A position that always holds the same digit scores 0; one where all 16
//! digits are equally likely scores 1. Applied to IPv6 addresses grouped by
//! prefix, the resulting vectors describe how each network allocates the
//! bits below its prefix.
//!
//! - [`EntropyAccumulator`]: counts for one group, single-threaded.
//! - [`ProfilePipeline`]: fans records out to a fixed pool of workers,
//!   each owning the groups routed to it.

mod accumulator;
mod pipeline;
mod table;

pub use accumulator::{EntropyAccumulator, GroupProfile, Window};
pub use pipeline::{
    prefix_key, PipelineStats, ProfileConfig, ProfilePipeline, Profiles, SymbolPolicy,
};
pub use table::{hex_value, FrequencyTable, MAX_ENTROPY, SYMBOLS};
