//! Per-position hex digit counts.

use serde::{Deserialize, Serialize};

/// Number of distinct symbols (hex digits).
pub const SYMBOLS: usize = 16;

/// `log2(SYMBOLS)`, the entropy of a uniform 16-way distribution.
pub const MAX_ENTROPY: f64 = 4.0;

/// Map a hex digit to its value; upper and lower case merge.
#[inline]
#[must_use]
pub fn hex_value(c: char) -> Option<usize> {
    c.to_digit(16).map(|v| v as usize)
}

/// Counts of each hex digit value at each profiled position.
///
/// Sized `[positions][16]` up front and owned by exactly one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTable {
    counts: Vec<[u64; SYMBOLS]>,
}

impl FrequencyTable {
    #[must_use]
    pub fn new(positions: usize) -> Self {
        Self {
            counts: vec![[0; SYMBOLS]; positions],
        }
    }

    /// Number of profiled positions.
    #[inline]
    pub fn positions(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub(crate) fn record(&mut self, position: usize, value: usize) {
        self.counts[position][value] += 1;
    }

    /// Counts for one position, indexed by digit value.
    pub fn counts(&self, position: usize) -> Option<&[u64; SYMBOLS]> {
        self.counts.get(position)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u64; SYMBOLS]> {
        self.counts.iter()
    }

    /// Normalized Shannon entropy of one position, in `[0, 1]`.
    ///
    /// `total` is the number of observations of the group, so positions
    /// that lost counts to skipped symbols are measured against the same
    /// denominator as the rest.
    #[must_use]
    pub fn normalized_entropy(&self, position: usize, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let Some(row) = self.counts.get(position) else {
            return 0.0;
        };

        let total = total as f64;
        let entropy: f64 = row
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum();

        (entropy / MAX_ENTROPY).clamp(0.0, 1.0)
    }

    /// Normalized entropy for every position.
    #[must_use]
    pub fn profile(&self, total: u64) -> Vec<f64> {
        (0..self.positions())
            .map(|i| self.normalized_entropy(i, total))
            .collect()
    }
}
