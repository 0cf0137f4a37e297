//! Single-group entropy accumulation.

use serde::{Deserialize, Serialize};

use super::table::{hex_value, FrequencyTable};
use crate::error::{ProfileError, Result};
use crate::point::PointVector;

/// Which positions of a fixed-length sequence are profiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Total digits per sequence.
    pub sequence_len: usize,
    /// First profiled position.
    pub start: usize,
    /// One past the last profiled position.
    pub end: usize,
}

impl Window {
    pub fn new(sequence_len: usize, ignore_leading: usize, ignore_trailing: usize) -> Result<Self> {
        let ignored = ignore_leading.checked_add(ignore_trailing);
        if ignored.map_or(true, |n| n >= sequence_len) {
            return Err(ProfileError::InvalidParameter(format!(
                "ignoring {ignore_leading} leading and {ignore_trailing} trailing digits \
                 leaves nothing of a {sequence_len}-digit sequence"
            )));
        }
        Ok(Self {
            sequence_len,
            start: ignore_leading,
            end: sequence_len - ignore_trailing,
        })
    }

    /// Profile dimensionality.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.end - self.start
    }
}

/// Profiled `(position, symbol)` pairs of a sequence, positions absolute.
fn profiled(window: Window, sequence: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    sequence
        .chars()
        .enumerate()
        .skip(window.start)
        .take(window.dim())
}

/// A finalized group: its entropy profile plus the raw material behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProfile {
    pub point: PointVector,
    pub observations: u64,
    pub counts: FrequencyTable,
}

impl GroupProfile {
    #[inline]
    pub fn group(&self) -> &str {
        self.point.label()
    }
}

/// Accumulates digit frequencies for one group key.
///
/// Entropy only depends on the final counts, so the order in which
/// sequences arrive does not affect the result.
#[derive(Debug, Clone)]
pub struct EntropyAccumulator {
    group: String,
    window: Window,
    table: FrequencyTable,
    observations: u64,
}

impl EntropyAccumulator {
    pub fn new(group: impl Into<String>, window: Window) -> Self {
        Self {
            group: group.into(),
            window,
            table: FrequencyTable::new(window.dim()),
            observations: 0,
        }
    }

    #[inline]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[inline]
    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }

    fn check_len(&self, sequence: &str) -> Result<()> {
        let actual = sequence.chars().count();
        if actual != self.window.sequence_len {
            return Err(ProfileError::InvalidSequence {
                group: self.group.clone(),
                expected: self.window.sequence_len,
                actual,
            });
        }
        Ok(())
    }

    /// Count one sequence.
    ///
    /// The whole record is validated before anything is counted, so a
    /// rejected record leaves the table untouched.
    pub fn accept(&mut self, sequence: &str) -> Result<()> {
        self.check_len(sequence)?;

        if let Some((position, symbol)) =
            profiled(self.window, sequence).find(|&(_, c)| hex_value(c).is_none())
        {
            return Err(ProfileError::InvalidSymbol {
                group: self.group.clone(),
                position,
                symbol,
            });
        }

        let start = self.window.start;
        for (i, c) in profiled(self.window, sequence) {
            if let Some(v) = hex_value(c) {
                self.table.record(i - start, v);
            }
        }
        self.observations += 1;
        Ok(())
    }

    /// Count one sequence, dropping positions that hold non-hex symbols.
    ///
    /// The record still counts as an observation. Returns how many
    /// positions were dropped.
    pub fn accept_lenient(&mut self, sequence: &str) -> Result<usize> {
        self.check_len(sequence)?;

        let start = self.window.start;
        let mut dropped = 0;
        for (i, c) in profiled(self.window, sequence) {
            match hex_value(c) {
                Some(v) => self.table.record(i - start, v),
                None => dropped += 1,
            }
        }
        self.observations += 1;
        Ok(dropped)
    }

    /// Normalized entropy per position, regardless of group size.
    pub fn entropy(&self) -> Vec<f64> {
        self.table.profile(self.observations)
    }

    /// Consume the counts and emit a profile if the group saw at least
    /// `min_observations` sequences.
    pub fn finalize(self, min_observations: u64) -> Option<GroupProfile> {
        if self.observations < min_observations {
            return None;
        }
        let values = self.entropy();
        Some(GroupProfile {
            point: PointVector::new(self.group, values),
            observations: self.observations,
            counts: self.table,
        })
    }
}
