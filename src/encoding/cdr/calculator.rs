// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Worst-case key size calculator.
//!
//! Machines walk a [`MaxSizeFinder`] the same way they walk a buffer, but
//! instead of writing bytes they push the offset forward by the largest
//! amount any value could take. Keys align from offset 0, so the origin is
//! always 0 here.
//!
//! All arithmetic saturates: a finder whose offset reached `usize::MAX`
//! reports an unbounded size, which is how recursive key paths and absurdly
//! large bounds end up on the digest path.

use std::collections::HashMap;

use crate::core::Result;

/// Largest primitive alignment; padding repeats with this period.
const MAX_ALIGNMENT: usize = 8;

/// Upper-bound size accumulator.
///
/// # Example
///
/// ```
/// use cdrkey::encoding::cdr::calculator::MaxSizeFinder;
///
/// let mut finder = MaxSizeFinder::new();
/// finder.primitive(1); // 1
/// finder.primitive(4); // 3 padding + 4
/// finder.skip(6);
/// assert_eq!(finder.size(), 14);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaxSizeFinder {
    /// Current worst-case offset
    offset: usize,
}

impl MaxSizeFinder {
    /// Create a finder at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current upper bound.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.offset
    }

    /// Whether the bound overflowed into "unbounded".
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.offset == usize::MAX
    }

    /// Mark the size as unbounded.
    pub fn saturate(&mut self) {
        self.offset = usize::MAX;
    }

    /// Add padding up to the next multiple of `byte_count`.
    pub fn align(&mut self, byte_count: usize) {
        if byte_count <= 1 || self.is_unbounded() {
            return;
        }
        let alignment = self.offset % byte_count;
        if alignment > 0 {
            self.skip(byte_count - alignment);
        }
    }

    /// Advance by `byte_count` without alignment.
    pub fn skip(&mut self, byte_count: usize) {
        self.offset = self.offset.saturating_add(byte_count);
    }

    /// Align then advance by a primitive of `byte_count` bytes.
    pub fn primitive(&mut self, byte_count: usize) {
        self.align(byte_count);
        self.skip(byte_count);
    }

    /// Keep the larger of two branches.
    pub fn merge_max(&mut self, other: &MaxSizeFinder) {
        self.offset = self.offset.max(other.offset);
    }

    /// Run `step` `count` times.
    ///
    /// The padding an element needs depends only on the offset modulo 8, so
    /// once a residue repeats the remaining iterations are fast-forwarded by
    /// whole periods. This keeps nested unbounded collections cheap.
    pub fn repeat<F>(&mut self, count: usize, mut step: F) -> Result<()>
    where
        F: FnMut(&mut MaxSizeFinder) -> Result<()>,
    {
        let mut seen: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut done = 0;
        while done < count {
            if self.is_unbounded() {
                return Ok(());
            }
            let residue = self.offset % MAX_ALIGNMENT;
            if let Some(&(start, start_offset)) = seen.get(&residue) {
                let period = done - start;
                let delta = self.offset - start_offset;
                let cycles = (count - done) / period;
                self.skip(delta.saturating_mul(cycles));
                done += cycles * period;
                seen.clear();
                while done < count && !self.is_unbounded() {
                    step(self)?;
                    done += 1;
                }
                return Ok(());
            }
            seen.insert(residue, (done, self.offset));
            step(self)?;
            done += 1;
        }
        Ok(())
    }
}
