/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-slot time/frequency occupancy bitmap.
//!
//! One bit per (OFDM symbol, CRB) pair.  275 CRBs is the NR maximum carrier
//! width, so each symbol row is stored as five 64-bit words.

use std::fmt;

use crate::slot::NOF_OFDM_SYMBOLS_PER_SLOT;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Maximum number of common resource blocks in an NR carrier.
pub const MAX_NOF_CRBS: u32 = 275;

const WORDS_PER_SYMBOL: usize = (MAX_NOF_CRBS as usize).div_ceil(64);

// ── Intervals ─────────────────────────────────────────────────────────────────

/// Half-open range of OFDM symbols `[start, stop)` within a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfdmSymbolRange {
    pub start: u8,
    pub stop: u8,
}

impl OfdmSymbolRange {
    pub fn new(start: u8, stop: u8) -> Self {
        debug_assert!(
            start <= stop && stop <= NOF_OFDM_SYMBOLS_PER_SLOT,
            "invalid symbol range [{start}, {stop})"
        );
        Self { start, stop }
    }

    /// The whole slot.
    pub fn full_slot() -> Self {
        Self::new(0, NOF_OFDM_SYMBOLS_PER_SLOT)
    }

    pub fn len(&self) -> u8 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }
}

impl fmt::Display for OfdmSymbolRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// Half-open range of common resource blocks `[start, stop)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrbInterval {
    pub start: u32,
    pub stop: u32,
}

impl CrbInterval {
    pub fn new(start: u32, stop: u32) -> Self {
        debug_assert!(start <= stop, "invalid CRB interval [{start}, {stop})");
        Self { start, stop }
    }

    pub fn len(&self) -> u32 {
        self.stop - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// Returns `true` if `other` lies entirely within `self`.
    pub fn contains(&self, other: &CrbInterval) -> bool {
        other.start >= self.start && other.stop <= self.stop
    }
}

impl fmt::Display for CrbInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// A time/frequency rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrantInfo {
    pub symbols: OfdmSymbolRange,
    pub crbs: CrbInterval,
}

impl GrantInfo {
    pub fn new(symbols: OfdmSymbolRange, crbs: CrbInterval) -> Self {
        Self { symbols, crbs }
    }
}

// ── SlotResourceGrid ──────────────────────────────────────────────────────────

/// Occupancy bitmap for one slot in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotResourceGrid {
    rows: [[u64; WORDS_PER_SYMBOL]; NOF_OFDM_SYMBOLS_PER_SLOT as usize],
}

impl Default for SlotResourceGrid {
    fn default() -> Self {
        Self {
            rows: [[0; WORDS_PER_SYMBOL]; NOF_OFDM_SYMBOLS_PER_SLOT as usize],
        }
    }
}

impl SlotResourceGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every bit.
    pub fn reset(&mut self) {
        for row in self.rows.iter_mut() {
            *row = [0; WORDS_PER_SYMBOL];
        }
    }

    /// Returns `true` if no resource is marked as used.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(|w| *w == 0))
    }

    /// Mark the rectangle as used.  No collision check is performed; callers
    /// are expected to have called [`collides`](Self::collides) first.
    pub fn fill(&mut self, grant: &GrantInfo) {
        Self::check_bounds(grant);
        for sym in grant.symbols.start..grant.symbols.stop {
            let row = &mut self.rows[sym as usize];
            for_each_word(grant.crbs, |idx, mask| row[idx] |= mask);
        }
    }

    /// Returns `true` if any resource inside the rectangle is already used.
    pub fn collides(&self, grant: &GrantInfo) -> bool {
        Self::check_bounds(grant);
        let mut hit = false;
        for sym in grant.symbols.start..grant.symbols.stop {
            let row = &self.rows[sym as usize];
            for_each_word(grant.crbs, |idx, mask| hit |= row[idx] & mask != 0);
        }
        hit
    }

    /// Returns `true` if every resource inside the rectangle is used.
    pub fn all_set(&self, grant: &GrantInfo) -> bool {
        Self::check_bounds(grant);
        let mut all = true;
        for sym in grant.symbols.start..grant.symbols.stop {
            let row = &self.rows[sym as usize];
            for_each_word(grant.crbs, |idx, mask| all &= row[idx] & mask == mask);
        }
        all
    }

    /// Number of used CRBs on a given symbol.
    pub fn nof_used_crbs(&self, symbol: u8) -> u32 {
        self.rows[symbol as usize]
            .iter()
            .map(|w| w.count_ones())
            .sum()
    }

    fn check_bounds(grant: &GrantInfo) {
        assert!(
            grant.symbols.stop <= NOF_OFDM_SYMBOLS_PER_SLOT && grant.crbs.stop <= MAX_NOF_CRBS,
            "grant symbols={} crbs={} outside the slot grid",
            grant.symbols,
            grant.crbs
        );
    }
}

/// Calls `f(word_index, mask)` for every 64-bit word overlapped by `crbs`.
fn for_each_word(crbs: CrbInterval, mut f: impl FnMut(usize, u64)) {
    let mut bit = crbs.start;
    while bit < crbs.stop {
        let word = (bit / 64) as usize;
        let lo = bit % 64;
        let hi = (crbs.stop - word as u32 * 64).min(64);
        let mask = if hi - lo == 64 {
            u64::MAX
        } else {
            ((1u64 << (hi - lo)) - 1) << lo
        };
        f(word, mask);
        bit = (word as u32 + 1) * 64;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(sym: (u8, u8), crbs: (u32, u32)) -> GrantInfo {
        GrantInfo::new(OfdmSymbolRange::new(sym.0, sym.1), CrbInterval::new(crbs.0, crbs.1))
    }

    #[test]
    fn new_grid_is_empty() {
        let g = SlotResourceGrid::new();
        assert!(g.is_empty());
        assert!(!g.collides(&grant((0, 14), (0, MAX_NOF_CRBS))));
    }

    #[test]
    fn fill_then_collides_and_all_set() {
        let mut g = SlotResourceGrid::new();
        let ssb = grant((2, 6), (14, 34));
        g.fill(&ssb);

        assert!(g.all_set(&ssb));
        assert!(g.collides(&grant((5, 6), (33, 40))), "overlap on last symbol / CRB");
        assert!(!g.collides(&grant((6, 14), (14, 34))), "later symbols are free");
        assert!(!g.collides(&grant((2, 6), (34, 100))), "higher CRBs are free");
        assert_eq!(g.nof_used_crbs(2), 20);
        assert_eq!(g.nof_used_crbs(6), 0);
    }

    #[test]
    fn fill_across_word_boundaries() {
        let mut g = SlotResourceGrid::new();
        let wide = grant((0, 1), (60, 200));
        g.fill(&wide);
        assert!(g.all_set(&wide));
        assert_eq!(g.nof_used_crbs(0), 140);
        assert!(!g.collides(&grant((0, 1), (200, 275))));
        assert!(!g.collides(&grant((0, 1), (0, 60))));
    }

    #[test]
    fn full_carrier_fill() {
        let mut g = SlotResourceGrid::new();
        g.fill(&grant((0, 14), (0, MAX_NOF_CRBS)));
        assert_eq!(g.nof_used_crbs(13), MAX_NOF_CRBS);
        g.reset();
        assert!(g.is_empty());
    }

    #[test]
    fn crb_interval_contains() {
        let bwp = CrbInterval::new(0, 106);
        assert!(bwp.contains(&CrbInterval::new(14, 34)));
        assert!(!bwp.contains(&CrbInterval::new(100, 120)));
    }

    #[test]
    #[should_panic(expected = "outside the slot grid")]
    fn out_of_grid_fill_panics() {
        let mut g = SlotResourceGrid::new();
        g.fill(&grant((0, 1), (270, 280)));
    }
}
