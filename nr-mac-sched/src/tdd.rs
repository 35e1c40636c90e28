/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! TDD UL/DL pattern description and slot-classification helpers.
//!
//! A pattern is laid out as `nof_dl_slots` full DL slots, then one special
//! slot (DL symbols at the start, UL symbols at the end), then
//! `nof_ul_slots` full UL slots closing the period.  An optional second
//! pattern follows the first; the TDD period is the sum of both.

use serde::{Deserialize, Serialize};

use crate::slot::NOF_OFDM_SYMBOLS_PER_SLOT;

/// One TDD UL/DL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TddPattern {
    /// Pattern length in slots.
    pub period_slots: u32,
    pub nof_dl_slots: u32,
    #[serde(default)]
    pub nof_dl_symbols: u8,
    pub nof_ul_slots: u32,
    #[serde(default)]
    pub nof_ul_symbols: u8,
}

impl TddPattern {
    /// Number of UL symbols active in slot `idx` of this pattern.
    pub fn nof_ul_symbols_at(&self, idx: u32) -> u8 {
        debug_assert!(idx < self.period_slots);
        let first_full_ul = self.period_slots - self.nof_ul_slots;
        if idx >= first_full_ul {
            NOF_OFDM_SYMBOLS_PER_SLOT
        } else if idx + 1 == first_full_ul && idx >= self.nof_dl_slots {
            self.nof_ul_symbols
        } else {
            0
        }
    }

    /// Number of DL symbols active in slot `idx` of this pattern.
    pub fn nof_dl_symbols_at(&self, idx: u32) -> u8 {
        debug_assert!(idx < self.period_slots);
        if idx < self.nof_dl_slots {
            NOF_OFDM_SYMBOLS_PER_SLOT
        } else if idx == self.nof_dl_slots {
            self.nof_dl_symbols
        } else {
            0
        }
    }
}

/// Common TDD configuration: pattern 1 plus an optional pattern 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TddConfig {
    pub pattern1: TddPattern,
    #[serde(default)]
    pub pattern2: Option<TddPattern>,
}

impl TddConfig {
    /// Length of the full TDD period in slots.
    pub fn nof_slots_per_period(&self) -> u32 {
        self.pattern1.period_slots + self.pattern2.as_ref().map_or(0, |p| p.period_slots)
    }

    /// Active UL symbols for a slot index within the TDD period.
    pub fn nof_ul_symbols_at(&self, period_idx: u32) -> u8 {
        let p1 = self.pattern1.period_slots;
        if period_idx < p1 {
            return self.pattern1.nof_ul_symbols_at(period_idx);
        }
        match &self.pattern2 {
            Some(p2) => p2.nof_ul_symbols_at(period_idx - p1),
            None => 0,
        }
    }

    /// Active DL symbols for a slot index within the TDD period.
    pub fn nof_dl_symbols_at(&self, period_idx: u32) -> u8 {
        let p1 = self.pattern1.period_slots;
        if period_idx < p1 {
            return self.pattern1.nof_dl_symbols_at(period_idx);
        }
        match &self.pattern2 {
            Some(p2) => p2.nof_dl_symbols_at(period_idx - p1),
            None => 0,
        }
    }

    /// First slot index `>= start` within the period with at least one UL
    /// symbol, or `None` if the rest of the period is DL-only.
    pub fn find_next_ul_slot(&self, start: u32) -> Option<u32> {
        (start..self.nof_slots_per_period()).find(|&idx| self.nof_ul_symbols_at(idx) > 0)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
