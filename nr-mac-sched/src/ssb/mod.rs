/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! SSB placement (TS 38.213 §4.1).
//!
//! The scheduler writes SSB occasions into the resource grid before any other
//! channel, so a collision with previously placed resources cannot happen.
//!
//! On the first call after construction (or after [`SsbScheduler::stop`]) the
//! whole lookahead window is scheduled, skipping slots that already carry
//! SSBs; afterwards only the slot newly exposed at `max_lookahead` is.
//!
//! Candidate positions per pattern case, with `m` the slot index inside the
//! SSB period:
//!
//! | Case | Slots | Burst symbols | First SSB index |
//! |---|---|---|---|
//! | A, C | `m ≤ 1` (≤ cutoff) or `m ≤ 3` | `{2, 8} + 14·m` | `2·m` |
//! | B | same limits | even `m`: `{4, 8} + 14·m`, odd: `{16, 20} + 14·(m−1)` | `2·m` |
//! | D | pairs `{0..3, 5..8, 10..13, 15..18}` of a 40-slot burst | even: `{4, 8}`, odd: `{2, 6}` | `4·pos + 2·(m mod 2)` |

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{CellConfiguration, FrequencyRange, SsbConfiguration};
use crate::grid::{AllocationRecord, CrbInterval, OfdmSymbolRange, ResourceGridRing, SsbInformation};
use crate::slot::{SubcarrierSpacing, NOF_OFDM_SYMBOLS_PER_SLOT};

// ── Constants ─────────────────────────────────────────────────────────────────

/// 3 GHz cutoff for cases A, B and paired C.
pub const CUTOFF_FREQ_ARFCN_CASE_A_B_C: u32 = 600_000;

/// 1.88 GHz cutoff for case C on unpaired spectrum.
pub const CUTOFF_FREQ_ARFCN_CASE_C_UNPAIRED: u32 = 376_000;

/// OFDM symbols per SSB.
pub const NOF_SSB_OFDM_SYMBOLS: u8 = 4;

/// PRBs per SSB at the SSB subcarrier spacing.
pub const NOF_SSB_PRBS: u32 = 20;

/// Slots in a 5 ms burst at 120 kHz (case D).
const NOF_SLOTS_SSB_BURST_CASE_D: u32 = 5 << 3;

const CASE_D_SLOT_PAIRS: [u32; 16] = [0, 1, 2, 3, 5, 6, 7, 8, 10, 11, 12, 13, 15, 16, 17, 18];

// ── Types ─────────────────────────────────────────────────────────────────────

/// SSB pattern case, TS 38.213 §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SsbPatternCase {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsbSchedulerState {
    /// Next run schedules the whole lookahead window.
    ColdStart,
    /// Next run schedules only the newest slot.
    SteadyState,
}

/// CRBs occupied by an SSB in units of the common SCS.
///
/// `offset_to_point_a` is expressed in 15 kHz RBs in FR1 and 60 kHz RBs in
/// FR2.  A non-zero `k_ssb` shifts the block across one more CRB.
pub fn ssb_crbs(
    ssb: &SsbConfiguration,
    scs_common: SubcarrierSpacing,
    fr: FrequencyRange,
) -> CrbInterval {
    let ref_khz = match fr {
        FrequencyRange::Fr1 => 15,
        FrequencyRange::Fr2 => 60,
    };
    let common_khz = scs_common.khz();
    let start = ssb.offset_to_point_a * ref_khz / common_khz;
    let mut len = (NOF_SSB_PRBS * ssb.scs.khz()).div_ceil(common_khz);
    if ssb.k_ssb > 0 {
        len += 1;
    }
    CrbInterval::new(start, start + len)
}

// ── SsbScheduler ──────────────────────────────────────────────────────────────

/// Periodic SSB scheduler for one cell.
#[derive(Debug, Clone)]
pub struct SsbScheduler {
    cfg: SsbConfiguration,
    /// Slots per SSB period, at the common numerology.
    period_slots: u32,
    /// Carrier at or below the case-specific cutoff frequency.
    below_cutoff: bool,
    crbs: CrbInterval,
    state: SsbSchedulerState,
}

impl SsbScheduler {
    pub fn new(ssb: SsbConfiguration, cell: &CellConfiguration) -> Self {
        let cutoff = match ssb.case {
            SsbPatternCase::C if !cell.paired_spectrum() => CUTOFF_FREQ_ARFCN_CASE_C_UNPAIRED,
            _ => CUTOFF_FREQ_ARFCN_CASE_A_B_C,
        };
        let crbs = ssb_crbs(&ssb, cell.scs_common, cell.frequency_range());
        let period_slots = ssb.periodicity_ms << cell.numerology();
        Self {
            below_cutoff: cell.dl_arfcn <= cutoff,
            crbs,
            period_slots,
            cfg: ssb,
            state: SsbSchedulerState::ColdStart,
        }
    }

    pub fn config(&self) -> &SsbConfiguration {
        &self.cfg
    }

    pub fn state(&self) -> SsbSchedulerState {
        self.state
    }

    /// Return to cold start: the next run schedules the whole window again.
    pub fn stop(&mut self) {
        self.state = SsbSchedulerState::ColdStart;
    }

    /// Schedule every due SSB in the grid.  Returns the number of SSB
    /// occasions written.
    pub fn run_slot(&mut self, grid: &mut ResourceGridRing) -> usize {
        let max_lookahead = grid.max_lookahead();
        match self.state {
            SsbSchedulerState::ColdStart => {
                let mut placed = 0;
                for off in 0..=max_lookahead {
                    let record = grid.at_mut(off);
                    // Slots already holding SSBs were placed before a restart.
                    if record.ssbs().is_empty() {
                        placed += self.schedule_record(record);
                    }
                }
                self.state = SsbSchedulerState::SteadyState;
                placed
            }
            SsbSchedulerState::SteadyState => self.schedule_record(grid.at_mut(max_lookahead)),
        }
    }

    fn schedule_record(&self, record: &mut AllocationRecord) -> usize {
        let slot = record.slot();
        let slot_mod = slot.count() % self.period_slots;
        let mut placed = 0;
        for (burst_symbol, ssb_index) in self.candidates(slot_mod).into_iter().flatten() {
            if !self.cfg.is_beam_enabled(ssb_index) {
                continue;
            }
            let start = burst_symbol % NOF_OFDM_SYMBOLS_PER_SLOT;
            let ssb = SsbInformation {
                ssb_index,
                beam_id: self.cfg.beam_id(ssb_index),
                symbols: OfdmSymbolRange::new(start, start + NOF_SSB_OFDM_SYMBOLS),
                crbs: self.crbs,
            };
            trace!(slot = %slot, ssb_index, symbols = %ssb.symbols, crbs = %ssb.crbs, "SSB placed");
            record.push_ssb(ssb);
            placed += 1;
        }
        placed
    }

    /// Burst-relative start symbol and SSB index of the (up to two) candidate
    /// occasions in the slot at `slot_mod` within the SSB period.
    fn candidates(&self, slot_mod: u32) -> [Option<(u8, u8)>; 2] {
        let max_slot = if self.below_cutoff { 1 } else { 3 };
        match self.cfg.case {
            SsbPatternCase::A | SsbPatternCase::C => {
                if slot_mod > max_slot {
                    return [None, None];
                }
                Self::pair([2, 8], 14 * slot_mod, 2 * slot_mod)
            }
            SsbPatternCase::B => {
                if slot_mod > max_slot {
                    return [None, None];
                }
                if slot_mod % 2 == 0 {
                    Self::pair([4, 8], 14 * slot_mod, 2 * slot_mod)
                } else {
                    Self::pair([16, 20], 14 * (slot_mod - 1), 2 * slot_mod)
                }
            }
            SsbPatternCase::D => {
                if slot_mod >= NOF_SLOTS_SSB_BURST_CASE_D {
                    return [None, None];
                }
                let Some(pos) = CASE_D_SLOT_PAIRS.iter().position(|&p| p == slot_mod / 2) else {
                    return [None, None];
                };
                let first = 4 * pos as u32 + 2 * (slot_mod % 2);
                let symbols = if slot_mod % 2 == 0 { [4, 8] } else { [2, 6] };
                Self::pair(symbols, 0, first)
            }
        }
    }

    fn pair(symbols: [u32; 2], symbol_base: u32, first_index: u32) -> [Option<(u8, u8)>; 2] {
        [0, 1].map(|n| Some(((symbols[n] + symbol_base) as u8, (first_index + n as u32) as u8)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
