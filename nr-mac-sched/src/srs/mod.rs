/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Aperiodic SRS allocator.
//!
//! An allocation attempt either commits fully (ledger bit, SRS PDU and UL
//! grid marking) or leaves every structure untouched.  Rejections are plain
//! values, never errors: they happen every slot for UEs inside their prohibit
//! window or whose candidate slot is not an SRS slot.
//!
//! Two pieces of state are kept per cell:
//!
//! * an eligibility bitmap over the TDD period (a single always-set entry
//!   for FDD);
//! * a ring of per-slot bitsets of consumed cell-level SRS resource ids,
//!   cleared one slot after it passes.
//!
//! The per-UE last allocation slot is owned by the caller.

pub mod bandwidth;

use std::fmt;

use tracing::trace;

use crate::config::{CellConfiguration, SrsResourceConfig};
use crate::grid::result::srs_symbols;
use crate::grid::{ring_size_gt_min, CrbInterval, ResourceGridRing, SrsInfo};
use crate::slot::SlotPoint;

use bandwidth::m_srs_0;

// ── Result types ──────────────────────────────────────────────────────────────

/// Outcome of an allocation attempt.  `trigger == 0` means nothing was
/// allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AperiodicSrsAllocInfo {
    /// aperiodicSRS-ResourceTrigger to signal in the DCI.
    pub trigger: u8,
    /// Slot offset between the DCI and the SRS transmission.
    pub slot_offset: u32,
}

impl AperiodicSrsAllocInfo {
    pub const NO_OP: AperiodicSrsAllocInfo = AperiodicSrsAllocInfo {
        trigger: 0,
        slot_offset: 0,
    };

    pub fn is_allocated(&self) -> bool {
        self.trigger != 0
    }
}

/// Why an allocation attempt produced no SRS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrsRejectCause {
    /// No prohibit time configured for the cell.
    Disabled,
    /// The candidate slot is not an SRS slot of the TDD period.
    NotEligibleSlot,
    /// The candidate slot falls inside the UE's prohibit window.
    ProhibitWindow,
    /// The candidate slot's SRS PDU list is full.
    SlotFull,
    /// The UE's cell resource id is already used in the candidate slot.
    ResourceCollision,
}

impl fmt::Display for SrsRejectCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SrsRejectCause::Disabled => "aperiodic SRS disabled",
            SrsRejectCause::NotEligibleSlot => "candidate slot is not an SRS slot",
            SrsRejectCause::ProhibitWindow => "candidate slot inside prohibit window",
            SrsRejectCause::SlotFull => "SRS list of candidate slot is full",
            SrsRejectCause::ResourceCollision => "cell SRS resource already used in candidate slot",
        };
        f.write_str(s)
    }
}

// ── SrsAllocator ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SrsAllocator {
    prohibit_time: Option<u32>,
    /// `None` for FDD.
    tdd_period: Option<u32>,
    eligible: Vec<bool>,
    ntn_k_offset: u32,
    nof_ul_crbs: u32,
    /// Per-slot bitsets of consumed cell resource ids, indexed by
    /// `slot.count() mod ring_size`.
    ledger: Vec<Vec<u64>>,
    max_cell_resources: u32,
    last_slot_ind: Option<SlotPoint>,
}

impl SrsAllocator {
    /// `prohibit_time == None` disables the allocator.
    ///
    /// # Panics
    /// Panics if the TDD pattern has no UL-bearing slot.
    pub fn new(cell: &CellConfiguration, prohibit_time: Option<u32>) -> Self {
        let (tdd_period, eligible) = match &cell.tdd {
            None => (None, vec![true]),
            Some(tdd) => {
                let period = tdd.nof_slots_per_period();
                let mut eligible = vec![false; period as usize];
                let Some(first_ul) = tdd.find_next_ul_slot(0) else {
                    panic!("at least one UL slot in the TDD configuration is required");
                };
                eligible[first_ul as usize] = true;
                if tdd.pattern2.is_some() {
                    if let Some(second) = tdd.find_next_ul_slot(tdd.pattern1.period_slots) {
                        eligible[second as usize] = true;
                    }
                }
                (Some(period), eligible)
            }
        };

        let words = (cell.srs.max_cell_resources as usize).div_ceil(64);
        let ring = ring_size_gt_min(cell.max_lookahead);
        Self {
            prohibit_time,
            tdd_period,
            eligible,
            ntn_k_offset: cell.srs.ntn_k_offset,
            nof_ul_crbs: cell.nof_ul_crbs,
            ledger: vec![vec![0; words]; ring],
            max_cell_resources: cell.srs.max_cell_resources,
            last_slot_ind: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.prohibit_time.is_some()
    }

    pub fn prohibit_time(&self) -> Option<u32> {
        self.prohibit_time
    }

    /// Returns `true` if `slot` is an SRS slot of the TDD period.
    pub fn is_eligible_slot(&self, slot: SlotPoint) -> bool {
        let idx = match self.tdd_period {
            None => 0,
            Some(period) => (slot.count() % period) as usize,
        };
        self.eligible[idx]
    }

    /// Must be called once per slot before any allocation in that slot.
    ///
    /// # Panics
    /// Panics on a skipped slot.
    pub fn slot_indication(&mut self, new_slot: SlotPoint) {
        if !self.is_enabled() {
            return;
        }
        if let Some(last) = self.last_slot_ind {
            assert!(
                new_slot == last + 1,
                "Detected a skipped slot: previous={last} new={new_slot}"
            );
        }
        self.last_slot_ind = Some(new_slot);
        let idx = self.ledger_index(new_slot - 1);
        self.ledger[idx].fill(0);
    }

    /// Tries to allocate the UE's aperiodic SRS, deciding in the grid's
    /// current slot.  Rejections return [`AperiodicSrsAllocInfo::NO_OP`].
    pub fn allocate(
        &mut self,
        grid: &mut ResourceGridRing,
        ue_index: u16,
        last_srs_slot: Option<SlotPoint>,
        res: &SrsResourceConfig,
    ) -> AperiodicSrsAllocInfo {
        self.allocate_detailed(grid, ue_index, last_srs_slot, res)
            .unwrap_or(AperiodicSrsAllocInfo::NO_OP)
    }

    /// Same as [`allocate`](Self::allocate), reporting why nothing was
    /// allocated.
    ///
    /// # Panics
    /// Panics if the slot offset exceeds the grid lookahead, the resource id
    /// is outside the cell pool, or the SRS bandwidth does not fit the UL
    /// carrier.  [`CellConfiguration::validate_ue`] rules these out.
    pub fn allocate_detailed(
        &mut self,
        grid: &mut ResourceGridRing,
        ue_index: u16,
        last_srs_slot: Option<SlotPoint>,
        res: &SrsResourceConfig,
    ) -> Result<AperiodicSrsAllocInfo, SrsRejectCause> {
        let Some(prohibit_time) = self.prohibit_time else {
            return Err(SrsRejectCause::Disabled);
        };

        let offset = res.slot_offset + self.ntn_k_offset;
        let candidate = grid.slot() + offset;

        if !self.is_eligible_slot(candidate) {
            return Err(SrsRejectCause::NotEligibleSlot);
        }

        if let Some(last) = last_srs_slot {
            if candidate < last + prohibit_time {
                return Err(SrsRejectCause::ProhibitWindow);
            }
        }

        let record = grid.at_mut(offset);
        if record.srs_list_full() {
            return Err(SrsRejectCause::SlotFull);
        }

        assert!(
            res.cell_res_id < self.max_cell_resources,
            "cell SRS resource id {} exceeds the pool size {}",
            res.cell_res_id,
            self.max_cell_resources
        );
        let idx = self.ledger_index(candidate);
        let (word, bit) = ((res.cell_res_id / 64) as usize, res.cell_res_id % 64);
        if self.ledger[idx][word] & (1 << bit) != 0 {
            return Err(SrsRejectCause::ResourceCollision);
        }
        self.ledger[idx][word] |= 1 << bit;

        let crbs = self.srs_crbs(res);
        record.push_srs(SrsInfo::aperiodic(ue_index, res, crbs));

        trace!(
            ue_index,
            srs_slot = %candidate,
            cell_res_id = res.cell_res_id,
            symbols = %srs_symbols(res),
            crbs = %crbs,
            "aperiodic SRS allocated"
        );
        Ok(AperiodicSrsAllocInfo {
            trigger: res.trigger,
            slot_offset: res.slot_offset,
        })
    }

    /// SRS bandwidth centred in the UL carrier, B_SRS = 0.
    fn srs_crbs(&self, res: &SrsResourceConfig) -> CrbInterval {
        let Some(m_srs) = m_srs_0(res.c_srs).filter(|m| *m <= self.nof_ul_crbs) else {
            panic!(
                "C_SRS {} does not fit the {}-CRB UL carrier",
                res.c_srs, self.nof_ul_crbs
            );
        };
        let start = (self.nof_ul_crbs - m_srs) / 2;
        CrbInterval::new(start, start + m_srs)
    }

    fn ledger_index(&self, slot: SlotPoint) -> usize {
        slot.count() as usize % self.ledger.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
