/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-cell resource grid ring.
//!
//! The ring holds one [`AllocationRecord`] per slot for the current slot and
//! the next `max_lookahead` slots.  Records are addressed by
//! `slot.count() mod N`, where `N` is the smallest power of two strictly
//! greater than `max_lookahead`.  Because `N` is a power of two no larger than
//! 1024, it divides the slot-count wrap of every numerology and the index
//! stays consistent across the hyper-frame boundary.
//!
//! On every [`slot_indication`](ResourceGridRing::slot_indication) the record
//! that is about to become reachable (`new_slot + max_lookahead`) is cleared
//! and relabelled, so each index is wiped exactly once before reuse.
//!
//! ```text
//!   slot_indication(s)            at(0)      at(1)   ...   at(L)
//!   ──────────────────► ring:  [  s  ] [ s+1 ] ... [ s+L ] [ stale ] ...
//!                                                     ▲
//!                                                     └ cleared on this call
//! ```

pub mod bitmap;
pub mod result;

use tracing::trace;

use crate::slot::SlotPoint;

pub use bitmap::{CrbInterval, GrantInfo, OfdmSymbolRange, SlotResourceGrid, MAX_NOF_CRBS};
pub use result::{DataGrant, SrsInfo, SrsResourceType, SsbInformation};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Maximum SSB occasions per slot; sized to the largest L_max.
pub const MAX_SSB_PER_SLOT: usize = 64;

/// Maximum DL or UL new-transmission grants per slot.
pub const MAX_DATA_GRANTS_PER_SLOT: usize = 16;

/// Upper bound for the configurable SRS PDU list.
pub const MAX_SRS_PDUS_PER_SLOT: usize = 64;

/// Smallest power of two strictly greater than `max_lookahead`.
pub fn ring_size_gt_min(max_lookahead: u32) -> usize {
    (max_lookahead as usize + 1).next_power_of_two()
}

// ── AllocationRecord ──────────────────────────────────────────────────────────

/// Everything scheduled in one slot.
#[derive(Debug, Clone)]
pub struct AllocationRecord {
    slot: Option<SlotPoint>,
    pub dl_grid: SlotResourceGrid,
    pub ul_grid: SlotResourceGrid,
    ssbs: Vec<SsbInformation>,
    srss: Vec<SrsInfo>,
    dl_grants: Vec<DataGrant>,
    ul_grants: Vec<DataGrant>,
    srs_capacity: usize,
}

impl AllocationRecord {
    fn new(srs_capacity: usize) -> Self {
        Self {
            slot: None,
            dl_grid: SlotResourceGrid::new(),
            ul_grid: SlotResourceGrid::new(),
            ssbs: Vec::with_capacity(MAX_SSB_PER_SLOT),
            srss: Vec::with_capacity(srs_capacity),
            dl_grants: Vec::with_capacity(MAX_DATA_GRANTS_PER_SLOT),
            ul_grants: Vec::with_capacity(MAX_DATA_GRANTS_PER_SLOT),
            srs_capacity,
        }
    }

    /// Clear all content and relabel the record.  List capacities are kept.
    fn reset(&mut self, slot: SlotPoint) {
        self.slot = Some(slot);
        self.dl_grid.reset();
        self.ul_grid.reset();
        self.ssbs.clear();
        self.srss.clear();
        self.dl_grants.clear();
        self.ul_grants.clear();
    }

    /// Slot this record currently describes.
    ///
    /// # Panics
    /// Panics if the ring has not received its first slot indication.
    pub fn slot(&self) -> SlotPoint {
        match self.slot {
            Some(s) => s,
            None => panic!("allocation record accessed before the first slot indication"),
        }
    }

    /// Returns `true` when the record holds no grant and no occupied resource.
    pub fn is_empty(&self) -> bool {
        self.ssbs.is_empty()
            && self.srss.is_empty()
            && self.dl_grants.is_empty()
            && self.ul_grants.is_empty()
            && self.dl_grid.is_empty()
            && self.ul_grid.is_empty()
    }

    // ── SSB ───────────────────────────────────────────────────────────────────

    pub fn ssbs(&self) -> &[SsbInformation] {
        &self.ssbs
    }

    /// Append an SSB occasion and mark its DL resources.
    ///
    /// # Panics
    /// Panics when the list already holds [`MAX_SSB_PER_SLOT`] entries.
    pub fn push_ssb(&mut self, ssb: SsbInformation) {
        assert!(
            self.ssbs.len() < MAX_SSB_PER_SLOT,
            "SSB list overflow in slot {}",
            self.slot()
        );
        self.dl_grid.fill(&ssb.grant());
        self.ssbs.push(ssb);
    }

    // ── SRS ───────────────────────────────────────────────────────────────────

    pub fn srss(&self) -> &[SrsInfo] {
        &self.srss
    }

    pub fn srs_capacity(&self) -> usize {
        self.srs_capacity
    }

    pub fn srs_list_full(&self) -> bool {
        self.srss.len() >= self.srs_capacity
    }

    /// Append an SRS PDU and mark its UL resources.
    ///
    /// # Panics
    /// Panics when the list is full; callers check
    /// [`srs_list_full`](Self::srs_list_full) first.
    pub fn push_srs(&mut self, srs: SrsInfo) {
        assert!(!self.srs_list_full(), "SRS list overflow in slot {}", self.slot());
        self.ul_grid.fill(&srs.grant());
        self.srss.push(srs);
    }

    // ── Data grants ───────────────────────────────────────────────────────────

    pub fn dl_grants(&self) -> &[DataGrant] {
        &self.dl_grants
    }

    pub fn ul_grants(&self) -> &[DataGrant] {
        &self.ul_grants
    }

    /// Commit a DL grant if the list has room and the rectangle is free.
    /// Returns `false` without side effects otherwise.
    pub fn try_add_dl_grant(&mut self, grant: DataGrant) -> bool {
        Self::try_add(&mut self.dl_grants, &mut self.dl_grid, grant)
    }

    /// Commit a UL grant if the list has room and the rectangle is free.
    pub fn try_add_ul_grant(&mut self, grant: DataGrant) -> bool {
        Self::try_add(&mut self.ul_grants, &mut self.ul_grid, grant)
    }

    fn try_add(list: &mut Vec<DataGrant>, grid: &mut SlotResourceGrid, grant: DataGrant) -> bool {
        if list.len() >= MAX_DATA_GRANTS_PER_SLOT || grid.collides(&grant.grant) {
            return false;
        }
        grid.fill(&grant.grant);
        list.push(grant);
        true
    }
}

// ── ResourceGridRing ──────────────────────────────────────────────────────────

/// Fixed-size ring of per-slot allocation records.
#[derive(Debug)]
pub struct ResourceGridRing {
    records: Vec<AllocationRecord>,
    max_lookahead: u32,
    current: Option<SlotPoint>,
}

impl ResourceGridRing {
    /// Creates a ring able to address `max_lookahead` slots ahead of the
    /// current one.  `srs_capacity` bounds each record's SRS PDU list.
    ///
    /// # Panics
    /// Panics if `max_lookahead` is 0 or above 1023, or if `srs_capacity`
    /// exceeds [`MAX_SRS_PDUS_PER_SLOT`].
    pub fn new(max_lookahead: u32, srs_capacity: usize) -> Self {
        assert!(
            (1..=1023).contains(&max_lookahead),
            "max_lookahead {max_lookahead} outside [1, 1023]"
        );
        assert!(
            srs_capacity <= MAX_SRS_PDUS_PER_SLOT,
            "SRS capacity {srs_capacity} above {MAX_SRS_PDUS_PER_SLOT}"
        );
        let n = ring_size_gt_min(max_lookahead);
        Self {
            records: (0..n).map(|_| AllocationRecord::new(srs_capacity)).collect(),
            max_lookahead,
            current: None,
        }
    }

    pub fn max_lookahead(&self) -> u32 {
        self.max_lookahead
    }

    pub fn ring_size(&self) -> usize {
        self.records.len()
    }

    /// Current slot, or `None` before the first slot indication.
    pub fn current_slot(&self) -> Option<SlotPoint> {
        self.current
    }

    /// Current slot.
    ///
    /// # Panics
    /// Panics before the first slot indication.
    pub fn slot(&self) -> SlotPoint {
        match self.current {
            Some(s) => s,
            None => panic!("resource grid used before the first slot indication"),
        }
    }

    /// Advance the ring to `new_slot`.
    ///
    /// The first call labels every record.  Later calls require
    /// `new_slot == previous + 1` and clear the record for
    /// `new_slot + max_lookahead`.
    ///
    /// # Panics
    /// Panics on a skipped or repeated slot.
    pub fn slot_indication(&mut self, new_slot: SlotPoint) {
        match self.current {
            None => {
                for i in 0..self.records.len() as u32 {
                    let sl = new_slot + i;
                    let idx = self.index_of(sl);
                    self.records[idx].reset(sl);
                }
            }
            Some(prev) => {
                assert!(
                    new_slot == prev + 1,
                    "Detected a skipped slot: previous={prev} new={new_slot}"
                );
                let reused = new_slot + self.max_lookahead;
                let idx = self.index_of(reused);
                self.records[idx].reset(reused);
            }
        }
        trace!(slot = %new_slot, "resource grid advanced");
        self.current = Some(new_slot);
    }

    /// Record for `current + offset`.
    ///
    /// # Panics
    /// Panics if `offset > max_lookahead` or before the first slot indication.
    pub fn at(&self, offset: u32) -> &AllocationRecord {
        let idx = self.checked_index(offset);
        &self.records[idx]
    }

    /// Mutable record for `current + offset`.
    ///
    /// # Panics
    /// Panics if `offset > max_lookahead` or before the first slot indication.
    pub fn at_mut(&mut self, offset: u32) -> &mut AllocationRecord {
        let idx = self.checked_index(offset);
        &mut self.records[idx]
    }

    fn checked_index(&self, offset: u32) -> usize {
        assert!(
            offset <= self.max_lookahead,
            "ring offset {offset} beyond max_lookahead {}",
            self.max_lookahead
        );
        let target = self.slot() + offset;
        let idx = self.index_of(target);
        debug_assert_eq!(self.records[idx].slot, Some(target), "stale record label");
        idx
    }

    fn index_of(&self, slot: SlotPoint) -> usize {
        slot.count() as usize % self.records.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn full_grant() -> GrantInfo {
        GrantInfo::new(OfdmSymbolRange::full_slot(), CrbInterval::new(0, 52))
    }

    fn dl(ue_index: u16, crbs: (u32, u32)) -> DataGrant {
        DataGrant {
            ue_index,
            grant: GrantInfo::new(OfdmSymbolRange::new(2, 14), CrbInterval::new(crbs.0, crbs.1)),
            tb_bytes: 100,
        }
    }

    // ── ring sizing ───────────────────────────────────────────────────────────

    #[test]
    fn ring_size_is_next_power_of_two_above_lookahead() {
        assert_eq!(ring_size_gt_min(1), 2);
        assert_eq!(ring_size_gt_min(3), 4);
        assert_eq!(ring_size_gt_min(4), 8);
        assert_eq!(ring_size_gt_min(16), 32);
        assert_eq!(ring_size_gt_min(1023), 1024);
    }

    #[test]
    #[should_panic(expected = "outside [1, 1023]")]
    fn zero_lookahead_panics() {
        let _ = ResourceGridRing::new(0, 8);
    }

    // ── slot_indication ───────────────────────────────────────────────────────

    #[test]
    fn first_indication_labels_whole_window() {
        let mut ring = ResourceGridRing::new(5, 8);
        let start = SlotPoint::new(1, 100);
        ring.slot_indication(start);
        for off in 0..=5 {
            assert_eq!(ring.at(off).slot(), start + off);
            assert!(ring.at(off).is_empty());
        }
    }

    #[test]
    fn records_are_empty_every_time_an_index_is_reused() {
        let mut ring = ResourceGridRing::new(4, 8);
        let mut sl = SlotPoint::new(0, 10_230);
        ring.slot_indication(sl);

        // Runs across the hyper-frame wrap.
        for _ in 0..40 {
            assert!(
                ring.at(ring.max_lookahead()).is_empty(),
                "newly exposed slot {} must be clean",
                ring.at(ring.max_lookahead()).slot()
            );
            for off in 0..=ring.max_lookahead() {
                ring.at_mut(off).dl_grid.fill(&full_grant());
            }
            sl = sl + 1;
            ring.slot_indication(sl);
        }
        assert_eq!(ring.slot(), SlotPoint::new(0, 30));
    }

    #[test]
    fn content_written_ahead_survives_until_current() {
        let mut ring = ResourceGridRing::new(8, 8);
        let mut sl = SlotPoint::new(0, 0);
        ring.slot_indication(sl);
        assert!(ring.at_mut(8).try_add_dl_grant(dl(3, (0, 10))));

        for _ in 0..8 {
            sl = sl + 1;
            ring.slot_indication(sl);
        }
        assert_eq!(ring.at(0).dl_grants().len(), 1);
        assert_eq!(ring.at(0).dl_grants()[0].ue_index, 3);
    }

    #[test]
    #[should_panic(expected = "skipped slot")]
    fn skipped_slot_panics() {
        let mut ring = ResourceGridRing::new(4, 8);
        ring.slot_indication(SlotPoint::new(0, 5));
        ring.slot_indication(SlotPoint::new(0, 7));
    }

    #[test]
    #[should_panic(expected = "beyond max_lookahead")]
    fn offset_beyond_lookahead_panics() {
        let mut ring = ResourceGridRing::new(4, 8);
        ring.slot_indication(SlotPoint::new(0, 0));
        let _ = ring.at(5);
    }

    #[test]
    #[should_panic(expected = "before the first slot indication")]
    fn access_before_first_indication_panics() {
        let ring = ResourceGridRing::new(4, 8);
        let _ = ring.at(0);
    }

    // ── AllocationRecord ──────────────────────────────────────────────────────

    #[test]
    fn data_grants_reject_collisions_and_overflow() {
        let mut ring = ResourceGridRing::new(2, 8);
        ring.slot_indication(SlotPoint::new(0, 0));
        let rec = ring.at_mut(0);

        assert!(rec.try_add_dl_grant(dl(0, (0, 10))));
        assert!(!rec.try_add_dl_grant(dl(1, (5, 15))), "overlaps UE 0");
        assert_eq!(rec.dl_grants().len(), 1);

        for i in 1..MAX_DATA_GRANTS_PER_SLOT as u32 {
            assert!(rec.try_add_dl_grant(dl(i as u16, (10 + i, 11 + i))));
        }
        assert!(!rec.try_add_dl_grant(dl(99, (200, 201))), "list is full");
        assert!(rec.try_add_ul_grant(dl(99, (200, 201))), "UL is independent");
    }
}
