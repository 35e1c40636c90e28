/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduler event port.
//!
//! The cell scheduler never logs or counts on its own behalf at the event
//! level; it reports to a [`SchedulerEventNotifier`] injected at
//! construction.  Every method has a no-op default so implementations only
//! override what they care about.
//!
//! | Implementation          | Effect                                    |
//! |-------------------------|-------------------------------------------|
//! | [`TracingNotifier`]     | `tracing` events at debug/trace level      |
//! | [`SchedMetricsRecorder`]| lock-free counters behind a cloneable handle |
//! | [`NullNotifier`]        | nothing                                   |
//!
//! A pair `(A, B)` of notifiers forwards every event to both.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::slot::SlotPoint;
use crate::srs::{AperiodicSrsAllocInfo, SrsRejectCause};

pub trait SchedulerEventNotifier {
    /// A new slot was indicated and the grid advanced.
    fn on_slot_indication(&mut self, _slot: SlotPoint) {}

    /// `nof_ssbs` SSB occasions were written during `slot`'s indication.
    fn on_ssb_scheduled(&mut self, _slot: SlotPoint, _nof_ssbs: usize) {}

    fn on_srs_allocated(&mut self, _slot: SlotPoint, _ue_index: u16, _info: AperiodicSrsAllocInfo) {
    }

    fn on_srs_rejected(&mut self, _slot: SlotPoint, _ue_index: u16, _cause: SrsRejectCause) {}
}

impl<A, B> SchedulerEventNotifier for (A, B)
where
    A: SchedulerEventNotifier,
    B: SchedulerEventNotifier,
{
    fn on_slot_indication(&mut self, slot: SlotPoint) {
        self.0.on_slot_indication(slot);
        self.1.on_slot_indication(slot);
    }

    fn on_ssb_scheduled(&mut self, slot: SlotPoint, nof_ssbs: usize) {
        self.0.on_ssb_scheduled(slot, nof_ssbs);
        self.1.on_ssb_scheduled(slot, nof_ssbs);
    }

    fn on_srs_allocated(&mut self, slot: SlotPoint, ue_index: u16, info: AperiodicSrsAllocInfo) {
        self.0.on_srs_allocated(slot, ue_index, info);
        self.1.on_srs_allocated(slot, ue_index, info);
    }

    fn on_srs_rejected(&mut self, slot: SlotPoint, ue_index: u16, cause: SrsRejectCause) {
        self.0.on_srs_rejected(slot, ue_index, cause);
        self.1.on_srs_rejected(slot, ue_index, cause);
    }
}

// ── NullNotifier ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl SchedulerEventNotifier for NullNotifier {}

// ── TracingNotifier ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct TracingNotifier {
    pci: u16,
}

impl TracingNotifier {
    pub fn new(pci: u16) -> Self {
        Self { pci }
    }
}

impl SchedulerEventNotifier for TracingNotifier {
    fn on_slot_indication(&mut self, slot: SlotPoint) {
        trace!(pci = self.pci, slot = %slot, "slot indication");
    }

    fn on_ssb_scheduled(&mut self, slot: SlotPoint, nof_ssbs: usize) {
        debug!(pci = self.pci, slot = %slot, nof_ssbs, "SSB occasions scheduled");
    }

    fn on_srs_allocated(&mut self, slot: SlotPoint, ue_index: u16, info: AperiodicSrsAllocInfo) {
        debug!(
            pci = self.pci,
            slot = %slot,
            ue_index,
            trigger = info.trigger,
            slot_offset = info.slot_offset,
            "Aperiodic SRS allocated"
        );
    }

    fn on_srs_rejected(&mut self, slot: SlotPoint, ue_index: u16, cause: SrsRejectCause) {
        trace!(pci = self.pci, slot = %slot, ue_index, %cause, "Aperiodic SRS not allocated");
    }
}

// ── SchedMetricsRecorder ──────────────────────────────────────────────────────

const NOF_REJECT_CAUSES: usize = 5;

fn reject_cause_index(cause: SrsRejectCause) -> usize {
    match cause {
        SrsRejectCause::Disabled => 0,
        SrsRejectCause::NotEligibleSlot => 1,
        SrsRejectCause::ProhibitWindow => 2,
        SrsRejectCause::SlotFull => 3,
        SrsRejectCause::ResourceCollision => 4,
    }
}

#[derive(Debug, Default)]
struct SchedCounters {
    slots: AtomicU64,
    ssbs: AtomicU64,
    srs_allocated: AtomicU64,
    srs_rejected: [AtomicU64; NOF_REJECT_CAUSES],
}

/// Point-in-time copy of the recorded counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedMetricsSnapshot {
    pub slots: u64,
    pub ssbs: u64,
    pub srs_allocated: u64,
    pub srs_rejected: u64,
    pub srs_rejected_prohibit: u64,
    pub srs_rejected_collision: u64,
}

/// Counts scheduler events.  Clones share the same counters, so a handle can
/// be kept outside the cell scheduler that owns the boxed notifier.
#[derive(Debug, Default, Clone)]
pub struct SchedMetricsRecorder {
    counters: Arc<SchedCounters>,
}

impl SchedMetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn srs_rejected_for(&self, cause: SrsRejectCause) -> u64 {
        self.counters.srs_rejected[reject_cause_index(cause)].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SchedMetricsSnapshot {
        let c = &self.counters;
        SchedMetricsSnapshot {
            slots: c.slots.load(Ordering::Relaxed),
            ssbs: c.ssbs.load(Ordering::Relaxed),
            srs_allocated: c.srs_allocated.load(Ordering::Relaxed),
            srs_rejected: c
                .srs_rejected
                .iter()
                .map(|n| n.load(Ordering::Relaxed))
                .sum(),
            srs_rejected_prohibit: self.srs_rejected_for(SrsRejectCause::ProhibitWindow),
            srs_rejected_collision: self.srs_rejected_for(SrsRejectCause::ResourceCollision),
        }
    }
}

impl SchedulerEventNotifier for SchedMetricsRecorder {
    fn on_slot_indication(&mut self, _slot: SlotPoint) {
        self.counters.slots.fetch_add(1, Ordering::Relaxed);
    }

    fn on_ssb_scheduled(&mut self, _slot: SlotPoint, nof_ssbs: usize) {
        self.counters
            .ssbs
            .fetch_add(nof_ssbs as u64, Ordering::Relaxed);
    }

    fn on_srs_allocated(&mut self, _slot: SlotPoint, _ue_index: u16, _info: AperiodicSrsAllocInfo) {
        self.counters.srs_allocated.fetch_add(1, Ordering::Relaxed);
    }

    fn on_srs_rejected(&mut self, _slot: SlotPoint, _ue_index: u16, cause: SrsRejectCause) {
        self.counters.srs_rejected[reject_cause_index(cause)].fetch_add(1, Ordering::Relaxed);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
