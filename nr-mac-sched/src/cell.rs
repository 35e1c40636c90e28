/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-cell slot driver.
//!
//! [`CellScheduler`] owns every per-cell structure (resource grid ring, SSB
//! scheduler, SRS allocator, scheduler policy and UE table) and sequences
//! them within a slot:
//!
//! ```text
//! slot_indication ─► grid advance ─► SRS ledger ─► SSB placement ─► notifier
//!       │
//!       ├─► allocate_aperiodic_srs   (per UE, optional)
//!       ├─► compute_{dl,ul}_priorities
//!       ├─► grid_mut()               (external grant selection fills the grid)
//!       └─► save_{dl,ul}_newtx_grants
//! ```
//!
//! One instance per cell, driven from a single thread.  The type is `Send`
//! so separate cells may run on separate threads.  In debug builds the
//! in-slot ordering above is asserted.

use tracing::{debug, info, trace};

use crate::config::{CellConfiguration, ConfigError, SrsResourceConfig, SsbConfiguration, UeConfig};
use crate::grid::ResourceGridRing;
use crate::notifier::SchedulerEventNotifier;
use crate::policy::{NewTxGrant, SchedulerPolicy, UeNewTxCandidate};
use crate::slot::SlotPoint;
use crate::srs::{AperiodicSrsAllocInfo, SrsAllocator};
use crate::ssb::SsbScheduler;

/// Size of the per-cell UE table.
pub const MAX_NOF_UES: usize = 1024;

/// Position inside the current slot's processing sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SlotPhase {
    /// No slot indicated yet.
    Idle,
    /// Grid advanced and SSBs placed; SRS attempts allowed.
    Started,
    /// Priorities computed; no more SRS attempts in this slot.
    Priorities,
    /// Grant history saved.
    History,
}

#[derive(Debug, Clone)]
struct UeEntry {
    srs: Option<SrsResourceConfig>,
}

pub struct CellScheduler {
    cfg: CellConfiguration,
    grid: ResourceGridRing,
    ssb: SsbScheduler,
    srs: SrsAllocator,
    policy: SchedulerPolicy,
    ues: Vec<Option<UeEntry>>,
    nof_ues: usize,
    notifier: Box<dyn SchedulerEventNotifier + Send>,
    phase: SlotPhase,
}

impl CellScheduler {
    /// Validates `cfg` and builds every per-cell structure.
    pub fn new(
        cfg: CellConfiguration,
        notifier: Box<dyn SchedulerEventNotifier + Send>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let grid = ResourceGridRing::new(cfg.max_lookahead, cfg.srs.max_srs_per_slot);
        let ssb = SsbScheduler::new(cfg.ssb.clone(), &cfg);
        let srs = SrsAllocator::new(&cfg, cfg.srs.prohibit_time);
        let policy = SchedulerPolicy::new(&cfg.policy, &cfg);

        info!(
            pci = cfg.pci,
            scs = %cfg.scs_common,
            dl_arfcn = cfg.dl_arfcn,
            nof_dl_crbs = cfg.nof_dl_crbs,
            nof_ul_crbs = cfg.nof_ul_crbs,
            duplex = if cfg.paired_spectrum() { "FDD" } else { "TDD" },
            max_lookahead = cfg.max_lookahead,
            ring_size = grid.ring_size(),
            srs_enabled = srs.is_enabled(),
            policy = policy.name(),
            "Cell scheduler created"
        );

        Ok(Self {
            cfg,
            grid,
            ssb,
            srs,
            policy,
            ues: vec![None; MAX_NOF_UES],
            nof_ues: 0,
            notifier,
            phase: SlotPhase::Idle,
        })
    }

    pub fn config(&self) -> &CellConfiguration {
        &self.cfg
    }

    pub fn policy(&self) -> &SchedulerPolicy {
        &self.policy
    }

    pub fn ssb_scheduler(&self) -> &SsbScheduler {
        &self.ssb
    }

    pub fn srs_allocator(&self) -> &SrsAllocator {
        &self.srs
    }

    pub fn nof_ues(&self) -> usize {
        self.nof_ues
    }

    pub fn contains_ue(&self, ue_index: u16) -> bool {
        self.ues
            .get(ue_index as usize)
            .is_some_and(|entry| entry.is_some())
    }

    // ── UE management ─────────────────────────────────────────────────────────

    /// Admits a UE.  Its SRS resource, if any, is validated against the cell.
    pub fn add_ue(
        &mut self,
        ue_index: u16,
        srs: Option<SrsResourceConfig>,
    ) -> Result<(), ConfigError> {
        let ue = UeConfig { ue_index, srs };
        self.cfg.validate_ue(&ue)?;
        if self.contains_ue(ue_index) {
            return Err(ConfigError::DuplicateUeIndex(ue_index));
        }

        self.policy.add_ue(ue_index);
        self.ues[ue_index as usize] = Some(UeEntry { srs: ue.srs });
        self.nof_ues += 1;
        debug!(pci = self.cfg.pci, ue_index, nof_ues = self.nof_ues, "UE added");
        Ok(())
    }

    /// Removes a UE and drops its history.
    ///
    /// # Panics
    /// Panics if the UE is not in the table.
    pub fn rem_ue(&mut self, ue_index: u16) {
        assert!(self.contains_ue(ue_index), "UE={ue_index} was not added");
        self.policy.rem_ue(ue_index);
        self.ues[ue_index as usize] = None;
        self.nof_ues -= 1;
        debug!(pci = self.cfg.pci, ue_index, nof_ues = self.nof_ues, "UE removed");
    }

    // ── Slot processing ───────────────────────────────────────────────────────

    /// Starts a new slot.  Slots must be indicated without gaps.
    pub fn slot_indication(&mut self, slot: SlotPoint) {
        self.grid.slot_indication(slot);
        self.srs.slot_indication(slot);
        let nof_ssbs = self.ssb.run_slot(&mut self.grid);

        self.notifier.on_slot_indication(slot);
        if nof_ssbs > 0 {
            self.notifier.on_ssb_scheduled(slot, nof_ssbs);
        }
        self.phase = SlotPhase::Started;
    }

    /// Current slot of the grid.
    ///
    /// # Panics
    /// Panics before the first slot indication.
    pub fn slot(&self) -> SlotPoint {
        self.grid.slot()
    }

    /// Tries to allocate the UE's aperiodic SRS with the current slot as the
    /// decision slot.  `last_srs_slot` is the UE's previous SRS transmission
    /// slot, tracked by the caller.
    ///
    /// # Panics
    /// Panics if the UE is not in the table.
    pub fn allocate_aperiodic_srs(
        &mut self,
        ue_index: u16,
        last_srs_slot: Option<SlotPoint>,
    ) -> AperiodicSrsAllocInfo {
        debug_assert!(
            self.phase == SlotPhase::Started,
            "SRS allocation outside the SRS phase ({:?})",
            self.phase
        );
        let Some(Some(entry)) = self.ues.get(ue_index as usize) else {
            panic!("UE={ue_index} was not added");
        };
        let Some(res) = entry.srs.as_ref() else {
            trace!(ue_index, "UE has no aperiodic SRS resource");
            return AperiodicSrsAllocInfo::NO_OP;
        };

        let slot = self.grid.slot();
        match self.srs.allocate_detailed(&mut self.grid, ue_index, last_srs_slot, res) {
            Ok(info) => {
                self.notifier.on_srs_allocated(slot, ue_index, info);
                info
            }
            Err(cause) => {
                self.notifier.on_srs_rejected(slot, ue_index, cause);
                AperiodicSrsAllocInfo::NO_OP
            }
        }
    }

    /// DL priorities for a PDSCH at `pdsch_slot`, decided in the current slot.
    pub fn compute_dl_priorities(
        &mut self,
        pdsch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        self.enter_priority_phase();
        self.policy
            .compute_dl_priorities(self.grid.slot(), pdsch_slot, candidates);
    }

    /// UL priorities for a PUSCH at `pusch_slot`, decided in the current slot.
    pub fn compute_ul_priorities(
        &mut self,
        pusch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        self.enter_priority_phase();
        self.policy
            .compute_ul_priorities(self.grid.slot(), pusch_slot, candidates);
    }

    pub fn grid(&self) -> &ResourceGridRing {
        &self.grid
    }

    /// Mutable grid access for the external grant selector.
    pub fn grid_mut(&mut self) -> &mut ResourceGridRing {
        &mut self.grid
    }

    pub fn save_dl_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        self.enter_history_phase();
        self.policy.save_dl_newtx_grants(grants);
    }

    pub fn save_ul_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        self.enter_history_phase();
        self.policy.save_ul_newtx_grants(grants);
    }

    fn enter_priority_phase(&mut self) {
        debug_assert!(
            self.phase != SlotPhase::Idle,
            "priorities computed before the first slot indication"
        );
        self.phase = self.phase.max(SlotPhase::Priorities);
    }

    fn enter_history_phase(&mut self) {
        debug_assert!(
            self.phase != SlotPhase::Idle,
            "grants saved before the first slot indication"
        );
        self.phase = SlotPhase::History;
    }

    // ── Reconfiguration ───────────────────────────────────────────────────────

    /// Replaces the SSB configuration.  The new scheduler starts cold: the
    /// next slot indication fills every slot of the window that does not
    /// already carry SSBs.
    pub fn reconfigure_ssb(&mut self, ssb: SsbConfiguration) -> Result<(), ConfigError> {
        let mut cfg = self.cfg.clone();
        cfg.ssb = ssb;
        cfg.validate()?;

        self.ssb.stop();
        self.ssb = SsbScheduler::new(cfg.ssb.clone(), &cfg);
        info!(
            pci = cfg.pci,
            periodicity_ms = cfg.ssb.periodicity_ms,
            beam_bitmap = cfg.ssb.beam_bitmap,
            case = ?cfg.ssb.case,
            "SSB configuration replaced"
        );
        self.cfg = cfg;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CrbInterval, DataGrant, GrantInfo, OfdmSymbolRange};
    use crate::notifier::{NullNotifier, SchedMetricsRecorder};
    use crate::policy::{UeSchedInput, FORBID_PRIORITY, MAX_PRIORITY};
    use crate::ssb::{SsbPatternCase, SsbSchedulerState};

    fn slot(count: u32) -> SlotPoint {
        SlotPoint::new(0, count)
    }

    fn cell_with_srs(prohibit_time: u32) -> CellConfiguration {
        let mut cfg = CellConfiguration::default_fdd();
        cfg.srs.prohibit_time = Some(prohibit_time);
        cfg
    }

    fn scheduler(cfg: CellConfiguration) -> (CellScheduler, SchedMetricsRecorder) {
        let metrics = SchedMetricsRecorder::new();
        let sched = CellScheduler::new(cfg, Box::new(metrics.clone())).unwrap();
        (sched, metrics)
    }

    /// Indicates every slot in `[from, to]`.
    fn run_until(sched: &mut CellScheduler, from: u32, to: u32) {
        for count in from..=to {
            sched.slot_indication(slot(count));
        }
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut cfg = CellConfiguration::default_fdd();
        cfg.max_lookahead = 0;
        assert!(matches!(
            CellScheduler::new(cfg, Box::new(NullNotifier)),
            Err(ConfigError::InvalidLookahead(0))
        ));
    }

    #[test]
    fn ssb_broadcast_twice_in_forty_slots() {
        let mut cfg = CellConfiguration::default_fdd();
        cfg.ssb.periodicity_ms = 20;
        cfg.ssb.beam_bitmap = 0b1;
        cfg.ssb.case = SsbPatternCase::A;
        let (mut sched, _) = scheduler(cfg);

        let mut seen = Vec::new();
        for count in 0..40 {
            sched.slot_indication(slot(count));
            for ssb in sched.grid().at(0).ssbs() {
                seen.push((count, ssb.ssb_index, ssb.symbols));
            }
        }
        assert_eq!(
            seen,
            vec![
                (0, 0, OfdmSymbolRange::new(2, 6)),
                (20, 0, OfdmSymbolRange::new(2, 6)),
            ]
        );
    }

    #[test]
    fn srs_prohibit_window_is_enforced() {
        let (mut sched, metrics) = scheduler(cell_with_srs(80));
        sched.add_ue(0, Some(SrsResourceConfig::new(0, 0, 25))).unwrap();

        run_until(&mut sched, 0, 100);
        let first = sched.allocate_aperiodic_srs(0, None);
        assert!(first.is_allocated());
        let last = sched.slot() + first.slot_offset;

        run_until(&mut sched, 101, 150);
        assert!(!sched.allocate_aperiodic_srs(0, Some(last)).is_allocated());

        run_until(&mut sched, 151, 181);
        assert!(sched.allocate_aperiodic_srs(0, Some(last)).is_allocated());

        let snap = metrics.snapshot();
        assert_eq!(snap.srs_allocated, 2);
        assert_eq!(snap.srs_rejected_prohibit, 1);
        assert_eq!(snap.slots, 182);
    }

    #[test]
    fn srs_resource_ids_are_exclusive_per_slot() {
        let (mut sched, metrics) = scheduler(cell_with_srs(20));
        sched.add_ue(0, Some(SrsResourceConfig::new(3, 2, 10))).unwrap();
        sched.add_ue(1, Some(SrsResourceConfig::new(4, 2, 10))).unwrap();
        sched.add_ue(2, Some(SrsResourceConfig::new(3, 2, 10))).unwrap();
        sched.slot_indication(slot(10));

        assert!(sched.allocate_aperiodic_srs(0, None).is_allocated());
        assert!(sched.allocate_aperiodic_srs(1, None).is_allocated());
        assert_eq!(
            sched.allocate_aperiodic_srs(2, None),
            AperiodicSrsAllocInfo::NO_OP
        );
        assert_eq!(sched.grid().at(2).srss().len(), 2);
        assert_eq!(metrics.snapshot().srs_rejected_collision, 1);
    }

    #[test]
    fn ue_without_srs_resource_gets_no_op() {
        let (mut sched, metrics) = scheduler(cell_with_srs(20));
        sched.add_ue(5, None).unwrap();
        sched.slot_indication(slot(0));
        assert!(!sched.allocate_aperiodic_srs(5, None).is_allocated());
        assert_eq!(metrics.snapshot().srs_rejected, 0);
    }

    #[test]
    fn ue_admission_is_validated() {
        let (mut sched, _) = scheduler(cell_with_srs(20));
        assert_eq!(
            sched.add_ue(MAX_NOF_UES as u16, None),
            Err(ConfigError::UeIndexOutOfRange(MAX_NOF_UES as u16))
        );
        sched.add_ue(1, None).unwrap();
        assert_eq!(sched.add_ue(1, None), Err(ConfigError::DuplicateUeIndex(1)));
        let too_far = SrsResourceConfig::new(0, 100, 10);
        assert!(matches!(
            sched.add_ue(2, Some(too_far)),
            Err(ConfigError::SrsSlotOffsetBeyondLookahead { .. })
        ));
        assert_eq!(sched.nof_ues(), 1);
    }

    #[test]
    fn sentinel_priorities_and_history_round_trip() {
        let (mut sched, _) = scheduler(CellConfiguration::default_fdd());
        sched.add_ue(0, None).unwrap();
        sched.add_ue(1, None).unwrap();
        sched.slot_indication(slot(0));

        let ue0 = UeSchedInput::new(0, 20);
        let mut ue1 = UeSchedInput::new(1, 20);
        ue1.dl_mcs = None;
        let mut candidates = [UeNewTxCandidate::new(&ue0), UeNewTxCandidate::new(&ue1)];
        sched.compute_dl_priorities(slot(0), &mut candidates);
        assert_eq!(candidates[0].priority, MAX_PRIORITY);
        assert_eq!(candidates[1].priority, FORBID_PRIORITY);

        let grant = DataGrant {
            ue_index: 0,
            grant: GrantInfo::new(OfdmSymbolRange::new(2, 14), CrbInterval::new(0, 106)),
            tb_bytes: 4000,
        };
        // Slot 0 carries the SSB; the next slot is free.
        assert!(!sched.grid_mut().at_mut(0).try_add_dl_grant(grant));
        assert!(sched.grid_mut().at_mut(1).try_add_dl_grant(grant));
        sched.save_dl_newtx_grants(&[NewTxGrant {
            ue_index: 0,
            tb_bytes: 4000,
        }]);

        sched.slot_indication(slot(1));
        sched.compute_dl_priorities(slot(1), &mut candidates);
        assert!(candidates[0].priority < MAX_PRIORITY);
        assert!(candidates[0].priority > FORBID_PRIORITY);
    }

    #[test]
    fn removed_ue_is_readmitted_with_fresh_history() {
        let (mut sched, _) = scheduler(CellConfiguration::default_fdd());
        sched.add_ue(3, None).unwrap();
        sched.slot_indication(slot(0));
        sched.save_dl_newtx_grants(&[NewTxGrant {
            ue_index: 3,
            tb_bytes: 1000,
        }]);
        sched.rem_ue(3);
        assert!(!sched.contains_ue(3));
        sched.add_ue(3, None).unwrap();

        sched.slot_indication(slot(1));
        let ue = UeSchedInput::new(3, 10);
        let mut candidates = [UeNewTxCandidate::new(&ue)];
        sched.compute_dl_priorities(slot(1), &mut candidates);
        assert_eq!(candidates[0].priority, MAX_PRIORITY);
    }

    #[test]
    fn ssb_reconfiguration_restarts_cold() {
        let (mut sched, metrics) = scheduler(CellConfiguration::default_fdd());
        run_until(&mut sched, 0, 5);
        // Cold start covers slots 0 and 10, steady state reaches slot 20.
        assert_eq!(metrics.snapshot().ssbs, 3);

        let mut ssb = sched.config().ssb.clone();
        ssb.beam_bitmap = 0b11;
        sched.reconfigure_ssb(ssb).unwrap();
        assert_eq!(sched.ssb_scheduler().state(), SsbSchedulerState::ColdStart);
        assert_eq!(sched.config().ssb.beam_bitmap, 0b11);

        sched.slot_indication(slot(6));
        assert_eq!(sched.ssb_scheduler().state(), SsbSchedulerState::SteadyState);

        // Slots 10 and 20 were placed before the change and keep one SSB.
        run_until(&mut sched, 7, 10);
        assert_eq!(sched.grid().at(0).ssbs().len(), 1);
        run_until(&mut sched, 11, 20);
        assert_eq!(sched.grid().at(0).ssbs().len(), 1);
        run_until(&mut sched, 21, 30);
        assert_eq!(sched.grid().at(0).ssbs().len(), 2);
    }

    #[test]
    fn invalid_ssb_reconfiguration_keeps_previous_config() {
        let (mut sched, _) = scheduler(CellConfiguration::default_fdd());
        let mut ssb = sched.config().ssb.clone();
        ssb.periodicity_ms = 15;
        assert_eq!(
            sched.reconfigure_ssb(ssb),
            Err(ConfigError::InvalidSsbPeriodicity(15))
        );
        assert_eq!(sched.config().ssb.periodicity_ms, 10);
    }

    #[test]
    #[should_panic(expected = "Detected a skipped slot")]
    fn skipped_slot_panics() {
        let (mut sched, _) = scheduler(CellConfiguration::default_fdd());
        sched.slot_indication(slot(0));
        sched.slot_indication(slot(2));
    }

    #[test]
    fn cell_scheduler_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CellScheduler>();
    }
}
