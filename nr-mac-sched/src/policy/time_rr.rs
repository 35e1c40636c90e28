/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time-domain round-robin policy: least recently served first.

use crate::config::CellConfiguration;
use crate::slot::SlotPoint;

use super::rate::RateEstimator;
use super::ue::{NewTxGrant, UeNewTxCandidate};
use super::{FORBID_PRIORITY, MAX_PRIORITY};

/// Grant-round bookkeeping for one direction.
#[derive(Debug, Default)]
struct ServiceLog {
    round: u64,
    last_served: Vec<Option<u64>>,
}

impl ServiceLog {
    fn record(&mut self, grants: &[NewTxGrant], members: &[bool]) {
        if grants.is_empty() {
            return;
        }
        self.round += 1;
        for grant in grants {
            let idx = grant.ue_index as usize;
            if members.get(idx).copied().unwrap_or(false) {
                self.last_served[idx] = Some(self.round);
            }
        }
    }

    fn priority(&self, ue_index: u16) -> f64 {
        match self.last_served.get(ue_index as usize).copied().flatten() {
            None => MAX_PRIORITY,
            Some(last) => (self.round - last) as f64,
        }
    }

    fn reset(&mut self, ue_index: u16) {
        let idx = ue_index as usize;
        if self.last_served.len() <= idx {
            self.last_served.resize(idx + 1, None);
        }
        self.last_served[idx] = None;
    }
}

#[derive(Debug)]
pub struct TimeRrPolicy {
    rate: RateEstimator,
    members: Vec<bool>,
    dl: ServiceLog,
    ul: ServiceLog,
}

impl TimeRrPolicy {
    pub fn new(cell: &CellConfiguration) -> Self {
        Self {
            rate: RateEstimator::new(cell),
            members: Vec::new(),
            dl: ServiceLog::default(),
            ul: ServiceLog::default(),
        }
    }

    /// # Panics
    /// Panics if the UE was already added.
    pub fn add_ue(&mut self, ue_index: u16) {
        let idx = ue_index as usize;
        if self.members.len() <= idx {
            self.members.resize(idx + 1, false);
        }
        assert!(!self.members[idx], "UE={ue_index} was already added");
        self.members[idx] = true;
        self.dl.reset(ue_index);
        self.ul.reset(ue_index);
    }

    /// # Panics
    /// Panics if the UE was not added.
    pub fn rem_ue(&mut self, ue_index: u16) {
        let idx = ue_index as usize;
        assert!(
            self.members.get(idx).copied().unwrap_or(false),
            "UE={ue_index} was not added"
        );
        self.members[idx] = false;
    }

    pub fn compute_dl_priorities(
        &self,
        _pdcch_slot: SlotPoint,
        _pdsch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        for candidate in candidates.iter_mut() {
            let ue = candidate.ue;
            candidate.priority = if self.rate.estimate_max_dl_tbs(ue.dl_mcs, ue.dl_layers) == 0 {
                FORBID_PRIORITY
            } else {
                self.dl.priority(ue.ue_index)
            };
        }
    }

    pub fn compute_ul_priorities(
        &self,
        _pdcch_slot: SlotPoint,
        _pusch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        for candidate in candidates.iter_mut() {
            let ue = candidate.ue;
            candidate.priority = if self.rate.estimate_max_ul_tbs(ue.ul_mcs, ue.ul_layers) == 0 {
                FORBID_PRIORITY
            } else {
                self.ul.priority(ue.ue_index)
            };
        }
    }

    pub fn save_dl_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        self.dl.record(grants, &self.members);
    }

    pub fn save_ul_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        self.ul.record(grants, &self.members);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ue::UeSchedInput;

    fn slot() -> SlotPoint {
        SlotPoint::new(0, 0)
    }

    fn dl_priorities(p: &TimeRrPolicy, ues: &[UeSchedInput]) -> Vec<f64> {
        let mut candidates: Vec<_> = ues.iter().map(UeNewTxCandidate::new).collect();
        p.compute_dl_priorities(slot(), slot(), &mut candidates);
        candidates.iter().map(|c| c.priority).collect()
    }

    fn serve(p: &mut TimeRrPolicy, ue_index: u16) {
        p.save_dl_newtx_grants(&[NewTxGrant {
            ue_index,
            tb_bytes: 1000,
        }]);
    }

    #[test]
    fn least_recently_served_ranks_first() {
        let mut p = TimeRrPolicy::new(&CellConfiguration::default_fdd());
        let ues: Vec<_> = (0..3).map(|i| UeSchedInput::new(i, 10)).collect();
        for ue in &ues {
            p.add_ue(ue.ue_index);
        }
        assert!(dl_priorities(&p, &ues).iter().all(|prio| *prio == MAX_PRIORITY));

        serve(&mut p, 0);
        serve(&mut p, 1);
        serve(&mut p, 2);
        let prio = dl_priorities(&p, &ues);
        assert!(prio[0] > prio[1]);
        assert!(prio[1] > prio[2]);

        serve(&mut p, 0);
        let prio = dl_priorities(&p, &ues);
        assert!(prio[1] > prio[2]);
        assert!(prio[2] > prio[0]);
    }

    #[test]
    fn unserved_ue_beats_served_and_forbidden_is_lowest() {
        let mut p = TimeRrPolicy::new(&CellConfiguration::default_fdd());
        p.add_ue(0);
        p.add_ue(1);
        serve(&mut p, 0);
        let mut no_cqi = UeSchedInput::new(1, 10);
        no_cqi.dl_mcs = None;
        let prio = dl_priorities(&p, &[UeSchedInput::new(0, 10), UeSchedInput::new(1, 10), no_cqi]);
        assert_eq!(prio[1], MAX_PRIORITY);
        assert!(prio[0] < MAX_PRIORITY);
        assert_eq!(prio[2], FORBID_PRIORITY);
    }

    #[test]
    fn readmitted_ue_starts_unserved() {
        let mut p = TimeRrPolicy::new(&CellConfiguration::default_fdd());
        p.add_ue(4);
        serve(&mut p, 4);
        p.rem_ue(4);
        p.add_ue(4);
        assert_eq!(dl_priorities(&p, &[UeSchedInput::new(4, 10)]), [MAX_PRIORITY]);
    }

    #[test]
    fn empty_grant_list_does_not_advance_rounds() {
        let mut p = TimeRrPolicy::new(&CellConfiguration::default_fdd());
        p.add_ue(0);
        serve(&mut p, 0);
        let before = dl_priorities(&p, &[UeSchedInput::new(0, 10)]);
        p.save_dl_newtx_grants(&[]);
        assert_eq!(dl_priorities(&p, &[UeSchedInput::new(0, 10)]), before);
    }

    #[test]
    #[should_panic(expected = "was already added")]
    fn double_add_panics() {
        let mut p = TimeRrPolicy::new(&CellConfiguration::default_fdd());
        p.add_ue(0);
        p.add_ue(0);
    }
}
