/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Priority engine and policy selection.
//!
//! A [`SchedulerPolicy`] ranks newTx candidates each slot.  It does not pick
//! winners or touch the resource grid: an external selector consumes the
//! priorities, fills the grid, and reports the committed grants back through
//! `save_dl_newtx_grants` / `save_ul_newtx_grants`.
//!
//! Two variants are available, chosen once per cell from [`PolicyConfig`]:
//!
//! | Config `type` | Variant          | Ranking                              |
//! |---------------|------------------|--------------------------------------|
//! | `time_qos`    | [`TimeQosPolicy`]| PF × GBR × QoS priority × HOL delay  |
//! | `time_rr`     | [`TimeRrPolicy`] | least recently served first          |
//!
//! Both use the [`FORBID_PRIORITY`] / [`MAX_PRIORITY`] sentinels for
//! candidates with nothing deliverable or never served.

pub mod history;
pub mod rate;
pub mod time_qos;
pub mod time_rr;
pub mod ue;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::error::ConfigError;
use crate::config::CellConfiguration;
use crate::slot::SlotPoint;

pub use time_qos::TimeQosPolicy;
pub use time_rr::TimeRrPolicy;
pub use ue::{GbrQosInfo, LcQos, LogicalChannel, NewTxGrant, UeNewTxCandidate, UeSchedInput};

/// Priority of a candidate that must not be scheduled.
pub const FORBID_PRIORITY: f64 = f64::MIN;

/// Priority of a candidate that must be scheduled first.
pub const MAX_PRIORITY: f64 = f64::MAX;

// ── Configuration ─────────────────────────────────────────────────────────────

/// How the time_qos weights are folded into one priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineFunction {
    /// Product of all weights, with the PF weight floored at 1.0 for UEs
    /// whose GBR bearers are behind their guaranteed rate.
    #[default]
    GbrPrioritized,
    /// Plain product of all weights.
    Multiplication,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeQosConfig {
    pub pf_fairness_coeff: f64,
    pub priority_enabled: bool,
    pub gbr_enabled: bool,
    pub pdb_enabled: bool,
    pub combine_function: CombineFunction,
}

impl Default for TimeQosConfig {
    fn default() -> Self {
        Self {
            pf_fairness_coeff: 2.0,
            priority_enabled: true,
            gbr_enabled: true,
            pdb_enabled: true,
            combine_function: CombineFunction::GbrPrioritized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    TimeQos(TimeQosConfig),
    TimeRr,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::TimeQos(TimeQosConfig::default())
    }
}

impl PolicyConfig {
    pub fn name(&self) -> &'static str {
        match self {
            PolicyConfig::TimeQos(_) => "time_qos",
            PolicyConfig::TimeRr => "time_rr",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            PolicyConfig::TimeQos(qos) => {
                let coeff = qos.pf_fairness_coeff;
                if !coeff.is_finite() || coeff < 0.0 {
                    return Err(ConfigError::InvalidFairnessCoeff(coeff));
                }
                Ok(())
            }
            PolicyConfig::TimeRr => Ok(()),
        }
    }
}

// ── SchedulerPolicy ───────────────────────────────────────────────────────────

/// The policy a cell runs, fixed at construction.
#[derive(Debug)]
pub enum SchedulerPolicy {
    TimeQos(TimeQosPolicy),
    TimeRr(TimeRrPolicy),
}

impl SchedulerPolicy {
    pub fn new(config: &PolicyConfig, cell: &CellConfiguration) -> Self {
        let policy = match config {
            PolicyConfig::TimeQos(params) => {
                SchedulerPolicy::TimeQos(TimeQosPolicy::new(*params, cell))
            }
            PolicyConfig::TimeRr => SchedulerPolicy::TimeRr(TimeRrPolicy::new(cell)),
        };
        info!(pci = cell.pci, policy = config.name(), "Scheduler policy selected");
        policy
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchedulerPolicy::TimeQos(_) => "time_qos",
            SchedulerPolicy::TimeRr(_) => "time_rr",
        }
    }

    pub fn add_ue(&mut self, ue_index: u16) {
        match self {
            SchedulerPolicy::TimeQos(p) => p.add_ue(ue_index),
            SchedulerPolicy::TimeRr(p) => p.add_ue(ue_index),
        }
    }

    pub fn rem_ue(&mut self, ue_index: u16) {
        match self {
            SchedulerPolicy::TimeQos(p) => p.rem_ue(ue_index),
            SchedulerPolicy::TimeRr(p) => p.rem_ue(ue_index),
        }
    }

    /// Writes a DL priority into every candidate.
    pub fn compute_dl_priorities(
        &self,
        pdcch_slot: SlotPoint,
        pdsch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        match self {
            SchedulerPolicy::TimeQos(p) => {
                p.compute_dl_priorities(pdcch_slot, pdsch_slot, candidates)
            }
            SchedulerPolicy::TimeRr(p) => {
                p.compute_dl_priorities(pdcch_slot, pdsch_slot, candidates)
            }
        }
    }

    /// Writes a UL priority into every candidate.
    pub fn compute_ul_priorities(
        &self,
        pdcch_slot: SlotPoint,
        pusch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        match self {
            SchedulerPolicy::TimeQos(p) => {
                p.compute_ul_priorities(pdcch_slot, pusch_slot, candidates)
            }
            SchedulerPolicy::TimeRr(p) => {
                p.compute_ul_priorities(pdcch_slot, pusch_slot, candidates)
            }
        }
    }

    pub fn save_dl_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        match self {
            SchedulerPolicy::TimeQos(p) => p.save_dl_newtx_grants(grants),
            SchedulerPolicy::TimeRr(p) => p.save_dl_newtx_grants(grants),
        }
    }

    pub fn save_ul_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        match self {
            SchedulerPolicy::TimeQos(p) => p.save_ul_newtx_grants(grants),
            SchedulerPolicy::TimeRr(p) => p.save_ul_newtx_grants(grants),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
