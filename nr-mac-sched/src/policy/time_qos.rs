/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Time-domain QoS-aware proportional-fair policy.
//!
//! Each candidate's priority is the product of four weights:
//!
//! | Weight  | Source                                                   |
//! |---------|----------------------------------------------------------|
//! | PF      | deliverable bytes over historical average rate           |
//! | GBR     | Σ guaranteed rate / served rate over pending GBR LCs     |
//! | prio    | best 5QI × ARP priority over pending QoS LCs             |
//! | delay   | Σ head-of-line delay / packet delay budget (DL only)     |
//!
//! Disabled or zero weights collapse to 1.0.  Degenerate inputs map to the
//! sentinels [`FORBID_PRIORITY`] (nothing deliverable) and [`MAX_PRIORITY`]
//! (never served, or UL scheduling request pending).

use crate::config::CellConfiguration;
use crate::slot::SlotPoint;

use super::history::UeHistoryRepository;
use super::rate::RateEstimator;
use super::ue::{NewTxGrant, UeNewTxCandidate, UeSchedInput};
use super::{CombineFunction, TimeQosConfig, FORBID_PRIORITY, MAX_PRIORITY};

/// Fairness coefficients at or above this value degenerate to `1 / avg`.
pub const MAX_PF_COEFF: f64 = 10.0;

/// Upper bound of a single PF or GBR term.
pub const MAX_METRIC_WEIGHT: f64 = 1e12;

const MAX_QOS_PRIORITY: f64 = 127.0;
const MAX_ARP_PRIORITY: f64 = 15.0;
const MAX_COMBINED_PRIORITY: f64 = MAX_QOS_PRIORITY * MAX_ARP_PRIORITY;

// ── Weights ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct PriorityWeights {
    pf: f64,
    gbr: f64,
    prio: f64,
    delay: f64,
}

impl PriorityWeights {
    fn combine(self, function: CombineFunction) -> f64 {
        let mut pf = self.pf;
        if function == CombineFunction::GbrPrioritized && self.gbr > 1.0 {
            // A UE below its guaranteed rate is never outranked on PF alone.
            pf = pf.max(1.0);
        }
        self.gbr * pf * self.prio * self.delay
    }
}

fn compute_pf_metric(estim_rate: f64, avg_rate: f64, fairness_coeff: f64) -> f64 {
    if estim_rate > 0.0 && avg_rate != 0.0 {
        if fairness_coeff >= MAX_PF_COEFF {
            1.0 / avg_rate
        } else {
            estim_rate / avg_rate.powf(fairness_coeff)
        }
    } else if avg_rate == 0.0 {
        MAX_METRIC_WEIGHT
    } else {
        0.0
    }
}

fn combined_priority_weight(enabled: bool, min_combined_prio: f64) -> f64 {
    if enabled {
        (MAX_COMBINED_PRIORITY + 1.0 - min_combined_prio) / (MAX_COMBINED_PRIORITY + 1.0)
    } else {
        1.0
    }
}

fn or_neutral(enabled: bool, weight: f64) -> f64 {
    if enabled && weight != 0.0 {
        weight
    } else {
        1.0
    }
}

// ── Policy ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct TimeQosPolicy {
    params: TimeQosConfig,
    rate: RateEstimator,
    history: UeHistoryRepository,
}

impl TimeQosPolicy {
    pub fn new(params: TimeQosConfig, cell: &CellConfiguration) -> Self {
        Self {
            params,
            rate: RateEstimator::new(cell),
            history: UeHistoryRepository::new(),
        }
    }

    pub fn params(&self) -> &TimeQosConfig {
        &self.params
    }

    pub fn history(&self) -> &UeHistoryRepository {
        &self.history
    }

    pub fn add_ue(&mut self, ue_index: u16) {
        self.history.add_ue(ue_index);
    }

    pub fn rem_ue(&mut self, ue_index: u16) {
        self.history.rem_ue(ue_index);
    }

    pub fn compute_dl_priorities(
        &self,
        pdcch_slot: SlotPoint,
        _pdsch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        for candidate in candidates.iter_mut() {
            candidate.priority = self.compute_dl_prio(candidate.ue, pdcch_slot);
        }
    }

    pub fn compute_ul_priorities(
        &self,
        _pdcch_slot: SlotPoint,
        _pusch_slot: SlotPoint,
        candidates: &mut [UeNewTxCandidate<'_>],
    ) {
        for candidate in candidates.iter_mut() {
            candidate.priority = self.compute_ul_prio(candidate.ue);
        }
    }

    pub fn save_dl_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        self.history.save_dl_newtx_grants(grants);
    }

    pub fn save_ul_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        self.history.save_ul_newtx_grants(grants);
    }

    fn compute_dl_prio(&self, ue: &UeSchedInput, pdcch_slot: SlotPoint) -> f64 {
        let estim = self.rate.estimate_max_dl_tbs(ue.dl_mcs, ue.dl_layers);
        if estim == 0 {
            return FORBID_PRIORITY;
        }
        let avg = self.history.dl_avg_rate(ue.ue_index);
        if avg == 0.0 {
            return MAX_PRIORITY;
        }
        self.dl_weights(ue, pdcch_slot, f64::from(estim), avg)
            .combine(self.params.combine_function)
    }

    fn compute_ul_prio(&self, ue: &UeSchedInput) -> f64 {
        let estim = self.rate.estimate_max_ul_tbs(ue.ul_mcs, ue.ul_layers);
        if estim == 0 {
            return FORBID_PRIORITY;
        }
        let avg = self.history.ul_avg_rate(ue.ue_index);
        if ue.pending_sr || avg == 0.0 {
            return MAX_PRIORITY;
        }
        self.ul_weights(ue, f64::from(estim), avg)
            .combine(self.params.combine_function)
    }

    fn dl_weights(
        &self,
        ue: &UeSchedInput,
        pdcch_slot: SlotPoint,
        estim: f64,
        avg: f64,
    ) -> PriorityWeights {
        let p = &self.params;
        let mut min_combined_prio = MAX_COMBINED_PRIORITY;
        let mut gbr = 0.0;
        let mut delay = 0.0;

        if p.gbr_enabled || p.priority_enabled || p.pdb_enabled {
            for lc in &ue.logical_channels {
                let Some(qos) = lc.qos else { continue };
                if lc.pending_dl_bytes == 0 {
                    continue;
                }

                if p.priority_enabled {
                    let combined = f64::from(qos.qos_priority) * f64::from(qos.arp_priority);
                    min_combined_prio = min_combined_prio.min(combined);
                }

                if p.pdb_enabled && qos.pdb_ms > 0 {
                    if let Some(toa) = lc.dl_hol_toa.filter(|toa| pdcch_slot >= *toa) {
                        let hol_delay_ms =
                            (pdcch_slot - toa) as u32 / pdcch_slot.nof_slots_per_subframe();
                        delay += f64::from(hol_delay_ms) / f64::from(qos.pdb_ms);
                    }
                }

                let Some(gbr_info) = qos.gbr else { continue };
                if p.gbr_enabled {
                    gbr += if lc.dl_avg_bit_rate != 0.0 {
                        (gbr_info.gbr_dl / lc.dl_avg_bit_rate).min(MAX_METRIC_WEIGHT)
                    } else {
                        MAX_METRIC_WEIGHT
                    };
                }
            }
        }

        PriorityWeights {
            pf: compute_pf_metric(estim, avg, p.pf_fairness_coeff),
            gbr: or_neutral(p.gbr_enabled, gbr),
            prio: combined_priority_weight(p.priority_enabled, min_combined_prio),
            delay: or_neutral(p.pdb_enabled, delay),
        }
    }

    fn ul_weights(&self, ue: &UeSchedInput, estim: f64, avg: f64) -> PriorityWeights {
        let p = &self.params;
        let mut min_combined_prio = MAX_COMBINED_PRIORITY;
        let mut gbr = 0.0;

        if p.gbr_enabled || p.priority_enabled {
            for lc in &ue.logical_channels {
                let Some(qos) = lc.qos else { continue };
                if ue.lcg_pending_ul_bytes(lc.lcg) == 0 {
                    continue;
                }

                if p.priority_enabled {
                    let combined = f64::from(qos.qos_priority) * f64::from(qos.arp_priority);
                    min_combined_prio = min_combined_prio.min(combined);
                }

                let Some(gbr_info) = qos.gbr else { continue };
                if p.gbr_enabled {
                    let ul_rate = ue.lcg_ul_avg_bit_rate(lc.lcg);
                    if ul_rate != 0.0 {
                        gbr += (gbr_info.gbr_ul / ul_rate).min(MAX_METRIC_WEIGHT);
                    } else {
                        gbr = MAX_METRIC_WEIGHT;
                    }
                }
            }
        }

        PriorityWeights {
            pf: compute_pf_metric(estim, avg, p.pf_fairness_coeff),
            gbr: or_neutral(p.gbr_enabled, gbr),
            prio: combined_priority_weight(p.priority_enabled, min_combined_prio),
            delay: 1.0,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ue::{GbrQosInfo, LcQos, LogicalChannel};

    fn slot(count: u32) -> SlotPoint {
        SlotPoint::new(0, count)
    }

    fn policy(params: TimeQosConfig) -> TimeQosPolicy {
        TimeQosPolicy::new(params, &CellConfiguration::default_fdd())
    }

    fn plain_params() -> TimeQosConfig {
        TimeQosConfig {
            priority_enabled: false,
            gbr_enabled: false,
            pdb_enabled: false,
            ..TimeQosConfig::default()
        }
    }

    fn dl_priorities(p: &TimeQosPolicy, ues: &[UeSchedInput]) -> Vec<f64> {
        let mut candidates: Vec<_> = ues.iter().map(UeNewTxCandidate::new).collect();
        p.compute_dl_priorities(slot(100), slot(100), &mut candidates);
        candidates.iter().map(|c| c.priority).collect()
    }

    fn ul_priorities(p: &TimeQosPolicy, ues: &[UeSchedInput]) -> Vec<f64> {
        let mut candidates: Vec<_> = ues.iter().map(UeNewTxCandidate::new).collect();
        p.compute_ul_priorities(slot(100), slot(104), &mut candidates);
        candidates.iter().map(|c| c.priority).collect()
    }

    fn grant(ue_index: u16, tb_bytes: u32) -> NewTxGrant {
        NewTxGrant { ue_index, tb_bytes }
    }

    fn qos_lc(qos_priority: u8, arp_priority: u8, gbr: Option<GbrQosInfo>) -> LogicalChannel {
        LogicalChannel {
            pending_dl_bytes: 1000,
            qos: Some(LcQos {
                qos_priority,
                arp_priority,
                pdb_ms: 100,
                gbr,
            }),
            ..LogicalChannel::new(4, 1)
        }
    }

    #[test]
    fn zero_average_rate_gives_max_priority() {
        let mut p = policy(TimeQosConfig::default());
        p.add_ue(0);
        assert_eq!(dl_priorities(&p, &[UeSchedInput::new(0, 10)]), [MAX_PRIORITY]);
    }

    #[test]
    fn nothing_deliverable_is_forbidden_regardless_of_average() {
        let mut p = policy(TimeQosConfig::default());
        p.add_ue(0);
        let mut ue = UeSchedInput::new(0, 10);
        ue.dl_mcs = None;
        assert_eq!(dl_priorities(&p, &[ue.clone()]), [FORBID_PRIORITY]);

        p.save_dl_newtx_grants(&[grant(0, 5000)]);
        assert_eq!(dl_priorities(&p, &[ue]), [FORBID_PRIORITY]);
    }

    #[test]
    fn higher_average_rate_lowers_priority() {
        let mut p = policy(TimeQosConfig::default());
        p.add_ue(0);
        p.add_ue(1);
        p.save_dl_newtx_grants(&[grant(0, 1000), grant(1, 9000)]);
        let prio = dl_priorities(&p, &[UeSchedInput::new(0, 20), UeSchedInput::new(1, 20)]);
        assert!(prio[0] > prio[1]);
    }

    #[test]
    fn better_channel_raises_priority_at_equal_average() {
        let mut p = policy(plain_params());
        p.add_ue(0);
        p.add_ue(1);
        p.save_dl_newtx_grants(&[grant(0, 1000), grant(1, 1000)]);
        let prio = dl_priorities(&p, &[UeSchedInput::new(0, 5), UeSchedInput::new(1, 25)]);
        assert!(prio[1] > prio[0]);
    }

    #[test]
    fn large_fairness_coeff_ignores_channel_quality() {
        let mut p = policy(TimeQosConfig {
            pf_fairness_coeff: MAX_PF_COEFF,
            ..plain_params()
        });
        p.add_ue(0);
        p.save_dl_newtx_grants(&[grant(0, 100)]);
        let avg = p.history().dl_avg_rate(0);
        let prio = dl_priorities(&p, &[UeSchedInput::new(0, 5), UeSchedInput::new(0, 27)]);
        assert!((prio[0] - 1.0 / avg).abs() < 1e-9);
        assert_eq!(prio[0], prio[1]);
    }

    #[test]
    fn better_qos_priority_wins_at_equal_rate() {
        let params = TimeQosConfig {
            priority_enabled: true,
            ..plain_params()
        };
        let mut p = policy(params);
        p.add_ue(0);
        p.add_ue(1);
        p.save_dl_newtx_grants(&[grant(0, 1000), grant(1, 1000)]);

        let mut urgent = UeSchedInput::new(0, 15);
        urgent.logical_channels.push(qos_lc(1, 1, None));
        let mut background = UeSchedInput::new(1, 15);
        background.logical_channels.push(qos_lc(127, 15, None));

        let prio = dl_priorities(&p, &[urgent, background]);
        assert!(prio[0] > prio[1]);
        let ratio = prio[0] / prio[1];
        assert!((ratio - 1905.0).abs() < 1e-6);
    }

    #[test]
    fn lcs_without_pending_bytes_do_not_count() {
        let params = TimeQosConfig {
            priority_enabled: true,
            ..plain_params()
        };
        let mut p = policy(params);
        p.add_ue(0);
        p.save_dl_newtx_grants(&[grant(0, 1000)]);

        let mut idle = UeSchedInput::new(0, 15);
        let mut lc = qos_lc(1, 1, None);
        lc.pending_dl_bytes = 0;
        idle.logical_channels.push(lc);
        let no_lcs = UeSchedInput::new(0, 15);

        let prio = dl_priorities(&p, &[idle, no_lcs]);
        assert_eq!(prio[0], prio[1]);
    }

    #[test]
    fn head_of_line_delay_scales_priority() {
        let params = TimeQosConfig {
            pdb_enabled: true,
            ..plain_params()
        };
        let mut p = policy(params);
        p.add_ue(0);
        p.save_dl_newtx_grants(&[grant(0, 1000)]);

        let base = UeSchedInput::new(0, 15);
        let mut late = UeSchedInput::new(0, 15);
        let mut lc = qos_lc(9, 1, None);
        lc.qos = lc.qos.map(|q| LcQos { pdb_ms: 10, ..q });
        // 20 slots at 15 kHz = 20 ms of a 10 ms budget.
        lc.dl_hol_toa = Some(slot(80));
        late.logical_channels.push(lc.clone());
        let mut future = UeSchedInput::new(0, 15);
        lc.dl_hol_toa = Some(slot(120));
        future.logical_channels.push(lc);

        let prio = dl_priorities(&p, &[base, late, future]);
        assert!((prio[1] / prio[0] - 2.0).abs() < 1e-9);
        assert_eq!(prio[2], prio[0]);
    }

    #[test]
    fn gbr_prioritized_floors_pf_for_starved_gbr_bearers() {
        let gbr_params = TimeQosConfig {
            gbr_enabled: true,
            combine_function: CombineFunction::GbrPrioritized,
            ..plain_params()
        };
        let mut p = policy(gbr_params);
        p.add_ue(0);
        p.save_dl_newtx_grants(&[grant(0, 10_000_000)]);

        let mut ue = UeSchedInput::new(0, 27);
        let mut lc = qos_lc(2, 1, Some(GbrQosInfo {
            gbr_dl: 2000.0,
            gbr_ul: 2000.0,
        }));
        lc.dl_avg_bit_rate = 1000.0;
        ue.logical_channels.push(lc);

        let prio = dl_priorities(&p, std::slice::from_ref(&ue));
        assert!((prio[0] - 2.0).abs() < 1e-9);

        let mut mult = policy(TimeQosConfig {
            combine_function: CombineFunction::Multiplication,
            ..gbr_params
        });
        mult.add_ue(0);
        mult.save_dl_newtx_grants(&[grant(0, 10_000_000)]);
        let prio = dl_priorities(&mult, &[ue]);
        assert!(prio[0] < 1e-4);
    }

    #[test]
    fn unserved_gbr_bearer_outranks_non_gbr_ue() {
        let mut p = policy(TimeQosConfig::default());
        p.add_ue(0);
        p.add_ue(1);
        p.save_dl_newtx_grants(&[grant(0, 1000), grant(1, 1000)]);

        let mut gbr_ue = UeSchedInput::new(0, 15);
        gbr_ue.logical_channels.push(qos_lc(
            2,
            1,
            Some(GbrQosInfo {
                gbr_dl: 1e6,
                gbr_ul: 1e6,
            }),
        ));
        let mut best_effort = UeSchedInput::new(1, 15);
        best_effort.logical_channels.push(qos_lc(9, 1, None));

        let prio = dl_priorities(&p, &[gbr_ue, best_effort]);
        assert!(prio[0] > prio[1] * 1e6);
    }

    #[test]
    fn ul_pending_sr_and_zero_average_give_max_priority() {
        let mut p = policy(TimeQosConfig::default());
        p.add_ue(0);
        assert_eq!(ul_priorities(&p, &[UeSchedInput::new(0, 10)]), [MAX_PRIORITY]);

        p.save_ul_newtx_grants(&[grant(0, 1000)]);
        let mut ue = UeSchedInput::new(0, 10);
        assert!(ul_priorities(&p, &[ue.clone()])[0] < MAX_PRIORITY);
        ue.pending_sr = true;
        assert_eq!(ul_priorities(&p, &[ue.clone()]), [MAX_PRIORITY]);

        ue.ul_mcs = None;
        assert_eq!(ul_priorities(&p, &[ue]), [FORBID_PRIORITY]);
    }

    #[test]
    fn ul_gbr_with_zero_lcg_rate_saturates() {
        let mut p = policy(TimeQosConfig {
            gbr_enabled: true,
            combine_function: CombineFunction::Multiplication,
            ..plain_params()
        });
        p.add_ue(0);
        p.save_ul_newtx_grants(&[grant(0, 1000)]);

        let base = UeSchedInput::new(0, 10);
        let mut gbr_ue = UeSchedInput::new(0, 10);
        gbr_ue.ul_pending_unacked_bytes[1] = 500;
        gbr_ue.logical_channels.push(qos_lc(
            2,
            1,
            Some(GbrQosInfo {
                gbr_dl: 1e6,
                gbr_ul: 1e6,
            }),
        ));

        let prio = ul_priorities(&p, &[base, gbr_ue]);
        assert!((prio[1] / prio[0] - MAX_METRIC_WEIGHT).abs() < 1.0);
    }

    #[test]
    fn pf_metric_edge_cases() {
        assert_eq!(compute_pf_metric(100.0, 0.0, 2.0), MAX_METRIC_WEIGHT);
        assert_eq!(compute_pf_metric(0.0, 5.0, 2.0), 0.0);
        assert_eq!(compute_pf_metric(100.0, 10.0, 2.0), 1.0);
        assert_eq!(compute_pf_metric(100.0, 4.0, 12.0), 0.25);
    }
}
