/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-UE inputs and outputs of the priority engine.
//!
//! These are snapshots supplied by the layers above the scheduler (UE
//! context, buffer status, link adaptation).  The engine only reads them.

use serde::{Deserialize, Serialize};

use crate::slot::SlotPoint;

/// Number of logical channel groups per UE.
pub const MAX_NOF_LCGS: usize = 8;

/// Guaranteed bit rates of a GBR logical channel, in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbrQosInfo {
    pub gbr_dl: f64,
    pub gbr_ul: f64,
}

/// QoS characteristics of a logical channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LcQos {
    /// 5QI priority level, 1..=127.  Lower is more important.
    pub qos_priority: u8,
    /// ARP priority level, 1..=15.  Lower is more important.
    pub arp_priority: u8,
    /// Packet delay budget in milliseconds.
    pub pdb_ms: u32,
    #[serde(default)]
    pub gbr: Option<GbrQosInfo>,
}

impl LcQos {
    pub fn is_gbr(&self) -> bool {
        self.gbr.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalChannel {
    pub lcid: u8,
    pub lcg: u8,
    pub pending_dl_bytes: u32,
    /// Arrival slot of the oldest pending DL SDU.
    pub dl_hol_toa: Option<SlotPoint>,
    /// Average DL bit rate served on this channel.
    pub dl_avg_bit_rate: f64,
    pub qos: Option<LcQos>,
}

impl LogicalChannel {
    /// A non-QoS channel with nothing pending.
    pub fn new(lcid: u8, lcg: u8) -> Self {
        Self {
            lcid,
            lcg,
            pending_dl_bytes: 0,
            dl_hol_toa: None,
            dl_avg_bit_rate: 0.0,
            qos: None,
        }
    }
}

/// State of one UE as seen by the priority engine in a given slot.
#[derive(Debug, Clone, PartialEq)]
pub struct UeSchedInput {
    pub ue_index: u16,
    /// DL MCS from link adaptation; `None` when the CQI is out of range.
    pub dl_mcs: Option<u8>,
    pub dl_layers: u8,
    pub ul_mcs: Option<u8>,
    pub ul_layers: u8,
    pub pending_sr: bool,
    pub ul_pending_unacked_bytes: [u32; MAX_NOF_LCGS],
    pub ul_avg_bit_rate: [f64; MAX_NOF_LCGS],
    pub logical_channels: Vec<LogicalChannel>,
}

impl UeSchedInput {
    /// A UE with the given MCS in both directions and no traffic.
    pub fn new(ue_index: u16, mcs: u8) -> Self {
        Self {
            ue_index,
            dl_mcs: Some(mcs),
            dl_layers: 1,
            ul_mcs: Some(mcs),
            ul_layers: 1,
            pending_sr: false,
            ul_pending_unacked_bytes: [0; MAX_NOF_LCGS],
            ul_avg_bit_rate: [0.0; MAX_NOF_LCGS],
            logical_channels: Vec::new(),
        }
    }

    pub fn has_pending_dl_bytes(&self) -> bool {
        self.logical_channels.iter().any(|lc| lc.pending_dl_bytes > 0)
    }

    pub fn has_pending_ul_bytes(&self) -> bool {
        self.pending_sr || self.ul_pending_unacked_bytes.iter().any(|b| *b > 0)
    }

    pub(crate) fn lcg_pending_ul_bytes(&self, lcg: u8) -> u32 {
        self.ul_pending_unacked_bytes
            .get(lcg as usize)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn lcg_ul_avg_bit_rate(&self, lcg: u8) -> f64 {
        self.ul_avg_bit_rate.get(lcg as usize).copied().unwrap_or(0.0)
    }
}

/// A UE competing for a newTx grant.  The policy writes `priority`.
#[derive(Debug, Clone, Copy)]
pub struct UeNewTxCandidate<'a> {
    pub ue: &'a UeSchedInput,
    pub priority: f64,
}

impl<'a> UeNewTxCandidate<'a> {
    pub fn new(ue: &'a UeSchedInput) -> Self {
        Self { ue, priority: 0.0 }
    }
}

/// A newTx grant the selector committed, fed back into the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTxGrant {
    pub ue_index: u16,
    pub tb_bytes: u32,
}
