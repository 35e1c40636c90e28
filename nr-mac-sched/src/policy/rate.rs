/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deliverable-bytes estimator.
//!
//! Estimates the transport block a UE would get if it were granted the whole
//! carrier for a full 14-symbol slot, following the TBS procedure of
//! TS 38.214 §5.1.3.2 with the 256QAM MCS table (Table 5.1.3.1-2).

use crate::config::CellConfiguration;
use crate::slot::NOF_OFDM_SYMBOLS_PER_SLOT;

// ── MCS table ─────────────────────────────────────────────────────────────────

/// Modulation order and target code rate of one MCS index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McsDescription {
    pub modulation_order: u32,
    /// Target code rate R × 1024.
    pub target_code_rate: f64,
}

impl McsDescription {
    pub fn code_rate(&self) -> f64 {
        self.target_code_rate / 1024.0
    }
}

const MCS_TABLE_256QAM: [(u32, f64); 28] = [
    (2, 120.0),
    (2, 193.0),
    (2, 308.0),
    (2, 449.0),
    (2, 602.0),
    (4, 378.0),
    (4, 434.0),
    (4, 490.0),
    (4, 553.0),
    (4, 616.0),
    (4, 658.0),
    (6, 466.0),
    (6, 517.0),
    (6, 567.0),
    (6, 616.0),
    (6, 666.0),
    (6, 719.0),
    (6, 772.0),
    (6, 822.0),
    (6, 873.0),
    (8, 682.5),
    (8, 711.0),
    (8, 754.0),
    (8, 797.0),
    (8, 841.0),
    (8, 885.0),
    (8, 916.5),
    (8, 948.0),
];

/// Highest MCS index carrying data in the 256QAM table.
pub const MAX_MCS_256QAM: u8 = 27;

/// Looks up an MCS index; indices 28..=31 are reserved for retransmissions.
pub fn mcs_256qam(mcs: u8) -> Option<McsDescription> {
    MCS_TABLE_256QAM
        .get(mcs as usize)
        .map(|&(modulation_order, target_code_rate)| McsDescription {
            modulation_order,
            target_code_rate,
        })
}

// ── TBS calculation ───────────────────────────────────────────────────────────

/// TBS values for `N_info ≤ 3824`, TS 38.214 Table 5.1.3.2-1.
const TBS_TABLE: [u32; 93] = [
    24, 32, 40, 48, 56, 64, 72, 80, 88, 96, 104, 112, 120, 128, 136, 144, 152, 160, 168, 176, 184,
    192, 208, 224, 240, 256, 272, 288, 304, 320, 336, 352, 368, 384, 408, 432, 456, 480, 504, 528,
    552, 576, 608, 640, 672, 704, 736, 768, 808, 848, 888, 928, 984, 1032, 1064, 1128, 1160, 1192,
    1224, 1256, 1288, 1320, 1352, 1416, 1480, 1544, 1608, 1672, 1736, 1800, 1864, 1928, 2024,
    2088, 2152, 2216, 2280, 2408, 2472, 2536, 2600, 2664, 2728, 2792, 2856, 2976, 3104, 3240,
    3368, 3496, 3624, 3752, 3824,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TbsCalculatorConfig {
    pub nof_symb_sh: u32,
    pub nof_dmrs_prb: u32,
    pub nof_oh_prb: u32,
    pub mcs: McsDescription,
    pub nof_layers: u32,
    pub n_prb: u32,
}

/// Transport block size in bits.
pub fn tbs_calculate(cfg: &TbsCalculatorConfig) -> u32 {
    let n_re_prime = (12 * cfg.nof_symb_sh).saturating_sub(cfg.nof_dmrs_prb + cfg.nof_oh_prb);
    let n_re = n_re_prime.min(156) * cfg.n_prb;
    let r = cfg.mcs.code_rate();
    let n_info = n_re as f64 * r * cfg.mcs.modulation_order as f64 * cfg.nof_layers as f64;
    if n_info <= 0.0 {
        return 0;
    }

    if n_info <= 3824.0 {
        let n = (n_info.log2().floor() as i32 - 6).max(3);
        let step = f64::from(1u32 << n);
        let n_info_prime = (step * (n_info / step).floor()).max(24.0) as u32;
        return TBS_TABLE
            .iter()
            .copied()
            .find(|&tbs| tbs >= n_info_prime)
            .unwrap_or(3824);
    }

    let n = (n_info - 24.0).log2().floor() as i32 - 5;
    let step = 2f64.powi(n);
    let n_info_prime = (step * ((n_info - 24.0) / step).round()).max(3840.0);
    let with_crc = n_info_prime + 24.0;
    let segments = if r <= 0.25 {
        (with_crc / 3816.0).ceil()
    } else if n_info_prime > 8424.0 {
        (with_crc / 8424.0).ceil()
    } else {
        1.0
    };
    (8.0 * segments * (with_crc / (8.0 * segments)).ceil() - 24.0) as u32
}

// ── RateEstimator ─────────────────────────────────────────────────────────────

/// Per-cell estimator of the largest possible TB in one slot.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    nof_dl_prbs: u32,
    nof_ul_prbs: u32,
    dmrs_re_per_prb: u32,
}

impl RateEstimator {
    pub fn new(cell: &CellConfiguration) -> Self {
        Self {
            nof_dl_prbs: cell.nof_dl_crbs,
            nof_ul_prbs: cell.nof_ul_crbs,
            dmrs_re_per_prb: cell.dmrs_re_per_prb,
        }
    }

    /// Bytes deliverable in DL over the full carrier; 0 when no DL MCS is
    /// available (CQI out of range).
    pub fn estimate_max_dl_tbs(&self, mcs: Option<u8>, nof_layers: u8) -> u32 {
        self.estimate(mcs, nof_layers, self.nof_dl_prbs)
    }

    /// Bytes deliverable in UL over the full carrier.
    pub fn estimate_max_ul_tbs(&self, mcs: Option<u8>, nof_layers: u8) -> u32 {
        self.estimate(mcs, nof_layers, self.nof_ul_prbs)
    }

    fn estimate(&self, mcs: Option<u8>, nof_layers: u8, n_prb: u32) -> u32 {
        let Some(mcs) = mcs.and_then(mcs_256qam) else {
            return 0;
        };
        let bits = tbs_calculate(&TbsCalculatorConfig {
            nof_symb_sh: NOF_OFDM_SYMBOLS_PER_SLOT as u32,
            nof_dmrs_prb: self.dmrs_re_per_prb,
            nof_oh_prb: 0,
            mcs,
            nof_layers: u32::from(nof_layers.max(1)),
            n_prb,
        });
        bits / 8
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
