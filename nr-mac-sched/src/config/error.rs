/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured validation errors for cell and UE configuration.
//!
//! A configuration that fails any rule here must never reach a
//! [`CellScheduler`](crate::cell::CellScheduler): the scheduler core treats
//! malformed input as a contract violation and panics.  Validating up front
//! turns those panics into a readable error at load time.
//!
//! | Variant group | Checked by |
//! |---|---|
//! | carrier / lookahead | [`CellConfiguration::validate`](super::CellConfiguration::validate) |
//! | `Ssb*` | [`SsbConfiguration`](super::SsbConfiguration) rules |
//! | `Tdd*` | [`TddConfig`](crate::tdd::TddConfig) rules |
//! | `Srs*` | cell SRS settings and per-UE SRS resources |
//! | `Policy*` / `Ue*` | policy parameters and the UE list |

use thiserror::Error;

use crate::grid::CrbInterval;
use crate::ssb::SsbPatternCase;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    // ── Carrier ───────────────────────────────────────────────────────────────
    #[error("{direction} carrier has {nof_crbs} CRBs (valid: 1..=275)")]
    InvalidCrbCount {
        direction: &'static str,
        nof_crbs: u32,
    },

    #[error("max_lookahead {0} outside [1, 1023]")]
    InvalidLookahead(u32),

    #[error("dmrs_re_per_prb {0} must be below 168")]
    InvalidDmrsReCount(u32),

    // ── SSB ───────────────────────────────────────────────────────────────────
    #[error("SSB periodicity {0}ms not in {{5, 10, 20, 40, 80, 160}}")]
    InvalidSsbPeriodicity(u32),

    #[error("SSB L_max {0} not in {{4, 8, 64}}")]
    InvalidSsbLmax(u8),

    #[error("SSB pattern case {case:?} cannot be used with L_max {l_max}")]
    SsbCaseLmaxMismatch { case: SsbPatternCase, l_max: u8 },

    #[error("SSB beam bitmap {bitmap:#x} enables indices beyond L_max {l_max}")]
    SsbBitmapExceedsLmax { bitmap: u64, l_max: u8 },

    #[error("SSB beam id list has {0} entries (maximum 64)")]
    SsbTooManyBeamIds(usize),

    #[error("k_ssb {0} above 23")]
    InvalidKssb(u8),

    #[error("offset_to_point_a {0} above 2199")]
    InvalidOffsetToPointA(u32),

    #[error("SSB CRBs {crbs} do not fit the {nof_crbs}-CRB DL carrier")]
    SsbOutsideCarrier { crbs: CrbInterval, nof_crbs: u32 },

    // ── TDD ───────────────────────────────────────────────────────────────────
    #[error("TDD pattern {pattern}: {reason}")]
    InvalidTddPattern { pattern: u8, reason: String },

    #[error("TDD configuration has no slot with UL symbols")]
    TddWithoutUlSlot,

    // ── SRS ───────────────────────────────────────────────────────────────────
    #[error("SRS prohibit time {0} is not a valid SRS periodicity")]
    InvalidSrsProhibitTime(u32),

    #[error("max_srs_per_slot {0} outside [1, 64]")]
    InvalidSrsCapacity(usize),

    #[error("max_cell_srs_resources must be at least 1")]
    InvalidSrsResourcePool,

    #[error("UE {ue_index}: SRS slot offset {offset} + k_offset {k_offset} exceeds max_lookahead {max_lookahead}")]
    SrsSlotOffsetBeyondLookahead {
        ue_index: u16,
        offset: u32,
        k_offset: u32,
        max_lookahead: u32,
    },

    #[error("UE {ue_index}: SRS cell resource id {cell_res_id} not below {max}")]
    SrsResourceIdOutOfRange {
        ue_index: u16,
        cell_res_id: u32,
        max: u32,
    },

    #[error("UE {ue_index}: C_SRS {c_srs} needs {m_srs} CRBs but the UL carrier has {nof_ul_crbs}")]
    SrsBandwidthExceedsCarrier {
        ue_index: u16,
        c_srs: u8,
        m_srs: u32,
        nof_ul_crbs: u32,
    },

    #[error("UE {ue_index}: SRS start_pos {start_pos} with {nof_symbols} symbols does not fit the slot")]
    InvalidSrsSymbols {
        ue_index: u16,
        start_pos: u8,
        nof_symbols: u8,
    },

    #[error("UE {ue_index}: SRS {field} = {value} is not supported")]
    InvalidSrsParameter {
        ue_index: u16,
        field: &'static str,
        value: u32,
    },

    // ── Policy / UEs ──────────────────────────────────────────────────────────
    #[error("PF fairness coefficient {0} must be a non-negative number")]
    InvalidFairnessCoeff(f64),

    #[error("UE index {0} above the maximum of {max}", max = crate::cell::MAX_NOF_UES - 1)]
    UeIndexOutOfRange(u16),

    #[error("UE index {0} configured twice")]
    DuplicateUeIndex(u16),
}
