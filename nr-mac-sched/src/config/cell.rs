/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Public, validated cell and UE configuration types.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::grid::MAX_NOF_CRBS;
use crate::policy::PolicyConfig;
use crate::slot::{SubcarrierSpacing, NOF_OFDM_SYMBOLS_PER_SLOT};
use crate::srs::bandwidth::m_srs_0;
use crate::ssb::{ssb_crbs, SsbPatternCase};
use crate::tdd::{TddConfig, TddPattern};

use super::error::ConfigError;

// ── Constants ─────────────────────────────────────────────────────────────────

/// First NR-ARFCN of frequency range 2 (24.25 GHz).
pub const FR2_MIN_ARFCN: u32 = 2_016_667;

/// Valid SSB periodicities in ms.
pub const SSB_PERIODICITIES_MS: [u32; 6] = [5, 10, 20, 40, 80, 160];

/// Valid SRS periodicities (slots), usable as prohibit time (TS 38.331).
pub const SRS_PERIODICITIES: [u32; 17] = [
    1, 2, 4, 5, 8, 10, 16, 20, 32, 40, 64, 80, 160, 320, 640, 1280, 2560,
];

// ── Frequency range ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyRange {
    Fr1,
    Fr2,
}

impl FrequencyRange {
    pub fn from_arfcn(arfcn: u32) -> Self {
        if arfcn >= FR2_MIN_ARFCN {
            FrequencyRange::Fr2
        } else {
            FrequencyRange::Fr1
        }
    }
}

// ── SSB ───────────────────────────────────────────────────────────────────────

/// SSB burst configuration.  Replaced wholesale on reconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsbConfiguration {
    pub periodicity_ms: u32,
    pub scs: SubcarrierSpacing,
    /// offsetToPointA, in RBs of the reference SCS (15 kHz FR1, 60 kHz FR2).
    #[serde(default)]
    pub offset_to_point_a: u32,
    /// Subcarrier offset k_SSB.
    #[serde(default)]
    pub k_ssb: u8,
    /// Bit `i` set enables SSB index `i`.
    pub beam_bitmap: u64,
    pub l_max: u8,
    /// Beam id per SSB index; missing entries are beam 0.
    #[serde(default)]
    pub beam_ids: Vec<u8>,
    pub case: SsbPatternCase,
}

impl SsbConfiguration {
    pub fn beam_id(&self, ssb_index: u8) -> u8 {
        self.beam_ids.get(ssb_index as usize).copied().unwrap_or(0)
    }

    pub fn is_beam_enabled(&self, ssb_index: u8) -> bool {
        ssb_index < 64 && (self.beam_bitmap >> ssb_index) & 1 == 1
    }
}

impl Default for SsbConfiguration {
    fn default() -> Self {
        Self {
            periodicity_ms: 10,
            scs: SubcarrierSpacing::KHz15,
            offset_to_point_a: 0,
            k_ssb: 0,
            beam_bitmap: 0b1,
            l_max: 4,
            beam_ids: Vec::new(),
            case: SsbPatternCase::A,
        }
    }
}

// ── SRS ───────────────────────────────────────────────────────────────────────

/// Cell-level aperiodic SRS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrsCellConfig {
    /// Minimum slot spacing between two SRS of one UE.  `None` disables the
    /// aperiodic SRS allocator.
    #[serde(default)]
    pub prohibit_time: Option<u32>,
    #[serde(default = "default_max_srs_per_slot")]
    pub max_srs_per_slot: usize,
    #[serde(default = "default_max_cell_srs_resources")]
    pub max_cell_resources: u32,
    /// Extra slot offset for non-terrestrial deployments (cell-specific k_offset).
    #[serde(default)]
    pub ntn_k_offset: u32,
}

fn default_max_srs_per_slot() -> usize {
    8
}

fn default_max_cell_srs_resources() -> u32 {
    1024
}

impl Default for SrsCellConfig {
    fn default() -> Self {
        Self {
            prohibit_time: None,
            max_srs_per_slot: default_max_srs_per_slot(),
            max_cell_resources: default_max_cell_srs_resources(),
            ntn_k_offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SrsGroupOrSequenceHopping {
    #[default]
    Neither,
    GroupHopping,
    SequenceHopping,
}

/// Per-UE aperiodic SRS resource (one resource, one resource set).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrsResourceConfig {
    /// Cell-wide resource id used for collision detection.
    pub cell_res_id: u32,
    /// Aperiodic slot offset from the triggering DCI.
    pub slot_offset: u32,
    /// aperiodicSRS-ResourceTrigger (1..=3).
    #[serde(default = "default_trigger")]
    pub trigger: u8,
    #[serde(default = "default_one")]
    pub nof_ports: u8,
    /// startPosition: symbols counted back from the end of the slot.
    #[serde(default)]
    pub start_pos: u8,
    #[serde(default = "default_one")]
    pub nof_symbols: u8,
    #[serde(default = "default_one")]
    pub repetition_factor: u8,
    #[serde(default)]
    pub c_srs: u8,
    #[serde(default)]
    pub b_srs: u8,
    #[serde(default)]
    pub b_hop: u8,
    #[serde(default)]
    pub sequence_id: u16,
    #[serde(default = "default_comb_size")]
    pub comb_size: u8,
    #[serde(default)]
    pub comb_offset: u8,
    #[serde(default)]
    pub cyclic_shift: u8,
    #[serde(default)]
    pub freq_position: u8,
    #[serde(default)]
    pub freq_shift: u16,
    #[serde(default)]
    pub hopping: SrsGroupOrSequenceHopping,
}

fn default_trigger() -> u8 {
    1
}

fn default_one() -> u8 {
    1
}

fn default_comb_size() -> u8 {
    2
}

impl SrsResourceConfig {
    /// A one-port, one-symbol resource on the last symbol of the slot.
    pub fn new(cell_res_id: u32, slot_offset: u32, c_srs: u8) -> Self {
        Self {
            cell_res_id,
            slot_offset,
            trigger: default_trigger(),
            nof_ports: 1,
            start_pos: 0,
            nof_symbols: 1,
            repetition_factor: 1,
            c_srs,
            b_srs: 0,
            b_hop: 0,
            sequence_id: 0,
            comb_size: default_comb_size(),
            comb_offset: 0,
            cyclic_shift: 0,
            freq_position: 0,
            freq_shift: 0,
            hopping: SrsGroupOrSequenceHopping::Neither,
        }
    }
}

// ── UE ────────────────────────────────────────────────────────────────────────

/// Static per-UE configuration known at admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UeConfig {
    pub ue_index: u16,
    #[serde(default)]
    pub srs: Option<SrsResourceConfig>,
}

// ── Cell ──────────────────────────────────────────────────────────────────────

/// Static configuration of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellConfiguration {
    pub pci: u16,
    /// Common SCS of the carrier; fixes the slot numerology.
    pub scs_common: SubcarrierSpacing,
    pub dl_arfcn: u32,
    pub nof_dl_crbs: u32,
    pub nof_ul_crbs: u32,
    /// `None` for FDD (paired spectrum).
    pub tdd: Option<TddConfig>,
    /// How far ahead of the current slot grants may be written.
    pub max_lookahead: u32,
    /// DMRS resource elements per PRB assumed by the TBS estimator.
    pub dmrs_re_per_prb: u32,
    pub ssb: SsbConfiguration,
    pub srs: SrsCellConfig,
    pub policy: PolicyConfig,
}

impl CellConfiguration {
    /// 20 MHz FDD cell at 15 kHz below 3 GHz, SSB case A with beam 0.
    ///
    /// Used when no configuration file is supplied.
    pub fn default_fdd() -> Self {
        Self {
            pci: 1,
            scs_common: SubcarrierSpacing::KHz15,
            dl_arfcn: 536_020,
            nof_dl_crbs: 106,
            nof_ul_crbs: 106,
            tdd: None,
            max_lookahead: 16,
            dmrs_re_per_prb: 24,
            ssb: SsbConfiguration::default(),
            srs: SrsCellConfig::default(),
            policy: PolicyConfig::default(),
        }
    }

    pub fn numerology(&self) -> u8 {
        self.scs_common.numerology()
    }

    pub fn paired_spectrum(&self) -> bool {
        self.tdd.is_none()
    }

    pub fn frequency_range(&self) -> FrequencyRange {
        FrequencyRange::from_arfcn(self.dl_arfcn)
    }

    /// Checks every cell-level rule.  Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (direction, nof_crbs) in [("DL", self.nof_dl_crbs), ("UL", self.nof_ul_crbs)] {
            if nof_crbs == 0 || nof_crbs > MAX_NOF_CRBS {
                return Err(ConfigError::InvalidCrbCount {
                    direction,
                    nof_crbs,
                });
            }
        }
        if !(1..=1023).contains(&self.max_lookahead) {
            return Err(ConfigError::InvalidLookahead(self.max_lookahead));
        }
        if self.dmrs_re_per_prb >= 12 * NOF_OFDM_SYMBOLS_PER_SLOT as u32 {
            return Err(ConfigError::InvalidDmrsReCount(self.dmrs_re_per_prb));
        }
        self.validate_ssb()?;
        if let Some(tdd) = &self.tdd {
            validate_tdd(tdd)?;
        }
        self.validate_srs_cell()?;
        self.policy.validate()
    }

    fn validate_ssb(&self) -> Result<(), ConfigError> {
        let ssb = &self.ssb;
        if !SSB_PERIODICITIES_MS.contains(&ssb.periodicity_ms) {
            return Err(ConfigError::InvalidSsbPeriodicity(ssb.periodicity_ms));
        }
        if ![4, 8, 64].contains(&ssb.l_max) {
            return Err(ConfigError::InvalidSsbLmax(ssb.l_max));
        }
        let case_ok = match ssb.case {
            SsbPatternCase::D => ssb.l_max == 64,
            _ => ssb.l_max != 64,
        };
        if !case_ok {
            return Err(ConfigError::SsbCaseLmaxMismatch {
                case: ssb.case,
                l_max: ssb.l_max,
            });
        }
        if ssb.l_max < 64 && ssb.beam_bitmap >> ssb.l_max != 0 {
            return Err(ConfigError::SsbBitmapExceedsLmax {
                bitmap: ssb.beam_bitmap,
                l_max: ssb.l_max,
            });
        }
        if ssb.beam_ids.len() > 64 {
            return Err(ConfigError::SsbTooManyBeamIds(ssb.beam_ids.len()));
        }
        if ssb.k_ssb > 23 {
            return Err(ConfigError::InvalidKssb(ssb.k_ssb));
        }
        if ssb.offset_to_point_a > 2199 {
            return Err(ConfigError::InvalidOffsetToPointA(ssb.offset_to_point_a));
        }
        let crbs = ssb_crbs(ssb, self.scs_common, self.frequency_range());
        if crbs.stop > self.nof_dl_crbs {
            return Err(ConfigError::SsbOutsideCarrier {
                crbs,
                nof_crbs: self.nof_dl_crbs,
            });
        }
        Ok(())
    }

    fn validate_srs_cell(&self) -> Result<(), ConfigError> {
        let srs = &self.srs;
        if let Some(prohibit) = srs.prohibit_time {
            if !SRS_PERIODICITIES.contains(&prohibit) {
                return Err(ConfigError::InvalidSrsProhibitTime(prohibit));
            }
        }
        if !(1..=crate::grid::MAX_SRS_PDUS_PER_SLOT).contains(&srs.max_srs_per_slot) {
            return Err(ConfigError::InvalidSrsCapacity(srs.max_srs_per_slot));
        }
        if srs.max_cell_resources == 0 {
            return Err(ConfigError::InvalidSrsResourcePool);
        }
        Ok(())
    }

    /// Checks a UE's configuration against this cell.
    pub fn validate_ue(&self, ue: &UeConfig) -> Result<(), ConfigError> {
        if ue.ue_index as usize >= crate::cell::MAX_NOF_UES {
            return Err(ConfigError::UeIndexOutOfRange(ue.ue_index));
        }
        let Some(res) = &ue.srs else {
            return Ok(());
        };
        let ue_index = ue.ue_index;
        let invalid = |field: &'static str, value: u32| ConfigError::InvalidSrsParameter {
            ue_index,
            field,
            value,
        };

        if res.slot_offset + self.srs.ntn_k_offset > self.max_lookahead {
            return Err(ConfigError::SrsSlotOffsetBeyondLookahead {
                ue_index,
                offset: res.slot_offset,
                k_offset: self.srs.ntn_k_offset,
                max_lookahead: self.max_lookahead,
            });
        }
        if res.cell_res_id >= self.srs.max_cell_resources {
            return Err(ConfigError::SrsResourceIdOutOfRange {
                ue_index,
                cell_res_id: res.cell_res_id,
                max: self.srs.max_cell_resources,
            });
        }
        let m_srs = m_srs_0(res.c_srs).ok_or_else(|| invalid("c_srs", res.c_srs.into()))?;
        if m_srs > self.nof_ul_crbs {
            return Err(ConfigError::SrsBandwidthExceedsCarrier {
                ue_index,
                c_srs: res.c_srs,
                m_srs,
                nof_ul_crbs: self.nof_ul_crbs,
            });
        }
        if res.start_pos >= NOF_OFDM_SYMBOLS_PER_SLOT
            || ![1, 2, 4].contains(&res.nof_symbols)
            || res.nof_symbols > res.start_pos + 1
        {
            return Err(ConfigError::InvalidSrsSymbols {
                ue_index,
                start_pos: res.start_pos,
                nof_symbols: res.nof_symbols,
            });
        }
        if res.b_srs != 0 {
            return Err(invalid("b_srs", res.b_srs.into()));
        }
        if ![1, 2, 4].contains(&res.nof_ports) {
            return Err(invalid("nof_ports", res.nof_ports.into()));
        }
        if ![2, 4].contains(&res.comb_size) {
            return Err(invalid("comb_size", res.comb_size.into()));
        }
        if res.comb_offset >= res.comb_size {
            return Err(invalid("comb_offset", res.comb_offset.into()));
        }
        if !(1..=3).contains(&res.trigger) {
            return Err(invalid("trigger", res.trigger.into()));
        }
        if ![1, 2, 4].contains(&res.repetition_factor) || res.repetition_factor > res.nof_symbols {
            return Err(invalid("repetition_factor", res.repetition_factor.into()));
        }
        Ok(())
    }

    /// Validates the cell and every UE, rejecting duplicate UE indices.
    pub fn validate_with_ues(&self, ues: &[UeConfig]) -> Result<(), ConfigError> {
        self.validate()?;
        let mut seen = HashSet::new();
        for ue in ues {
            if !seen.insert(ue.ue_index) {
                return Err(ConfigError::DuplicateUeIndex(ue.ue_index));
            }
            self.validate_ue(ue)?;
        }
        Ok(())
    }
}

fn validate_tdd(tdd: &TddConfig) -> Result<(), ConfigError> {
    validate_pattern(1, &tdd.pattern1)?;
    if let Some(p2) = &tdd.pattern2 {
        validate_pattern(2, p2)?;
    }
    if tdd.find_next_ul_slot(0).is_none() {
        return Err(ConfigError::TddWithoutUlSlot);
    }
    Ok(())
}

fn validate_pattern(pattern: u8, p: &TddPattern) -> Result<(), ConfigError> {
    let fail = |reason: String| ConfigError::InvalidTddPattern { pattern, reason };
    if p.period_slots == 0 {
        return Err(fail("period must be at least one slot".into()));
    }
    if p.nof_dl_slots + p.nof_ul_slots > p.period_slots {
        return Err(fail(format!(
            "{} DL + {} UL slots exceed the {}-slot period",
            p.nof_dl_slots, p.nof_ul_slots, p.period_slots
        )));
    }
    if p.nof_dl_symbols >= NOF_OFDM_SYMBOLS_PER_SLOT || p.nof_ul_symbols >= NOF_OFDM_SYMBOLS_PER_SLOT {
        return Err(fail("special slot symbol counts must be below 14".into()));
    }
    if p.nof_dl_symbols + p.nof_ul_symbols > NOF_OFDM_SYMBOLS_PER_SLOT {
        return Err(fail("special slot has more than 14 symbols".into()));
    }
    let has_special = p.nof_dl_slots + p.nof_ul_slots < p.period_slots;
    if !has_special && (p.nof_dl_symbols > 0 || p.nof_ul_symbols > 0) {
        return Err(fail(
            "special slot symbols configured but no special slot in the period".into(),
        ));
    }
    Ok(())
}
