/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Grant descriptors stored in an [`AllocationRecord`](super::AllocationRecord)
//! and read by the PHY driver once the slot becomes current.

use crate::config::{SrsGroupOrSequenceHopping, SrsResourceConfig};
use crate::slot::NOF_OFDM_SYMBOLS_PER_SLOT;

use super::bitmap::{CrbInterval, GrantInfo, OfdmSymbolRange};

/// One SSB transmission occasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsbInformation {
    /// SSB index within the burst (`0..L_max`).
    pub ssb_index: u8,
    pub beam_id: u8,
    pub symbols: OfdmSymbolRange,
    pub crbs: CrbInterval,
}

impl SsbInformation {
    pub fn grant(&self) -> GrantInfo {
        GrantInfo::new(self.symbols, self.crbs)
    }
}

/// SRS resource type carried in the PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrsResourceType {
    Aperiodic,
    SemiPersistent,
    Periodic,
}

/// SRS PDU for one UE in one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrsInfo {
    pub ue_index: u16,
    pub nof_antenna_ports: u8,
    pub symbols: OfdmSymbolRange,
    pub crbs: CrbInterval,
    pub nof_repetitions: u8,
    /// C_SRS.
    pub config_index: u8,
    pub sequence_id: u16,
    /// B_SRS.
    pub bw_index: u8,
    pub tx_comb: u8,
    pub comb_offset: u8,
    pub cyclic_shift: u8,
    pub freq_position: u8,
    pub freq_shift: u16,
    /// b_hop.
    pub freq_hopping: u8,
    pub group_or_seq_hopping: SrsGroupOrSequenceHopping,
    pub resource_type: SrsResourceType,
    pub normalized_channel_iq_matrix_requested: bool,
}

impl SrsInfo {
    /// Builds an aperiodic SRS PDU from the UE's static resource configuration.
    pub fn aperiodic(ue_index: u16, res: &SrsResourceConfig, crbs: CrbInterval) -> Self {
        Self {
            ue_index,
            nof_antenna_ports: res.nof_ports,
            symbols: srs_symbols(res),
            crbs,
            nof_repetitions: res.repetition_factor,
            config_index: res.c_srs,
            sequence_id: res.sequence_id,
            bw_index: res.b_srs,
            tx_comb: res.comb_size,
            comb_offset: res.comb_offset,
            cyclic_shift: res.cyclic_shift,
            freq_position: res.freq_position,
            freq_shift: res.freq_shift,
            freq_hopping: res.b_hop,
            group_or_seq_hopping: res.hopping,
            resource_type: SrsResourceType::Aperiodic,
            normalized_channel_iq_matrix_requested: true,
        }
    }

    pub fn grant(&self) -> GrantInfo {
        GrantInfo::new(self.symbols, self.crbs)
    }
}

/// SRS symbols counted from the end of the slot: `startPosition` 0 is the
/// last symbol.
pub fn srs_symbols(res: &SrsResourceConfig) -> OfdmSymbolRange {
    let start = NOF_OFDM_SYMBOLS_PER_SLOT - res.start_pos - 1;
    OfdmSymbolRange::new(start, start + res.nof_symbols)
}

/// New-transmission data grant placed by the external grant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataGrant {
    pub ue_index: u16,
    pub grant: GrantInfo,
    /// Transport block size in bytes.
    pub tb_bytes: u32,
}
