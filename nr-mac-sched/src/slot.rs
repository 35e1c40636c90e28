/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Logical slot time for the MAC scheduler.
//!
//! A [`SlotPoint`] is a (numerology, slot count) pair.  The slot count wraps
//! after 1024 radio frames (one hyper-frame of SFNs), i.e. after
//! `10240 · 2^μ` slots.  All arithmetic is modular, and comparisons use the
//! shortest modular distance, which is valid as long as the two slots being
//! compared are less than half a wrap apart.
//!
//! "No slot" (e.g. a UE that has never been allocated an SRS) is expressed as
//! `Option<SlotPoint>::None` rather than with an in-band invalid value.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Highest supported numerology (240 kHz SCS).
pub const MAX_NUMEROLOGY: u8 = 4;

/// Number of subframes in one radio frame.
pub const NOF_SUBFRAMES_PER_FRAME: u32 = 10;

/// Number of SFN values before the frame counter wraps.
pub const NOF_SFNS: u32 = 1024;

/// OFDM symbols per slot with normal cyclic prefix.
pub const NOF_OFDM_SYMBOLS_PER_SLOT: u8 = 14;

// ── Subcarrier spacing ────────────────────────────────────────────────────────

/// NR subcarrier spacing.  The numerology μ is `log2(scs / 15 kHz)`.
///
/// Serialised as the spacing in kHz (`15`, `30`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SubcarrierSpacing {
    KHz15,
    KHz30,
    KHz60,
    KHz120,
    KHz240,
}

impl SubcarrierSpacing {
    /// Numerology μ associated with this spacing.
    pub fn numerology(self) -> u8 {
        match self {
            SubcarrierSpacing::KHz15 => 0,
            SubcarrierSpacing::KHz30 => 1,
            SubcarrierSpacing::KHz60 => 2,
            SubcarrierSpacing::KHz120 => 3,
            SubcarrierSpacing::KHz240 => 4,
        }
    }

    /// Spacing in kHz.
    pub fn khz(self) -> u32 {
        15 << self.numerology()
    }

    /// Inverse of [`numerology`](Self::numerology).
    pub fn from_numerology(numerology: u8) -> Option<Self> {
        match numerology {
            0 => Some(SubcarrierSpacing::KHz15),
            1 => Some(SubcarrierSpacing::KHz30),
            2 => Some(SubcarrierSpacing::KHz60),
            3 => Some(SubcarrierSpacing::KHz120),
            4 => Some(SubcarrierSpacing::KHz240),
            _ => None,
        }
    }
}

impl TryFrom<u32> for SubcarrierSpacing {
    type Error = String;

    fn try_from(khz: u32) -> Result<Self, Self::Error> {
        match khz {
            15 => Ok(SubcarrierSpacing::KHz15),
            30 => Ok(SubcarrierSpacing::KHz30),
            60 => Ok(SubcarrierSpacing::KHz60),
            120 => Ok(SubcarrierSpacing::KHz120),
            240 => Ok(SubcarrierSpacing::KHz240),
            other => Err(format!("unsupported subcarrier spacing {other}kHz")),
        }
    }
}

impl From<SubcarrierSpacing> for u32 {
    fn from(scs: SubcarrierSpacing) -> u32 {
        scs.khz()
    }
}

impl fmt::Display for SubcarrierSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}kHz", self.khz())
    }
}

// ── SlotPoint ─────────────────────────────────────────────────────────────────

/// A slot in time, at a given numerology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotPoint {
    numerology: u8,
    count: u32,
}

impl SlotPoint {
    /// Create a slot from its numerology and an absolute slot index.
    ///
    /// The index is reduced modulo the hyper-frame length.
    ///
    /// # Panics
    /// Panics if `numerology > MAX_NUMEROLOGY`.
    pub fn new(numerology: u8, count: u32) -> Self {
        assert!(
            numerology <= MAX_NUMEROLOGY,
            "invalid numerology {numerology}"
        );
        let wrap = Self::wrap_for(numerology);
        Self {
            numerology,
            count: count % wrap,
        }
    }

    /// Create a slot from an SFN and a slot index within that frame.
    pub fn from_sfn(numerology: u8, sfn: u32, slot_index: u32) -> Self {
        let per_frame = NOF_SUBFRAMES_PER_FRAME << numerology;
        debug_assert!(slot_index < per_frame, "slot index out of range");
        Self::new(numerology, sfn * per_frame + slot_index)
    }

    fn wrap_for(numerology: u8) -> u32 {
        NOF_SFNS * (NOF_SUBFRAMES_PER_FRAME << numerology)
    }

    pub fn numerology(&self) -> u8 {
        self.numerology
    }

    /// Slot count within the hyper-frame, in `[0, 10240·2^μ)`.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of slots before the counter wraps.
    pub fn nof_slots_per_hyper_frame(&self) -> u32 {
        Self::wrap_for(self.numerology)
    }

    pub fn nof_slots_per_subframe(&self) -> u32 {
        1 << self.numerology
    }

    pub fn nof_slots_per_frame(&self) -> u32 {
        NOF_SUBFRAMES_PER_FRAME << self.numerology
    }

    /// System frame number.
    pub fn sfn(&self) -> u32 {
        self.count / self.nof_slots_per_frame()
    }

    /// Slot index within the frame.
    pub fn slot_index(&self) -> u32 {
        self.count % self.nof_slots_per_frame()
    }

    /// Subframe index within the frame.
    pub fn subframe_index(&self) -> u32 {
        self.slot_index() / self.nof_slots_per_subframe()
    }
}

impl Add<u32> for SlotPoint {
    type Output = SlotPoint;

    fn add(self, rhs: u32) -> SlotPoint {
        let wrap = self.nof_slots_per_hyper_frame();
        SlotPoint {
            numerology: self.numerology,
            count: ((self.count as u64 + rhs as u64) % wrap as u64) as u32,
        }
    }
}

impl Sub<u32> for SlotPoint {
    type Output = SlotPoint;

    fn sub(self, rhs: u32) -> SlotPoint {
        let wrap = self.nof_slots_per_hyper_frame();
        let rhs = rhs % wrap;
        SlotPoint {
            numerology: self.numerology,
            count: (self.count + wrap - rhs) % wrap,
        }
    }
}

/// Shortest signed modular distance `self − rhs`, in slots.
impl Sub<SlotPoint> for SlotPoint {
    type Output = i32;

    fn sub(self, rhs: SlotPoint) -> i32 {
        debug_assert_eq!(
            self.numerology, rhs.numerology,
            "slot arithmetic across numerologies"
        );
        let wrap = self.nof_slots_per_hyper_frame() as i64;
        let mut diff = (self.count as i64 - rhs.count as i64).rem_euclid(wrap);
        if diff >= wrap / 2 {
            diff -= wrap;
        }
        diff as i32
    }
}

impl PartialOrd for SlotPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.numerology != other.numerology {
            return None;
        }
        Some((*self - *other).cmp(&0))
    }
}

impl fmt::Display for SlotPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.sfn(), self.slot_index())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
