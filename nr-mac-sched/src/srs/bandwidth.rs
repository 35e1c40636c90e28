/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! SRS bandwidth configuration, TS 38.211 Table 6.4.1.4.3-1 (B_SRS = 0 column).

/// `m_SRS,0` in PRBs for each `C_SRS` in `0..=63`.
const M_SRS_0: [u16; 64] = [
    4, 8, 12, 16, 16, 20, 24, 24, 28, 32, 36, 40, 48, 48, 52, 56, 60, 64, 72, 72, 76, 80, 88, 96,
    96, 104, 112, 120, 120, 120, 128, 128, 128, 132, 136, 144, 144, 144, 144, 152, 160, 160, 160,
    168, 176, 184, 192, 192, 192, 192, 208, 216, 224, 240, 240, 240, 240, 256, 256, 256, 264, 272,
    272, 272,
];

/// SRS bandwidth in PRBs for `C_SRS` with `B_SRS = 0`, or `None` for an
/// out-of-table index.
pub fn m_srs_0(c_srs: u8) -> Option<u32> {
    M_SRS_0.get(c_srs as usize).map(|m| u32::from(*m))
}

/// Largest `C_SRS` whose bandwidth fits `nof_crbs`, preferring the smallest
/// index among equal bandwidths.
pub fn max_c_srs_for(nof_crbs: u32) -> Option<u8> {
    let mut best: Option<(u8, u32)> = None;
    for (c, m) in M_SRS_0.iter().enumerate() {
        let m = u32::from(*m);
        if m <= nof_crbs && best.map_or(true, |(_, bm)| m > bm) {
            best = Some((c as u8, m));
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_endpoints() {
        assert_eq!(m_srs_0(0), Some(4));
        assert_eq!(m_srs_0(63), Some(272));
        assert_eq!(m_srs_0(64), None);
    }

    #[test]
    fn best_fit_for_common_carriers() {
        // 52 CRBs (20 MHz @ 30 kHz)
        assert_eq!(max_c_srs_for(52), Some(14));
        // 106 CRBs (40 MHz @ 30 kHz, 20 MHz @ 15 kHz)
        assert_eq!(max_c_srs_for(106), Some(25));
        assert_eq!(max_c_srs_for(3), None);
    }
}
