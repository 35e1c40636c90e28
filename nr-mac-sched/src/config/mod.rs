/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Cell configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! cell:
//!   pci: 1
//!   scs_common: 30
//!   dl_arfcn: 630000
//!   nof_dl_crbs: 106
//!   nof_ul_crbs: 106
//!   max_lookahead: 16
//!   tdd:
//!     pattern1: { period_slots: 10, nof_dl_slots: 7, nof_dl_symbols: 6,
//!                 nof_ul_slots: 2, nof_ul_symbols: 4 }
//!   ssb:
//!     periodicity_ms: 20
//!     scs: 30
//!     beam_bitmap: 3
//!     l_max: 8
//!     case: C
//!   srs:
//!     prohibit_time: 80
//!   policy:
//!     type: time_qos
//!     pf_fairness_coeff: 2.0
//! ues:
//!   - ue_index: 0
//!     srs: { cell_res_id: 0, slot_offset: 4, c_srs: 25 }
//! ```
//!
//! Every field under `cell` is optional; missing values fall back to
//! [`CellConfiguration::default_fdd`].  A file without a `cell` section
//! yields the default FDD cell.  The result is validated before it is
//! exposed, so a loaded configuration is always safe to hand to a
//! [`CellScheduler`](crate::cell::CellScheduler).

mod cell;
pub mod error;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub use cell::{
    CellConfiguration, FrequencyRange, SrsCellConfig, SrsGroupOrSequenceHopping,
    SrsResourceConfig, SsbConfiguration, UeConfig, FR2_MIN_ARFCN, SRS_PERIODICITIES,
    SSB_PERIODICITIES_MS,
};
pub use error::ConfigError;

use crate::policy::PolicyConfig;
use crate::slot::SubcarrierSpacing;
use crate::tdd::TddConfig;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CellConfigFile {
    #[serde(default)]
    cell: Option<CellConfigEntry>,
    #[serde(default)]
    ues: Vec<UeConfig>,
}

/// Cell fields as they appear in the YAML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CellConfigEntry {
    pci: Option<u16>,
    scs_common: Option<SubcarrierSpacing>,
    dl_arfcn: Option<u32>,
    nof_dl_crbs: Option<u32>,
    nof_ul_crbs: Option<u32>,
    tdd: Option<TddConfig>,
    max_lookahead: Option<u32>,
    dmrs_re_per_prb: Option<u32>,
    ssb: Option<SsbConfiguration>,
    srs: Option<SrsCellConfig>,
    policy: Option<PolicyConfig>,
}

impl CellConfigEntry {
    fn into_configuration(self) -> CellConfiguration {
        let d = CellConfiguration::default_fdd();
        CellConfiguration {
            pci: self.pci.unwrap_or(d.pci),
            scs_common: self.scs_common.unwrap_or(d.scs_common),
            dl_arfcn: self.dl_arfcn.unwrap_or(d.dl_arfcn),
            nof_dl_crbs: self.nof_dl_crbs.unwrap_or(d.nof_dl_crbs),
            nof_ul_crbs: self.nof_ul_crbs.unwrap_or(d.nof_ul_crbs),
            tdd: self.tdd,
            max_lookahead: self.max_lookahead.unwrap_or(d.max_lookahead),
            dmrs_re_per_prb: self.dmrs_re_per_prb.unwrap_or(d.dmrs_re_per_prb),
            ssb: self.ssb.unwrap_or(d.ssb),
            srs: self.srs.unwrap_or(d.srs),
            policy: self.policy.unwrap_or(d.policy),
        }
    }
}

// ── CellConfigLoader ──────────────────────────────────────────────────────────

/// Loads a cell and its UE list from a YAML file.
#[derive(Debug, Default)]
pub struct CellConfigLoader {
    cell: Option<CellConfiguration>,
    ues: Vec<UeConfig>,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl CellConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates `path`.
    ///
    /// Calling this a second time replaces the previously loaded cell.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is malformed,
    /// or any validation rule in [`ConfigError`] is violated.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading cell configuration from: {}", path.display());

        self.cell = None;
        self.ues.clear();
        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: CellConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        let cell = match file.cell {
            Some(entry) => entry.into_configuration(),
            None => {
                warn!("No cell section in configuration file, using default FDD cell");
                CellConfiguration::default_fdd()
            }
        };

        cell.validate_with_ues(&file.ues)
            .with_context(|| format!("Invalid cell configuration: {}", path.display()))?;

        for ue in &file.ues {
            debug!(
                ue_index = ue.ue_index,
                srs_res_id = ?ue.srs.as_ref().map(|s| s.cell_res_id),
                "  UE configured"
            );
        }

        info!(
            pci = cell.pci,
            scs = %cell.scs_common,
            duplex = if cell.paired_spectrum() { "FDD" } else { "TDD" },
            dl_crbs = cell.nof_dl_crbs,
            ul_crbs = cell.nof_ul_crbs,
            max_lookahead = cell.max_lookahead,
            ssb_case = ?cell.ssb.case,
            srs_prohibit = ?cell.srs.prohibit_time,
            nof_ues = file.ues.len(),
            "Successfully loaded cell configuration"
        );

        self.cell = Some(cell);
        self.ues = file.ues;
        self.loaded = true;
        Ok(())
    }

    /// The loaded cell, or `None` before a successful load.
    pub fn cell(&self) -> Option<&CellConfiguration> {
        self.cell.as_ref()
    }

    /// The loaded cell, falling back to [`CellConfiguration::default_fdd`].
    pub fn cell_or_default(&self) -> CellConfiguration {
        self.cell
            .clone()
            .unwrap_or_else(CellConfiguration::default_fdd)
    }

    pub fn ues(&self) -> &[UeConfig] {
        &self.ues
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{CombineFunction, PolicyConfig};
    use crate::ssb::SsbPatternCase;
    use crate::tdd::TddPattern;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    fn tdd_cell() -> CellConfiguration {
        CellConfiguration {
            scs_common: SubcarrierSpacing::KHz30,
            dl_arfcn: 630_000,
            tdd: Some(TddConfig {
                pattern1: TddPattern {
                    period_slots: 10,
                    nof_dl_slots: 7,
                    nof_dl_symbols: 6,
                    nof_ul_slots: 2,
                    nof_ul_symbols: 4,
                },
                pattern2: None,
            }),
            ssb: SsbConfiguration {
                scs: SubcarrierSpacing::KHz30,
                case: SsbPatternCase::C,
                l_max: 8,
                ..SsbConfiguration::default()
            },
            ..CellConfiguration::default_fdd()
        }
    }

    fn ue(ue_index: u16, srs: Option<SrsResourceConfig>) -> UeConfig {
        UeConfig { ue_index, srs }
    }

    // ── CellConfiguration::validate ───────────────────────────────────────────

    #[test]
    fn default_fdd_is_valid() {
        let cfg = CellConfiguration::default_fdd();
        assert!(cfg.paired_spectrum());
        assert_eq!(cfg.frequency_range(), FrequencyRange::Fr1);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn tdd_cell_is_valid() {
        assert_eq!(tdd_cell().validate(), Ok(()));
    }

    #[test]
    fn carrier_and_lookahead_rules() {
        let cfg = CellConfiguration {
            nof_ul_crbs: 276,
            ..CellConfiguration::default_fdd()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidCrbCount {
                direction: "UL",
                nof_crbs: 276
            })
        );

        let cfg = CellConfiguration {
            max_lookahead: 0,
            ..CellConfiguration::default_fdd()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidLookahead(0)));
    }

    #[test]
    fn ssb_rules() {
        let mut cfg = CellConfiguration::default_fdd();
        cfg.ssb.periodicity_ms = 15;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidSsbPeriodicity(15)));

        let mut cfg = CellConfiguration::default_fdd();
        cfg.ssb.beam_bitmap = 0b1_0000;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SsbBitmapExceedsLmax { l_max: 4, .. })
        ));

        let mut cfg = CellConfiguration::default_fdd();
        cfg.ssb.case = SsbPatternCase::D;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SsbCaseLmaxMismatch { .. })
        ));

        let mut cfg = CellConfiguration::default_fdd();
        cfg.ssb.offset_to_point_a = 100;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SsbOutsideCarrier { nof_crbs: 106, .. })
        ));
    }

    #[test]
    fn tdd_rules() {
        let mut cfg = tdd_cell();
        if let Some(tdd) = cfg.tdd.as_mut() {
            tdd.pattern1.nof_ul_slots = 4;
        }
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTddPattern { pattern: 1, .. })
        ));

        let mut cfg = tdd_cell();
        if let Some(tdd) = cfg.tdd.as_mut() {
            tdd.pattern1.nof_ul_slots = 0;
            tdd.pattern1.nof_ul_symbols = 0;
        }
        assert_eq!(cfg.validate(), Err(ConfigError::TddWithoutUlSlot));
    }

    #[test]
    fn srs_cell_and_ue_rules() {
        let mut cfg = CellConfiguration::default_fdd();
        cfg.srs.prohibit_time = Some(7);
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidSrsProhibitTime(7)));

        let cfg = CellConfiguration::default_fdd();
        let far = SrsResourceConfig::new(0, 17, 0);
        assert!(matches!(
            cfg.validate_ue(&ue(0, Some(far))),
            Err(ConfigError::SrsSlotOffsetBeyondLookahead { offset: 17, .. })
        ));

        let wide = SrsResourceConfig::new(0, 4, 63);
        assert!(matches!(
            cfg.validate_ue(&ue(0, Some(wide))),
            Err(ConfigError::SrsBandwidthExceedsCarrier { m_srs: 272, .. })
        ));

        let mut two_symbols = SrsResourceConfig::new(0, 4, 0);
        two_symbols.nof_symbols = 2;
        assert!(matches!(
            cfg.validate_ue(&ue(0, Some(two_symbols))),
            Err(ConfigError::InvalidSrsSymbols { .. })
        ));

        let res = SrsResourceConfig::new(1024, 4, 0);
        assert!(matches!(
            cfg.validate_ue(&ue(0, Some(res))),
            Err(ConfigError::SrsResourceIdOutOfRange { .. })
        ));
    }

    #[test]
    fn duplicate_and_out_of_range_ue_indices() {
        let cfg = CellConfiguration::default_fdd();
        assert_eq!(
            cfg.validate_with_ues(&[ue(3, None), ue(3, None)]),
            Err(ConfigError::DuplicateUeIndex(3))
        );
        assert_eq!(
            cfg.validate_with_ues(&[ue(1024, None)]),
            Err(ConfigError::UeIndexOutOfRange(1024))
        );
    }

    // ── CellConfigLoader::load_from_file ──────────────────────────────────────

    #[test]
    fn load_tdd_yaml() {
        let yaml = r#"
cell:
  pci: 7
  scs_common: 30
  dl_arfcn: 630000
  nof_dl_crbs: 106
  nof_ul_crbs: 106
  max_lookahead: 16
  tdd:
    pattern1: { period_slots: 10, nof_dl_slots: 7, nof_dl_symbols: 6, nof_ul_slots: 2, nof_ul_symbols: 4 }
  ssb:
    periodicity_ms: 20
    scs: 30
    beam_bitmap: 3
    l_max: 8
    case: C
  srs:
    prohibit_time: 80
    max_srs_per_slot: 4
  policy:
    type: time_qos
    pf_fairness_coeff: 1.5
    combine_function: multiplication
ues:
  - ue_index: 0
    srs: { cell_res_id: 0, slot_offset: 4, c_srs: 25 }
  - ue_index: 1
"#;
        let f = yaml_tempfile(yaml);
        let mut loader = CellConfigLoader::new();
        loader.load_from_file(f.path()).unwrap();

        assert!(loader.is_loaded());
        let cell = loader.cell().unwrap();
        assert_eq!(cell.pci, 7);
        assert_eq!(cell.numerology(), 1);
        assert!(!cell.paired_spectrum());
        assert_eq!(cell.ssb.case, SsbPatternCase::C);
        assert_eq!(cell.ssb.beam_bitmap, 0b11);
        assert_eq!(cell.srs.prohibit_time, Some(80));
        assert_eq!(cell.srs.max_srs_per_slot, 4);
        assert_eq!(cell.srs.max_cell_resources, 1024, "default applies");
        match &cell.policy {
            PolicyConfig::TimeQos(qos) => {
                assert_eq!(qos.pf_fairness_coeff, 1.5);
                assert_eq!(qos.combine_function, CombineFunction::Multiplication);
                assert!(qos.gbr_enabled, "default applies");
            }
            other => panic!("unexpected policy {other:?}"),
        }

        assert_eq!(loader.ues().len(), 2);
        let srs = loader.ues()[0].srs.as_ref().unwrap();
        assert_eq!(srs.c_srs, 25);
        assert_eq!(srs.comb_size, 2, "default applies");
        assert!(loader.ues()[1].srs.is_none());
    }

    #[test]
    fn round_robin_policy_and_partial_cell() {
        let yaml = "cell:\n  nof_dl_crbs: 52\n  nof_ul_crbs: 52\n  policy:\n    type: time_rr\n";
        let f = yaml_tempfile(yaml);
        let mut loader = CellConfigLoader::new();
        loader.load_from_file(f.path()).unwrap();

        let cell = loader.cell().unwrap();
        assert_eq!(cell.policy, PolicyConfig::TimeRr);
        assert_eq!(cell.nof_dl_crbs, 52);
        assert_eq!(cell.max_lookahead, 16);
    }

    #[test]
    fn missing_cell_section_uses_default() {
        let f = yaml_tempfile("ues: []\n");
        let mut loader = CellConfigLoader::new();
        loader.load_from_file(f.path()).unwrap();
        assert_eq!(loader.cell(), Some(&CellConfiguration::default_fdd()));
    }

    #[test]
    fn missing_file_returns_error() {
        let mut loader = CellConfigLoader::new();
        let result = loader.load_from_file(Path::new("/nonexistent/path/cell.yaml"));
        assert!(result.is_err());
        assert!(!loader.is_loaded());
        assert_eq!(loader.cell_or_default(), CellConfiguration::default_fdd());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        let mut loader = CellConfigLoader::new();
        assert!(loader.load_from_file(f.path()).is_err());
        assert!(!loader.is_loaded());
    }

    #[test]
    fn invalid_configuration_is_rejected_with_reason() {
        let f = yaml_tempfile("cell:\n  ssb:\n    periodicity_ms: 7\n    scs: 15\n    beam_bitmap: 1\n    l_max: 4\n    case: A\n");
        let mut loader = CellConfigLoader::new();
        let err = loader.load_from_file(f.path()).unwrap_err();
        let root = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(root, &ConfigError::InvalidSsbPeriodicity(7));
        assert!(!loader.is_loaded());
    }

    #[test]
    fn reload_replaces_previous_cell() {
        let f1 = yaml_tempfile("cell:\n  pci: 1\nues:\n  - ue_index: 5\n");
        let f2 = yaml_tempfile("cell:\n  pci: 2\n");

        let mut loader = CellConfigLoader::new();
        loader.load_from_file(f1.path()).unwrap();
        assert_eq!(loader.ues().len(), 1);

        loader.load_from_file(f2.path()).unwrap();
        assert_eq!(loader.cell().unwrap().pci, 2);
        assert!(loader.ues().is_empty(), "old UEs must be gone");
    }

    #[test]
    fn shipped_sample_configurations_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs");
        let mut loader = CellConfigLoader::new();

        loader.load_from_file(&dir.join("cell_tdd_30khz.yaml")).unwrap();
        let cell = loader.cell().unwrap();
        assert!(!cell.paired_spectrum());
        assert_eq!(cell.numerology(), 1);
        assert_eq!(cell.srs.prohibit_time, Some(80));
        assert_eq!(loader.ues().len(), 4);

        loader.load_from_file(&dir.join("cell_fdd_15khz.yaml")).unwrap();
        assert_eq!(loader.cell().unwrap().policy, PolicyConfig::TimeRr);
    }
}
