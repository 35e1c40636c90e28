/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fairness simulator – NOT for production.
//!
//! Loads a UE workload YAML, runs the cell's priority engine with a greedy
//! DL grant selector for N slots and reports per-UE throughput together with
//! Jain's fairness index.
//!
//! Workload layout:
//! ```yaml
//! slots: 4000
//! max_ues_per_slot: 2
//! ues:
//!   - ue_index: 0
//!     mcs: 27
//!   - ue_index: 1
//!     mcs: 10
//!     qos: { qos_priority: 2, arp_priority: 1, pdb_ms: 50,
//!            gbr: { gbr_dl: 2000000.0, gbr_ul: 500000.0 } }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{debug, info, warn};

use nr_mac_sched::cell::CellScheduler;
use nr_mac_sched::config::{CellConfigLoader, CellConfiguration};
use nr_mac_sched::grid::{CrbInterval, DataGrant, GrantInfo, OfdmSymbolRange};
use nr_mac_sched::notifier::NullNotifier;
use nr_mac_sched::policy::rate::{mcs_256qam, tbs_calculate, TbsCalculatorConfig};
use nr_mac_sched::policy::{
    LcQos, LogicalChannel, NewTxGrant, PolicyConfig, UeNewTxCandidate, UeSchedInput,
    FORBID_PRIORITY,
};
use nr_mac_sched::slot::{SlotPoint, NOF_OFDM_SYMBOLS_PER_SLOT};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "fairness-sim",
    about = "Runs the priority engine against a UE workload and reports fairness",
    long_about = None,
)]
struct Cli {
    /// UE workload YAML.
    #[arg(short = 'w', long = "workload")]
    workload: PathBuf,

    /// Cell configuration YAML (default FDD cell when omitted).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Override the policy of the cell configuration (`time_qos` or `time_rr`).
    #[arg(short = 'p', long = "policy")]
    policy: Option<String>,

    /// Override the number of slots in the workload.
    #[arg(short = 'n', long = "slots")]
    slots: Option<u32>,
}

// ── Workload file ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkloadFile {
    #[serde(default = "default_slots")]
    slots: u32,
    #[serde(default = "default_max_ues_per_slot")]
    max_ues_per_slot: usize,
    ues: Vec<WorkloadUe>,
}

fn default_slots() -> u32 {
    4000
}

fn default_max_ues_per_slot() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkloadUe {
    ue_index: u16,
    mcs: u8,
    #[serde(default = "default_layers")]
    layers: u8,
    #[serde(default)]
    qos: Option<LcQos>,
}

fn default_layers() -> u8 {
    1
}

fn load_workload(path: &Path) -> Result<WorkloadFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open workload file: {}", path.display()))?;
    let workload: WorkloadFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;
    if workload.ues.is_empty() {
        bail!("Workload {} lists no UEs", path.display());
    }
    if workload.max_ues_per_slot == 0 {
        bail!("max_ues_per_slot must be at least 1");
    }
    Ok(workload)
}

// ── Simulation state ──────────────────────────────────────────────────────────

/// EMA factor of the per-LC served bit rate fed back as `dl_avg_bit_rate`.
const LC_RATE_ALPHA: f64 = 0.01;

struct SimUe {
    input: UeSchedInput,
    served_bytes: u64,
    nof_grants: u32,
}

impl SimUe {
    fn new(ue: &WorkloadUe) -> Self {
        let mut input = UeSchedInput::new(ue.ue_index, ue.mcs);
        input.dl_layers = ue.layers;
        input.logical_channels.push(LogicalChannel {
            pending_dl_bytes: u32::MAX,
            qos: ue.qos,
            ..LogicalChannel::new(4, 1)
        });
        Self {
            input,
            served_bytes: 0,
            nof_grants: 0,
        }
    }

    fn update_lc_rate(&mut self, bytes: u32, slot_duration_s: f64) {
        let sample = f64::from(bytes) * 8.0 / slot_duration_s;
        for lc in &mut self.input.logical_channels {
            lc.dl_avg_bit_rate = (1.0 - LC_RATE_ALPHA) * lc.dl_avg_bit_rate + LC_RATE_ALPHA * sample;
        }
    }
}

/// Jain's fairness index over the served byte counts, in `(0, 1]`.
fn jain_index(values: &[f64]) -> f64 {
    let sum: f64 = values.iter().sum();
    let sum_sq: f64 = values.iter().map(|v| v * v).sum();
    if sum_sq == 0.0 {
        return 1.0;
    }
    sum * sum / (values.len() as f64 * sum_sq)
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let workload = load_workload(&cli.workload)?;

    let mut loader = CellConfigLoader::new();
    if let Some(path) = &cli.config {
        loader.load_from_file(path)?;
    } else {
        warn!("No cell configuration file provided, using default FDD cell");
    }
    let mut cell = loader.cell_or_default();
    if let Some(name) = &cli.policy {
        cell.policy = match name.as_str() {
            "time_qos" => PolicyConfig::default(),
            "time_rr" => PolicyConfig::TimeRr,
            other => bail!("Unknown policy '{other}' (expected time_qos or time_rr)"),
        };
    }
    let nof_slots = cli.slots.unwrap_or(workload.slots);

    info!(
        workload = %cli.workload.display(),
        policy = cell.policy.name(),
        nof_ues = workload.ues.len(),
        slots = nof_slots,
        max_ues_per_slot = workload.max_ues_per_slot,
        "Starting fairness simulation"
    );

    let mut sched = CellScheduler::new(cell.clone(), Box::new(NullNotifier))
        .context("Invalid cell configuration")?;
    let mut ues = Vec::with_capacity(workload.ues.len());
    for ue in &workload.ues {
        sched
            .add_ue(ue.ue_index, None)
            .with_context(|| format!("Cannot admit UE {}", ue.ue_index))?;
        ues.push(SimUe::new(ue));
    }

    let slot_duration_s = 1e-3 / f64::from(1u32 << cell.numerology());
    for count in 0..nof_slots {
        let slot = SlotPoint::new(cell.numerology(), count);
        run_slot(&mut sched, &cell, &mut ues, slot, workload.max_ues_per_slot, slot_duration_s);
    }

    report(&ues, nof_slots, slot_duration_s);
    Ok(())
}

fn run_slot(
    sched: &mut CellScheduler,
    cell: &CellConfiguration,
    ues: &mut [SimUe],
    slot: SlotPoint,
    max_ues_per_slot: usize,
    slot_duration_s: f64,
) {
    sched.slot_indication(slot);

    let dl_symbols = match &cell.tdd {
        None => NOF_OFDM_SYMBOLS_PER_SLOT,
        Some(tdd) => tdd.nof_dl_symbols_at(slot.count() % tdd.nof_slots_per_period()),
    };
    if dl_symbols == 0 {
        sched.save_dl_newtx_grants(&[]);
        return;
    }

    let mut order: Vec<(usize, f64)> = {
        let mut candidates: Vec<_> = ues.iter().map(|u| UeNewTxCandidate::new(&u.input)).collect();
        sched.compute_dl_priorities(slot, &mut candidates);
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.priority > FORBID_PRIORITY)
            .map(|(idx, c)| (idx, c.priority))
            .collect()
    };
    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    order.truncate(max_ues_per_slot);

    let mut grants = Vec::with_capacity(order.len());
    if !order.is_empty() {
        // Greedy: equal CRB split among the winners, skipping rows used by SSB.
        let symbols = OfdmSymbolRange::new(0, dl_symbols);
        let nof_crbs = cell.nof_dl_crbs;
        let share = nof_crbs / order.len() as u32;
        for (n, (idx, priority)) in order.iter().enumerate() {
            let start = n as u32 * share;
            let crbs = CrbInterval::new(start, (start + share).min(nof_crbs));
            let Some(tb_bytes) = place_grant(sched, &ues[*idx], symbols, crbs, cell) else {
                continue;
            };
            debug!(slot = %slot, ue_index = ues[*idx].input.ue_index, priority, tb_bytes, "grant");
            grants.push(NewTxGrant {
                ue_index: ues[*idx].input.ue_index,
                tb_bytes,
            });
            ues[*idx].served_bytes += u64::from(tb_bytes);
            ues[*idx].nof_grants += 1;
        }
    }

    for ue in ues.iter_mut() {
        let bytes = grants
            .iter()
            .filter(|g| g.ue_index == ue.input.ue_index)
            .map(|g| g.tb_bytes)
            .sum();
        ue.update_lc_rate(bytes, slot_duration_s);
    }
    sched.save_dl_newtx_grants(&grants);
}

/// Commits a DL grant on `crbs`, shrinking the symbol range below the SSB
/// when the full range collides.  Returns the TB size in bytes.
fn place_grant(
    sched: &mut CellScheduler,
    ue: &SimUe,
    symbols: OfdmSymbolRange,
    crbs: CrbInterval,
    cell: &CellConfiguration,
) -> Option<u32> {
    if crbs.is_empty() {
        return None;
    }
    let record = sched.grid_mut().at_mut(0);
    let mut symbols = symbols;
    if record.dl_grid.collides(&GrantInfo::new(symbols, crbs)) {
        let free_from = record
            .ssbs()
            .iter()
            .map(|s| s.symbols.stop)
            .max()
            .unwrap_or(symbols.start);
        if free_from >= symbols.stop {
            return None;
        }
        symbols = OfdmSymbolRange::new(free_from, symbols.stop);
    }

    let bits = tbs_calculate(&TbsCalculatorConfig {
        nof_symb_sh: u32::from(symbols.len()),
        nof_dmrs_prb: cell.dmrs_re_per_prb,
        nof_oh_prb: 0,
        mcs: ue.input.dl_mcs.and_then(mcs_256qam)?,
        nof_layers: u32::from(ue.input.dl_layers.max(1)),
        n_prb: crbs.len(),
    });
    let tb_bytes = bits / 8;
    if tb_bytes == 0 {
        return None;
    }
    let grant = DataGrant {
        ue_index: ue.input.ue_index,
        grant: GrantInfo::new(symbols, crbs),
        tb_bytes,
    };
    record.try_add_dl_grant(grant).then_some(tb_bytes)
}

fn report(ues: &[SimUe], nof_slots: u32, slot_duration_s: f64) {
    let duration_s = f64::from(nof_slots) * slot_duration_s;
    let throughputs: Vec<f64> = ues
        .iter()
        .map(|u| u.served_bytes as f64 * 8.0 / duration_s)
        .collect();

    info!("Per-UE DL throughput over {:.3} s:", duration_s);
    for (ue, tput) in ues.iter().zip(&throughputs) {
        info!(
            "  [UE {idx}]  mcs={mcs:?}  grants={grants}  bytes={bytes}  tput={mbps:.2} Mbit/s",
            idx = ue.input.ue_index,
            mcs = ue.input.dl_mcs,
            grants = ue.nof_grants,
            bytes = ue.served_bytes,
            mbps = tput / 1e6,
        );
    }
    let total: f64 = throughputs.iter().sum();
    info!(
        total_mbps = %format!("{:.2}", total / 1e6),
        jain_index = %format!("{:.4}", jain_index(&throughputs)),
        "Simulation complete"
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
