/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn};

use nr_mac_sched::cell::CellScheduler;
use nr_mac_sched::config::{CellConfigLoader, CellConfiguration, UeConfig};
use nr_mac_sched::grid::{AllocationRecord, CrbInterval, DataGrant, GrantInfo, OfdmSymbolRange};
use nr_mac_sched::notifier::{SchedMetricsRecorder, TracingNotifier};
use nr_mac_sched::policy::rate::{mcs_256qam, tbs_calculate, TbsCalculatorConfig};
use nr_mac_sched::policy::{NewTxGrant, UeNewTxCandidate, UeSchedInput, FORBID_PRIORITY};
use nr_mac_sched::slot::{SlotPoint, NOF_OFDM_SYMBOLS_PER_SLOT};

// ── CLI argument definition ───────────────────────────────────────────────────

/// NR MAC cell scheduler driver.
///
/// Runs the slot loop of one cell with full-buffer UEs taken from the
/// configuration file.  Each slot the highest-priority UE gets the whole
/// free bandwidth in DL and UL.
///
/// Example:
///   nr-mac-sched --config configs/cell_tdd_30khz.yaml --slots 2000
#[derive(Debug, Parser)]
#[command(
    name = "nr-mac-sched",
    about = "NR MAC slot scheduler – cell driver",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML cell configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Number of slots to run.
    #[arg(short = 'n', long = "slots", default_value_t = 10240)]
    slots: u32,

    /// MCS reported for every UE in both directions.
    #[arg(short = 'm', long = "mcs", default_value_t = 20)]
    mcs: u8,

    /// Number of UEs to admit when the configuration lists none.
    #[arg(short = 'u', long = "ues", default_value_t = 4)]
    nof_ues: u16,

    /// Slot offset between the DL decision and the PUSCH.
    #[arg(long = "k2", default_value_t = 4)]
    k2: u32,

    /// Pace slot indications at the air-interface slot duration.
    #[arg(short = 'r', long = "realtime", default_value_t = false)]
    realtime: bool,
}

// ── Simulated UE state ────────────────────────────────────────────────────────

struct SimUe {
    input: UeSchedInput,
    last_srs_slot: Option<SlotPoint>,
    dl_bytes: u64,
    ul_bytes: u64,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("nr-mac-sched starting up...");

    let cli = Cli::parse();

    info!(
        config   = ?cli.config,
        slots    = cli.slots,
        mcs      = cli.mcs,
        nof_ues  = cli.nof_ues,
        k2       = cli.k2,
        realtime = cli.realtime,
        "Configuration"
    );

    // ── Load cell configuration ───────────────────────────────────────────────
    let mut loader = CellConfigLoader::new();
    match &cli.config {
        Some(path) => {
            if let Err(e) = loader.load_from_file(path) {
                error!("Failed to load cell configuration: {:#}", e);
                process::exit(1);
            }
        }
        None => {
            warn!("No cell configuration file provided, using default FDD cell");
        }
    }
    let cell = loader.cell_or_default();

    if cli.k2 > cell.max_lookahead {
        error!(k2 = cli.k2, max_lookahead = cell.max_lookahead, "k2 beyond the grid lookahead");
        process::exit(1);
    }

    let ue_cfgs: Vec<UeConfig> = if loader.ues().is_empty() {
        (0..cli.nof_ues)
            .map(|ue_index| UeConfig { ue_index, srs: None })
            .collect()
    } else {
        loader.ues().to_vec()
    };

    // ── Build the cell ────────────────────────────────────────────────────────
    let metrics = SchedMetricsRecorder::new();
    let notifier = Box::new((TracingNotifier::new(cell.pci), metrics.clone()));
    let mut sched = match CellScheduler::new(cell.clone(), notifier) {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid cell configuration: {}", e);
            process::exit(1);
        }
    };

    let mut ues = Vec::with_capacity(ue_cfgs.len());
    for ue in ue_cfgs {
        if let Err(e) = sched.add_ue(ue.ue_index, ue.srs.clone()) {
            error!(ue_index = ue.ue_index, "Cannot admit UE: {}", e);
            process::exit(1);
        }
        let mut input = UeSchedInput::new(ue.ue_index, cli.mcs);
        input.ul_pending_unacked_bytes[0] = u32::MAX;
        ues.push(SimUe {
            input,
            last_srs_slot: None,
            dl_bytes: 0,
            ul_bytes: 0,
        });
    }
    info!("Admitted {} UE(s)", ues.len());

    // ── Slot loop ─────────────────────────────────────────────────────────────
    let slot_duration = Duration::from_micros(1000 >> cell.numerology());
    let mut ticker = tokio::time::interval(slot_duration);

    for count in 0..cli.slots {
        if cli.realtime {
            ticker.tick().await;
        }
        let slot = SlotPoint::new(cell.numerology(), count);
        run_slot(&mut sched, &cell, &mut ues, slot, cli.k2);
    }

    // ── Summary ───────────────────────────────────────────────────────────────
    let snap = metrics.snapshot();
    info!(
        slots = snap.slots,
        ssbs = snap.ssbs,
        srs_allocated = snap.srs_allocated,
        srs_rejected = snap.srs_rejected,
        "Run complete"
    );
    for ue in &ues {
        info!(
            "  [UE {idx}]  dl={dl} bytes  ul={ul} bytes  last_srs={srs}",
            idx = ue.input.ue_index,
            dl = ue.dl_bytes,
            ul = ue.ul_bytes,
            srs = ue
                .last_srs_slot
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
        );
    }
}

// ── Per-slot processing ───────────────────────────────────────────────────────

fn run_slot(
    sched: &mut CellScheduler,
    cell: &CellConfiguration,
    ues: &mut [SimUe],
    slot: SlotPoint,
    k2: u32,
) {
    sched.slot_indication(slot);

    for ue in ues.iter_mut() {
        let info = sched.allocate_aperiodic_srs(ue.input.ue_index, ue.last_srs_slot);
        if info.is_allocated() {
            ue.last_srs_slot = Some(slot + info.slot_offset);
        }
    }

    let dl_symbols = dl_symbols_at(cell, slot);
    let dl_winner = if dl_symbols > 0 {
        let mut candidates: Vec<_> = ues.iter().map(|u| UeNewTxCandidate::new(&u.input)).collect();
        sched.compute_dl_priorities(slot, &mut candidates);
        pick_top(&candidates)
    } else {
        None
    };

    let pusch_slot = slot + k2;
    let ul_symbols = ul_symbols_at(cell, pusch_slot);
    let ul_winner = if ul_symbols > 0 {
        let mut candidates: Vec<_> = ues.iter().map(|u| UeNewTxCandidate::new(&u.input)).collect();
        sched.compute_ul_priorities(pusch_slot, &mut candidates);
        pick_top(&candidates)
    } else {
        None
    };

    let mut dl_grants = Vec::new();
    if let Some(idx) = dl_winner {
        let symbols = OfdmSymbolRange::new(0, dl_symbols);
        let record = sched.grid_mut().at_mut(0);
        if let Some(grant) = fill_free_band(record, &ues[idx], symbols, cell.nof_dl_crbs, cell, true)
        {
            ues[idx].dl_bytes += u64::from(grant.tb_bytes);
            dl_grants.push(grant);
        }
    }
    sched.save_dl_newtx_grants(&dl_grants);

    let mut ul_grants = Vec::new();
    if let Some(idx) = ul_winner {
        let start = NOF_OFDM_SYMBOLS_PER_SLOT - ul_symbols;
        let symbols = OfdmSymbolRange::new(start, NOF_OFDM_SYMBOLS_PER_SLOT);
        let record = sched.grid_mut().at_mut(k2);
        if let Some(grant) = fill_free_band(record, &ues[idx], symbols, cell.nof_ul_crbs, cell, false)
        {
            ues[idx].ul_bytes += u64::from(grant.tb_bytes);
            ul_grants.push(grant);
        }
    }
    sched.save_ul_newtx_grants(&ul_grants);
}

fn pick_top(candidates: &[UeNewTxCandidate<'_>]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.priority > FORBID_PRIORITY)
        .max_by(|(_, a), (_, b)| a.priority.total_cmp(&b.priority))
        .map(|(idx, _)| idx)
}

/// Grants the widest CRB run that does not collide with what the record
/// already holds (SSB, SRS).
fn fill_free_band(
    record: &mut AllocationRecord,
    ue: &SimUe,
    symbols: OfdmSymbolRange,
    nof_crbs: u32,
    cell: &CellConfiguration,
    downlink: bool,
) -> Option<NewTxGrant> {
    let grid = if downlink { &record.dl_grid } else { &record.ul_grid };
    let mut best = CrbInterval::new(0, 0);
    let mut start = 0;
    for crb in 0..=nof_crbs {
        let busy = crb == nof_crbs
            || grid.collides(&GrantInfo::new(symbols, CrbInterval::new(crb, crb + 1)));
        if busy {
            if crb - start > best.len() {
                best = CrbInterval::new(start, crb);
            }
            start = crb + 1;
        }
    }
    if best.is_empty() {
        return None;
    }

    let (mcs, layers) = if downlink {
        (ue.input.dl_mcs, ue.input.dl_layers)
    } else {
        (ue.input.ul_mcs, ue.input.ul_layers)
    };
    let bits = tbs_calculate(&TbsCalculatorConfig {
        nof_symb_sh: u32::from(symbols.len()),
        nof_dmrs_prb: cell.dmrs_re_per_prb,
        nof_oh_prb: 0,
        mcs: mcs.and_then(mcs_256qam)?,
        nof_layers: u32::from(layers.max(1)),
        n_prb: best.len(),
    });
    if bits < 8 {
        return None;
    }
    let grant = DataGrant {
        ue_index: ue.input.ue_index,
        grant: GrantInfo::new(symbols, best),
        tb_bytes: bits / 8,
    };
    let added = if downlink {
        record.try_add_dl_grant(grant)
    } else {
        record.try_add_ul_grant(grant)
    };
    if !added {
        return None;
    }
    debug!(
        ue_index = grant.ue_index,
        slot = %record.slot(),
        dl = downlink,
        crbs = %best,
        symbols = %symbols,
        tb_bytes = grant.tb_bytes,
        "newTx grant"
    );
    Some(NewTxGrant {
        ue_index: grant.ue_index,
        tb_bytes: grant.tb_bytes,
    })
}

fn dl_symbols_at(cell: &CellConfiguration, slot: SlotPoint) -> u8 {
    match &cell.tdd {
        None => NOF_OFDM_SYMBOLS_PER_SLOT,
        Some(tdd) => tdd.nof_dl_symbols_at(slot.count() % tdd.nof_slots_per_period()),
    }
}

fn ul_symbols_at(cell: &CellConfiguration, slot: SlotPoint) -> u8 {
    match &cell.tdd {
        None => NOF_OFDM_SYMBOLS_PER_SLOT,
        Some(tdd) => tdd.nof_ul_symbols_at(slot.count() % tdd.nof_slots_per_period()),
    }
}
