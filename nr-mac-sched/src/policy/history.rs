/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Columnar store of per-UE average throughput.
//!
//! One row per admitted UE, stored as parallel `f32` columns so that the
//! per-slot EMA update walks contiguous memory.  Rows are swap-removed on
//! detach; `ue_rows` maps a UE index to its current row.

use super::ue::NewTxGrant;

/// EMA forgetting factor applied once per saved grant list.
pub const EXP_AVG_ALPHA: f32 = 0.01;

#[derive(Debug, Default)]
pub struct UeHistoryRepository {
    dl_avg_rate: Vec<f32>,
    ul_avg_rate: Vec<f32>,
    row_ue_index: Vec<u16>,
    ue_rows: Vec<Option<usize>>,
    samples: Vec<f32>,
}

impl UeHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.row_ue_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ue_index.is_empty()
    }

    pub fn contains(&self, ue_index: u16) -> bool {
        self.row(ue_index).is_some()
    }

    /// # Panics
    /// Panics if the UE already has a row.
    pub fn add_ue(&mut self, ue_index: u16) {
        assert!(!self.contains(ue_index), "UE={ue_index} was already added");
        let slot = ue_index as usize;
        if self.ue_rows.len() <= slot {
            self.ue_rows.resize(slot + 1, None);
        }
        self.ue_rows[slot] = Some(self.row_ue_index.len());
        self.dl_avg_rate.push(0.0);
        self.ul_avg_rate.push(0.0);
        self.row_ue_index.push(ue_index);
    }

    /// # Panics
    /// Panics if the UE has no row.
    pub fn rem_ue(&mut self, ue_index: u16) {
        let Some(row) = self.row(ue_index) else {
            panic!("UE={ue_index} was not added");
        };
        self.dl_avg_rate.swap_remove(row);
        self.ul_avg_rate.swap_remove(row);
        self.row_ue_index.swap_remove(row);
        if let Some(&moved) = self.row_ue_index.get(row) {
            self.ue_rows[moved as usize] = Some(row);
        }
        self.ue_rows[ue_index as usize] = None;
    }

    /// Average DL bytes per saved grant round.
    ///
    /// # Panics
    /// Panics if the UE has no row.
    pub fn dl_avg_rate(&self, ue_index: u16) -> f64 {
        f64::from(self.dl_avg_rate[self.expect_row(ue_index)])
    }

    /// # Panics
    /// Panics if the UE has no row.
    pub fn ul_avg_rate(&self, ue_index: u16) -> f64 {
        f64::from(self.ul_avg_rate[self.expect_row(ue_index)])
    }

    /// Folds one round of DL grants into every row's average.  An empty list
    /// leaves the averages untouched.
    pub fn save_dl_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        if grants.is_empty() {
            return;
        }
        self.collect_samples(grants);
        update_averages(&mut self.dl_avg_rate, &self.samples);
    }

    pub fn save_ul_newtx_grants(&mut self, grants: &[NewTxGrant]) {
        if grants.is_empty() {
            return;
        }
        self.collect_samples(grants);
        update_averages(&mut self.ul_avg_rate, &self.samples);
    }

    fn collect_samples(&mut self, grants: &[NewTxGrant]) {
        self.samples.clear();
        self.samples.resize(self.row_ue_index.len(), 0.0);
        for grant in grants {
            if let Some(row) = self.row(grant.ue_index) {
                self.samples[row] += grant.tb_bytes as f32;
            }
        }
    }

    fn row(&self, ue_index: u16) -> Option<usize> {
        self.ue_rows.get(ue_index as usize).copied().flatten()
    }

    fn expect_row(&self, ue_index: u16) -> usize {
        match self.row(ue_index) {
            Some(row) => row,
            None => panic!("UE={ue_index} was not added"),
        }
    }
}

fn update_averages(avg: &mut [f32], samples: &[f32]) {
    for (rate, sample) in avg.iter_mut().zip(samples) {
        *rate = (1.0 - EXP_AVG_ALPHA) * *rate + EXP_AVG_ALPHA * sample;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
