/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! nr-mac-sched – NR MAC slot scheduler core
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── slot        – slot points, numerology, subcarrier spacing
//! ├── grid/       – per-slot occupancy bitmaps, grant lists, lookahead ring
//! ├── tdd         – TDD UL/DL pattern helpers
//! ├── config/     – YAML cell configuration + validation
//! ├── ssb/        – SSB placement (cases A–D)
//! ├── srs/        – aperiodic SRS allocator + bandwidth table
//! ├── policy/     – priority engine (time_qos, time_rr), history, TBS estimator
//! ├── notifier    – injected event port (tracing / metrics / null)
//! └── cell        – per-cell slot driver tying the above together
//! ```

pub mod cell;
pub mod config;
pub mod grid;
pub mod notifier;
pub mod policy;
pub mod slot;
pub mod srs;
pub mod ssb;
pub mod tdd;
