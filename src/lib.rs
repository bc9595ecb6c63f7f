// Copyright 2019 by Michael Thies <mail@mhthies.de>
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

//! Core local-search engine for the student/group reassignment problem.
//!
//! Given a current assignment of students to groups across several activities, a set of
//! reassignment requests, a timetable-overlap relation between groups and per-group capacity
//! limits, [`driver::solve`] searches for a new assignment that maximises the five-term
//! objective under hard feasibility constraints, within a wall-clock budget.
//!
//! Module layout mirrors the system design: [`state`] owns the ground-truth tables and derived
//! indexes, the private `mutator` module provides the only way to change them
//! ([`State::apply_move`] / [`State::undo_move`]), [`classify`] partitions pending requests into
//! validity categories, [`passes`] implements the single-move and swap-move improvement sweeps,
//! and [`explorer`] implements the depth-limited sampling search used once the passes stall.

pub mod classify;
pub mod config;
pub mod explorer;
pub mod feasibility;
pub mod io;
pub mod objective;
pub mod passes;
pub mod state;

mod mutator;

pub mod driver;

pub use config::Config;
pub use state::State;
