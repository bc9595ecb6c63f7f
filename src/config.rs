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

//! Run parameters that are independent of the problem data itself: the wall-clock budget, the
//! objective's award curves and penalty weight, the output path and the sampler's seed.

use std::time::Duration;

/// Tunable parameters of a single solve run, gathered from the command line.
#[derive(Clone, Debug)]
pub struct Config {
    /// Wall-clock budget for the whole run.
    pub timeout: Duration,
    /// Per-activity award curve used by objective term B, indexed by
    /// `moved_activities - 1` (clamped to the last entry).
    pub award_activity: Vec<i64>,
    /// Flat bonus for each fully-satisfied student, objective term C.
    pub award_student: i64,
    /// Per-unit penalty applied to soft min/max-preferred violations, objective terms D and E.
    pub minmax_penalty: i64,
    /// Seed for the sampler's RNG stream. Fixed by `--seed`, otherwise drawn from entropy.
    pub seed: u64,
    /// Path the resulting assignment is written to.
    pub output_path: String,
}

impl Config {
    /// Returns the award for having moved `moved_activities` (>= 1) activities for one student,
    /// clamped to the last entry of `award_activity` once the curve runs out.
    pub fn activity_award(&self, moved_activities: usize) -> i64 {
        if self.award_activity.is_empty() {
            return 0;
        }
        let idx = (moved_activities - 1).min(self.award_activity.len() - 1);
        self.award_activity[idx]
    }
}
