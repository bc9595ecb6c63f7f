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

//! The outer time-bounded driver: repeatedly runs the classifier and both improvement passes,
//! falls back to the explorer (and its backtracking retry) once they stall, and stops at the
//! deadline. An anytime algorithm: whatever `state` holds when `solve` returns is a valid,
//! feasible assignment, regardless of how much of the budget was actually used.

use std::time::Instant;

use log::{debug, info};
use rand::Rng;

use crate::classify;
use crate::config::Config;
use crate::explorer;
use crate::objective;
use crate::passes;
use crate::state::State;

/// Counters describing one `solve` run, logged at `info` level when it finishes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub iterations: u32,
    pub valid_pass_hits: u32,
    pub swap_pass_hits: u32,
    pub explorer_hits: u32,
    pub backtrack_hits: u32,
}

/// Runs the search loop against `state` until `deadline`, returning the best total score seen
/// (which is non-decreasing across iterations by construction) and the run's [`Stats`].
pub fn solve(state: &mut State, config: &Config, rng: &mut impl Rng, deadline: Instant) -> (i64, Stats) {
    let mut stats = Stats::default();
    let mut best_score = objective::score(state, config).total();

    while Instant::now() < deadline {
        stats.iterations += 1;

        let classification = classify::classify(state);
        let mut improved = passes::valid_pass(state, config, &classification, deadline);
        if improved {
            stats.valid_pass_hits += 1;
        }

        let classification = if improved {
            classify::classify(state)
        } else {
            classification
        };
        if passes::swap_pass(state, config, &classification, deadline) {
            stats.swap_pass_hits += 1;
            improved = true;
        }

        if !improved {
            if explorer::explore(state, config, rng, deadline) {
                stats.explorer_hits += 1;
                improved = true;
            } else if explorer::backtrack(state, config, rng, deadline) {
                stats.backtrack_hits += 1;
                improved = true;
            }
        }

        let current = objective::score(state, config).total();
        if current > best_score {
            best_score = current;
        }
        debug!(
            "iteration {}: {} (improved={})",
            stats.iterations,
            objective::score(state, config),
            improved
        );
    }

    info!(
        "search finished after {} iterations: {}",
        stats.iterations,
        objective::score(state, config)
    );
    (best_score, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_fixtures::simple_state;
    use rand::{rngs::StdRng, SeedableRng};
    use std::time::Duration;

    fn config() -> Config {
        Config {
            timeout: Duration::from_millis(200),
            award_activity: vec![10],
            award_student: 5,
            minmax_penalty: 2,
            seed: 42,
            output_path: "out.csv".into(),
        }
    }

    #[test]
    fn solve_applies_a_satisfiable_request_before_the_deadline() {
        let mut state = simple_state();
        state.requests.push((0, 0, 1));
        state.requests_by_student[0].insert((0, 1), 0);
        state.pending_moves.entry((0, 0)).or_default().push_back(1);
        state.requested_activities_per_student[0] = 1;

        let cfg = config();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let deadline = Instant::now() + Duration::from_millis(50);
        let (best_score, stats) = solve(&mut state, &cfg, &mut rng, deadline);

        assert!(best_score > 0);
        assert!(stats.iterations >= 1);
        assert_eq!(state.record(0, 0).unwrap().current_group, 1);
    }

    #[test]
    fn solve_on_an_already_optimal_state_never_lowers_the_score() {
        let mut state = simple_state();
        let cfg = config();
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let deadline = Instant::now() + Duration::from_millis(20);
        let before = objective::score(&state, &cfg).total();
        let (best_score, _) = solve(&mut state, &cfg, &mut rng, deadline);
        assert!(best_score >= before);
    }
}
