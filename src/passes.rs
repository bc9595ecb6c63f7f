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

//! Improvement passes: deterministic, greedy sweeps over the classifier's snapshot that the
//! driver runs before falling back to the explorer. Both passes poll the deadline between
//! candidates so a slow pass still yields control in time.

use std::time::Instant;

use log::debug;

use crate::classify::{Category, Classification};
use crate::config::Config;
use crate::feasibility;
use crate::objective;
use crate::state::State;

fn deadline_passed(deadline: Instant) -> bool {
    Instant::now() >= deadline
}

/// Attempts every classified-`Valid` candidate once, accepting it if it strictly improves the
/// score and undoing it otherwise. A first sweep skips `(student, activity)` pairs already
/// touched this run (`global_moves_made`); if that sweep makes no progress at all, a second sweep
/// retries only those already-touched pairs, since a chain of accepted moves earlier in the
/// sweep can open up a move that was infeasible when first classified. Returns whether any move
/// was accepted.
pub fn valid_pass(state: &mut State, config: &Config, classification: &Classification, deadline: Instant) -> bool {
    let mut improved = false;
    let mut current_score = objective::score(state, config).total();

    for restrict_to_moved in [false, true] {
        if restrict_to_moved && improved {
            break;
        }
        for candidate in classification.iter() {
            if candidate.category != Category::Valid {
                continue;
            }
            if deadline_passed(deadline) {
                debug!("valid_pass: deadline reached");
                return improved;
            }
            let key = (candidate.student, candidate.activity);
            if state.global_moves_made().contains(&key) != restrict_to_moved {
                continue;
            }
            let from_group = state
                .record(candidate.student, candidate.activity)
                .expect("classified move refers to a known record")
                .current_group;
            if !feasibility::move_ok(state, candidate.student, from_group, candidate.to_group) {
                continue;
            }
            state.apply_move(candidate.student, candidate.activity, candidate.to_group);
            let new_score = objective::score(state, config).total();
            if new_score > current_score {
                current_score = new_score;
                state.global_moves_made.insert(key);
                improved = true;
            } else {
                state.undo_move(candidate.student, candidate.activity, candidate.to_group);
            }
        }
    }
    improved
}

/// Attempts a two-student swap for every classified-`Maxed`/`Mined` candidate: a student `s1`
/// stuck on a full or drained target `to_group` for `activity` is paired with a student `s2` who
/// holds `to_group` for the same activity, has a pending request back to `s1`'s origin group, and
/// is itself classified `Maxed`/`Mined` for that request. `s1`/`s2` pairs involved in any
/// classified collision for that activity are skipped entirely. The first accepted partner for a
/// given `(s1, activity, to_group)` ends the search for that candidate; an attempted-but-rejected
/// partner does not. Returns whether any swap was accepted.
pub fn swap_pass(state: &mut State, config: &Config, classification: &Classification, deadline: Instant) -> bool {
    let mut improved = false;
    let mut current_score = objective::score(state, config).total();

    for candidate in classification.iter() {
        if !matches!(candidate.category, Category::Maxed | Category::Mined) {
            continue;
        }
        if deadline_passed(deadline) {
            debug!("swap_pass: deadline reached");
            return improved;
        }
        let (s1, activity, to_group) = (candidate.student, candidate.activity, candidate.to_group);
        if classification.has_collision(s1, activity) {
            continue;
        }
        let from_group = state
            .record(s1, activity)
            .expect("classified move refers to a known record")
            .current_group;

        let partners: Vec<_> = state.students_by_activity(activity).iter().copied().collect();
        let mut accepted = false;
        for s2 in partners {
            if s2 == s1 || deadline_passed(deadline) {
                continue;
            }
            let s2_key = state
                .requests_by_student
                .get(s2)
                .and_then(|reqs| reqs.get(&(to_group, from_group)))
                .copied();
            if s2_key != Some(activity) {
                continue;
            }
            match classification.category_of(s2, activity, from_group) {
                Some(Category::Maxed) | Some(Category::Mined) => {}
                _ => continue,
            }
            if classification.has_collision(s2, activity) {
                continue;
            }
            if !feasibility::swap_ok(state, s1, from_group, to_group)
                || !feasibility::swap_ok(state, s2, to_group, from_group)
            {
                continue;
            }

            state.apply_move(s1, activity, to_group);
            state.apply_move(s2, activity, from_group);
            let new_score = objective::score(state, config).total();
            if new_score > current_score {
                current_score = new_score;
                state.global_moves_made.insert((s1, activity));
                state.global_moves_made.insert((s2, activity));
                improved = true;
                accepted = true;
            } else {
                state.undo_move(s2, activity, from_group);
                state.undo_move(s1, activity, to_group);
            }
            if accepted {
                break;
            }
        }
    }
    improved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::state::test_fixtures::simple_state;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            timeout: Duration::from_secs(1),
            award_activity: vec![10],
            award_student: 5,
            minmax_penalty: 2,
            seed: 0,
            output_path: "out.csv".into(),
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn valid_pass_accepts_improving_move() {
        let mut state = simple_state();
        state.requests.push((0, 0, 1));
        state.requests_by_student[0].insert((0, 1), 0);
        state.pending_moves.entry((0, 0)).or_default().push_back(1);
        state.requested_activities_per_student[0] = 1;

        let classification = classify(&state);
        let improved = valid_pass(&mut state, &config(), &classification, far_deadline());

        assert!(improved);
        assert_eq!(state.record(0, 0).unwrap().current_group, 1);
    }

    #[test]
    fn valid_pass_rejects_non_improving_move() {
        let mut state = simple_state();
        // swap weight of 0 plus no activity award curve means moving never strictly improves.
        state.records[0].swap_weight = 0;
        state.requests.push((0, 0, 1));
        state.requests_by_student[0].insert((0, 1), 0);
        state.pending_moves.entry((0, 0)).or_default().push_back(1);
        state.requested_activities_per_student[0] = 1;

        let mut cfg = config();
        cfg.award_activity = vec![];
        cfg.award_student = 0;

        let classification = classify(&state);
        let improved = valid_pass(&mut state, &cfg, &classification, far_deadline());

        assert!(!improved);
        assert_eq!(state.record(0, 0).unwrap().current_group, 0);
    }
}
