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

//! Depth-limited explorer: a one-step (and sometimes two-step) lookahead search over a sample of
//! pending candidates, used once the improvement passes stall. Depth shrinks as the deadline
//! approaches so the search always has time to unwind and report a result.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;

use crate::config::Config;
use crate::feasibility;
use crate::objective;
use crate::state::{ActivityIdx, State, StudentIdx};

/// Chooses the lookahead depth from the time remaining until `deadline`: two steps with plenty
/// of time left, one step once less than three minutes remain, and a depth-0 (no lookahead,
/// feasibility-checked) leaf once less than thirty seconds remain.
pub fn get_depth(deadline: Instant) -> u8 {
    let time_left = deadline.saturating_duration_since(Instant::now());
    if time_left < Duration::from_secs(30) {
        0
    } else if time_left < Duration::from_secs(180) {
        1
    } else {
        2
    }
}

/// Builds the sample of `(student, activity)` keys the explorer considers this round: every
/// pending key when there are at most 500 of them, otherwise a budget of
/// `3 * (10 + floor(sqrt(pending count)))` keys filled first from `priority_moves`, then from keys
/// with a target at least half of `enough_room` away from capacity, then uniformly at random from
/// whatever remains (skipping keys already touched this run).
pub fn build_sample(state: &State, rng: &mut impl Rng) -> Vec<(StudentIdx, ActivityIdx)> {
    let total = state.pending_moves().len();
    if total <= 500 {
        let mut keys: Vec<_> = state.pending_moves().keys().copied().collect();
        keys.sort_unstable();
        return keys;
    }

    let target = 3 * (10 + (total as f64).sqrt().floor() as usize);
    let mut sample = Vec::with_capacity(target);
    let mut seen = HashSet::with_capacity(target);

    let mut priority: Vec<_> = state.priority_moves().iter().copied().collect();
    priority.sort_unstable();
    for key in priority {
        if sample.len() >= target {
            break;
        }
        if seen.insert(key) {
            sample.push(key);
        }
    }

    if sample.len() < target {
        let half = state.enough_room() / 2;
        let mut roomy: Vec<_> = state
            .pending_moves()
            .iter()
            .filter(|(key, queue)| {
                !seen.contains(*key)
                    && queue
                        .iter()
                        .any(|&g| state.group(g).max.saturating_sub(state.group(g).count) >= half)
            })
            .map(|(key, _)| *key)
            .collect();
        roomy.sort_unstable();
        for key in roomy {
            if sample.len() >= target {
                break;
            }
            if seen.insert(key) {
                sample.push(key);
            }
        }
    }

    let mut remaining: Vec<_> = state
        .pending_moves()
        .keys()
        .copied()
        .filter(|k| !seen.contains(k) && !state.global_moves_made().contains(k))
        .collect();
    remaining.sort_unstable();
    while sample.len() < target && !remaining.is_empty() {
        let idx = rng.gen_range(0..remaining.len());
        let key = remaining.swap_remove(idx);
        if seen.insert(key) {
            sample.push(key);
        }
    }

    sample
}

/// Applies `(student, activity, to_group)`, recursively looks `depth` further steps into the
/// sample for the best achievable score, then undoes the move and returns the best score seen (or
/// `None` if the move itself was infeasible, or — at depth 0 — left the state infeasible overall).
///
/// At depth 0 the move is checked against [`feasibility::state_ok`] as well as `move_ok`, since a
/// deeper branch may have passed through an overlap or capacity state that only the leaf checks
/// in full. At depth > 0 no such check is made; only the recursive continuation matters.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    state: &mut State,
    config: &Config,
    student: StudentIdx,
    activity: ActivityIdx,
    to_group: usize,
    moves_made: &HashSet<(StudentIdx, ActivityIdx)>,
    sample: &[(StudentIdx, ActivityIdx)],
    allow_infeasible: bool,
    depth: u8,
    rng: &mut impl Rng,
    deadline: Instant,
) -> Option<i64> {
    let from_group = state
        .record(student, activity)
        .expect("evaluate called with a known record")
        .current_group;
    if !feasibility::move_ok(state, student, from_group, to_group) {
        return None;
    }

    if depth == 0 {
        state.apply_move(student, activity, to_group);
        let ok = allow_infeasible || feasibility::state_ok(state);
        let result = if ok {
            Some(objective::score(state, config).total())
        } else {
            None
        };
        state.undo_move(student, activity, to_group);
        return result;
    }

    state.apply_move(student, activity, to_group);
    let mut nested_moves_made = moves_made.clone();
    nested_moves_made.insert((student, activity));

    let mut best: Option<i64> = None;
    for &(next_student, next_activity) in sample {
        if Instant::now() >= deadline {
            break;
        }
        if nested_moves_made.contains(&(next_student, next_activity)) {
            continue;
        }
        let queue: Vec<usize> = match state.pending_moves().get(&(next_student, next_activity)) {
            Some(q) => q.iter().copied().collect(),
            None => continue,
        };
        for next_to_group in queue {
            if state.group(next_to_group).count >= state.group(next_to_group).max {
                continue;
            }
            let candidate = evaluate(
                state,
                config,
                next_student,
                next_activity,
                next_to_group,
                &nested_moves_made,
                sample,
                allow_infeasible,
                depth - 1,
                rng,
                deadline,
            );
            if let Some(value) = candidate {
                if best.map_or(true, |b| value > b) {
                    best = Some(value);
                }
            }
        }
    }

    state.undo_move(student, activity, to_group);
    best
}

/// One round of the explorer: samples pending candidates, evaluates each with one-step (or
/// two-step) lookahead at the depth [`get_depth`] selects, and commits the single best-scoring
/// root move if it beats the current score. Returns whether a move was committed.
pub fn explore(state: &mut State, config: &Config, rng: &mut impl Rng, deadline: Instant) -> bool {
    let current_score = objective::score(state, config).total();
    let depth = get_depth(deadline);
    let sample = build_sample(state, rng);
    let moves_made = state.global_moves_made().clone();

    let mut best: Option<(StudentIdx, ActivityIdx, usize, i64)> = None;
    for &(student, activity) in &sample {
        if Instant::now() >= deadline {
            debug!("explorer: deadline reached mid-sample");
            break;
        }
        if moves_made.contains(&(student, activity)) {
            continue;
        }
        let queue: Vec<usize> = match state.pending_moves().get(&(student, activity)) {
            Some(q) => q.iter().copied().collect(),
            None => continue,
        };
        for to_group in queue {
            let value = evaluate(
                state,
                config,
                student,
                activity,
                to_group,
                &moves_made,
                &sample,
                false,
                depth,
                rng,
                deadline,
            );
            if let Some(v) = value {
                if best.map_or(true, |(_, _, _, b)| v > b) {
                    best = Some((student, activity, to_group, v));
                }
            }
        }
    }

    match best {
        Some((student, activity, to_group, value)) if value > current_score => {
            state.apply_move(student, activity, to_group);
            state.global_moves_made.insert((student, activity));
            true
        }
        _ => false,
    }
}

/// The backtracking retry phase, used when a normal [`explore`] round finds nothing. Unlike
/// `explore`, which only ever considers `(student, activity)` pairs not yet touched this run,
/// `backtrack` revisits the pairs already in `global_moves_made` whose candidate queue still has
/// entries, looking for a different target for them, with infeasible intermediate states allowed
/// and the lookahead depth increased by one.
pub fn backtrack(state: &mut State, config: &Config, rng: &mut impl Rng, deadline: Instant) -> bool {
    let current_score = objective::score(state, config).total();
    let depth = (get_depth(deadline) + 1).min(2);
    let sample = build_sample(state, rng);

    let mut moved_keys: Vec<(StudentIdx, ActivityIdx)> = state
        .global_moves_made()
        .iter()
        .copied()
        .filter(|key| state.pending_moves().contains_key(key))
        .collect();
    moved_keys.sort_unstable();

    let mut best: Option<(StudentIdx, ActivityIdx, usize, i64)> = None;
    for &(student, activity) in &moved_keys {
        if Instant::now() >= deadline {
            debug!("backtrack: deadline reached mid-sample");
            break;
        }
        let queue: Vec<usize> = match state.pending_moves().get(&(student, activity)) {
            Some(q) => q.iter().copied().collect(),
            None => continue,
        };
        for to_group in queue {
            let value = evaluate(
                state,
                config,
                student,
                activity,
                to_group,
                &HashSet::new(),
                &sample,
                true,
                depth,
                rng,
                deadline,
            );
            if let Some(v) = value {
                if best.map_or(true, |(_, _, _, b)| v > b) {
                    best = Some((student, activity, to_group, v));
                }
            }
        }
    }

    match best {
        Some((student, activity, to_group, value)) if value > current_score => {
            state.apply_move(student, activity, to_group);
            state.global_moves_made.insert((student, activity));
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_fixtures::simple_state;
    use rand::{rngs::StdRng, SeedableRng};
    use std::time::Duration;

    fn config() -> Config {
        Config {
            timeout: Duration::from_secs(1),
            award_activity: vec![10],
            award_student: 5,
            minmax_penalty: 2,
            seed: 7,
            output_path: "out.csv".into(),
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn get_depth_shrinks_as_deadline_approaches() {
        assert_eq!(get_depth(Instant::now() + Duration::from_secs(500)), 2);
        assert_eq!(get_depth(Instant::now() + Duration::from_secs(60)), 1);
        assert_eq!(get_depth(Instant::now() + Duration::from_secs(5)), 0);
        assert_eq!(get_depth(Instant::now()), 0);
    }

    #[test]
    fn build_sample_returns_all_pending_keys_when_small() {
        let mut state = simple_state();
        state.pending_moves.entry((0, 0)).or_default().push_back(1);
        let mut rng = StdRng::seed_from_u64(1);
        let sample = build_sample(&state, &mut rng);
        assert_eq!(sample, vec![(0, 0)]);
    }

    #[test]
    fn explore_commits_an_improving_move() {
        let mut state = simple_state();
        state.requests.push((0, 0, 1));
        state.requests_by_student[0].insert((0, 1), 0);
        state.pending_moves.entry((0, 0)).or_default().push_back(1);
        state.requested_activities_per_student[0] = 1;

        let mut rng = StdRng::seed_from_u64(config().seed);
        let improved = explore(&mut state, &config(), &mut rng, far_deadline());

        assert!(improved);
        assert_eq!(state.record(0, 0).unwrap().current_group, 1);
    }

    #[test]
    fn backtrack_revisits_an_already_moved_pair_that_explore_skips() {
        let mut state = simple_state();
        state.requests.push((0, 0, 1));
        state.requests_by_student[0].insert((0, 1), 0);
        state.pending_moves.entry((0, 0)).or_default().push_back(1);
        state.requested_activities_per_student[0] = 1;
        state.global_moves_made.insert((0, 0));

        let mut rng = StdRng::seed_from_u64(config().seed);
        assert!(!explore(&mut state, &config(), &mut rng, far_deadline()));
        assert_eq!(state.record(0, 0).unwrap().current_group, 0);

        let improved = backtrack(&mut state, &config(), &mut rng, far_deadline());
        assert!(improved);
        assert_eq!(state.record(0, 0).unwrap().current_group, 1);
    }
}
