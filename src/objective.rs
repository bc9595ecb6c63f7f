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

//! The five-term objective. Higher is better; the passes and the explorer only ever compare
//! [`ScoreBreakdown::total`] values, but the breakdown is kept around for logging and for the
//! standalone re-scoring entry point used by tests that reload a written-out assignment.

use std::fmt;

use crate::config::Config;
use crate::state::State;

/// The five components of the objective, as defined by the data model: `a` sums the swap weight
/// of every satisfied request, `b` sums a per-student award for the number of activities moved,
/// `c` counts fully-satisfied students, and `d`/`e` are soft penalties for groups outside their
/// preferred capacity band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub e: i64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i64 {
        self.a + self.b + self.c - self.d - self.e
    }
}

impl fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "score {} (a={} b={} c={} d={} e={})",
            self.total(),
            self.a,
            self.b,
            self.c,
            self.d,
            self.e
        )
    }
}

/// Scores the current state. This is the library's standalone re-scoring entry point: it takes
/// no search state besides `state` and `config`, so it can be used to grade a frozen or
/// externally produced assignment as well as a state mid-search.
pub fn score(state: &State, config: &Config) -> ScoreBreakdown {
    ScoreBreakdown {
        a: score_a(state),
        b: score_b(state, config),
        c: score_c(state, config),
        d: score_d(state, config),
        e: score_e(state, config),
    }
}

/// Sum of swap weights over every request that is currently satisfied: the student's current
/// group is the requested one, and it differs from the student's starting group.
fn score_a(state: &State) -> i64 {
    let mut total = 0i64;
    for &(student, activity, requested_group) in state.requests() {
        let record = state.record(student, activity).expect("request for known record");
        if record.current_group == requested_group && record.current_group != record.original_group {
            total += record.swap_weight as i64;
        }
    }
    total
}

/// Sum, over every student, of an award keyed by how many distinct activities that student has
/// moved out of their starting group. Students who haven't moved anything contribute nothing.
fn score_b(state: &State, config: &Config) -> i64 {
    let mut moved_per_student = vec![0usize; state.num_students()];
    for record in state.records() {
        if record.current_group != record.original_group {
            moved_per_student[record.student] += 1;
        }
    }
    moved_per_student
        .into_iter()
        .filter(|&moved| moved > 0)
        .map(|moved| config.activity_award(moved))
        .sum()
}

/// Flat bonus per student whose every requested activity is currently satisfied. A student with
/// no requests at all never counts.
fn score_c(state: &State, config: &Config) -> i64 {
    let mut satisfied_per_student = vec![0u32; state.num_students()];
    for &(student, activity, requested_group) in state.requests() {
        let record = state.record(student, activity).expect("request for known record");
        if record.current_group == requested_group && record.current_group != record.original_group {
            satisfied_per_student[student] += 1;
        }
    }
    let mut fully_satisfied = 0i64;
    for student in 0..state.num_students() {
        let requested = state.requested_activities_per_student(student);
        if requested > 0 && satisfied_per_student[student] == requested {
            fully_satisfied += 1;
        }
    }
    fully_satisfied * config.award_student
}

/// Penalty for groups under their preferred minimum.
fn score_d(state: &State, config: &Config) -> i64 {
    state
        .groups()
        .iter()
        .filter(|g| g.count < g.min_preferred)
        .map(|g| (g.min_preferred - g.count) as i64 * config.minmax_penalty)
        .sum()
}

/// Penalty for groups over their preferred maximum.
fn score_e(state: &State, config: &Config) -> i64 {
    state
        .groups()
        .iter()
        .filter(|g| g.count > g.max_preferred)
        .map(|g| (g.count - g.max_preferred) as i64 * config.minmax_penalty)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_fixtures::simple_state;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            timeout: Duration::from_secs(1),
            award_activity: vec![10, 15, 20],
            award_student: 5,
            minmax_penalty: 2,
            seed: 0,
            output_path: "out.csv".into(),
        }
    }

    #[test]
    fn fresh_state_scores_zero() {
        let state = simple_state();
        let breakdown = score(&state, &config());
        assert_eq!(breakdown.total(), 0);
    }

    #[test]
    fn satisfied_move_contributes_swap_weight_and_activity_award() {
        let mut state = simple_state();
        state.requests.push((0, 0, 1));
        state.requests_by_student[0].insert((0, 1), 0);
        state.records[0].current_group = 1;
        state.requested_activities_per_student[0] = 1;
        let breakdown = score(&state, &config());
        assert_eq!(breakdown.a, 3);
        assert_eq!(breakdown.b, 10);
        assert_eq!(breakdown.c, 5);
    }

    #[test]
    fn overflowing_group_is_penalized() {
        let mut state = simple_state();
        state.groups[0].max_preferred = 0;
        let breakdown = score(&state, &config());
        assert_eq!(breakdown.e, 2);
    }
}
