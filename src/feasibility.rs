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

//! Feasibility oracle: the hard constraints a move, a swap or a whole state must satisfy.
//!
//! Nothing in this module mutates `State`; the mutator consults these predicates before
//! committing anything, and the explorer's depth-0 leaves re-check `state_ok` explicitly since a
//! deeper branch may have been allowed to pass through a transiently infeasible state.

use crate::state::{GroupIdx, State, StudentIdx};

/// Whether `student` can move from `from_group` to `to_group` in isolation: `from_group` must
/// stay at or above its minimum, `to_group` must stay at or below its maximum, and the move must
/// not put the student into two groups that overlap on the timetable unless that particular pair
/// was already grandfathered in at load time.
pub fn move_ok(state: &State, student: StudentIdx, from_group: GroupIdx, to_group: GroupIdx) -> bool {
    let from = state.group(from_group);
    if from.count <= from.min {
        return false;
    }
    let to = state.group(to_group);
    if to.count >= to.max {
        return false;
    }
    no_new_collision(state, student, from_group, to_group)
}

/// Whether `student` can move from `from_group` to `to_group` as one half of a simultaneous
/// two-student swap. `from_group`'s minimum is checked as usual, but `to_group`'s capacity is
/// evaluated as if its maximum were one higher, since the counterpart leaves `to_group` at the
/// same instant `student` enters it.
pub fn swap_ok(state: &State, student: StudentIdx, from_group: GroupIdx, to_group: GroupIdx) -> bool {
    let from = state.group(from_group);
    if from.count <= from.min {
        return false;
    }
    let to = state.group(to_group);
    if to.count >= to.max + 1 {
        return false;
    }
    no_new_collision(state, student, from_group, to_group)
}

fn no_new_collision(state: &State, student: StudentIdx, from_group: GroupIdx, to_group: GroupIdx) -> bool {
    for &other_group in state.groups_by_student(student) {
        if other_group == from_group {
            continue;
        }
        if state.is_overlapping(other_group, to_group)
            && !state.is_grandfathered(student, other_group, to_group)
        {
            return false;
        }
    }
    true
}

/// Whether the whole state currently satisfies every group capacity band and every student's
/// overlap constraints. Capacity is checked against `min`/`max` (not the soft preferred band,
/// which only affects the objective). Overlap pairs are checked in both orderings, which is safe
/// since the relation is symmetric by construction.
pub fn state_ok(state: &State) -> bool {
    for group in state.groups() {
        if group.count < group.min || group.count > group.max {
            return false;
        }
    }
    for student in 0..state.num_students() {
        let groups = state.groups_by_student(student);
        for &g1 in groups {
            for &g2 in groups {
                if g1 == g2 {
                    continue;
                }
                if state.is_overlapping(g1, g2) && !state.is_grandfathered(student, g1, g2) {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_fixtures::simple_state;

    #[test]
    fn move_ok_allows_move_into_open_group() {
        let state = simple_state();
        assert!(move_ok(&state, 0, 0, 1));
    }

    #[test]
    fn move_ok_rejects_full_target() {
        let mut state = simple_state();
        state.groups[1].max = 0;
        assert!(!move_ok(&state, 0, 0, 1));
    }

    #[test]
    fn move_ok_rejects_draining_origin_below_min() {
        let mut state = simple_state();
        state.groups[0].min = 1;
        assert!(!move_ok(&state, 0, 0, 1));
    }

    #[test]
    fn move_ok_rejects_overlap_collision() {
        let mut state = simple_state();
        // Student 0 also sits in group 2 for another activity; group 2 and group 1 (the move
        // target) overlap on the timetable and the pair was never grandfathered.
        state.groups_by_student[0].insert(2);
        state.overlaps[2].insert(1);
        state.overlaps[1].insert(2);
        assert!(!move_ok(&state, 0, 0, 1));
    }

    #[test]
    fn state_ok_true_for_freshly_built_state() {
        let state = simple_state();
        assert!(state_ok(&state));
    }

    #[test]
    fn state_ok_false_when_group_below_min() {
        let mut state = simple_state();
        state.groups[0].min = 5;
        assert!(!state_ok(&state));
    }
}
