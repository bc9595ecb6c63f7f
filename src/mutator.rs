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

//! The mutator: the only code in the crate allowed to change a committed record's current
//! group. `apply_move` and `undo_move` keep every cross-index consistent and are an exact
//! round-trip pair, which the explorer relies on to backtrack out of recursive lookahead.

use crate::state::{ActivityIdx, GroupIdx, MoveLogEntry, State, StudentIdx};

impl State {
    /// Moves `student`'s `activity` record from its current group to `to_group`.
    ///
    /// Updates group occupancy, rewrites every other pending request of this student whose
    /// `from_group` side equals the vacated group to point at `to_group` instead (the request
    /// that was satisfied by this exact move is consumed rather than rewritten), removes
    /// `to_group` from the `(student, activity)` pending candidate queue — dropping the queue
    /// entry and its `priority_moves` membership entirely if it was the last candidate — and does
    /// not requeue the vacated group as a new candidate. The caller is expected to have already
    /// checked [`crate::feasibility::move_ok`].
    pub fn apply_move(&mut self, student: StudentIdx, activity: ActivityIdx, to_group: GroupIdx) {
        let record_idx = self.record_index[&(student, activity)];
        let from_group = self.records[record_idx].current_group;
        debug_assert_ne!(from_group, to_group, "apply_move called with a no-op target");

        self.groups[from_group].count -= 1;
        self.groups[to_group].count += 1;

        let reqs = &mut self.requests_by_student[student];
        reqs.remove(&(from_group, to_group));
        let rekeyed: Vec<GroupIdx> = reqs
            .keys()
            .filter(|(from, _)| *from == from_group)
            .map(|(_, to)| *to)
            .collect();
        for to in &rekeyed {
            let act = reqs.remove(&(from_group, *to)).expect("key just collected");
            reqs.insert((to_group, *to), act);
        }

        let mut pending_entry_dropped = false;
        if let Some(queue) = self.pending_moves.get_mut(&(student, activity)) {
            if let Some(pos) = queue.iter().position(|&g| g == to_group) {
                queue.remove(pos);
            }
            if queue.is_empty() {
                self.pending_moves.remove(&(student, activity));
                self.priority_moves.remove(&(student, activity));
                pending_entry_dropped = true;
            }
        }

        self.records[record_idx].current_group = to_group;
        self.recompute_groups_by_student(student);

        self.move_log.push(MoveLogEntry {
            student,
            activity,
            from_group,
            to_group,
            rekeyed,
            pending_entry_dropped,
        });
    }

    /// Exact inverse of the most recent [`State::apply_move`] for `(student, activity, to_group)`.
    /// Must be called with the same arguments as the move being undone, and calls must nest
    /// strictly (last applied, first undone) — this is what every caller in `passes` and
    /// `explorer` already does.
    pub fn undo_move(&mut self, student: StudentIdx, activity: ActivityIdx, to_group: GroupIdx) {
        let entry = self
            .move_log
            .pop()
            .expect("undo_move called with no matching apply_move");
        debug_assert_eq!(entry.student, student);
        debug_assert_eq!(entry.activity, activity);
        debug_assert_eq!(entry.to_group, to_group);
        let from_group = entry.from_group;

        self.groups[to_group].count -= 1;
        self.groups[from_group].count += 1;

        let reqs = &mut self.requests_by_student[student];
        for to in entry.rekeyed.iter().rev() {
            let act = reqs.remove(&(to_group, *to)).expect("rekeyed during apply_move");
            reqs.insert((from_group, *to), act);
        }
        reqs.insert((from_group, to_group), activity);

        if entry.pending_entry_dropped {
            self.pending_moves
                .entry((student, activity))
                .or_default()
                .push_back(to_group);
            if self.groups[to_group].count + self.enough_room <= self.groups[to_group].max {
                self.priority_moves.insert((student, activity));
            }
        } else {
            self.pending_moves
                .get_mut(&(student, activity))
                .expect("entry survived this move")
                .push_back(to_group);
        }

        self.records[self.record_index[&(student, activity)]].current_group = from_group;
        self.recompute_groups_by_student(student);
    }
}

#[cfg(test)]
mod tests {
    use crate::objective;
    use crate::state::test_fixtures::simple_state;
    use crate::Config;
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

    #[test]
    fn apply_then_undo_round_trips_score_and_counts() {
        let mut state = simple_state();
        let before = objective::score(&state, &config());
        let before_counts: Vec<u32> = state.groups().iter().map(|g| g.count).collect();

        state.apply_move(0, 0, 1);
        assert_eq!(state.group(0).count, 0);
        assert_eq!(state.group(1).count, 1);

        state.undo_move(0, 0, 1);
        let after = objective::score(&state, &config());
        let after_counts: Vec<u32> = state.groups().iter().map(|g| g.count).collect();

        assert_eq!(before, after);
        assert_eq!(before_counts, after_counts);
        assert_eq!(state.record(0, 0).unwrap().current_group, 0);
    }

    #[test]
    fn apply_move_does_not_requeue_origin() {
        let mut state = simple_state();
        state.requests.push((0, 0, 1));
        state.requests_by_student[0].insert((0, 1), 0);
        state.pending_moves.entry((0, 0)).or_default().push_back(1);
        state.requested_activities_per_student[0] = 1;

        state.apply_move(0, 0, 1);
        assert!(!state.pending_moves().contains_key(&(0, 0)));

        state.undo_move(0, 0, 1);
        // the pending candidate reappears, but group 0 (the vacated origin) is never
        // auto-added as a new candidate by the move itself.
        let queue = state.pending_moves().get(&(0, 0)).unwrap();
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![&1]);
    }
}
