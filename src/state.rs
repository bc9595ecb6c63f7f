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

//! The state store: ground-truth tables for students, groups and their per-activity
//! assignments, plus every cross-index the rest of the engine relies on instead of scanning.
//!
//! `State` never changes its own tables except through [`State::apply_move`] /
//! [`State::undo_move`] (see the `mutator` module) and the bulk loaders in [`State::build`],
//! which is the only place a caller can construct one.

use std::collections::{HashMap, HashSet, VecDeque};

/// Dense index of a student within [`State`]'s tables.
pub type StudentIdx = usize;
/// Dense index of an activity.
pub type ActivityIdx = usize;
/// Dense index of a group.
pub type GroupIdx = usize;
/// Dense index of a student-activity record.
pub type RecordIdx = usize;

/// A group's capacity band and current occupancy.
#[derive(Clone, Debug)]
pub struct Group {
    pub id: String,
    pub min: u32,
    pub min_preferred: u32,
    pub max_preferred: u32,
    pub max: u32,
    pub count: u32,
}

/// One student's assignment to one activity: the group the student started in, and the group
/// the student currently occupies.
#[derive(Clone, Debug)]
pub struct StudentActivityRecord {
    pub student: StudentIdx,
    pub activity: ActivityIdx,
    pub swap_weight: u32,
    pub original_group: GroupIdx,
    pub current_group: GroupIdx,
}

/// Raw input row for the students table, as read from CSV (group ids still as strings).
#[derive(Clone, Debug)]
pub struct StudentRow {
    pub student_id: String,
    pub activity_id: String,
    pub swap_weight: u32,
    pub group_id: String,
    /// `"0"` means "unchanged" (start in `group_id`).
    pub new_group_id: String,
}

/// Raw input row for the requests table.
#[derive(Clone, Debug)]
pub struct RequestRow {
    pub student_id: String,
    pub activity_id: String,
    pub requested_group_id: String,
}

/// Raw input row for the overlaps table: two groups whose timetable slots collide.
#[derive(Clone, Debug)]
pub struct OverlapRow {
    pub group1_id: String,
    pub group2_id: String,
}

/// Raw input row for the limits table: a group's declaration and capacity band.
#[derive(Clone, Debug)]
pub struct LimitRow {
    pub group_id: String,
    pub students_cnt: u32,
    pub min: u32,
    pub min_preferred: u32,
    pub max_preferred: u32,
    pub max: u32,
}

/// The one-applied-move log entry needed to make `undo_move` an exact inverse of `apply_move`,
/// since the public signature only carries `(student, activity, to_group)`.
#[derive(Clone, Debug)]
pub(crate) struct MoveLogEntry {
    pub student: StudentIdx,
    pub activity: ActivityIdx,
    pub from_group: GroupIdx,
    pub to_group: GroupIdx,
    /// The other request target groups rekeyed from `(from_group, x)` to `(to_group, x)` by this
    /// move; restored on undo.
    pub rekeyed: Vec<GroupIdx>,
    /// Whether `pending_moves[(student, activity)]` was dropped entirely because this was its
    /// last remaining candidate.
    pub pending_entry_dropped: bool,
}

/// The full mutable state of one search run.
pub struct State {
    pub(crate) groups: Vec<Group>,
    pub(crate) group_index: HashMap<String, GroupIdx>,

    pub(crate) student_ids: Vec<String>,
    pub(crate) student_index: HashMap<String, StudentIdx>,

    pub(crate) activity_ids: Vec<String>,
    pub(crate) activity_index: HashMap<String, ActivityIdx>,

    pub(crate) records: Vec<StudentActivityRecord>,
    pub(crate) record_index: HashMap<(StudentIdx, ActivityIdx), RecordIdx>,
    /// Every record belonging to a given student, in load order.
    pub(crate) student_records: Vec<Vec<RecordIdx>>,

    pub(crate) groups_by_student: Vec<HashSet<GroupIdx>>,
    pub(crate) students_by_group: Vec<HashSet<StudentIdx>>,
    pub(crate) students_by_activity: Vec<HashSet<StudentIdx>>,

    /// Deduplicated `(student, activity, requested_group)` triples that survived load-time
    /// filtering (dangling references and already-satisfied requests dropped).
    pub(crate) requests: Vec<(StudentIdx, ActivityIdx, GroupIdx)>,
    pub(crate) requests_by_student: Vec<HashMap<(GroupIdx, GroupIdx), ActivityIdx>>,
    pub(crate) requested_activities_per_student: Vec<u32>,

    pub(crate) pending_moves: HashMap<(StudentIdx, ActivityIdx), VecDeque<GroupIdx>>,
    pub(crate) priority_moves: HashSet<(StudentIdx, ActivityIdx)>,
    pub(crate) global_moves_made: HashSet<(StudentIdx, ActivityIdx)>,

    pub(crate) overlaps: Vec<HashSet<GroupIdx>>,
    /// Per-student set of overlap pairs `(g1, g2)` the student already straddled at load time
    /// and is therefore allowed to keep straddling (both orderings recorded).
    pub(crate) grandfathered: Vec<HashSet<(GroupIdx, GroupIdx)>>,

    pub(crate) enough_room: u32,

    pub(crate) move_log: Vec<MoveLogEntry>,
}

impl State {
    /// Builds a `State` from the four raw input tables, applying every load-time filtering rule:
    /// dangling student/activity references on a request row are dropped, a request already
    /// satisfied by the student's starting group is dropped, and a dangling group reference on an
    /// overlap row is dropped. A group referenced by a student row but absent from the limits
    /// table is a fatal input-shape error.
    pub fn build(
        limits: &[LimitRow],
        students: &[StudentRow],
        requests: &[RequestRow],
        overlaps: &[OverlapRow],
    ) -> Result<State, String> {
        let mut groups = Vec::with_capacity(limits.len());
        let mut group_index = HashMap::with_capacity(limits.len());
        for row in limits {
            if group_index.contains_key(&row.group_id) {
                return Err(format!("duplicate group id in limits table: {}", row.group_id));
            }
            group_index.insert(row.group_id.clone(), groups.len());
            groups.push(Group {
                id: row.group_id.clone(),
                min: row.min,
                min_preferred: row.min_preferred,
                max_preferred: row.max_preferred,
                max: row.max,
                count: 0,
            });
        }

        let mut state = State {
            groups,
            group_index,
            student_ids: Vec::new(),
            student_index: HashMap::new(),
            activity_ids: Vec::new(),
            activity_index: HashMap::new(),
            records: Vec::new(),
            record_index: HashMap::new(),
            student_records: Vec::new(),
            groups_by_student: Vec::new(),
            students_by_group: vec![HashSet::new(); 0],
            students_by_activity: Vec::new(),
            requests: Vec::new(),
            requests_by_student: Vec::new(),
            requested_activities_per_student: Vec::new(),
            pending_moves: HashMap::new(),
            priority_moves: HashSet::new(),
            global_moves_made: HashSet::new(),
            overlaps: Vec::new(),
            grandfathered: Vec::new(),
            enough_room: 0,
            move_log: Vec::new(),
        };
        state.students_by_group = vec![HashSet::new(); state.groups.len()];
        state.overlaps = vec![HashSet::new(); state.groups.len()];

        for row in students {
            let student = state.intern_student(&row.student_id);
            let activity = state.intern_activity(&row.activity_id);

            let original_group = *state.group_index.get(&row.group_id).ok_or_else(|| {
                format!(
                    "student row references unknown group id: {}",
                    row.group_id
                )
            })?;
            let current_group = if row.new_group_id == "0" {
                original_group
            } else {
                *state
                    .group_index
                    .get(&row.new_group_id)
                    .ok_or_else(|| {
                        format!(
                            "student row references unknown group id: {}",
                            row.new_group_id
                        )
                    })?
            };

            let record_idx = state.records.len();
            if state
                .record_index
                .insert((student, activity), record_idx)
                .is_some()
            {
                return Err(format!(
                    "duplicate student-activity record: {} / {}",
                    row.student_id, row.activity_id
                ));
            }
            state.records.push(StudentActivityRecord {
                student,
                activity,
                swap_weight: row.swap_weight,
                original_group,
                current_group,
            });
            state.student_records[student].push(record_idx);
            state.groups_by_student[student].insert(current_group);
            state.students_by_group[current_group].insert(student);
            state.students_by_activity[activity].insert(student);
            state.groups[current_group].count += 1;
        }

        let total_free: u64 = state
            .groups
            .iter()
            .map(|g| (g.max.saturating_sub(g.count)) as u64)
            .sum();
        state.enough_room = if state.groups.is_empty() {
            0
        } else {
            let avg = total_free as f64 / state.groups.len() as f64;
            (2.0 + 2.0 * avg.sqrt()).floor() as u32
        };

        for row in requests {
            let (student, activity) = match (
                state.student_index.get(&row.student_id),
                state.activity_index.get(&row.activity_id),
            ) {
                (Some(&s), Some(&a)) => (s, a),
                _ => {
                    log::debug!(
                        "dropping request for unknown student/activity: {} / {}",
                        row.student_id, row.activity_id
                    );
                    continue;
                }
            };
            let record_idx = match state.record_index.get(&(student, activity)) {
                Some(&r) => r,
                None => {
                    log::debug!(
                        "dropping request with no matching student-activity record: {} / {}",
                        row.student_id, row.activity_id
                    );
                    continue;
                }
            };
            let requested_group = match state.group_index.get(&row.requested_group_id) {
                Some(&g) => g,
                None => {
                    log::debug!(
                        "dropping request for unknown group: {}",
                        row.requested_group_id
                    );
                    continue;
                }
            };

            let current_group = state.records[record_idx].current_group;
            if requested_group == current_group {
                log::debug!(
                    "dropping already-satisfied request: {} / {}",
                    row.student_id, row.activity_id
                );
                continue;
            }

            let key = (student, activity);
            let was_new = !state.pending_moves.contains_key(&key);
            let queue = state.pending_moves.entry(key).or_default();
            if queue.contains(&requested_group) {
                continue;
            }
            queue.push_back(requested_group);
            if was_new {
                state.requested_activities_per_student[student] += 1;
            }
            state.requests.push((student, activity, requested_group));
            state.requests_by_student[student].insert((current_group, requested_group), activity);
        }

        for (key, queue) in state.pending_moves.iter() {
            let has_room = queue
                .iter()
                .any(|&g| state.groups[g].max.saturating_sub(state.groups[g].count) >= state.enough_room);
            if has_room {
                state.priority_moves.insert(*key);
            }
        }

        for row in overlaps {
            let (g1, g2) = match (
                state.group_index.get(&row.group1_id),
                state.group_index.get(&row.group2_id),
            ) {
                (Some(&g1), Some(&g2)) => (g1, g2),
                _ => {
                    log::debug!(
                        "dropping overlap row with unknown group: {} / {}",
                        row.group1_id, row.group2_id
                    );
                    continue;
                }
            };
            state.overlaps[g1].insert(g2);
            state.overlaps[g2].insert(g1);

            let both = state.students_by_group[g1]
                .intersection(&state.students_by_group[g2])
                .copied()
                .collect::<Vec<_>>();
            for s in both {
                state.grandfathered[s].insert((g1, g2));
                state.grandfathered[s].insert((g2, g1));
            }
        }

        Ok(state)
    }

    fn intern_student(&mut self, id: &str) -> StudentIdx {
        if let Some(&idx) = self.student_index.get(id) {
            return idx;
        }
        let idx = self.student_ids.len();
        self.student_ids.push(id.to_owned());
        self.student_index.insert(id.to_owned(), idx);
        self.groups_by_student.push(HashSet::new());
        self.requests_by_student.push(HashMap::new());
        self.requested_activities_per_student.push(0);
        self.grandfathered.push(HashSet::new());
        self.student_records.push(Vec::new());
        idx
    }

    fn intern_activity(&mut self, id: &str) -> ActivityIdx {
        if let Some(&idx) = self.activity_index.get(id) {
            return idx;
        }
        let idx = self.activity_ids.len();
        self.activity_ids.push(id.to_owned());
        self.activity_index.insert(id.to_owned(), idx);
        self.students_by_activity.push(HashSet::new());
        idx
    }

    /// Recomputes `groups_by_student[s]` from `student_records[s]` and updates the inverse
    /// `students_by_group` index to match. Called after every change to a record's
    /// `current_group`, since a student can hold the same group across more than one activity.
    pub(crate) fn recompute_groups_by_student(&mut self, s: StudentIdx) {
        let new_set: HashSet<GroupIdx> = self.student_records[s]
            .iter()
            .map(|&r| self.records[r].current_group)
            .collect();
        for g in self.groups_by_student[s].iter() {
            if !new_set.contains(g) {
                self.students_by_group[*g].remove(&s);
            }
        }
        for g in new_set.iter() {
            if !self.groups_by_student[s].contains(g) {
                self.students_by_group[*g].insert(s);
            }
        }
        self.groups_by_student[s] = new_set;
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_students(&self) -> usize {
        self.student_ids.len()
    }

    pub fn group(&self, g: GroupIdx) -> &Group {
        &self.groups[g]
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn records(&self) -> &[StudentActivityRecord] {
        &self.records
    }

    pub fn record(&self, s: StudentIdx, a: ActivityIdx) -> Option<&StudentActivityRecord> {
        self.record_index.get(&(s, a)).map(|&r| &self.records[r])
    }

    pub fn student_id(&self, s: StudentIdx) -> &str {
        &self.student_ids[s]
    }

    pub fn activity_id(&self, a: ActivityIdx) -> &str {
        &self.activity_ids[a]
    }

    pub fn group_id(&self, g: GroupIdx) -> &str {
        &self.groups[g].id
    }

    pub fn groups_by_student(&self, s: StudentIdx) -> &HashSet<GroupIdx> {
        &self.groups_by_student[s]
    }

    pub fn students_by_group(&self, g: GroupIdx) -> &HashSet<StudentIdx> {
        &self.students_by_group[g]
    }

    pub fn students_by_activity(&self, a: ActivityIdx) -> &HashSet<StudentIdx> {
        &self.students_by_activity[a]
    }

    pub fn pending_moves(&self) -> &HashMap<(StudentIdx, ActivityIdx), VecDeque<GroupIdx>> {
        &self.pending_moves
    }

    pub fn priority_moves(&self) -> &HashSet<(StudentIdx, ActivityIdx)> {
        &self.priority_moves
    }

    pub fn global_moves_made(&self) -> &HashSet<(StudentIdx, ActivityIdx)> {
        &self.global_moves_made
    }

    pub fn requests(&self) -> &[(StudentIdx, ActivityIdx, GroupIdx)] {
        &self.requests
    }

    pub fn requested_activities_per_student(&self, s: StudentIdx) -> u32 {
        self.requested_activities_per_student[s]
    }

    pub fn is_overlapping(&self, g1: GroupIdx, g2: GroupIdx) -> bool {
        self.overlaps[g1].contains(&g2)
    }

    pub fn is_grandfathered(&self, s: StudentIdx, g1: GroupIdx, g2: GroupIdx) -> bool {
        self.grandfathered[s].contains(&(g1, g2))
    }

    pub fn enough_room(&self) -> u32 {
        self.enough_room
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    /// Two activities, three groups, one student, built as a minimal fixture for the feasibility
    /// and mutator tests. Group `g0` holds the student in activity `act`; `g1` and `g2` are open.
    pub fn simple_state() -> State {
        let limits = vec![
            LimitRow {
                group_id: "g0".into(),
                students_cnt: 1,
                min: 0,
                min_preferred: 0,
                max_preferred: 5,
                max: 5,
            },
            LimitRow {
                group_id: "g1".into(),
                students_cnt: 0,
                min: 0,
                min_preferred: 0,
                max_preferred: 5,
                max: 5,
            },
            LimitRow {
                group_id: "g2".into(),
                students_cnt: 0,
                min: 0,
                min_preferred: 0,
                max_preferred: 5,
                max: 5,
            },
        ];
        let students = vec![StudentRow {
            student_id: "s0".into(),
            activity_id: "act".into(),
            swap_weight: 3,
            group_id: "g0".into(),
            new_group_id: "0".into(),
        }];
        State::build(&limits, &students, &[], &[]).unwrap()
    }

    #[test]
    fn build_computes_group_counts() {
        let state = simple_state();
        assert_eq!(state.group(0).count, 1);
        assert_eq!(state.group(1).count, 0);
    }

    #[test]
    fn build_drops_already_satisfied_request() {
        let limits = vec![LimitRow {
            group_id: "g0".into(),
            students_cnt: 1,
            min: 0,
            min_preferred: 0,
            max_preferred: 5,
            max: 5,
        }];
        let students = vec![StudentRow {
            student_id: "s0".into(),
            activity_id: "act".into(),
            swap_weight: 1,
            group_id: "g0".into(),
            new_group_id: "0".into(),
        }];
        let requests = vec![RequestRow {
            student_id: "s0".into(),
            activity_id: "act".into(),
            requested_group_id: "g0".into(),
        }];
        let state = State::build(&limits, &students, &requests, &[]).unwrap();
        assert!(state.pending_moves().is_empty());
    }

    #[test]
    fn build_drops_dangling_request() {
        let limits = vec![LimitRow {
            group_id: "g0".into(),
            students_cnt: 1,
            min: 0,
            min_preferred: 0,
            max_preferred: 5,
            max: 5,
        }];
        let students = vec![StudentRow {
            student_id: "s0".into(),
            activity_id: "act".into(),
            swap_weight: 1,
            group_id: "g0".into(),
            new_group_id: "0".into(),
        }];
        let requests = vec![RequestRow {
            student_id: "ghost".into(),
            activity_id: "act".into(),
            requested_group_id: "g0".into(),
        }];
        let state = State::build(&limits, &students, &requests, &[]).unwrap();
        assert!(state.pending_moves().is_empty());
    }
}
