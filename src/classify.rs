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

//! Validity classifier: sorts every pending candidate move into exactly one of four categories,
//! in priority order, so the improvement passes can pick the ones worth attempting without
//! repeating the capacity/overlap checks themselves.

use std::collections::HashMap;

use crate::state::{ActivityIdx, GroupIdx, State, StudentIdx};

/// The category a pending candidate target falls into, checked in this priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// The target group is already at its maximum.
    Maxed,
    /// The origin group is already at its minimum, so the student can't leave it.
    Mined,
    /// The student already sits in a group that overlaps the target and the pair isn't
    /// grandfathered in.
    Collision,
    /// None of the above: the move is worth attempting.
    Valid,
}

/// One pending candidate move together with its classification.
#[derive(Clone, Copy, Debug)]
pub struct ClassifiedMove {
    pub student: StudentIdx,
    pub activity: ActivityIdx,
    pub to_group: GroupIdx,
    pub category: Category,
}

/// A snapshot classification of every pending candidate move against the state it was computed
/// from. Iteration order is by record then by queue order, so it is stable across runs and
/// independent of hash map iteration order.
pub struct Classification {
    moves: Vec<ClassifiedMove>,
    index: HashMap<(StudentIdx, ActivityIdx, GroupIdx), Category>,
}

impl Classification {
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedMove> {
        self.moves.iter()
    }

    pub fn category_of(&self, student: StudentIdx, activity: ActivityIdx, group: GroupIdx) -> Option<Category> {
        self.index.get(&(student, activity, group)).copied()
    }

    /// Whether `student` has any pending candidate for `activity` classified as a collision.
    pub fn has_collision(&self, student: StudentIdx, activity: ActivityIdx) -> bool {
        self.moves
            .iter()
            .any(|m| m.student == student && m.activity == activity && m.category == Category::Collision)
    }
}

/// Classifies every pending candidate move against the current state.
pub fn classify(state: &State) -> Classification {
    let mut moves = Vec::new();
    let mut index = HashMap::new();

    for record in state.records() {
        let key = (record.student, record.activity);
        let queue = match state.pending_moves().get(&key) {
            Some(q) => q,
            None => continue,
        };
        let from_group = record.current_group;
        for &to_group in queue {
            let category = classify_one(state, record.student, from_group, to_group);
            moves.push(ClassifiedMove {
                student: record.student,
                activity: record.activity,
                to_group,
                category,
            });
            index.insert((record.student, record.activity, to_group), category);
        }
    }

    Classification { moves, index }
}

fn classify_one(state: &State, student: StudentIdx, from_group: GroupIdx, to_group: GroupIdx) -> Category {
    let to = state.group(to_group);
    if to.count >= to.max {
        return Category::Maxed;
    }
    let from = state.group(from_group);
    if from.count <= from.min {
        return Category::Mined;
    }
    for &other_group in state.groups_by_student(student) {
        if other_group == from_group {
            continue;
        }
        if state.is_overlapping(other_group, to_group)
            && !state.is_grandfathered(student, other_group, to_group)
        {
            return Category::Collision;
        }
    }
    Category::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_fixtures::simple_state;

    fn with_pending_move(to_group: GroupIdx) -> crate::State {
        let mut state = simple_state();
        state.pending_moves.entry((0, 0)).or_default().push_back(to_group);
        state
    }

    #[test]
    fn open_target_classifies_as_valid() {
        let state = with_pending_move(1);
        let classification = classify(&state);
        assert_eq!(classification.category_of(0, 0, 1), Some(Category::Valid));
    }

    #[test]
    fn full_target_classifies_as_maxed() {
        let mut state = with_pending_move(1);
        state.groups[1].max = 0;
        let classification = classify(&state);
        assert_eq!(classification.category_of(0, 0, 1), Some(Category::Maxed));
    }

    #[test]
    fn drained_origin_classifies_as_mined() {
        let mut state = with_pending_move(1);
        state.groups[0].min = 1;
        let classification = classify(&state);
        assert_eq!(classification.category_of(0, 0, 1), Some(Category::Mined));
    }

    #[test]
    fn overlap_classifies_as_collision() {
        let mut state = with_pending_move(1);
        state.groups_by_student[0].insert(2);
        state.overlaps[2].insert(1);
        state.overlaps[1].insert(2);
        let classification = classify(&state);
        assert_eq!(classification.category_of(0, 0, 1), Some(Category::Collision));
        assert!(classification.has_collision(0, 0));
    }
}
