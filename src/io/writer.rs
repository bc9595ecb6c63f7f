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

//! Writer for the output assignment table.

use std::io::Write;

use csv::WriterBuilder;

use crate::state::State;

/// Writes one row per student-activity record: `student_id, activity_id, swap_weight, group_id,
/// new_group_id`, where `group_id` is always the student's original group and `new_group_id` is
/// `"0"` if the student never moved, or the current group id otherwise.
pub fn write_assignment<W: Write>(sink: W, state: &State) -> Result<(), String> {
    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .quote(b'|')
        .has_headers(false)
        .from_writer(sink);

    writer
        .write_record(["student_id", "activity_id", "swap_weight", "group_id", "new_group_id"])
        .map_err(|e| e.to_string())?;

    for record in state.records() {
        let new_group_id = if record.current_group == record.original_group {
            "0".to_owned()
        } else {
            state.group_id(record.current_group).to_owned()
        };
        writer
            .write_record([
                state.student_id(record.student),
                state.activity_id(record.activity),
                &record.swap_weight.to_string(),
                state.group_id(record.original_group),
                &new_group_id,
            ])
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_fixtures::simple_state;

    #[test]
    fn writes_unchanged_student_with_zero_sentinel() {
        let state = simple_state();
        let mut buf = Vec::new();
        write_assignment(&mut buf, &state).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("s0,act,3,g0,0"));
    }

    #[test]
    fn writes_moved_student_with_target_group() {
        let mut state = simple_state();
        state.records[0].current_group = 1;
        state.groups[1].count += 1;
        let mut buf = Vec::new();
        write_assignment(&mut buf, &state).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("s0,act,3,g0,g1"));
    }
}
