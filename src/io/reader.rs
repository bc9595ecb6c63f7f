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

//! Readers for the four input tables. Each one parses a CSV stream into its raw row type; load
//! order and cross-reference filtering are [`crate::state::State::build`]'s job, not this one's.

use std::io::Read;

use csv::ReaderBuilder;

use crate::state::{LimitRow, OverlapRow, RequestRow, StudentRow};

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'|')
        .has_headers(true)
        .from_reader(source)
}

fn parse_u32(field: &str, column: &str) -> Result<u32, String> {
    field
        .trim()
        .parse()
        .map_err(|_| format!("expected an integer in column `{}`, found `{}`", column, field))
}

/// Reads the students table: `student_id, activity_id, swap_weight, group_id, new_group_id`.
pub fn read_students<R: Read>(source: R) -> Result<Vec<StudentRow>, String> {
    let mut rows = Vec::new();
    for record in reader(source).records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != 5 {
            return Err(format!(
                "students row has {} columns, expected 5: {:?}",
                record.len(),
                record
            ));
        }
        rows.push(StudentRow {
            student_id: record[0].to_owned(),
            activity_id: record[1].to_owned(),
            swap_weight: parse_u32(&record[2], "swap_weight")?,
            group_id: record[3].to_owned(),
            new_group_id: record[4].to_owned(),
        });
    }
    Ok(rows)
}

/// Reads the requests table: `student_id, activity_id, requested_group_id`.
pub fn read_requests<R: Read>(source: R) -> Result<Vec<RequestRow>, String> {
    let mut rows = Vec::new();
    for record in reader(source).records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != 3 {
            return Err(format!(
                "requests row has {} columns, expected 3: {:?}",
                record.len(),
                record
            ));
        }
        rows.push(RequestRow {
            student_id: record[0].to_owned(),
            activity_id: record[1].to_owned(),
            requested_group_id: record[2].to_owned(),
        });
    }
    Ok(rows)
}

/// Reads the overlaps table: `group1_id, group2_id`.
pub fn read_overlaps<R: Read>(source: R) -> Result<Vec<OverlapRow>, String> {
    let mut rows = Vec::new();
    for record in reader(source).records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != 2 {
            return Err(format!(
                "overlaps row has {} columns, expected 2: {:?}",
                record.len(),
                record
            ));
        }
        rows.push(OverlapRow {
            group1_id: record[0].to_owned(),
            group2_id: record[1].to_owned(),
        });
    }
    Ok(rows)
}

/// Reads the limits table: `group_id, students_cnt, min, min_preferred, max, max_preferred`.
/// `students_cnt` is accepted and parsed but not trusted: [`crate::state::State::build`]
/// recomputes each group's actual occupancy from the students table instead.
pub fn read_limits<R: Read>(source: R) -> Result<Vec<LimitRow>, String> {
    let mut rows = Vec::new();
    for record in reader(source).records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() != 6 {
            return Err(format!(
                "limits row has {} columns, expected 6: {:?}",
                record.len(),
                record
            ));
        }
        rows.push(LimitRow {
            group_id: record[0].to_owned(),
            students_cnt: parse_u32(&record[1], "students_cnt")?,
            min: parse_u32(&record[2], "min")?,
            min_preferred: parse_u32(&record[3], "min_preferred")?,
            max: parse_u32(&record[4], "max")?,
            max_preferred: parse_u32(&record[5], "max_preferred")?,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_students_row() {
        let csv = "student_id,activity_id,swap_weight,group_id,new_group_id\ns0,act,3,g0,0\n";
        let rows = read_students(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_id, "s0");
        assert_eq!(rows[0].swap_weight, 3);
        assert_eq!(rows[0].new_group_id, "0");
    }

    #[test]
    fn rejects_non_integer_swap_weight() {
        let csv = "student_id,activity_id,swap_weight,group_id,new_group_id\ns0,act,nope,g0,0\n";
        assert!(read_students(csv.as_bytes()).is_err());
    }

    #[test]
    fn reads_limits_row() {
        let csv = "group_id,students_cnt,min,min_preferred,max,max_preferred\ng0,4,0,2,10,8\n";
        let rows = read_limits(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].max, 10);
        assert_eq!(rows[0].max_preferred, 8);
    }

    #[test]
    fn honors_pipe_quote_character() {
        let csv = "group1_id,group2_id\n|g,0|,g1\n";
        let rows = read_overlaps(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].group1_id, "g,0");
    }
}
