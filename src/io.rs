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

//! CSV I/O: the crate's only file-format boundary. Each input table gets its own reader
//! function, and the four raw row types feed [`crate::state::State::build`]. Comma-delimited,
//! `|` as the quote character, header row present and consumed automatically.

pub mod reader;
pub mod writer;
