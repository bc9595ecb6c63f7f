// Copyright 2020 by Michael Thies <mail@mhthies.de>
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

use std::fs::File;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use groupswap::{config::Config, driver, io, objective, state::State};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!(
        "This is the student/group reassignment optimizer, version {}",
        option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
    );
    let args = parse_cli_args();

    let config = build_config(&args);

    let students_path: &String = args.get_one("students-file").unwrap();
    let requests_path: &String = args.get_one("requests-file").unwrap();
    let overlaps_path: &String = args.get_one("overlaps-file").unwrap();
    let limits_path: &String = args.get_one("limits-file").unwrap();

    let students = read_table(students_path, io::reader::read_students);
    let requests = read_table(requests_path, io::reader::read_requests);
    let overlaps = read_table(overlaps_path, io::reader::read_overlaps);
    let limits = read_table(limits_path, io::reader::read_limits);

    let mut state = State::build(&limits, &students, &requests, &overlaps).unwrap_or_else(|e| {
        error!("Input data is inconsistent: {}", e);
        std::process::exit(exitcode::DATAERR)
    });

    info!(
        "Loaded {} students across {} groups with {} pending requests.",
        state.num_students(),
        state.num_groups(),
        state.pending_moves().len()
    );

    let starting_score = objective::score(&state, &config);
    info!("Starting {}", starting_score);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let deadline = Instant::now() + config.timeout;
    let (best_score, stats) = driver::solve(&mut state, &config, &mut rng, deadline);

    let final_score = objective::score(&state, &config);
    info!(
        "Search finished after {} iterations ({} valid-pass hits, {} swap-pass hits, {} explorer \
         hits, {} backtrack hits). Final {} (best seen: {}).",
        stats.iterations,
        stats.valid_pass_hits,
        stats.swap_pass_hits,
        stats.explorer_hits,
        stats.backtrack_hits,
        final_score,
        best_score
    );

    debug!("Opening output file {} ...", config.output_path);
    match File::create(&config.output_path) {
        Err(e) => {
            error!("Could not open output file {}: {}.", config.output_path, e);
            std::process::exit(exitcode::CANTCREAT);
        }
        Ok(file) => match io::writer::write_assignment(file, &state) {
            Ok(()) => debug!("Assignment written to {}.", config.output_path),
            Err(e) => {
                error!("Could not write assignment to {}: {}.", config.output_path, e);
                std::process::exit(exitcode::IOERR);
            }
        },
    }
}

fn read_table<T>(path: &str, read: impl FnOnce(File) -> Result<Vec<T>, String>) -> Vec<T> {
    debug!("Opening input file {} ...", path);
    let file = File::open(path).unwrap_or_else(|e| {
        error!("Could not open input file {}: {}", path, e);
        std::process::exit(exitcode::NOINPUT)
    });
    read(file).unwrap_or_else(|e| {
        error!("Could not read input file {}: {}", path, e);
        std::process::exit(exitcode::DATAERR)
    })
}

fn build_config(args: &clap::ArgMatches) -> Config {
    let timeout_secs: u64 = *args.get_one("timeout").unwrap();
    let award_activity: &String = args.get_one("award-activity").unwrap();
    let award_activity = award_activity
        .split(',')
        .map(|v| v.trim().parse::<i64>())
        .collect::<Result<Vec<i64>, _>>()
        .unwrap_or_else(|e| {
            error!("Could not parse --award-activity: {}", e);
            std::process::exit(exitcode::DATAERR)
        });

    Config {
        timeout: Duration::from_secs(timeout_secs),
        award_activity,
        award_student: *args.get_one("award-student").unwrap(),
        minmax_penalty: *args.get_one("minmax-penalty").unwrap(),
        seed: args
            .get_one("seed")
            .copied()
            .unwrap_or_else(|| rand::thread_rng().gen()),
        output_path: args
            .get_one::<String>("output")
            .cloned()
            .unwrap_or_else(|| "out.csv".to_owned()),
    }
}

/// Helper function to construct and execute parser for command line options
fn parse_cli_args() -> clap::ArgMatches {
    clap::command!()
        .arg(
            clap::Arg::new("timeout")
                .long("timeout")
                .help("Wall-clock search budget in seconds")
                .value_name("SECONDS")
                .required(true)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            clap::Arg::new("award-activity")
                .long("award-activity")
                .help(
                    "Comma-separated award curve for objective term B, indexed by the number of \
                     activities a student has moved (1st entry for 1 moved activity, 2nd for 2, \
                     and so on; the last entry is reused for any further activity).",
                )
                .value_name("AWARDS")
                .required(true),
        )
        .arg(
            clap::Arg::new("award-student")
                .long("award-student")
                .help("Flat bonus for each fully-satisfied student, objective term C")
                .value_name("AWARD")
                .required(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            clap::Arg::new("minmax-penalty")
                .long("minmax-penalty")
                .help("Per-unit penalty for soft min/max-preferred group capacity violations")
                .value_name("PENALTY")
                .required(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            clap::Arg::new("students-file")
                .long("students-file")
                .help("Path to the students CSV table")
                .value_name("FILE")
                .required(true),
        )
        .arg(
            clap::Arg::new("requests-file")
                .long("requests-file")
                .help("Path to the requests CSV table")
                .value_name("FILE")
                .required(true),
        )
        .arg(
            clap::Arg::new("overlaps-file")
                .long("overlaps-file")
                .help("Path to the overlaps CSV table")
                .value_name("FILE")
                .required(true),
        )
        .arg(
            clap::Arg::new("limits-file")
                .long("limits-file")
                .help("Path to the limits CSV table")
                .value_name("FILE")
                .required(true),
        )
        .arg(
            clap::Arg::new("seed")
                .long("seed")
                .help(
                    "Seed for the explorer's sampling RNG, for reproducible runs. Defaults to a \
                     value drawn from entropy.",
                )
                .value_name("SEED")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            clap::Arg::new("output")
                .long("output")
                .help("Path the resulting assignment is written to")
                .value_name("FILE"),
        )
        .get_matches()
}
