// Copyright 2023, 2026 Viktor Reusch
//
// This file is part of tcx_json_convert.
//
// tcx_json_convert is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// tcx_json_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with tcx_json_convert. If not, see <https://www.gnu.org/licenses/>.

//! This is a very simple command-line interface for the TCX-to-JSON converter.

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use chrono::Utc;
use clap::Parser;
use tcx_json_convert::convert_files;
use tracing_subscriber::EnvFilter;

/// Convert TCX files into one JSON file in the current directory.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// TCX files to process
    #[arg(value_name = "FILES", required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to STDERR, STDOUT only carries the result.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match convert_files(&args.files, Path::new(""), Utc::now()) {
        Ok(output) => {
            println!("Wrote output to {}", output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Conversion failed with: {err:?}");
            ExitCode::FAILURE
        }
    }
}
