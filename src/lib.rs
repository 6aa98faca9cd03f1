// Copyright 2021, 2022, 2026 Viktor Reusch
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

//! Library for converting
//! [TCX](https://en.wikipedia.org/wiki/Training_Center_XML) files to JSON.
//!
//! It reads the activities and their trackpoints from any number of TCX files
//! and writes them as one flat JSON document.
//!
//! See [`convert`] for a single file and [`convert_files`] for a batch.

pub mod tcx;
mod tree;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

pub use tcx::parse_activities;

/// Suffix of the generated output file name.
const OUTPUT_SUFFIX: &str = "_activities.json";

/// Error returned from the conversion functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Reading an input or writing the output file failed.
    #[error("accessing {path} failed: {source}", path = .path.display())]
    Io { path: PathBuf, source: io::Error },
    /// A TCX file could not be read.
    #[error("reading TCX from {path} failed: {source}", path = .path.display())]
    Parse { path: PathBuf, source: tcx::Error },
    /// TCX reading failed.
    #[error("reading TCX failed: {0}")]
    Tcx(#[from] tcx::Error),
    /// JSON writing failed.
    #[error("writing JSON failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One GPS sample of an activity.
///
/// All values are copied as text from the TCX file. A value is `None` if its
/// element is missing or empty.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Trackpoint {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub altitude_meters: Option<String>,
    pub timestamp: Option<String>,
}

/// One recorded session.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub id: Option<String>,
    /// Always equal to [`Activity::id`].
    pub timestamp: Option<String>,
    pub trackpoints: Vec<Trackpoint>,
}

/// The JSON document written by the conversion.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub activities: Vec<Activity>,
}

/// Read a TCX file and write a JSON document.
///
/// A complete TCX file is read from `source`. Its activities are written as a
/// complete JSON document to `sink`.
///
/// If an error occurs, the function returns immediately. Nothing is written to
/// `sink` unless the whole `source` was read successfully.
///
/// # Example
/// ```
/// # use tcx_json_convert::convert;
/// #
/// let source = r#"<?xml version="1.0" encoding="UTF-8"?>
/// <TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
///   <Activities><Activity Sport="Biking">
///     <Id>2020-01-01T00:00:00Z</Id>
///     <Lap><Track><Trackpoint>
///       <Time>2020-01-01T00:00:05Z</Time>
///       <Position>
///         <LatitudeDegrees>48.858222</LatitudeDegrees>
///         <LongitudeDegrees>2.2945</LongitudeDegrees>
///       </Position>
///     </Trackpoint></Track></Lap>
///   </Activity></Activities>
/// </TrainingCenterDatabase>
/// "#;
/// let mut sink = vec![];
///
/// convert(source.as_bytes(), &mut sink).expect("conversion failed");
///
/// let json = String::from_utf8(sink).expect("JSON data is not valid UTF-8");
/// assert!(json.starts_with(r#"{"activities":[{"id":"2020-01-01T00:00:00Z""#));
/// assert!(json.contains(r#""latitude":"48.858222""#));
/// assert!(json.contains(r#""altitude_meters":null"#));
/// ```
pub fn convert(source: impl Read, sink: impl Write) -> Result<(), Error> {
    let activities = parse_activities(BufReader::new(source))?;
    write_document(&Document { activities }, sink)
}

/// Read the TCX file at `path`.
pub fn parse_tcx_file(path: &Path) -> Result<Vec<Activity>, Error> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    let activities = parse_activities(BufReader::new(file)).map_err(|source| Error::Parse {
        path: path.to_owned(),
        source,
    })?;
    debug!(path = %path.display(), activities = activities.len(), "parsed TCX file");
    Ok(activities)
}

/// Read all `paths` in order and collect their activities.
///
/// The first failing file aborts the whole collection.
pub fn collect_activities(paths: &[impl AsRef<Path>]) -> Result<Document, Error> {
    let mut activities = vec![];
    for path in paths {
        activities.extend(parse_tcx_file(path.as_ref())?);
    }
    Ok(Document { activities })
}

/// Serialize `document` as JSON to `sink`.
pub fn write_document(document: &Document, mut sink: impl Write) -> Result<(), Error> {
    serde_json::to_writer(&mut sink, document)?;
    sink.flush().map_err(serde_json::Error::io)?;
    Ok(())
}

/// File name of the output written at `now`.
///
/// The time is formatted like `2020-01-01T12:34:56.789000` with all colons
/// replaced by hyphens. The fraction is left out when it is zero.
pub fn output_filename(now: DateTime<Utc>) -> String {
    let mut timestamp = now.format("%Y-%m-%dT%H-%M-%S").to_string();
    // Leap seconds are folded into the fraction by chrono.
    let micros = now.nanosecond() % 1_000_000_000 / 1_000;
    if micros != 0 {
        timestamp.push_str(&format!(".{micros:06}"));
    }
    timestamp + OUTPUT_SUFFIX
}

/// Convert all TCX files in `paths` into one JSON file in `dir`.
///
/// The name of the created file is derived from `now`, see
/// [`output_filename`]. All inputs are read before the output is created, so
/// no file is written if any of them fails. Returns the path of the new file.
pub fn convert_files(
    paths: &[impl AsRef<Path>],
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, Error> {
    let document = collect_activities(paths)?;

    let output = dir.join(output_filename(now));
    write_output(&document, &output)?;

    info!(
        path = %output.display(),
        activities = document.activities.len(),
        "wrote JSON output"
    );
    Ok(output)
}

/// Write `document` as JSON to a new file at `path`.
fn write_output(document: &Document, path: &Path) -> Result<(), Error> {
    let io_error = |source| Error::Io {
        path: path.to_owned(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut sink = BufWriter::new(file);
    serde_json::to_writer(&mut sink, document).map_err(|err| match err.io_error_kind() {
        Some(_) => io_error(err.into()),
        None => Error::Json(err),
    })?;
    sink.flush().map_err(io_error)
}
