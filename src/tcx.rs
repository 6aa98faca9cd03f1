// Copyright 2026 Viktor Reusch
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

//! Reading activities and trackpoints out of TCX documents.

use std::io::BufRead;

use thiserror::Error;
use tracing::trace;

use crate::tree::{self, Element};
use crate::{Activity, Trackpoint};

/// Namespace of all TCX elements which are read.
pub const NAMESPACE: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";

/// Error returned when a TCX document cannot be read.
#[derive(Error, Debug)]
pub enum Error {
    /// The XML parser failed.
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// The document is not well-formed.
    #[error("malformed XML: {0}")]
    Malformed(String),
    /// A required element is missing.
    #[error("missing <{0}> element")]
    MissingElement(&'static str),
}

/// Read all activities from a complete TCX document.
///
/// Activities are returned in document order. Every `Activity` element below
/// the root counts, no matter how deeply it is nested.
pub fn parse_activities(source: impl BufRead) -> Result<Vec<Activity>, Error> {
    let root = tree::parse(source)?;
    root.descendants(NAMESPACE, "Activity")
        .map(parse_activity)
        .collect()
}

fn parse_activity(node: &Element) -> Result<Activity, Error> {
    let id = node
        .find(NAMESPACE, &["Id"])
        .ok_or(Error::MissingElement("Id"))?
        .text()
        .map(str::to_string);

    let mut trackpoints = vec![];
    for trackpoint in node.descendants(NAMESPACE, "Trackpoint") {
        match parse_trackpoint(trackpoint)? {
            Some(trackpoint) => trackpoints.push(trackpoint),
            None => trace!(activity = ?id, "skipping trackpoint without position"),
        }
    }

    Ok(Activity {
        // TCX has no separate start time on the activity, so the ID is reused.
        timestamp: id.clone(),
        id,
        trackpoints,
    })
}

/// Convert a single `Trackpoint` element.
///
/// Returns `None` if latitude or longitude is missing. The time is required
/// for every trackpoint with a position.
fn parse_trackpoint(node: &Element) -> Result<Option<Trackpoint>, Error> {
    let latitude = node.find(NAMESPACE, &["Position", "LatitudeDegrees"]);
    let longitude = node.find(NAMESPACE, &["Position", "LongitudeDegrees"]);
    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Ok(None);
    };

    let timestamp = node
        .find(NAMESPACE, &["Time"])
        .ok_or(Error::MissingElement("Time"))?;
    let altitude_meters = node.find(NAMESPACE, &["AltitudeMeters"]);

    Ok(Some(Trackpoint {
        latitude: latitude.text().map(str::to_string),
        longitude: longitude.text().map(str::to_string),
        altitude_meters: altitude_meters.and_then(Element::text).map(str::to_string),
        timestamp: timestamp.text().map(str::to_string),
    }))
}
