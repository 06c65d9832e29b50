//! Airport and runway reference data.
//!
//! A [Runway] does not model the physical strip but the runway referred to
//! during a landing or takeoff, e.g. 03 or 21.  A physical strip is two
//! Runway records with a direction difference of about 180 degrees and a
//! shared bounding polygon.
//!
//! The table is immutable reference data, loaded once at startup from an
//! HCL file (the built-in `airports.hcl` unless the configuration points
//! somewhere else).
//!

use std::collections::BTreeMap;
use std::fs;

use eyre::Result;
use geo::{point, Contains, LineString, Point, Polygon};
use serde::Deserialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::trace;

use crate::EngineStatus;

/// Maximum difference between aircraft heading and runway direction for a
/// positive match, in degrees of circular distance.
pub const DIRECTION_TOLERANCE: f64 = 20.;

/// Current airports file version
const AIRPORTS_FILE_VER: usize = 1;

/// One runway end, with its geometric gates.
///
#[derive(Clone, Debug)]
pub struct Runway {
    /// Name as referred to by the tower, e.g. "03"
    pub name: String,
    /// Threshold reference point
    pub ref_point: Point<f64>,
    /// Reference altitude ASL in meters
    pub ref_altitude: f64,
    /// Direction in degrees relative to north, 0 <= d < 360
    pub direction: f64,
    /// Length in meters
    pub length: f64,
    polygon: Polygon<f64>,
}

impl Runway {
    pub fn new(
        name: &str,
        lon: f64,
        lat: f64,
        ref_altitude: f64,
        direction: f64,
        bbox: &[(f64, f64)],
        length: f64,
    ) -> Self {
        Runway {
            name: name.to_owned(),
            ref_point: point!(x: lon, y: lat),
            ref_altitude,
            direction,
            length,
            polygon: ring(bbox),
        }
    }

    /// True if `point` lies within the runway bounding polygon.
    ///
    pub fn contains(&self, point: &Point<f64>) -> bool {
        self.polygon.contains(point)
    }

    /// True if `heading` coincides with the runway direction within `tol`
    /// degrees.  The distance is circular so a runway pointing 005 matches
    /// a heading of 355.
    ///
    pub fn same_heading(&self, heading: f64, tol: f64) -> bool {
        let d = (self.direction - heading).rem_euclid(360.);
        d.min(360. - d) <= tol
    }
}

/// Airport model: codes, location and the ordered runway list.
///
#[derive(Clone, Debug)]
pub struct Airport {
    /// ICAO code, e.g. "LFRS"
    pub icao: String,
    /// IATA code, e.g. "NTE"
    pub iata: String,
    /// Airport reference point
    pub ref_point: Point<f64>,
    /// Reference altitude ASL in meters
    pub ref_altitude: f64,
    pub runways: Vec<Runway>,
    polygon: Polygon<f64>,
}

impl Airport {
    /// True if `point` lies within the airport bounding polygon.
    ///
    pub fn contains(&self, point: &Point<f64>) -> bool {
        self.polygon.contains(point)
    }

    /// Check whether a touchdown/liftoff point and heading fit any known
    /// runway.  Runways are scanned in table order, first match wins; both
    /// the polygon gate and the heading gate must pass.
    ///
    #[tracing::instrument(skip(self))]
    pub fn runway_for(&self, point: &Point<f64>, heading: f64) -> Option<&Runway> {
        trace!("match {:?}/{} against {}", point, heading, self.icao);
        self.runways
            .iter()
            .find(|r| r.contains(point) && r.same_heading(heading, DIRECTION_TOLERANCE))
    }
}

fn ring(bbox: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(bbox.to_vec()), vec![])
}

// ----- on-disk structures

#[derive(Debug, Deserialize)]
struct RunwayBlock {
    lon: f64,
    lat: f64,
    altitude: f64,
    direction: f64,
    bbox: Vec<(f64, f64)>,
    length: f64,
}

#[derive(Debug, Deserialize)]
struct AirportBlock {
    iata: String,
    lon: f64,
    lat: f64,
    altitude: f64,
    bbox: Vec<(f64, f64)>,
    runway: BTreeMap<String, RunwayBlock>,
}

/// On-disk structure for the airports file
///
#[derive(Debug, Deserialize)]
struct AirportsFile {
    /// Version number for safety
    version: usize,
    /// Airports, keyed by ICAO code
    #[serde(default)]
    airport: BTreeMap<String, AirportBlock>,
}

/// Load the airport table.
///
#[tracing::instrument]
pub fn load_airports(fname: Option<String>) -> Result<Vec<Airport>> {
    trace!("enter");

    // Load from file if specified
    //
    let data = if let Some(fname) = fname {
        fs::read_to_string(fname)?
    } else {
        include_str!("airports.hcl").to_owned()
    };

    let table: AirportsFile = hcl::from_str(&data)?;
    if table.version != AIRPORTS_FILE_VER {
        return Err(EngineStatus::BadAirportsVersion(table.version, AIRPORTS_FILE_VER).into());
    }

    let airports = table
        .airport
        .into_iter()
        .map(|(icao, a)| Airport {
            icao,
            iata: a.iata,
            ref_point: point!(x: a.lon, y: a.lat),
            ref_altitude: a.altitude,
            runways: a
                .runway
                .into_iter()
                .map(|(name, r)| {
                    Runway::new(&name, r.lon, r.lat, r.altitude, r.direction, &r.bbox, r.length)
                })
                .collect(),
            polygon: ring(&a.bbox),
        })
        .collect();
    Ok(airports)
}

/// List the loaded airports & runways.
///
#[tracing::instrument(skip(data))]
pub fn list_airports(data: &[Airport]) -> Result<String> {
    trace!("enter");
    let header = vec!["ICAO", "IATA", "Lat/Lon", "Alt (m)", "Runways"];

    let mut builder = Builder::default();
    builder.push_record(header);

    data.iter().for_each(|airport| {
        let point = format!("{:.4}, {:.4}", airport.ref_point.y(), airport.ref_point.x());
        let runways = airport
            .runways
            .iter()
            .map(|r| format!("{} ({:03.0}°)", r.name, r.direction))
            .collect::<Vec<_>>()
            .join(" ");
        let row = vec![
            airport.icao.clone(),
            airport.iata.clone(),
            point,
            format!("{:.0}", airport.ref_altitude),
            runways,
        ];
        builder.push_record(row);
    });

    let all = builder.build().with(Style::modern()).to_string();
    Ok(format!("Known airports:\n{all}"))
}
