//! Durable store boundary.
//!
//! The engine never talks to a database directly, it emits three kinds of
//! records through the [Store] capability: flight snapshots and positions
//! (upsert-by-key) and movements (plain insert).  The handle is built once
//! at startup and passed to whoever needs it, there is no ambient global.
//!
//! Two implementations ship here: a JSON-lines file writer for production
//! use (upsert is last-write-wins on replay) and an in-memory store for the
//! test benches.
//!

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use eyre::Result;
use serde::Serialize;
use tracing::trace;

use crate::{GroundEvent, Intention};

/// Snapshot of a tracked flight.
///
#[derive(Clone, Debug, Serialize)]
pub struct FlightRecord {
    pub hexident: String,
    pub callsign: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub intention: Intention,
}

/// One position fix, owned by a flight.
///
#[derive(Clone, Debug, Serialize)]
pub struct PositionRecord {
    pub timestamp: DateTime<Utc>,
    pub longitude: f64,
    pub latitude: f64,
    /// Meters
    pub altitude: f64,
    pub vertical_rate: Option<i32>,
    pub track: Option<i32>,
    pub onground: Option<bool>,
}

/// A runway-attributed landing or takeoff.
///
#[derive(Clone, Debug, Serialize)]
pub struct MovementRecord {
    pub kind: GroundEvent,
    pub hexident: String,
    pub timestamp: DateTime<Utc>,
    /// Runway name, or "UNK" when no runway gate matched
    pub runway: String,
}

/// What the engine requires from a durable store.
///
pub trait Store: Debug + Send + Sync {
    fn upsert_flight(&self, flight: &FlightRecord) -> Result<()>;
    fn upsert_position(&self, hexident: &str, position: &PositionRecord) -> Result<()>;
    fn insert_movement(&self, movement: &MovementRecord) -> Result<()>;
    /// Flush pending writes.
    fn commit(&self) -> Result<()>;
}

/// Tagged line written by [JsonlStore].
///
#[derive(Debug, Serialize)]
#[serde(tag = "record", rename_all = "lowercase")]
enum Line<'a> {
    Flight(&'a FlightRecord),
    Position {
        hexident: &'a str,
        #[serde(flatten)]
        position: &'a PositionRecord,
    },
    Movement(&'a MovementRecord),
}

/// Append-only JSON-lines store, one record per line.
///
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl JsonlStore {
    #[tracing::instrument]
    pub fn create<P: AsRef<Path> + Debug>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(JsonlStore {
            path,
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, line: &Line) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        serde_json::to_writer(&mut *file, line)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

impl Store for JsonlStore {
    fn upsert_flight(&self, flight: &FlightRecord) -> Result<()> {
        trace!("flight {}", flight.hexident);
        self.write(&Line::Flight(flight))
    }

    fn upsert_position(&self, hexident: &str, position: &PositionRecord) -> Result<()> {
        self.write(&Line::Position { hexident, position })
    }

    fn insert_movement(&self, movement: &MovementRecord) -> Result<()> {
        self.write(&Line::Movement(movement))
    }

    fn commit(&self) -> Result<()> {
        trace!("commit {}", self.path.display());
        Ok(self.file.lock().unwrap().flush()?)
    }
}

/// In-memory store for the test benches, keeps everything and counts the
/// commits so throttling can be asserted on.
///
#[derive(Debug, Default)]
pub struct MemoryStore {
    flights: Mutex<BTreeMap<String, FlightRecord>>,
    positions: Mutex<Vec<(String, PositionRecord)>>,
    movements: Mutex<Vec<MovementRecord>>,
    commits: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn flight(&self, hexident: &str) -> Option<FlightRecord> {
        self.flights.lock().unwrap().get(hexident).cloned()
    }

    pub fn flight_count(&self) -> usize {
        self.flights.lock().unwrap().len()
    }

    pub fn position_count(&self, hexident: &str) -> usize {
        self.positions
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == hexident)
            .count()
    }

    pub fn movements(&self) -> Vec<MovementRecord> {
        self.movements.lock().unwrap().clone()
    }

    pub fn commit_count(&self) -> usize {
        *self.commits.lock().unwrap()
    }
}

impl Store for MemoryStore {
    fn upsert_flight(&self, flight: &FlightRecord) -> Result<()> {
        self.flights
            .lock()
            .unwrap()
            .insert(flight.hexident.clone(), flight.clone());
        Ok(())
    }

    fn upsert_position(&self, hexident: &str, position: &PositionRecord) -> Result<()> {
        self.positions
            .lock()
            .unwrap()
            .push((hexident.to_owned(), position.clone()));
        Ok(())
    }

    fn insert_movement(&self, movement: &MovementRecord) -> Result<()> {
        self.movements.lock().unwrap().push(movement.clone());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        *self.commits.lock().unwrap() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 10, 20, 11, 33, 40).unwrap()
    }

    #[test]
    fn test_jsonl_store_one_object_per_line() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tarmac.jsonl");
        let store = JsonlStore::create(&path)?;

        store.upsert_flight(&FlightRecord {
            hexident: "A04424".into(),
            callsign: Some("UAL814".into()),
            first_seen: stamp(),
            last_seen: stamp(),
            intention: Intention::Enroute,
        })?;
        store.insert_movement(&MovementRecord {
            kind: GroundEvent::Landing,
            hexident: "A04424".into(),
            timestamp: stamp(),
            runway: "03".into(),
        })?;
        store.commit()?;

        let data = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = data.lines().collect();
        assert_eq!(2, lines.len());

        let first: serde_json::Value = serde_json::from_str(lines[0])?;
        assert_eq!("flight", first["record"]);
        assert_eq!("A04424", first["hexident"]);

        let second: serde_json::Value = serde_json::from_str(lines[1])?;
        assert_eq!("movement", second["record"]);
        assert_eq!("landing", second["kind"]);
        assert_eq!("03", second["runway"]);
        Ok(())
    }

    #[test]
    fn test_memory_store_upsert_overwrites() -> Result<()> {
        let store = MemoryStore::new();
        let mut rec = FlightRecord {
            hexident: "400BE5".into(),
            callsign: None,
            first_seen: stamp(),
            last_seen: stamp(),
            intention: Intention::Unknown,
        };
        store.upsert_flight(&rec)?;
        rec.intention = Intention::Arrival;
        store.upsert_flight(&rec)?;

        assert_eq!(1, store.flight_count());
        assert_eq!(
            Intention::Arrival,
            store.flight("400BE5").unwrap().intention
        );
        Ok(())
    }
}
