//! Per-aircraft flight state.
//!
//! A [Flight] is created by the pool on the first qualifying message for an
//! unseen ICAO address and mutated on every later message for that address.
//! Each transmission type updates its own fixed set of fields:
//!
//! | type | fields                                  |
//! |------|-----------------------------------------|
//! | 1    | callsign, onground                      |
//! | 2    | speed, lat, lon, onground               |
//! | 3    | altitude, lat, lon, onground            |
//! | 4    | speed, track, vertical rate, onground   |
//! | 5    | altitude, vertical rate                 |
//! | 8    | onground                                |
//!
//! Types 6 and 7 are only counted.  Types 2 and 3 append a [Position] when
//! they carry one, which in turn drives ground-transition detection and
//! intention classification.
//!

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use serde::Serialize;
use tracing::{error, info, trace};

use tarmac_formats::{to_meters, AdsbEvent};

use crate::{FlightRecord, PositionRecord};

/// Inferred trajectory classification.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Intention {
    #[default]
    Unknown,
    Departure,
    Arrival,
    Enroute,
}

/// The two ground transitions we are after.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GroundEvent {
    Landing,
    Takeoff,
}

/// One position fix.  Append-only and strictly time-ordered within its
/// owning flight.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Position {
    pub timestamp: DateTime<Utc>,
    pub longitude: f64,
    pub latitude: f64,
    /// Meters
    pub altitude: f64,
    pub vertical_rate: Option<i32>,
    pub track: Option<i32>,
    pub onground: Option<bool>,
}

impl Position {
    pub fn record(&self) -> PositionRecord {
        PositionRecord {
            timestamp: self.timestamp,
            longitude: self.longitude,
            latitude: self.latitude,
            altitude: self.altitude,
            vertical_rate: self.vertical_rate,
            track: self.track,
            onground: self.onground,
        }
    }
}

/// Whoever wants to hear about ground transitions implements this.
///
pub trait TransitionListener: std::fmt::Debug + Send + Sync {
    fn on_ground_event(&self, event: GroundEvent, flight: &Flight, position: &Position)
        -> Result<()>;
}

/// Per-aircraft state machine.
///
#[derive(Debug)]
pub struct Flight {
    hexident: String,
    callsign: Option<String>,
    first_seen: Option<DateTime<Utc>>,
    last_seen: DateTime<Utc>,
    intention: Intention,
    speed: Option<i32>,
    track: Option<i32>,
    vertical_rate: Option<i32>,
    /// Latest reported altitude in feet
    altitude: Option<i32>,
    onground: Option<bool>,
    positions: Vec<Position>,
    /// Message counters, indexed by transmission type - 1
    msg_count: [u32; 8],
    /// One-shot transition markers
    landed: bool,
    took_off: bool,
    /// Altitude in meters assigned to surface positions
    ground_altitude: f64,
    /// Altitude delta in meters under which we classify an arrival
    arrival_threshold: f64,
    listeners: Vec<Arc<dyn TransitionListener>>,
}

impl Flight {
    pub fn new(hexident: &str, ground_altitude: f64, arrival_threshold: f64) -> Self {
        trace!("new flight {}", hexident);
        Flight {
            hexident: hexident.to_owned(),
            callsign: None,
            first_seen: None,
            last_seen: Utc::now(),
            intention: Intention::Unknown,
            speed: None,
            track: None,
            vertical_rate: None,
            altitude: None,
            onground: None,
            positions: Vec::new(),
            msg_count: [0; 8],
            landed: false,
            took_off: false,
            ground_altitude,
            arrival_threshold,
            listeners: Vec::new(),
        }
    }

    /// Register a ground-transition listener.
    ///
    pub fn register(&mut self, listener: Arc<dyn TransitionListener>) {
        self.listeners.push(listener);
    }

    pub fn hexident(&self) -> &str {
        &self.hexident
    }

    pub fn callsign(&self) -> Option<&str> {
        self.callsign.as_deref()
    }

    pub fn intention(&self) -> Intention {
        self.intention
    }

    /// Latest reported ground speed in knots.
    ///
    pub fn speed(&self) -> Option<i32> {
        self.speed
    }

    /// Latest reported altitude in feet.
    ///
    pub fn altitude(&self) -> Option<i32> {
        self.altitude
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Time since the last message for this aircraft.
    ///
    pub fn age(&self) -> Duration {
        Utc::now() - self.last_seen
    }

    pub fn has_landed(&self) -> bool {
        self.landed
    }

    pub fn has_taken_off(&self) -> bool {
        self.took_off
    }

    /// How many messages of the given transmission type we have seen.
    ///
    pub fn message_count(&self, transmission_type: u8) -> u32 {
        match transmission_type {
            1..=8 => self.msg_count[(transmission_type - 1) as usize],
            _ => 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_last_seen(&mut self, stamp: DateTime<Utc>) {
        self.last_seen = stamp;
    }

    /// Snapshot for the durable store.
    ///
    pub fn record(&self) -> FlightRecord {
        FlightRecord {
            hexident: self.hexident.clone(),
            callsign: self.callsign.clone(),
            first_seen: self.first_seen.unwrap_or(self.last_seen),
            last_seen: self.last_seen,
            intention: self.intention,
        }
    }

    /// Apply one decoded message to this flight.
    ///
    /// Counters and `last_seen` are refreshed for every type, the rest
    /// follows the per-type field table.  A hexident mismatch is a logged
    /// no-op, the pool keying should make it impossible.
    ///
    #[tracing::instrument(skip(self, event))]
    pub fn update(&mut self, event: &AdsbEvent) -> Result<()> {
        if event.hexident != self.hexident {
            error!(
                "message for {} routed to flight {}, ignoring",
                event.hexident, self.hexident
            );
            return Ok(());
        }

        let tt = event.transmission_type;
        if let 1..=8 = tt {
            self.msg_count[(tt - 1) as usize] += 1;
        }

        let stamp = event.generated.unwrap_or_else(Utc::now);
        if self.first_seen.is_none() {
            self.first_seen = Some(stamp);
        }
        self.last_seen = stamp;

        match tt {
            1 => {
                if let Some(callsign) = &event.callsign {
                    self.callsign = Some(callsign.clone());
                }
                self.onground = event.onground;
            }
            2 => {
                self.speed = event.speed;
                self.onground = event.onground;
            }
            3 => {
                self.altitude = event.altitude;
                self.onground = event.onground;
            }
            4 => {
                self.speed = event.speed;
                self.track = event.track;
                self.vertical_rate = event.vertical_rate;
                self.onground = event.onground;
            }
            5 => {
                self.altitude = event.altitude;
                self.vertical_rate = event.vertical_rate;
            }
            8 => {
                self.onground = event.onground;
            }
            _ => (),
        }

        if self.append_position(event, stamp) {
            self.detect_transition()?;
            self.classify_intention();
        }
        Ok(())
    }

    /// Append a position when the message carries one for its type.
    /// Surface positions (type 2) have no altitude on the wire and get the
    /// configured ground altitude.
    ///
    fn append_position(&mut self, event: &AdsbEvent, stamp: DateTime<Utc>) -> bool {
        let altitude = match event.transmission_type {
            2 => self.ground_altitude,
            3 => match event.altitude {
                Some(ft) => to_meters(ft as f64),
                None => return false,
            },
            _ => return false,
        };
        let (latitude, longitude) = match (event.latitude, event.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return false,
        };

        self.positions.push(Position {
            timestamp: stamp,
            longitude,
            latitude,
            altitude,
            vertical_rate: self.vertical_rate,
            track: self.track,
            onground: self.onground,
        });
        true
    }

    /// Compare the two most recent onground flags.  Each direction fires at
    /// most once per flight, further cycles are treated as jitter and
    /// skipped.
    ///
    fn detect_transition(&mut self) -> Result<()> {
        let n = self.positions.len();
        if n < 2 {
            return Ok(());
        }

        let event = match (self.positions[n - 2].onground, self.positions[n - 1].onground) {
            (Some(false), Some(true)) if !self.landed => {
                self.landed = true;
                GroundEvent::Landing
            }
            (Some(true), Some(false)) if !self.took_off => {
                self.took_off = true;
                GroundEvent::Takeoff
            }
            _ => return Ok(()),
        };

        info!("flight {}: {}", self.hexident, event);
        let position = self.positions[n - 1].clone();
        for listener in &self.listeners {
            listener.on_ground_event(event, self, &position)?;
        }
        Ok(())
    }

    /// Recompute the intention from the position history.  Deterministic and
    /// idempotent; a departure is sticky.
    ///
    fn classify_intention(&mut self) {
        if self.intention == Intention::Departure {
            return;
        }
        let first = match self.positions.first() {
            Some(first) => first,
            None => return,
        };

        self.intention = match first.onground {
            None => Intention::Unknown,
            Some(true) => Intention::Departure,
            Some(false) => {
                let last = self.positions.last().unwrap_or(first);
                if last.altitude - first.altitude < self.arrival_threshold {
                    Intention::Arrival
                } else {
                    Intention::Enroute
                }
            }
        };
    }
}
