//! Landing/takeoff attribution.
//!
//! [MovementLog] subscribes to the ground transitions broadcast by the
//! flights and turns each one into a durable movement record, attributed to
//! a runway when the geometry agrees.
//!

use std::sync::Arc;

use eyre::Result;
use geo::point;
use tracing::{debug, info};

use crate::{
    interpolate_track, Airport, Flight, GroundEvent, MovementRecord, Position, Store,
    TransitionListener,
};

/// Sentinel runway name when no gate matched.
pub const UNKNOWN_RUNWAY: &str = "UNK";

/// The landing/takeoff manager.
///
/// Attribution consults the airport table in order and stops after the
/// first airport has been evaluated, whether a runway matched or not; the
/// deployments this grew out of track a single field.
///
#[derive(Debug)]
pub struct MovementLog {
    airports: Vec<Airport>,
    store: Arc<dyn Store>,
}

impl MovementLog {
    pub fn new(airports: Vec<Airport>, store: Arc<dyn Store>) -> Self {
        MovementLog { airports, store }
    }
}

impl TransitionListener for MovementLog {
    /// Compute the heading over the last two fixes, gate it against the
    /// runway geometry and emit the movement record.
    ///
    #[tracing::instrument(skip(self, flight, position))]
    fn on_ground_event(
        &self,
        event: GroundEvent,
        flight: &Flight,
        position: &Position,
    ) -> Result<()> {
        let point = point!(x: position.longitude, y: position.latitude);
        let heading = interpolate_track(flight.positions());
        debug!("heading = {:?}", heading);

        let runway = match (self.airports.first(), heading) {
            (Some(airport), Some(heading)) => airport
                .runway_for(&point, heading)
                .map(|r| r.name.clone()),
            _ => None,
        };
        let runway = runway.unwrap_or_else(|| UNKNOWN_RUNWAY.to_owned());

        info!(
            "{}: {} on runway {} at {}",
            flight.hexident(),
            event,
            runway,
            position.timestamp
        );
        self.store.insert_movement(&MovementRecord {
            kind: event,
            hexident: flight.hexident().to_owned(),
            timestamp: position.timestamp,
            runway,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{load_airports, MemoryStore};
    use tarmac_formats::AdsbEvent;

    // Two fixes on the LFRS strip, the second one 30° compass from the
    // first.
    const FIX1: (f64, f64) = (-1.61046, 47.15356);
    const FIX2: (f64, f64) = (-1.60996, 47.154426);

    fn msg3(lat: f64, lon: f64, onground: bool) -> AdsbEvent {
        let line = format!(
            "MSG,3,1,1,39C812,1,2019/10/20,11:33:40.311,2019/10/20,11:33:40.311,,200,,,{},{},,,,,,{}",
            lat,
            lon,
            if onground { "-1" } else { "0" }
        );
        AdsbEvent::from_line(&line).unwrap()
    }

    fn wired_flight(store: Arc<MemoryStore>) -> Flight {
        let log = MovementLog::new(load_airports(None).unwrap(), store);
        let mut flight = Flight::new("39C812", 27., -300.);
        flight.register(Arc::new(log));
        flight
    }

    #[test]
    fn test_landing_attributed_to_runway_03() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut flight = wired_flight(store.clone());

        flight.update(&msg3(FIX1.1, FIX1.0, false))?;
        flight.update(&msg3(FIX2.1, FIX2.0, true))?;

        let movements = store.movements();
        assert_eq!(1, movements.len());
        assert_eq!(GroundEvent::Landing, movements[0].kind);
        assert_eq!("03", movements[0].runway);
        assert_eq!("39C812", movements[0].hexident);
        Ok(())
    }

    #[test]
    fn test_takeoff_attributed_to_runway_21() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut flight = wired_flight(store.clone());

        // rolling along the strip towards the southwest, then airborne
        flight.update(&msg3(FIX2.1, FIX2.0, true))?;
        flight.update(&msg3(FIX1.1, FIX1.0, false))?;

        let movements = store.movements();
        assert_eq!(1, movements.len());
        assert_eq!(GroundEvent::Takeoff, movements[0].kind);
        assert_eq!("21", movements[0].runway);
        Ok(())
    }

    #[test]
    fn test_unmatched_point_logs_unk() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut flight = wired_flight(store.clone());

        // far away from the field
        flight.update(&msg3(46.0, -2.5, false))?;
        flight.update(&msg3(46.001, -2.5, true))?;

        let movements = store.movements();
        assert_eq!(1, movements.len());
        assert_eq!(UNKNOWN_RUNWAY, movements[0].runway);
        Ok(())
    }

    #[test]
    fn test_no_airports_still_logs() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let log = MovementLog::new(vec![], store.clone());
        let mut flight = Flight::new("39C812", 27., -300.);
        flight.register(Arc::new(log));

        flight.update(&msg3(FIX1.1, FIX1.0, false))?;
        flight.update(&msg3(FIX2.1, FIX2.0, true))?;

        assert_eq!(UNKNOWN_RUNWAY, store.movements()[0].runway);
        Ok(())
    }
}
