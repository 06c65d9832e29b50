//! Pool of currently observed flights.
//!
//! The pool is a cache of active state keyed by ICAO address, the durable
//! store independently holds the persisted copy.  Everything here runs on
//! the consumer side of the pipeline, so no locking is involved.
//!

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use tracing::{debug, info, trace};

use tarmac_formats::{AdsbEvent, AdsbMessageFilter};

use crate::{Flight, Store, TransitionListener};

/// Pool tuning, straight from the configuration file.
///
#[derive(Clone, Copy, Debug)]
pub struct PoolSettings {
    /// Maximum age in seconds since last seen before a flight is pruned
    pub max_age: u64,
    /// Minimum delay in seconds between two store commits
    pub commit_period: u64,
    /// Altitude in meters assigned to surface positions
    pub ground_altitude: f64,
    /// Altitude delta in meters under which a flight is classified arriving
    pub arrival_threshold: f64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        PoolSettings {
            max_age: 300,
            commit_period: 1,
            ground_altitude: 27.,
            arrival_threshold: -300.,
        }
    }
}

/// Registry of live flights.
///
#[derive(Debug)]
pub struct FlightPool {
    flights: HashMap<String, Flight>,
    filter: AdsbMessageFilter,
    store: Arc<dyn Store>,
    watcher: Arc<dyn TransitionListener>,
    settings: PoolSettings,
    last_commit: DateTime<Utc>,
}

impl FlightPool {
    pub fn new(
        filter: AdsbMessageFilter,
        store: Arc<dyn Store>,
        watcher: Arc<dyn TransitionListener>,
        settings: PoolSettings,
    ) -> Self {
        FlightPool {
            flights: HashMap::new(),
            filter,
            store,
            watcher,
            settings,
            last_commit: Utc::now(),
        }
    }

    /// Lookup, `None` when the aircraft is not on the radar.
    ///
    pub fn get(&self, hexident: &str) -> Option<&Flight> {
        match self.flights.get(hexident) {
            Some(flight) => Some(flight),
            None => {
                debug!("cannot find flight {} in current pool, not on the radar", hexident);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn hexidents(&self) -> Vec<&str> {
        self.flights.keys().map(String::as_str).collect()
    }

    /// Update the pool from one decoded message.
    ///
    /// A known aircraft gets the message applied and the store flushed under
    /// the commit throttling policy.  An unknown one enters the pool only on
    /// a qualifying message: a surface position (type 2, no altitude to
    /// test) or an airborne position (type 3) passing the altitude filter.
    /// Aged flights are pruned afterwards in any case.
    ///
    #[tracing::instrument(skip(self, event))]
    pub fn update(&mut self, event: &AdsbEvent) -> Result<()> {
        if let Some(flight) = self.flights.get_mut(&event.hexident) {
            let had = flight.positions().len();
            flight.update(event)?;
            trace!("flight {} updated", event.hexident);

            self.store.upsert_flight(&flight.record())?;
            if flight.positions().len() > had {
                // only the appended fix goes out
                if let Some(position) = flight.positions().last() {
                    self.store.upsert_position(&event.hexident, &position.record())?;
                }
            }
            self.commit_throttled()?;
        } else if Self::qualifies(event, &self.filter) {
            info!("new flight spotted: {}, adding to current pool", event.hexident);

            let mut flight = Flight::new(
                &event.hexident,
                self.settings.ground_altitude,
                self.settings.arrival_threshold,
            );
            flight.register(self.watcher.clone());
            flight.update(event)?;

            self.store.upsert_flight(&flight.record())?;
            if let Some(position) = flight.positions().last() {
                self.store.upsert_position(&event.hexident, &position.record())?;
            }
            self.flights.insert(event.hexident.clone(), flight);

            // Low-frequency event, commit right away.
            //
            self.commit()?;
        }

        self.prune();
        Ok(())
    }

    /// Admission rule for unseen aircraft.  Type 2 carries no altitude so it
    /// is always admitted, type 3 is gated by the altitude filter.
    ///
    fn qualifies(event: &AdsbEvent, filter: &AdsbMessageFilter) -> bool {
        event.transmission_type == 2
            || (event.transmission_type == 3 && filter.altitude(event))
    }

    /// Remove all flights which are older than `max_age`.  In-memory only,
    /// durable records are untouched.
    ///
    #[tracing::instrument(skip(self))]
    pub fn prune(&mut self) {
        let max_age = Duration::seconds(self.settings.max_age as i64);
        let aged: Vec<String> = self
            .flights
            .values()
            .filter(|f| f.age() > max_age)
            .map(|f| f.hexident().to_owned())
            .collect();
        for hexident in aged {
            info!("removing aged flight {} from current flight pool", hexident);
            self.flights.remove(&hexident);
        }
    }

    /// Commit immediately unless one happened within the commit period;
    /// bounds write amplification under high message rates.
    ///
    fn commit_throttled(&mut self) -> Result<()> {
        let now = Utc::now();
        if now > self.last_commit + Duration::seconds(self.settings.commit_period as i64) {
            self.store.commit()?;
            self.last_commit = now;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.store.commit()?;
        self.last_commit = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{GroundEvent, MemoryStore, Position};

    /// Listener that does not care.
    #[derive(Debug)]
    struct Inert;

    impl TransitionListener for Inert {
        fn on_ground_event(&self, _: GroundEvent, _: &Flight, _: &Position) -> Result<()> {
            Ok(())
        }
    }

    fn msg3(hexident: &str, altitude: i32, second: u32) -> AdsbEvent {
        let line = format!(
            "MSG,3,1,1,{},1,2019/10/20,11:33:{:02}.000,2019/10/20,11:33:{:02}.000,,{},,,46.65470,-2.77776,,,,,,0",
            hexident, second, second, altitude
        );
        AdsbEvent::from_line(&line).unwrap()
    }

    fn msg4(hexident: &str) -> AdsbEvent {
        let line = format!(
            "MSG,4,1,1,{},1,2019/10/20,11:33:40.000,2019/10/20,11:33:40.000,,,316,106,,,1536,,,,,0",
            hexident
        );
        AdsbEvent::from_line(&line).unwrap()
    }

    /// Events in these tests carry 2019 timestamps, keep them prunable only
    /// when a test wants that.
    fn settings() -> PoolSettings {
        PoolSettings {
            max_age: 1_000_000_000,
            commit_period: 3600,
            ..PoolSettings::default()
        }
    }

    fn pool(store: Arc<MemoryStore>) -> FlightPool {
        FlightPool::new(
            AdsbMessageFilter::new(10_000, -1_000).unwrap(),
            store,
            Arc::new(Inert),
            settings(),
        )
    }

    #[test]
    fn test_new_flight_on_qualifying_message() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = pool(store.clone());

        pool.update(&msg3("39C812", 3000, 40))?;

        assert_eq!(1, pool.len());
        assert!(pool.get("39C812").is_some());
        assert_eq!(1, store.flight_count());
        Ok(())
    }

    #[test]
    fn test_unknown_address_returns_none() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let pool = pool(store);

        assert!(pool.get("DEAD01").is_none());
        Ok(())
    }

    #[test]
    fn test_type3_gated_by_altitude_filter() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = pool(store);

        // outside the band, not admitted
        pool.update(&msg3("39C812", 20_000, 40))?;
        assert!(pool.is_empty());
        Ok(())
    }

    #[test]
    fn test_type4_does_not_admit() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = pool(store);

        pool.update(&msg4("39C812"))?;
        assert!(pool.is_empty());
        Ok(())
    }

    #[test]
    fn test_type2_always_admits() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = pool(store);

        let line = "MSG,2,1,1,4CA2D6,1,2019/10/20,13:33:40.000,2019/10/20,13:33:40.000,,,140,,47.15356,-1.61046,,,,,,-1";
        pool.update(&AdsbEvent::from_line(line).unwrap())?;

        assert_eq!(1, pool.len());
        // surface position got the configured ground altitude
        let flight = pool.get("4CA2D6").unwrap();
        assert_eq!(27., flight.positions()[0].altitude);
        Ok(())
    }

    #[test]
    fn test_known_flight_not_filtered() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = pool(store);

        pool.update(&msg3("39C812", 3000, 40))?;
        // would not qualify for admission, but the flight is known now
        pool.update(&msg3("39C812", 20_000, 41))?;
        pool.update(&msg4("39C812"))?;

        let flight = pool.get("39C812").unwrap();
        assert_eq!(2, flight.positions().len());
        assert_eq!(2, flight.message_count(3));
        assert_eq!(1, flight.message_count(4));
        Ok(())
    }

    #[test]
    fn test_interleaved_traffic_keeps_order() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = pool(store.clone());

        for second in 0..5 {
            pool.update(&msg3("AAAAAA", 2000 + second as i32, second))?;
            pool.update(&msg3("BBBBBB", 4000, second))?;
        }

        assert_eq!(2, pool.len());
        let a = pool.get("AAAAAA").unwrap();
        assert_eq!(5, a.positions().len());
        // strictly time-ordered
        assert!(a
            .positions()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(5, store.position_count("AAAAAA"));
        assert_eq!(5, store.position_count("BBBBBB"));
        Ok(())
    }

    #[test]
    fn test_prune_removes_aged_flights() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = FlightPool::new(
            AdsbMessageFilter::new(10_000, -1_000).unwrap(),
            store,
            Arc::new(Inert),
            PoolSettings::default(),
        );

        let mut first = msg3("AAAAAA", 3000, 40);
        first.generated = Some(Utc::now());
        pool.update(&first)?;
        assert_eq!(1, pool.len());

        // age it past max_age, any later update prunes it
        pool.flights
            .get_mut("AAAAAA")
            .unwrap()
            .set_last_seen(Utc::now() - Duration::seconds(301));

        let mut fresh = msg3("BBBBBB", 3000, 41);
        fresh.generated = Some(Utc::now());
        pool.update(&fresh)?;

        assert!(pool.get("AAAAAA").is_none());
        assert!(pool.get("BBBBBB").is_some());
        Ok(())
    }

    #[test]
    fn test_commit_throttling() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut pool = pool(store.clone());

        pool.update(&msg3("AAAAAA", 3000, 40))?;
        let after_admission = store.commit_count();
        assert_eq!(1, after_admission);

        // rapid-fire updates inside the commit period do not commit
        for second in 41..50 {
            pool.update(&msg3("AAAAAA", 3000, second))?;
        }
        assert_eq!(after_admission, store.commit_count());

        // a new aircraft commits immediately again
        pool.update(&msg3("BBBBBB", 3000, 50))?;
        assert_eq!(2, store.commit_count());
        Ok(())
    }
}
