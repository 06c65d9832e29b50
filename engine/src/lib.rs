//! Library implementing the flight tracking core.
//!
//! The engine owns everything between a decoded [tarmac_formats::AdsbEvent]
//! and the durable store:
//!
//! - [Flight]: per-aircraft state machine with ground-transition detection
//!   and intention classification,
//! - [FlightPool]: registry of live flights with admission, aging and
//!   commit throttling,
//! - [Airport]/[Runway]: static reference geometry with the runway
//!   attribution predicates,
//! - [MovementLog]: the landing/takeoff subscriber,
//! - [AdsbLogger]: the two-thread ingest pipeline with its bounded queue.
//!

pub use airports::*;
pub use error::*;
pub use flight::*;
pub use movements::*;
pub use pipeline::*;
pub use pool::*;
pub use store::*;
pub use track::*;

mod airports;
mod error;
mod flight;
mod movements;
mod pipeline;
mod pool;
mod store;
mod track;

const NAME: &str = env!("CARGO_PKG_NAME");
const EVERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> String {
    format!("{}/{}", NAME, EVERSION)
}
