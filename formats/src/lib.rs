//! Definition of the data formats
//!
//! There is a single input format here: the SBS-1 "Base Station" ASCII feed
//! served by `dump1090` and friends on port 30003.  The `basestation` module
//! turns one wire line into a typed [AdsbEvent], the `filter` module holds
//! the admission predicates applied before an aircraft enters the flight
//! pool.
//!

// Re-export for convenience
//
pub use basestation::*;
pub use common::*;
pub use filter::*;

mod basestation;
mod common;
mod filter;
