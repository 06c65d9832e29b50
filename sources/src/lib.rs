//! Module to deal with the different kinds of sources we can read Base
//! Station messages from.
//!
//! The different submodules deal with the differences between sources:
//!
//! - `network`: the live `dump1090` TCP feed, with bounded initial
//!   connection attempts and unlimited in-session reconnects,
//! - `file`: replay of a captured feed,
//! - `memory`: canned lines for the test benches.
//!
//! All of them implement the [MessageSource] capability and are consumed
//! through a [MessageStream] which enforces the wire invariant (exactly 22
//! comma-separated fields per line) before anything downstream sees a line.
//!

use std::fmt::Debug;

// Re-export these modules for a shorter import path.
//
pub use error::*;
pub use file::*;
pub use memory::*;
pub use network::*;
pub use stream::*;

mod error;
mod file;
mod memory;
mod network;
mod stream;

/// Capability interface of a message source.
///
/// `next_line()` returns `Ok(None)` when the source is exhausted.  Errors are
/// classified by [SourceError]; sources that can recover (the network one)
/// do so internally and only surface fatal conditions.
///
pub trait MessageSource: Debug + Send {
    /// Name of the source, for logs.
    fn name(&self) -> String;

    /// Pull the next raw line, blocking.
    fn next_line(&mut self) -> Result<Option<String>, SourceError>;
}
