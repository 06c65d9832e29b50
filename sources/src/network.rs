//! The live Base Station feed, usually `dump1090` on port 30003.
//!
//! Connection policy: the initial connection gets a bounded budget of
//! attempts with a fixed backoff, exhausting it is fatal.  Once a session is
//! live, the peer is allowed to go away and come back, we reconnect for as
//! long as it takes.  Reads carry a timeout so a silently dead peer is
//! detected instead of hanging the receiver thread forever.
//!

use std::io::{BufRead, BufReader, ErrorKind};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use tracing::{error, info, trace, warn};

use crate::{MessageSource, SourceError};

/// Initial connection budget
pub const CONNECT_ATTEMPTS: usize = 5;
/// Fixed delay between connection attempts
pub const CONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Reconnecting TCP line source.
///
#[derive(Debug)]
pub struct SbsSocket {
    addr: String,
    read_timeout: Duration,
    backoff: Duration,
    reader: BufReader<TcpStream>,
}

impl SbsSocket {
    /// Open the initial connection, bounded by [CONNECT_ATTEMPTS].
    ///
    #[tracing::instrument]
    pub fn connect(addr: &str, read_timeout: Duration) -> Result<Self, SourceError> {
        Self::connect_with(addr, read_timeout, CONNECT_ATTEMPTS, CONNECT_BACKOFF)
    }

    /// Same, with an explicit budget (from the configuration file).
    ///
    #[tracing::instrument]
    pub fn connect_with(
        addr: &str,
        read_timeout: Duration,
        attempts: usize,
        backoff: Duration,
    ) -> Result<Self, SourceError> {
        for attempt in 1..=attempts {
            match Self::open(addr, read_timeout) {
                Ok(reader) => {
                    info!("connected to {}", addr);
                    return Ok(SbsSocket {
                        addr: addr.to_owned(),
                        read_timeout,
                        backoff,
                        reader,
                    });
                }
                Err(e) => {
                    warn!("connection to {} failed ({}/{}): {}", addr, attempt, attempts, e);
                    if attempt < attempts {
                        thread::sleep(backoff);
                    }
                }
            }
        }
        Err(SourceError::ConnectionFailed(addr.to_owned(), attempts))
    }

    fn open(addr: &str, read_timeout: Duration) -> Result<BufReader<TcpStream>, SourceError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(read_timeout))?;
        Ok(BufReader::new(stream))
    }

    /// In-session recovery, unlimited attempts while the session is live.
    ///
    fn reconnect(&mut self) {
        loop {
            match Self::open(&self.addr, self.read_timeout) {
                Ok(reader) => {
                    info!("reconnected to {}", self.addr);
                    self.reader = reader;
                    return;
                }
                Err(e) => {
                    error!("reconnection to {} failed: {}", self.addr, e);
                    thread::sleep(self.backoff);
                }
            }
        }
    }
}

impl MessageSource for SbsSocket {
    fn name(&self) -> String {
        format!("sbs({})", self.addr)
    }

    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                // Peer closed the connection
                //
                Ok(0) => {
                    info!("{}: peer closed the stream, reconnecting", self.addr);
                    self.reconnect();
                }
                Ok(_) => {
                    trace!("got {}", line.trim_end());
                    return Ok(Some(line.trim_end().to_owned()));
                }
                // A timeout surfaces as WouldBlock or TimedOut depending on
                // the platform, both mean a silently dead peer.
                //
                Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                    warn!("{}: read timed out, reconnecting", self.addr);
                    self.reconnect();
                }
                Err(e) => {
                    error!("{}: read failed: {}, reconnecting", self.addr, e);
                    self.reconnect();
                }
            }
        }
    }
}
