//! Two-thread ingestion pipeline.
//!
//! One receiver thread reads and decodes the stream, one consumer (the
//! caller of [AdsbLogger::run]) pops events and feeds the flight pool.  The
//! two are joined by a single bounded queue, which keeps delivery strictly
//! FIFO, so the per-aircraft temporal order the transition detection relies
//! on is preserved.
//!
//! Backpressure is deliberately brutal: when the queue is full the receiver
//! does not block and does not drop-and-continue, it clears the queue,
//! enqueues one fault marker and stops.  The consumer treats the marker as
//! fatal for the session.
//!
//! Shutdown is cooperative: the consumer raises a shared flag, the receiver
//! finishes its current line, enqueues a sentinel and stops; the consumer
//! re-enqueues the sentinel for any other listener, joins the receiver and
//! only then returns, guaranteeing the queue is drained before teardown.
//!

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use eyre::Result;
use serde::Serialize;
use tracing::{debug, error, info, trace};

use tarmac_formats::AdsbEvent;
use tarmac_sources::{MessageSource, MessageStream};

use crate::{EngineStatus, FlightPool};

/// What travels over the bounded queue.
///
#[derive(Clone, Debug)]
enum QueueMsg {
    Event(AdsbEvent),
    /// The queue overflowed, fatal for this session
    Overflow,
    /// Orderly end of stream
    Sentinel,
}

/// Counters for one ingest session.
///
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct PipelineStats {
    /// Events decoded and queued
    pub received: u64,
    /// Lines the decoder rejected
    pub rejected: u64,
    /// Events applied to the pool
    pub updated: u64,
    /// Maximum observed queue depth
    pub qsize_max: usize,
}

impl Display for PipelineStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "received={} rejected={} updated={} qsize_max={}",
            self.received, self.rejected, self.updated, self.qsize_max
        )
    }
}

/// Receiver-side counters, shared with the consumer for the final summary.
///
#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    rejected: AtomicU64,
}

/// Multi-thread logger which directs decoded messages from a source to the
/// flight pool.
///
#[derive(Debug)]
pub struct AdsbLogger<S: MessageSource> {
    source: Option<S>,
    pool: FlightPool,
    capacity: usize,
    shutdown: Arc<AtomicBool>,
}

impl<S: MessageSource + 'static> AdsbLogger<S> {
    pub fn new(source: S, pool: FlightPool, capacity: usize) -> Self {
        AdsbLogger {
            source: Some(source),
            pool,
            capacity,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The cooperative stop flag, wire it to a signal handler.
    ///
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn pool(&self) -> &FlightPool {
        &self.pool
    }

    /// Main loop of the logger.  Returns the session counters on orderly
    /// shutdown, an error on a fatal fault; either way the receiver thread
    /// is joined before returning.
    ///
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<PipelineStats> {
        let source = self.source.take().ok_or(EngineStatus::SourceConsumed)?;

        let (tx, rx) = bounded::<QueueMsg>(self.capacity);
        let counters = Arc::new(Counters::default());

        let handle = {
            let tx = tx.clone();
            let drain = rx.clone();
            let stop = self.shutdown.clone();
            let counters = counters.clone();
            let capacity = self.capacity;
            thread::Builder::new()
                .name("receiver".to_owned())
                .spawn(move || receiver(source, tx, drain, stop, counters, capacity))?
        };

        let mut stats = PipelineStats::default();
        let result = loop {
            // Remember maximum queue depth (for the summary)
            //
            let depth = rx.len();
            if depth > stats.qsize_max {
                stats.qsize_max = depth;
            }
            debug!("current queue size: {} (max: {})", depth, stats.qsize_max);

            match rx.recv() {
                Ok(QueueMsg::Event(event)) => match self.pool.update(&event) {
                    Ok(()) => stats.updated += 1,
                    Err(e) => {
                        // Store faults are not ours to absorb.  Stop the
                        // receiver, drain to its marker and surface the
                        // error.
                        error!("pool update failed: {}", e);
                        self.shutdown.store(true, Ordering::Relaxed);
                        drain_until_marker(&rx);
                        break Err(e);
                    }
                },
                Ok(QueueMsg::Overflow) => {
                    error!("message queue overflowed, aborting session");
                    break Err(EngineStatus::QueueOverflow(self.capacity).into());
                }
                Ok(QueueMsg::Sentinel) => {
                    info!("termination of main logger loop demanded");
                    // Put the sentinel back into the queue for other
                    // listeners to receive.
                    let _ = tx.try_send(QueueMsg::Sentinel);
                    break Ok(());
                }
                // Receiver gone without a marker, treat as end of stream.
                //
                Err(_) => break Ok(()),
            }
        };

        trace!("joining threads");
        let _ = handle.join();

        stats.received = counters.received.load(Ordering::Relaxed);
        stats.rejected = counters.rejected.load(Ordering::Relaxed);
        info!("session: {}", stats);

        result.map(|()| stats)
    }
}

/// Receiver thread body: stream, validate, decode, enqueue.
///
fn receiver<S: MessageSource>(
    source: S,
    tx: Sender<QueueMsg>,
    drain: Receiver<QueueMsg>,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
    capacity: usize,
) {
    info!("message receiver thread started");

    for line in MessageStream::new(source) {
        match AdsbEvent::from_line(&line) {
            Ok(event) => {
                counters.received.fetch_add(1, Ordering::Relaxed);
                match tx.try_send(QueueMsg::Event(event)) {
                    Ok(()) => (),
                    Err(TrySendError::Full(_)) => {
                        error!(
                            "max queue size reached ({}), dropping all pending messages",
                            capacity
                        );
                        while drain.try_recv().is_ok() {}
                        let _ = tx.send(QueueMsg::Overflow);
                        return;
                    }
                    Err(TrySendError::Disconnected(_)) => return,
                }
            }
            Err(e) => {
                counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!("skipping message: {}", e);
            }
        }

        if stop.load(Ordering::Relaxed) {
            trace!("stop requested");
            break;
        }
    }

    info!("message receiver thread shutting down");
    let _ = tx.send(QueueMsg::Sentinel);
}

/// Keep draining until the receiver's terminal marker shows up, so its
/// final (blocking) enqueue can never wedge the join.
///
fn drain_until_marker(rx: &Receiver<QueueMsg>) {
    for msg in rx.iter() {
        match msg {
            QueueMsg::Overflow | QueueMsg::Sentinel => break,
            QueueMsg::Event(_) => (),
        }
    }
}
