//! `tarmacd` — ADS-B Base Station logger daemon.
//!
//! Connects to a `dump1090` feed (or replays a capture file), tracks every
//! aircraft it hears in a flight pool and writes flights, positions and
//! runway-attributed landings/takeoffs to a JSON-lines store.
//!

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use tracing::{error, info, warn};

use tarmac_common::{init_logging, Config};
use tarmac_engine::{
    list_airports, load_airports, AdsbLogger, FlightPool, JsonlStore, MovementLog, PoolSettings,
};
use tarmac_formats::AdsbMessageFilter;
use tarmac_sources::{FileSource, MessageSource, SbsSocket};

use crate::cli::Opts;

mod cli;

/// Binary name
pub const NAME: &str = env!("CARGO_BIN_NAME");
/// Binary version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let opts = Opts::parse();

    // -D and -v raise the default level unless RUST_LOG is already set
    //
    if std::env::var("RUST_LOG").is_err() {
        if opts.debug {
            std::env::set_var("RUST_LOG", "debug");
        } else if opts.verbose > 0 {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    init_logging(NAME, opts.tree, opts.logdir.clone())?;

    // Banner
    //
    info!(">>> welcome to {}/{} <<<", NAME, VERSION);

    let cfg = Config::load(opts.config.clone())?;
    let airports = load_airports(cfg.airports.clone())?;

    if opts.list_airports {
        println!("{}", list_airports(&airports)?);
        return Ok(());
    }

    // Assemble the core: store, filter, movement log, pool.
    //
    let store = Arc::new(JsonlStore::create(&cfg.store)?);
    let filter = AdsbMessageFilter::new(cfg.filter.below, cfg.filter.above)?;
    let watcher = Arc::new(MovementLog::new(airports, store.clone()));
    let pool = FlightPool::new(
        filter,
        store,
        watcher,
        PoolSettings {
            max_age: cfg.max_age,
            commit_period: cfg.commit_period,
            ground_altitude: cfg.ground_altitude,
            arrival_threshold: cfg.arrival_threshold,
        },
    );

    match &opts.replay {
        Some(path) => {
            info!("replaying from {}", path.display());
            run_with(FileSource::open(path)?, pool, cfg.queue_size)
        }
        None => {
            let addr = format!("{}:{}", cfg.host, cfg.port);
            let source = SbsSocket::connect_with(
                &addr,
                Duration::from_secs(cfg.socket_timeout),
                cfg.connect_attempts,
                Duration::from_secs(cfg.connect_backoff),
            )?;
            run_with(source, pool, cfg.queue_size)
        }
    }
}

/// Wire the signal handler to the pipeline, run it and sum up the session.
///
fn run_with<S: MessageSource + 'static>(
    source: S,
    pool: FlightPool,
    capacity: usize,
) -> Result<()> {
    let mut logger = AdsbLogger::new(source, pool, capacity);

    let flag = logger.shutdown_flag();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })?;

    info!("start logging messages");
    let result = logger.run();

    match &result {
        Ok(stats) => info!("maximum queue size: {}", stats.qsize_max),
        Err(e) => error!("session aborted: {}", e),
    }
    if !logger.pool().is_empty() {
        warn!(
            "dropping {} flights from flight pool",
            logger.pool().len()
        );
    }
    info!(">>> goodbye <<<");

    result.map(|_| ())
}
