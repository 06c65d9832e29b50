//! Module describing all possible options to the `tarmacd` main driver
//!
//! The daemon has a single mode of operation, logging.  `--replay` swaps the
//! network source for a capture file, `--list-airports` dumps the reference
//! table and exits.
//!

use std::path::PathBuf;

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser};

/// CLI options
#[derive(Debug, Parser)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// configuration file.
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,
    /// debug mode.
    #[clap(short = 'D', long = "debug")]
    pub debug: bool,
    /// List the configured airports & runways, then exit.
    #[clap(short = 'L', long)]
    pub list_airports: bool,
    /// Log to an hourly rotated file in this directory.
    #[clap(long)]
    pub logdir: Option<String>,
    /// Replay a Base Station capture file instead of connecting.
    #[clap(short = 'r', long)]
    pub replay: Option<PathBuf>,
    /// Hierarchical trace output.
    #[clap(long)]
    pub tree: bool,
    /// Verbose mode.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
