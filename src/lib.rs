//! Instruction scheduling core of an out-of-order pipeline simulator.
//!
//! A Tomasulo-style [`scoreboard::Scoreboard`] renames registers, tracks
//! operand dependencies in reservation stations, dispatches ready work to
//! execution units and broadcasts results so waiting instructions wake up.
//! Retirement order comes from the reorder buffer.

#[macro_use]
extern crate num_derive;

pub mod assembler;
pub mod cpu;
pub mod error;
pub mod execution_units;
pub mod fetcher;
pub mod instructions;
pub mod register_alias_table;
pub mod reorder_buffer;
pub mod reservation_station;
pub mod reservation_station_table;
pub mod scoreboard;
pub mod stats;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sim",
    version,
    about = "Out-of-order scoreboard simulator",
    long_about = "Runs a dynamic instruction trace through a Tomasulo-style scoreboard and prints cycle statistics.\n\nSet RUST_LOG=trace to see every issue, dispatch, broadcast and commit."
)]
pub struct Args {
    /// Trace file, one executed instruction per line.
    pub file: PathBuf,

    /// Reorder buffer slots.
    #[arg(long, default_value_t = 16)]
    pub rob_size: usize,

    /// Instructions the reorder buffer may retire per cycle.
    #[arg(long, default_value_t = 1)]
    pub retire_width: usize,

    /// Instructions issued per cycle.
    #[arg(long, default_value_t = 1)]
    pub issue_width: usize,

    /// Reservation stations.
    #[arg(long, default_value_t = 8)]
    pub rs_size: usize,

    /// Architectural registers.
    #[arg(long, default_value_t = instructions::NUM_REGS)]
    pub num_regs: usize,

    /// Instructions each execution unit accepts per cycle.
    #[arg(long, default_value_t = 1)]
    pub eu_width: usize,

    /// Give up if the pipeline has not drained after this many cycles.
    #[arg(long, default_value_t = 1_000_000)]
    pub max_cycles: u64,
}
