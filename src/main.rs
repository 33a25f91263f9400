use std::process;

use clap::Parser;

use scoreboard::assembler::assemble_file;
use scoreboard::cpu::{CpuConfig, CPU};
use scoreboard::error::SimResult;
use scoreboard::stats::StatsTracker;
use scoreboard::Args;

fn run(args: Args) -> SimResult<StatsTracker> {
    let instructions = assemble_file(&args.file)?;
    let mut simulator = CPU::new(CpuConfig::from(args))?;
    simulator.run_program(instructions)
}

fn main() {
    env_logger::init();

    match run(Args::parse()) {
        Ok(stats) => print!("{}", stats),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}
