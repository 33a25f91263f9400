use num_traits::FromPrimitive;

use crate::error::{SimError, SimResult};
use crate::execution_units::{EUType, ExecutionUnit, FunctionalUnit};
use crate::fetcher::Fetcher;
use crate::instructions::{Instruction, NUM_REGS};
use crate::reorder_buffer::ReorderBuffer;
use crate::scoreboard::Scoreboard;
use crate::stats::StatsTracker;
use crate::Args;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuConfig {
    pub rob_size: usize,
    pub rob_max_retire: usize,
    pub issue_width: usize,
    pub rs_size: usize,
    pub num_regs: usize,
    pub eu_width: usize,
    pub max_cycles: u64,
}
impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            rob_size: 16,
            rob_max_retire: 1,
            issue_width: 1,
            rs_size: 8,
            num_regs: NUM_REGS,
            eu_width: 1,
            max_cycles: 1_000_000,
        }
    }
}
impl From<Args> for CpuConfig {
    fn from(value: Args) -> Self {
        Self {
            rob_size: value.rob_size,
            rob_max_retire: value.retire_width,
            issue_width: value.issue_width,
            rs_size: value.rs_size,
            num_regs: value.num_regs,
            eu_width: value.eu_width,
            max_cycles: value.max_cycles,
        }
    }
}
impl CpuConfig {
    pub fn validate(&self) -> SimResult<()> {
        let sizes = [
            ("rob size", self.rob_size),
            ("retire width", self.rob_max_retire),
            ("issue width", self.issue_width),
            ("reservation station count", self.rs_size),
            ("register count", self.num_regs),
            ("execution unit width", self.eu_width),
        ];

        match sizes.iter().find(|(_, size)| *size == 0) {
            Some((name, _)) => Err(SimError::Config(format!("{} must be at least 1", name))),
            None => Ok(()),
        }
    }
}

/// Cycle driver around the scoreboard: feeds it the trace and clocks the
/// execution units and the reorder buffer.
#[derive(Debug)]
pub struct CPU {
    fetcher: Fetcher,
    scoreboard: Scoreboard<ReorderBuffer>,
    execution_units: Vec<FunctionalUnit>,
    last_committed: Option<u64>,
    stats_tracker: StatsTracker,
    config: CpuConfig,
}
impl CPU {
    pub fn new(config: CpuConfig) -> SimResult<Self> {
        config.validate()?;

        let execution_units = (0..EUType::COUNT)
            .filter_map(EUType::from_usize)
            .map(|flavour| FunctionalUnit::new(flavour, config.eu_width))
            .collect();

        Ok(CPU {
            fetcher: Fetcher::default(),
            scoreboard: Scoreboard::new(
                config.num_regs,
                config.rs_size,
                ReorderBuffer::new(config.rob_size, config.rob_max_retire),
            ),
            execution_units,
            last_committed: None,
            stats_tracker: StatsTracker::new(),
            config,
        })
    }

    pub fn scoreboard(&self) -> &Scoreboard<ReorderBuffer> {
        &self.scoreboard
    }

    pub fn stats(&self) -> StatsTracker {
        self.stats_tracker
    }

    pub fn run_program(&mut self, instructions: Vec<Instruction>) -> SimResult<StatsTracker> {
        if let Some(reg) = instructions
            .iter()
            .flat_map(|inst| [inst.rd, inst.rs1, inst.rs2])
            .flatten()
            .find(|reg| reg.index() >= self.config.num_regs)
        {
            return Err(SimError::Config(format!(
                "register {} is outside the {} register file",
                reg, self.config.num_regs
            )));
        }

        log::info!("running {} instructions", instructions.len());
        self.fetcher = Fetcher::new(instructions);
        self.run()?;
        log::info!(
            "finished after {} cycles, {} committed",
            self.stats_tracker.cycles,
            self.stats_tracker.instructions_committed
        );

        Ok(self.stats_tracker)
    }

    fn run(&mut self) -> SimResult<()> {
        while !self.is_finished() {
            if self.stats_tracker.cycles >= self.config.max_cycles {
                return Err(SimError::CycleLimit(self.stats_tracker.cycles));
            }
            self.cycle();
            self.stats_tracker.cycles += 1;
        }
        Ok(())
    }

    pub fn cycle(&mut self) {
        // issue
        for _ in 0..self.config.issue_width {
            let Some(&inst) = self.fetcher.get_oldest() else {
                break;
            };
            match self.scoreboard.issue(inst) {
                Ok(_) => {
                    self.fetcher.take_oldest();
                    self.stats_tracker.instructions_issued += 1;
                }
                Err(hazard) => {
                    log::debug!(
                        "cycle {}: {} stalled: {}",
                        self.stats_tracker.cycles,
                        inst,
                        hazard
                    );
                    self.stats_tracker.issue_stalls += 1;
                    break;
                }
            }
        }

        // execute
        let dispatched = self.scoreboard.execute(&mut self.execution_units);
        self.stats_tracker.instructions_dispatched += dispatched.len() as u64;

        // writeback
        if self.scoreboard.writeback(&mut self.execution_units).is_some() {
            self.stats_tracker.instructions_completed += 1;
        }

        // commit
        if let Some(inst) = self.scoreboard.commit() {
            if let Some(last) = self.last_committed {
                assert!(
                    inst.uid > last,
                    "{} committed after #{}, out of program order",
                    inst,
                    last
                );
            }
            self.last_committed = Some(inst.uid);
            self.stats_tracker.instructions_committed += 1;
        }

        // the collaborators advance after every stage has seen this cycle
        for eu in self.execution_units.iter_mut() {
            eu.cycle();
        }
        self.scoreboard.tick_sequencer();

        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "end of cycle {}\n{}",
                self.stats_tracker.cycles,
                self.scoreboard.dump()
            );
        }
    }

    fn is_finished(&self) -> bool {
        self.fetcher.is_empty()
            && self.scoreboard.is_empty()
            && !self.execution_units.iter().any(|eu| eu.is_busy())
    }
}
