use std::collections::VecDeque;

use crate::{instructions::Instruction, reorder_buffer::RobIndex, reservation_station::RsIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
pub enum EUType {
    ALU,
    Branch,
    Memory,
    FPU,
    System,
}
impl EUType {
    pub const COUNT: usize = 5;
}

/// What travels from dispatch, through a unit, back to writeback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExeInst {
    pub inst: Instruction,
    pub rob_index: RobIndex,
    pub rs_index: RsIndex,
}

/// A worker for one kind of instruction with an ingestion channel and a
/// completion channel.
///
/// `send` must always accept: throttling happens inside the unit, never by
/// refusing work.
pub trait ExecutionUnit {
    fn flavour(&self) -> EUType;

    fn send(&mut self, inst: ExeInst);

    fn peek_output(&self) -> Option<&ExeInst>;

    fn pop_output(&mut self) -> Option<ExeInst>;

    /// Holds work that has not yet been written back.
    fn is_busy(&self) -> bool;
}

#[derive(Debug, Clone)]
struct InFlight {
    cycles_left: usize,
    inst: ExeInst,
}

/// Pipelined unit: accepts up to `width` instructions per cycle and finishes
/// each after its op latency.
#[derive(Debug, Clone)]
pub struct FunctionalUnit {
    pub flavour: EUType,
    width: usize,
    input: VecDeque<ExeInst>,
    in_flight: Vec<InFlight>,
    output: VecDeque<ExeInst>,
}
impl FunctionalUnit {
    pub fn new(flavour: EUType, width: usize) -> Self {
        FunctionalUnit {
            flavour,
            width,
            input: VecDeque::new(),
            in_flight: Vec::new(),
            output: VecDeque::new(),
        }
    }

    /// Accepts new work, then counts everything in flight down by one cycle.
    pub fn cycle(&mut self) {
        for _ in 0..self.width {
            let Some(inst) = self.input.pop_front() else {
                break;
            };
            self.in_flight.push(InFlight {
                cycles_left: inst.inst.op.cycles_needed(),
                inst,
            });
        }

        for in_flight in self.in_flight.iter_mut() {
            in_flight.cycles_left = in_flight.cycles_left.saturating_sub(1);
        }

        // finished in ingestion order, so equal latencies come out oldest first
        let (done, running): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|in_flight| in_flight.cycles_left == 0);
        self.in_flight = running;

        for in_flight in done {
            log::trace!(
                "{:?}: finished {} ({})",
                self.flavour,
                in_flight.inst.inst,
                in_flight.inst.rob_index
            );
            self.output.push_back(in_flight.inst);
        }
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}
impl ExecutionUnit for FunctionalUnit {
    fn flavour(&self) -> EUType {
        self.flavour
    }

    fn send(&mut self, inst: ExeInst) {
        self.input.push_back(inst);
    }

    fn peek_output(&self) -> Option<&ExeInst> {
        self.output.front()
    }

    fn pop_output(&mut self) -> Option<ExeInst> {
        self.output.pop_front()
    }

    fn is_busy(&self) -> bool {
        !self.input.is_empty() || !self.in_flight.is_empty() || !self.output.is_empty()
    }
}
