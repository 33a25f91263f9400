use core::fmt::{self, Display};
use std::collections::VecDeque;

use crate::{instructions::Instruction, register_alias_table::RegisterAliasTable};

/// Slot of an in-flight instruction in the producer sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RobIndex(pub usize);
impl Display for RobIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rob{}", self.0)
    }
}

/// Program-order allocation and retirement of in-flight instructions.
///
/// The scoreboard only allocates slots, pushes completions and pops retired
/// instructions. How and when completed slots retire is up to the implementor,
/// as long as `pop_committed` yields instructions strictly in allocation order.
pub trait ProducerSequencer: Display {
    /// Total number of slots; slot ids are always below this.
    fn capacity(&self) -> usize;

    fn is_full(&self) -> bool;

    /// No slot allocated and nothing left to pop.
    fn is_empty(&self) -> bool;

    /// Takes the next slot in program order. Must not be called while full.
    fn allocate(&mut self, inst: Instruction) -> RobIndex;

    /// The `Completed` channel: the value produced by `index` is now available.
    fn complete(&mut self, index: RobIndex);

    /// The `Committed` channel: next retired instruction, in program order.
    fn pop_committed(&mut self) -> Option<Instruction>;

    /// Advances the sequencer by one cycle. A retiring writer drops its
    /// register alias if it is still the newest producer of that register.
    fn tick(&mut self, rat: &mut RegisterAliasTable);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobState {
    Issued,
    Finished,
}
impl RobState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

#[derive(Debug, Clone)]
pub struct RobInst {
    pub index: RobIndex,
    pub inst: Instruction,
    pub state: RobState,
}

#[derive(Debug, Clone)]
pub struct ReorderBuffer {
    pub buffer: Vec<Option<RobInst>>,
    size: usize,
    max_retire: usize,
    head: usize,
    tail: usize,
    completed: VecDeque<RobIndex>,
    committed: VecDeque<Instruction>,
}
impl ReorderBuffer {
    pub fn new(size: usize, max_retire: usize) -> Self {
        assert!(size > 0, "reorder buffer needs at least one slot");

        Self {
            buffer: vec![None; size],
            size,
            max_retire,
            head: 0,
            tail: 0,
            completed: VecDeque::new(),
            committed: VecDeque::new(),
        }
    }

    pub fn occupied(&self) -> usize {
        self.buffer.iter().filter(|slot| slot.is_some()).count()
    }

    fn mark_finished(&mut self, index: RobIndex) {
        match self.buffer[index.0].as_mut() {
            Some(rob_inst) => {
                assert!(
                    !rob_inst.state.is_finished(),
                    "{} completed twice",
                    index
                );
                rob_inst.state = RobState::Finished;
            }
            None => panic!("{} completed but was never allocated!", index),
        }
    }

    /// Frees up to `max_retire` finished slots from the tail, oldest first.
    fn retire(&mut self) -> Vec<RobInst> {
        let mut retired = Vec::new();

        for _ in 0..self.max_retire {
            let finished = self.buffer[self.tail]
                .as_ref()
                .is_some_and(|rob_inst| rob_inst.state.is_finished());
            if !finished {
                break;
            }

            if let Some(rob_inst) = self.buffer[self.tail].take() {
                retired.push(rob_inst);
            }
            self.tail = (self.tail + 1) % self.size;
        }

        retired
    }
}
impl ProducerSequencer for ReorderBuffer {
    fn capacity(&self) -> usize {
        self.size
    }

    fn is_full(&self) -> bool {
        self.buffer[self.head].is_some() // allocation pointer caught up with the oldest entry
    }

    fn is_empty(&self) -> bool {
        self.buffer.iter().all(Option::is_none)
            && self.completed.is_empty()
            && self.committed.is_empty()
    }

    fn allocate(&mut self, inst: Instruction) -> RobIndex {
        if self.is_full() {
            panic!("Tried to add instruction to rob but doesn't have capacity!");
        }

        let index = RobIndex(self.head);
        self.buffer[self.head] = Some(RobInst {
            index,
            inst,
            state: RobState::Issued,
        });
        self.head = (self.head + 1) % self.size;

        index
    }

    fn complete(&mut self, index: RobIndex) {
        self.completed.push_back(index);
    }

    fn pop_committed(&mut self) -> Option<Instruction> {
        self.committed.pop_front()
    }

    fn tick(&mut self, rat: &mut RegisterAliasTable) {
        while let Some(index) = self.completed.pop_front() {
            self.mark_finished(index);
        }

        for rob_inst in self.retire() {
            if let Some(rd) = rob_inst.inst.rd {
                rat.clear_if_match(rd, rob_inst.index);
            }
            log::trace!("rob: retired {} from {}", rob_inst.inst, rob_inst.index);
            self.committed.push_back(rob_inst.inst);
        }
    }
}
impl Display for ReorderBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "ROB {}/{} head={} tail={} committed={}",
            self.occupied(),
            self.size,
            self.head,
            self.tail,
            self.committed.len()
        )?;
        for rob_inst in self.buffer.iter().flatten() {
            writeln!(
                f,
                "    {} {} {:?}",
                rob_inst.index, rob_inst.inst, rob_inst.state
            )?;
        }
        Ok(())
    }
}
