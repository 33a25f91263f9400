//! Tomasulo-style scoreboard: issue, dispatch, broadcast and commit.
//!
//! The scoreboard owns the register alias table, the reservation stations,
//! the reservation station lookup table and the producer sequencer. Execution
//! units are owned by the caller and lent to `execute` and `writeback`.

use crate::{
    error::IssueError,
    execution_units::{ExeInst, ExecutionUnit},
    instructions::{Instruction, Register},
    register_alias_table::{RegisterAliasTable, Tag},
    reorder_buffer::{ProducerSequencer, RobIndex},
    reservation_station::{ReservationStations, RsIndex},
    reservation_station_table::ReservationStationTable,
};

#[derive(Debug)]
pub struct Scoreboard<S: ProducerSequencer> {
    rat: RegisterAliasTable,
    rs: ReservationStations,
    rst: ReservationStationTable,
    rob: S,
}
impl<S: ProducerSequencer> Scoreboard<S> {
    pub fn new(num_regs: usize, num_rs: usize, rob: S) -> Self {
        Scoreboard {
            rat: RegisterAliasTable::new(num_regs),
            rs: ReservationStations::new(num_rs),
            rst: ReservationStationTable::new(rob.capacity()),
            rob,
        }
    }

    pub fn rat(&self) -> &RegisterAliasTable {
        &self.rat
    }

    pub fn reservation_stations(&self) -> &ReservationStations {
        &self.rs
    }

    pub fn lookup_table(&self) -> &ReservationStationTable {
        &self.rst
    }

    pub fn sequencer(&self) -> &S {
        &self.rob
    }

    /// Nothing is waiting, executing or waiting to be committed.
    pub fn is_empty(&self) -> bool {
        self.rs.is_empty() && self.rob.is_empty()
    }

    /// Advances the producer sequencer by one cycle.
    pub fn tick_sequencer(&mut self) {
        self.rob.tick(&mut self.rat);
    }

    /// Reservation station that will produce `reg`, or `None` if its value is available.
    fn resolve(&self, reg: Option<Register>) -> Option<RsIndex> {
        match self.rat.get(reg?) {
            Tag::Register(_) => None,
            // producer already wrote back; its value sits in the rob until retirement
            Tag::Rob(rob_index) => self.rst.get(rob_index),
        }
    }

    pub fn issue(&mut self, inst: Instruction) -> Result<RobIndex, IssueError> {
        if self.rs.is_full() {
            return Err(IssueError::ReservationStationsFull);
        }
        if self.rob.is_full() {
            return Err(IssueError::ReorderBufferFull);
        }

        // resolve before renaming so `add $1 $1 $2` waits on the previous writer of $1
        let src1_wait = self.resolve(inst.rs1);
        let src2_wait = self.resolve(inst.rs2);

        let rob_index = self.rob.allocate(inst);

        if let Some(rd) = inst.rd {
            self.rat.set(rd, rob_index);
        }

        let rs_index = self.rs.push(inst, rob_index, src1_wait, src2_wait);
        self.rst.set(rob_index, rs_index);

        log::trace!(
            "issue: {} -> {} {} (waits {:?} {:?})",
            inst,
            rob_index,
            rs_index,
            src1_wait,
            src2_wait
        );

        Ok(rob_index)
    }

    /// Sends every ready, idle reservation station to its execution unit.
    pub fn execute<U: ExecutionUnit>(&mut self, units: &mut [U]) -> Vec<Instruction> {
        let mut dispatched = Vec::new();

        for (rs_index, entry) in self.rs.iter_mut() {
            if entry.running || !entry.is_ready() {
                continue;
            }

            let eu_type = entry.inst.eu_type();
            let Some(unit) = units.iter_mut().find(|eu| eu.flavour() == eu_type) else {
                panic!("no execution unit for {:?}", eu_type);
            };

            unit.send(ExeInst {
                inst: entry.inst,
                rob_index: entry.rob_index,
                rs_index,
            });
            entry.running = true;

            log::trace!("dispatch: {} from {} to {:?}", entry.inst, rs_index, eu_type);
            dispatched.push(entry.inst);
        }

        dispatched
    }

    /// Broadcasts the first finished result found among `units`.
    ///
    /// At most one result is written back per call; other finished work stays
    /// queued in its unit for later cycles.
    pub fn writeback<U: ExecutionUnit>(&mut self, units: &mut [U]) -> Option<Instruction> {
        let unit = units.iter_mut().find(|eu| eu.peek_output().is_some())?;
        let ExeInst {
            inst,
            rob_index,
            rs_index,
        } = *unit.peek_output()?;

        match self.rs.get(rs_index) {
            Some(entry) => assert!(
                entry.running && entry.rob_index == rob_index,
                "{} finished but {} holds {:?}",
                inst,
                rs_index,
                entry
            ),
            None => panic!("{} finished from free reservation station {}", inst, rs_index),
        }

        let woken = self.rs.broadcast(rs_index);

        let tracked = self.rst.clear(rob_index);
        assert_eq!(
            tracked,
            Some(rs_index),
            "{} was not tracked by {}",
            rob_index,
            rs_index
        );

        self.rob.complete(rob_index);
        self.rs.remove(rs_index);
        unit.pop_output();

        log::trace!(
            "writeback: {} from {} woke {} operand(s)",
            inst,
            rs_index,
            woken
        );

        Some(inst)
    }

    pub fn commit(&mut self) -> Option<Instruction> {
        let inst = self.rob.pop_committed()?;
        log::trace!("commit: {}", inst);
        Some(inst)
    }

    pub fn dump(&self) -> String {
        format!("{}{}", self.rs, self.rob)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::execution_units::EUType;
    use crate::instructions::Op;
    use crate::reorder_buffer::ReorderBuffer;

    /// Unit whose work finishes only when the test says so.
    struct StubUnit {
        flavour: EUType,
        input: VecDeque<ExeInst>,
        output: VecDeque<ExeInst>,
    }
    impl StubUnit {
        fn new(flavour: EUType) -> Self {
            StubUnit {
                flavour,
                input: VecDeque::new(),
                output: VecDeque::new(),
            }
        }

        fn finish_all(&mut self) {
            self.output.extend(self.input.drain(..));
        }
    }
    impl ExecutionUnit for StubUnit {
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
            !self.input.is_empty() || !self.output.is_empty()
        }
    }

    fn units() -> Vec<StubUnit> {
        vec![
            StubUnit::new(EUType::ALU),
            StubUnit::new(EUType::Memory),
            StubUnit::new(EUType::Branch),
        ]
    }

    fn scoreboard(num_rs: usize, rob_size: usize) -> Scoreboard<ReorderBuffer> {
        Scoreboard::new(8, num_rs, ReorderBuffer::new(rob_size, rob_size))
    }

    fn add(uid: u64, rd: usize, rs1: usize, rs2: usize) -> Instruction {
        Instruction::new(uid, uid as usize * 4, Op::Add)
            .with_rd(rd)
            .with_rs1(rs1)
            .with_rs2(rs2)
    }

    fn li(uid: u64, rd: usize) -> Instruction {
        Instruction::new(uid, uid as usize * 4, Op::LoadImmediate).with_rd(rd)
    }

    fn uids(insts: &[Instruction]) -> Vec<u64> {
        insts.iter().map(|inst| inst.uid).collect()
    }

    fn waits(sb: &Scoreboard<ReorderBuffer>, rob_index: RobIndex) -> (Option<RsIndex>, Option<RsIndex>) {
        let rs_index = sb.lookup_table().get(rob_index).unwrap();
        let entry = sb.reservation_stations().get(rs_index).unwrap();
        (entry.src1_wait, entry.src2_wait)
    }

    #[test]
    fn dependent_instruction_waits_for_broadcast() {
        let mut sb = scoreboard(4, 4);
        let mut units = units();

        let a = sb.issue(add(0, 1, 2, 3)).unwrap();
        let b = sb.issue(add(1, 2, 1, 0)).unwrap();
        let a_rs = sb.lookup_table().get(a).unwrap();
        assert_eq!(waits(&sb, b), (Some(a_rs), None));

        assert_eq!(uids(&sb.execute(&mut units)), vec![0]);
        assert_eq!(sb.writeback(&mut units), None);

        units[0].finish_all();
        assert_eq!(sb.writeback(&mut units).map(|i| i.uid), Some(0));
        assert_eq!(waits(&sb, b), (None, None));
        assert_eq!(sb.lookup_table().get(a), None);

        assert_eq!(uids(&sb.execute(&mut units)), vec![1]);
        units[0].finish_all();
        assert_eq!(sb.writeback(&mut units).map(|i| i.uid), Some(1));

        sb.tick_sequencer();
        assert_eq!(sb.commit().map(|i| i.uid), Some(0));
        assert_eq!(sb.commit().map(|i| i.uid), Some(1));
        assert_eq!(sb.commit(), None);
        assert!(sb.is_empty());
    }

    #[test]
    fn source_equal_to_destination_reads_previous_producer() {
        let mut sb = scoreboard(4, 4);

        let first = sb.issue(li(0, 1)).unwrap();
        let second = sb.issue(add(1, 1, 1, 1)).unwrap();

        let first_rs = sb.lookup_table().get(first).unwrap();
        let second_rs = sb.lookup_table().get(second).unwrap();
        assert_ne!(first_rs, second_rs);
        assert_eq!(waits(&sb, second), (Some(first_rs), Some(first_rs)));
        assert_eq!(sb.rat().get(Register(1)), Tag::Rob(second));
    }

    #[test]
    fn self_dependency_on_untracked_register_is_ready() {
        let mut sb = scoreboard(4, 4);
        let index = sb.issue(add(0, 1, 1, 1)).unwrap();
        assert_eq!(waits(&sb, index), (None, None));
    }

    #[test]
    fn reader_follows_newest_writer() {
        let mut sb = scoreboard(4, 4);

        sb.issue(li(0, 1)).unwrap();
        let newer = sb.issue(li(1, 1)).unwrap();
        let reader = sb.issue(add(2, 3, 1, 0)).unwrap();

        let newer_rs = sb.lookup_table().get(newer).unwrap();
        assert_eq!(waits(&sb, reader).0, Some(newer_rs));
    }

    #[test]
    fn completed_but_unretired_producer_counts_as_available() {
        let mut sb = scoreboard(4, 4);
        let mut units = units();

        let producer = sb.issue(li(0, 1)).unwrap();
        sb.execute(&mut units);
        units[1].finish_all();
        sb.writeback(&mut units);

        // still renamed in the rat, no longer tracked by any reservation station
        assert_eq!(sb.rat().get(Register(1)), Tag::Rob(producer));
        let reader = sb.issue(add(1, 2, 1, 0)).unwrap();
        assert_eq!(waits(&sb, reader), (None, None));
    }

    #[rstest]
    #[case::reservation_stations(1, 4, IssueError::ReservationStationsFull)]
    #[case::reorder_buffer(4, 1, IssueError::ReorderBufferFull)]
    fn hazard_rejects_without_side_effects(
        #[case] num_rs: usize,
        #[case] rob_size: usize,
        #[case] expected: IssueError,
    ) {
        let mut sb = scoreboard(num_rs, rob_size);
        sb.issue(li(0, 1)).unwrap();

        let rat = sb.rat().clone();
        let rs = sb.reservation_stations().len();
        let before = sb.dump();

        assert_eq!(sb.issue(add(1, 2, 1, 1)), Err(expected));
        assert_eq!(sb.rat().table, rat.table);
        assert_eq!(sb.reservation_stations().len(), rs);
        assert_eq!(sb.dump(), before);
    }

    #[test]
    fn reservation_stations_are_checked_before_rob() {
        let mut sb = scoreboard(1, 1);
        sb.issue(li(0, 1)).unwrap();
        assert_eq!(sb.issue(li(1, 2)), Err(IssueError::ReservationStationsFull));
    }

    #[test]
    fn independent_instructions_dispatch_together() {
        let mut sb = scoreboard(4, 4);
        let mut units = units();

        sb.issue(li(0, 1)).unwrap();
        sb.issue(add(1, 2, 3, 4)).unwrap();
        sb.issue(add(2, 5, 1, 0)).unwrap();

        assert_eq!(uids(&sb.execute(&mut units)), vec![0, 1]);
        assert_eq!(units[0].input.len(), 1);
        assert_eq!(units[1].input.len(), 1);
    }

    #[test]
    fn running_entries_are_not_dispatched_again() {
        let mut sb = scoreboard(4, 4);
        let mut units = units();

        sb.issue(li(0, 1)).unwrap();
        assert_eq!(sb.execute(&mut units).len(), 1);
        assert!(sb.execute(&mut units).is_empty());
        assert_eq!(units[1].input.len(), 1);
    }

    #[test]
    fn one_broadcast_per_writeback() {
        let mut sb = scoreboard(4, 4);
        let mut units = units();

        sb.issue(add(0, 1, 0, 0)).unwrap();
        sb.issue(li(1, 2)).unwrap();
        sb.execute(&mut units);
        units[0].finish_all();
        units[1].finish_all();

        assert_eq!(sb.writeback(&mut units).map(|i| i.uid), Some(0));
        assert!(units[1].peek_output().is_some());
        assert_eq!(sb.writeback(&mut units).map(|i| i.uid), Some(1));
        assert_eq!(sb.writeback(&mut units), None);
    }

    #[test]
    fn broadcast_wakes_every_waiter() {
        let mut sb = scoreboard(4, 4);
        let mut units = units();

        sb.issue(li(0, 1)).unwrap();
        let x = sb.issue(add(1, 2, 1, 0)).unwrap();
        let y = sb.issue(add(2, 3, 0, 1)).unwrap();
        let z = sb.issue(add(3, 4, 1, 1)).unwrap();

        sb.execute(&mut units);
        units[1].finish_all();
        sb.writeback(&mut units);

        for index in [x, y, z] {
            assert_eq!(waits(&sb, index), (None, None));
        }
        assert_eq!(uids(&sb.execute(&mut units)), vec![1, 2, 3]);
    }

    #[test]
    fn freed_station_is_reused_after_writeback() {
        let mut sb = scoreboard(1, 4);
        let mut units = units();

        sb.issue(li(0, 1)).unwrap();
        assert!(sb.issue(li(1, 2)).is_err());

        sb.execute(&mut units);
        units[1].finish_all();
        sb.writeback(&mut units);
        assert!(sb.issue(li(1, 2)).is_ok());
    }

    #[test]
    fn out_of_order_completion_commits_in_program_order() {
        let mut sb = scoreboard(4, 4);
        let mut units = units();

        sb.issue(li(0, 1)).unwrap();
        sb.issue(add(1, 2, 3, 3)).unwrap();
        sb.execute(&mut units);

        // the add finishes first
        units[0].finish_all();
        sb.writeback(&mut units);
        sb.tick_sequencer();
        assert_eq!(sb.commit(), None);

        units[1].finish_all();
        sb.writeback(&mut units);
        sb.tick_sequencer();
        let committed: Vec<u64> = std::iter::from_fn(|| sb.commit()).map(|i| i.uid).collect();
        assert_eq!(committed, vec![0, 1]);
    }

    #[test]
    #[should_panic(expected = "no execution unit")]
    fn missing_unit_is_a_contract_violation() {
        let mut sb = scoreboard(2, 2);
        let mut units = vec![StubUnit::new(EUType::ALU)];
        sb.issue(Instruction::new(0, 0, Op::FAdd).with_rd(1)).unwrap();
        sb.execute(&mut units);
    }

    #[test]
    fn dump_lists_stations_and_rob() {
        let mut sb = scoreboard(2, 2);
        sb.issue(li(0, 1)).unwrap();
        let dump = sb.dump();
        assert!(dump.contains("RS 1/2"));
        assert!(dump.contains("ROB 1/2"));
        assert!(dump.contains("li $1"));
    }
}
