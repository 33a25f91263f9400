use core::fmt::{self, Display};

use crate::{instructions::Instruction, reorder_buffer::RobIndex};

/// Stable address of a slot in the reservation station arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RsIndex(pub usize);
impl Display for RsIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rs{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsEntry {
    pub inst: Instruction,
    pub rob_index: RobIndex,
    pub running: bool,
    /// Reservation station producing the first operand, `None` once available.
    pub src1_wait: Option<RsIndex>,
    pub src2_wait: Option<RsIndex>,
}
impl RsEntry {
    pub fn is_ready(&self) -> bool {
        self.src1_wait.is_none() && self.src2_wait.is_none()
    }
}

/// Fixed-capacity arena of pending instructions. A `None` slot is free.
#[derive(Debug, Clone)]
pub struct ReservationStations {
    slots: Vec<Option<RsEntry>>,
    occupied: usize,
}
impl ReservationStations {
    pub fn new(capacity: usize) -> Self {
        ReservationStations {
            slots: vec![None; capacity],
            occupied: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.occupied
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Places a new entry in the lowest free slot.
    pub fn push(
        &mut self,
        inst: Instruction,
        rob_index: RobIndex,
        src1_wait: Option<RsIndex>,
        src2_wait: Option<RsIndex>,
    ) -> RsIndex {
        for wait in [src1_wait, src2_wait].into_iter().flatten() {
            assert!(
                self.get(wait).is_some(),
                "operand waits on free reservation station {}",
                wait
            );
        }

        let Some(free) = self.slots.iter().position(Option::is_none) else {
            panic!("Tried to add instruction to rs but doesn't have capacity!");
        };

        self.slots[free] = Some(RsEntry {
            inst,
            rob_index,
            running: false,
            src1_wait,
            src2_wait,
        });
        self.occupied += 1;

        RsIndex(free)
    }

    pub fn remove(&mut self, index: RsIndex) -> RsEntry {
        let entry = self.slots[index.0]
            .take()
            .unwrap_or_else(|| panic!("Tried to free {} which is not allocated!", index));
        self.occupied -= 1;
        entry
    }

    pub fn get(&self, index: RsIndex) -> Option<&RsEntry> {
        self.slots.get(index.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: RsIndex) -> Option<&mut RsEntry> {
        self.slots.get_mut(index.0).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RsIndex, &RsEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|entry| (RsIndex(i), entry)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (RsIndex, &mut RsEntry)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|entry| (RsIndex(i), entry)))
    }

    /// Clears every operand wait naming `producer`. Returns how many waits were cleared.
    pub fn broadcast(&mut self, producer: RsIndex) -> usize {
        let mut woken = 0;

        for (_, entry) in self.iter_mut() {
            if entry.src1_wait == Some(producer) {
                entry.src1_wait = None;
                woken += 1;
            }
            if entry.src2_wait == Some(producer) {
                entry.src2_wait = None;
                woken += 1;
            }
        }

        woken
    }
}
impl Display for ReservationStations {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn wait(w: Option<RsIndex>) -> String {
            w.map_or_else(|| "-".to_string(), |rs| rs.to_string())
        }

        writeln!(f, "RS {}/{}", self.occupied, self.capacity())?;
        for (index, entry) in self.iter() {
            writeln!(
                f,
                "    {} {} rob{} running={} src1={} src2={}",
                index,
                entry.inst,
                entry.rob_index.0,
                entry.running,
                wait(entry.src1_wait),
                wait(entry.src2_wait)
            )?;
        }
        Ok(())
    }
}
