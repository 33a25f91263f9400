use crate::{reorder_buffer::RobIndex, reservation_station::RsIndex};

/// Maps a ROB slot to the reservation station currently producing its value.
///
/// A slot has a mapping from issue until its execution unit reports completion.
/// After that the value lives in the ROB and dependants treat it as available.
#[derive(Debug, Clone)]
pub struct ReservationStationTable {
    table: Vec<Option<RsIndex>>,
}
impl ReservationStationTable {
    pub fn new(rob_size: usize) -> Self {
        Self {
            table: vec![None; rob_size],
        }
    }

    pub fn get(&self, rob_index: RobIndex) -> Option<RsIndex> {
        self.table[rob_index.0]
    }

    pub fn set(&mut self, rob_index: RobIndex, rs_index: RsIndex) {
        let slot = &mut self.table[rob_index.0];
        assert!(
            slot.is_none(),
            "rob{} is still tracked by {:?}",
            rob_index.0,
            slot
        );
        *slot = Some(rs_index);
    }

    pub fn clear(&mut self, rob_index: RobIndex) -> Option<RsIndex> {
        self.table[rob_index.0].take()
    }

    pub fn is_empty(&self) -> bool {
        self.table.iter().all(Option::is_none)
    }
}
