use crate::instructions::Register;
use crate::reorder_buffer::RobIndex;

/// Where the current value of an architectural register lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Not renamed: the value is architecturally available.
    Register(Register),
    /// Produced by the in-flight instruction holding this ROB slot.
    Rob(RobIndex),
}

#[derive(Debug, Clone)]
pub struct RegisterAliasTable {
    pub table: Vec<Option<RobIndex>>,
}
impl RegisterAliasTable {
    pub fn new(num_regs: usize) -> Self {
        Self {
            table: vec![None; num_regs],
        }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.iter().all(Option::is_none)
    }

    /// Renames `reg` to `rob_index`, replacing any older producer.
    pub fn set(&mut self, reg: Register, rob_index: RobIndex) {
        self.table[reg.index()] = Some(rob_index);
    }

    pub fn get(&self, reg: Register) -> Tag {
        self.table[reg.index()].map_or(Tag::Register(reg), Tag::Rob)
    }

    /// Drops the mapping only if `reg` is still aliased to `rob_index`; a newer rename survives.
    pub fn clear_if_match(&mut self, reg: Register, rob_index: RobIndex) -> bool {
        let slot = &mut self.table[reg.index()];
        if *slot == Some(rob_index) {
            *slot = None;
            true
        } else {
            false
        }
    }
}
