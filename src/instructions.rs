use core::fmt::{self, Display};

use crate::execution_units::EUType;

/// Number of architectural registers in the default register file.
pub const NUM_REGS: usize = 32;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Register(pub usize);
impl Register {
    pub fn index(&self) -> usize {
        self.0
    }
}
impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

#[derive(Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum Op {
    NoOp,
    Exit,
    LoadImmediate,
    LoadMemory,
    StoreMemory,
    Add,
    AddImmediate,
    Subtract,
    SubtractImmediate,
    Multiply,
    Divide,
    Compare,
    BitAnd,
    BitAndImmediate,
    BitOr,
    BitOrImmediate,
    LeftShift,
    RightShift,
    BranchEqual,
    BranchNotEqual,
    BranchGreater,
    BranchGreaterEqual,
    BranchLess,
    BranchLessEqual,
    Jump,
    JumpRegister,
    FAdd,
    FSubtract,
    FMultiply,
    FDivide,
    FCompare,
}
impl Op {
    pub fn needs_eu_type(&self) -> EUType {
        match self {
            Op::NoOp | Op::Exit => EUType::System,
            Op::LoadImmediate | Op::LoadMemory | Op::StoreMemory => EUType::Memory,
            Op::FAdd | Op::FSubtract | Op::FMultiply | Op::FDivide | Op::FCompare => EUType::FPU,
            _ if self.is_branch() => EUType::Branch,
            _ => EUType::ALU,
        }
    }

    /// Execution latency in cycles once the unit has accepted the instruction.
    pub fn cycles_needed(&self) -> usize {
        match self {
            Op::Multiply => 3,
            Op::Divide => 10,
            Op::LoadMemory | Op::StoreMemory => 2,
            Op::FAdd | Op::FSubtract | Op::FCompare => 4,
            Op::FMultiply => 5,
            Op::FDivide => 12,
            _ => 1,
        }
    }

    pub fn is_predictable_branch(&self) -> bool {
        matches!(
            self,
            Op::BranchEqual
                | Op::BranchNotEqual
                | Op::BranchGreater
                | Op::BranchGreaterEqual
                | Op::BranchLess
                | Op::BranchLessEqual
        )
    }

    pub fn is_branch(&self) -> bool {
        match self {
            Op::JumpRegister | Op::Jump => true,
            _ => self.is_predictable_branch(),
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::NoOp => "nop",
            Op::Exit => "exit",
            Op::LoadImmediate => "li",
            Op::LoadMemory => "lw",
            Op::StoreMemory => "sw",
            Op::Add => "add",
            Op::AddImmediate => "addi",
            Op::Subtract => "sub",
            Op::SubtractImmediate => "subi",
            Op::Multiply => "mult",
            Op::Divide => "div",
            Op::Compare => "cmp",
            Op::BitAnd => "and",
            Op::BitAndImmediate => "andi",
            Op::BitOr => "or",
            Op::BitOrImmediate => "ori",
            Op::LeftShift => "lsft",
            Op::RightShift => "rsft",
            Op::BranchEqual => "be",
            Op::BranchNotEqual => "bne",
            Op::BranchGreater => "bg",
            Op::BranchGreaterEqual => "bge",
            Op::BranchLess => "bl",
            Op::BranchLessEqual => "ble",
            Op::Jump => "j",
            Op::JumpRegister => "jr",
            Op::FAdd => "fadd",
            Op::FSubtract => "fsub",
            Op::FMultiply => "fmult",
            Op::FDivide => "fdiv",
            Op::FCompare => "fcmp",
        }
    }
}

/// One dynamic instruction of the trace. `uid` is its position in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub uid: u64,
    pub pc: usize,
    pub op: Op,
    pub rd: Option<Register>,
    pub rs1: Option<Register>,
    pub rs2: Option<Register>,
}
impl Instruction {
    pub fn new(uid: u64, pc: usize, op: Op) -> Self {
        Instruction {
            uid,
            pc,
            op,
            rd: None,
            rs1: None,
            rs2: None,
        }
    }

    /// Register 0 is hardwired, so writing it never creates a producer.
    pub fn with_rd(mut self, rd: usize) -> Self {
        self.rd = (rd != 0).then_some(Register(rd));
        self
    }

    pub fn with_rs1(mut self, rs1: usize) -> Self {
        self.rs1 = Some(Register(rs1));
        self
    }

    pub fn with_rs2(mut self, rs2: usize) -> Self {
        self.rs2 = Some(Register(rs2));
        self
    }

    pub fn writes_back(&self) -> bool {
        self.rd.is_some()
    }

    pub fn eu_type(&self) -> EUType {
        self.op.needs_eu_type()
    }
}
impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} {:#x} {}", self.uid, self.pc, self.op.mnemonic())?;
        for reg in [self.rd, self.rs1, self.rs2].iter().flatten() {
            write!(f, " {}", reg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writing_register_zero_is_not_a_writeback() {
        let inst = Instruction::new(0, 0, Op::Add).with_rd(0).with_rs1(1);
        assert!(!inst.writes_back());
        assert_eq!(inst.rs1, Some(Register(1)));
    }

    #[test]
    fn ops_route_to_their_units() {
        assert_eq!(Op::Add.needs_eu_type(), EUType::ALU);
        assert_eq!(Op::LoadMemory.needs_eu_type(), EUType::Memory);
        assert_eq!(Op::BranchLess.needs_eu_type(), EUType::Branch);
        assert_eq!(Op::JumpRegister.needs_eu_type(), EUType::Branch);
        assert_eq!(Op::FDivide.needs_eu_type(), EUType::FPU);
        assert_eq!(Op::Exit.needs_eu_type(), EUType::System);
    }

    #[test]
    fn display_lists_registers() {
        let inst = Instruction::new(3, 0x10, Op::Add)
            .with_rd(3)
            .with_rs1(1)
            .with_rs2(2);
        assert_eq!(inst.to_string(), "#3 0x10 add $3 $1 $2");
    }
}
