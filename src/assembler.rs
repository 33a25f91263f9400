//! Reads a dynamic instruction trace written in the simulator's assembly syntax.
//!
//! One executed instruction per line, registers written `$N`, `//` starts a
//! comment. A line may be prefixed with its pc, e.g. `0x1c: add $3 $1 $2`;
//! otherwise the pc is the instruction's position in the trace. Operands may
//! be separated by spaces or commas.

use std::{fs, path::Path};

use regex::Regex;

use crate::error::{SimError, SimResult};
use crate::instructions::{Instruction, Op};

pub fn assemble_file(filename: impl AsRef<Path>) -> SimResult<Vec<Instruction>> {
    let path = filename.as_ref();
    let file_content =
        fs::read_to_string(path).map_err(|e| SimError::TraceRead(path.to_path_buf(), e))?;
    assemble(&file_content)
}

fn preprocessor(line: &str) -> &str {
    line.split("//").next().unwrap_or_default().trim()
}

pub fn assemble(trace: &str) -> SimResult<Vec<Instruction>> {
    let line_re = Regex::new(r"^(?:(0x[0-9a-fA-F]+|\d+):\s*)?([a-z]+)\b(.*)$")
        .map_err(|e| SimError::Config(e.to_string()))?;
    let reg_re = Regex::new(r"^\$(\d+)$").map_err(|e| SimError::Config(e.to_string()))?;

    let mut instructions = Vec::new();

    for (number, raw) in trace.lines().enumerate() {
        let line = preprocessor(raw);
        if line.is_empty() {
            continue;
        }

        let parser = LineParser {
            line: number + 1,
            reg_re: &reg_re,
        };
        let captures = line_re
            .captures(line)
            .ok_or_else(|| parser.error(format!("cannot parse '{}'", line)))?;

        let uid = instructions.len() as u64;
        let pc = match captures.get(1) {
            Some(pc) => parser.address(pc.as_str())?,
            None => instructions.len(),
        };
        let mnemonic = &captures[2];
        let args: Vec<&str> = captures[3]
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|arg| !arg.is_empty())
            .collect();

        instructions.push(parser.instruction(uid, pc, mnemonic, &args)?);
    }

    Ok(instructions)
}

struct LineParser<'a> {
    line: usize,
    reg_re: &'a Regex,
}
impl LineParser<'_> {
    fn error(&self, message: String) -> SimError {
        SimError::Parse {
            line: self.line,
            message,
        }
    }

    fn address(&self, text: &str) -> SimResult<usize> {
        let parsed = match text.strip_prefix("0x") {
            Some(hex) => usize::from_str_radix(hex, 16),
            None => text.parse(),
        };
        parsed.map_err(|e| self.error(format!("bad pc '{}': {}", text, e)))
    }

    fn reg(&self, arg: &str) -> SimResult<usize> {
        self.reg_re
            .captures(arg)
            .and_then(|c| c[1].parse().ok())
            .ok_or_else(|| self.error(format!("expected a register, found '{}'", arg)))
    }

    fn imm(&self, arg: &str) -> SimResult<i64> {
        let (negative, digits) = match arg.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, arg),
        };
        let parsed = match digits.strip_prefix("0x") {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => digits.parse(),
        };
        parsed
            .map(|v| if negative { -v } else { v })
            .map_err(|_| self.error(format!("expected an immediate, found '{}'", arg)))
    }

    fn arity(&self, mnemonic: &str, args: &[&str], expected: usize) -> SimResult<()> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(self.error(format!(
                "'{}' takes {} operand(s), found {}",
                mnemonic,
                expected,
                args.len()
            )))
        }
    }

    fn instruction(
        &self,
        uid: u64,
        pc: usize,
        mnemonic: &str,
        args: &[&str],
    ) -> SimResult<Instruction> {
        let op = match mnemonic {
            "nop" => Op::NoOp,
            "exit" => Op::Exit,
            "li" => Op::LoadImmediate,
            "lw" => Op::LoadMemory,
            "sw" => Op::StoreMemory,
            "add" => Op::Add,
            "addi" => Op::AddImmediate,
            "sub" => Op::Subtract,
            "subi" => Op::SubtractImmediate,
            "mult" => Op::Multiply,
            "div" => Op::Divide,
            "cmp" => Op::Compare,
            "and" => Op::BitAnd,
            "andi" => Op::BitAndImmediate,
            "or" => Op::BitOr,
            "ori" => Op::BitOrImmediate,
            "lsft" => Op::LeftShift,
            "rsft" => Op::RightShift,
            "be" => Op::BranchEqual,
            "bne" => Op::BranchNotEqual,
            "bg" => Op::BranchGreater,
            "bge" => Op::BranchGreaterEqual,
            "bl" => Op::BranchLess,
            "ble" => Op::BranchLessEqual,
            "j" => Op::Jump,
            "jr" => Op::JumpRegister,
            "fadd" => Op::FAdd,
            "fsub" => Op::FSubtract,
            "fmult" => Op::FMultiply,
            "fdiv" => Op::FDivide,
            "fcmp" => Op::FCompare,
            _ => return Err(self.error(format!("unknown instruction '{}'", mnemonic))),
        };
        let inst = Instruction::new(uid, pc, op);

        Ok(match op {
            Op::NoOp | Op::Exit => {
                self.arity(mnemonic, args, 0)?;
                inst
            }
            Op::LoadImmediate => {
                self.arity(mnemonic, args, 2)?;
                self.imm(args[1])?;
                inst.with_rd(self.reg(args[0])?)
            }
            // destination, base register, offset
            Op::LoadMemory
            | Op::AddImmediate
            | Op::SubtractImmediate
            | Op::BitAndImmediate
            | Op::BitOrImmediate
            | Op::LeftShift
            | Op::RightShift => {
                self.arity(mnemonic, args, 3)?;
                self.imm(args[2])?;
                inst.with_rd(self.reg(args[0])?)
                    .with_rs1(self.reg(args[1])?)
            }
            // stores and branches read both registers and write none
            Op::StoreMemory
            | Op::BranchEqual
            | Op::BranchNotEqual
            | Op::BranchGreater
            | Op::BranchGreaterEqual
            | Op::BranchLess
            | Op::BranchLessEqual => {
                self.arity(mnemonic, args, 3)?;
                self.imm(args[2])?;
                inst.with_rs1(self.reg(args[0])?)
                    .with_rs2(self.reg(args[1])?)
            }
            Op::Jump => {
                self.arity(mnemonic, args, 1)?;
                self.imm(args[0])?;
                inst
            }
            Op::JumpRegister => {
                self.arity(mnemonic, args, 1)?;
                inst.with_rs1(self.reg(args[0])?)
            }
            Op::Add
            | Op::Subtract
            | Op::Multiply
            | Op::Divide
            | Op::Compare
            | Op::BitAnd
            | Op::BitOr
            | Op::FAdd
            | Op::FSubtract
            | Op::FMultiply
            | Op::FDivide
            | Op::FCompare => {
                self.arity(mnemonic, args, 3)?;
                inst.with_rd(self.reg(args[0])?)
                    .with_rs1(self.reg(args[1])?)
                    .with_rs2(self.reg(args[2])?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::instructions::Register;

    #[test]
    fn parses_a_small_trace() {
        let trace = "
            // load two values and add them
            li $1 100
            li $2, 200
            add $3 $1 $2   // sum
            sw $3 $0 8
        ";
        let insts = assemble(trace).unwrap();

        assert_eq!(insts.len(), 4);
        assert_eq!(
            insts.iter().map(|i| i.uid).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(insts[1].rd, Some(Register(2)));
        assert_eq!(insts[2].op, Op::Add);
        assert_eq!(
            (insts[2].rd, insts[2].rs1, insts[2].rs2),
            (Some(Register(3)), Some(Register(1)), Some(Register(2)))
        );
        assert_eq!(insts[3].rd, None);
        assert_eq!(
            (insts[3].rs1, insts[3].rs2),
            (Some(Register(3)), Some(Register(0)))
        );
    }

    #[test]
    fn explicit_pc_prefix() {
        let insts = assemble("0x40: addi $1 $1 -4\n17: nop").unwrap();
        assert_eq!(insts[0].pc, 0x40);
        assert_eq!(insts[1].pc, 17);
        assert_eq!(insts[1].uid, 1);
    }

    #[test]
    fn writes_to_register_zero_are_dropped() {
        let insts = assemble("add $0 $1 $2").unwrap();
        assert!(!insts[0].writes_back());
    }

    #[rstest]
    #[case::unknown_mnemonic("nop\nfrob $1", 2)]
    #[case::bad_register("add $1 r2 $3", 1)]
    #[case::bad_immediate("li $1 lots", 1)]
    #[case::wrong_arity("\n\njr $1 $2", 3)]
    #[case::garbage("$1 add", 1)]
    fn errors_carry_the_line(#[case] trace: &str, #[case] expected_line: usize) {
        match assemble(trace) {
            Err(SimError::Parse { line, .. }) => assert_eq!(line, expected_line),
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            assemble_file("/nonexistent/trace.s"),
            Err(SimError::TraceRead(_, _))
        ));
    }
}
