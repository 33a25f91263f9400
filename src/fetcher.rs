use std::collections::VecDeque;

use crate::instructions::Instruction;

/// Holds the part of the dynamic instruction stream that has not issued yet.
///
/// The oldest instruction is only taken once it has been admitted, so a stalled
/// instruction is presented again on the next cycle.
#[derive(Debug, Default)]
pub struct Fetcher {
    pub buffer: VecDeque<Instruction>,
}
impl Fetcher {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            buffer: instructions.into(),
        }
    }

    pub fn get_oldest(&self) -> Option<&Instruction> {
        self.buffer.front()
    }

    pub fn take_oldest(&mut self) -> Option<Instruction> {
        self.buffer.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::Op;

    #[test]
    fn peeking_does_not_consume() {
        let mut fetcher = Fetcher::new(vec![
            Instruction::new(0, 0, Op::NoOp),
            Instruction::new(1, 4, Op::NoOp),
        ]);

        assert_eq!(fetcher.get_oldest().map(|i| i.uid), Some(0));
        assert_eq!(fetcher.get_oldest().map(|i| i.uid), Some(0));
        assert_eq!(fetcher.take_oldest().map(|i| i.uid), Some(0));
        assert_eq!(fetcher.get_oldest().map(|i| i.uid), Some(1));
        fetcher.take_oldest();
        assert!(fetcher.is_empty());
    }
}
