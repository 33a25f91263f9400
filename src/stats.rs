use core::fmt::{self, Display};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsTracker {
    pub cycles: u64,
    pub instructions_issued: u64,
    pub instructions_dispatched: u64,
    pub instructions_completed: u64,
    pub instructions_committed: u64,
    pub issue_stalls: u64,
}
impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.instructions_committed as f64 / self.cycles as f64
        }
    }
}
impl Display for StatsTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Program stats:")?;
        writeln!(f, " - Cycles: {}", self.cycles)?;
        writeln!(f, " - Instructions Issued: {}", self.instructions_issued)?;
        writeln!(
            f,
            " - Instructions Dispatched: {}",
            self.instructions_dispatched
        )?;
        writeln!(
            f,
            " - Instructions Completed: {}",
            self.instructions_completed
        )?;
        writeln!(
            f,
            " - Instructions Committed: {}",
            self.instructions_committed
        )?;
        writeln!(f, " - Issue Stalls: {}", self.issue_stalls)?;
        writeln!(f, " - IPC: {:.2}", self.ipc())
    }
}
