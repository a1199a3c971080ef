//! Process listing for the console

use super::{Kernel, Pid, Proc, ProcName, ProcState, SchedPolicy};
use crate::platform::{Platform, Resources};
use alloc::vec::Vec;
use core::fmt;

/// Copy of the externally visible fields of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcInfo {
    pub pid: Pid,
    pub name: ProcName,
    pub state: ProcState,
    pub policy: SchedPolicy,
    pub execution_time: u32,
    pub deadline: u32,
    pub rate: u32,
    pub priority: u32,
    pub elapsed_time: u32,
    pub arrival_time: u64,
    pub killed: bool,
}

impl From<&Proc> for ProcInfo {
    fn from(p: &Proc) -> Self {
        Self {
            pid: p.pid,
            name: p.name,
            state: p.state,
            policy: p.policy,
            execution_time: p.execution_time,
            deadline: p.deadline,
            rate: p.rate,
            priority: p.priority,
            elapsed_time: p.elapsed_time,
            arrival_time: p.arrival_time,
            killed: p.killed,
        }
    }
}

impl fmt::Display for ProcInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pid {} [{}] {} policy {} exec {} deadline {} rate {} prio {} elapsed {}",
            self.pid,
            self.state.label(),
            self.name,
            self.policy.raw(),
            self.execution_time,
            self.deadline,
            self.rate,
            self.priority,
            self.elapsed_time
        )
    }
}

impl<P: Platform, R: Resources> Kernel<P, R> {
    /// List the sleeping, runnable and running processes and log them
    pub fn printinfo(&self) -> Vec<ProcInfo> {
        let listed: Vec<ProcInfo> = {
            let table = self.lock_table();
            table
                .procs()
                .iter()
                .filter(|p| {
                    matches!(
                        p.state,
                        ProcState::Sleeping | ProcState::Runnable | ProcState::Running
                    )
                })
                .map(ProcInfo::from)
                .collect()
        };
        for info in &listed {
            log::info!("{}", info);
        }
        listed
    }

    /// Debug dump of every live slot, for a console key binding.
    ///
    /// Skips the listing instead of spinning when the table lock is busy.
    pub fn procdump(&self) -> usize {
        let Some(table) = self.table().try_lock(self.cpus(), self.platform()) else {
            log::warn!("procdump: table busy");
            return 0;
        };
        let mut count = 0;
        for p in table.procs().iter().filter(|p| p.state != ProcState::Unused) {
            log::info!("{} {} {}", p.pid, p.state.label(), p.name);
            count += 1;
        }
        count
    }
}
