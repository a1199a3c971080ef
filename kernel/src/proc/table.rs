//! Process table
//!
//! Fixed array of PCBs plus the admission accumulators. Every method assumes
//! the caller holds the table lock (the table is only reachable through the
//! `SpinLock` guard).

use super::pcb::{Channel, Pid, Proc, ProcState, SchedPolicy, SlotRef};
use crate::error::{ProcError, ProcResult};
use crate::param::NPROC;

pub struct ProcTable {
    procs: [Proc; NPROC],
    next_pid: u32,
    root: Option<SlotRef>,
    /// Accepted EDF utilization, in hundredths
    pub(crate) edf_util: u32,
    /// Accepted RM utilization, in thousandths
    pub(crate) rm_util: u32,
}

impl ProcTable {
    pub fn new() -> Self {
        Self {
            procs: core::array::from_fn(|_| Proc::default()),
            next_pid: 1,
            root: None,
            edf_util: 0,
            rm_util: 0,
        }
    }

    /// Claim the first unused slot and give it the next pid.
    ///
    /// The slot is left `Embryo`; the caller makes it runnable once set up.
    pub fn alloc(&mut self) -> ProcResult<usize> {
        let index = self
            .procs
            .iter()
            .position(|p| p.state == ProcState::Unused)
            .ok_or(ProcError::ResourceExhausted { capacity: NPROC })?;

        let pid = Pid::new(self.next_pid);
        self.next_pid += 1;
        self.procs[index].reset(pid);
        log::debug!("proc: slot {} allocated to pid {}", index, pid);
        Ok(index)
    }

    /// Return a reaped slot to the pool
    pub fn free(&mut self, index: usize) {
        let generation = self.procs[index].generation;
        self.procs[index] = Proc {
            generation,
            ..Proc::default()
        };
    }

    pub fn get(&self, index: usize) -> &Proc {
        &self.procs[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Proc {
        &mut self.procs[index]
    }

    /// Snapshot view used by the selection function
    pub fn procs(&self) -> &[Proc] {
        &self.procs
    }

    /// Slot of the live process carrying `pid`
    pub fn find(&self, pid: Pid) -> ProcResult<usize> {
        self.procs
            .iter()
            .position(|p| p.state != ProcState::Unused && p.pid == pid)
            .ok_or(ProcError::NotFound { pid })
    }

    pub fn slot_ref(&self, index: usize) -> SlotRef {
        SlotRef {
            index,
            generation: self.procs[index].generation,
        }
    }

    /// Slot index if the reference still names the same process
    pub fn resolve(&self, slot: SlotRef) -> Option<usize> {
        let p = self.procs.get(slot.index)?;
        (p.state != ProcState::Unused && p.generation == slot.generation).then_some(slot.index)
    }

    pub fn root(&self) -> Option<SlotRef> {
        self.root
    }

    pub(crate) fn set_root(&mut self, slot: SlotRef) {
        self.root = Some(slot);
    }

    /// Wake every process sleeping on `chan`; returns how many woke
    pub fn wakeup(&mut self, chan: Channel) -> usize {
        let mut woken = 0;
        for p in self.procs.iter_mut() {
            if p.state == ProcState::Sleeping && p.chan == Some(chan) {
                p.state = ProcState::Runnable;
                woken += 1;
            }
        }
        woken
    }

    /// Wake the parent of `index`, if it is still alive
    pub(crate) fn wake_parent(&mut self, index: usize) {
        if let Some(parent) = self.procs[index].parent {
            if self.resolve(parent).is_some() {
                self.wakeup(Channel::Proc(parent));
            }
        }
    }

    /// Hand the children of `from` over to the root process.
    ///
    /// Returns true if one of them is already a zombie, in which case the
    /// root must be woken to reap it.
    pub(crate) fn reparent(&mut self, from: SlotRef) -> bool {
        let root = self.root;
        let mut zombie = false;
        for p in self.procs.iter_mut() {
            if p.state != ProcState::Unused && p.parent == Some(from) {
                p.parent = root;
                zombie |= p.state == ProcState::Zombie;
            }
        }
        zombie
    }

    /// Give back the utilization committed when `index` was admitted
    pub(crate) fn release_admission(&mut self, index: usize) {
        let p = &mut self.procs[index];
        let share = core::mem::take(&mut p.admitted_util);
        match p.policy {
            SchedPolicy::Edf => self.edf_util = self.edf_util.saturating_sub(share),
            SchedPolicy::Rm => self.rm_util = self.rm_util.saturating_sub(share),
            SchedPolicy::Unset => {}
        }
        if share > 0 {
            log::debug!(
                "admission: pid {} released {} ({})",
                p.pid,
                share,
                p.policy
            );
        }
    }

    /// Number of live children of `parent`
    pub fn children(&self, parent: SlotRef) -> usize {
        self.procs
            .iter()
            .filter(|p| p.state != ProcState::Unused && p.parent == Some(parent))
            .count()
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new()
    }
}
