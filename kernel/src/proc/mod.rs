//! Process management
//!
//! [`Kernel`] owns the process table behind a single spinlock, the per-CPU
//! state and the tick clock. It is built once at boot and shared by every
//! CPU; all entry points take `&self`.

pub mod dump;
pub mod lifecycle;
pub mod pcb;
pub mod sleep;
pub mod table;

pub use dump::ProcInfo;
pub use pcb::{Channel, Pid, Proc, ProcName, ProcState, SchedPolicy, SlotRef};
pub use table::ProcTable;

use crate::config::KernelConfig;
use crate::error::{ProcError, ProcResult};
use crate::platform::{CpuId, NoResources, Platform, Resources};
use crate::sync::{Cpus, SpinLock, SpinLockGuard};
use crate::time::Clock;

pub struct Kernel<P: Platform, R: Resources = NoResources> {
    table: SpinLock<ProcTable>,
    cpus: Cpus,
    clock: Clock,
    platform: P,
    resources: R,
}

impl<P: Platform, R: Resources> Kernel<P, R> {
    /// Build the kernel object. An invalid configuration is fatal.
    pub fn new(config: KernelConfig, platform: P, resources: R) -> Self {
        if let Err(reason) = config.validate() {
            panic!("[PROC FATAL] invalid configuration: {}", reason);
        }
        log::set_max_level(config.log_level);
        let cpus = Cpus::new(config.ncpu);
        log::info!("proc: process table ready ({} cpus)", cpus.count());
        Self {
            table: SpinLock::new("ptable", ProcTable::new()),
            cpus,
            clock: Clock::new(),
            platform,
            resources,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn resources(&self) -> &R {
        &self.resources
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn cpus(&self) -> &Cpus {
        &self.cpus
    }

    pub(crate) fn table(&self) -> &SpinLock<ProcTable> {
        &self.table
    }

    pub(crate) fn lock_table(&self) -> SpinLockGuard<'_, ProcTable> {
        self.table.lock(&self.cpus, &self.platform)
    }

    /// Id of the executing CPU
    pub fn my_cpu(&self) -> CpuId {
        self.platform.cpu_id()
    }

    /// Slot of the process running on this CPU, if any
    pub fn current_slot(&self) -> Option<usize> {
        let id = self.cpus.push_off(&self.platform);
        let current = self.cpus.get(id).current();
        self.cpus.pop_off(&self.platform, id);
        current
    }

    /// Slot of the calling process. Calling from a scheduler context is fatal.
    pub(crate) fn my_slot(&self) -> usize {
        match self.current_slot() {
            Some(slot) => slot,
            None => panic!("[PROC FATAL] no current process"),
        }
    }

    /// Slot of the live process carrying `pid`
    pub fn slot_of(&self, pid: Pid) -> ProcResult<usize> {
        self.lock_table().find(pid)
    }

    /// Copy of the process carrying `pid`
    pub fn inspect(&self, pid: Pid) -> Option<ProcInfo> {
        let table = self.lock_table();
        let index = table.find(pid).ok()?;
        Some(ProcInfo::from(table.get(index)))
    }

    /// State of `pid`, or `NotFound` once the slot has been reaped
    pub fn state_of(&self, pid: Pid) -> ProcResult<ProcState> {
        let table = self.lock_table();
        let index = table.find(pid)?;
        Ok(table.get(index).state)
    }

    /// Pid of the root process, once `user_init` has run
    pub fn root_pid(&self) -> ProcResult<Pid> {
        let table = self.lock_table();
        table
            .root()
            .and_then(|root| table.resolve(root))
            .map(|index| table.get(index).pid)
            .ok_or(ProcError::NotFound { pid: Pid::new(1) })
    }
}
