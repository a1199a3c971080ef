//! Per-CPU state
//!
//! Each CPU records the process it is running and the depth of
//! interrupt-disabling locks it holds. Only the owning CPU touches its entry,
//! with interrupts disabled, so relaxed atomics are enough.

use crate::param::NCPU;
use crate::platform::{CpuId, Platform};
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

const NO_PROC: usize = 0;

pub struct Cpu {
    /// Slot index + 1 of the running process, 0 when idle
    current: AtomicUsize,
    /// Depth of push_off nesting
    noff: AtomicU32,
    /// Were interrupts enabled before the outermost push_off?
    intena: AtomicBool,
}

impl Cpu {
    pub const fn new() -> Self {
        Self {
            current: AtomicUsize::new(NO_PROC),
            noff: AtomicU32::new(0),
            intena: AtomicBool::new(false),
        }
    }

    pub fn current(&self) -> Option<usize> {
        match self.current.load(Ordering::Relaxed) {
            NO_PROC => None,
            n => Some(n - 1),
        }
    }

    pub fn set_current(&self, slot: Option<usize>) {
        let raw = slot.map_or(NO_PROC, |index| index + 1);
        self.current.store(raw, Ordering::Relaxed);
    }

    pub fn noff(&self) -> u32 {
        self.noff.load(Ordering::Relaxed)
    }

    pub fn intena(&self) -> bool {
        self.intena.load(Ordering::Relaxed)
    }

    pub fn set_intena(&self, enabled: bool) {
        self.intena.store(enabled, Ordering::Relaxed);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

/// The CPUs brought up at boot
pub struct Cpus {
    cpus: [Cpu; NCPU],
    ncpu: usize,
}

impl Cpus {
    pub fn new(ncpu: usize) -> Self {
        kassert!(ncpu >= 1 && ncpu <= NCPU, "bad cpu count");
        Self {
            cpus: core::array::from_fn(|_| Cpu::new()),
            ncpu,
        }
    }

    /// Number of CPUs brought up
    pub fn count(&self) -> usize {
        self.ncpu
    }

    pub fn get(&self, id: CpuId) -> &Cpu {
        kassert!(id < self.ncpu, "cpu id out of range");
        &self.cpus[id]
    }

    /// Disable interrupts and bump the nesting depth of the executing CPU.
    ///
    /// Returns the CPU id, which stays valid until the matching `pop_off`.
    pub fn push_off(&self, platform: &dyn Platform) -> CpuId {
        let old = platform.intr_get();
        platform.intr_off();
        let id = platform.cpu_id();
        let cpu = self.get(id);
        if cpu.noff.load(Ordering::Relaxed) == 0 {
            cpu.intena.store(old, Ordering::Relaxed);
        }
        cpu.noff.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Undo one `push_off`; the outermost one restores the interrupt flag.
    pub fn pop_off(&self, platform: &dyn Platform, id: CpuId) {
        let cpu = self.get(id);
        let depth = cpu.noff.load(Ordering::Relaxed);
        kassert!(depth >= 1, "pop_off without push_off");
        cpu.noff.store(depth - 1, Ordering::Relaxed);
        if depth == 1 && cpu.intena.load(Ordering::Relaxed) {
            platform.intr_on();
        }
    }
}
