//! Tick clock
//!
//! The timer interrupt bumps a monotonic tick counter and wakes the
//! processes sleeping on it. Admission reads the counter without the tick
//! lock; sleepers hold the tick lock while checking it.

use crate::error::{ProcError, ProcResult};
use crate::platform::{Platform, Resources};
use crate::proc::{Channel, Kernel};
use crate::sync::SpinLock;
use core::sync::atomic::{AtomicU64, Ordering};

pub struct Clock {
    ticks: AtomicU64,
    lock: SpinLock<()>,
}

impl Clock {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            lock: SpinLock::new("time", ()),
        }
    }

    /// Ticks since boot
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Platform, R: Resources> Kernel<P, R> {
    /// Timer interrupt, taken by one CPU only
    pub fn clock_tick(&self) {
        let _guard = self.clock().lock.lock(self.cpus(), self.platform());
        self.clock().ticks.fetch_add(1, Ordering::AcqRel);
        self.wakeup(Channel::Ticks);
    }

    /// Sleep for `n` ticks. Fails if the caller is killed meanwhile.
    pub fn sleep_ticks(&self, n: u32) -> ProcResult<()> {
        let mut guard = self.clock().lock.lock(self.cpus(), self.platform());
        let start = self.clock().ticks();
        while self.clock().ticks() - start < u64::from(n) {
            if self.killed() {
                return Err(ProcError::Killed);
            }
            guard = self.sleep(Channel::Ticks, guard);
        }
        drop(guard);
        Ok(())
    }

    pub fn uptime(&self) -> u64 {
        let _guard = self.clock().lock.lock(self.cpus(), self.platform());
        self.clock().ticks()
    }
}
