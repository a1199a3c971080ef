//! Sleep and wakeup
//!
//! A sleeper always takes the table lock before letting go of the lock that
//! protects its condition, and `wakeup` needs the table lock too, so a
//! wakeup issued between the condition check and the sleep cannot be lost.

use super::{Channel, Kernel, ProcState, ProcTable};
use crate::platform::{Platform, Resources};
use crate::sync::SpinLockGuard;

impl<P: Platform, R: Resources> Kernel<P, R> {
    /// Atomically release `held` and sleep on `chan`.
    ///
    /// `held` is reacquired before returning. It must not be the table lock;
    /// use the table-held variant for that.
    pub fn sleep<'a, T>(&'a self, chan: Channel, held: SpinLockGuard<'a, T>) -> SpinLockGuard<'a, T> {
        let lock = held.spinlock();
        let table = self.lock_table();
        drop(held);

        let table = self.sleep_locked(table, chan);

        drop(table);
        lock.lock(self.cpus(), self.platform())
    }

    /// Sleep on `chan` with the table lock already held
    pub(crate) fn sleep_locked<'a>(
        &'a self,
        mut table: SpinLockGuard<'a, ProcTable>,
        chan: Channel,
    ) -> SpinLockGuard<'a, ProcTable> {
        let slot = self.my_slot();
        let p = table.get_mut(slot);
        p.chan = Some(chan);
        p.state = ProcState::Sleeping;

        let mut table = self.sched(table);

        table.get_mut(slot).chan = None;
        table
    }

    /// Wake every process sleeping on `chan`
    pub fn wakeup(&self, chan: Channel) {
        let woken = self.lock_table().wakeup(chan);
        if woken > 0 {
            log::trace!("proc: woke {} on {:?}", woken, chan);
        }
    }
}
