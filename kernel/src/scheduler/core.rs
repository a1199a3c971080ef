//! Per-CPU scheduler loop and the process-side hand-off
//!
//! The table lock travels with the CPU: the scheduler holds it while it
//! switches to a process, the process releases it after resuming and takes
//! it again before switching back. `sched` checks the conditions that make
//! this safe.

use super::select::select_next;
use crate::param::NPROC;
use crate::platform::{Platform, Resources};
use crate::proc::{Kernel, ProcState, ProcTable};
use crate::sync::SpinLockGuard;

impl<P: Platform, R: Resources> Kernel<P, R> {
    /// Scheduler loop of the executing CPU. Never returns.
    pub fn scheduler(&self) -> ! {
        loop {
            self.scheduler_pass();
        }
    }

    /// One scan over the table. Returns the number of dispatches.
    ///
    /// Every runnable slot met by the scan is a candidate; `select_next`
    /// decides who actually runs. The scan then moves past the candidate,
    /// so a pass always terminates.
    pub fn scheduler_pass(&self) -> usize {
        // Let devices interrupt between passes.
        self.platform().intr_on();

        let mut table = self.lock_table();
        let mut dispatched = 0;
        for index in 0..NPROC {
            if !table.get(index).is_runnable() {
                continue;
            }
            let chosen = select_next(table.procs(), index);
            table = self.dispatch(table, chosen);
            dispatched += 1;
        }
        dispatched
    }

    fn dispatch<'a>(
        &'a self,
        mut table: SpinLockGuard<'a, ProcTable>,
        slot: usize,
    ) -> SpinLockGuard<'a, ProcTable> {
        let cpu = table.cpu();
        self.cpus().get(cpu).set_current(Some(slot));
        self.resources().activate(slot);
        let p = table.get_mut(slot);
        p.state = ProcState::Running;
        log::trace!("sched: cpu {} runs pid {} ({})", cpu, p.pid, p.policy);

        table.hand_off();
        self.platform().switch_to(cpu, slot);
        let mut table = self.table().adopt(self.cpus(), self.platform());

        self.resources().activate_kernel();

        // Process is done running for now; it changed its state before
        // coming back.
        let p = table.get_mut(slot);
        if p.policy.is_realtime() {
            p.elapsed_time = p.elapsed_time.saturating_add(1);
        }
        self.cpus().get(table.cpu()).set_current(None);
        table
    }

    /// Switch from the calling process back to this CPU's scheduler.
    ///
    /// The caller holds the table lock and nothing else, has already moved
    /// out of `Running`, and gets the lock back when it is dispatched again.
    pub(crate) fn sched<'a>(&'a self, table: SpinLockGuard<'a, ProcTable>) -> SpinLockGuard<'a, ProcTable> {
        let slot = self.check_sched(&table);
        let intena = self.cpus().get(table.cpu()).intena();

        table.hand_off();
        self.platform().switch_to_scheduler(slot);
        let table = self.table().adopt(self.cpus(), self.platform());

        // The flag belongs to this process, not to the CPU it resumed on.
        self.cpus().get(table.cpu()).set_intena(intena);
        table
    }

    /// Last switch of an exiting process
    pub(crate) fn sched_final(&self, table: SpinLockGuard<'_, ProcTable>) -> ! {
        let slot = self.check_sched(&table);
        table.hand_off();
        self.platform().exit_to_scheduler(slot)
    }

    fn check_sched(&self, table: &ProcTable) -> usize {
        let cpu = self.my_cpu();
        kassert!(self.table().holding(cpu), "sched: table lock not held");
        kassert!(self.cpus().get(cpu).noff() == 1, "sched locks");
        let Some(slot) = self.cpus().get(cpu).current() else {
            panic!("[PROC FATAL] sched: no current process");
        };
        kassert!(table.get(slot).state != ProcState::Running, "sched running");
        kassert!(!self.platform().intr_get(), "sched interruptible");
        slot
    }
}
