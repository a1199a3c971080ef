//! Process lifecycle: init, fork, exit, wait, kill, yield

use super::{Channel, Kernel, Pid, ProcName, ProcState};
use crate::error::{ProcError, ProcResult};
use crate::param::NPROC;
use crate::platform::{Platform, Resources};

impl<P: Platform, R: Resources> Kernel<P, R> {
    /// Set up the first user process. It becomes the root that adopts
    /// orphans and must never exit.
    pub fn user_init(&self) -> ProcResult<Pid> {
        let mut table = self.lock_table();
        let index = table.alloc()?;
        let root = table.slot_ref(index);
        table.set_root(root);
        let p = table.get_mut(index);
        p.name = ProcName::new("initcode");
        p.state = ProcState::Runnable;
        log::info!("proc: init process is pid {}", p.pid);
        Ok(p.pid)
    }

    /// Create a copy of the calling process. Returns the child's pid.
    pub fn fork(&self) -> ProcResult<Pid> {
        let parent = self.my_slot();

        let (child, pid) = {
            let mut table = self.lock_table();
            let child = table.alloc()?;
            (child, table.get(child).pid)
        };

        if let Err(reason) = self.resources().copy_image(parent, child) {
            self.resources().free_image(child);
            self.lock_table().free(child);
            log::warn!("proc: fork failed: {}", reason);
            return Err(ProcError::Collaborator { reason });
        }
        self.resources().dup_files(parent, child);

        let mut table = self.lock_table();
        let parent_ref = table.slot_ref(parent);
        let name = table.get(parent).name;
        let p = table.get_mut(child);
        p.parent = Some(parent_ref);
        p.name = name;
        if p.state != ProcState::Embryo {
            // Rejected by admission before it was ready; leave it for wait.
            drop(table);
            self.resources().close_files(child);
            log::debug!("proc: pid {} died before its first run", pid);
            return Ok(pid);
        }
        p.state = ProcState::Runnable;
        log::debug!("proc: pid {} forked from slot {}", pid, parent);
        Ok(pid)
    }

    /// Exit the calling process. It stays a zombie until its parent
    /// calls `wait`.
    pub fn exit(&self) -> ! {
        let slot = self.my_slot();
        {
            let table = self.lock_table();
            let root = table.root().and_then(|root| table.resolve(root));
            kassert!(root != Some(slot), "init exiting");
        }

        self.resources().close_files(slot);

        let mut table = self.lock_table();
        let me = table.slot_ref(slot);

        // Parent might be sleeping in wait().
        table.wake_parent(slot);

        if table.reparent(me) {
            if let Some(root) = table.root() {
                table.wakeup(Channel::Proc(root));
            }
        }

        table.release_admission(slot);
        let p = table.get_mut(slot);
        p.state = ProcState::Zombie;
        log::debug!("proc: pid {} exited", p.pid);
        self.sched_final(table)
    }

    /// Wait for a child to exit and return its pid
    pub fn wait(&self) -> ProcResult<Pid> {
        let slot = self.my_slot();
        let mut table = self.lock_table();
        loop {
            let me = table.slot_ref(slot);
            let mut have_kids = false;
            for index in 0..NPROC {
                let p = table.get(index);
                if p.state == ProcState::Unused || p.parent != Some(me) {
                    continue;
                }
                have_kids = true;
                if p.state == ProcState::Zombie {
                    let pid = p.pid;
                    self.resources().free_image(index);
                    table.free(index);
                    log::debug!("proc: pid {} reaped", pid);
                    return Ok(pid);
                }
            }

            if !have_kids {
                return Err(ProcError::NoChildren);
            }
            if table.get(slot).killed {
                return Err(ProcError::Killed);
            }

            table = self.sleep_locked(table, Channel::Proc(me));
        }
    }

    /// Kill `pid`. It stops at its next return to user mode; a sleeping
    /// target is woken so it gets there.
    pub fn kill(&self, pid: Pid) -> ProcResult<()> {
        let mut table = self.lock_table();
        let index = table.find(pid)?;
        let p = table.get_mut(index);
        p.killed = true;
        if p.state == ProcState::Sleeping {
            p.state = ProcState::Runnable;
        }
        log::debug!("proc: pid {} killed", pid);
        Ok(())
    }

    /// Give up the CPU for one scheduling round
    pub fn yield_cpu(&self) {
        let mut table = self.lock_table();
        let slot = self.my_slot();
        table.get_mut(slot).state = ProcState::Runnable;
        let table = self.sched(table);
        drop(table);
    }

    /// First thing a newly dispatched process runs: release the table lock
    /// the scheduler handed over.
    pub fn fork_return(&self) {
        drop(self.table().adopt(self.cpus(), self.platform()));
    }

    /// Grow or shrink the caller's memory by `delta` bytes
    pub fn grow(&self, delta: isize) -> ProcResult<usize> {
        let slot = self.my_slot();
        self.resources()
            .grow_image(slot, delta)
            .map_err(|reason| ProcError::Collaborator { reason })
    }

    pub fn getpid(&self) -> Pid {
        let slot = self.my_slot();
        self.lock_table().get(slot).pid
    }

    /// Has the caller been killed?
    pub fn killed(&self) -> bool {
        let slot = self.my_slot();
        self.lock_table().get(slot).killed
    }
}
