//! Collaborator interfaces
//!
//! The process manager never touches hardware directly. The platform layer
//! supplies CPU identity, the interrupt flag and the context-swap primitive;
//! the memory and file layers are reached through [`Resources`].

/// Index of a CPU, `0..ncpu`
pub type CpuId = usize;

/// CPU-level primitives provided by the architecture layer.
///
/// All methods refer to the CPU the caller is currently executing on.
pub trait Platform: Sync {
    /// Id of the executing CPU. Only stable while interrupts are disabled.
    fn cpu_id(&self) -> CpuId;

    /// Are interrupts enabled on this CPU?
    fn intr_get(&self) -> bool;

    fn intr_on(&self);

    fn intr_off(&self);

    /// Scheduler side of the context swap: run the process in `slot` on
    /// `cpu`. Returns once that process switches back to this scheduler.
    ///
    /// The table lock is held across the call; the process releases it
    /// after resuming and re-acquires it before switching back.
    fn switch_to(&self, cpu: CpuId, slot: usize);

    /// Process side of the context swap: give the CPU back to its
    /// scheduler. Returns when the process in `slot` is dispatched again,
    /// possibly on another CPU.
    fn switch_to_scheduler(&self, slot: usize);

    /// Final switch of an exiting process. Never resumes.
    fn exit_to_scheduler(&self, slot: usize) -> !;
}

/// Address-space and file-table collaborators.
///
/// Slots are table indices. Every method has a no-op default so a platform
/// only implements what it owns.
pub trait Resources: Sync {
    /// Duplicate the parent's memory image (and trap frame) into the child.
    /// The child's copy must return 0 from fork.
    fn copy_image(&self, _parent: usize, _child: usize) -> Result<(), &'static str> {
        Ok(())
    }

    /// Grow or shrink the image by `delta` bytes, returning the old size
    fn grow_image(&self, _slot: usize, _delta: isize) -> Result<usize, &'static str> {
        Ok(0)
    }

    /// Release the image and kernel stack of a reaped process
    fn free_image(&self, _slot: usize) {}

    /// Install the process's page table on this CPU
    fn activate(&self, _slot: usize) {}

    /// Back to the kernel-only page table
    fn activate_kernel(&self) {}

    /// Duplicate open descriptors and the working directory
    fn dup_files(&self, _parent: usize, _child: usize) {}

    /// Close descriptors and drop the working directory reference
    fn close_files(&self, _slot: usize) {}
}

/// Collaborator that owns nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl Resources for NoResources {}
