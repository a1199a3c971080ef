//! Verrou à attente active avec suivi du détenteur
//!
//! Acquiring disables interrupts on the executing CPU (push_off) and records
//! that CPU as the holder, so a CPU can ask whether it holds the lock. The
//! guard may be carried across a context swap: the side giving up the CPU
//! calls [`SpinLockGuard::hand_off`] and the side resuming calls
//! [`SpinLock::adopt`].

use crate::platform::{CpuId, Platform};
use crate::sync::cpu::Cpus;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

const NO_HOLDER: usize = usize::MAX;

/// Spinlock noyau
pub struct SpinLock<T> {
    name: &'static str,
    locked: AtomicBool,
    holder: AtomicUsize,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

impl<T> SpinLock<T> {
    /// Crée un nouveau verrou
    pub const fn new(name: &'static str, data: T) -> Self {
        Self {
            name,
            locked: AtomicBool::new(false),
            holder: AtomicUsize::new(NO_HOLDER),
            data: UnsafeCell::new(data),
        }
    }

    /// Verrouille, en bloquant jusqu'à ce que le verrou soit disponible
    pub fn lock<'a>(&'a self, cpus: &'a Cpus, platform: &'a dyn Platform) -> SpinLockGuard<'a, T> {
        let cpu = cpus.push_off(platform);
        kassert!(
            !self.holding(cpu),
            format_args!("acquire {}: lock already held by this cpu", self.name)
        );

        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        self.holder.store(cpu, Ordering::Relaxed);

        SpinLockGuard {
            lock: self,
            cpus,
            platform,
            cpu,
        }
    }

    /// Tente de verrouiller sans attendre
    pub fn try_lock<'a>(
        &'a self,
        cpus: &'a Cpus,
        platform: &'a dyn Platform,
    ) -> Option<SpinLockGuard<'a, T>> {
        let cpu = cpus.push_off(platform);
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            cpus.pop_off(platform, cpu);
            return None;
        }
        self.holder.store(cpu, Ordering::Relaxed);
        Some(SpinLockGuard {
            lock: self,
            cpus,
            platform,
            cpu,
        })
    }

    /// Is the lock held by `cpu`?
    pub fn holding(&self, cpu: CpuId) -> bool {
        self.locked.load(Ordering::Relaxed) && self.holder.load(Ordering::Relaxed) == cpu
    }

    /// Take over a guard handed off on the other side of a context swap.
    ///
    /// The lock must already be held by the executing CPU; its push_off
    /// depth is inherited unchanged.
    pub fn adopt<'a>(&'a self, cpus: &'a Cpus, platform: &'a dyn Platform) -> SpinLockGuard<'a, T> {
        let cpu = platform.cpu_id();
        kassert!(
            self.holding(cpu),
            format_args!("adopt {}: lock not held by this cpu", self.name)
        );
        SpinLockGuard {
            lock: self,
            cpus,
            platform,
            cpu,
        }
    }
}

/// Guard qui garantit le déverrouillage automatique
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    cpus: &'a Cpus,
    platform: &'a dyn Platform,
    cpu: CpuId,
}

impl<'a, T> SpinLockGuard<'a, T> {
    /// CPU that acquired (or adopted) the lock
    pub fn cpu(&self) -> CpuId {
        self.cpu
    }

    /// Lock this guard belongs to
    pub fn spinlock(&self) -> &'a SpinLock<T> {
        self.lock
    }

    /// Give the lock up without releasing it. Someone must `adopt` it.
    pub fn hand_off(self) {
        core::mem::forget(self);
    }
}

impl<'a, T> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.holder.store(NO_HOLDER, Ordering::Relaxed);
        self.lock.locked.store(false, Ordering::Release);
        self.cpus.pop_off(self.platform, self.cpu);
    }
}

impl<'a, T> Deref for SpinLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.data.get() }
    }
}
