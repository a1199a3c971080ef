//! Synchronization primitives

pub mod cpu;
pub mod spinlock;

pub use cpu::{Cpu, Cpus};
pub use spinlock::{SpinLock, SpinLockGuard};
