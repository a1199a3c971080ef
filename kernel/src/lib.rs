//! Process manager with real-time scheduling
//!
//! Process table, per-CPU scheduler loop, sleep/wakeup and admission control
//! for two real-time policies:
//! - EDF (Earliest Deadline First), admitted while total utilization < 1.0
//! - RM (Rate-Monotonic), admitted against the Liu & Layland bound
//!
//! Everything that touches hardware (context swap, interrupt flag, address
//! spaces, files) is reached through the traits in [`platform`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
pub mod error;

pub mod config;
pub mod logger;
pub mod param;
pub mod platform;
pub mod proc;
pub mod scheduler;
pub mod sync;
pub mod syscall;
pub mod time;

pub use config::KernelConfig;
pub use error::{ProcError, ProcResult};
pub use param::{NCPU, NPROC};
pub use platform::{CpuId, NoResources, Platform, Resources};
pub use proc::{Channel, Kernel, Pid, ProcInfo, ProcState, SchedPolicy, SlotRef};
pub use scheduler::{rm_bound, select_next, Utilization};
