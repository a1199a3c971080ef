//! Compile-time kernel parameters

use static_assertions::const_assert;

/// Maximum number of processes
pub const NPROC: usize = 64;

/// Maximum number of CPUs
pub const NCPU: usize = 8;

/// Bytes kept from a process name
pub const PROC_NAME_LEN: usize = 16;

/// Pids handed out before any real-time task (init and the shell).
/// They do not count towards the RM ordinal.
pub const RESERVED_PIDS: u32 = 2;

/// Number of tabulated Liu & Layland bounds; larger ordinals use the tail.
pub const RM_BOUND_ENTRIES: usize = 63;

/// Errno returned by the scheduling-parameter syscalls
pub const EINVAL: i32 = 22;

const_assert!(NPROC > 0 && NPROC <= u16::MAX as usize);
const_assert!(NCPU > 0);
const_assert!(PROC_NAME_LEN <= u8::MAX as usize);
const_assert!(RM_BOUND_ENTRIES >= 1);
