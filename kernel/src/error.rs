//! Process manager error handling
//!
//! Recoverable failures are returned as [`ProcError`]. Invariant violations
//! (exiting the root process, handing off the CPU without the table lock,
//! switching with interrupts enabled) are fatal and go through [`kassert!`].

use crate::param::EINVAL;
use crate::proc::{Pid, SchedPolicy};
use core::fmt;

/// Process manager error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcError {
    /// No live process carries this pid
    NotFound { pid: Pid },

    /// Utilization bound exceeded; the target has been killed
    AdmissionRejected {
        pid: Pid,
        policy: SchedPolicy,
        /// Accumulated utilization the admission would have produced
        requested: u32,
        bound: u32,
    },

    /// Process table is full
    ResourceExhausted { capacity: usize },

    /// `wait` called by a process without children
    NoChildren,

    /// Caller was killed while blocked
    Killed,

    /// Raw policy code is neither EDF nor RM
    InvalidPolicy { raw: i32 },

    /// Negative scheduling parameter
    InvalidArgument { value: i32 },

    /// An external collaborator (address space, files) refused the request
    Collaborator { reason: &'static str },
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { pid } => write!(f, "Process {} not found", pid),
            Self::AdmissionRejected {
                pid,
                policy,
                requested,
                bound,
            } => write!(
                f,
                "Process {} rejected by {} admission: {} > bound {}",
                pid, policy, requested, bound
            ),
            Self::ResourceExhausted { capacity } => {
                write!(f, "Process table full ({} slots)", capacity)
            }
            Self::NoChildren => write!(f, "No children to wait for"),
            Self::Killed => write!(f, "Caller was killed"),
            Self::InvalidPolicy { raw } => write!(f, "Invalid scheduling policy {}", raw),
            Self::InvalidArgument { value } => write!(f, "Invalid argument {}", value),
            Self::Collaborator { reason } => write!(f, "Collaborator failure: {}", reason),
        }
    }
}

impl ProcError {
    /// Code surfaced through the syscall layer.
    ///
    /// The scheduling-parameter calls share one sentinel (`-EINVAL`), the
    /// lifecycle calls keep the classic `-1`.
    pub fn to_errno(&self) -> i32 {
        match self {
            Self::NotFound { .. }
            | Self::AdmissionRejected { .. }
            | Self::InvalidPolicy { .. }
            | Self::InvalidArgument { .. } => -EINVAL,
            Self::ResourceExhausted { .. }
            | Self::NoChildren
            | Self::Killed
            | Self::Collaborator { .. } => -1,
        }
    }
}

/// Result type for process manager operations
pub type ProcResult<T> = Result<T, ProcError>;

/// Fatal invariant check. A corrupted process table must not keep running.
#[macro_export]
macro_rules! kassert {
    ($cond:expr, $reason:expr) => {
        if !$cond {
            panic!("[PROC FATAL] {}", $reason);
        }
    };
}
