//! Process control block

use crate::param::PROC_NAME_LEN;
use core::fmt;

/// Process identifier. Never reused within one boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pid(u32);

impl Pid {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcState {
    #[default]
    Unused,
    Embryo,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

impl ProcState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Embryo => "embryo",
            Self::Sleeping => "sleep",
            Self::Runnable => "runble",
            Self::Running => "run",
            Self::Zombie => "zombie",
        }
    }
}

/// Real-time scheduling policy of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedPolicy {
    /// Scheduled in table-scan order
    #[default]
    Unset,
    /// Earliest Deadline First
    Edf,
    /// Rate-Monotonic
    Rm,
}

impl SchedPolicy {
    /// Decode the code passed to `sched_policy` (0 = EDF, 1 = RM)
    pub fn from_raw(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Edf),
            1 => Some(Self::Rm),
            _ => None,
        }
    }

    /// Code shown by `printinfo`; -1 when no policy has been admitted
    pub fn raw(&self) -> i32 {
        match self {
            Self::Unset => -1,
            Self::Edf => 0,
            Self::Rm => 1,
        }
    }

    pub fn is_realtime(&self) -> bool {
        !matches!(self, Self::Unset)
    }
}

impl fmt::Display for SchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unset => "none",
            Self::Edf => "EDF",
            Self::Rm => "RM",
        };
        f.write_str(name)
    }
}

/// Weak reference to a table slot.
///
/// The generation detects a slot that was freed and reallocated since the
/// reference was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub index: usize,
    pub generation: u32,
}

/// Sleep channel: what a sleeping process waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// A process: its children exiting, or its own admission
    Proc(SlotRef),
    /// The tick counter
    Ticks,
    /// Any other kernel event, keyed by the caller
    Event(usize),
}

/// Fixed-size process name, truncated on a char boundary
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcName {
    bytes: [u8; PROC_NAME_LEN],
    len: u8,
}

impl ProcName {
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(PROC_NAME_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; PROC_NAME_LEN];
        bytes[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self {
            bytes,
            len: end as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Debug for ProcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for ProcName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-process state
#[derive(Debug, Clone, Copy, Default)]
pub struct Proc {
    pub pid: Pid,
    pub state: ProcState,
    pub parent: Option<SlotRef>,
    pub name: ProcName,
    /// Bumped each time the slot is allocated
    pub generation: u32,

    pub policy: SchedPolicy,
    /// Relative deadline (EDF key)
    pub deadline: u32,
    pub execution_time: u32,
    /// Number of completed dispatches under a real-time policy
    pub elapsed_time: u32,
    pub rate: u32,
    /// RM priority, lower is more urgent
    pub priority: u32,
    /// Tick at which the process was admitted under RM
    pub arrival_time: u64,
    /// Contribution added to the policy accumulator at admission
    pub admitted_util: u32,

    pub killed: bool,
    pub chan: Option<Channel>,
}

impl Proc {
    /// Fields of a freshly allocated process
    pub(crate) fn reset(&mut self, pid: Pid) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            pid,
            state: ProcState::Embryo,
            generation,
            execution_time: 1,
            priority: 1,
            ..Self::default()
        };
    }

    pub fn is_runnable(&self) -> bool {
        self.state == ProcState::Runnable
    }
}
