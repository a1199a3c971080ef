//! System call layer
//!
//! Decodes raw syscall numbers and integer arguments, runs the kernel
//! operation and encodes the result the way user space expects it: the
//! scheduling-parameter calls return `0` or `-EINVAL`, the classic calls
//! return `-1` on any failure.

use crate::error::{ProcError, ProcResult};
use crate::platform::{Platform, Resources};
use crate::proc::{Kernel, Pid, SchedPolicy};

/// Syscall numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Syscall {
    Fork = 1,
    Exit = 2,
    Wait = 3,
    Kill = 6,
    Getpid = 11,
    Sbrk = 12,
    Sleep = 13,
    Uptime = 14,
    PrintInfo = 22,
    SchedPolicy = 23,
    ExecTime = 24,
    Deadline = 25,
    Rate = 26,
    Yield = 27,
}

impl Syscall {
    pub fn from_raw(num: i32) -> Option<Self> {
        Some(match num {
            1 => Self::Fork,
            2 => Self::Exit,
            3 => Self::Wait,
            6 => Self::Kill,
            11 => Self::Getpid,
            12 => Self::Sbrk,
            13 => Self::Sleep,
            14 => Self::Uptime,
            22 => Self::PrintInfo,
            23 => Self::SchedPolicy,
            24 => Self::ExecTime,
            25 => Self::Deadline,
            26 => Self::Rate,
            27 => Self::Yield,
            _ => return None,
        })
    }
}

fn pid_arg(raw: i32) -> ProcResult<Pid> {
    u32::try_from(raw)
        .map(Pid::new)
        .map_err(|_| ProcError::InvalidArgument { value: raw })
}

fn ticks_arg(raw: i32) -> ProcResult<u32> {
    u32::try_from(raw).map_err(|_| ProcError::InvalidArgument { value: raw })
}

/// Encode a scheduling-parameter result
fn status(result: ProcResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => err.to_errno(),
    }
}

fn pid_or_fail(result: ProcResult<Pid>) -> i32 {
    result.map_or(-1, |pid| pid.as_u32() as i32)
}

/// Run syscall `num` for the calling process.
///
/// A caller that ends up killed does not return to user mode.
pub fn dispatch<P: Platform, R: Resources>(kernel: &Kernel<P, R>, num: i32, args: &[i32; 2]) -> i32 {
    let ret = match Syscall::from_raw(num) {
        Some(call) => handle(kernel, call, args),
        None => {
            log::warn!("syscall: unknown syscall {} from pid {}", num, kernel.getpid());
            -1
        }
    };

    if kernel.killed() {
        kernel.exit();
    }
    ret
}

fn handle<P: Platform, R: Resources>(kernel: &Kernel<P, R>, call: Syscall, args: &[i32; 2]) -> i32 {
    match call {
        Syscall::Fork => pid_or_fail(kernel.fork()),
        Syscall::Exit => kernel.exit(),
        Syscall::Wait => pid_or_fail(kernel.wait()),
        Syscall::Kill => pid_arg(args[0])
            .and_then(|pid| kernel.kill(pid))
            .map_or(-1, |()| 0),
        Syscall::Getpid => kernel.getpid().as_u32() as i32,
        Syscall::Sbrk => kernel
            .grow(args[0] as isize)
            .map_or(-1, |old| i32::try_from(old).unwrap_or(-1)),
        Syscall::Sleep => ticks_arg(args[0])
            .and_then(|n| kernel.sleep_ticks(n))
            .map_or(-1, |()| 0),
        Syscall::Uptime => kernel.uptime() as i32,
        Syscall::PrintInfo => kernel.printinfo().len() as i32,
        Syscall::SchedPolicy => status(pid_arg(args[0]).and_then(|pid| {
            let policy = SchedPolicy::from_raw(args[1])
                .ok_or(ProcError::InvalidPolicy { raw: args[1] })?;
            kernel.set_policy(pid, policy)
        })),
        Syscall::ExecTime => status(
            pid_arg(args[0]).and_then(|pid| kernel.set_execution_time(pid, ticks_arg(args[1])?)),
        ),
        Syscall::Deadline => status(
            pid_arg(args[0]).and_then(|pid| kernel.set_deadline(pid, ticks_arg(args[1])?)),
        ),
        Syscall::Rate => {
            status(pid_arg(args[0]).and_then(|pid| kernel.set_rate(pid, ticks_arg(args[1])?)))
        }
        Syscall::Yield => {
            kernel.yield_cpu();
            0
        }
    }
}
