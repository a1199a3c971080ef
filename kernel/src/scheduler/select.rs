//! Dispatch target selection
//!
//! Pure function over a table snapshot: given the runnable slot the scan
//! stopped at, decide which slot actually runs.

use crate::proc::{Proc, SchedPolicy};

/// Resolve the slot to dispatch when the scan reaches `candidate`.
///
/// - EDF candidate: the runnable process with the earliest deadline
/// - RM candidate: the runnable process with the lowest priority value
/// - no policy: the candidate itself
///
/// The candidate's policy only picks the key. Every runnable process is
/// compared on it, whatever its own policy. Ties go to the lowest pid.
pub fn select_next(procs: &[Proc], candidate: usize) -> usize {
    let policy = procs[candidate].policy;
    let key: fn(&Proc) -> u32 = match policy {
        SchedPolicy::Unset => return candidate,
        SchedPolicy::Edf => |p| p.deadline,
        SchedPolicy::Rm => |p| p.priority,
    };

    procs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_runnable())
        .min_by_key(|(_, p)| (key(p), p.pid))
        .map_or(candidate, |(index, _)| index)
}
