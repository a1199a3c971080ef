//! Admission control
//!
//! EDF admits while the accumulated utilization stays below 1.0 (100 in
//! hundredths). RM admits against the Liu & Layland bound for the
//! process's ordinal, in thousandths:
//!
//! ```text
//! B(k) = k * (2^(1/k) - 1) * 1000
//! ```
//!
//! The bound table is computed once on first use.

use crate::error::{ProcError, ProcResult};
use crate::param::{RESERVED_PIDS, RM_BOUND_ENTRIES};
use crate::platform::{Platform, Resources};
use crate::proc::{Kernel, Pid, ProcState, ProcTable, SchedPolicy};
use num_traits::Float;
use spin::Once;

/// EDF accumulator ceiling, in hundredths. Reaching it rejects.
pub const EDF_CAPACITY: u32 = 100;

static RM_BOUNDS: Once<[u32; RM_BOUND_ENTRIES + 1]> = Once::new();

fn liu_layland(k: usize) -> u32 {
    let k = k as f64;
    let bound = k * (Float::powf(2.0f64, 1.0 / k) - 1.0) * 1000.0;
    // Nudge exact values (k = 1) past float noise before truncating.
    Float::floor(bound + 1e-6) as u32
}

/// Bound for ordinals `1..=RM_BOUND_ENTRIES`, followed by the tail value
fn rm_bounds() -> &'static [u32; RM_BOUND_ENTRIES + 1] {
    RM_BOUNDS.call_once(|| core::array::from_fn(|i| liu_layland(i + 1)))
}

/// RM bound `B(k)` in thousandths. Ordinals outside the table use the tail.
pub fn rm_bound(ordinal: i64) -> u32 {
    let table = rm_bounds();
    match usize::try_from(ordinal) {
        Ok(k) if (1..=RM_BOUND_ENTRIES).contains(&k) => table[k - 1],
        _ => table[RM_BOUND_ENTRIES],
    }
}

/// Ordinal used for the RM bound: pid minus the reserved pids
pub fn rm_ordinal(pid: Pid) -> i64 {
    i64::from(pid.as_u32()) - i64::from(RESERVED_PIDS)
}

/// RM priority derived from the rate: `max(1, (90 - 3r + 28) / 29)`
///
/// The division truncates on purpose; rate 1 maps to 3, not 4.
pub fn rm_priority(rate: u32) -> u32 {
    let value = (90 - 3 * i64::from(rate) + 28) / 29;
    value.max(1) as u32
}

/// EDF share of one process, hundredths rounded up.
///
/// Rounding up keeps the admitted set strictly below 1.0 in real
/// utilization. `None` for a zero deadline.
pub fn edf_contribution(execution_time: u32, deadline: u32) -> Option<u32> {
    if deadline == 0 {
        return None;
    }
    let share = (u64::from(execution_time) * 100).div_ceil(u64::from(deadline));
    Some(u32::try_from(share).unwrap_or(u32::MAX))
}

/// RM share of one process in thousandths: `execution_time * rate * 10`
pub fn rm_contribution(execution_time: u32, rate: u32) -> u32 {
    execution_time.saturating_mul(rate).saturating_mul(10)
}

/// Accepted utilization per policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Utilization {
    /// EDF, hundredths
    pub edf: u32,
    /// RM, thousandths
    pub rm: u32,
}

impl ProcTable {
    pub fn utilization(&self) -> Utilization {
        Utilization {
            edf: self.edf_util,
            rm: self.rm_util,
        }
    }

    /// Run admission for the process in `index` under `policy`.
    ///
    /// A previous admission of the same process is replaced, so its share
    /// is left out of the check. Nothing is committed before the check
    /// passes. On rejection the accumulators are untouched and the process
    /// is killed.
    pub fn admit(&mut self, index: usize, policy: SchedPolicy, now: u64) -> ProcResult<()> {
        if policy == SchedPolicy::Unset {
            return Err(ProcError::InvalidPolicy { raw: policy.raw() });
        }
        let p = *self.get(index);
        let held = if p.policy == policy { p.admitted_util } else { 0 };

        let (share, requested, bound) = match policy {
            SchedPolicy::Edf => {
                let share = edf_contribution(p.execution_time, p.deadline);
                let base = self.edf_util.saturating_sub(held);
                let requested = share.map_or(u32::MAX, |c| base.saturating_add(c));
                if requested >= EDF_CAPACITY {
                    return Err(self.reject(index, policy, requested, EDF_CAPACITY));
                }
                (share.unwrap_or(0), requested, EDF_CAPACITY)
            }
            _ => {
                let share = rm_contribution(p.execution_time, p.rate);
                let bound = rm_bound(rm_ordinal(p.pid));
                let requested = self.rm_util.saturating_sub(held).saturating_add(share);
                if requested > bound {
                    return Err(self.reject(index, policy, requested, bound));
                }
                (share, requested, bound)
            }
        };

        self.release_admission(index);
        match policy {
            SchedPolicy::Edf => self.edf_util = requested,
            _ => {
                self.rm_util = requested;
                self.get_mut(index).arrival_time = now;
            }
        }
        let target = self.get_mut(index);
        target.policy = policy;
        target.admitted_util = share;
        log::info!(
            "admission: pid {} admitted under {} (+{}, total {} / {})",
            p.pid,
            policy,
            share,
            requested,
            bound
        );
        Ok(())
    }

    /// Kill a process that failed admission.
    ///
    /// A process that is not on a CPU becomes a zombie right away: any
    /// earlier admission is released, its children go to the root and its
    /// parent is woken. A running one only gets `killed` and finishes
    /// through `exit`, which releases its share, so the slot cannot be
    /// reaped under it.
    fn reject(&mut self, index: usize, policy: SchedPolicy, requested: u32, bound: u32) -> ProcError {
        let me = self.slot_ref(index);
        let target = self.get_mut(index);
        let pid = target.pid;
        target.killed = true;
        if target.state != ProcState::Running {
            target.state = ProcState::Zombie;
            target.chan = None;
            self.release_admission(index);
            if self.reparent(me) {
                if let Some(root) = self.root() {
                    self.wakeup(crate::proc::Channel::Proc(root));
                }
            }
            self.wake_parent(index);
        }
        log::warn!(
            "admission: pid {} rejected under {} ({} exceeds {})",
            pid,
            policy,
            requested,
            bound
        );
        ProcError::AdmissionRejected {
            pid,
            policy,
            requested,
            bound,
        }
    }
}

impl<P: Platform, R: Resources> Kernel<P, R> {
    /// Set the per-activation execution budget of `pid`
    pub fn set_execution_time(&self, pid: Pid, ticks: u32) -> ProcResult<()> {
        let mut table = self.lock_table();
        let index = table.find(pid)?;
        table.get_mut(index).execution_time = ticks;
        Ok(())
    }

    /// Set the relative deadline of `pid`
    pub fn set_deadline(&self, pid: Pid, ticks: u32) -> ProcResult<()> {
        let mut table = self.lock_table();
        let index = table.find(pid)?;
        table.get_mut(index).deadline = ticks;
        Ok(())
    }

    /// Set the rate of `pid` and derive its RM priority
    pub fn set_rate(&self, pid: Pid, rate: u32) -> ProcResult<()> {
        let mut table = self.lock_table();
        let index = table.find(pid)?;
        let p = table.get_mut(index);
        p.rate = rate;
        p.priority = rm_priority(rate);
        Ok(())
    }

    /// Admit `pid` under `policy`, killing it if the bound is exceeded
    pub fn set_policy(&self, pid: Pid, policy: SchedPolicy) -> ProcResult<()> {
        let now = self.clock().ticks();
        let mut table = self.lock_table();
        let index = table.find(pid)?;
        let result = table.admit(index, policy, now);
        if matches!(result, Err(ProcError::AdmissionRejected { .. }))
            && table.get(index).state == ProcState::Zombie
        {
            self.resources().close_files(index);
        }
        result
    }

    /// Accepted utilization per policy
    pub fn utilization(&self) -> Utilization {
        self.lock_table().utilization()
    }
}
