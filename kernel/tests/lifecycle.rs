mod common;

use common::{fork_with, run, yield_until};
use rtproc_kernel::param::NPROC;
use rtproc_kernel::{Pid, ProcError, ProcState};
use std::collections::HashSet;
use std::sync::mpsc;

#[test]
fn test_fork_exit_wait_round_trip() {
    let pids = run(1, |kernel| {
        let mut pids = Vec::new();
        // More children than slots: reaped slots must come back.
        for _ in 0..NPROC * 2 {
            let child = fork_with(kernel, |_| {});
            assert_eq!(kernel.wait(), Ok(child));
            assert_eq!(
                kernel.state_of(child),
                Err(ProcError::NotFound { pid: child })
            );
            pids.push(child);
        }
        assert_eq!(kernel.wait(), Err(ProcError::NoChildren));
        pids
    });

    assert_eq!(pids.len(), NPROC * 2);
    assert!(pids.windows(2).all(|w| w[0] < w[1]), "pids are never reused");
}

#[test]
fn test_orphans_go_to_init() {
    run(1, |kernel| {
        let (tx, rx) = mpsc::channel();
        let middle = fork_with(kernel, move |kernel| {
            let grandchild = fork_with(kernel, |kernel| {
                for _ in 0..5 {
                    kernel.yield_cpu();
                }
            });
            tx.send(grandchild).unwrap();
            // Exit without waiting.
        });

        let reaped: HashSet<Pid> = [kernel.wait(), kernel.wait()]
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        let grandchild = rx.recv().unwrap();
        assert_eq!(reaped, HashSet::from([middle, grandchild]));
        assert_eq!(kernel.wait(), Err(ProcError::NoChildren));
    });
}

#[test]
fn test_kill_wakes_sleeping_child() {
    run(1, |kernel| {
        let child = fork_with(kernel, |kernel| {
            while kernel.sleep_ticks(1_000_000).is_ok() {}
        });
        yield_until(kernel, |k| k.state_of(child) == Ok(ProcState::Sleeping));

        kernel.kill(child).unwrap();
        assert_eq!(kernel.wait(), Ok(child));
    });
}

#[test]
fn test_children_spread_over_cpus() {
    run(3, |kernel| {
        let children: HashSet<Pid> = (0..12)
            .map(|_| {
                fork_with(kernel, |kernel| {
                    for _ in 0..50 {
                        kernel.yield_cpu();
                    }
                })
            })
            .collect();

        let mut reaped = HashSet::new();
        while let Ok(pid) = kernel.wait() {
            reaped.insert(pid);
        }
        assert_eq!(reaped, children);
    });
}

#[test]
fn test_sleep_ticks_waits_for_clock() {
    let elapsed = run(2, |kernel| {
        let start = kernel.uptime();
        kernel.sleep_ticks(5).unwrap();
        kernel.uptime() - start
    });
    assert!(elapsed >= 5);
}

#[test]
fn test_boot_applies_configured_log_level() {
    let level = run(1, |_| log::max_level());
    assert_eq!(level, common::LOG_LEVEL);
}
