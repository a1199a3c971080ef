mod common;

use common::{fork_with, run, yield_until};
use rtproc_kernel::sync::SpinLock;
use rtproc_kernel::{Channel, Pid, ProcState};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ROUNDS: u32 = 200;
const READY: Channel = Channel::Event(0x5eed);

/// Consumers sleep until a counter reaches its target while a producer
/// bumps it; some consumers are killed mid-way. Every consumer must end,
/// either by seeing the target or by noticing it was killed.
fn producer_consumer(ncpu: usize, consumers: usize) {
    run(ncpu, move |kernel| {
        let counter: &'static SpinLock<u32> = Box::leak(Box::new(SpinLock::new("counter", 0)));
        let finished = Arc::new(AtomicUsize::new(0));

        let mut pids: Vec<Pid> = Vec::new();
        for _ in 0..consumers {
            let finished = finished.clone();
            pids.push(fork_with(kernel, move |kernel| {
                let mut value = counter.lock(kernel.cpus(), kernel.platform());
                while *value < ROUNDS {
                    if kernel.killed() {
                        return;
                    }
                    value = kernel.sleep(READY, value);
                }
                finished.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let producer = fork_with(kernel, move |kernel| {
            for _ in 0..ROUNDS {
                *counter.lock(kernel.cpus(), kernel.platform()) += 1;
                kernel.wakeup(READY);
                kernel.yield_cpu();
            }
        });

        // Kill every other consumer once it has gone to sleep at least once.
        let victims: Vec<Pid> = pids.iter().copied().step_by(2).collect();
        for &victim in &victims {
            yield_until(kernel, |k| {
                matches!(
                    k.state_of(victim),
                    Ok(ProcState::Sleeping) | Ok(ProcState::Zombie) | Err(_)
                )
            });
            let _ = kernel.kill(victim);
        }

        let mut reaped = HashSet::new();
        while let Ok(pid) = kernel.wait() {
            reaped.insert(pid);
        }
        assert!(reaped.contains(&producer));
        assert_eq!(reaped.len(), consumers + 1);

        let survivors = consumers - victims.len();
        assert!(finished.load(Ordering::SeqCst) >= survivors);
        assert_eq!(*counter.lock(kernel.cpus(), kernel.platform()), ROUNDS);
    });
}

#[test]
fn test_no_lost_wakeup_single_cpu() {
    producer_consumer(1, 4);
}

#[test]
fn test_no_lost_wakeup_multi_cpu() {
    for _ in 0..5 {
        producer_consumer(3, 6);
    }
}

#[test]
fn test_wakeup_without_sleepers_is_harmless() {
    run(1, |kernel| {
        kernel.wakeup(READY);
        let child = fork_with(kernel, |kernel| kernel.wakeup(READY));
        assert_eq!(kernel.wait(), Ok(child));
    });
}
