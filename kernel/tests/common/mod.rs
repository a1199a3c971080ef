//! Threaded machine simulator for integration tests
//!
//! Every CPU and every process is an OS thread. A context swap hands a baton
//! from one thread to the other, so exactly one thread runs on behalf of a
//! CPU at any time, and the process table lock travels with the baton just
//! as it does on hardware.
//!
//! The root process runs the test driver. Children get their body through
//! [`fork_with`]: the simulated address-space copy starts the child thread,
//! which waits until a scheduler dispatches its slot.

#![allow(dead_code)]

use rtproc_kernel::logger::{self, Console};
use rtproc_kernel::param::NPROC;
use rtproc_kernel::{CpuId, Kernel, KernelConfig, Pid, Platform, Resources};
use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

pub type SimKernel = Kernel<Machine, SimResources>;

pub type Body = Box<dyn FnOnce(&'static SimKernel) + Send>;

const DRIVER_TIMEOUT: Duration = Duration::from_secs(60);

/// Level every simulated machine boots with
pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Warn;

thread_local! {
    static CPU: Cell<Option<CpuId>> = const { Cell::new(None) };
    static INTR: Cell<bool> = const { Cell::new(false) };
}

fn set_cpu(cpu: Option<CpuId>) {
    CPU.with(|c| c.set(cpu));
}

/// Single-slot mailbox
struct Baton<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T> Baton<T> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn post(&self, value: T) {
        *self.value.lock().unwrap() = Some(value);
        self.ready.notify_all();
    }

    fn take(&self) -> T {
        let mut value = self.value.lock().unwrap();
        loop {
            if let Some(v) = value.take() {
                return v;
            }
            value = self.ready.wait(value).unwrap();
        }
    }
}

enum Resume {
    /// Dispatched on this CPU
    Run(CpuId),
    /// Slot reaped before the process ever ran
    Cancel,
}

/// Unwind payload of a process thread leaving for good
struct Exited;

struct Shared {
    cpus: Vec<Baton<()>>,
    procs: Mutex<Vec<Option<Arc<Baton<Resume>>>>>,
    pending: Mutex<HashMap<usize, Body>>,
    failures: Mutex<Vec<String>>,
    kernel: OnceLock<&'static SimKernel>,
    stop: AtomicBool,
}

impl Shared {
    fn kernel(&self) -> &'static SimKernel {
        self.kernel.get().copied().expect("kernel not built")
    }

    fn baton(&self, slot: usize) -> Arc<Baton<Resume>> {
        self.procs.lock().unwrap()[slot]
            .clone()
            .expect("slot has no process thread")
    }

    fn install(&self, slot: usize) -> Arc<Baton<Resume>> {
        let baton = Arc::new(Baton::new());
        self.procs.lock().unwrap()[slot] = Some(baton.clone());
        baton
    }

    fn record_failure(&self, payload: Box<dyn Any + Send>) {
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "non-string panic".to_string());
        self.failures.lock().unwrap().push(message);
    }
}

/// Platform half of the simulator
pub struct Machine {
    shared: Arc<Shared>,
}

impl Platform for Machine {
    fn cpu_id(&self) -> CpuId {
        CPU.with(|c| c.get()).expect("thread is not running on a cpu")
    }

    fn intr_get(&self) -> bool {
        INTR.with(|i| i.get())
    }

    fn intr_on(&self) {
        INTR.with(|i| i.set(true));
    }

    fn intr_off(&self) {
        INTR.with(|i| i.set(false));
    }

    fn switch_to(&self, cpu: CpuId, slot: usize) {
        self.shared.baton(slot).post(Resume::Run(cpu));
        self.shared.cpus[cpu].take();
    }

    fn switch_to_scheduler(&self, slot: usize) {
        let baton = self.shared.baton(slot);
        let cpu = self.cpu_id();
        set_cpu(None);
        self.shared.cpus[cpu].post(());
        match baton.take() {
            Resume::Run(cpu) => set_cpu(Some(cpu)),
            // Killed by admission and reaped while off the CPU. The lock
            // was handed off, so nothing on this stack needs releasing.
            Resume::Cancel => panic::resume_unwind(Box::new(Exited)),
        }
    }

    fn exit_to_scheduler(&self, _slot: usize) -> ! {
        let cpu = self.cpu_id();
        set_cpu(None);
        self.shared.cpus[cpu].post(());
        panic::resume_unwind(Box::new(Exited))
    }
}

/// Address-space half: a fork starts the child's thread
pub struct SimResources {
    shared: Arc<Shared>,
}

impl Resources for SimResources {
    fn copy_image(&self, parent: usize, child: usize) -> Result<(), &'static str> {
        let body = self
            .shared
            .pending
            .lock()
            .unwrap()
            .remove(&parent)
            .unwrap_or_else(|| Box::new(|_| {}));
        let baton = self.shared.install(child);
        let shared = self.shared.clone();
        thread::spawn(move || run_process(shared, baton, body));
        Ok(())
    }

    fn free_image(&self, slot: usize) {
        // Only a process that never ran is still waiting on its baton.
        if let Some(baton) = self.shared.procs.lock().unwrap()[slot].take() {
            baton.post(Resume::Cancel);
        }
    }
}

fn run_process(shared: Arc<Shared>, baton: Arc<Baton<Resume>>, body: Body) {
    match baton.take() {
        Resume::Run(cpu) => set_cpu(Some(cpu)),
        Resume::Cancel => return,
    }
    let kernel = shared.kernel();
    kernel.fork_return();

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body(kernel))) {
        if payload.is::<Exited>() {
            return;
        }
        shared.record_failure(payload);
    }
    let _ = panic::catch_unwind(AssertUnwindSafe(|| {
        kernel.exit();
    }));
}

/// Fork a child that runs `body`. Returns the child's pid.
pub fn fork_with(
    kernel: &'static SimKernel,
    body: impl FnOnce(&'static SimKernel) + Send + 'static,
) -> Pid {
    let me = kernel.current_slot().expect("fork outside a process");
    kernel
        .resources()
        .shared
        .pending
        .lock()
        .unwrap()
        .insert(me, Box::new(body));
    kernel.fork().expect("fork failed")
}

/// Yield the CPU until `done` holds
pub fn yield_until(kernel: &SimKernel, mut done: impl FnMut(&SimKernel) -> bool) {
    while !done(kernel) {
        kernel.yield_cpu();
    }
}

struct Stderr;

impl Console for Stderr {
    fn write_str(&self, s: &str) {
        eprint!("{}", s);
    }
}

static STDERR: Stderr = Stderr;

/// Boot a machine with `ncpu` scheduler CPUs and run `driver` as the root
/// process. Returns what the driver returns; panics from the driver or from
/// any child fail the calling test.
///
/// One extra CPU id is reserved for the timer thread, which ticks every
/// millisecond.
pub fn run<T, F>(ncpu: usize, driver: F) -> T
where
    T: Send + 'static,
    F: FnOnce(&'static SimKernel) -> T + Send + 'static,
{
    logger::attach_console(&STDERR);
    let _ = logger::init(LOG_LEVEL);

    let timer_cpu = ncpu;
    let shared = Arc::new(Shared {
        cpus: (0..=ncpu).map(|_| Baton::new()).collect(),
        procs: Mutex::new(vec![None; NPROC]),
        pending: Mutex::new(HashMap::new()),
        failures: Mutex::new(Vec::new()),
        kernel: OnceLock::new(),
        stop: AtomicBool::new(false),
    });
    let kernel: &'static SimKernel = Box::leak(Box::new(Kernel::new(
        KernelConfig::new()
            .with_cpus(ncpu + 1)
            .with_log_level(LOG_LEVEL),
        Machine {
            shared: shared.clone(),
        },
        SimResources {
            shared: shared.clone(),
        },
    )));
    let _ = shared.kernel.set(kernel);

    set_cpu(Some(timer_cpu));
    let root_pid = kernel.user_init().expect("user_init");
    let root_slot = kernel.slot_of(root_pid).expect("root slot");
    set_cpu(None);

    let (tx, rx) = mpsc::channel();
    let root_baton = shared.install(root_slot);
    thread::spawn(move || {
        match root_baton.take() {
            Resume::Run(cpu) => set_cpu(Some(cpu)),
            Resume::Cancel => return,
        }
        kernel.fork_return();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| driver(kernel)));
        let _ = tx.send(outcome);
        // The root never exits; keep its CPU parked.
        loop {
            thread::park();
        }
    });

    for cpu in 0..ncpu {
        let shared = shared.clone();
        thread::spawn(move || {
            set_cpu(Some(cpu));
            while !shared.stop.load(Ordering::Relaxed) {
                kernel.scheduler_pass();
                thread::yield_now();
            }
        });
    }

    {
        let shared = shared.clone();
        thread::spawn(move || {
            set_cpu(Some(timer_cpu));
            while !shared.stop.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(1));
                kernel.clock_tick();
            }
        });
    }

    let outcome = rx.recv_timeout(DRIVER_TIMEOUT);
    shared.stop.store(true, Ordering::Relaxed);
    let value = match outcome {
        Ok(Ok(value)) => value,
        Ok(Err(payload)) => panic::resume_unwind(payload),
        Err(_) => panic!("driver did not finish in {:?}", DRIVER_TIMEOUT),
    };

    let failures = shared.failures.lock().unwrap().clone();
    assert!(failures.is_empty(), "child processes panicked: {:?}", failures);
    value
}
