//! Native worker threads with a runtime callback channel
//!
//! A worker runs a [`WorkerLoop`] on its own native thread. Each turn it
//! receives the messages sent since the last turn and may emit a value
//! through the promoted callback; the emission is scheduled onto the
//! event loop, never executed on the worker thread. When the loop exits
//! (own decision or shutdown request) the worker posts one terminal
//! sentinel value, guaranteed to be the last invocation the callback
//! receives for this worker, and transitions to `Terminated`.

use crate::dispatch::RemoteCallback;
use crate::error::ThreadError;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use quay_core::MarshalValue;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long an idle worker parks before taking another turn
const STEP_INTERVAL: Duration = Duration::from_millis(1);

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Spawned, thread not yet running its loop
    Created,
    /// Loop running; `send` is accepted
    Running,
    /// Shutdown observed or requested; the terminal sentinel is pending
    ShuttingDown,
    /// Loop exited and the sentinel was posted
    Terminated,
}

impl WorkerState {
    fn from_u8(v: u8) -> WorkerState {
        match v {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::ShuttingDown,
            _ => WorkerState::Terminated,
        }
    }

    /// State name for diagnostics
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Created => "created",
            WorkerState::Running => "running",
            WorkerState::ShuttingDown => "shutting-down",
            WorkerState::Terminated => "terminated",
        }
    }
}

/// Outcome of one worker turn.
pub enum Step {
    /// Emit a value through the callback and keep running
    Emit(MarshalValue),
    /// Keep running without emitting
    Idle,
    /// Stop the loop; the terminal sentinel follows
    Exit,
}

/// The native logic a worker thread runs.
///
/// `step` is called once per turn with every message received since the
/// previous turn (empty when idle). `finale` produces the terminal
/// sentinel posted after the loop exits.
pub trait WorkerLoop: Send + 'static {
    /// Take one turn
    fn step(&mut self, messages: Vec<MarshalValue>) -> Step;

    /// The terminal sentinel value
    fn finale(&mut self) -> MarshalValue {
        MarshalValue::int(-1)
    }
}

struct Shared {
    state: AtomicU8,
    shutdown: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Created as u8),
            shutdown: AtomicBool::new(false),
        }
    }

    fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Spawn a worker thread driving the given loop.
///
/// The promoted callback moves into the worker; emissions and the
/// terminal sentinel are posted through it in order.
pub fn spawn<W: WorkerLoop>(
    worker: W,
    callback: RemoteCallback,
) -> Result<WorkerHandle, ThreadError> {
    let (tx, rx) = unbounded();
    let shared = Arc::new(Shared::new());
    let inner = shared.clone();
    let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);

    let handle = thread::Builder::new()
        .name(format!("quay-worker-{}", id))
        .spawn(move || run_loop(worker, rx, callback, inner))
        .map_err(|e| ThreadError::Spawn(e.to_string()))?;

    Ok(WorkerHandle {
        shared,
        tx,
        handle: Some(handle),
    })
}

fn run_loop<W: WorkerLoop>(
    mut worker: W,
    rx: Receiver<MarshalValue>,
    callback: RemoteCallback,
    shared: Arc<Shared>,
) {
    // A shutdown requested before the thread started must not regress
    let _ = shared.state.compare_exchange(
        WorkerState::Created as u8,
        WorkerState::Running as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
    );

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        // Gather everything sent since the last turn; park briefly if idle
        let mut messages = Vec::new();
        match rx.recv_timeout(STEP_INTERVAL) {
            Ok(message) => {
                messages.push(message);
                while let Ok(message) = rx.try_recv() {
                    messages.push(message);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        match worker.step(messages) {
            Step::Emit(value) => {
                // Scheduling fails only when the runtime is torn down
                if callback.post(vec![value]).is_err() {
                    break;
                }
            }
            Step::Idle => {}
            Step::Exit => break,
        }
    }

    shared.set_state(WorkerState::ShuttingDown);
    let _ = callback.post(vec![worker.finale()]);
    shared.set_state(WorkerState::Terminated);
}

/// Owned handle to a spawned worker thread.
///
/// Exactly one handle exists per spawn. Dropping a handle whose worker has
/// not yet terminated requests shutdown and joins the thread; no worker
/// outlives its owner.
pub struct WorkerHandle {
    shared: Arc<Shared>,
    tx: Sender<MarshalValue>,
    handle: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    /// Send a message consumed by the worker's next turn.
    ///
    /// Succeeds only while the worker is `Running`.
    pub fn send(&self, message: MarshalValue) -> Result<(), ThreadError> {
        let state = self.state();
        if state != WorkerState::Running {
            return Err(ThreadError::NotRunning(state.as_str()));
        }
        self.tx
            .send(message)
            .map_err(|_| ThreadError::NotRunning(WorkerState::Terminated.as_str()))
    }

    /// Request shutdown. Idempotent and asynchronous: the worker observes
    /// the request at its next checkpoint and answers through the terminal
    /// sentinel, not through this call.
    pub fn request_shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
        // Move the externally visible state forward so `send` starts
        // failing immediately; the worker finishes the transition itself.
        for from in [WorkerState::Created, WorkerState::Running] {
            let _ = self.shared.state.compare_exchange(
                from as u8,
                WorkerState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    /// Wait for the worker to terminate.
    pub fn join(mut self) -> Result<(), ThreadError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ThreadError::Join),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if self.state() != WorkerState::Terminated {
                self.request_shutdown();
            }
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{CallableHandle, Capability, Signature};
    use crate::dispatch;
    use quay_core::Shape;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct NullWorker;

    impl WorkerLoop for NullWorker {
        fn step(&mut self, _messages: Vec<MarshalValue>) -> Step {
            Step::Idle
        }
    }

    fn promoted_log(
        pump: &mut dispatch::DispatchPump,
    ) -> (dispatch::RemoteCallback, Rc<RefCell<Vec<f64>>>) {
        let log: Rc<RefCell<Vec<f64>>> = Rc::new(RefCell::new(Vec::new()));
        let inner = log.clone();
        let handle = CallableHandle::from_fn(
            move |args: &[MarshalValue]| {
                inner
                    .borrow_mut()
                    .push(args[0].as_number().unwrap_or(f64::NAN));
                Ok(MarshalValue::Null)
            },
            Capability::Reentrant,
            Signature::new(vec![Shape::Integer]),
        );
        (pump.promote(handle), log)
    }

    #[test]
    fn test_shutdown_posts_sentinel_last() {
        let (_token, mut pump) = dispatch::channel();
        let (remote, log) = promoted_log(&mut pump);

        let handle = spawn(NullWorker, remote).unwrap();
        handle.request_shutdown();
        handle.join().unwrap();
        pump.drain();

        assert_eq!(*log.borrow(), vec![-1.0]);
    }

    #[test]
    fn test_send_fails_when_not_running() {
        let (_token, mut pump) = dispatch::channel();
        let (remote, _log) = promoted_log(&mut pump);

        let handle = spawn(NullWorker, remote).unwrap();
        handle.request_shutdown();
        while handle.state() != WorkerState::Terminated {
            std::thread::yield_now();
        }
        assert_eq!(
            handle.send(MarshalValue::int(1)),
            Err(ThreadError::NotRunning("terminated"))
        );
    }

    #[test]
    fn test_request_shutdown_is_idempotent() {
        let (_token, mut pump) = dispatch::channel();
        let (remote, log) = promoted_log(&mut pump);

        let handle = spawn(NullWorker, remote).unwrap();
        handle.request_shutdown();
        handle.request_shutdown();
        handle.join().unwrap();
        pump.drain();
        // One sentinel, not two
        assert_eq!(*log.borrow(), vec![-1.0]);
    }

    #[test]
    fn test_drop_joins_unterminated_worker() {
        let (_token, mut pump) = dispatch::channel();
        let (remote, log) = promoted_log(&mut pump);

        {
            let _handle = spawn(NullWorker, remote).unwrap();
            // Dropped while running
        }
        pump.drain();
        assert_eq!(*log.borrow(), vec![-1.0]);
    }
}
