//! Cross-thread dispatch onto the event loop
//!
//! The runtime is single-threaded; native worker threads must never touch
//! runtime memory directly. The dispatch queue is the one path across:
//! worker threads hold schedule-only tokens that can enqueue a request,
//! and the event-loop thread owns the [`DispatchPump`] that drains the
//! queue and executes the requests against pump-owned runtime references.
//!
//! Promoted callables and deferreds live inside the pump for exactly as
//! long as their remote token is alive; registration-scoped storage, not
//! a global table.

use crate::callback::CallableHandle;
use crate::error::ScheduleError;
use crate::runtime::DeferredResult;
use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use quay_core::{translate, ErrorEnvelope, ErrorPolicy, MarshalValue, Translated};
use rustc_hash::FxHashMap;

/// A dispatch request crossing from a worker thread to the loop thread.
enum Dispatch {
    /// Invoke a promoted callable with marshaled arguments
    Invoke {
        slot: u64,
        args: Vec<MarshalValue>,
    },
    /// Settle a promoted deferred
    Complete {
        slot: u64,
        result: Result<MarshalValue, ErrorEnvelope>,
    },
    /// Drop the pump-side registration for a slot
    Release { slot: u64 },
}

/// Create a connected token/pump pair.
///
/// The pump belongs to the event-loop thread; tokens may travel anywhere.
pub fn channel() -> (ScheduleToken, DispatchPump) {
    let (tx, rx) = unbounded();
    (
        ScheduleToken { tx: tx.clone() },
        DispatchPump {
            tx,
            rx,
            callables: FxHashMap::default(),
            deferreds: FxHashMap::default(),
            next_slot: 1,
        },
    )
}

/// Schedule-only token for the event loop.
///
/// Clonable and sendable; it can enqueue dispatch requests and nothing
/// else. Scheduling fails only when the pump is gone: the runtime has
/// been torn down.
#[derive(Clone)]
pub struct ScheduleToken {
    tx: Sender<Dispatch>,
}

impl ScheduleToken {
    fn post(&self, dispatch: Dispatch) -> Result<(), ScheduleError> {
        self.tx
            .send(dispatch)
            .map_err(|_| ScheduleError::Disconnected)
    }
}

/// A promoted callback: a Send token that schedules an invocation of a
/// pump-owned [`CallableHandle`] onto the loop thread.
///
/// Posting is fire-and-forget: the worker never observes the invocation
/// result, only whether scheduling itself succeeded. Posts on one token
/// are delivered in order.
pub struct RemoteCallback {
    slot: u64,
    token: ScheduleToken,
}

impl RemoteCallback {
    /// Schedule an invocation with the given arguments.
    pub fn post(&self, args: Vec<MarshalValue>) -> Result<(), ScheduleError> {
        self.token.post(Dispatch::Invoke {
            slot: self.slot,
            args,
        })
    }
}

impl Drop for RemoteCallback {
    fn drop(&mut self) {
        // Pump already gone means nothing left to release
        let _ = self.token.post(Dispatch::Release { slot: self.slot });
    }
}

/// A promoted deferred: a Send token that settles a pump-owned
/// [`DeferredResult`] from a worker thread.
pub struct RemoteResolver {
    slot: u64,
    token: ScheduleToken,
    settled: bool,
}

impl RemoteResolver {
    /// Schedule completion with the work's outcome. Consumes the resolver;
    /// a deferred settles exactly once.
    pub fn complete(
        mut self,
        result: Result<MarshalValue, ErrorEnvelope>,
    ) -> Result<(), ScheduleError> {
        self.settled = true;
        self.token.post(Dispatch::Complete {
            slot: self.slot,
            result,
        })
    }
}

impl Drop for RemoteResolver {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self.token.post(Dispatch::Release { slot: self.slot });
        }
    }
}

struct PromotedDeferred {
    deferred: Box<dyn DeferredResult>,
    policy: ErrorPolicy,
}

/// Loop-thread side of the dispatch queue.
///
/// Owns every promoted runtime reference and executes queued requests
/// when the event loop drains it.
pub struct DispatchPump {
    tx: Sender<Dispatch>,
    rx: Receiver<Dispatch>,
    callables: FxHashMap<u64, CallableHandle>,
    deferreds: FxHashMap<u64, PromotedDeferred>,
    next_slot: u64,
}

impl DispatchPump {
    /// Mint a schedule-only token for this pump.
    pub fn token(&self) -> ScheduleToken {
        ScheduleToken {
            tx: self.tx.clone(),
        }
    }

    /// Promote a callable handle for cross-thread use.
    ///
    /// The handle moves into the pump; the returned token is the only way
    /// to reach it from another thread. The registration is released when
    /// the token drops.
    pub fn promote(&mut self, handle: CallableHandle) -> RemoteCallback {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.callables.insert(slot, handle);
        RemoteCallback {
            slot,
            token: self.token(),
        }
    }

    /// Promote a deferred result for cross-thread completion.
    ///
    /// Failures settle the deferred under the given call-site policy:
    /// throwing rejects with the error payload, suppressing resolves with
    /// it.
    pub fn promote_deferred(
        &mut self,
        deferred: Box<dyn DeferredResult>,
        policy: ErrorPolicy,
    ) -> RemoteResolver {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.deferreds.insert(slot, PromotedDeferred { deferred, policy });
        RemoteResolver {
            slot,
            token: self.token(),
            settled: false,
        }
    }

    /// Number of live promoted registrations.
    pub fn registered(&self) -> usize {
        self.callables.len() + self.deferreds.len()
    }

    /// Drain and execute every pending dispatch. Returns the number of
    /// requests processed. Call from the event-loop thread only.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let dispatch = match self.rx.try_recv() {
                Ok(d) => d,
                Err(TryRecvError::Empty) => break,
                // The pump holds its own sender, so this arm is unreachable
                // until the pump itself is dropped
                Err(TryRecvError::Disconnected) => break,
            };
            processed += 1;
            match dispatch {
                Dispatch::Invoke { slot, args } => {
                    if let Some(handle) = self.callables.get(&slot) {
                        if let Err(_err) = handle.invoke(&args) {
                            // Fire-and-forget from the worker's side; there
                            // is no channel to report this back on
                            #[cfg(debug_assertions)]
                            eprintln!("dispatch: callback slot {} failed: {}", slot, _err);
                        }
                    }
                }
                Dispatch::Complete { slot, result } => {
                    if let Some(entry) = self.deferreds.remove(&slot) {
                        match result {
                            Ok(value) => entry.deferred.resolve(value),
                            Err(envelope) => match translate(&envelope, entry.policy) {
                                Translated::Thrown(payload) => entry.deferred.reject(payload),
                                Translated::Returned(payload) => entry.deferred.resolve(payload),
                            },
                        }
                    }
                }
                Dispatch::Release { slot } => {
                    self.callables.remove(&slot);
                    self.deferreds.remove(&slot);
                }
            }
        }
        processed
    }
}
