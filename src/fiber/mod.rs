//! Stackful light threads.
//!
//! A [`Fiber`] runs a user body that cooperatively yields with
//! [`Yielder::wait`] and is driven forward with [`Fiber::resume`]. The two
//! calls alternate strictly: a fiber is either *ready* (its next step is
//! `resume`) or *running* (its next step is `wait`), never both.
//!
//! Each fiber owns a dedicated stack of the size requested in
//! [`Fiber::start`]. The handoff between resumer and body is a rendezvous:
//! exactly one side is runnable at any instant, so everything the body
//! touches between two `wait` calls happens strictly between the
//! surrounding `resume` calls, with no locking. A body that blocks between
//! waits blocks its entire reactor.
//!
//! Lifecycle:
//! 1. [`Fiber::new`] records the body; no stack exists yet.
//! 2. [`Fiber::start`] allocates the stack and runs the body up to its
//!    first `wait`.
//! 3. The reactor alternates [`Fiber::resume`] with the body's `wait`.
//! 4. When the body returns, the next pending `resume` reports completion
//!    by returning `false`; the fiber is then terminal.
//! 5. Dropping the fiber releases the stack, exactly once.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};
use crate::reactor::event::Event;

/// Identity of a fiber adopted by a reactor.
///
/// Subscriptions store these instead of references; a recycled slot yields
/// a fresh generation, so a stale id is detected rather than misdirected.
pub type FiberId = crate::utils::slab::Key;

/// What the fiber reports back at each handoff.
enum Signal {
    /// The body reached `wait` and yielded.
    Yielded,
    /// The body returned; the fiber is done.
    Done,
}

/// Panic payload used to unwind a body whose controlling [`Fiber`] was
/// dropped while the body was parked in `wait`.
struct Detached;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Ready,
    Done,
}

/// The yield handle passed to a fiber body.
pub struct Yielder {
    events: Receiver<Event>,
    signals: SyncSender<Signal>,
}

impl Yielder {
    /// Yields to the resumer and blocks until the next event is delivered.
    pub fn wait(&mut self) -> Event {
        if self.signals.send(Signal::Yielded).is_err() {
            panic::panic_any(Detached);
        }
        match self.events.recv() {
            Ok(event) => event,
            Err(_) => panic::panic_any(Detached),
        }
    }
}

/// A stackful coroutine with an owned stack.
pub struct Fiber {
    body: Option<Box<dyn FnOnce(&mut Yielder) + Send + 'static>>,
    events: Option<SyncSender<Event>>,
    signals: Option<Receiver<Signal>>,
    join: Option<JoinHandle<()>>,
    stack_size: usize,
    state: State,
}

impl Fiber {
    /// Wraps a body. The fiber does nothing until [`start`](Fiber::start).
    pub fn new<F>(body: F) -> Fiber
    where
        F: FnOnce(&mut Yielder) + Send + 'static,
    {
        Fiber {
            body: Some(Box::new(body)),
            events: None,
            signals: None,
            join: None,
            stack_size: 0,
            state: State::Created,
        }
    }

    /// Allocates a stack of at least `stack_size` bytes and runs the body
    /// up to its first `wait`.
    ///
    /// The platform rounds the size up to its minimum and places a guard
    /// page below the stack. Starting an already started fiber is a no-op.
    /// Allocation failure is fatal to the fiber.
    pub fn start(&mut self, stack_size: usize) -> Result<()> {
        if self.state != State::Created {
            return Ok(());
        }
        let body = match self.body.take() {
            Some(body) => body,
            None => return Ok(()),
        };

        let (event_tx, event_rx) = mpsc::sync_channel::<Event>(0);
        let (signal_tx, signal_rx) = mpsc::sync_channel::<Signal>(0);
        let done_tx = signal_tx.clone();

        let join = thread::Builder::new()
            .name("fiber".into())
            .stack_size(stack_size)
            .spawn(move || {
                let mut yielder = Yielder {
                    events: event_rx,
                    signals: signal_tx,
                };
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut yielder)));
                match outcome {
                    Ok(()) => {
                        let _ = done_tx.send(Signal::Done);
                    }
                    Err(payload) => {
                        if payload.downcast_ref::<Detached>().is_none() {
                            tracing::error!("fiber body panicked; treating as completion");
                            let _ = done_tx.send(Signal::Done);
                        }
                    }
                }
            })
            .map_err(Error::Stack)?;

        let state = match signal_rx.recv() {
            Ok(Signal::Yielded) => State::Ready,
            Ok(Signal::Done) | Err(_) => State::Done,
        };

        self.stack_size = stack_size;
        self.events = Some(event_tx);
        self.signals = Some(signal_rx);
        self.join = Some(join);
        self.state = state;
        Ok(())
    }

    /// Delivers `event` to the parked body and runs it to its next `wait`.
    ///
    /// Returns `true` if the body yielded again and `false` if it returned,
    /// in which case the fiber is terminal. Resuming a terminal fiber is a
    /// programming error (debug assertion; a no-op returning `false` in
    /// release builds).
    pub fn resume(&mut self, event: &Event) -> bool {
        debug_assert!(self.state != State::Created, "resume before start");
        debug_assert!(self.state != State::Done, "resume on a completed fiber");
        if self.state != State::Ready {
            return false;
        }

        let delivered = match self.events.as_ref() {
            Some(events) => events.send(*event).is_ok(),
            None => false,
        };
        if !delivered {
            self.state = State::Done;
            return false;
        }

        let signal = self.signals.as_ref().map(|signals| signals.recv());
        match signal {
            Some(Ok(Signal::Yielded)) => true,
            _ => {
                self.state = State::Done;
                false
            }
        }
    }

    /// True once [`start`](Fiber::start) has run.
    pub fn started(&self) -> bool {
        self.state != State::Created
    }

    /// True once the body has returned.
    pub fn finished(&self) -> bool {
        self.state == State::Done
    }

    /// The stack size requested at start, or zero before then.
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }
}

impl Drop for Fiber {
    fn drop(&mut self) {
        // Disconnect both handoff channels first: a body parked in `wait`
        // observes the disconnect and unwinds, so the join below cannot
        // hang and the stack is released exactly once.
        drop(self.events.take());
        drop(self.signals.take());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
