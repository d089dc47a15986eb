use std::mem;
use std::os::fd::RawFd;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::fiber::{Fiber, FiberId};
use crate::reactor::event::{Event, EventKind};
use crate::reactor::poller::{Backend, Readiness, SocketOp};
use crate::reactor::subs::SubscriptionBook;
use crate::time::Time;
use crate::utils::slab::Slab;

/// Subscription changes requested from outside the dispatch loop,
/// typically by a fiber body between two waits.
enum Directive {
    Monitor(RawFd, FiberId),
    RemoveSocket(RawFd),
    RemoveFiber(FiberId),
}

/// A clonable requester of subscription changes.
///
/// Directives are applied at the start of every [`Reactor::work`] call and
/// after each descriptor's dispatch, so a change requested inside a resume
/// takes effect for the remaining descriptors of the same pass. A directive
/// naming a fiber that has since completed is dropped silently.
#[derive(Clone)]
pub struct Handle {
    directives: Sender<Directive>,
}

impl Handle {
    /// Requests `monitor(fd, id)`.
    pub fn monitor(&self, fd: RawFd, id: FiberId) {
        let _ = self.directives.send(Directive::Monitor(fd, id));
    }

    /// Requests `remove_socket(fd)`.
    pub fn remove_socket(&self, fd: RawFd) {
        let _ = self.directives.send(Directive::RemoveSocket(fd));
    }

    /// Requests removal of every subscription of `id`.
    pub fn remove_fiber(&self, id: FiberId) {
        let _ = self.directives.send(Directive::RemoveFiber(id));
    }
}

/// The subscription-and-dispatch core.
///
/// A reactor watches a pool of descriptors through its backend `B` and
/// accepts subscriptions of fibers to descriptors. When a descriptor shows
/// readiness, every subscribed fiber is resumed with the corresponding
/// [`Event`]. The reactor does not read any data itself and makes no
/// assumption about the number of subscribers per descriptor.
///
/// Fibers live in a reactor-owned slot store; subscriptions hold their
/// [`FiberId`]s. A fiber whose body returns, and a fiber whose last
/// subscription disappears, is released automatically: fiber liveness is
/// coupled to the subscriptions that can still wake it.
pub struct Reactor<B: Backend> {
    fibers: Slab<Fiber>,
    subs: SubscriptionBook,
    backend: B,
    timeout: Time,

    // Reusable buffers so dispatch does not allocate in steady state.
    ready: Vec<Readiness>,
    snapshot: Vec<FiberId>,
    finished: Vec<FiberId>,
    unsubscribed: Vec<FiberId>,
    orphaned: Vec<RawFd>,

    directives: Receiver<Directive>,
    directive_tx: Sender<Directive>,
}

impl<B: Backend> Reactor<B> {
    /// Builds a reactor over an arbitrary backend.
    ///
    /// `timeout` bounds each [`work`](Reactor::work) call: negative blocks
    /// indefinitely, zero polls without blocking, positive values are
    /// truncated to whole milliseconds.
    pub fn with_backend(backend: B, timeout: Time) -> Reactor<B> {
        let (directive_tx, directives) = mpsc::channel();
        Reactor {
            fibers: Slab::with_capacity(16),
            subs: SubscriptionBook::new(),
            backend,
            timeout,
            ready: Vec::with_capacity(64),
            snapshot: Vec::with_capacity(16),
            finished: Vec::with_capacity(16),
            unsubscribed: Vec::with_capacity(16),
            orphaned: Vec::with_capacity(16),
            directives,
            directive_tx,
        }
    }

    /// Moves a started fiber into the reactor and returns its identity.
    pub fn adopt(&mut self, fiber: Fiber) -> FiberId {
        debug_assert!(fiber.started(), "adopt an unstarted fiber");
        self.fibers.insert(fiber)
    }

    /// Subscribes `id` to `fd`.
    ///
    /// The first subscription of a descriptor registers it with the
    /// backend before the pair is recorded. Monitoring an identical
    /// (descriptor, fiber) pair again is idempotent: no effect, no second
    /// backend registration.
    ///
    /// # Panics
    ///
    /// Panics if `fd` is negative. A stale `id` is a programming error
    /// (debug assertion; ignored in release builds).
    pub fn monitor(&mut self, fd: RawFd, id: FiberId) {
        assert!(fd >= 0, "file descriptor must be non-negative");
        debug_assert!(self.fibers.contains(id), "monitor with a stale fiber id");
        if !self.fibers.contains(id) {
            return;
        }
        if !self.subs.fd_subscribed(fd) {
            self.backend.socket_ops(fd, SocketOp::Added);
        }
        self.subs.insert(fd, id);
    }

    /// Removes every subscription to `fd` and deregisters it from the
    /// backend. Fibers left without any subscription are released. Removing
    /// a descriptor nobody subscribes to is a no-op.
    pub fn remove_socket(&mut self, fd: RawFd) {
        assert!(fd >= 0, "file descriptor must be non-negative");
        let mut unsubscribed = mem::take(&mut self.unsubscribed);
        unsubscribed.clear();
        if self.subs.remove_fd(fd, &mut unsubscribed) {
            self.backend.socket_ops(fd, SocketOp::Removed);
            for &id in &unsubscribed {
                if !self.subs.fiber_subscribed(id) {
                    drop(self.fibers.remove(id));
                }
            }
        }
        self.unsubscribed = unsubscribed;
    }

    /// Removes every subscription of `id`, deregistering descriptors that
    /// lost their last subscriber, and hands the fiber back to the caller.
    ///
    /// Returns `None` when the id is stale.
    pub fn remove_fiber(&mut self, id: FiberId) -> Option<Fiber> {
        let mut orphaned = mem::take(&mut self.orphaned);
        orphaned.clear();
        self.subs.remove_fiber(id, &mut orphaned);
        for &fd in &orphaned {
            self.backend.socket_ops(fd, SocketOp::Removed);
        }
        self.orphaned = orphaned;
        self.fibers.remove(id)
    }

    /// True while at least one subscription is active. The usual loop
    /// termination condition.
    pub fn active(&self) -> bool {
        !self.subs.is_empty()
    }

    /// Number of active subscriptions. Diagnostic.
    pub fn subscriptions(&self) -> usize {
        self.subs.len()
    }

    /// Number of fibers currently owned by the reactor. Diagnostic.
    pub fn fibers(&self) -> usize {
        self.fibers.len()
    }

    /// A clonable handle for requesting subscription changes from fiber
    /// bodies or other threads.
    pub fn handle(&self) -> Handle {
        Handle {
            directives: self.directive_tx.clone(),
        }
    }

    /// Runs one readiness pass: blocks up to the configured timeout, then
    /// dispatches every reported descriptor.
    ///
    /// Events are dispatched in the order the backend reported them; for
    /// one descriptor, the read flag is dispatched before error, error
    /// before hangup. Returns `false` only on a fatal multiplexer error.
    pub fn work(&mut self) -> bool {
        self.drain_directives();
        let mut ready = mem::take(&mut self.ready);
        ready.clear();
        let ok = self.backend.poll(&mut ready, self.timeout);
        if ok {
            for entry in &ready {
                if entry.readable {
                    self.notify_event(entry.fd, EventKind::Read);
                }
                if entry.error {
                    self.notify_event(entry.fd, EventKind::Error);
                }
                if entry.hangup {
                    self.notify_event(entry.fd, EventKind::Hangup);
                }
            }
        }
        self.ready = ready;
        ok
    }

    /// Resumes every subscriber of `fd` with an event of `kind`.
    ///
    /// The subscriber list is snapshotted up front, so joins and leaves
    /// performed as a side effect of a resume only affect later
    /// notifications. Fibers that report completion are removed after the
    /// iteration (removing them mid-scan would disturb it). An error or
    /// hangup additionally removes the descriptor itself, once.
    fn notify_event(&mut self, fd: RawFd, kind: EventKind) {
        // The descriptor may have been removed by an earlier event of the
        // same pass; its stale entries are skipped, not dispatched.
        if !self.subs.fd_subscribed(fd) {
            return;
        }
        let event = Event::new(kind, fd);

        let mut snapshot = mem::take(&mut self.snapshot);
        let mut finished = mem::take(&mut self.finished);
        snapshot.clear();
        finished.clear();
        self.subs.subscribers_of(fd, &mut snapshot);
        tracing::trace!(fd, ?kind, subscribers = snapshot.len(), "dispatch");

        for &id in &snapshot {
            let fiber = match self.fibers.get_mut(id) {
                Some(fiber) => fiber,
                None => continue,
            };
            if !fiber.resume(&event) {
                finished.push(id);
            }
        }
        for &id in &finished {
            drop(self.remove_fiber(id));
        }

        self.snapshot = snapshot;
        self.finished = finished;

        if matches!(kind, EventKind::Error | EventKind::Hangup) {
            self.remove_socket(fd);
        }
        self.drain_directives();
    }

    fn drain_directives(&mut self) {
        while let Ok(directive) = self.directives.try_recv() {
            match directive {
                Directive::Monitor(fd, id) => {
                    // The fiber may have completed since it sent this.
                    if fd >= 0 && self.fibers.contains(id) {
                        self.monitor(fd, id);
                    }
                }
                Directive::RemoveSocket(fd) => {
                    if fd >= 0 {
                        self.remove_socket(fd);
                    }
                }
                Directive::RemoveFiber(id) => {
                    drop(self.remove_fiber(id));
                }
            }
        }
    }
}

#[cfg(target_os = "linux")]
impl Reactor<crate::reactor::poller::EpollBackend> {
    /// Epoll reactor with the default event-buffer capacity.
    pub fn new(timeout: Time) -> crate::error::Result<Self> {
        Self::with_capacity(timeout, crate::reactor::poller::DEFAULT_EVENT_CAPACITY)
    }

    /// Epoll reactor with an event buffer of `max_events`.
    pub fn with_capacity(timeout: Time, max_events: usize) -> crate::error::Result<Self> {
        let backend = crate::reactor::poller::EpollBackend::new(max_events)?;
        Ok(Reactor::with_backend(backend, timeout))
    }
}

impl Reactor<crate::reactor::poller::ScanBackend> {
    /// Array-scan reactor. Cannot fail: nothing is registered until the
    /// first poll.
    pub fn new(timeout: Time) -> Self {
        Reactor::with_backend(crate::reactor::poller::ScanBackend::new(), timeout)
    }

    /// Number of dense-array rebuilds performed so far. Diagnostic.
    pub fn rebuilds(&self) -> u64 {
        self.backend.rebuilds()
    }
}
