//! The dual-keyed subscription store.
//!
//! Every subscription, a (descriptor, fiber) pair, is held in two ordered
//! sets at once: one sorted by descriptor first (the dispatch order) and
//! one sorted by fiber first (the removal order). Both removal paths are
//! range scans instead of full sweeps. Every mutation goes through this
//! module in coherent pairs, keeping the sets exact mirrors of each other.

use std::collections::BTreeSet;
use std::os::fd::RawFd;

use crate::fiber::FiberId;

pub(crate) struct SubscriptionBook {
    by_fd: BTreeSet<(RawFd, FiberId)>,
    by_fiber: BTreeSet<(FiberId, RawFd)>,
}

impl SubscriptionBook {
    pub(crate) fn new() -> SubscriptionBook {
        SubscriptionBook {
            by_fd: BTreeSet::new(),
            by_fiber: BTreeSet::new(),
        }
    }

    /// Inserts the pair into both sets. Returns `false` when it was
    /// already present (insertion is idempotent).
    pub(crate) fn insert(&mut self, fd: RawFd, id: FiberId) -> bool {
        let fresh = self.by_fd.insert((fd, id));
        let mirror = self.by_fiber.insert((id, fd));
        debug_assert_eq!(fresh, mirror);
        self.check_coherence();
        fresh
    }

    /// Removes one pair from both sets. Returns `true` when it existed.
    pub(crate) fn remove(&mut self, fd: RawFd, id: FiberId) -> bool {
        let had = self.by_fd.remove(&(fd, id));
        let mirror = self.by_fiber.remove(&(id, fd));
        debug_assert_eq!(had, mirror);
        self.check_coherence();
        had
    }

    /// True when `id` still holds at least one subscription.
    pub(crate) fn fiber_subscribed(&self, id: FiberId) -> bool {
        self.by_fiber
            .range((id, 0)..=(id, RawFd::MAX))
            .next()
            .is_some()
    }

    /// True when at least one fiber is subscribed to `fd`.
    pub(crate) fn fd_subscribed(&self, fd: RawFd) -> bool {
        self.by_fd
            .range((fd, FiberId::MIN)..=(fd, FiberId::MAX))
            .next()
            .is_some()
    }

    /// Appends the subscribers of `fd` to `out`, in dispatch order
    /// (fiber identity ascending).
    pub(crate) fn subscribers_of(&self, fd: RawFd, out: &mut Vec<FiberId>) {
        out.extend(
            self.by_fd
                .range((fd, FiberId::MIN)..=(fd, FiberId::MAX))
                .map(|&(_, id)| id),
        );
    }

    /// Appends the descriptors `id` is subscribed to, ascending.
    pub(crate) fn fds_of(&self, id: FiberId, out: &mut Vec<RawFd>) {
        out.extend(
            self.by_fiber
                .range((id, 0)..=(id, RawFd::MAX))
                .map(|&(_, fd)| fd),
        );
    }

    /// Removes every subscription to `fd`, appending the fibers that held
    /// one to `removed`. Returns `true` when anything was removed.
    pub(crate) fn remove_fd(&mut self, fd: RawFd, removed: &mut Vec<FiberId>) -> bool {
        let start = removed.len();
        self.subscribers_of(fd, removed);
        for index in start..removed.len() {
            let id = removed[index];
            self.remove(fd, id);
        }
        removed.len() > start
    }

    /// Removes every subscription of `id`, appending the descriptors that
    /// lost their last subscriber to `orphaned`.
    pub(crate) fn remove_fiber(&mut self, id: FiberId, orphaned: &mut Vec<RawFd>) {
        let start = orphaned.len();
        self.fds_of(id, orphaned);
        let mut keep = start;
        for index in start..orphaned.len() {
            let fd = orphaned[index];
            self.remove(fd, id);
            if !self.fd_subscribed(fd) {
                orphaned[keep] = fd;
                keep += 1;
            }
        }
        orphaned.truncate(keep);
    }

    pub(crate) fn len(&self) -> usize {
        self.by_fd.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_fd.is_empty()
    }

    #[cfg(debug_assertions)]
    fn check_coherence(&self) {
        assert_eq!(self.by_fd.len(), self.by_fiber.len());
        for &(fd, id) in &self.by_fd {
            assert!(self.by_fiber.contains(&(id, fd)));
        }
    }

    #[cfg(not(debug_assertions))]
    fn check_coherence(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::slab::Slab;

    fn ids(n: usize) -> Vec<FiberId> {
        let mut slab = Slab::with_capacity(n);
        (0..n).map(|v| slab.insert(v)).collect()
    }

    #[test]
    fn insert_is_idempotent() {
        let mut book = SubscriptionBook::new();
        let id = ids(1)[0];
        assert!(book.insert(5, id));
        assert!(!book.insert(5, id));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn remove_fd_reports_subscribers() {
        let mut book = SubscriptionBook::new();
        let fibers = ids(2);
        book.insert(3, fibers[0]);
        book.insert(3, fibers[1]);
        book.insert(7, fibers[0]);

        let mut removed = Vec::new();
        assert!(book.remove_fd(3, &mut removed));
        assert_eq!(removed, fibers);
        assert_eq!(book.len(), 1);
        assert!(!book.fd_subscribed(3));
        assert!(book.fd_subscribed(7));
    }

    #[test]
    fn remove_fiber_reports_orphaned_fds() {
        let mut book = SubscriptionBook::new();
        let fibers = ids(2);
        book.insert(3, fibers[0]);
        book.insert(3, fibers[1]);
        book.insert(7, fibers[0]);

        let mut orphaned = Vec::new();
        book.remove_fiber(fibers[0], &mut orphaned);
        // fd 3 still has the second fiber; fd 7 lost its last subscriber.
        assert_eq!(orphaned, vec![7]);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn subscribers_come_back_in_identity_order() {
        let mut book = SubscriptionBook::new();
        let fibers = ids(3);
        book.insert(9, fibers[2]);
        book.insert(9, fibers[0]);
        book.insert(9, fibers[1]);

        let mut out = Vec::new();
        book.subscribers_of(9, &mut out);
        assert_eq!(out, fibers);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut book = SubscriptionBook::new();
        let id = ids(1)[0];
        assert!(!book.remove(11, id));
        let mut removed = Vec::new();
        assert!(!book.remove_fd(11, &mut removed));
        assert!(removed.is_empty());
        assert!(book.is_empty());
    }
}
