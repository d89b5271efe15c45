use std::collections::VecDeque;
use std::fmt;

use futures::future::BoxFuture;

/// A deferred operation. It delivers its own result to the waiting caller
/// and resolves to `true` if the operation succeeded.
pub(crate) type Job = Box<dyn FnOnce() -> BoxFuture<'static, bool> + Send>;

/// Bounded FIFO of deferred operations for one key, together with the flag
/// telling whether a drain loop currently owns the queue.
///
/// Both live behind the same lock, so that pushing, popping and setting or
/// clearing the flag can never interleave.
pub(crate) struct OverflowQueue {
    jobs: VecDeque<Job>,
    capacity: usize,
    draining: bool,
}

impl OverflowQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            capacity,
            draining: false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.jobs.len()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a job. Returns it back if the queue is full; existing entries
    /// are never evicted.
    pub(crate) fn push(&mut self, job: Job) -> Result<(), Job> {
        if self.is_full() {
            return Err(job);
        }
        self.jobs.push_back(job);
        Ok(())
    }

    /// Claim the queue for a new drain loop.
    ///
    /// Returns `true` if the caller has to spawn the loop: there is work and
    /// nobody is draining yet.
    pub(crate) fn begin_drain(&mut self) -> bool {
        if self.draining || self.jobs.is_empty() {
            return false;
        }
        self.draining = true;
        true
    }

    /// Take the next job for the running drain loop, releasing the claim when
    /// there is nothing left.
    pub(crate) fn pop_or_finish(&mut self) -> Option<Job> {
        let job = self.jobs.pop_front();
        if job.is_none() {
            self.draining = false;
        }
        job
    }

    /// Release the claim if the queue ran empty. Returns `true` if the drain
    /// loop is done.
    pub(crate) fn finish_if_empty(&mut self) -> bool {
        if self.jobs.is_empty() {
            self.draining = false;
            return true;
        }
        false
    }

    pub(crate) const fn is_draining(&self) -> bool {
        self.draining
    }
}

impl fmt::Debug for OverflowQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverflowQueue")
            .field("len", &self.jobs.len())
            .field("capacity", &self.capacity)
            .field("draining", &self.draining)
            .finish()
    }
}
