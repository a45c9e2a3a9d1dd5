//! Pending write counter
//!
//! Incremented on enqueue, decremented once the writer has attempted the
//! record, so shutdown can wait for the queue to drain.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
pub(crate) struct PendingWrites {
    count: Mutex<usize>,
    drained: Condvar,
}

impl PendingWrites {
    pub(crate) fn add(&self) {
        *self.count.lock() += 1;
    }

    pub(crate) fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    /// Drop every outstanding write and wake all waiters
    pub(crate) fn release_all(&self) {
        *self.count.lock() = 0;
        self.drained.notify_all();
    }

    /// Block until the count reaches zero
    pub(crate) fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self) -> usize {
        *self.count.lock()
    }
}
