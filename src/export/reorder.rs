use std::collections::BTreeMap;

/// Releases out-of-order completions strictly in sequence order.
///
/// Workers finish in any order; the writer pushes each result under its sequence number and
/// drains [`ReorderBuffer::pop_ready`] until it yields `None`.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> ReorderBuffer<T> {
    /// Buffer whose first released item is `first`.
    pub fn new(first: u64) -> Self {
        Self {
            next: first,
            pending: BTreeMap::new(),
        }
    }

    /// Store a completed item. Returns `false` (and drops it) for an already released or
    /// duplicate sequence number.
    pub fn push(&mut self, seq: u64, item: T) -> bool {
        if seq < self.next || self.pending.contains_key(&seq) {
            return false;
        }
        self.pending.insert(seq, item);
        true
    }

    /// Release the next item if it has arrived.
    pub fn pop_ready(&mut self) -> Option<(u64, T)> {
        let item = self.pending.remove(&self.next)?;
        let seq = self.next;
        self.next += 1;
        Some((seq, item))
    }

    /// Sequence number of the next item to release.
    pub fn next_seq(&self) -> u64 {
        self.next
    }

    /// Items waiting on an earlier gap.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Return `true` when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
