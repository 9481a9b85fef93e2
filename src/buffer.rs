//! Record Buffer Pool
//!
//! Fixed-capacity buffers used by client sessions to reassemble fragmented
//! service search attribute responses. A [`RecordPool`] is an arena of `N`
//! buffers of `SIZE` bytes each; a buffer stays claimed for as long as the
//! [`RecordBuf`] handed out by [`BufferPool::acquire`] is alive.

use core::cell::{RefCell, RefMut};

/// Source of reassembly buffers
pub trait BufferPool {
    /// Claim a free buffer, or `None` when the pool is exhausted
    fn acquire(&self) -> Option<RecordBuf<'_>>;
}

/// Claimed reassembly buffer
///
/// Bytes are appended at the tail and consumed from the head, so the buffer can
/// be filled fragment by fragment and then walked record by record.
#[derive(Debug)]
pub struct RecordBuf<'a> {
    storage: RefMut<'a, [u8]>,
    head: usize,
    tail: usize,
}

impl<'a> RecordBuf<'a> {
    /// Wrap claimed storage as an empty buffer
    #[must_use]
    pub fn new(storage: RefMut<'a, [u8]>) -> Self {
        Self {
            storage,
            head: 0,
            tail: 0,
        }
    }

    /// Total capacity in bytes
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of unread bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    /// Check if there are no unread bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Room left at the tail for appending
    #[must_use]
    pub fn tailroom(&self) -> usize {
        self.storage.len() - self.tail
    }

    /// Unread bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.storage[self.head..self.tail]
    }

    /// Append bytes at the tail.
    ///
    /// Returns `false` and copies nothing if the bytes do not fit.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.tailroom() {
            return false;
        }
        self.storage[self.tail..self.tail + bytes.len()].copy_from_slice(bytes);
        self.tail += bytes.len();
        true
    }

    /// Consume up to `count` bytes from the head, returning how many were consumed
    pub fn pull(&mut self, count: usize) -> usize {
        let count = count.min(self.len());
        self.head += count;
        count
    }

    /// Forget all contents and reclaim the full capacity
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}

/// Arena of `N` reassembly buffers of `SIZE` bytes
#[derive(Debug)]
pub struct RecordPool<const N: usize, const SIZE: usize> {
    slots: [RefCell<[u8; SIZE]>; N],
}

impl<const N: usize, const SIZE: usize> RecordPool<N, SIZE> {
    /// Create a pool with every buffer free
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| RefCell::new([0; SIZE])),
        }
    }

    /// Number of buffers currently free
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.try_borrow_mut().is_ok())
            .count()
    }
}

impl<const N: usize, const SIZE: usize> Default for RecordPool<N, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const SIZE: usize> BufferPool for RecordPool<N, SIZE> {
    fn acquire(&self) -> Option<RecordBuf<'_>> {
        self.slots.iter().find_map(|slot| {
            slot.try_borrow_mut()
                .ok()
                .map(|claimed| RecordBuf::new(RefMut::map(claimed, |bytes| &mut bytes[..])))
        })
    }
}
