//! Outbound byte ring.
//!
//! The ring never blocks: a byte that doesn't fit is refused and the caller
//! decides what to drop. Multi-byte sequences go through
//! [`TransmitQueue::enqueue_sequence`], which writes either every byte or
//! none, so a break code can never be split by an unrelated byte.

use tracing::warn;

/// Ring slots. One slot is always kept empty, so 31 bytes can be pending.
pub const QUEUE_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct TransmitQueue<const N: usize = QUEUE_CAPACITY> {
    buf: [u8; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> Default for TransmitQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TransmitQueue<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            head: 0,
            tail: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        (self.head + N - self.tail) % N
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn free(&self) -> usize {
        N - 1 - self.len()
    }

    pub fn has_space(&self, needed: usize) -> bool {
        self.free() >= needed
    }

    pub fn enqueue(&mut self, byte: u8) -> bool {
        let next = (self.head + 1) % N;
        if next == self.tail {
            warn!("PS2: send buffer full, dropping byte {byte:02X}");
            return false;
        }
        self.buf[self.head] = byte;
        self.head = next;
        true
    }

    pub fn enqueue_sequence(&mut self, bytes: &[u8]) -> bool {
        if !self.has_space(bytes.len()) {
            warn!(
                "PS2: send buffer has {} free, dropping sequence {:02X?}",
                self.free(),
                bytes
            );
            return false;
        }
        for &byte in bytes {
            self.buf[self.head] = byte;
            self.head = (self.head + 1) % N;
        }
        true
    }

    /// The byte that will be transmitted next, without consuming it.
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.buf[self.tail])
        }
    }

    /// Consume the head byte. Called only after it was sent successfully.
    pub fn pop(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.tail = (self.tail + 1) % N;
        Some(byte)
    }

    pub fn clear(&mut self) {
        self.tail = self.head;
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len()).map(move |i| self.buf[(self.tail + i) % N])
    }
}
