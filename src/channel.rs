// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Closeable FIFO/broadcast channels.
//
// A channel is one closed flag plus one broadcast log, both guarded by the
// same `Waiter`. Every handle owns a cursor into the log. Each operation
// below is a single transaction over the flag and the handle's view of the
// log, so "empty and closed" is never observed half-way through a write or
// a close.
//
// This provides two handle types:
// - `Channel`          — read/write handle with its own cursor
// - `BroadcastChannel` — write-only handle; readers come from `subscribe`

use std::iter::FusedIterator;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::Config;
use crate::queue::{BroadcastQueue, CursorKey};
use crate::waiter::{Step, Waiter};

/// Result of a non-blocking read or peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TryRead<T> {
    /// An item was available.
    Value(T),
    /// Nothing to read right now, but the channel is still open.
    Empty,
    /// Nothing to read and the channel is closed: end of stream.
    Closed,
}

impl<T> TryRead<T> {
    /// The item, if there was one.
    pub fn value(self) -> Option<T> {
        match self {
            TryRead::Value(v) => Some(v),
            TryRead::Empty | TryRead::Closed => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, TryRead::Value(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TryRead::Empty)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TryRead::Closed)
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct State<T> {
    closed: bool,
    queue: BroadcastQueue<T>,
}

/// State shared by every handle of one channel.
struct Core<T> {
    waiter: Waiter<State<T>>,
}

impl<T> Core<T> {
    fn new(config: &Config) -> Arc<Self> {
        let state = State {
            closed: false,
            queue: BroadcastQueue::with_capacity(config.initial_capacity),
        };
        trace!(
            spin_count = config.spin_count,
            capacity = config.initial_capacity,
            "channel created"
        );
        Arc::new(Self {
            waiter: Waiter::with_spin_count(state, config.spin_count),
        })
    }

    fn subscribe(self: &Arc<Self>) -> Channel<T> {
        let key = self.waiter.with(|s| s.queue.subscribe());
        trace!(key, "cursor subscribed");
        Channel {
            core: Arc::clone(self),
            key,
        }
    }

    fn write(&self, value: T) {
        let written = self.waiter.with(|s| {
            if s.closed {
                return false;
            }
            s.queue.push(value);
            true
        });
        if written {
            self.waiter.broadcast();
        }
    }

    fn close(&self) {
        let transitioned = self.waiter.with(|s| {
            if s.closed {
                return None;
            }
            s.closed = true;
            Some(s.queue.readers())
        });
        if let Some(readers) = transitioned {
            debug!(readers, "channel closed");
            self.waiter.broadcast();
        }
    }

    fn is_closed(&self) -> bool {
        self.waiter.with(|s| s.closed)
    }

    fn receiver_count(&self) -> usize {
        self.waiter.with(|s| s.queue.readers())
    }
}

// ---------------------------------------------------------------------------
// Channel — read/write handle
// ---------------------------------------------------------------------------

/// A handle to a closeable broadcast channel.
///
/// Every handle has its own read position. Handles made with
/// [`duplicate`](Channel::duplicate) receive every item written after they
/// were made, by any handle; handles made with `clone` additionally start
/// with the source's unread items. Closing through any handle closes the
/// channel for all of them.
///
/// Items written after the channel is closed are silently discarded. Items
/// written before the close are still delivered: reads only report end of
/// stream once the handle's view is empty *and* the channel is closed.
///
/// Reading requires `T: Clone` because an item may be delivered to more
/// than one handle; the last handle to consume an item gets it by move.
pub struct Channel<T> {
    core: Arc<Core<T>>,
    key: CursorKey,
}

impl<T> Channel<T> {
    /// Create an open, empty channel.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Create an open, empty channel with explicit tunables.
    pub fn with_config(config: &Config) -> Self {
        Core::new(config).subscribe()
    }

    /// New handle on the same channel that sees only items written from now
    /// on. The source handle is not affected.
    pub fn duplicate(&self) -> Channel<T> {
        self.core.subscribe()
    }

    /// Append `value` for every handle of the channel.
    /// Does nothing if the channel is closed. Never blocks.
    pub fn write(&self, value: T) {
        self.core.write(value);
    }

    /// Make `value` the next item this handle reads.
    /// Other handles are not affected. Does nothing if the channel is closed.
    pub fn unget(&self, value: T) {
        let pushed = self.core.waiter.with(|s| {
            if s.closed {
                return false;
            }
            s.queue.unget(self.key, value);
            true
        });
        if pushed {
            self.core.waiter.broadcast();
        }
    }

    /// Close the channel for every handle and wake all blocked readers.
    /// Closing an already closed channel has no effect.
    pub fn close(&self) {
        self.core.close();
    }

    /// Whether the channel has been closed.
    ///
    /// Advisory only: the answer may be stale by the time it is used. Use
    /// [`try_read`](Channel::try_read) to detect end of stream.
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Whether this handle currently has nothing to read. Advisory only.
    pub fn is_empty(&self) -> bool {
        self.core.waiter.with(|s| s.queue.is_empty(self.key))
    }

    /// Number of live read handles on this channel. Advisory only.
    pub fn receiver_count(&self) -> usize {
        self.core.receiver_count()
    }

    /// Whether `self` and `other` are handles of the same channel.
    pub fn same_channel(&self, other: &Channel<T>) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl<T: Clone> Channel<T> {
    /// Remove and return the next item, blocking while the channel is open
    /// and this handle has nothing to read.
    ///
    /// Returns `None` only at end of stream.
    pub fn read(&self) -> Option<T> {
        self.core.waiter.atomically(|s| match s.queue.pop(self.key) {
            Some(v) => Step::Done(Some(v)),
            None if s.closed => Step::Done(None),
            None => Step::Retry,
        })
    }

    /// Remove and return the next item without blocking.
    pub fn try_read(&self) -> TryRead<T> {
        self.core.waiter.with(|s| match s.queue.pop(self.key) {
            Some(v) => TryRead::Value(v),
            None if s.closed => TryRead::Closed,
            None => TryRead::Empty,
        })
    }

    /// Like [`read`](Channel::read) but leaves the item in place.
    pub fn peek(&self) -> Option<T> {
        self.core.waiter.atomically(|s| match s.queue.peek(self.key) {
            Some(v) => Step::Done(Some(v)),
            None if s.closed => Step::Done(None),
            None => Step::Retry,
        })
    }

    /// Like [`try_read`](Channel::try_read) but leaves the item in place.
    pub fn try_peek(&self) -> TryRead<T> {
        self.core.waiter.with(|s| match s.queue.peek(self.key) {
            Some(v) => TryRead::Value(v),
            None if s.closed => TryRead::Closed,
            None => TryRead::Empty,
        })
    }

    /// Blocking iterator that ends at end of stream.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { chan: self }
    }

    /// Iterator over the items available right now. Never blocks.
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { chan: self }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A new handle positioned where this one is: it sees this handle's unread
/// items, including ones pushed back with `unget`, and every future write.
impl<T: Clone> Clone for Channel<T> {
    fn clone(&self) -> Self {
        let key = self.core.waiter.with(|s| s.queue.fork(self.key));
        trace!(from = self.key, key, "cursor cloned");
        Self {
            core: Arc::clone(&self.core),
            key,
        }
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        let key = self.key;
        self.core.waiter.with(|s| s.queue.unsubscribe(key));
        trace!(key, "cursor released");
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("key", &self.key)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<'a, T: Clone> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Blocking iterator returned by [`Channel::iter`].
pub struct Iter<'a, T> {
    chan: &'a Channel<T>,
}

impl<T: Clone> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chan.read()
    }
}

// Once end of stream is reached no write or unget is honoured again.
impl<T: Clone> FusedIterator for Iter<'_, T> {}

/// Non-blocking iterator returned by [`Channel::try_iter`].
pub struct TryIter<'a, T> {
    chan: &'a Channel<T>,
}

impl<T: Clone> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.chan.try_read().value()
    }
}

// ---------------------------------------------------------------------------
// BroadcastChannel — write-only handle
// ---------------------------------------------------------------------------

/// A write-only handle to a closeable broadcast channel.
///
/// It has no read position of its own: items written are delivered to the
/// handles obtained from [`subscribe`](BroadcastChannel::subscribe), and
/// discarded when there are none. Cloning yields another write handle.
pub struct BroadcastChannel<T> {
    core: Arc<Core<T>>,
}

impl<T> BroadcastChannel<T> {
    /// Create an open broadcast channel with no readers.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            core: Core::new(config),
        }
    }

    /// New read handle that sees every item written from now on.
    pub fn subscribe(&self) -> Channel<T> {
        self.core.subscribe()
    }

    /// Append `value` for every subscriber. Does nothing if closed.
    pub fn write(&self, value: T) {
        self.core.write(value);
    }

    /// Close the channel for every handle. Idempotent.
    pub fn close(&self) {
        self.core.close();
    }

    /// Whether the channel has been closed. Advisory only.
    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    /// Number of live subscribers. Advisory only.
    pub fn receiver_count(&self) -> usize {
        self.core.receiver_count()
    }
}

impl<T> Default for BroadcastChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for BroadcastChannel<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T> std::fmt::Debug for BroadcastChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("closed", &self.is_closed())
            .field("receivers", &self.receiver_count())
            .finish()
    }
}
