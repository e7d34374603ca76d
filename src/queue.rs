// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Append-only broadcast log with per-reader cursors.
//
// Layout:
//
//   head                          tail = head + slots.len()
//    |                             |
//    [ slot ][ slot ][ slot ] ... [ ]
//        ^            ^
//     cursor a     cursor b        (stored in a slab, keyed by handle)
//
// Each slot counts the live cursors that still have to consume it. A slot
// whose count reaches zero drops its value; zero-count slots at the front
// are trimmed, so the log never retains anything every reader has passed.

use std::collections::VecDeque;

use slab::Slab;

/// Key of a cursor inside the queue's arena.
pub(crate) type CursorKey = usize;

struct Slot<T> {
    value: Option<T>,
    pending: usize,
}

struct Cursor<T> {
    /// Sequence number of the next log item this cursor reads.
    next: u64,
    /// Items pushed back with `unget`; the last element is read first.
    pushback: Vec<T>,
}

pub(crate) struct BroadcastQueue<T> {
    head: u64,
    slots: VecDeque<Slot<T>>,
    cursors: Slab<Cursor<T>>,
}

impl<T> BroadcastQueue<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            head: 0,
            slots: VecDeque::with_capacity(capacity),
            cursors: Slab::new(),
        }
    }

    /// Sequence number the next appended item receives.
    fn tail(&self) -> u64 {
        self.head + self.slots.len() as u64
    }

    fn slot_mut(&mut self, seq: u64) -> &mut Slot<T> {
        let idx = (seq - self.head) as usize;
        &mut self.slots[idx]
    }

    /// Number of live cursors.
    pub(crate) fn readers(&self) -> usize {
        self.cursors.len()
    }

    #[cfg(test)]
    fn retained(&self) -> usize {
        self.slots.len()
    }

    /// New cursor positioned at the tail: it sees only future appends.
    pub(crate) fn subscribe(&mut self) -> CursorKey {
        let next = self.tail();
        self.cursors.insert(Cursor {
            next,
            pushback: Vec::new(),
        })
    }

    /// Release a cursor and everything only it was still waiting on.
    pub(crate) fn unsubscribe(&mut self, key: CursorKey) {
        let Some(cursor) = self.cursors.try_remove(key) else {
            return;
        };
        for seq in cursor.next..self.tail() {
            let slot = self.slot_mut(seq);
            slot.pending -= 1;
            if slot.pending == 0 {
                slot.value = None;
            }
        }
        self.trim();
    }

    /// Append `value` for every live cursor. Dropped when there are none.
    pub(crate) fn push(&mut self, value: T) {
        let pending = self.cursors.len();
        if pending == 0 {
            return;
        }
        self.slots.push_back(Slot {
            value: Some(value),
            pending,
        });
    }

    /// Make `value` the next item `key` reads.
    pub(crate) fn unget(&mut self, key: CursorKey, value: T) {
        if let Some(cursor) = self.cursors.get_mut(key) {
            cursor.pushback.push(value);
        }
    }

    /// Whether `key` has nothing left to read right now.
    pub(crate) fn is_empty(&self, key: CursorKey) -> bool {
        match self.cursors.get(key) {
            Some(cursor) => cursor.pushback.is_empty() && cursor.next == self.tail(),
            None => true,
        }
    }

    /// Drop zero-count slots from the front of the log.
    fn trim(&mut self) {
        let before = self.head;
        while matches!(self.slots.front(), Some(slot) if slot.pending == 0) {
            self.slots.pop_front();
            self.head += 1;
        }
        if self.head != before {
            tracing::trace!(trimmed = self.head - before, head = self.head, "log trimmed");
        }
    }
}

impl<T: Clone> BroadcastQueue<T> {
    /// New cursor at the same position as `key`, including its push-backs.
    pub(crate) fn fork(&mut self, key: CursorKey) -> CursorKey {
        let Some(src) = self.cursors.get(key) else {
            return self.subscribe();
        };
        let next = src.next;
        let pushback = src.pushback.clone();
        for seq in next..self.tail() {
            self.slot_mut(seq).pending += 1;
        }
        self.cursors.insert(Cursor { next, pushback })
    }

    /// Remove and return the next item for `key`.
    ///
    /// The last cursor to consume a slot takes its value; earlier ones clone.
    pub(crate) fn pop(&mut self, key: CursorKey) -> Option<T> {
        let tail = self.tail();
        let head = self.head;
        let cursor = self.cursors.get_mut(key)?;
        if let Some(value) = cursor.pushback.pop() {
            return Some(value);
        }
        if cursor.next == tail {
            return None;
        }
        let slot = &mut self.slots[(cursor.next - head) as usize];
        cursor.next += 1;
        slot.pending -= 1;
        let value = if slot.pending == 0 {
            slot.value.take()
        } else {
            slot.value.clone()
        };
        self.trim();
        value
    }

    /// Clone of the item `pop` would return, leaving it in place.
    pub(crate) fn peek(&self, key: CursorKey) -> Option<T> {
        let cursor = self.cursors.get(key)?;
        if let Some(value) = cursor.pushback.last() {
            return Some(value.clone());
        }
        if cursor.next == self.tail() {
            return None;
        }
        self.slots[(cursor.next - self.head) as usize].value.clone()
    }
}
