//! Priority ready-queue set.
//!
//! One FIFO list per priority level, threaded through an index arena: tasks
//! are addressed by their registry slot and the per-slot link cells live here,
//! so enqueue, dequeue of the head and removal from the middle of a list are
//! all O(1). A slot is a member of at most one list at a time.

use std::collections::TryReserveError;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    level: Option<u8>,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Ends {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

/// Per-level FIFO ready queues over registry slots `0..capacity`.
#[derive(Debug)]
pub struct ReadyQueues {
    queues: Vec<Ends>,
    links: Vec<Link>,
}

impl ReadyQueues {
    /// Allocates `levels` empty queues able to hold slots `0..capacity`.
    pub fn try_new(levels: usize, capacity: usize) -> Result<Self, TryReserveError> {
        let mut queues = Vec::new();
        queues.try_reserve_exact(levels)?;
        queues.resize(levels, Ends::default());

        let mut links = Vec::new();
        links.try_reserve_exact(capacity)?;
        links.resize(capacity, Link::default());

        Ok(Self { queues, links })
    }

    /// Appends `slot` at the tail of `level`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is already queued or either index is out of range;
    /// both indicate a broken registry invariant.
    pub fn enqueue(&mut self, slot: usize, level: u8) {
        self.assert_level(level);
        assert!(
            self.links[slot].level.is_none(),
            "slot {slot} is already queued"
        );

        let ends = &mut self.queues[level as usize];
        let prev = ends.tail;
        ends.tail = Some(slot);
        if ends.head.is_none() {
            ends.head = Some(slot);
        }
        ends.len += 1;

        if let Some(prev) = prev {
            self.links[prev].next = Some(slot);
        }
        self.links[slot] = Link {
            level: Some(level),
            prev,
            next: None,
        };
    }

    /// Removes and returns the head of `level`.
    pub fn dequeue_head(&mut self, level: u8) -> Option<usize> {
        self.assert_level(level);
        let head = self.queues[level as usize].head?;
        self.unlink(head, level);
        Some(head)
    }

    /// Removes `slot` from whichever list holds it. Returns the level it was
    /// removed from, or `None` if it was not queued.
    pub fn remove(&mut self, slot: usize) -> Option<u8> {
        let level = self.links.get(slot)?.level?;
        self.unlink(slot, level);
        Some(level)
    }

    /// Level `slot` is queued at, if any.
    pub fn level_of(&self, slot: usize) -> Option<u8> {
        self.links.get(slot).and_then(|link| link.level)
    }

    /// Head of `level` without removing it.
    pub fn head(&self, level: u8) -> Option<usize> {
        self.queues.get(level as usize).and_then(|ends| ends.head)
    }

    /// Most urgent (lowest-numbered) non-empty level.
    pub fn first_non_empty(&self) -> Option<u8> {
        self.queues
            .iter()
            .position(|ends| ends.head.is_some())
            .map(|level| level as u8)
    }

    /// Number of slots queued at `level`.
    pub fn len(&self, level: u8) -> usize {
        self.queues.get(level as usize).map_or(0, |ends| ends.len)
    }

    /// Number of slots queued across all levels.
    pub fn total_len(&self) -> usize {
        self.queues.iter().map(|ends| ends.len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(|ends| ends.head.is_none())
    }

    /// Slots queued at `level`, head first.
    pub fn iter(&self, level: u8) -> impl Iterator<Item = usize> + '_ {
        let mut cursor = self.head(level);
        core::iter::from_fn(move || {
            let slot = cursor?;
            cursor = self.links[slot].next;
            Some(slot)
        })
    }

    fn unlink(&mut self, slot: usize, level: u8) {
        let Link { prev, next, .. } = self.links[slot];
        let ends = &mut self.queues[level as usize];

        match prev {
            Some(prev) => self.links[prev].next = next,
            None => ends.head = next,
        }
        match next {
            Some(next) => self.links[next].prev = prev,
            None => ends.tail = prev,
        }
        ends.len -= 1;
        self.links[slot] = Link::default();
    }

    fn assert_level(&self, level: u8) {
        assert!(
            (level as usize) < self.queues.len(),
            "priority {level} exceeds configured range 0..{}",
            self.queues.len()
        );
    }
}
