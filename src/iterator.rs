//! Range iterator
//!
//! Walks an engine cursor over a half-open `[start, end)` domain in either
//! direction.
//!
//! ## States
//! ```text
//!            ┌──────────► Valid ──advance──┐
//!  created ──┤              ▲              │
//!            │              └──────────────┤
//!            ├──────────► Exhausted ◄──────┤
//!            └──────────► Failed ◄─────────┘
//! ```
//! `Exhausted` and `Failed` are terminal; `advance` is a no-op there.
//!
//! The cursor is released when the iterator is dropped or passed to
//! [`RangeIter::release`], so it is released exactly once even on early
//! abandonment.

use std::mem;

use crate::engine::{Engine, EngineCursor, KeyRange};
use crate::error::{KvError, Result};

/// Traversal order over the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending, from `start` (inclusive) toward `end` (exclusive)
    Forward,

    /// Descending, from just before `end` toward `start` (inclusive)
    Reverse,
}

enum State {
    Valid { key: Vec<u8>, value: Vec<u8> },
    Exhausted,
    Failed(KvError),
}

/// Iterator over a key range of engine `E`
pub struct RangeIter<E: Engine> {
    cursor: E::Cursor,
    range: KeyRange,
    direction: Direction,
    state: State,
}

impl<E: Engine> RangeIter<E> {
    /// Wrap `cursor` and position on the first entry in `direction`
    pub(crate) fn new(cursor: E::Cursor, range: KeyRange, direction: Direction) -> Self {
        let mut iter = Self {
            cursor,
            range,
            direction,
            state: State::Exhausted,
        };
        iter.step();
        iter
    }

    fn step(&mut self) {
        let next = match self.direction {
            Direction::Forward => self.cursor.next(),
            Direction::Reverse => self.cursor.next_back(),
        };
        self.state = match next {
            None => State::Exhausted,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "iterator stopped on engine error");
                State::Failed(KvError::storage(err))
            }
            // the engine should never hand back keys outside the range;
            // treat one as the edge of the domain
            Some(Ok((key, value))) if self.range.contains(&key) => State::Valid { key, value },
            Some(Ok(_)) => State::Exhausted,
        };
    }

    /// True when positioned on an entry
    pub fn is_valid(&self) -> bool {
        matches!(self.state, State::Valid { .. })
    }

    /// Move one entry in the iteration direction
    ///
    /// No-op once exhausted or failed.
    pub fn advance(&mut self) {
        if self.is_valid() {
            self.step();
        }
    }

    /// Current entry, or `None` when exhausted or failed
    pub fn entry(&self) -> Option<(&[u8], &[u8])> {
        match &self.state {
            State::Valid { key, value } => Some((key.as_slice(), value.as_slice())),
            _ => None,
        }
    }

    /// Current key
    ///
    /// # Panics
    /// If the iterator is not positioned on an entry.
    pub fn key(&self) -> &[u8] {
        match self.entry() {
            Some((key, _)) => key,
            None => panic!("RangeIter::key called on an invalid iterator"),
        }
    }

    /// Current value
    ///
    /// # Panics
    /// If the iterator is not positioned on an entry.
    pub fn value(&self) -> &[u8] {
        match self.entry() {
            Some((_, value)) => value,
            None => panic!("RangeIter::value called on an invalid iterator"),
        }
    }

    /// The engine fault that ended the traversal, if any
    pub fn error(&self) -> Option<&KvError> {
        match &self.state {
            State::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Take the engine fault out, leaving the iterator exhausted
    pub fn take_error(&mut self) -> Option<KvError> {
        match mem::replace(&mut self.state, State::Exhausted) {
            State::Failed(err) => Some(err),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// `(start, end)` bounds of the domain
    pub fn domain(&self) -> (Option<&[u8]>, Option<&[u8]>) {
        (self.range.start.as_deref(), self.range.end.as_deref())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Release the underlying cursor
    pub fn release(self) {
        tracing::trace!(direction = ?self.direction, "iterator released");
    }
}

/// Yields owned entries; an engine fault is yielded once, then iteration ends.
impl<E: Engine> Iterator for RangeIter<E> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        match mem::replace(&mut self.state, State::Exhausted) {
            State::Valid { key, value } => {
                self.step();
                Some(Ok((key, value)))
            }
            State::Exhausted => None,
            State::Failed(err) => Some(Err(err)),
        }
    }
}
