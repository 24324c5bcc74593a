//! Diff replay.
//!
//! Walks a [`Difference`] against the old content and classifies every old
//! line as stayed or deleted and every new line as stayed or inserted, in
//! document order. Consuming the events in order rebuilds the new content.

use kenning_core::Difference;

/// Classification of a single line during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    /// Old line `old` survives as new line `new`.
    Stayed {
        /// Index in the old content.
        old: usize,
        /// Index in the new content.
        new: usize,
    },
    /// Old line `old` was removed.
    Deleted {
        /// Index in the old content.
        old: usize,
    },
    /// New line `new` was added.
    Inserted {
        /// Index in the new content.
        new: usize,
    },
}

/// A difference that cannot be replayed against the old content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// A change starts before the end of the previous one.
    #[error("change at old line {line} overlaps or precedes the previous change ending at {cursor}")]
    Unsorted {
        /// `line_begin1` of the offending change.
        line: usize,
        /// First old line not yet consumed.
        cursor: usize,
    },
    /// A change deletes past the end of the old content.
    #[error("change deletes up to old line {end} but the old content has {old_len} lines")]
    OutOfBounds {
        /// One past the last deleted line.
        end: usize,
        /// Number of old lines.
        old_len: usize,
    },
    /// A change inserts at a different new position than the replay reached.
    #[error("change inserts at new line {found} but replay is at new line {expected}")]
    Misaligned {
        /// New line the replay reached.
        expected: usize,
        /// `line_begin2` of the offending change.
        found: usize,
    },
}

/// Result of replaying a difference: the ordered event stream.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use kenning_core::{DiffChange, Difference};
/// use kenning_knowledge::replay::{replay, LineEvent};
///
/// let diff = Difference {
///     author: "alice".into(),
///     timestamp: Utc::now(),
///     changes: vec![DiffChange::new(1, 0, 1, 1)],
/// };
/// let result = replay(3, &diff).unwrap();
/// assert_eq!(result.new_len(), 2);
/// assert_eq!(result.events()[1], LineEvent::Deleted { old: 1 });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    events: Vec<LineEvent>,
    old_len: usize,
    new_len: usize,
}

impl Replay {
    /// All events in document order.
    pub fn events(&self) -> &[LineEvent] {
        &self.events
    }

    /// Number of lines before the difference.
    pub fn old_len(&self) -> usize {
        self.old_len
    }

    /// Number of lines after the difference.
    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// New-content indices of inserted lines, ascending.
    pub fn inserted(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LineEvent::Inserted { new } => Some(*new),
                _ => None,
            })
            .collect()
    }
}

/// Replay `difference` against content of `old_len` lines.
///
/// Empty changes are skipped. Non-empty changes must be sorted by
/// `line_begin1`, must not overlap, must stay within the old content, and
/// every insertion must start exactly where the replay has arrived in the
/// new content.
///
/// # Errors
///
/// Returns a [`ReplayError`] describing the first inconsistency.
pub fn replay(old_len: usize, difference: &Difference) -> Result<Replay, ReplayError> {
    let mut events = Vec::with_capacity(old_len + difference.total_inserted());
    let mut old = 0usize;
    let mut new = 0usize;

    for change in difference.changes.iter().filter(|c| !c.is_empty()) {
        if change.line_begin1 < old {
            return Err(ReplayError::Unsorted {
                line: change.line_begin1,
                cursor: old,
            });
        }
        let end = change.line_begin1 + change.deleted;
        if end > old_len {
            return Err(ReplayError::OutOfBounds { end, old_len });
        }

        while old < change.line_begin1 {
            events.push(LineEvent::Stayed { old, new });
            old += 1;
            new += 1;
        }
        while old < end {
            events.push(LineEvent::Deleted { old });
            old += 1;
        }

        if change.inserted > 0 && change.line_begin2 != new {
            return Err(ReplayError::Misaligned {
                expected: new,
                found: change.line_begin2,
            });
        }
        for _ in 0..change.inserted {
            events.push(LineEvent::Inserted { new });
            new += 1;
        }
    }

    while old < old_len {
        events.push(LineEvent::Stayed { old, new });
        old += 1;
        new += 1;
    }

    Ok(Replay {
        events,
        old_len,
        new_len: new,
    })
}
