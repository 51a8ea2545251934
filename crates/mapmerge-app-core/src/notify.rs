// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded notification queue with dedupe.
//!
//! Hosts drain this queue into whatever their UI shows (status bar, popup,
//! terminal). A failed merge pushes exactly one error entry.

use std::collections::VecDeque;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational note.
    Info,
    /// Something the user may want to look at.
    Warning,
    /// Operation failed.
    Error,
}

/// Identifier for a queued notification.
pub type NotificationId = u64;

/// One queued message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Stable identifier.
    pub id: NotificationId,
    /// Severity.
    pub severity: Severity,
    /// Short title line.
    pub title: String,
    /// Optional detail text.
    pub body: Option<String>,
    /// How many identical messages were folded into this one.
    pub repeats: u32,
}

/// Bounded FIFO of notifications; identical consecutive messages are folded.
#[derive(Debug)]
pub struct NotificationQueue {
    queue: VecDeque<Notification>,
    max: usize,
    next_id: NotificationId,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(32)
    }
}

impl NotificationQueue {
    /// Create a queue holding at most `max` entries (minimum 1).
    pub fn new(max: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            max: max.max(1),
            next_id: 1,
        }
    }

    /// Queue a message. If the newest entry has the same severity/title/body it
    /// is bumped instead of duplicated, and its id is returned.
    pub fn push<T>(&mut self, severity: Severity, title: T, body: Option<String>) -> NotificationId
    where
        T: Into<String>,
    {
        let title = title.into();

        if let Some(last) = self.queue.back_mut() {
            if last.severity == severity && last.title == title && last.body == body {
                last.repeats = last.repeats.saturating_add(1);
                return last.id;
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        if self.queue.len() == self.max {
            self.queue.pop_front();
        }
        self.queue.push_back(Notification {
            id,
            severity,
            title,
            body,
            repeats: 0,
        });
        id
    }

    /// Shorthand for an error entry.
    pub fn error<T>(&mut self, title: T, body: Option<String>) -> NotificationId
    where
        T: Into<String>,
    {
        self.push(Severity::Error, title, body)
    }

    /// Pending entries, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Notification> + '_ {
        self.queue.iter()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Count of pending entries at `severity` or above.
    pub fn count_at_least(&self, severity: Severity) -> usize {
        self.queue.iter().filter(|n| n.severity >= severity).count()
    }

    /// Take every pending entry, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }
}
