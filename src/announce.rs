//! Live-region announcements.
//!
//! State changes worth telling a screen-reader user about (new posts, end of
//! feed, errors, filter switches) are posted here.  Each announcement lives
//! for a short while and is then pruned; the status line shows the newest one
//! still alive.

use std::time::{Duration, Instant};

/// How long an announcement stays in the live region.
pub const ANNOUNCEMENT_TTL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Politeness {
    /// `role="status"`: read when the user is idle.
    Polite,
    /// `role="alert"`: interrupts.
    Assertive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub politeness: Politeness,
    pub text: String,
}

impl Announcement {
    pub fn polite(text: impl Into<String>) -> Self {
        Self {
            politeness: Politeness::Polite,
            text: text.into(),
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            politeness: Politeness::Assertive,
            text: text.into(),
        }
    }
}

#[derive(Debug)]
pub struct Announcer {
    live: Vec<(Instant, Announcement)>,
    ttl: Duration,
}

impl Default for Announcer {
    fn default() -> Self {
        Self::new(ANNOUNCEMENT_TTL)
    }
}

impl Announcer {
    pub fn new(ttl: Duration) -> Self {
        Self {
            live: Vec::new(),
            ttl,
        }
    }

    pub fn post(&mut self, announcement: Announcement, now: Instant) {
        tracing::info!(politeness = ?announcement.politeness, text = %announcement.text, "announce");
        self.live.push((now, announcement));
    }

    /// Drop announcements older than the TTL.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.live
            .retain(|(posted, _)| now.saturating_duration_since(*posted) < ttl);
    }

    /// Newest live announcement, alerts taking precedence over status.
    pub fn current(&self) -> Option<&Announcement> {
        self.live
            .iter()
            .rev()
            .map(|(_, a)| a)
            .find(|a| a.politeness == Politeness::Assertive)
            .or_else(|| self.live.last().map(|(_, a)| a))
    }
}
