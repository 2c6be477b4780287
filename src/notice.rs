//! Transient notifications raised by admin operations.
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at: Instant,
}

/// Queue of notices that dismiss themselves once `ttl` has elapsed.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    next_id: u64,
    notices: Vec<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            notices: Vec::new(),
        }
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        let message = message.into();
        info!(%message, "notice");
        self.push(NoticeKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        let message = message.into();
        warn!(%message, "error notice");
        self.push(NoticeKind::Error, message)
    }

    fn push(&mut self, kind: NoticeKind, message: String) -> u64 {
        let now = Instant::now();
        self.prune(now);
        let id = self.next_id;
        self.next_id += 1;
        self.notices.push(Notice {
            id,
            kind,
            message,
            raised_at: now,
        });
        id
    }

    fn is_live(&self, notice: &Notice, now: Instant) -> bool {
        now.saturating_duration_since(notice.raised_at) < self.ttl
    }

    fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.notices
            .retain(|n| now.saturating_duration_since(n.raised_at) < ttl);
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Drop expired notices and return the ones still showing at `now`.
    pub fn active_at(&mut self, now: Instant) -> &[Notice] {
        self.prune(now);
        &self.notices
    }

    pub fn active(&mut self) -> &[Notice] {
        self.active_at(Instant::now())
    }

    /// Most recent notice that has not expired yet.
    pub fn latest(&self) -> Option<&Notice> {
        let now = Instant::now();
        self.notices.iter().rev().find(|n| self.is_live(n, now))
    }
}
