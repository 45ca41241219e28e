use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters maintained by the reactor and its request tasks.
#[derive(Debug, Default)]
pub struct ReactorStats {
    pub(crate) messages_received: AtomicU64,
    pub(crate) messages_dropped: AtomicU64,
    pub(crate) requests_dispatched: AtomicU64,
    pub(crate) replies_sent: AtomicU64,
    pub(crate) error_replies: AtomicU64,
    pub(crate) timeouts: AtomicU64,
    pub(crate) late_replies: AtomicU64,
    pub(crate) abandoned: AtomicU64,
    pub(crate) send_failures: AtomicU64,
    pub(crate) serialization_failures: AtomicU64,
}

/// Point-in-time copy of [`ReactorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub requests_dispatched: u64,
    pub replies_sent: u64,
    pub error_replies: u64,
    pub timeouts: u64,
    pub late_replies: u64,
    pub abandoned: u64,
    pub send_failures: u64,
    pub serialization_failures: u64,
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ReactorStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multipart messages read from the socket.
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Messages dropped because no reply could be addressed.
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped.load(Ordering::Relaxed)
    }

    /// Requests whose handler was started.
    pub fn requests_dispatched(&self) -> u64 {
        self.requests_dispatched.load(Ordering::Relaxed)
    }

    /// Replies handed to the transport, error replies included.
    pub fn replies_sent(&self) -> u64 {
        self.replies_sent.load(Ordering::Relaxed)
    }

    pub fn error_replies(&self) -> u64 {
        self.error_replies.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Outcomes observed after their deadline (only with `LateReplyPolicy::Log`).
    pub fn late_replies(&self) -> u64 {
        self.late_replies.load(Ordering::Relaxed)
    }

    /// Handlers that dropped their sink without answering.
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    pub fn serialization_failures(&self) -> u64 {
        self.serialization_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_received: self.messages_received(),
            messages_dropped: self.messages_dropped(),
            requests_dispatched: self.requests_dispatched(),
            replies_sent: self.replies_sent(),
            error_replies: self.error_replies(),
            timeouts: self.timeouts(),
            late_replies: self.late_replies(),
            abandoned: self.abandoned(),
            send_failures: self.send_failures(),
            serialization_failures: self.serialization_failures(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = ReactorStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());

        bump(&stats.messages_received);
        bump(&stats.messages_received);
        bump(&stats.timeouts);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.replies_sent, 0);
    }
}
