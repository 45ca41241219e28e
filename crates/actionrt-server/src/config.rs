use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use actionrt_transport::{Endpoint, RouterOptions, DEFAULT_RECEIVE_HWM};

/// Default handler deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default capacity of the queue of finished requests.
pub const DEFAULT_OUTPUT_CAPACITY: usize = 1000;

/// Default reactor poll tick.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What happens to a handler outcome that arrives after its deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LateReplyPolicy {
    /// Stop listening at the deadline; the outcome is never observed.
    #[default]
    Discard,
    /// Keep listening and log the outcome. It is still not delivered.
    Log,
}

impl LateReplyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LateReplyPolicy::Discard => "discard",
            LateReplyPolicy::Log => "log",
        }
    }
}

impl fmt::Display for LateReplyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LateReplyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discard" => Ok(LateReplyPolicy::Discard),
            "log" => Ok(LateReplyPolicy::Log),
            other => Err(format!("unknown late reply policy '{other}'")),
        }
    }
}

/// Runtime settings of a [`Server`](crate::Server).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Component title used in error replies and logs.
    pub title: String,
    /// Address to listen on.
    pub endpoint: Endpoint,
    /// Deadline applied to every handler.
    pub timeout: Duration,
    /// Capacity of the transport's inbound queue.
    pub receive_hwm: usize,
    /// Capacity of the finished-request queue.
    pub output_capacity: usize,
    /// Upper bound on how long the reactor waits without checking for shutdown.
    pub poll_interval: Duration,
    pub late_replies: LateReplyPolicy,
    /// Component variables handed to every request.
    pub variables: Arc<BTreeMap<String, String>>,
}

impl ServerConfig {
    pub fn new(title: impl Into<String>, endpoint: Endpoint) -> Self {
        Self {
            title: title.into(),
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            receive_hwm: DEFAULT_RECEIVE_HWM,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            late_replies: LateReplyPolicy::default(),
            variables: Arc::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_receive_hwm(mut self, hwm: usize) -> Self {
        self.receive_hwm = hwm;
        self
    }

    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_late_replies(mut self, policy: LateReplyPolicy) -> Self {
        self.late_replies = policy;
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    pub(crate) fn router_options(&self) -> RouterOptions {
        RouterOptions::default().with_receive_hwm(self.receive_hwm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::new("service \"x\" (1)", Endpoint::tcp_local(1));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.receive_hwm, 1000);
        assert_eq!(config.output_capacity, 1000);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.late_replies, LateReplyPolicy::Discard);
        assert!(config.variables.is_empty());
    }

    #[test]
    fn late_reply_policy_round_trips_through_str() {
        for policy in [LateReplyPolicy::Discard, LateReplyPolicy::Log] {
            assert_eq!(policy.as_str().parse::<LateReplyPolicy>(), Ok(policy));
        }
        assert!("keep".parse::<LateReplyPolicy>().is_err());
    }
}
