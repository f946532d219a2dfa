use std::borrow::Cow;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Sender used in `MAIL FROM` unless overridden.
pub const DEFAULT_ENVELOPE_SENDER: &str = "test@example.com";

/// Which mail exchangers the prober talks to.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MxPolicy {
    /// Only the first record of the DNS answer, whatever its preference.
    #[default]
    FirstOnly,
    /// Records sorted by preference; the next host is tried when a probe
    /// cannot complete (up to `max_servers`).
    PriorityOrdered,
}

/// Configuration knobs for [`SmtpProber`](super::SmtpProber).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    pub helo_domain: Option<String>,
    pub envelope_sender: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    /// Upper bound for one host, from connect to the last reply.
    pub session_timeout: Duration,
    pub mx_policy: MxPolicy,
    pub max_servers: usize,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            helo_domain: None,
            envelope_sender: DEFAULT_ENVELOPE_SENDER.to_string(),
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(10),
            session_timeout: Duration::from_secs(30),
            mx_policy: MxPolicy::FirstOnly,
            max_servers: 3,
        }
    }
}

impl ProbeOptions {
    /// Name announced in `EHLO`/`HELO`; `localhost` when unset.
    pub fn helo_name(&self) -> Cow<'_, str> {
        self.helo_domain
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(Cow::Borrowed)
            .unwrap_or(Cow::Borrowed("localhost"))
    }

    /// Empty senders become the null reverse-path `<>`.
    pub fn envelope(&self) -> String {
        format!("MAIL FROM:<{}>", self.envelope_sender.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helo_falls_back_to_localhost() {
        let mut options = ProbeOptions::default();
        assert_eq!(options.helo_name(), "localhost");
        options.helo_domain = Some("  ".to_string());
        assert_eq!(options.helo_name(), "localhost");
        options.helo_domain = Some("probe.example.net".to_string());
        assert_eq!(options.helo_name(), "probe.example.net");
    }

    #[test]
    fn envelope_uses_sentinel_sender() {
        let options = ProbeOptions::default();
        assert_eq!(options.envelope(), "MAIL FROM:<test@example.com>");
        let null = ProbeOptions {
            envelope_sender: String::new(),
            ..ProbeOptions::default()
        };
        assert_eq!(null.envelope(), "MAIL FROM:<>");
    }
}
