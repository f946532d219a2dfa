use std::fmt;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    Resolve,
    Connect,
    Greeting,
    Helo,
    MailFrom,
    RcptTo,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// The server answered, and the answer was not an acceptance.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub stage: ProbeStage,
    pub code: u16,
    pub message: String,
}

impl Rejection {
    pub fn new(stage: ProbeStage, reply: SmtpReply) -> Self {
        Self {
            stage,
            code: reply.code,
            message: reply.message,
        }
    }

    /// 4xx replies: greylisting, rate limits, mailbox busy.
    pub fn is_temporary(&self) -> bool {
        (400..500).contains(&self.code)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{} rejected with {}", self.stage, self.code)
        } else {
            write!(
                f,
                "{} rejected with {} {}",
                self.stage, self.code, self.message
            )
        }
    }
}

/// The probe could not complete, so nothing is known about the mailbox.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    NoExchanger,
    Unresolvable { host: String },
    Connect { host: String, message: String },
    Timeout { stage: ProbeStage },
    Protocol { stage: ProbeStage, message: String },
    Io { stage: ProbeStage, message: String },
    Internal(String),
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExchanger => f.write_str("no mail exchanger to probe"),
            Self::Unresolvable { host } => write!(f, "could not resolve {host}"),
            Self::Connect { host, message } => write!(f, "connection to {host} failed: {message}"),
            Self::Timeout { stage } => write!(f, "timed out during {stage}"),
            Self::Protocol { stage, message } => write!(f, "protocol error during {stage}: {message}"),
            Self::Io { stage, message } => write!(f, "I/O error during {stage}: {message}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// `250` on `RCPT TO`.
    Accepted,
    Rejected(Rejection),
    Failed(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Final report produced by a [`ProbeMailbox`](super::ProbeMailbox) run.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub outcome: ProbeOutcome,
    pub mx_tried: Vec<String>,
    pub transcript: Vec<String>,
}

impl ProbeReport {
    pub fn new(outcome: ProbeOutcome, mx_tried: Vec<String>, transcript: Vec<String>) -> Self {
        Self {
            outcome,
            mx_tried,
            transcript,
        }
    }

    pub fn failed(failure: ProbeFailure) -> Self {
        Self::new(ProbeOutcome::Failed(failure), Vec::new(), Vec::new())
    }
}
