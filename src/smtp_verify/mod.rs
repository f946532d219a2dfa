//! SMTP mailbox probing.
//!
//! [`SmtpProber`] runs a short dialogue (greeting, `EHLO`/`HELO`,
//! `MAIL FROM`, `RCPT TO`, `QUIT`) against a domain's mail exchanger and
//! stops before any message data. Every read, write and connect is bounded
//! by [`ProbeOptions`] timeouts, and the whole session by a deadline.
//!
//! An explicit negative reply is a [`Rejection`]; a probe that could not get
//! an answer is a [`ProbeFailure`]. Both mean "not verified".

mod error;
mod options;
mod probe;
mod session;
mod types;

pub use error::SessionError;
pub use options::{DEFAULT_ENVELOPE_SENDER, MxPolicy, ProbeOptions};
pub use probe::{ProbeMailbox, SmtpProber, probe_mailbox};
pub use types::{ProbeFailure, ProbeOutcome, ProbeReport, ProbeStage, Rejection, SmtpReply};
