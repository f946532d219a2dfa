use std::io;

use thiserror::Error;

use super::types::{ProbeFailure, ProbeStage};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
    #[error("session deadline exceeded")]
    DeadlineExceeded,
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    pub(crate) fn io(source: io::Error) -> Self {
        Self::Io { source }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::DeadlineExceeded => true,
            Self::Io { source } => matches!(
                source.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ),
            Self::Protocol(_) => false,
        }
    }

    /// Classify the error as the failure of `stage`.
    pub fn at(self, stage: ProbeStage) -> ProbeFailure {
        if self.is_timeout() {
            return ProbeFailure::Timeout { stage };
        }
        match self {
            Self::Protocol(message) => ProbeFailure::Protocol { stage, message },
            other => ProbeFailure::Io {
                stage,
                message: other.to_string(),
            },
        }
    }
}
