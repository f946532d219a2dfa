use std::fmt;

use crate::country::UNKNOWN_COUNTRY;
use crate::smtp_verify::{ProbeFailure, Rejection};

/// Terminal state of one address's pipeline run.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    InvalidSyntax,
    DomainNotFound,
    NoMailExchanger,
    /// The mail exchanger answered with something other than `250`.
    ProbeRejected(Rejection),
    /// The probe never got a usable answer.
    ProbeFailed(ProbeFailure),
    Verified,
}

impl Status {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }

    /// Short human-readable reason. Both probe outcomes read the same.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidSyntax => "Invalid Email Syntax",
            Self::DomainNotFound => "Domain Does Not Exist",
            Self::NoMailExchanger => "No MX Records",
            Self::ProbeRejected(_) | Self::ProbeFailed(_) => "Email Not Verified",
            Self::Verified => "Verified",
        }
    }

    /// Stable machine-readable name.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSyntax => "invalid_syntax",
            Self::DomainNotFound => "domain_not_found",
            Self::NoMailExchanger => "no_mail_exchanger",
            Self::ProbeRejected(_) => "probe_rejected",
            Self::ProbeFailed(_) => "probe_failed",
            Self::Verified => "verified",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeRejected(rejection) => write!(f, "{} ({rejection})", self.reason()),
            Self::ProbeFailed(failure) => write!(f, "{} ({failure})", self.reason()),
            other => f.write_str(other.reason()),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub address: String,
    pub accepted: bool,
    pub status: Status,
    pub country: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub detail: Option<String>,
}

impl VerificationResult {
    pub fn new(address: impl Into<String>, status: Status, country: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            accepted: status.is_verified(),
            status,
            country: country.into(),
            detail: None,
        }
    }

    /// Result for a check that stopped before the domain was known to route mail.
    pub fn unknown_country(address: impl Into<String>, status: Status) -> Self {
        Self::new(address, status, UNKNOWN_COUNTRY)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp_verify::ProbeStage;

    #[test]
    fn only_verified_is_accepted() {
        let ok = VerificationResult::new("a@b.de", Status::Verified, "Germany");
        assert!(ok.accepted);
        let rejected = VerificationResult::unknown_country("a@b", Status::InvalidSyntax);
        assert!(!rejected.accepted);
        assert_eq!(rejected.country, "Unknown");
    }

    #[test]
    fn probe_statuses_share_reason_but_not_display() {
        let rejected = Status::ProbeRejected(Rejection {
            stage: ProbeStage::RcptTo,
            code: 550,
            message: "User unknown".to_string(),
        });
        let failed = Status::ProbeFailed(ProbeFailure::Timeout {
            stage: ProbeStage::Greeting,
        });
        assert_eq!(rejected.reason(), failed.reason());
        assert_eq!(
            rejected.to_string(),
            "Email Not Verified (RCPT TO rejected with 550 User unknown)"
        );
        assert_eq!(
            failed.to_string(),
            "Email Not Verified (timed out during greeting)"
        );
        assert_ne!(rejected.code(), failed.code());
    }
}
