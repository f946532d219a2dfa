use crate::country::infer_country;
use crate::mx::{DomainStatus, LookupDns, MxStatus, check_domain_with, check_mx_with};
use crate::smtp_verify::{ProbeMailbox, ProbeOutcome};
use crate::validator::EmailAddress;

use super::types::{Status, VerificationResult};

/// Turns one address string into exactly one result.
pub trait Verify {
    fn verify(&self, address: &str) -> VerificationResult;
}

/// Syntax, domain, MX and probe checks, short-circuiting at the first
/// failing step.
pub struct Pipeline<D, P> {
    dns: D,
    prober: P,
}

impl<D, P> Pipeline<D, P>
where
    D: LookupDns,
    P: ProbeMailbox,
{
    pub fn new(dns: D, prober: P) -> Self {
        Self { dns, prober }
    }
}

impl<D, P> Verify for Pipeline<D, P>
where
    D: LookupDns,
    P: ProbeMailbox,
{
    fn verify(&self, input: &str) -> VerificationResult {
        let Some(address) = EmailAddress::parse(input) else {
            log_debug!(address = input, "invalid syntax");
            return VerificationResult::unknown_country(input, Status::InvalidSyntax);
        };
        let domain = address.domain();

        match check_domain_with(&self.dns, domain) {
            DomainStatus::Exists => {}
            DomainStatus::NotFound => {
                log_debug!(address = input, domain, "domain does not exist");
                return VerificationResult::unknown_country(input, Status::DomainNotFound);
            }
            DomainStatus::Unresolved(reason) => {
                // ambiguous resolver failure: fail closed
                log_warn!(address = input, domain, %reason, "A lookup failed");
                return VerificationResult::unknown_country(input, Status::DomainNotFound)
                    .with_detail(reason);
            }
        }

        let records = match check_mx_with(&self.dns, domain) {
            MxStatus::Records(records) => records,
            MxStatus::NoRecords => {
                log_debug!(address = input, domain, "no MX records");
                return VerificationResult::unknown_country(input, Status::NoMailExchanger);
            }
            MxStatus::Unresolved(reason) => {
                log_warn!(address = input, domain, %reason, "MX lookup failed");
                return VerificationResult::unknown_country(input, Status::NoMailExchanger)
                    .with_detail(reason);
            }
        };

        let report = self.prober.probe(&address, &records);
        let country = infer_country(domain);
        let status = match report.outcome {
            ProbeOutcome::Accepted => Status::Verified,
            ProbeOutcome::Rejected(rejection) => Status::ProbeRejected(rejection),
            ProbeOutcome::Failed(failure) => Status::ProbeFailed(failure),
        };
        log_debug!(address = input, status = status.code(), country, "probe finished");

        let result = VerificationResult::new(input, status, country);
        if report.mx_tried.is_empty() {
            result
        } else {
            result.with_detail(format!("mx: {}", report.mx_tried.join(", ")))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mx::tests::StubResolver;
    use crate::mx::{Error as MxError, MxRecord};
    use crate::smtp_verify::{ProbeFailure, ProbeReport, ProbeStage, Rejection};
    use std::sync::Mutex;

    /// Returns a fixed outcome and remembers what it was asked.
    pub(crate) struct StubProber {
        outcome: ProbeOutcome,
        calls: Mutex<Vec<(String, Vec<MxRecord>)>>,
    }

    impl StubProber {
        pub(crate) fn new(outcome: ProbeOutcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<(String, Vec<MxRecord>)> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    impl ProbeMailbox for StubProber {
        fn probe(&self, address: &EmailAddress, records: &[MxRecord]) -> ProbeReport {
            self.calls
                .lock()
                .expect("calls lock")
                .push((address.to_string(), records.to_vec()));
            let tried = records.iter().map(|r| r.exchange.clone()).take(1).collect();
            ProbeReport::new(self.outcome.clone(), tried, Vec::new())
        }
    }

    fn rejection(code: u16) -> Rejection {
        Rejection {
            stage: ProbeStage::RcptTo,
            code,
            message: "User unknown".to_string(),
        }
    }

    #[test]
    fn accepted_probe_is_verified_with_country() {
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let pipeline = Pipeline::new(StubResolver::routing_to("mx.example.de"), &prober);
        let result = pipeline.verify("anna@example.de");
        assert_eq!(result.status, Status::Verified);
        assert!(result.accepted);
        assert_eq!(result.country, "Germany");
        assert_eq!(result.detail.as_deref(), Some("mx: mx.example.de"));
        assert_eq!(prober.calls()[0].0, "anna@example.de");
    }

    #[test]
    fn bad_syntax_touches_nothing() {
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let dns = StubResolver::new(
            |_| panic!("no A lookup for invalid syntax"),
            |_| panic!("no MX lookup for invalid syntax"),
        );
        let result = Pipeline::new(dns, &prober).verify("bad-syntax");
        assert_eq!(result.status, Status::InvalidSyntax);
        assert_eq!(result.country, "Unknown");
        assert!(!result.accepted);
        assert!(prober.calls().is_empty());
    }

    #[test]
    fn missing_domain_never_reaches_mx_check() {
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let dns = StubResolver::new(
            |domain| Err(MxError::not_found(domain)),
            |_| panic!("MX lookup after NXDOMAIN"),
        );
        let result = Pipeline::new(dns, &prober).verify("user@nonexistent.invalidtld");
        assert_eq!(result.status, Status::DomainNotFound);
        assert_eq!(result.country, "Unknown");
        assert!(result.detail.is_none());
        assert!(prober.calls().is_empty());
    }

    #[test]
    fn a_lookup_timeout_fails_closed() {
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let dns = StubResolver::new(
            |domain| Err(MxError::timeout(domain)),
            |_| panic!("MX lookup after failed A lookup"),
        );
        let result = Pipeline::new(dns, &prober).verify("user@slow.example.fr");
        assert_eq!(result.status, Status::DomainNotFound);
        assert_eq!(result.country, "Unknown");
        assert!(result.detail.as_deref().is_some_and(|d| d.contains("timed out")));
    }

    #[test]
    fn no_mx_never_reaches_prober() {
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let dns = StubResolver::new(|_| Ok(1), |_| Ok(Vec::new()));
        let result = Pipeline::new(dns, &prober).verify("user@web-only.example.de");
        assert_eq!(result.status, Status::NoMailExchanger);
        assert_eq!(result.country, "Unknown");
        assert!(prober.calls().is_empty());
    }

    #[test]
    fn mx_lookup_timeout_fails_closed() {
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let dns = StubResolver::new(|_| Ok(1), |domain| Err(MxError::timeout(domain)));
        let result = Pipeline::new(dns, &prober).verify("user@example.com");
        assert_eq!(result.status, Status::NoMailExchanger);
        assert!(result.detail.is_some());
        assert!(prober.calls().is_empty());
    }

    #[test]
    fn prober_receives_answer_order_records() {
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let dns = StubResolver::new(
            |_| Ok(1),
            |_| {
                Ok(vec![
                    MxRecord::new(20, "mx2.example.com"),
                    MxRecord::new(10, "mx1.example.com"),
                ])
            },
        );
        Pipeline::new(dns, &prober).verify("user@example.com");
        let calls = prober.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1[0].exchange, "mx2.example.com");
    }

    #[test]
    fn rejection_keeps_country() {
        let prober = StubProber::new(ProbeOutcome::Rejected(rejection(550)));
        let pipeline = Pipeline::new(StubResolver::routing_to("mx.example.it"), &prober);
        let result = pipeline.verify("mario@example.it");
        assert_eq!(result.status, Status::ProbeRejected(rejection(550)));
        assert!(!result.accepted);
        assert_eq!(result.country, "Italy");
    }

    #[test]
    fn failed_probe_is_distinct_from_rejection() {
        let failure = ProbeFailure::Timeout {
            stage: ProbeStage::Connect,
        };
        let prober = StubProber::new(ProbeOutcome::Failed(failure.clone()));
        let pipeline = Pipeline::new(StubResolver::routing_to("mx.example.com"), &prober);
        let result = pipeline.verify("user@example.com");
        assert_eq!(result.status, Status::ProbeFailed(failure));
        assert_eq!(result.status.reason(), "Email Not Verified");
        assert_eq!(result.country, "Unknown");
    }
}
