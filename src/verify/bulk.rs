use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;

use crate::mx::SystemDns;
use crate::smtp_verify::{ProbeFailure, SmtpProber};

use super::error::VerifyError;
use super::options::VerifyOptions;
use super::pipeline::{Pipeline, Verify};
use super::types::{Status, VerificationResult};

/// Runs `verifiers.len()` workers over `addresses` and returns one result
/// per address, in input order.
///
/// Workers pull the next index from a shared cursor; results travel back
/// over a channel and land in the slot of their index. A panic inside one
/// address's pipeline becomes that address's `ProbeFailed` result.
pub fn verify_all<V>(addresses: &[String], verifiers: Vec<V>) -> Vec<VerificationResult>
where
    V: Verify + Send,
{
    if addresses.is_empty() {
        return Vec::new();
    }
    let mut slots: Vec<Option<VerificationResult>> = vec![None; addresses.len()];

    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(usize, VerificationResult)>();

    thread::scope(|scope| {
        for verifier in verifiers {
            let tx = tx.clone();
            let cursor = &cursor;
            scope.spawn(move || {
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(address) = addresses.get(index) else {
                        break;
                    };
                    let result = verify_isolated(&verifier, address);
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
        // the receive loop ends once every worker has dropped its sender
        drop(tx);
        for (index, result) in rx {
            slots[index] = Some(result);
        }
    });

    slots
        .into_iter()
        .zip(addresses)
        .map(|(slot, address)| {
            // only reachable when no worker was supplied
            slot.unwrap_or_else(|| {
                let failure = ProbeFailure::Internal("address was never scheduled".to_string());
                VerificationResult::unknown_country(address.as_str(), Status::ProbeFailed(failure))
            })
        })
        .collect()
}

fn verify_isolated<V: Verify>(verifier: &V, address: &str) -> VerificationResult {
    match panic::catch_unwind(AssertUnwindSafe(|| verifier.verify(address))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log_warn!(address, %message, "verification panicked");
            let failure = ProbeFailure::Internal(message);
            VerificationResult::unknown_country(address, Status::ProbeFailed(failure))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

/// The production pipeline: one system resolver shared by the DNS checks
/// and the exchanger lookups of the SMTP probe.
pub type SystemPipeline = Pipeline<Arc<SystemDns>, SmtpProber<Arc<SystemDns>>>;

/// Bulk verification with one system-resolver pipeline per worker.
#[derive(Debug, Clone, Default)]
pub struct BulkVerifier {
    options: VerifyOptions,
}

impl BulkVerifier {
    pub fn new(options: VerifyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Verifies every address. Only resolver construction can fail, and it
    /// happens before any address is looked at.
    pub fn verify_all(&self, addresses: &[String]) -> Result<Vec<VerificationResult>, VerifyError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let workers = self.options.worker_count(addresses.len());
        let pipelines = (0..workers)
            .map(|worker| -> Result<SystemPipeline, VerifyError> {
                let dns = match self.options.dns_timeout {
                    Some(timeout) => SystemDns::with_timeout(timeout),
                    None => SystemDns::from_system_conf(),
                }
                .map_err(|source| VerifyError::resolver(worker, source))?;
                let dns = Arc::new(dns);
                let prober = SmtpProber::new(self.options.probe.clone(), Arc::clone(&dns));
                Ok(Pipeline::new(dns, prober))
            })
            .collect::<Result<Vec<_>, _>>()?;

        log_debug!(addresses = addresses.len(), workers, "starting bulk verification");
        Ok(verify_all(addresses, pipelines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::country::infer_country;
    use crate::mx::tests::StubResolver;
    use crate::mx::{Error as MxError, MxRecord};
    use crate::report::write_valid_addresses;
    use crate::smtp_verify::{ProbeOutcome, ProbeStage};
    use crate::validator::{domain_of, is_valid_syntax};
    use crate::verify::pipeline::tests::StubProber;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Syntax-only verifier: sleeps longer for earlier addresses so that
    /// completion order is the reverse of input order.
    struct Delayed {
        total: usize,
    }

    impl Verify for Delayed {
        fn verify(&self, address: &str) -> VerificationResult {
            let index: usize = address
                .split('@')
                .next()
                .and_then(|local| local.trim_start_matches('u').parse().ok())
                .unwrap_or(0);
            thread::sleep(Duration::from_millis(((self.total - index) * 5) as u64));
            let status = if is_valid_syntax(address) {
                Status::Verified
            } else {
                Status::InvalidSyntax
            };
            let country = domain_of(address).map_or("Unknown", infer_country);
            VerificationResult::new(address, status, country)
        }
    }

    struct Echo;

    impl Verify for Echo {
        fn verify(&self, address: &str) -> VerificationResult {
            if address.contains("boom") {
                panic!("exploded on {address}");
            }
            VerificationResult::new(address, Status::Verified, "Unknown")
        }
    }

    fn inputs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("u{i}@example.de")).collect()
    }

    #[test]
    fn preserves_input_order_despite_completion_order() {
        let addresses = inputs(12);
        let workers = (0..4).map(|_| Delayed { total: 12 }).collect();
        let results = verify_all(&addresses, workers);
        let got: Vec<&str> = results.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(got, addresses.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(results.iter().all(|r| r.country == "Germany"));
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let results = verify_all(&[], vec![Echo, Echo]);
        assert!(results.is_empty());
    }

    #[test]
    fn more_workers_than_addresses() {
        let addresses = inputs(2);
        let results = verify_all(&addresses, (0..8).map(|_| Echo).collect());
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn no_workers_still_yields_one_result_each() {
        let addresses = inputs(3);
        let results = verify_all::<Echo>(&addresses, Vec::new());
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.accepted));
    }

    #[test]
    fn panic_is_confined_to_its_address() {
        let addresses = vec![
            "a@example.com".to_string(),
            "boom@example.com".to_string(),
            "c@example.com".to_string(),
        ];
        let results = verify_all(&addresses, vec![Echo, Echo]);
        assert!(results[0].accepted);
        assert!(results[2].accepted);
        match &results[1].status {
            Status::ProbeFailed(ProbeFailure::Internal(message)) => {
                assert!(message.contains("exploded on boom@example.com"))
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(results[1].country, "Unknown");
    }

    /// `realdomain.test` routes mail; `nonexistent.invalidtld` is NXDOMAIN.
    fn lead_list_dns() -> StubResolver {
        StubResolver::new(
            |domain| match domain {
                "realdomain.test" => Ok(1),
                other => Err(MxError::not_found(other)),
            },
            |domain| match domain {
                "realdomain.test" => Ok(vec![MxRecord::new(10, "mx.realdomain.test")]),
                other => Err(MxError::not_found(other)),
            },
        )
    }

    #[test]
    fn lead_list_end_to_end() {
        let addresses = vec![
            "valid@realdomain.test".to_string(),
            "bad-syntax".to_string(),
            "user@nonexistent.invalidtld".to_string(),
        ];
        let prober = StubProber::new(ProbeOutcome::Accepted);
        let workers = (0..2).map(|_| Pipeline::new(lead_list_dns(), &prober)).collect();
        let results = verify_all(&addresses, workers);

        let got: Vec<(&str, &Status, bool, &str)> = results
            .iter()
            .map(|r| (r.address.as_str(), &r.status, r.accepted, r.country.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("valid@realdomain.test", &Status::Verified, true, "Unknown"),
                ("bad-syntax", &Status::InvalidSyntax, false, "Unknown"),
                ("user@nonexistent.invalidtld", &Status::DomainNotFound, false, "Unknown"),
            ]
        );
        // only the routable domain reached the prober
        let calls = prober.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "valid@realdomain.test");

        let mut valid = Vec::new();
        assert_eq!(write_valid_addresses(&results, &mut valid).expect("write"), 1);
        assert_eq!(valid, b"valid@realdomain.test\n");
    }

    /// Stands in for an exchanger that never answers: the address marked
    /// `stuck` takes `stall` and then times out; every finish is recorded.
    struct Stalling {
        stall: Duration,
        finished: Arc<Mutex<Vec<(String, Instant)>>>,
    }

    impl Verify for Stalling {
        fn verify(&self, address: &str) -> VerificationResult {
            let result = if address.starts_with("stuck@") {
                thread::sleep(self.stall);
                let failure = ProbeFailure::Timeout {
                    stage: ProbeStage::Greeting,
                };
                VerificationResult::new(address, Status::ProbeFailed(failure), "Germany")
            } else {
                VerificationResult::new(address, Status::Verified, "Germany")
            };
            self.finished
                .lock()
                .expect("finish log")
                .push((address.to_string(), Instant::now()));
            result
        }
    }

    #[test]
    fn silent_exchanger_does_not_hold_up_other_addresses() {
        let stall = Duration::from_millis(400);
        let finished = Arc::new(Mutex::new(Vec::new()));
        let mut addresses = vec!["stuck@example.de".to_string()];
        addresses.extend(inputs(6));
        let workers = (0..2)
            .map(|_| Stalling {
                stall,
                finished: Arc::clone(&finished),
            })
            .collect();

        let started = Instant::now();
        let results = verify_all(&addresses, workers);
        let elapsed = started.elapsed();

        assert_eq!(results.len(), addresses.len());
        assert!(elapsed < stall * 2, "batch took {elapsed:?}");
        assert_eq!(
            results[0].status,
            Status::ProbeFailed(ProbeFailure::Timeout {
                stage: ProbeStage::Greeting
            })
        );
        assert!(results[1..].iter().all(|r| r.accepted));

        let log = finished.lock().expect("finish log");
        let stuck_done = log
            .iter()
            .find(|(address, _)| address.starts_with("stuck@"))
            .map(|(_, at)| *at)
            .expect("stuck address finished");
        // the other worker drained every other address while one was stuck
        assert!(
            log.iter()
                .filter(|(address, _)| !address.starts_with("stuck@"))
                .all(|(_, at)| *at < stuck_done)
        );
    }

    #[test]
    fn empty_batch_builds_no_resolver() {
        let verifier = BulkVerifier::new(VerifyOptions {
            workers: Some(4),
            ..VerifyOptions::default()
        });
        let results = verifier.verify_all(&[]).expect("nothing to resolve");
        assert!(results.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn one_result_per_input_in_order(
            addresses in proptest::collection::vec("[a-z@.]{0,12}", 0..40),
            workers in 1usize..6,
        ) {
            let verifiers = (0..workers).map(|_| Echo).collect();
            let safe: Vec<String> = addresses.iter().map(|a| a.replace("boom", "b")).collect();
            let results = verify_all(&safe, verifiers);
            prop_assert_eq!(results.len(), safe.len());
            for (result, address) in results.iter().zip(&safe) {
                prop_assert_eq!(&result.address, address);
            }
        }
    }
}
