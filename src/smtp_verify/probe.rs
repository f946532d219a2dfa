use std::net::SocketAddr;
use std::time::Instant;

use crate::mx::{Error as MxError, LookupDns, MxRecord, MxStatus, SystemDns, check_mx_with};
use crate::validator::EmailAddress;

use super::options::{MxPolicy, ProbeOptions};
use super::session::{SmtpSession, Transport};
use super::types::{
    ProbeFailure, ProbeOutcome, ProbeReport, ProbeStage as Stage, Rejection, SmtpReply,
};

/// Asks a mail exchanger whether it would accept mail for an address.
pub trait ProbeMailbox {
    /// `records` are the domain's MX records in DNS answer order.
    fn probe(&self, address: &EmailAddress, records: &[MxRecord]) -> ProbeReport;
}

impl<P: ProbeMailbox + ?Sized> ProbeMailbox for &P {
    fn probe(&self, address: &EmailAddress, records: &[MxRecord]) -> ProbeReport {
        (**self).probe(address, records)
    }
}

/// Probe over plain SMTP: greeting, `EHLO`/`HELO`, `MAIL FROM`, `RCPT TO`.
///
/// Exchanger host names are resolved through `resolver`, so they share the
/// DNS timeouts of the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct SmtpProber<R = SystemDns> {
    options: ProbeOptions,
    resolver: R,
}

impl<R: LookupDns> SmtpProber<R> {
    pub fn new(options: ProbeOptions, resolver: R) -> Self {
        Self { options, resolver }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    fn probe_host(&self, exchange: &str, address: &EmailAddress) -> (ProbeOutcome, Vec<String>) {
        let deadline = Instant::now() + self.options.session_timeout;
        let addrs = match self.resolver.lookup_host(exchange) {
            Ok(ips) if !ips.is_empty() => ips
                .into_iter()
                .map(|ip| SocketAddr::new(ip, self.options.port))
                .collect::<Vec<_>>(),
            Err(MxError::Timeout { .. }) => {
                let failure = ProbeFailure::Timeout {
                    stage: Stage::Resolve,
                };
                return (ProbeOutcome::Failed(failure), Vec::new());
            }
            Ok(_) | Err(_) => {
                let failure = ProbeFailure::Unresolvable {
                    host: exchange.to_string(),
                };
                return (ProbeOutcome::Failed(failure), Vec::new());
            }
        };

        let connected = SmtpSession::connect(
            exchange,
            &addrs,
            self.options.connect_timeout,
            self.options.command_timeout,
            deadline,
        );
        let mut session = match connected {
            Ok((session, _peer)) => session,
            Err(err) if err.is_timeout() => {
                let failure = ProbeFailure::Timeout {
                    stage: Stage::Connect,
                };
                return (ProbeOutcome::Failed(failure), Vec::new());
            }
            Err(err) => {
                let failure = ProbeFailure::Connect {
                    host: exchange.to_string(),
                    message: err.to_string(),
                };
                return (ProbeOutcome::Failed(failure), Vec::new());
            }
        };

        let outcome = run_dialogue(&mut session, address, &self.options);
        let transcript = std::mem::take(&mut session.transcript);
        (outcome, transcript)
    }
}

impl<R: LookupDns> ProbeMailbox for SmtpProber<R> {
    fn probe(&self, address: &EmailAddress, records: &[MxRecord]) -> ProbeReport {
        let hosts = select_exchangers(records, &self.options);
        let mut mx_tried = Vec::new();
        let mut transcript = Vec::new();
        let mut last = ProbeOutcome::Failed(ProbeFailure::NoExchanger);

        for host in hosts {
            mx_tried.push(host.to_string());
            let (outcome, lines) = self.probe_host(host, address);
            transcript.extend(lines);
            log_debug!(%address, host, ?outcome, "probe attempt finished");
            // only a probe that never got an answer moves on to the next host
            if !matches!(outcome, ProbeOutcome::Failed(_)) {
                return ProbeReport::new(outcome, mx_tried, transcript);
            }
            last = outcome;
        }

        ProbeReport::new(last, mx_tried, transcript)
    }
}

/// Resolves the MX records of `address` with the system resolver and
/// probes them with default options. Fails closed.
pub fn probe_mailbox(address: &str) -> bool {
    let Some(address) = EmailAddress::parse(address) else {
        return false;
    };
    let Ok(resolver) = SystemDns::from_system_conf() else {
        return false;
    };
    match check_mx_with(&resolver, address.domain()) {
        MxStatus::Records(records) => SmtpProber::new(ProbeOptions::default(), &resolver)
            .probe(&address, &records)
            .outcome
            .is_accepted(),
        MxStatus::NoRecords | MxStatus::Unresolved(_) => false,
    }
}

pub(crate) fn select_exchangers<'a>(
    records: &'a [MxRecord],
    options: &ProbeOptions,
) -> Vec<&'a str> {
    match options.mx_policy {
        MxPolicy::FirstOnly => records
            .first()
            .map(|record| record.exchange.as_str())
            .into_iter()
            .collect(),
        MxPolicy::PriorityOrdered => {
            let mut sorted: Vec<&MxRecord> = records.iter().collect();
            // stable: equal preferences keep answer order
            sorted.sort_by_key(|record| record.preference);
            let mut hosts: Vec<&str> = Vec::new();
            for record in sorted {
                if !hosts.contains(&record.exchange.as_str()) {
                    hosts.push(record.exchange.as_str());
                }
            }
            hosts.truncate(options.max_servers.max(1));
            hosts
        }
    }
}

/// Runs the probe dialogue on an open session. Any reply other than the
/// expected one ends the dialogue with a rejection; `QUIT` follows every
/// reply the server actually sent.
pub(crate) fn run_dialogue<S: Transport>(
    session: &mut SmtpSession<S>,
    address: &EmailAddress,
    options: &ProbeOptions,
) -> ProbeOutcome {
    match dialogue(session, address, options) {
        Ok(outcome) => {
            session.quit();
            outcome
        }
        Err(failure) => ProbeOutcome::Failed(failure),
    }
}

fn dialogue<S: Transport>(
    session: &mut SmtpSession<S>,
    address: &EmailAddress,
    options: &ProbeOptions,
) -> Result<ProbeOutcome, ProbeFailure> {
    let greeting = session.read_reply().map_err(|err| err.at(Stage::Greeting))?;
    if !greeting.is_positive_completion() {
        return Ok(rejected(Stage::Greeting, greeting));
    }

    let helo = options.helo_name();
    let mut reply = command(session, Stage::Helo, &format!("EHLO {helo}"))?;
    if reply.is_permanent_failure() {
        // pre-ESMTP servers answer 500/502 to EHLO
        reply = command(session, Stage::Helo, &format!("HELO {helo}"))?;
    }
    if !reply.is_positive_completion() {
        return Ok(rejected(Stage::Helo, reply));
    }

    let reply = command(session, Stage::MailFrom, &options.envelope())?;
    if !reply.is_positive_completion() {
        return Ok(rejected(Stage::MailFrom, reply));
    }

    let reply = command(session, Stage::RcptTo, &format!("RCPT TO:<{address}>"))?;
    if reply.code == 250 {
        Ok(ProbeOutcome::Accepted)
    } else {
        Ok(rejected(Stage::RcptTo, reply))
    }
}

fn command<S: Transport>(
    session: &mut SmtpSession<S>,
    stage: Stage,
    line: &str,
) -> Result<SmtpReply, ProbeFailure> {
    session.exchange(line).map_err(|err| err.at(stage))
}

fn rejected(stage: Stage, reply: SmtpReply) -> ProbeOutcome {
    ProbeOutcome::Rejected(Rejection::new(stage, reply))
}
