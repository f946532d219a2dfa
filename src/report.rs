//! Console report lines and the valid-address list.
//!
//! Rendering goes through a [`LineFormatter`] chosen by the caller, so the
//! library never touches process-wide color settings.

use std::io::{self, Write};

use colored::Colorize;

use crate::verify::VerificationResult;

/// Renders one result as a single report line (no trailing newline).
pub trait LineFormatter {
    fn format_line(&self, result: &VerificationResult) -> String;
}

/// `<address> - <reason> - <country>` without any escape codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl LineFormatter for PlainFormatter {
    fn format_line(&self, result: &VerificationResult) -> String {
        format!("{} - {}", result.address, verdict(result))
    }
}

/// Same layout as [`PlainFormatter`]; the verdict part is green for
/// accepted addresses and red otherwise.
///
/// `colored` still honours `NO_COLOR`/`CLICOLOR` and drops the escapes
/// when the output is not a terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColoredFormatter;

impl LineFormatter for ColoredFormatter {
    fn format_line(&self, result: &VerificationResult) -> String {
        let verdict = verdict(result);
        let painted = if result.accepted {
            verdict.green()
        } else {
            verdict.red()
        };
        format!("{} - {painted}", result.address)
    }
}

fn verdict(result: &VerificationResult) -> String {
    format!("{} - {}", result.status.reason(), result.country)
}

/// Writes one formatted line per result, in order.
pub fn write_report<F, W>(results: &[VerificationResult], formatter: &F, mut out: W) -> io::Result<()>
where
    F: LineFormatter + ?Sized,
    W: Write,
{
    for result in results {
        writeln!(out, "{}", formatter.format_line(result))?;
    }
    out.flush()
}

/// Accepted addresses, in result order.
pub fn valid_addresses(results: &[VerificationResult]) -> impl Iterator<Item = &str> {
    results
        .iter()
        .filter(|result| result.accepted)
        .map(|result| result.address.as_str())
}

/// Writes every accepted address on its own newline-terminated line and
/// returns how many were written. Nothing is written when none qualify.
pub fn write_valid_addresses<W: Write>(results: &[VerificationResult], mut out: W) -> io::Result<usize> {
    let mut written = 0;
    for address in valid_addresses(results) {
        writeln!(out, "{address}")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp_verify::{ProbeFailure, ProbeStage, Rejection};
    use crate::verify::Status;

    fn sample() -> Vec<VerificationResult> {
        vec![
            VerificationResult::new("anna@example.de", Status::Verified, "Germany"),
            VerificationResult::unknown_country("bad-syntax", Status::InvalidSyntax),
            VerificationResult::unknown_country("x@nowhere.invalid", Status::DomainNotFound),
            VerificationResult::unknown_country("y@web-only.fr", Status::NoMailExchanger),
            VerificationResult::new(
                "ghost@example.it",
                Status::ProbeRejected(Rejection {
                    stage: ProbeStage::RcptTo,
                    code: 550,
                    message: "User unknown".to_string(),
                }),
                "Italy",
            ),
            VerificationResult::new(
                "slow@example.com",
                Status::ProbeFailed(ProbeFailure::Timeout {
                    stage: ProbeStage::Greeting,
                }),
                "Unknown",
            ),
            VerificationResult::new("bob@example.co.uk", Status::Verified, "United Kingdom"),
        ]
    }

    fn render<F: LineFormatter>(formatter: &F) -> String {
        let mut buf = Vec::new();
        write_report(&sample(), formatter, &mut buf).expect("write to Vec");
        String::from_utf8(buf).expect("utf-8")
    }

    #[test]
    fn plain_report() {
        insta::assert_snapshot!(render(&PlainFormatter), @r"
        anna@example.de - Verified - Germany
        bad-syntax - Invalid Email Syntax - Unknown
        x@nowhere.invalid - Domain Does Not Exist - Unknown
        y@web-only.fr - No MX Records - Unknown
        ghost@example.it - Email Not Verified - Italy
        slow@example.com - Email Not Verified - Unknown
        bob@example.co.uk - Verified - United Kingdom
        ");
    }

    #[test]
    fn colored_lines_keep_plain_text() {
        for result in sample() {
            let line = ColoredFormatter.format_line(&result);
            assert!(line.starts_with(&format!("{} - ", result.address)));
            assert!(line.contains(result.status.reason()));
            assert!(line.contains(&result.country));
        }
    }

    #[test]
    fn formatter_is_injectable_as_trait_object() {
        let formatter: Box<dyn LineFormatter> = Box::new(PlainFormatter);
        let mut buf = Vec::new();
        write_report(&sample()[..1], formatter.as_ref(), &mut buf).expect("write");
        assert_eq!(buf, b"anna@example.de - Verified - Germany\n");
    }

    #[test]
    fn valid_file_lists_only_accepted_in_order() {
        let mut buf = Vec::new();
        let written = write_valid_addresses(&sample(), &mut buf).expect("write");
        assert_eq!(written, 2);
        insta::assert_snapshot!(String::from_utf8(buf).expect("utf-8"), @r"
        anna@example.de
        bob@example.co.uk
        ");
    }

    #[test]
    fn no_accepted_addresses_writes_nothing() {
        let results = &sample()[1..6];
        let mut buf = Vec::new();
        assert_eq!(write_valid_addresses(results, &mut buf).expect("write"), 0);
        assert!(buf.is_empty());
    }
}
