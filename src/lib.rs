#![forbid(unsafe_code)]
//! leadcheck_lib — bulk e-mail lead verification: syntax, DNS, SMTP probe, country.

#[macro_use]
mod macros;

pub mod country;
pub mod mx;
pub mod report;
pub mod smtp_verify;
pub mod validator;
pub mod verify;

pub use country::{UNKNOWN_COUNTRY, country_name, infer_country};
pub use mx::{Error as MxError, MxRecord, MxStatus, check_mx, domain_exists, has_mail_exchangers};
pub use report::{
    ColoredFormatter, LineFormatter, PlainFormatter, valid_addresses, write_report,
    write_valid_addresses,
};
pub use smtp_verify::{MxPolicy, ProbeOptions, SmtpProber, probe_mailbox};
pub use validator::{EmailAddress, domain_of, is_valid_syntax};
pub use verify::{
    BulkVerifier, Status, VerificationResult, Verify, VerifyError, VerifyOptions, verify_all,
};
