//! DNS existence and MX resolution.
//!
//! Lookups go through the [`LookupDns`] trait so the pipeline can run
//! against [`SystemDns`] or a stub. The `check_*_with` helpers turn raw
//! lookups into [`DomainStatus`] / [`MxStatus`], keeping ambiguous resolver
//! failures apart from a definitive NXDOMAIN.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{
    LookupDns, SystemDns, check_domain_with, check_mx, check_mx_with, domain_exists,
    has_mail_exchangers,
};
pub use types::{DomainStatus, MxRecord, MxStatus};
