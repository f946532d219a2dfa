//! Per-address verification pipeline and the bulk runner around it.
//!
//! Every address yields exactly one [`VerificationResult`]: syntax, domain,
//! MX and probe failures are statuses, not errors. [`verify_all`] keeps
//! results in input order regardless of which worker finished first.

mod bulk;
mod error;
mod options;
mod pipeline;
mod types;

pub use bulk::{BulkVerifier, SystemPipeline, verify_all};
pub use error::VerifyError;
pub use options::VerifyOptions;
pub use pipeline::{Pipeline, Verify};
pub use types::{Status, VerificationResult};
