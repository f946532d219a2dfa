use thiserror::Error;

use crate::mx::Error as MxError;

/// Setup failures of the bulk runner. Per-address problems are
/// [`Status`](super::Status) values, never errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("building the DNS resolver for worker {worker} failed: {source}")]
    Resolver {
        worker: usize,
        #[source]
        source: MxError,
    },
}

impl VerifyError {
    pub(crate) fn resolver(worker: usize, source: MxError) -> Self {
        Self::Resolver { worker, source }
    }
}
