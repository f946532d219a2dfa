use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

use crate::smtp_verify::ProbeOptions;

/// Knobs for [`BulkVerifier`](super::BulkVerifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    pub probe: ProbeOptions,
    /// Per-query DNS timeout. `None` keeps the system resolver settings.
    pub dns_timeout: Option<Duration>,
    /// Worker threads. `None` picks `min(32, cpus + 4)`.
    pub workers: Option<usize>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            probe: ProbeOptions::default(),
            dns_timeout: Some(Duration::from_secs(5)),
            workers: None,
        }
    }
}

impl VerifyOptions {
    /// Number of workers for a batch of `jobs` addresses; never more
    /// workers than jobs, never zero.
    pub fn worker_count(&self, jobs: usize) -> usize {
        let wanted = self.workers.unwrap_or_else(|| {
            let cpus = thread::available_parallelism().map_or(1, NonZeroUsize::get);
            (cpus + 4).min(32)
        });
        wanted.min(jobs).max(1)
    }
}
