use thiserror::Error;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain {domain} does not exist")]
    NotFound { domain: String },
    #[error("DNS query for {domain} timed out")]
    Timeout { domain: String },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("reading system resolver configuration failed: {source}")]
    SystemConf {
        #[source]
        source: std::io::Error,
    },
    #[error("DNS lookup for {domain} failed: {source}")]
    Lookup {
        domain: String,
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
}

impl MxError {
    pub(crate) fn not_found(domain: impl Into<String>) -> Self {
        Self::NotFound {
            domain: domain.into(),
        }
    }

    pub(crate) fn timeout(domain: impl Into<String>) -> Self {
        Self::Timeout {
            domain: domain.into(),
        }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    // unix reports io::Error, windows ResolveError
    pub(crate) fn system_conf(source: impl Into<std::io::Error>) -> Self {
        Self::SystemConf {
            source: source.into(),
        }
    }

    pub(crate) fn lookup(
        domain: impl Into<String>,
        source: trust_dns_resolver::error::ResolveError,
    ) -> Self {
        Self::Lookup {
            domain: domain.into(),
            source,
        }
    }

    /// True for the definitive "name does not exist" answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
