use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    proto::op::ResponseCode,
    system_conf,
};

use super::{DomainStatus, Error, MxRecord, MxStatus};

/// Lookup MX records for `domain` using the system resolver.
///
/// The returned [`MxStatus`] keeps records in the order of the DNS answer;
/// NXDOMAIN and empty answers both yield [`MxStatus::NoRecords`].
pub fn check_mx(domain: &str) -> Result<MxStatus, Error> {
    let resolver = SystemDns::from_system_conf()?;
    Ok(check_mx_with(&resolver, domain))
}

/// `true` unless the system resolver answers NXDOMAIN for `domain`.
/// Ambiguous failures count as "does not exist".
pub fn domain_exists(domain: &str) -> bool {
    SystemDns::from_system_conf()
        .map(|resolver| check_domain_with(&resolver, domain).exists())
        .unwrap_or(false)
}

/// `true` iff the system resolver returns at least one MX record.
pub fn has_mail_exchangers(domain: &str) -> bool {
    SystemDns::from_system_conf()
        .map(|resolver| check_mx_with(&resolver, domain).has_records())
        .unwrap_or(false)
}

pub fn check_domain_with<R>(resolver: &R, domain: &str) -> DomainStatus
where
    R: LookupDns + ?Sized,
{
    match normalize_domain(domain).and_then(|ascii| resolver.lookup_a(&ascii)) {
        // the name exists even when it only carries MX/AAAA data
        Ok(_) => DomainStatus::Exists,
        Err(Error::NotFound { .. }) => DomainStatus::NotFound,
        Err(err) => DomainStatus::Unresolved(err.to_string()),
    }
}

pub fn check_mx_with<R>(resolver: &R, domain: &str) -> MxStatus
where
    R: LookupDns + ?Sized,
{
    match normalize_domain(domain).and_then(|ascii| resolver.lookup_mx(&ascii)) {
        Ok(records) if records.is_empty() => MxStatus::NoRecords,
        Ok(records) => MxStatus::Records(records),
        Err(Error::NotFound { .. }) => MxStatus::NoRecords,
        Err(err) => MxStatus::Unresolved(err.to_string()),
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    Ok(trimmed.to_ascii_lowercase())
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// DNS queries needed by the pipeline. Implementations map NXDOMAIN to
/// [`Error::NotFound`] and an empty NOERROR answer to an empty result.
pub trait LookupDns {
    /// Number of A records for `domain`.
    fn lookup_a(&self, domain: &str) -> Result<usize, Error>;

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error>;

    /// Addresses of a mail exchanger host. IP literals resolve to themselves.
    fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>, Error>;
}

impl<T: LookupDns + ?Sized> LookupDns for &T {
    fn lookup_a(&self, domain: &str) -> Result<usize, Error> {
        (**self).lookup_a(domain)
    }

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        (**self).lookup_mx(domain)
    }

    fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>, Error> {
        (**self).lookup_host(host)
    }
}

impl<T: LookupDns + ?Sized> LookupDns for Arc<T> {
    fn lookup_a(&self, domain: &str) -> Result<usize, Error> {
        (**self).lookup_a(domain)
    }

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        (**self).lookup_mx(domain)
    }

    fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>, Error> {
        (**self).lookup_host(host)
    }
}

/// Synchronous resolver built from the host's resolver configuration.
pub struct SystemDns {
    resolver: Resolver,
}

impl SystemDns {
    pub fn from_system_conf() -> Result<Self, Error> {
        let resolver = Resolver::from_system_conf().map_err(Error::resolver_init)?;
        Ok(Self { resolver })
    }

    /// Same configuration as the system resolver, with every query bounded
    /// by `timeout` and a single attempt per name server.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let (config, mut opts) = system_conf::read_system_conf().map_err(Error::system_conf)?;
        opts.timeout = timeout;
        opts.attempts = 1;
        let resolver = Resolver::new(config, opts).map_err(Error::resolver_init)?;
        Ok(Self { resolver })
    }
}

impl LookupDns for SystemDns {
    fn lookup_a(&self, domain: &str) -> Result<usize, Error> {
        match self.resolver.ipv4_lookup(fqdn(domain)) {
            Ok(lookup) => Ok(lookup.iter().count()),
            Err(err) => classify(domain, err).map(|()| 0),
        }
    }

    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, Error> {
        let lookup = match self.resolver.mx_lookup(fqdn(domain)) {
            Ok(lookup) => lookup,
            Err(err) => return classify(domain, err).map(|()| Vec::new()),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }

    fn lookup_host(&self, host: &str) -> Result<Vec<IpAddr>, Error> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        match self.resolver.lookup_ip(fqdn(host)) {
            Ok(lookup) => Ok(lookup.iter().collect()),
            Err(err) => classify(host, err).map(|()| Vec::new()),
        }
    }
}

// absolute name, so search domains never rewrite an NXDOMAIN
fn fqdn(domain: &str) -> String {
    format!("{domain}.")
}

/// `Ok(())` means "the name exists but has no records of that type".
fn classify(domain: &str, err: ResolveError) -> Result<(), Error> {
    let response_code = match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Some(*response_code),
        ResolveErrorKind::Timeout => return Err(Error::timeout(domain)),
        _ => None,
    };
    match response_code {
        Some(ResponseCode::NXDomain) => Err(Error::not_found(domain)),
        Some(ResponseCode::NoError) => Ok(()),
        _ => Err(Error::lookup(domain, err)),
    }
}
