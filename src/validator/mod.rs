mod types;

pub use types::EmailAddress;

use std::sync::LazyLock;

use regex::Regex;

// local: [A-Za-z0-9_.+-]+, puis un label, un point, et la suite (points, tirets, alnum)
static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$")
        .unwrap_or_else(|err| panic!("address pattern must compile: {err}"))
});

/// Checks the address against the lead-list syntax rules.
///
/// No trimming or case folding happens here: callers hand in pre-trimmed
/// input, and `" user@example.com"` is rejected as-is.
pub fn is_valid_syntax(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

/// Domain part of `address` (everything after the first '@'), if any.
pub fn domain_of(address: &str) -> Option<&str> {
    address.split_once('@').map(|(_, domain)| domain)
}
