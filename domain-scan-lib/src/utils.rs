//! Utility functions for domain processing and validation.

use crate::error::DomainScanError;
use regex::Regex;

lazy_static::lazy_static! {
    /// Labels of 2-63 characters from `[a-z0-9-]`, at least two labels.
    static ref DOMAIN_SYNTAX: Regex =
        Regex::new(r"^(?:[a-z0-9\-]{2,63}\.)+[a-z0-9\-]{2,63}$").expect("static regex");
}

/// Domain-syntax predicate every generated candidate must pass before it is
/// scheduled.
///
/// Only lowercase ASCII letters, digits and hyphens are accepted, each label
/// (the TLD included) must be 2 to 63 characters long and there must be at
/// least one dot.
pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_SYNTAX.is_match(domain)
}

/// Validate a domain name, returning a descriptive error when it is rejected.
pub fn validate_domain(domain: &str) -> Result<(), DomainScanError> {
    if domain.is_empty() {
        return Err(DomainScanError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if !domain.contains('.') {
        return Err(DomainScanError::invalid_domain(
            domain,
            "Domain name must contain a TLD",
        ));
    }

    if !is_valid_domain(domain) {
        return Err(DomainScanError::invalid_domain(
            domain,
            "Labels must be 2-63 characters of a-z, 0-9 or '-'",
        ));
    }

    Ok(())
}

/// Extract the TLD (the text after the last dot) from a domain.
pub fn extract_tld(domain: &str) -> Result<&str, DomainScanError> {
    match domain.rsplit_once('.') {
        Some((_, tld)) if !tld.is_empty() => Ok(tld),
        _ => Err(DomainScanError::invalid_domain(
            domain,
            "Domain must contain a TLD",
        )),
    }
}

/// Find which of the supported TLDs a domain belongs to.
pub fn match_tld<'a>(domain: &str, tlds: &'a [String]) -> Option<&'a str> {
    tlds.iter().map(String::as_str).find(|tld| {
        domain
            .strip_suffix(*tld)
            .and_then(|rest| rest.strip_suffix('.'))
            .is_some_and(|name| !name.is_empty())
    })
}
