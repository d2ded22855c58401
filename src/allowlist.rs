//! Domain allow-list authorization.
//!
//! A request domain is authorized when it exactly equals a configured entry,
//! or when the portion after its first DNS label ends with a configured entry.
//! An entry `example.com` therefore authorizes `example.com` itself and any
//! name below it, such as `foo.example.com`, but not `evilexample.com`.
//!
//! The list is configured once at startup and never changes; an empty list
//! rejects everything.

use crate::error::Error;

/// Check `check_domain` against the configured allow-list.
///
/// Pure; the only observable effects are trace events.
///
/// # Errors
///
/// Returns [`Error::InvalidDomainFormat`] when `check_domain` is empty or is a
/// single label that matches no entry exactly (the suffix rule needs at least
/// two labels to strip one).
///
/// Returns [`Error::NotAuthorizedDomain`] when no entry matches.
pub fn authorize(check_domain: &str, allowed_domains: &[String]) -> Result<(), Error> {
    if check_domain.is_empty() {
        return Err(Error::InvalidDomainFormat(check_domain.to_string()));
    }

    if allowed_domains.iter().any(|d| d == check_domain) {
        return Ok(());
    }

    // The suffix rule compares against the domain minus its leftmost label.
    // A single-label domain has nothing left after that and can't be
    // suffix-matched at all.
    let Some((_, parent)) = check_domain.split_once('.') else {
        return Err(Error::InvalidDomainFormat(check_domain.to_string()));
    };

    for allowed_domain in allowed_domains {
        tracing::debug!(check_domain, %allowed_domain, "checking allowed domain");
        if parent.ends_with(allowed_domain.as_str()) {
            return Ok(());
        }
    }

    Err(Error::NotAuthorizedDomain(check_domain.to_string()))
}
