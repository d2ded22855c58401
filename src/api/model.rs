//! Wire messages for the challenge routes and their normalization.
//!
//! Clients send one of two JSON payload shapes, matching lego's [httpreq]
//! provider:
//!
//! * default mode: `{"fqdn": "...", "value": "..."}`
//! * raw mode: `{"domain": "...", "token": "...", "keyauth": "..."}`
//!
//! Both field groups are accepted in a single neutral [`IncomingMessage`] and
//! then classified into a [`ChallengeRequest`] variant. A payload carrying a
//! complete default field group always classifies as default mode, even if it
//! also carries raw fields; the tie-break is deliberate and matches what
//! httpreq clients expect.
//!
//! [httpreq]: https://github.com/go-acme/lego/tree/master/providers/dns/httpreq

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two payload shapes a client may send.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    Default,
    Raw,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Default => f.write_str("default"),
            Mode::Raw => f.write_str("raw"),
        }
    }
}

/// Neutral decoding of an incoming payload, before mode classification.
///
/// Either field group may be partially or wholly absent; unknown fields are
/// ignored.
#[derive(Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct IncomingMessage {
    #[serde(default)]
    pub fqdn: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub keyauth: String,
}

/// A normalized, mode-tagged challenge request.
///
/// Constructed fresh per inbound call via [`IncomingMessage::classify`] and
/// echoed back verbatim as the success response body, so it serializes to the
/// exact wire shape of the mode that owns it.
#[derive(Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(untagged)]
pub enum ChallengeRequest {
    Default {
        fqdn: String,
        value: String,
    },
    Raw {
        domain: String,
        token: String,
        #[serde(rename = "keyauth")]
        key_auth: String,
    },
}

impl IncomingMessage {
    /// Canonicalize both field groups and classify the message into a
    /// [`ChallengeRequest`].
    ///
    /// Default mode wins when both shapes are satisfied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousPayload`] when neither shape is satisfied.
    pub fn classify(self) -> Result<ChallengeRequest, Error> {
        let fqdn = to_fqdn(&self.fqdn);
        let domain = un_fqdn(&self.domain);

        if !fqdn.is_empty() && !self.value.is_empty() {
            return Ok(ChallengeRequest::Default {
                fqdn,
                value: self.value,
            });
        }
        if !domain.is_empty() && (!self.token.is_empty() || !self.keyauth.is_empty()) {
            return Ok(ChallengeRequest::Raw {
                domain,
                token: self.token,
                key_auth: self.keyauth,
            });
        }
        Err(Error::AmbiguousPayload)
    }
}

impl ChallengeRequest {
    pub fn mode(&self) -> Mode {
        match self {
            ChallengeRequest::Default { .. } => Mode::Default,
            ChallengeRequest::Raw { .. } => Mode::Raw,
        }
    }

    /// The domain to run through the allow-list.
    ///
    /// Default mode strips the `_acme-challenge.` label and the trailing dot
    /// from the FQDN; raw mode uses the canonical domain as-is.
    pub fn check_domain(&self) -> String {
        match self {
            ChallengeRequest::Default { fqdn, .. } => {
                un_fqdn(fqdn.strip_prefix("_acme-challenge.").unwrap_or(fqdn.as_str()))
            }
            ChallengeRequest::Raw { domain, .. } => domain.clone(),
        }
    }
}

/// Append the trailing dot unless the name already carries one. Empty names
/// stay empty.
pub(crate) fn to_fqdn(name: &str) -> String {
    if name.is_empty() || name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Strip the trailing dot, if any.
pub(crate) fn un_fqdn(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_string()
}
