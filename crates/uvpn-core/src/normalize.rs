// ── Destination normalizer ──
//
// Producer-side cleanup of destination tokens before they go into an
// event. Only internal networks are granted through the VPN, so public
// IPv4 literals are dropped with a warning. CIDR blocks are rewritten to
// their network address and repeats collapse onto the first occurrence.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use strum::Display;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TokenKind {
    Address,
    Network,
    Hostname,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RejectReason {
    Empty,
    PublicAddress,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedToken {
    pub token: String,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub tokens: Vec<String>,
    pub rejected: Vec<RejectedToken>,
}

/// Addresses reachable only inside the organisation.
pub fn is_internal(address: Ipv4Addr) -> bool {
    address.is_private() || address.is_loopback() || address.is_link_local()
}

/// Canonical form and kind of a single token.
pub fn classify(token: &str) -> Result<(TokenKind, String), RejectReason> {
    let token = token.trim();
    if token.is_empty() {
        return Err(RejectReason::Empty);
    }

    if let Ok(address) = token.parse::<Ipv4Addr>() {
        if !is_internal(address) {
            return Err(RejectReason::PublicAddress);
        }
        return Ok((TokenKind::Address, address.to_string()));
    }

    if token.contains('/') {
        return token
            .parse::<Ipv4Net>()
            .map(|net| (TokenKind::Network, net.trunc().to_string()))
            .map_err(|_| RejectReason::Malformed);
    }

    // "12.4.3" would otherwise reach the resolver, which reads it as 12.4.0.3
    if token.chars().all(|c| c.is_ascii_digit() || c == '.') || !is_hostname(token) {
        return Err(RejectReason::Malformed);
    }
    Ok((TokenKind::Hostname, token.to_ascii_lowercase()))
}

pub fn normalize<I, S>(tokens: I) -> Normalized
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Normalized::default();

    for token in tokens {
        let token = token.as_ref();
        match classify(token) {
            Ok((_, canonical)) => {
                if seen.insert(canonical.clone()) {
                    out.tokens.push(canonical);
                }
            }
            Err(reason) => {
                warn!(token, %reason, "dropping destination");
                out.rejected.push(RejectedToken {
                    token: token.trim().to_owned(),
                    reason,
                });
            }
        }
    }
    out
}

fn is_hostname(token: &str) -> bool {
    token.len() <= 253
        && token.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
