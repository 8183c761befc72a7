// ── Route clause builder ──
//
// Turns destination tokens (hostname, bare address or CIDR) into
// `push "route <network> <mask>"` directives. Name resolution is tried
// first; a token that neither resolves nor parses as a CIDR yields no
// clause and a warning.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use tracing::{debug, warn};

use crate::error::RouteError;

/// Mask used for single-host routes.
pub const HOST_MASK: Ipv4Addr = Ipv4Addr::BROADCAST;

/// One rendered routing directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteClause {
    pub network: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl RouteClause {
    pub fn host(address: Ipv4Addr) -> Self {
        Self {
            network: address,
            mask: HOST_MASK,
        }
    }

    pub fn network(net: Ipv4Net) -> Self {
        Self {
            network: net.network(),
            mask: net.netmask(),
        }
    }
}

impl fmt::Display for RouteClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push \"route {} {}\"", self.network, self.mask)
    }
}

/// Forward name resolution, IPv4 only.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Option<Ipv4Addr>;
}

/// Resolver backed by the system's `getaddrinfo`.
///
/// IPv4 literals are answered without a lookup, and tokens containing
/// `/` are never looked up since no hostname contains one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Option<Ipv4Addr> {
        if let Ok(address) = host.parse::<Ipv4Addr>() {
            return Some(address);
        }
        if host.is_empty() || host.contains('/') {
            return None;
        }

        match tokio::net::lookup_host((host, 0)).await {
            Ok(addrs) => addrs
                .filter_map(|addr| match addr.ip() {
                    IpAddr::V4(v4) => Some(v4),
                    IpAddr::V6(_) => None,
                })
                .next(),
            Err(e) => {
                debug!(host, error = %e, "name lookup failed");
                None
            }
        }
    }
}

/// Clauses built from a batch of tokens, plus the tokens that produced none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteBatch {
    pub clauses: Vec<RouteClause>,
    pub skipped: Vec<String>,
}

impl RouteBatch {
    /// Clauses joined by newlines, in input order.
    pub fn text(&self) -> String {
        render(&self.clauses)
    }
}

/// Join clauses into the text appended to a CCD file.
pub fn render(clauses: &[RouteClause]) -> String {
    clauses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct RouteBuilder {
    resolver: Arc<dyn Resolver>,
}

impl RouteBuilder {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemResolver))
    }

    pub async fn build(&self, token: &str) -> Result<RouteClause, RouteError> {
        let token = token.trim();

        if let Some(address) = self.resolver.resolve(token).await {
            return Ok(RouteClause::host(address));
        }

        if let Ok(net) = token.parse::<Ipv4Net>() {
            return Ok(RouteClause::network(net));
        }

        warn!(token, "destination is neither a resolvable host nor a CIDR block");
        Err(RouteError::Unresolvable {
            token: token.to_owned(),
        })
    }

    /// Build every token in order. Bad tokens are skipped, not fatal.
    pub async fn build_all<S: AsRef<str>>(&self, tokens: &[S]) -> RouteBatch {
        let mut batch = RouteBatch::default();
        for token in tokens {
            match self.build(token.as_ref()).await {
                Ok(clause) => batch.clauses.push(clause),
                Err(RouteError::Unresolvable { token }) => batch.skipped.push(token),
            }
        }
        batch
    }
}

impl Default for RouteBuilder {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder").finish_non_exhaustive()
    }
}
