// ── Virtual address pool ──
//
// A flat IPv4 block from which per-account virtual addresses are drawn.
// Addresses are handled as big-endian u32 and identified by their offset
// from the block's network address.

use std::fmt;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::str::FromStr;

use ipnet::Ipv4Net;
use tracing::warn;

use crate::error::PoolError;

/// Offset 0 is the network id and offset 1 the server's own address.
pub const FIRST_ASSIGNABLE_OFFSET: u32 = 2;

/// The subnet topology needs the client pool to be a /16 or wider.
pub const MAX_PREFIX_LEN: u8 = 16;

/// The address block handed out to VPN clients.
///
/// Bounds are computed once at construction and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPool {
    net: Ipv4Net,
    base: u32,
    size: u64,
}

impl AddressPool {
    /// Build a pool from a prefix. Host bits of the prefix are ignored.
    ///
    /// A prefix narrower than [`MAX_PREFIX_LEN`] is accepted but logged.
    pub fn new(net: Ipv4Net) -> Self {
        let net = net.trunc();
        if net.prefix_len() > MAX_PREFIX_LEN {
            warn!(
                pool = %net,
                max_prefix_len = MAX_PREFIX_LEN,
                "address pool is narrower than a /16"
            );
        }

        Self {
            net,
            base: u32::from(net.network()),
            size: 1u64 << (32 - u32::from(net.prefix_len())),
        }
    }

    pub fn net(&self) -> Ipv4Net {
        self.net
    }

    pub fn base(&self) -> Ipv4Addr {
        self.net.network()
    }

    /// Number of addresses in the block, reserved ones included.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn netmask(&self) -> Ipv4Addr {
        self.net.netmask()
    }

    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.net.contains(&address)
    }

    /// Offsets that may be assigned to accounts: `[2, size - 3]`.
    ///
    /// Empty for blocks too small to hold a client.
    pub fn assignable(&self) -> RangeInclusive<u32> {
        let last = self
            .size
            .checked_sub(3)
            .and_then(|last| u32::try_from(last).ok())
            .unwrap_or(0);
        FIRST_ASSIGNABLE_OFFSET..=last
    }

    pub fn offset_to_address(&self, offset: u32) -> Result<Ipv4Addr, PoolError> {
        let range = self.assignable();
        if !range.contains(&offset) {
            return Err(PoolError::OffsetOutOfRange {
                offset,
                first: *range.start(),
                last: *range.end(),
                pool: self.net,
            });
        }
        Ok(Ipv4Addr::from(self.base | offset))
    }

    pub fn address_to_offset(&self, address: Ipv4Addr) -> Result<u32, PoolError> {
        if !self.contains(address) {
            return Err(PoolError::AddressNotInPool {
                address,
                pool: self.net,
            });
        }
        Ok(u32::from(address) - self.base)
    }
}

impl FromStr for AddressPool {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net: Ipv4Net = s.trim().parse().map_err(|e: ipnet::AddrParseError| {
            PoolError::InvalidCidr {
                input: s.to_owned(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::new(net))
    }
}

impl fmt::Display for AddressPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}
