//! IP address blocks (RFC 3779 section 2).
//!
//! Addresses arrive as ASN.1 BIT STRINGs: an unused-bit count plus up to 4
//! (IPv4) or 16 (IPv6) octets. Every explicit entry is canonicalized into a
//! `(min, max)` pair of address byte strings at parse time so that both the
//! per-certificate overlap check and the chain coverage check reduce to
//! lexicographic byte comparisons.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;
use serde::Serialize;

use super::Coverage;

/// Widest address size we deal with (IPv6), in bytes.
pub const MAX_ADDR_SIZE: usize = 16;

/// Address Family Identifier, RFC 3779 section 2.2.3.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Afi {
    Ipv4 = 1,
    Ipv6 = 2,
}

impl Afi {
    /// Parse an addressFamily octet string: a two-byte AFI, optionally
    /// followed by a SAFI byte which is ignored.
    pub fn from_family(d: &[u8]) -> Option<Self> {
        if d.len() != 2 && d.len() != 3 {
            return None;
        }
        match u16::from_be_bytes([d[0], d[1]]) {
            1 => Some(Afi::Ipv4),
            2 => Some(Afi::Ipv6),
            _ => None,
        }
    }

    /// Address width in bytes.
    pub fn addr_len(self) -> usize {
        match self {
            Afi::Ipv4 => 4,
            Afi::Ipv6 => 16,
        }
    }

    /// Address width in bits.
    pub fn bit_len(self) -> usize {
        self.addr_len() * 8
    }
}

impl fmt::Display for Afi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Afi::Ipv4 => write!(f, "IPv4"),
            Afi::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// An address plus prefix length, decoded from an RFC 3779 bit string.
///
/// The address bytes are kept zero-padded to [`MAX_ADDR_SIZE`]; only the
/// first `afi.addr_len()` bytes are meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IpAddress {
    pub prefix_len: u8,
    pub addr: [u8; MAX_ADDR_SIZE],
}

impl IpAddress {
    /// Build an address from BIT STRING content: the unused-bit count and
    /// the octets. Fails on an unused count above 7, on an empty string
    /// with a nonzero unused count, and on more octets than the AFI allows.
    pub fn from_bits(afi: Afi, unused: u8, octets: &[u8]) -> Option<Self> {
        if unused > 7 {
            return None;
        }
        if octets.is_empty() && unused != 0 {
            return None;
        }
        if octets.len() > afi.addr_len() {
            return None;
        }
        let mut addr = [0u8; MAX_ADDR_SIZE];
        addr[..octets.len()].copy_from_slice(octets);
        Some(IpAddress {
            prefix_len: (octets.len() * 8 - unused as usize) as u8,
            addr,
        })
    }

    /// The address as a standard library `IpAddr`.
    pub fn to_ip_addr(self, afi: Afi) -> IpAddr {
        match afi {
            Afi::Ipv4 => {
                let mut b = [0u8; 4];
                b.copy_from_slice(&self.addr[..4]);
                IpAddr::V4(Ipv4Addr::from(b))
            }
            Afi::Ipv6 => IpAddr::V6(Ipv6Addr::from(self.addr)),
        }
    }

    /// Upper bound of the covered range: the address with every bit after
    /// the prefix length set to one, padded within the AFI width.
    fn fill_hostbits(self, afi: Afi) -> [u8; MAX_ADDR_SIZE] {
        let mut out = self.addr;
        let alen = afi.addr_len();
        let first = self.prefix_len as usize / 8;
        let rem = self.prefix_len as u32 % 8;
        if rem != 0 {
            out[first] |= 0xFFu8 >> rem;
            for b in out.iter_mut().take(alen).skip(first + 1) {
                *b = 0xFF;
            }
        } else {
            for b in out.iter_mut().take(alen).skip(first) {
                *b = 0xFF;
            }
        }
        out
    }
}

/// The shape of a single sbgp-ipAddrBlock entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IpResourceKind {
    /// A prefix, RFC 3779 section 2.2.3.8.
    Addr(IpAddress),
    /// An explicit low/high pair, RFC 3779 section 2.2.3.9.
    Range { low: IpAddress, high: IpAddress },
    /// Resources are whatever the issuer holds, RFC 3779 section 2.2.3.5.
    Inherit,
}

/// One IP entry of a certificate with its canonical covering range.
///
/// For `Inherit` entries `min` and `max` stay zeroed and are meaningless.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IpResource {
    pub afi: Afi,
    pub kind: IpResourceKind,
    pub min: [u8; MAX_ADDR_SIZE],
    pub max: [u8; MAX_ADDR_SIZE],
}

impl IpResource {
    /// Compose the canonical range for a prefix entry.
    pub fn from_addr(afi: Afi, addr: IpAddress) -> Self {
        IpResource {
            afi,
            kind: IpResourceKind::Addr(addr),
            min: addr.addr,
            max: addr.fill_hostbits(afi),
        }
    }

    /// Compose the canonical range for an explicit low/high pair. Returns
    /// `None` when the composed range is reversed.
    pub fn from_range(afi: Afi, low: IpAddress, high: IpAddress) -> Option<Self> {
        let res = IpResource {
            afi,
            kind: IpResourceKind::Range { low, high },
            min: low.addr,
            max: high.fill_hostbits(afi),
        };
        let alen = afi.addr_len();
        if res.min[..alen] > res.max[..alen] {
            return None;
        }
        Some(res)
    }

    /// An inheritance marker for one address family.
    pub fn inherit(afi: Afi) -> Self {
        IpResource {
            afi,
            kind: IpResourceKind::Inherit,
            min: [0u8; MAX_ADDR_SIZE],
            max: [0u8; MAX_ADDR_SIZE],
        }
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self.kind, IpResourceKind::Inherit)
    }
}

impl fmt::Display for IpResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IpResourceKind::Addr(a) => match IpNet::new(a.to_ip_addr(self.afi), a.prefix_len) {
                Ok(net) => write!(f, "{}", net),
                Err(_) => write!(f, "{}/{}", a.to_ip_addr(self.afi), a.prefix_len),
            },
            IpResourceKind::Range { low, high } => write!(
                f,
                "{}--{}",
                low.to_ip_addr(self.afi),
                high.to_ip_addr(self.afi)
            ),
            IpResourceKind::Inherit => write!(f, "inherit ({})", self.afi),
        }
    }
}

/// Check a new entry against all previously collected entries of one
/// certificate, RFC 3779 section 2.2.3.6. Returns the conflict reason, or
/// `None` when the entry may be appended.
pub fn entry_conflict(entry: &IpResource, entries: &[IpResource]) -> Option<&'static str> {
    let alen = entry.afi.addr_len();
    for other in entries {
        if other.afi != entry.afi {
            continue;
        }
        if entry.is_inherit() || other.is_inherit() {
            return Some("inheritance and explicit addresses must not be mixed");
        }
        if entry.min[..alen] <= other.max[..alen] && other.min[..alen] <= entry.max[..alen] {
            return Some("overlapping IP address ranges");
        }
    }
    None
}

/// Answer whether this certificate's entries cover `[min, max]` within one
/// address family. An inheriting family defers up the chain; a family with
/// no entries at all does not cover anything.
pub fn check_covered(
    afi: Afi,
    min: &[u8; MAX_ADDR_SIZE],
    max: &[u8; MAX_ADDR_SIZE],
    entries: &[IpResource],
) -> Coverage {
    let alen = afi.addr_len();
    for entry in entries {
        if entry.afi != afi {
            continue;
        }
        if entry.is_inherit() {
            return Coverage::Undecided;
        }
        if entry.min[..alen] <= min[..alen] && max[..alen] <= entry.max[..alen] {
            return Coverage::Covered;
        }
    }
    Coverage::Uncovered
}
