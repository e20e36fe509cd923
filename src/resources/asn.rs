//! AS number resources (RFC 3779 section 3).

use std::fmt;

use serde::Serialize;

use super::Coverage;

/// Decode the content octets of an ASN.1 INTEGER into an AS number.
///
/// Rejects negative values, values above 2^32 - 1, the empty encoding, and
/// redundant leading zero octets. AS 0 is accepted here; the extension
/// decoder rejects it per RFC 6487.
pub fn parse_as_id(d: &[u8]) -> Option<u32> {
    let first = *d.first()?;
    if first & 0x80 != 0 {
        return None;
    }
    // a single leading zero octet is the sign byte, more are redundant
    let d = if first == 0 { &d[1..] } else { d };
    if d.len() > 4 || (d.len() > 1 && d[0] == 0) {
        return None;
    }
    let mut id = 0u32;
    for &b in d {
        id = (id << 8) | b as u32;
    }
    Some(id)
}

/// One AS entry of a certificate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AsResource {
    /// A single AS number, RFC 3779 section 3.2.3.10.
    Id(u32),
    /// An inclusive range, RFC 3779 section 3.2.3.8.
    Range { min: u32, max: u32 },
    /// Resources are whatever the issuer holds, RFC 3779 section 3.2.3.3.
    Inherit,
}

impl AsResource {
    /// The inclusive interval claimed by an explicit entry.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        match *self {
            AsResource::Id(id) => Some((id, id)),
            AsResource::Range { min, max } => Some((min, max)),
            AsResource::Inherit => None,
        }
    }

    pub fn is_inherit(&self) -> bool {
        matches!(self, AsResource::Inherit)
    }
}

impl fmt::Display for AsResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AsResource::Id(id) => write!(f, "AS{}", id),
            AsResource::Range { min, max } => write!(f, "AS{}--AS{}", min, max),
            AsResource::Inherit => write!(f, "inherit"),
        }
    }
}

/// Check a new entry against all previously collected entries of one
/// certificate, RFC 3779 section 3.3. Returns the conflict reason, or
/// `None` when the entry may be appended.
pub fn entry_conflict(entry: &AsResource, entries: &[AsResource]) -> Option<&'static str> {
    if entries.is_empty() {
        return None;
    }
    if entry.is_inherit() || entries[0].is_inherit() {
        return Some("inheritance and explicit AS identifiers must not be mixed");
    }
    let (min, max) = entry.bounds()?;
    for other in entries {
        let Some((omin, omax)) = other.bounds() else {
            continue;
        };
        if min <= omax && omin <= max {
            return Some("overlapping AS identifiers");
        }
    }
    None
}

/// Answer whether this certificate's entries cover `[min, max]`. An
/// inheriting entry defers the question up the chain.
pub fn check_covered(min: u32, max: u32, entries: &[AsResource]) -> Coverage {
    for entry in entries {
        let Some((emin, emax)) = entry.bounds() else {
            return Coverage::Undecided;
        };
        if min >= emin && max <= emax {
            return Coverage::Covered;
        }
    }
    Coverage::Uncovered
}
