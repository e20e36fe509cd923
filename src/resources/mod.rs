//! INR (Internet Number Resource) types carried by RPKI certificates.
//!
//! RFC 3779 lets a certificate delegate two kinds of resources: IP address
//! blocks ([`ip`]) and AS numbers ([`asn`]). Both kinds share the same
//! shape of per-certificate rules (no overlapping entries, inheritance is a
//! sentinel that cannot mix with explicit entries) and the same tri-state
//! answer when a parent certificate is asked whether it covers a child's
//! delegation.

pub mod asn;
pub mod ip;

pub use asn::AsResource;
pub use ip::{Afi, IpAddress, IpResource, IpResourceKind};

/// Answer of one certificate's resource entries to a coverage query.
///
/// `Undecided` means the certificate inherits its resources from its issuer
/// and the question has to be asked one level up the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Coverage {
    Covered,
    Uncovered,
    Undecided,
}
