//!
//! # Overview
//!
//! rpki-certs is a library for parsing and validating RPKI resource
//! certificates as profiled by RFC 6487: X.509 certificates carrying IP
//! address and AS number delegations (RFC 3779), including the BGPsec
//! router certificate variant (RFC 8209).
//!
//! The crate is the core of a relying party. It does not fetch anything,
//! verify signatures, or store validated data; it turns DER blobs into
//! typed records and decides whether a certificate's resources are covered
//! by its issuer chain. Thin callers wire it to transports and stores.
//!
//! # Categories
//!
//! ## Parsing
//!
//! [`Cert::parse`] decodes and profile-checks one certificate,
//! [`Cert::parse_ta`] additionally matches the subject key against the
//! trust anchor locator key. A parse failure means "skip this object"; the
//! diagnostic carries the filename and the RFC clause that was violated.
//!
//! ## Validation
//!
//! [`validate::valid_ta`] and [`validate::valid_cert`] decide whether a
//! parsed certificate may join the [`validate::AuthTree`], the
//! SKI-keyed lookup tree of everything validated so far. Router keys of
//! validated BGPsec certificates go into the [`validate::BrkTree`].
//!
//! ## Interchange
//!
//! [`Cert::write_to`] and [`Cert::read_from`] move validated records
//! across a pipe to cooperating worker processes in a fixed binary layout.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use rpki_certs::validate::{self, AuthTree};
//! use rpki_certs::Cert;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tal_key = std::fs::read("ta/example.pub")?;
//!     let der = Bytes::from(std::fs::read("ta/example.cer")?);
//!
//!     let mut tree = AuthTree::new();
//!     let ta = Cert::parse_ta("ta/example.cer", der, &tal_key)?;
//!     validate::valid_ta("ta/example.cer", &tree, &ta)?;
//!     tree.insert_ta(ta, "example", "ta/example.cer")?;
//!
//!     let der = Bytes::from(std::fs::read("repo/child.cer")?);
//!     let mut child = Cert::parse("repo/child.cer", der)?;
//!     validate::valid_cert("repo/child.cer", &tree, &child)?;
//!     child.valid = true;
//!     tree.insert(child, "repo/child.cer")?;
//!     Ok(())
//! }
//! ```

pub mod cert;
pub mod errors;
pub mod resources;
pub mod validate;
pub mod x509;

pub use crate::cert::{Cert, CertPurpose};
pub use crate::errors::{Result, RpkiCertsError};
pub use crate::resources::{Afi, AsResource, IpResource, IpResourceKind};
