//! Chain validation of parsed certificates.
//!
//! The authority tree holds every certificate validated so far, keyed by
//! SKI. A node points to its issuer through the issuer's SKI rather than a
//! reference, so walking a chain is a sequence of tree lookups and the tree
//! stays an ordinary ordered map. The tree is mutated by a single owner;
//! nothing here synchronizes.
//!
//! Coverage of a child's delegation is decided by walking from the parent
//! upward until a certificate with an explicit assertion either contains
//! the queried interval or does not. A chain that only ever inherits
//! rejects the delegation.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::cert::{Cert, CertPurpose};
use crate::errors::{Result, RpkiCertsError};
use crate::resources::ip::MAX_ADDR_SIZE;
use crate::resources::{Afi, AsResource, Coverage, asn, ip};

/// One validated certificate in the authority tree.
#[derive(Clone, Debug)]
pub struct Auth {
    pub cert: Cert,
    /// SKI of the issuer's node; `None` for trust anchors.
    pub parent: Option<String>,
    /// Identifier of the trust anchor locator this chain hangs off.
    pub tal: String,
    pub filename: String,
}

/// The trust-anchor-rooted lookup tree, ordered by certificate SKI.
#[derive(Clone, Debug, Default)]
pub struct AuthTree {
    nodes: BTreeMap<String, Auth>,
}

impl AuthTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the node whose certificate's SKI equals `ski`.
    pub fn find(&self, ski: &str) -> Option<&Auth> {
        self.nodes.get(ski)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in SKI order.
    pub fn iter(&self) -> impl Iterator<Item = &Auth> {
        self.nodes.values()
    }

    /// Install a validated trust anchor.
    pub fn insert_ta(&mut self, cert: Cert, tal: &str, filename: &str) -> Result<()> {
        if self.nodes.contains_key(&cert.ski) {
            return Err(RpkiCertsError::duplicate_ski(filename));
        }
        let ski = cert.ski.clone();
        self.nodes.insert(
            ski,
            Auth {
                cert,
                parent: None,
                tal: tal.to_string(),
                filename: filename.to_string(),
            },
        );
        Ok(())
    }

    /// Install a validated child certificate. The parent node is resolved
    /// by the certificate's AKI and the TAL identifier is inherited from
    /// it.
    pub fn insert(&mut self, cert: Cert, filename: &str) -> Result<()> {
        if self.nodes.contains_key(&cert.ski) {
            return Err(RpkiCertsError::duplicate_ski(filename));
        }
        let aki = cert
            .aki
            .clone()
            .ok_or_else(|| RpkiCertsError::profile(filename, "RFC 6487", "missing AKI"))?;
        let tal = self
            .find(&aki)
            .map(|parent| parent.tal.clone())
            .ok_or_else(|| RpkiCertsError::profile(filename, "RFC 6487", "unknown AKI"))?;
        let ski = cert.ski.clone();
        self.nodes.insert(
            ski,
            Auth {
                cert,
                parent: Some(aki),
                tal,
                filename: filename.to_string(),
            },
        );
        Ok(())
    }

    /// Remove a node by SKI. The caller must make sure no remaining
    /// child's AKI points at this node; the tree does not garbage-collect.
    pub fn remove(&mut self, ski: &str) -> Option<Auth> {
        self.nodes.remove(ski)
    }
}

/// Make sure the SKI does not already exist and resolve the parent by AKI.
pub fn valid_ski_aki<'a>(
    filename: &str,
    tree: &'a AuthTree,
    ski: &str,
    aki: &str,
) -> Result<&'a Auth> {
    if tree.find(ski).is_some() {
        return Err(RpkiCertsError::duplicate_ski(filename));
    }
    tree.find(aki)
        .ok_or_else(|| RpkiCertsError::profile(filename, "RFC 6487", "unknown AKI"))
}

/// Walk up the chain of certificates trying to match an AS interval to one
/// of the allocations in that chain. A certificate without any AS entries
/// passes the question along.
fn chain_covers_as(tree: &AuthTree, start: &Auth, min: u32, max: u32) -> bool {
    let mut node = Some(start);
    while let Some(auth) = node {
        if !auth.cert.as_resources.is_empty() {
            match asn::check_covered(min, max, &auth.cert.as_resources) {
                Coverage::Covered => return true,
                Coverage::Uncovered => return false,
                Coverage::Undecided => {}
            }
        }
        node = auth.parent.as_deref().and_then(|ski| tree.find(ski));
    }
    false
}

/// Walk up the chain making sure an IP interval is covered by the first
/// non-inheriting specification.
fn chain_covers_ip(
    tree: &AuthTree,
    start: &Auth,
    afi: Afi,
    min: &[u8; MAX_ADDR_SIZE],
    max: &[u8; MAX_ADDR_SIZE],
) -> bool {
    let mut node = Some(start);
    while let Some(auth) = node {
        match ip::check_covered(afi, min, max, &auth.cert.ips) {
            Coverage::Covered => return true,
            Coverage::Uncovered => return false,
            Coverage::Undecided => {}
        }
        node = auth.parent.as_deref().and_then(|ski| tree.find(ski));
    }
    false
}

fn trace_chain(tree: &AuthTree, start: &Auth) {
    let mut node = Some(start);
    while let Some(auth) = node {
        warn!(" ...inheriting from: {}", auth.filename);
        node = auth.parent.as_deref().and_then(|ski| tree.find(ski));
    }
}

/// Authenticate a trust anchor: its resources must not inherit and its SKI
/// must be unique.
pub fn valid_ta(filename: &str, tree: &AuthTree, cert: &Cert) -> Result<()> {
    if cert.as_resources.iter().any(|a| a.is_inherit()) {
        return Err(RpkiCertsError::profile(
            filename,
            "RFC 6487 (trust anchor)",
            "inheriting AS resources",
        ));
    }
    if cert.ips.iter().any(|i| i.is_inherit()) {
        return Err(RpkiCertsError::profile(
            filename,
            "RFC 6487 (trust anchor)",
            "inheriting IP resources",
        ));
    }
    if tree.find(&cert.ski).is_some() {
        return Err(RpkiCertsError::duplicate_ski(filename));
    }
    Ok(())
}

/// Validate a non-TA certificate: its IP and AS resources must be fully
/// covered by the authority chain behind its AKI. A rejection leaves the
/// tree untouched; on success the caller flips `valid` and installs the
/// certificate with [`AuthTree::insert`].
pub fn valid_cert(filename: &str, tree: &AuthTree, cert: &Cert) -> Result<()> {
    let aki = cert
        .aki
        .as_deref()
        .ok_or_else(|| RpkiCertsError::profile(filename, "RFC 6487", "missing AKI"))?;
    let parent = valid_ski_aki(filename, tree, &cert.ski, aki)?;

    for entry in &cert.as_resources {
        let (min, max) = match entry.bounds() {
            None => {
                // BGPsec does not permit inheriting
                if cert.purpose == CertPurpose::BgpsecRouter {
                    return Err(RpkiCertsError::uncovered(
                        filename,
                        "AS",
                        "router certificate inherits resources",
                    ));
                }
                continue;
            }
            Some(bounds) => bounds,
        };
        if chain_covers_as(tree, parent, min, max) {
            continue;
        }
        let err = RpkiCertsError::uncovered(filename, "AS", entry.to_string());
        warn!("{}", err);
        trace_chain(tree, parent);
        return Err(err);
    }

    for entry in &cert.ips {
        if chain_covers_ip(tree, parent, entry.afi, &entry.min, &entry.max) {
            continue;
        }
        let err = RpkiCertsError::uncovered(filename, "IP", entry.to_string());
        warn!("{}", err);
        trace_chain(tree, parent);
        return Err(err);
    }

    Ok(())
}

/// A BGPsec Router Key record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Brk {
    pub asid: u32,
    /// SKI of the router certificate, uppercase hex.
    pub ski: String,
    /// DER SubjectPublicKeyInfo of the router key.
    #[serde(serialize_with = "ser_hex")]
    pub pubkey: Bytes,
    pub tal: String,
    pub expires: DateTime<Utc>,
}

fn ser_hex<S: serde::Serializer>(v: &Bytes, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode_upper(v))
}

/// The Router Key index, ordered by (asid, ski, pubkey).
#[derive(Clone, Debug, Default)]
pub struct BrkTree {
    nodes: BTreeMap<(u32, String, Bytes), Brk>,
}

impl BrkTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records in (asid, ski, pubkey) order.
    pub fn iter(&self) -> impl Iterator<Item = &Brk> {
        self.nodes.values()
    }

    /// Add each Router Key of a validated BGPsec router certificate: one
    /// record per AS id, one per AS in a range. Inherit entries cannot
    /// appear on a validated router certificate and are reported and
    /// skipped.
    pub fn insert_cert(&mut self, cert: &Cert) {
        let Some(pubkey) = cert.pubkey.clone() else {
            warn!("{}: certificate without router key", cert.ski);
            return;
        };
        let tal = cert.tal.clone().unwrap_or_default();
        for entry in &cert.as_resources {
            match *entry {
                AsResource::Id(asid) => {
                    self.insert_one(cert, asid, &pubkey, &tal);
                }
                AsResource::Range { min, max } => {
                    for asid in min..=max {
                        self.insert_one(cert, asid, &pubkey, &tal);
                    }
                }
                AsResource::Inherit => {
                    warn!("{}: invalid AS identifier type", cert.ski);
                }
            }
        }
    }

    fn insert_one(&mut self, cert: &Cert, asid: u32, pubkey: &Bytes, tal: &str) {
        let key = (asid, cert.ski.clone(), pubkey.clone());
        match self.nodes.entry(key) {
            Entry::Occupied(mut occupied) => {
                // a colliding key survives with its latest expiry moment
                let found = occupied.get_mut();
                if found.expires < cert.expires {
                    found.expires = cert.expires;
                    found.tal = tal.to_string();
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Brk {
                    asid,
                    ski: cert.ski.clone(),
                    pubkey: pubkey.clone(),
                    tal: tal.to_string(),
                    expires: cert.expires,
                });
            }
        }
    }
}

/// Validate a URI: pure ASCII, optionally pegged to a protocol scheme
/// (case-insensitive), and no path component starting with a dot.
pub fn valid_uri(uri: &[u8], scheme: Option<&str>) -> bool {
    if !uri
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || b.is_ascii_punctuation())
    {
        return false;
    }
    if let Some(scheme) = scheme {
        if uri.len() < scheme.len() || !uri[..scheme.len()].eq_ignore_ascii_case(scheme.as_bytes())
        {
            return false;
        }
    }
    // no dot files, no backing out of the publication point
    !uri.windows(2).any(|w| w == b"/.")
}

/// Validate a file name listed on a manifest,
/// draft-ietf-sidrops-6486bis section 4.2.2.
pub fn valid_filename(name: &str) -> bool {
    if name.len() < 5 {
        return false;
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
    {
        return false;
    }
    if name.bytes().filter(|&b| b == b'.').count() != 1 {
        return false;
    }
    let ext = &name[name.len() - 4..];
    [".cer", ".crl", ".gbr", ".roa"]
        .iter()
        .any(|e| ext.eq_ignore_ascii_case(e))
}

/// Validate a file by streaming it through SHA-256 and comparing against a
/// caller-supplied 32-byte digest.
pub fn valid_filehash(path: impl AsRef<Path>, expect: &[u8]) -> Result<()> {
    let filename = path.as_ref().display().to_string();
    if expect.len() != Sha256::output_size() {
        return Err(RpkiCertsError::HashMismatch { filename });
    }
    let mut file = File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    if hasher.finalize().as_slice() != expect {
        return Err(RpkiCertsError::HashMismatch { filename });
    }
    Ok(())
}
