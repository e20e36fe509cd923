//! RPKI resource certificate parsing (RFC 6487).
//!
//! The assembler here turns a DER blob into a [`Cert`] record: it walks the
//! X.509 extension list, hands the three profile extensions
//! (sbgp-ipAddrBlock, sbgp-autonomousSysNum, SIA) to their decoders, pulls
//! the deferred standard extensions through the [`crate::x509`] helpers, and
//! then applies the cross-field rules the profile adds on top.
//!
//! Every decoder works in two steps: a structural pass that walks the DER
//! with `bcder` and collects raw values, then a semantic pass that
//! interprets those values and feeds the resource collectors. Scratch state
//! is plain owned values, so every failure path drops it on the way out.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use rpki_certs::Cert;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let der = Bytes::from(std::fs::read("ta/example.cer")?);
//! let cert = Cert::parse("ta/example.cer", der)?;
//! println!("{} expires {}", cert.ski, cert.expires);
//! # Ok(())
//! # }
//! ```

mod io;

use bcder::decode::{DecodeError, Primitive, Source};
use bcder::{Mode, Oid, Tag};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::errors::{Result, RpkiCertsError};
use crate::resources::{Afi, AsResource, IpAddress, IpResource, asn, ip};
use crate::validate::valid_uri;
use crate::x509::{self, Certificate, oid};

/// What a certificate is for, RFC 6487 vs RFC 8209.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CertPurpose {
    Ca = 1,
    BgpsecRouter = 2,
}

/// A parsed and profile-checked RPKI resource certificate.
///
/// Produced by [`Cert::parse`] / [`Cert::parse_ta`]; owned by the caller;
/// only the coverage validator flips `valid`.
#[derive(Clone, Debug, Serialize)]
pub struct Cert {
    pub purpose: CertPurpose,
    /// notAfter of the validity window.
    pub expires: DateTime<Utc>,
    /// Subject Key Identifier, uppercase hex.
    pub ski: String,
    /// Authority Key Identifier, uppercase hex. Required on non-TA certs.
    pub aki: Option<String>,
    /// caIssuers URI from Authority Information Access.
    pub aia: Option<String>,
    /// CRL distribution point URI.
    pub crl: Option<String>,
    /// rsync URI of the manifest, from SIA.
    pub mft: Option<String>,
    /// rsync URI of the publication point, from SIA.
    pub repo: Option<String>,
    /// https URI of the RRDP notification file, from SIA.
    pub notify: Option<String>,
    /// Identifier of the trust anchor locator this certificate was reached
    /// from. Assigned by the caller, carried for BRK bookkeeping.
    pub tal: Option<String>,
    pub ips: Vec<IpResource>,
    #[serde(rename = "as")]
    pub as_resources: Vec<AsResource>,
    /// DER SubjectPublicKeyInfo, present iff this is a router certificate.
    #[serde(serialize_with = "ser_opt_hex")]
    pub pubkey: Option<Bytes>,
    /// Set by the coverage validator.
    pub valid: bool,
    /// The DER input, retained for the later signature check.
    #[serde(skip)]
    pub raw: Bytes,
}

fn ser_opt_hex<S: serde::Serializer>(v: &Option<Bytes>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match v {
        Some(b) => s.serialize_some(&hex::encode_upper(b)),
        None => s.serialize_none(),
    }
}

// The retained DER handle is not part of record identity; the IPC marshal
// does not transport it.
impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.purpose == other.purpose
            && self.expires == other.expires
            && self.ski == other.ski
            && self.aki == other.aki
            && self.aia == other.aia
            && self.crl == other.crl
            && self.mft == other.mft
            && self.repo == other.repo
            && self.notify == other.notify
            && self.tal == other.tal
            && self.ips == other.ips
            && self.as_resources == other.as_resources
            && self.pubkey == other.pubkey
            && self.valid == other.valid
    }
}

impl Eq for Cert {}

impl Cert {
    /// Parse and profile-check a certificate issued under a trust anchor.
    ///
    /// A failure means "skip this object"; the diagnostic names the file
    /// and the RFC clause that was violated.
    pub fn parse(filename: &str, der: Bytes) -> Result<Self> {
        match parse_inner(filename, der, false) {
            Ok((cert, _)) => Ok(cert),
            Err(err) => {
                warn!("{}", err);
                Err(err)
            }
        }
    }

    /// Parse a trust anchor certificate and require its subject public key
    /// to match the DER-encoded key from the trust anchor locator.
    pub fn parse_ta(filename: &str, der: Bytes, tal_spki: &[u8]) -> Result<Self> {
        let res = parse_inner(filename, der, true).and_then(|(cert, spki)| {
            if spki.as_ref() != tal_spki {
                return Err(RpkiCertsError::profile(
                    filename,
                    "RFC 6487 (trust anchor)",
                    "public key does not match TAL public key",
                ));
            }
            Ok(cert)
        });
        if let Err(err) = &res {
            warn!("{}", err);
        }
        res
    }
}

/// Scratch state of one parse, dropped wholesale on failure.
struct Parser<'a> {
    filename: &'a str,
    ips: Vec<IpResource>,
    as_resources: Vec<AsResource>,
    mft: Option<String>,
    repo: Option<String>,
    notify: Option<String>,
    sia_present: bool,
}

/// Raw shape of one IPAddressOrRange, before address interpretation.
enum RawIpOrRange {
    Prefix(RawBits),
    Range(RawBits, RawBits),
}

/// BIT STRING content: unused-bit count plus octets.
type RawBits = (u8, Bytes);

/// Raw shape of one ASIdentifierChoice element.
enum RawAsChoice {
    Inherit,
    Id(Bytes),
    Range(Bytes, Bytes),
}

impl<'a> Parser<'a> {
    fn new(filename: &'a str) -> Self {
        Parser {
            filename,
            ips: Vec::new(),
            as_resources: Vec::new(),
            mft: None,
            repo: None,
            notify: None,
            sia_present: false,
        }
    }

    fn structural(&self, what: &str, err: impl std::fmt::Display) -> RpkiCertsError {
        RpkiCertsError::structural(self.filename, format!("{}: {}", what, err))
    }

    fn profile(&self, citation: &'static str, reason: impl Into<String>) -> RpkiCertsError {
        RpkiCertsError::profile(self.filename, citation, reason)
    }

    /// Append one IP entry, keeping the per-certificate rules of RFC 3779
    /// section 2.2.3.6: no overlaps, no mixing with inheritance. Abutting
    /// ranges are allowed to stand; coalescing them would not change the
    /// semantics.
    fn append_ip(&mut self, entry: IpResource) -> Result<()> {
        if let Some(reason) = ip::entry_conflict(&entry, &self.ips) {
            return Err(RpkiCertsError::overlap(
                self.filename,
                "RFC 3779 section 2.2.3.6",
                reason,
            ));
        }
        self.ips.push(entry);
        Ok(())
    }

    /// Append one AS entry per RFC 3779 section 3.3.
    fn append_as(&mut self, entry: AsResource) -> Result<()> {
        if let Some(reason) = asn::entry_conflict(&entry, &self.as_resources) {
            return Err(RpkiCertsError::overlap(
                self.filename,
                "RFC 3779 section 3.3",
                reason,
            ));
        }
        self.as_resources.push(entry);
        Ok(())
    }

    fn checked_uri(
        &self,
        uri: &[u8],
        scheme: Option<&str>,
        citation: &'static str,
        reason: &'static str,
    ) -> Result<String> {
        if !valid_uri(uri, scheme) {
            return Err(self.profile(citation, reason));
        }
        Ok(String::from_utf8_lossy(uri).into_owned())
    }

    /// Parse the Subject Information Access extension, RFC 6487 4.8.8.
    ///
    /// Unknown access methods are ignored; each recognized target may be
    /// assigned only once; the manifest must live under the repository.
    fn sia(&mut self, value: &Bytes) -> Result<()> {
        let entries = Mode::Der
            .decode(value.clone(), |cons| {
                cons.take_sequence(|cons| {
                    let mut entries = Vec::new();
                    while let Some(()) = cons.take_opt_sequence(|cons| {
                        let method = Oid::take_from(cons)?;
                        if method == oid::AD_CA_REPOSITORY
                            || method == oid::AD_RPKI_MANIFEST
                            || method == oid::AD_RPKI_NOTIFY
                        {
                            let uri =
                                cons.take_primitive_if(Tag::CTX_6, |prim| prim.take_all())?;
                            entries.push((method, uri));
                        } else {
                            cons.skip_all()?;
                        }
                        Ok(())
                    })? {}
                    Ok(entries)
                })
            })
            .map_err(|err| self.structural("RFC 6487 section 4.8.8: SIA", err))?;

        for (method, uri) in entries {
            if method == oid::AD_CA_REPOSITORY {
                self.sia_repo(&uri)?;
            } else if method == oid::AD_RPKI_MANIFEST {
                self.sia_mft(&uri)?;
            } else {
                self.sia_notify(&uri)?;
            }
        }

        if let (Some(mft), Some(repo)) = (&self.mft, &self.repo) {
            if !mft.starts_with(repo.as_str()) {
                return Err(self.profile(
                    "RFC 6487 section 4.8.8",
                    "conflicting URIs for caRepository and rpkiManifest",
                ));
            }
        }
        Ok(())
    }

    fn sia_repo(&mut self, uri: &[u8]) -> Result<()> {
        if self.repo.is_some() {
            return Err(self.profile(
                "RFC 6487 section 4.8.8",
                "CA repository already specified",
            ));
        }
        self.repo = Some(self.checked_uri(
            uri,
            Some("rsync://"),
            "RFC 6487 section 4.8.8",
            "bad CA repository URI",
        )?);
        Ok(())
    }

    fn sia_mft(&mut self, uri: &[u8]) -> Result<()> {
        if self.mft.is_some() {
            return Err(self.profile(
                "RFC 6487 section 4.8.8",
                "manifest location already specified",
            ));
        }
        let uri = self.checked_uri(
            uri,
            Some("rsync://"),
            "RFC 6487 section 4.8.8",
            "bad manifest location",
        )?;
        if uri.len() < 4 || !uri[uri.len() - 4..].eq_ignore_ascii_case(".mft") {
            return Err(self.profile("RFC 6487 section 4.8.8", "SIA location is not a manifest"));
        }
        self.mft = Some(uri);
        Ok(())
    }

    fn sia_notify(&mut self, uri: &[u8]) -> Result<()> {
        if self.notify.is_some() {
            return Err(self.profile(
                "RFC 6487 section 4.8.8",
                "notify location already specified",
            ));
        }
        self.notify = Some(self.checked_uri(
            uri,
            Some("https://"),
            "RFC 8182 section 3.2",
            "bad notify URI",
        )?);
        Ok(())
    }

    /// Parse the sbgp-ipAddrBlock extension value, RFC 6487 4.8.10 with the
    /// syntax of RFC 3779 section 2.2. Entries are collected in whatever
    /// order they appear; the canonical-order rule of 2.2.3.6 changes
    /// nothing for validation and is not enforced.
    fn ip_addr_block(&mut self, value: &Bytes) -> Result<()> {
        let families = Mode::Der
            .decode(value.clone(), |cons| {
                cons.take_sequence(|cons| {
                    let mut families = Vec::new();
                    while let Some(family) = cons.take_opt_sequence(|cons| {
                        let family = cons
                            .take_primitive_if(Tag::OCTET_STRING, |prim| prim.take_all())?;
                        // ipAddressChoice: NULL means inherit
                        if cons
                            .take_opt_primitive_if(Tag::NULL, |prim| prim.skip_all())?
                            .is_some()
                        {
                            return Ok((family, None));
                        }
                        let mut entries = Vec::new();
                        cons.take_sequence(|cons| {
                            loop {
                                if let Some(bits) = cons
                                    .take_opt_primitive_if(Tag::BIT_STRING, take_bits_content)?
                                {
                                    entries.push(RawIpOrRange::Prefix(bits));
                                } else if let Some(range) = cons.take_opt_sequence(|cons| {
                                    let low = cons.take_primitive_if(
                                        Tag::BIT_STRING,
                                        take_bits_content,
                                    )?;
                                    let high = cons.take_primitive_if(
                                        Tag::BIT_STRING,
                                        take_bits_content,
                                    )?;
                                    Ok(RawIpOrRange::Range(low, high))
                                })? {
                                    entries.push(range);
                                } else {
                                    break;
                                }
                            }
                            Ok(())
                        })?;
                        Ok((family, Some(entries)))
                    })? {
                        families.push(family);
                    }
                    Ok(families)
                })
            })
            .map_err(|err| self.structural("RFC 6487 section 4.8.10: sbgp-ipAddrBlock", err))?;

        for (family, choice) in families {
            let afi = Afi::from_family(&family).ok_or_else(|| {
                self.profile("RFC 3779 section 2.2.3.3", "invalid address family")
            })?;
            match choice {
                None => self.append_ip(IpResource::inherit(afi))?,
                Some(entries) => {
                    for entry in entries {
                        match entry {
                            RawIpOrRange::Prefix((unused, octets)) => {
                                let addr = IpAddress::from_bits(afi, unused, &octets)
                                    .ok_or_else(|| {
                                        self.profile(
                                            "RFC 3779 section 2.2.3.8",
                                            "invalid IP address",
                                        )
                                    })?;
                                self.append_ip(IpResource::from_addr(afi, addr))?;
                            }
                            RawIpOrRange::Range((lu, lo), (hu, ho)) => {
                                let low =
                                    IpAddress::from_bits(afi, lu, &lo).ok_or_else(|| {
                                        self.profile(
                                            "RFC 3779 section 2.2.3.9",
                                            "invalid IP address",
                                        )
                                    })?;
                                let high =
                                    IpAddress::from_bits(afi, hu, &ho).ok_or_else(|| {
                                        self.profile(
                                            "RFC 3779 section 2.2.3.9",
                                            "invalid IP address",
                                        )
                                    })?;
                                let entry = IpResource::from_range(afi, low, high)
                                    .ok_or_else(|| {
                                        self.profile(
                                            "RFC 3779 section 2.2.3.9",
                                            "IP address range reversed",
                                        )
                                    })?;
                                self.append_ip(entry)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse the sbgp-autonomousSysNum extension value, RFC 6487 4.8.11
    /// with the syntax of RFC 3779 section 3.2. The asnum choice is
    /// processed; rdi entries are skipped.
    fn as_sys_num(&mut self, value: &Bytes) -> Result<()> {
        let choices = Mode::Der
            .decode(value.clone(), |cons| {
                cons.take_sequence(|cons| {
                    let mut out = Vec::new();
                    loop {
                        let asnum = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
                            if cons
                                .take_opt_primitive_if(Tag::NULL, |prim| prim.skip_all())?
                                .is_some()
                            {
                                out.push(RawAsChoice::Inherit);
                                return Ok(());
                            }
                            cons.take_sequence(|cons| {
                                loop {
                                    if let Some(id) = cons
                                        .take_opt_primitive_if(Tag::INTEGER, |prim| {
                                            prim.take_all()
                                        })?
                                    {
                                        out.push(RawAsChoice::Id(id));
                                    } else if let Some(range) =
                                        cons.take_opt_sequence(|cons| {
                                            let min = cons.take_primitive_if(
                                                Tag::INTEGER,
                                                |prim| prim.take_all(),
                                            )?;
                                            let max = cons.take_primitive_if(
                                                Tag::INTEGER,
                                                |prim| prim.take_all(),
                                            )?;
                                            Ok(RawAsChoice::Range(min, max))
                                        })?
                                    {
                                        out.push(range);
                                    } else {
                                        break;
                                    }
                                }
                                Ok(())
                            })
                        })?;
                        if asnum.is_some() {
                            continue;
                        }
                        if cons
                            .take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?
                            .is_some()
                        {
                            continue;
                        }
                        break;
                    }
                    Ok(out)
                })
            })
            .map_err(|err| self.structural("RFC 6487 section 4.8.11: autonomousSysNum", err))?;

        for choice in choices {
            match choice {
                RawAsChoice::Inherit => self.append_as(AsResource::Inherit)?,
                RawAsChoice::Id(raw) => {
                    let id = asn::parse_as_id(&raw).ok_or_else(|| {
                        self.profile("RFC 3779 section 3.2.3.10", "malformed AS identifier")
                    })?;
                    if id == 0 {
                        return Err(self.profile(
                            "RFC 3779 section 3.2.3.10",
                            "AS identifier zero is reserved",
                        ));
                    }
                    self.append_as(AsResource::Id(id))?;
                }
                RawAsChoice::Range(rmin, rmax) => {
                    let min = asn::parse_as_id(&rmin).ok_or_else(|| {
                        self.profile("RFC 3779 section 3.2.3.8", "malformed AS identifier")
                    })?;
                    let max = asn::parse_as_id(&rmax).ok_or_else(|| {
                        self.profile("RFC 3779 section 3.2.3.8", "malformed AS identifier")
                    })?;
                    if max == min {
                        return Err(
                            self.profile("RFC 3779 section 3.2.3.8", "AS range is singular")
                        );
                    }
                    if max < min {
                        return Err(self.profile(
                            "RFC 3779 section 3.2.3.8",
                            "AS range is out of order",
                        ));
                    }
                    self.append_as(AsResource::Range { min, max })?;
                }
            }
        }
        Ok(())
    }
}

fn take_bits_content<S: Source>(
    prim: &mut Primitive<S>,
) -> std::result::Result<RawBits, DecodeError<S::Error>> {
    let data = prim.take_all()?;
    if data.is_empty() {
        return Err(prim.content_err("empty bit string"));
    }
    Ok((data[0], data.slice(1..)))
}

/// Parse and profile-check one certificate; shared by the TA and non-TA
/// entry points. Returns the record plus the SubjectPublicKeyInfo bytes so
/// the TA path can compare them against the locator key.
fn parse_inner(filename: &str, der: Bytes, is_ta: bool) -> Result<(Cert, Bytes)> {
    let x509_cert = Certificate::decode(der.clone())
        .map_err(|err| RpkiCertsError::structural(filename, format!("failed certificate parse: {}", err)))?;

    let mut p = Parser::new(filename);
    let mut basic_ca = None;
    let mut eku = None;
    let mut ski_raw = None;
    let mut aki_raw = None;
    let mut aia_raw = None;
    let mut crl_raw = None;

    for ext in &x509_cert.extensions {
        if ext.oid == oid::SBGP_IP_ADDR_BLOCK {
            p.ip_addr_block(&ext.value)?;
        } else if ext.oid == oid::SBGP_AUTONOMOUS_SYS_NUM {
            p.as_sys_num(&ext.value)?;
        } else if ext.oid == oid::SUBJECT_INFO_ACCESS {
            p.sia_present = true;
            p.sia(&ext.value)?;
        } else if ext.oid == oid::CE_BASIC_CONSTRAINTS {
            basic_ca = Some(
                x509::parse_basic_constraints(ext.value.clone())
                    .map_err(|err| p.structural("RFC 6487 section 4.8.1: basicConstraints", err))?,
            );
        } else if ext.oid == oid::CE_EXTENDED_KEY_USAGE {
            eku = Some(
                x509::parse_extended_key_usage(ext.value.clone())
                    .map_err(|err| p.structural("RFC 6487 section 4.8.5: extKeyUsage", err))?,
            );
        } else if ext.oid == oid::CE_SUBJECT_KEY_IDENTIFIER {
            ski_raw = Some(
                x509::parse_subject_key_identifier(ext.value.clone())
                    .map_err(|err| p.structural("RFC 6487 section 4.8.2: SKI", err))?,
            );
        } else if ext.oid == oid::CE_AUTHORITY_KEY_IDENTIFIER {
            aki_raw = Some(
                x509::parse_authority_key_identifier(ext.value.clone())
                    .map_err(|err| p.structural("RFC 6487 section 4.8.3: AKI", err))?,
            );
        } else if ext.oid == oid::AUTHORITY_INFO_ACCESS {
            if is_ta {
                return Err(p.profile(
                    "RFC 6487 section 8.4.7",
                    "trust anchor must not have AIA",
                ));
            }
            aia_raw = Some(
                x509::parse_authority_info_access(ext.value.clone())
                    .map_err(|err| p.structural("RFC 6487 section 4.8.7: AIA", err))?,
            );
        } else if ext.oid == oid::CE_CRL_DISTRIBUTION_POINTS {
            if is_ta {
                return Err(p.profile(
                    "RFC 6487 section 8.4.2",
                    "trust anchor may not specify CRL resource",
                ));
            }
            crl_raw = Some(
                x509::parse_crl_distribution_points(ext.value.clone())
                    .map_err(|err| p.structural("RFC 6487 section 4.8.6: CRL distribution", err))?,
            );
        } else if ext.oid == oid::CE_KEY_USAGE || ext.oid == oid::CE_CERTIFICATE_POLICIES {
            // recognized, nothing to extract here
        } else if ext.critical {
            return Err(p.profile(
                "RFC 6487 section 1.2",
                "unexpected critical extension",
            ));
        }
    }

    let ski_raw =
        ski_raw.ok_or_else(|| p.profile("RFC 6487 section 8.4.2", "missing SKI"))?;
    let ski = key_identifier(&p, &ski_raw)?;
    let aki = match aki_raw {
        Some(raw) => Some(key_identifier(&p, &raw)?),
        None => None,
    };
    let aia = match aia_raw {
        Some(raw) => Some(p.checked_uri(
            &raw,
            None,
            "RFC 6487 section 4.8.7",
            "bad caIssuers URI",
        )?),
        None => None,
    };
    let crl = match crl_raw {
        Some(raw) => Some(p.checked_uri(
            &raw,
            Some("rsync://"),
            "RFC 6487 section 4.8.6",
            "bad CRL distribution point URI",
        )?),
        None => None,
    };

    let purpose = if basic_ca == Some(true) {
        CertPurpose::Ca
    } else if eku
        .as_ref()
        .is_some_and(|oids| oids.iter().any(|o| *o == oid::KP_BGPSEC_ROUTER))
    {
        CertPurpose::BgpsecRouter
    } else {
        return Err(p.profile(
            "RFC 6487 section 4.8.1",
            "neither CA nor BGPsec router certificate",
        ));
    };

    let pubkey = match purpose {
        CertPurpose::Ca => {
            if p.mft.is_none() {
                return Err(p.profile("RFC 6487 section 4.8.8", "missing SIA manifest"));
            }
            if p.repo.is_none() {
                return Err(p.profile("RFC 6487 section 4.8.8", "missing SIA CA repository"));
            }
            if p.as_resources.is_empty() && p.ips.is_empty() {
                return Err(p.profile("RFC 6487", "missing IP or AS resources"));
            }
            None
        }
        CertPurpose::BgpsecRouter => {
            if !p.ips.is_empty() {
                return Err(p.profile(
                    "RFC 8209 section 3.1.3.4",
                    "unexpected IP resources in BGPsec cert",
                ));
            }
            if p.sia_present {
                return Err(p.profile(
                    "RFC 8209 section 3.1.3.3",
                    "unexpected SIA extension in BGPsec cert",
                ));
            }
            Some(x509_cert.spki.clone())
        }
    };

    if is_ta {
        if let Some(aki) = &aki {
            if *aki != ski {
                return Err(p.profile(
                    "RFC 6487 section 8.4.2",
                    "trust anchor AKI, if specified, must match SKI",
                ));
            }
        }
    } else {
        match &aki {
            None => {
                return Err(p.profile(
                    "RFC 6487 section 8.4.2",
                    "non-trust anchor missing AKI",
                ));
            }
            Some(aki) if *aki == ski => {
                return Err(p.profile(
                    "RFC 6487 section 8.4.2",
                    "non-trust anchor AKI must not match SKI",
                ));
            }
            Some(_) => {}
        }
        if aia.is_none() {
            return Err(p.profile(
                "RFC 6487 section 8.4.7",
                "non-trust anchor missing AIA",
            ));
        }
    }

    let cert = Cert {
        purpose,
        expires: x509_cert.not_after,
        ski,
        aki,
        aia,
        crl,
        mft: p.mft,
        repo: p.repo,
        notify: p.notify,
        tal: None,
        ips: p.ips,
        as_resources: p.as_resources,
        pubkey,
        valid: false,
        raw: der,
    };
    Ok((cert, x509_cert.spki))
}

/// Render a key identifier, requiring the 160-bit SHA-1 length of
/// RFC 6487 section 4.8.2.
fn key_identifier(p: &Parser, raw: &Bytes) -> Result<String> {
    if raw.len() != 20 {
        return Err(p.profile(
            "RFC 6487 section 4.8.2",
            "key identifier is not a 160-bit SHA-1 hash",
        ));
    }
    Ok(hex::encode_upper(raw))
}
