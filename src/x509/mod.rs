//! Minimal X.509 plumbing for the RPKI certificate profile.
//!
//! This is deliberately not a general X.509 implementation. It walks the
//! Certificate structure far enough to hand the assembler what the RPKI
//! profile needs: the validity window, the raw SubjectPublicKeyInfo, and
//! the list of v3 extensions. Signature verification happens elsewhere, on
//! the retained DER handle.
//!
//! The individual `parse_*` helpers decode the value octets of the
//! deferred standard extensions (basic constraints, key identifiers, AIA,
//! CRL distribution points, extended key usage). They return raw pieces;
//! profile-level judgements on those pieces stay with the assembler.

use bcder::decode::{Constructed, DecodeError, IntoSource, Source};
use bcder::{Mode, Oid, Tag};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};

/// Object identifiers consumed by the profile.
pub mod oid {
    use bcder::{ConstOid, Oid};

    pub const AUTHORITY_INFO_ACCESS: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 1, 1]);
    pub const SBGP_IP_ADDR_BLOCK: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 1, 7]);
    pub const SBGP_AUTONOMOUS_SYS_NUM: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 1, 8]);
    pub const SUBJECT_INFO_ACCESS: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 1, 11]);

    pub const KP_BGPSEC_ROUTER: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 3, 30]);

    pub const AD_CA_ISSUERS: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 48, 2]);
    pub const AD_CA_REPOSITORY: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 48, 5]);
    pub const AD_RPKI_MANIFEST: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 48, 10]);
    pub const AD_RPKI_NOTIFY: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 48, 13]);

    pub const CE_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);
    pub const CE_KEY_USAGE: ConstOid = Oid(&[85, 29, 15]);
    pub const CE_BASIC_CONSTRAINTS: ConstOid = Oid(&[85, 29, 19]);
    pub const CE_CRL_DISTRIBUTION_POINTS: ConstOid = Oid(&[85, 29, 31]);
    pub const CE_CERTIFICATE_POLICIES: ConstOid = Oid(&[85, 29, 32]);
    pub const CE_AUTHORITY_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 35]);
    pub const CE_EXTENDED_KEY_USAGE: ConstOid = Oid(&[85, 29, 37]);
}

/// One raw X.509v3 extension: identifier, criticality, value octets.
#[derive(Clone, Debug)]
pub struct Extension {
    pub oid: Oid<Bytes>,
    pub critical: bool,
    pub value: Bytes,
}

impl Extension {
    fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let oid = Oid::take_from(cons)?;
            let critical = cons.take_opt_bool()?.unwrap_or(false);
            let value = cons.take_primitive_if(Tag::OCTET_STRING, |prim| prim.take_all())?;
            Ok(Extension {
                oid,
                critical,
                value,
            })
        })
    }
}

/// The decoded skeleton of an RPKI certificate.
#[derive(Clone, Debug)]
pub struct Certificate {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// The complete DER-encoded SubjectPublicKeyInfo.
    pub spki: Bytes,
    pub extensions: Vec<Extension>,
}

impl Certificate {
    /// Decode a DER-encoded Certificate. Requires X.509 v3; the resource
    /// extensions only exist there.
    pub fn decode<S: IntoSource>(
        source: S,
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let cert = cons.take_sequence(Self::take_tbs_content)?;
            // signatureAlgorithm and signatureValue are checked by the
            // signature-verification caller, not here
            cons.take_sequence(|cons| cons.skip_all())?;
            cons.take_primitive_if(Tag::BIT_STRING, |prim| prim.skip_all())?;
            Ok(cert)
        })
    }

    fn take_tbs_content<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        // version [0] EXPLICIT INTEGER: v3 is encoded as 2
        cons.take_constructed_if(Tag::CTX_0, |cons| {
            cons.take_primitive_if(Tag::INTEGER, |prim| {
                let v = prim.take_all()?;
                if v.as_ref() == [2u8] {
                    Ok(())
                } else {
                    Err(prim.content_err("certificate version must be 3"))
                }
            })
        })?;
        // serialNumber
        cons.take_primitive_if(Tag::INTEGER, |prim| prim.skip_all())?;
        // signature AlgorithmIdentifier
        cons.take_sequence(|cons| cons.skip_all())?;
        // issuer
        cons.take_sequence(|cons| cons.skip_all())?;
        // validity
        let (not_before, not_after) =
            cons.take_sequence(|cons| Ok((take_time(cons)?, take_time(cons)?)))?;
        // subject
        cons.take_sequence(|cons| cons.skip_all())?;
        // subjectPublicKeyInfo, retained whole
        let spki = cons.capture_one()?.into_bytes();
        // issuerUniqueID / subjectUniqueID never appear in the profile
        cons.take_opt_primitive_if(Tag::CTX_1, |prim| prim.skip_all())?;
        cons.take_opt_primitive_if(Tag::CTX_2, |prim| prim.skip_all())?;
        // extensions [3] EXPLICIT SEQUENCE OF Extension
        let extensions = cons.take_constructed_if(Tag::CTX_3, |cons| {
            cons.take_sequence(|cons| {
                let mut extensions = Vec::new();
                while let Some(ext) = Extension::take_opt_from(cons)? {
                    extensions.push(ext);
                }
                Ok(extensions)
            })
        })?;
        Ok(Certificate {
            not_before,
            not_after,
            spki,
            extensions,
        })
    }
}

/// Decode a Time value, either UTCTime (RFC 5280: YYMMDDHHMMSSZ) or
/// GeneralizedTime (YYYYMMDDHHMMSSZ).
fn take_time<S: Source>(
    cons: &mut Constructed<S>,
) -> Result<DateTime<Utc>, DecodeError<S::Error>> {
    cons.take_primitive(|tag, prim| {
        let content = prim.take_all()?;
        let parsed = if tag == Tag::UTC_TIME {
            parse_time_digits(&content, 13).and_then(|(y, rest)| {
                // two-digit years pivot at 1950 per RFC 5280
                let year = if y >= 50 { y as i32 + 1900 } else { y as i32 + 2000 };
                to_datetime(year, rest)
            })
        } else if tag == Tag::GENERALIZED_TIME {
            parse_time_digits(&content, 15).and_then(|(y, rest)| to_datetime(y as i32, rest))
        } else {
            None
        };
        parsed.ok_or_else(|| prim.content_err("malformed validity time"))
    })
}

/// Split a `Z`-terminated digit string of the given total length into the
/// year field and the five two-digit fields following it.
fn parse_time_digits(d: &[u8], len: usize) -> Option<(u32, [u32; 5])> {
    if d.len() != len || d[len - 1] != b'Z' {
        return None;
    }
    let digits = &d[..len - 1];
    if !digits.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let ylen = digits.len() - 10;
    let year = digits[..ylen]
        .iter()
        .fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);
    let mut rest = [0u32; 5];
    for (i, pair) in digits[ylen..].chunks(2).enumerate() {
        rest[i] = ((pair[0] - b'0') * 10 + (pair[1] - b'0')) as u32;
    }
    Some((year, rest))
}

fn to_datetime(year: i32, [mo, day, h, mi, s]: [u32; 5]) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, mo, day, h, mi, s).single()
}

/// BasicConstraints ::= SEQUENCE { cA BOOLEAN DEFAULT FALSE }. The
/// pathLenConstraint field is not part of the profile and fails the parse.
pub fn parse_basic_constraints<S: IntoSource>(
    source: S,
) -> Result<bool, DecodeError<<S::Source as Source>::Error>> {
    Mode::Der.decode(source, |cons| {
        cons.take_sequence(|cons| Ok(cons.take_opt_bool()?.unwrap_or(false)))
    })
}

/// SubjectKeyIdentifier ::= OCTET STRING. Length is judged by the caller.
pub fn parse_subject_key_identifier<S: IntoSource>(
    source: S,
) -> Result<Bytes, DecodeError<<S::Source as Source>::Error>> {
    Mode::Der.decode(source, |cons| {
        cons.take_primitive_if(Tag::OCTET_STRING, |prim| prim.take_all())
    })
}

/// AuthorityKeyIdentifier ::= SEQUENCE { keyIdentifier [0] OCTET STRING }.
/// The issuer/serial alternatives are not part of the profile.
pub fn parse_authority_key_identifier<S: IntoSource>(
    source: S,
) -> Result<Bytes, DecodeError<<S::Source as Source>::Error>> {
    Mode::Der.decode(source, |cons| {
        cons.take_sequence(|cons| cons.take_primitive_if(Tag::CTX_0, |prim| prim.take_all()))
    })
}

/// AuthorityInfoAccessSyntax: exactly one AccessDescription with the
/// id-ad-caIssuers method and a uniformResourceIdentifier location.
pub fn parse_authority_info_access<S: IntoSource>(
    source: S,
) -> Result<Bytes, DecodeError<<S::Source as Source>::Error>> {
    Mode::Der.decode(source, |cons| {
        cons.take_sequence(|cons| {
            cons.take_sequence(|cons| {
                let method = Oid::take_from(cons)?;
                if method != oid::AD_CA_ISSUERS {
                    return Err(cons.content_err("AIA access method is not caIssuers"));
                }
                cons.take_primitive_if(Tag::CTX_6, |prim| prim.take_all())
            })
        })
    })
}

/// CRLDistributionPoints with exactly one DistributionPoint whose
/// fullName holds URI GeneralNames; the first URI wins.
pub fn parse_crl_distribution_points<S: IntoSource>(
    source: S,
) -> Result<Bytes, DecodeError<<S::Source as Source>::Error>> {
    Mode::Der.decode(source, |cons| {
        cons.take_sequence(|cons| {
            cons.take_sequence(|cons| {
                cons.take_constructed_if(Tag::CTX_0, |cons| {
                    cons.take_constructed_if(Tag::CTX_0, |cons| {
                        let uri = cons.take_primitive_if(Tag::CTX_6, |prim| prim.take_all())?;
                        cons.skip_all()?;
                        Ok(uri)
                    })
                })
            })
        })
    })
}

/// ExtKeyUsageSyntax ::= SEQUENCE SIZE (1..MAX) OF OBJECT IDENTIFIER.
pub fn parse_extended_key_usage<S: IntoSource>(
    source: S,
) -> Result<Vec<Oid<Bytes>>, DecodeError<<S::Source as Source>::Error>> {
    Mode::Der.decode(source, |cons| {
        cons.take_sequence(|cons| {
            let mut oids = Vec::new();
            while let Some(oid) =
                cons.take_opt_primitive_if(Tag::OID, |prim| prim.take_all().map(Oid))?
            {
                oids.push(oid);
            }
            if oids.is_empty() {
                return Err(cons.content_err("empty extended key usage"));
            }
            Ok(oids)
        })
    })
}
