//! End-to-end scenarios: build DER certificates, parse them, and run them
//! through trust-anchor and chain validation.

use bcder::encode::{self, PrimitiveContent};
use bcder::{Captured, Mode, Tag};
use bytes::Bytes;
use rpki_certs::validate::{self, AuthTree, BrkTree};
use rpki_certs::{Cert, CertPurpose, RpkiCertsError};

const OID_SHA256_RSA: &[u8] = &[42, 134, 72, 134, 247, 13, 1, 1, 11];
const OID_RSA: &[u8] = &[42, 134, 72, 134, 247, 13, 1, 1, 1];

const OID_SKI: &[u8] = &[85, 29, 14];
const OID_AKI: &[u8] = &[85, 29, 35];
const OID_BASIC_CONSTRAINTS: &[u8] = &[85, 29, 19];
const OID_EKU: &[u8] = &[85, 29, 37];
const OID_AIA: &[u8] = &[43, 6, 1, 5, 5, 7, 1, 1];
const OID_SIA: &[u8] = &[43, 6, 1, 5, 5, 7, 1, 11];
const OID_SBGP_IP: &[u8] = &[43, 6, 1, 5, 5, 7, 1, 7];
const OID_SBGP_AS: &[u8] = &[43, 6, 1, 5, 5, 7, 1, 8];

const OID_CA_ISSUERS: &[u8] = &[43, 6, 1, 5, 5, 7, 48, 2];
const OID_CA_REPOSITORY: &[u8] = &[43, 6, 1, 5, 5, 7, 48, 5];
const OID_RPKI_MANIFEST: &[u8] = &[43, 6, 1, 5, 5, 7, 48, 10];
const OID_KP_BGPSEC: &[u8] = &[43, 6, 1, 5, 5, 7, 3, 30];

/// Raw primitive content for hand-building DER values.
struct Raw<'a>(&'a [u8]);

impl PrimitiveContent for Raw<'_> {
    const TAG: Tag = Tag::OCTET_STRING;

    fn encoded_len(&self, _: Mode) -> usize {
        self.0.len()
    }

    fn write_encoded<W: std::io::Write>(
        &self,
        _: Mode,
        target: &mut W,
    ) -> Result<(), std::io::Error> {
        target.write_all(self.0)
    }
}

fn cap(values: impl encode::Values) -> Captured {
    Captured::from_values(Mode::Der, values)
}

fn algorithm() -> Captured {
    cap(encode::sequence((
        Raw(OID_SHA256_RSA).encode_as(Tag::OID),
        Raw(&[]).encode_as(Tag::NULL),
    )))
}

fn name() -> Captured {
    cap(encode::sequence(Captured::empty(Mode::Der)))
}

fn validity() -> Captured {
    cap(encode::sequence((
        Raw(b"20250101000000Z").encode_as(Tag::GENERALIZED_TIME),
        Raw(b"20300101000000Z").encode_as(Tag::GENERALIZED_TIME),
    )))
}

/// A dummy SubjectPublicKeyInfo; `key_byte` varies the key material so
/// different subjects have different keys.
fn spki(key_byte: u8) -> Captured {
    cap(encode::sequence((
        cap(encode::sequence((
            Raw(OID_RSA).encode_as(Tag::OID),
            Raw(&[]).encode_as(Tag::NULL),
        ))),
        Raw(&[0x00, key_byte, key_byte, key_byte]).encode_as(Tag::BIT_STRING),
    )))
}

fn extension(oid: &[u8], critical: bool, value: &Captured) -> Captured {
    if critical {
        cap(encode::sequence((
            Raw(oid).encode_as(Tag::OID),
            Raw(&[0xFF]).encode_as(Tag::BOOLEAN),
            Raw(value.as_slice()).encode(),
        )))
    } else {
        cap(encode::sequence((
            Raw(oid).encode_as(Tag::OID),
            Raw(value.as_slice()).encode(),
        )))
    }
}

fn ski_ext(id: &[u8; 20]) -> Captured {
    extension(OID_SKI, false, &cap(Raw(id).encode()))
}

fn aki_ext(id: &[u8; 20]) -> Captured {
    extension(
        OID_AKI,
        false,
        &cap(encode::sequence(Raw(id).encode_as(Tag::CTX_0))),
    )
}

fn basic_constraints_ext() -> Captured {
    extension(
        OID_BASIC_CONSTRAINTS,
        true,
        &cap(encode::sequence(Raw(&[0xFF]).encode_as(Tag::BOOLEAN))),
    )
}

fn eku_bgpsec_ext() -> Captured {
    extension(
        OID_EKU,
        false,
        &cap(encode::sequence(Raw(OID_KP_BGPSEC).encode_as(Tag::OID))),
    )
}

fn aia_ext() -> Captured {
    extension(
        OID_AIA,
        false,
        &cap(encode::sequence(encode::sequence((
            Raw(OID_CA_ISSUERS).encode_as(Tag::OID),
            Raw(b"rsync://host/ta/parent.cer").encode_as(Tag::CTX_6),
        )))),
    )
}

fn sia_ext(repo: &[u8], mft: &[u8]) -> Captured {
    let mut body = Captured::builder(Mode::Der);
    body.extend(encode::sequence((
        Raw(OID_CA_REPOSITORY).encode_as(Tag::OID),
        Raw(repo).encode_as(Tag::CTX_6),
    )));
    body.extend(encode::sequence((
        Raw(OID_RPKI_MANIFEST).encode_as(Tag::OID),
        Raw(mft).encode_as(Tag::CTX_6),
    )));
    extension(OID_SIA, false, &cap(encode::sequence(body.freeze())))
}

/// sbgp-ipAddrBlock with one IPv4 family of prefixes; each prefix is raw
/// BIT STRING content (unused-bit count plus octets).
fn ip_ext(prefixes: &[&[u8]]) -> Captured {
    let mut entries = Captured::builder(Mode::Der);
    for p in prefixes {
        entries.extend(Raw(p).encode_as(Tag::BIT_STRING));
    }
    let family = cap(encode::sequence((
        Raw(&[0, 1]).encode(),
        encode::sequence(entries.freeze()),
    )));
    extension(OID_SBGP_IP, true, &cap(encode::sequence(family)))
}

fn as_range_ext(min: u32, max: u32) -> Captured {
    let asnum = encode::sequence_as(
        Tag::CTX_0,
        encode::sequence(encode::sequence((min.encode(), max.encode()))),
    );
    extension(OID_SBGP_AS, true, &cap(encode::sequence(asnum)))
}

fn as_id_ext(id: u32) -> Captured {
    let asnum = encode::sequence_as(Tag::CTX_0, encode::sequence(id.encode()));
    extension(OID_SBGP_AS, true, &cap(encode::sequence(asnum)))
}

/// Assemble a complete (unsigned-garbage-signature) certificate DER.
fn certificate(extensions: Vec<Captured>, key_byte: u8) -> Bytes {
    let mut exts = Captured::builder(Mode::Der);
    for ext in extensions {
        exts.extend(ext);
    }
    let tbs = cap(encode::sequence((
        (
            encode::sequence_as(Tag::CTX_0, 2u8.encode()),
            1u8.encode(),
            algorithm(),
            name(),
        ),
        (
            validity(),
            name(),
            spki(key_byte),
            encode::sequence_as(Tag::CTX_3, encode::sequence(exts.freeze())),
        ),
    )));
    cap(encode::sequence((
        tbs,
        algorithm(),
        Raw(&[0x00, 0xA5, 0xA5]).encode_as(Tag::BIT_STRING),
    )))
    .into_bytes()
}

const SKI_A: [u8; 20] = [0xAA; 20];
const SKI_B: [u8; 20] = [0xBB; 20];
const SKI_C: [u8; 20] = [0xCC; 20];
const SKI_R: [u8; 20] = [0xDD; 20];

const REPO: &[u8] = b"rsync://host/repo/";
const MFT: &[u8] = b"rsync://host/repo/ta.mft";

fn ta_der() -> Bytes {
    certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_A),
            sia_ext(REPO, MFT),
            ip_ext(&[&[0x00, 10]]),
            as_range_ext(64500, 64510),
        ],
        0x11,
    )
}

fn ta_key() -> Bytes {
    spki(0x11).into_bytes()
}

fn install_ta(tree: &mut AuthTree) {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
    let ta = Cert::parse_ta("ta.cer", ta_der(), &ta_key()).unwrap();
    validate::valid_ta("ta.cer", tree, &ta).unwrap();
    tree.insert_ta(ta, "example", "ta.cer").unwrap();
}

#[test]
fn test_ta_parse_and_install() {
    let ta = Cert::parse_ta("ta.cer", ta_der(), &ta_key()).unwrap();
    assert_eq!(ta.purpose, CertPurpose::Ca);
    assert_eq!(ta.ski, hex::encode_upper(SKI_A));
    assert!(ta.aki.is_none() && ta.aia.is_none() && ta.crl.is_none());
    assert_eq!(ta.mft.as_deref(), Some("rsync://host/repo/ta.mft"));
    assert_eq!(ta.ips.len(), 1);
    assert_eq!(ta.ips[0].to_string(), "10.0.0.0/8");
    assert_eq!(ta.expires.timestamp(), 1893456000); // 2030-01-01T00:00:00Z

    let mut tree = AuthTree::new();
    validate::valid_ta("ta.cer", &tree, &ta).unwrap();
    tree.insert_ta(ta, "example", "ta.cer").unwrap();
    assert_eq!(tree.len(), 1);
    let node = tree.find(&hex::encode_upper(SKI_A)).unwrap();
    assert!(node.parent.is_none());
    assert_eq!(node.tal, "example");
}

#[test]
fn test_child_covered_joins_tree() {
    let mut tree = AuthTree::new();
    install_ta(&mut tree);

    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_B),
            aki_ext(&SKI_A),
            aia_ext(),
            sia_ext(REPO, b"rsync://host/repo/b.mft"),
            ip_ext(&[&[0x00, 10, 1]]),
            as_id_ext(64501),
        ],
        0x22,
    );
    let mut child = Cert::parse("b.cer", der).unwrap();
    assert_eq!(child.aki.as_deref(), Some(hex::encode_upper(SKI_A).as_str()));

    validate::valid_cert("b.cer", &tree, &child).unwrap();
    child.valid = true;
    tree.insert(child, "b.cer").unwrap();

    assert_eq!(tree.len(), 2);
    let node = tree.find(&hex::encode_upper(SKI_B)).unwrap();
    assert_eq!(node.parent.as_deref(), Some(hex::encode_upper(SKI_A).as_str()));
    assert_eq!(node.tal, "example");
    assert!(node.cert.valid);
}

#[test]
fn test_child_uncovered_ip_rejected() {
    let mut tree = AuthTree::new();
    install_ta(&mut tree);

    // 11.0.0.0/16 is outside the trust anchor's 10.0.0.0/8
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_C),
            aki_ext(&SKI_A),
            aia_ext(),
            sia_ext(REPO, b"rsync://host/repo/c.mft"),
            ip_ext(&[&[0x00, 11, 0]]),
        ],
        0x33,
    );
    let child = Cert::parse("c.cer", der).unwrap();
    let err = validate::valid_cert("c.cer", &tree, &child).unwrap_err();
    assert!(matches!(err, RpkiCertsError::Coverage { .. }));
    assert!(err.to_string().contains("uncovered IP"));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_router_cert_end_to_end() {
    let mut tree = AuthTree::new();
    install_ta(&mut tree);

    let der = certificate(
        vec![
            ski_ext(&SKI_R),
            aki_ext(&SKI_A),
            aia_ext(),
            eku_bgpsec_ext(),
            as_id_ext(64501),
        ],
        0x44,
    );
    let mut router = Cert::parse("r.cer", der).unwrap();
    assert_eq!(router.purpose, CertPurpose::BgpsecRouter);
    assert_eq!(router.pubkey.as_deref(), Some(spki(0x44).into_bytes().as_ref()));
    assert!(router.ips.is_empty() && router.mft.is_none());

    validate::valid_cert("r.cer", &tree, &router).unwrap();
    router.valid = true;
    router.tal = Some("example".to_string());

    let mut brks = BrkTree::new();
    brks.insert_cert(&router);
    assert_eq!(brks.len(), 1);
    let brk = brks.iter().next().unwrap();
    assert_eq!(brk.asid, 64501);
    assert_eq!(brk.ski, hex::encode_upper(SKI_R));
    assert_eq!(brk.tal, "example");
}

#[test]
fn test_router_cert_with_ip_resources_rejected() {
    let der = certificate(
        vec![
            ski_ext(&SKI_R),
            aki_ext(&SKI_A),
            aia_ext(),
            eku_bgpsec_ext(),
            as_id_ext(64501),
            ip_ext(&[&[0x00, 10, 1]]),
        ],
        0x44,
    );
    let err = Cert::parse("r.cer", der).unwrap_err();
    assert!(err.to_string().contains("unexpected IP resources"));
}

#[test]
fn test_router_cert_with_sia_rejected() {
    let der = certificate(
        vec![
            ski_ext(&SKI_R),
            aki_ext(&SKI_A),
            aia_ext(),
            eku_bgpsec_ext(),
            as_id_ext(64501),
            sia_ext(REPO, b"rsync://host/repo/r.mft"),
        ],
        0x44,
    );
    let err = Cert::parse("r.cer", der).unwrap_err();
    assert!(err.to_string().contains("unexpected SIA"));
}

#[test]
fn test_ta_with_foreign_aki_rejected() {
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_A),
            aki_ext(&SKI_B),
            sia_ext(REPO, MFT),
            ip_ext(&[&[0x00, 10]]),
        ],
        0x11,
    );
    let err = Cert::parse_ta("ta.cer", der, &ta_key()).unwrap_err();
    assert!(err.to_string().contains("must match SKI"));
}

#[test]
fn test_ta_key_mismatch_rejected() {
    let wrong = spki(0x99).into_bytes();
    let err = Cert::parse_ta("ta.cer", ta_der(), &wrong).unwrap_err();
    assert!(err.to_string().contains("does not match TAL"));
}

#[test]
fn test_ta_with_aia_rejected() {
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_A),
            aia_ext(),
            sia_ext(REPO, MFT),
            ip_ext(&[&[0x00, 10]]),
        ],
        0x11,
    );
    let err = Cert::parse_ta("ta.cer", der, &ta_key()).unwrap_err();
    assert!(err.to_string().contains("must not have AIA"));
}

#[test]
fn test_non_ta_missing_aia_rejected() {
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_B),
            aki_ext(&SKI_A),
            sia_ext(REPO, b"rsync://host/repo/b.mft"),
            ip_ext(&[&[0x00, 10, 1]]),
        ],
        0x22,
    );
    let err = Cert::parse("b.cer", der).unwrap_err();
    assert!(err.to_string().contains("missing AIA"));
}

#[test]
fn test_non_ta_aki_equal_ski_rejected() {
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_B),
            aki_ext(&SKI_B),
            aia_ext(),
            sia_ext(REPO, b"rsync://host/repo/b.mft"),
            ip_ext(&[&[0x00, 10, 1]]),
        ],
        0x22,
    );
    let err = Cert::parse("b.cer", der).unwrap_err();
    assert!(err.to_string().contains("must not match SKI"));
}

#[test]
fn test_unknown_critical_extension_rejected() {
    // 2.5.29.16 is not part of the profile
    let unknown = extension(&[85, 29, 16], true, &cap(Raw(&[]).encode_as(Tag::NULL)));
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_A),
            sia_ext(REPO, MFT),
            ip_ext(&[&[0x00, 10]]),
            unknown,
        ],
        0x11,
    );
    let err = Cert::parse_ta("ta.cer", der, &ta_key()).unwrap_err();
    assert!(err.to_string().contains("critical extension"));
}

#[test]
fn test_unknown_noncritical_extension_ignored() {
    let unknown = extension(&[85, 29, 16], false, &cap(Raw(&[]).encode_as(Tag::NULL)));
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_A),
            sia_ext(REPO, MFT),
            ip_ext(&[&[0x00, 10]]),
            unknown,
        ],
        0x11,
    );
    Cert::parse_ta("ta.cer", der, &ta_key()).unwrap();
}

#[test]
fn test_ca_without_resources_rejected() {
    let der = certificate(
        vec![
            basic_constraints_ext(),
            ski_ext(&SKI_B),
            aki_ext(&SKI_A),
            aia_ext(),
            sia_ext(REPO, b"rsync://host/repo/b.mft"),
        ],
        0x22,
    );
    let err = Cert::parse("b.cer", der).unwrap_err();
    assert!(err.to_string().contains("missing IP or AS resources"));
}

#[test]
fn test_parsed_record_survives_the_wire() {
    let mut tree = AuthTree::new();
    install_ta(&mut tree);
    let mut ta = tree.remove(&hex::encode_upper(SKI_A)).unwrap().cert;
    ta.valid = true;
    ta.tal = Some("example".to_string());

    let mut wire = ta.to_wire();
    let read = Cert::read_from(&mut wire).unwrap();
    assert_eq!(ta, read);
}
