//! Cross-process marshaling of validated certificate records.
//!
//! A cooperating worker process receives validated records over a pipe in a
//! fixed field order with native-endian fixed-width scalars. Optional
//! strings are length-prefixed with an `i32`, where -1 marks an absent
//! value. The retained DER handle is not transported; the receiving side
//! re-attaches one if it needs signature checks.
//!
//! Reading is symmetric and re-asserts the record invariants that matter
//! for downstream consumers: the SKI must be present, the manifest must be
//! present unless the record is a router certificate, ranges must be
//! well-ordered, and AS zero must not appear.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::DateTime;

use super::{Cert, CertPurpose};
use crate::errors::{Result, RpkiCertsError};
use crate::resources::ip::MAX_ADDR_SIZE;
use crate::resources::{Afi, AsResource, IpAddress, IpResource, IpResourceKind};

// Wire discriminants for entry variants.
const IP_ADDR: i32 = 1;
const IP_RANGE: i32 = 2;
const IP_INHERIT: i32 = 3;
const AS_ID: i32 = 1;
const AS_RANGE: i32 = 2;
const AS_INHERIT: i32 = 3;

// Reads carry no filename; the record travelled a pipe.
const PIPE: &str = "(ipc)";

impl Cert {
    /// Append the wire form of this record to `buf`.
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_i32_ne(self.valid as i32);
        buf.put_i64_ne(self.expires.timestamp());
        buf.put_i32_ne(self.purpose as i32);
        buf.put_u64_ne(self.ips.len() as u64);
        for entry in &self.ips {
            put_ip(buf, entry);
        }
        buf.put_u64_ne(self.as_resources.len() as u64);
        for entry in &self.as_resources {
            put_as(buf, entry);
        }
        put_opt_bytes(buf, self.mft.as_deref().map(str::as_bytes));
        put_opt_bytes(buf, self.notify.as_deref().map(str::as_bytes));
        put_opt_bytes(buf, self.repo.as_deref().map(str::as_bytes));
        put_opt_bytes(buf, self.crl.as_deref().map(str::as_bytes));
        put_opt_bytes(buf, self.aia.as_deref().map(str::as_bytes));
        put_opt_bytes(buf, self.aki.as_deref().map(str::as_bytes));
        put_opt_bytes(buf, Some(self.ski.as_bytes()));
        put_opt_bytes(buf, self.tal.as_deref().map(str::as_bytes));
        put_opt_bytes(buf, self.pubkey.as_deref());
    }

    /// The wire form as a fresh buffer.
    pub fn to_wire(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Read one record written by [`Cert::write_to`].
    pub fn read_from(buf: &mut impl Buf) -> Result<Self> {
        let valid = get_i32(buf)? != 0;
        let expires = DateTime::from_timestamp(get_i64(buf)?, 0)
            .ok_or_else(|| corrupt("expiry timestamp out of range"))?;
        let purpose = match get_i32(buf)? {
            1 => CertPurpose::Ca,
            2 => CertPurpose::BgpsecRouter,
            _ => return Err(corrupt("unknown certificate purpose")),
        };

        let ipsz = get_u64(buf)? as usize;
        let mut ips = Vec::with_capacity(ipsz.min(1024));
        for _ in 0..ipsz {
            ips.push(get_ip(buf)?);
        }
        let asz = get_u64(buf)? as usize;
        let mut as_resources = Vec::with_capacity(asz.min(1024));
        for _ in 0..asz {
            as_resources.push(get_as(buf)?);
        }

        let mft = get_opt_string(buf)?;
        let notify = get_opt_string(buf)?;
        let repo = get_opt_string(buf)?;
        let crl = get_opt_string(buf)?;
        let aia = get_opt_string(buf)?;
        let aki = get_opt_string(buf)?;
        let ski = get_opt_string(buf)?.ok_or_else(|| corrupt("record without SKI"))?;
        let tal = get_opt_string(buf)?;
        let pubkey = get_opt_bytes(buf)?;

        if ski.is_empty() {
            return Err(corrupt("record without SKI"));
        }
        if mft.is_none() && purpose != CertPurpose::BgpsecRouter {
            return Err(corrupt("CA record without manifest"));
        }

        Ok(Cert {
            purpose,
            expires,
            ski,
            aki,
            aia,
            crl,
            mft,
            repo,
            notify,
            tal,
            ips,
            as_resources,
            pubkey,
            valid,
            raw: Bytes::new(),
        })
    }
}

fn put_addr(buf: &mut BytesMut, addr: &IpAddress) {
    buf.put_i32_ne(addr.prefix_len as i32);
    buf.put_slice(&addr.addr);
}

fn put_ip(buf: &mut BytesMut, entry: &IpResource) {
    buf.put_i32_ne(entry.afi as i32);
    match &entry.kind {
        IpResourceKind::Addr(addr) => {
            buf.put_i32_ne(IP_ADDR);
            buf.put_slice(&entry.min);
            buf.put_slice(&entry.max);
            put_addr(buf, addr);
        }
        IpResourceKind::Range { low, high } => {
            buf.put_i32_ne(IP_RANGE);
            buf.put_slice(&entry.min);
            buf.put_slice(&entry.max);
            put_addr(buf, low);
            put_addr(buf, high);
        }
        IpResourceKind::Inherit => {
            buf.put_i32_ne(IP_INHERIT);
        }
    }
}

fn put_as(buf: &mut BytesMut, entry: &AsResource) {
    match *entry {
        AsResource::Id(id) => {
            buf.put_i32_ne(AS_ID);
            buf.put_u32_ne(id);
        }
        AsResource::Range { min, max } => {
            buf.put_i32_ne(AS_RANGE);
            buf.put_u32_ne(min);
            buf.put_u32_ne(max);
        }
        AsResource::Inherit => {
            buf.put_i32_ne(AS_INHERIT);
        }
    }
}

fn put_opt_bytes(buf: &mut BytesMut, v: Option<&[u8]>) {
    match v {
        None => buf.put_i32_ne(-1),
        Some(d) => {
            buf.put_i32_ne(d.len() as i32);
            buf.put_slice(d);
        }
    }
}

fn corrupt(detail: &str) -> RpkiCertsError {
    RpkiCertsError::structural(PIPE, detail)
}

fn need(buf: &impl Buf, n: usize) -> Result<()> {
    if buf.remaining() < n {
        return Err(corrupt("truncated record"));
    }
    Ok(())
}

fn get_i32(buf: &mut impl Buf) -> Result<i32> {
    need(buf, 4)?;
    Ok(buf.get_i32_ne())
}

fn get_u32(buf: &mut impl Buf) -> Result<u32> {
    need(buf, 4)?;
    Ok(buf.get_u32_ne())
}

fn get_i64(buf: &mut impl Buf) -> Result<i64> {
    need(buf, 8)?;
    Ok(buf.get_i64_ne())
}

fn get_u64(buf: &mut impl Buf) -> Result<u64> {
    need(buf, 8)?;
    Ok(buf.get_u64_ne())
}

fn get_array(buf: &mut impl Buf) -> Result<[u8; MAX_ADDR_SIZE]> {
    need(buf, MAX_ADDR_SIZE)?;
    let mut out = [0u8; MAX_ADDR_SIZE];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

fn get_addr(buf: &mut impl Buf, afi: Afi) -> Result<IpAddress> {
    let prefix_len = get_i32(buf)?;
    if prefix_len < 0 || prefix_len as usize > afi.bit_len() {
        return Err(corrupt("prefix length out of range"));
    }
    Ok(IpAddress {
        prefix_len: prefix_len as u8,
        addr: get_array(buf)?,
    })
}

fn get_ip(buf: &mut impl Buf) -> Result<IpResource> {
    let afi = match get_i32(buf)? {
        1 => Afi::Ipv4,
        2 => Afi::Ipv6,
        _ => return Err(corrupt("unknown address family")),
    };
    let variant = get_i32(buf)?;
    if variant == IP_INHERIT {
        return Ok(IpResource::inherit(afi));
    }
    let min = get_array(buf)?;
    let max = get_array(buf)?;
    let alen = afi.addr_len();
    if min[..alen] > max[..alen] {
        return Err(corrupt("reversed IP range"));
    }
    let kind = match variant {
        IP_ADDR => IpResourceKind::Addr(get_addr(buf, afi)?),
        IP_RANGE => IpResourceKind::Range {
            low: get_addr(buf, afi)?,
            high: get_addr(buf, afi)?,
        },
        _ => return Err(corrupt("unknown IP entry variant")),
    };
    Ok(IpResource {
        afi,
        kind,
        min,
        max,
    })
}

fn get_as(buf: &mut impl Buf) -> Result<AsResource> {
    match get_i32(buf)? {
        AS_ID => {
            let id = get_u32(buf)?;
            if id == 0 {
                return Err(corrupt("AS zero in record"));
            }
            Ok(AsResource::Id(id))
        }
        AS_RANGE => {
            let min = get_u32(buf)?;
            let max = get_u32(buf)?;
            if min >= max {
                return Err(corrupt("malformed AS range"));
            }
            Ok(AsResource::Range { min, max })
        }
        AS_INHERIT => Ok(AsResource::Inherit),
        _ => Err(corrupt("unknown AS entry variant")),
    }
}

fn get_opt_bytes(buf: &mut impl Buf) -> Result<Option<Bytes>> {
    let len = get_i32(buf)?;
    if len < 0 {
        return Ok(None);
    }
    let len = len as usize;
    need(buf, len)?;
    Ok(Some(buf.copy_to_bytes(len)))
}

fn get_opt_string(buf: &mut impl Buf) -> Result<Option<String>> {
    match get_opt_bytes(buf)? {
        None => Ok(None),
        Some(raw) => String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|_| corrupt("non-UTF-8 string in record")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cert() -> Cert {
        let low = IpAddress::from_bits(Afi::Ipv4, 0, &[10, 0]).unwrap();
        let high = IpAddress::from_bits(Afi::Ipv4, 0, &[10, 3]).unwrap();
        Cert {
            purpose: CertPurpose::Ca,
            expires: DateTime::from_timestamp(1_900_000_000, 0).unwrap(),
            ski: "AB".repeat(20),
            aki: Some("CD".repeat(20)),
            aia: Some("rsync://host/parent.cer".to_string()),
            crl: Some("rsync://host/repo/revoked.crl".to_string()),
            mft: Some("rsync://host/repo/x.mft".to_string()),
            repo: Some("rsync://host/repo/".to_string()),
            notify: None,
            tal: Some("example".to_string()),
            ips: vec![
                IpResource::from_addr(Afi::Ipv4, IpAddress::from_bits(Afi::Ipv4, 0, &[192, 0, 2]).unwrap()),
                IpResource::from_range(Afi::Ipv4, low, high).unwrap(),
                IpResource::inherit(Afi::Ipv6),
            ],
            as_resources: vec![
                AsResource::Id(64496),
                AsResource::Range { min: 64500, max: 64510 },
            ],
            pubkey: None,
            valid: true,
            raw: Bytes::from_static(b"not transported"),
        }
    }

    #[test]
    fn test_round_trip() {
        let cert = sample_cert();
        let mut wire = cert.to_wire();
        let read = Cert::read_from(&mut wire).unwrap();
        assert_eq!(cert, read);
        assert_eq!(wire.remaining(), 0);
        // the DER handle stays behind
        assert!(read.raw.is_empty());
    }

    #[test]
    fn test_round_trip_router_cert() {
        let mut cert = sample_cert();
        cert.purpose = CertPurpose::BgpsecRouter;
        cert.ips = Vec::new();
        cert.mft = None;
        cert.repo = None;
        cert.crl = None;
        cert.pubkey = Some(Bytes::from_static(&[0x30, 0x03, 0x02, 0x01, 0x01]));
        let read = Cert::read_from(&mut cert.to_wire()).unwrap();
        assert_eq!(cert, read);
    }

    #[test]
    fn test_truncated_record() {
        let cert = sample_cert();
        let wire = cert.to_wire();
        for cut in [0, 3, 16, wire.len() / 2, wire.len() - 1] {
            let mut short = wire.slice(..cut);
            assert!(Cert::read_from(&mut short).is_err());
        }
    }

    #[test]
    fn test_missing_manifest_rejected() {
        let mut cert = sample_cert();
        cert.mft = None;
        assert!(Cert::read_from(&mut cert.to_wire()).is_err());
    }

    #[test]
    fn test_as_zero_rejected() {
        let mut cert = sample_cert();
        cert.as_resources = vec![AsResource::Id(0)];
        assert!(Cert::read_from(&mut cert.to_wire()).is_err());
    }
}
