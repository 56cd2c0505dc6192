//! Encoding signatures for the integration tests.

#![allow(dead_code)]

use bcder::{ConstOid, Mode, Oid};
use bcder::encode::Values;
use bytes::Bytes;
use cades_ts::Config;
use cades_ts::cades::{CadesSignature, CertificateSource};
use cades_ts::crypto::{DigestAlgorithm, MessageDigest};
use cades_ts::der::write_header;
use cades_ts::oid;
use cades_ts::timestamp::{Strategy, TimestampDataBuilder};
use cades_ts::x509::Time;


pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut res = Vec::new();
    write_header(&mut res, &[tag], content.len());
    res.extend_from_slice(content);
    res
}

pub fn cons(tag: u8, elements: &[Vec<u8>]) -> Vec<u8> {
    tlv(tag, &elements.concat())
}

pub fn seq(elements: &[Vec<u8>]) -> Vec<u8> {
    cons(0x30, elements)
}

pub fn object_id(oid: ConstOid) -> Vec<u8> {
    let Oid(content) = oid;
    tlv(0x06, content)
}

fn sha256_alg() -> Vec<u8> {
    DigestAlgorithm::Sha256.encode()
        .to_captured(Mode::Der).into_bytes().to_vec()
}

pub fn attr(attr_type: ConstOid, value: Vec<u8>) -> Vec<u8> {
    seq(&[object_id(attr_type), cons(0x31, &[value])])
}

pub fn certificate(name: &str) -> Vec<u8> {
    seq(&[tlv(0x0C, b"cert"), tlv(0x0C, name.as_bytes())])
}

/// Encodes a signer info with the given unsigned attributes.
pub fn signer_info(signature: &[u8], unsigned: &[Vec<u8>]) -> Vec<u8> {
    let mut res = vec![
        tlv(0x02, &[1]),
        seq(&[seq(&[]), tlv(0x02, &[1])]),
        sha256_alg(),
        seq(&[object_id(oid::SHA256)]),
        tlv(0x04, signature),
    ];
    if !unsigned.is_empty() {
        res.push(cons(0xA1, unsigned));
    }
    seq(&res)
}

/// Encodes a signed data content info.
pub fn signed_data(
    content_type: ConstOid,
    content: Option<&[u8]>,
    certs: &[Vec<u8>],
    signer_infos: &[Vec<u8>],
) -> Vec<u8> {
    let mut encap = vec![object_id(content_type)];
    if let Some(content) = content {
        encap.push(cons(0xA0, &[tlv(0x04, content)]));
    }
    let mut res = vec![
        tlv(0x02, &[1]),
        cons(0x31, &[sha256_alg()]),
        seq(&encap),
    ];
    if !certs.is_empty() {
        res.push(cons(0xA0, certs));
    }
    res.push(cons(0x31, signer_infos));
    seq(&[object_id(oid::SIGNED_DATA), cons(0xA0, &[seq(&res)])])
}

/// Encodes a timestamp token over `data`.
pub fn timestamp(
    year: i32, data: &[u8], unsigned: &[Vec<u8>]
) -> Vec<u8> {
    let imprint = DigestAlgorithm::Sha256.digest(data);
    let tst_info = seq(&[
        tlv(0x02, &[1]),
        object_id(Oid(&[43, 6, 1, 4, 1, 1])),
        seq(&[sha256_alg(), tlv(0x04, imprint.as_ref())]),
        tlv(0x02, &[1]),
        Time::utc(year, 6, 1, 12, 0, 0).encode_generalized_time()
            .to_captured(Mode::Der).into_bytes().to_vec(),
    ]);
    signed_data(
        oid::CT_TST_INFO, Some(&tst_info), &[],
        &[signer_info(b"tsa", unsigned)]
    )
}

pub fn decode(data: Vec<u8>) -> CadesSignature {
    CadesSignature::decode(Bytes::from(data), Vec::new(), &Config::default())
        .unwrap().remove(0)
}

/// Returns the data of an archive timestamp v2 at the given year.
pub fn archive_v2_data(
    signature: &CadesSignature, year: i32, strategy: Strategy
) -> Vec<u8> {
    let certs = CertificateSource::new();
    let mut res = Vec::new();
    TimestampDataBuilder::new(signature, &certs)
        .write_archive_timestamp_v2_data(
            Time::utc(year, 6, 1, 12, 0, 0), strategy, &mut res
        ).unwrap();
    res
}

pub fn sha256(data: &[u8]) -> MessageDigest {
    DigestAlgorithm::Sha256.message_digest(data)
}
