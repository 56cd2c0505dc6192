//! Building encoded objects for testing.
//!
//! The functions and builders here produce minimal but well-formed DER
//! encodings of the objects appearing in CAdES signatures. Certificates
//! and CRLs are opaque sequences since their content is never looked at.

use bcder::{ConstOid, Mode, Oid};
use bcder::encode::Values;
use crate::crypto::{DigestAlgorithm, MessageDigest};
use crate::der;
use crate::oid;
use crate::x509::Time;


//------------ Primitives ----------------------------------------------------

/// Encodes a value with the given single octet tag.
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut res = Vec::new();
    der::write_header(&mut res, &[tag], content.len());
    res.extend_from_slice(content);
    res
}

/// Encodes a constructed value from already encoded elements.
pub fn constructed(tag: u8, elements: &[Vec<u8>]) -> Vec<u8> {
    tlv(tag, &elements.concat())
}

pub fn sequence(elements: &[Vec<u8>]) -> Vec<u8> {
    constructed(0x30, elements)
}

pub fn integer(value: u8) -> Vec<u8> {
    assert!(value < 0x80);
    tlv(0x02, &[value])
}

pub fn object_identifier(oid: ConstOid) -> Vec<u8> {
    let Oid(content) = oid;
    tlv(0x06, content)
}

pub fn octet_string(content: &[u8]) -> Vec<u8> {
    tlv(0x04, content)
}

fn encode<V: Values>(values: V) -> Vec<u8> {
    values.to_captured(Mode::Der).into_bytes().to_vec()
}

fn algorithm(alg: DigestAlgorithm) -> Vec<u8> {
    encode(alg.encode())
}

fn generalized_time(time: Time) -> Vec<u8> {
    encode(time.encode_generalized_time())
}

/// sha256WithRSAEncryption
const SIGNATURE_ALGORITHM: ConstOid = Oid(&[
    42, 134, 72, 134, 247, 13, 1, 1, 11
]);

const TSA_POLICY: ConstOid = Oid(&[43, 6, 1, 4, 1, 128, 128, 1]);


//------------ Attributes ----------------------------------------------------

/// Encodes an attribute with a single value.
pub fn attr(attr_type: ConstOid, value: Vec<u8>) -> Vec<u8> {
    sequence(&[object_identifier(attr_type), constructed(0x31, &[value])])
}

/// A content-type attribute for id-data.
pub fn content_type_attr() -> Vec<u8> {
    attr(oid::CONTENT_TYPE, object_identifier(oid::DATA))
}

/// Returns an opaque certificate distinct for each name.
pub fn certificate(name: &str) -> Vec<u8> {
    sequence(&[
        sequence(&[tlv(0x0C, b"certificate"), tlv(0x0C, name.as_bytes())]),
        sequence(&[object_identifier(SIGNATURE_ALGORITHM)]),
        tlv(0x03, b"\x00cert"),
    ])
}

/// Returns an opaque CRL distinct for each name.
pub fn crl(name: &str) -> Vec<u8> {
    sequence(&[
        sequence(&[tlv(0x0C, b"crl"), tlv(0x0C, name.as_bytes())]),
        sequence(&[object_identifier(SIGNATURE_ALGORITHM)]),
        tlv(0x03, b"\x00crl"),
    ])
}

/// Encodes an `OtherHash`, using the short form for SHA-1.
fn other_hash(digest: &MessageDigest) -> Vec<u8> {
    match digest.algorithm().unwrap_or_default() {
        DigestAlgorithm::Sha1 => octet_string(digest.value()),
        alg => sequence(&[algorithm(alg), octet_string(digest.value())])
    }
}

/// The value of a complete-certificate-references attribute.
pub fn complete_certificate_refs(digests: &[MessageDigest]) -> Vec<u8> {
    sequence(
        &digests.iter().map(|digest| {
            sequence(&[other_hash(digest)])
        }).collect::<Vec<_>>()
    )
}

/// The value of a signing-certificate-v2 attribute for a single cert.
///
/// If `omit_default` is `true`, a SHA-256 algorithm is left out.
pub fn signing_certificate_v2(
    digest: &MessageDigest, omit_default: bool
) -> Vec<u8> {
    let alg = digest.algorithm().unwrap_or_default();
    let mut cert_id = Vec::new();
    if !(omit_default && alg == DigestAlgorithm::Sha256) {
        cert_id.push(algorithm(alg));
    }
    cert_id.push(octet_string(digest.value()));
    sequence(&[sequence(&[sequence(&cert_id)])])
}

/// The value of a complete-revocation-references attribute.
///
/// All references are placed into a single `CrlOcspRef`. Each OCSP
/// reference is given by its produced-at time and an optional digest.
pub fn complete_revocation_refs(
    crls: &[MessageDigest], ocsp: &[(Time, Option<MessageDigest>)],
) -> Vec<u8> {
    let mut crl_ocsp_ref = Vec::new();
    if !crls.is_empty() {
        let ids = crls.iter().map(|digest| {
            sequence(&[other_hash(digest)])
        }).collect::<Vec<_>>();
        crl_ocsp_ref.push(constructed(0xA0, &[sequence(&[sequence(&ids)])]));
    }
    if !ocsp.is_empty() {
        let ids = ocsp.iter().map(|(produced_at, digest)| {
            let mut id = vec![sequence(&[
                responder_id(), generalized_time(*produced_at)
            ])];
            if let Some(digest) = digest {
                id.push(other_hash(digest))
            }
            sequence(&id)
        }).collect::<Vec<_>>();
        crl_ocsp_ref.push(constructed(0xA1, &[sequence(&[sequence(&ids)])]));
    }
    if crl_ocsp_ref.is_empty() {
        sequence(&[])
    }
    else {
        sequence(&[sequence(&crl_ocsp_ref)])
    }
}

/// The value of a revocation-values attribute.
pub fn revocation_values(crls: &[Vec<u8>], ocsp: &[Vec<u8>]) -> Vec<u8> {
    let mut res = Vec::new();
    if !crls.is_empty() {
        res.push(constructed(0xA0, &[sequence(crls)]));
    }
    if !ocsp.is_empty() {
        res.push(constructed(0xA1, &[sequence(ocsp)]));
    }
    sequence(&res)
}

/// The value of an ATS-hash-index attribute.
pub fn ats_hash_index(
    alg: Option<DigestAlgorithm>,
    certs: &[&[u8]], crls: &[&[u8]], attrs: &[&[u8]],
) -> Vec<u8> {
    let list = |items: &[&[u8]]| {
        sequence(
            &items.iter().map(|item| octet_string(item)).collect::<Vec<_>>()
        )
    };
    let mut res = Vec::new();
    if let Some(alg) = alg {
        res.push(algorithm(alg))
    }
    res.push(list(certs));
    res.push(list(crls));
    res.push(list(attrs));
    sequence(&res)
}


//------------ OCSP Responses ------------------------------------------------

fn responder_id() -> Vec<u8> {
    // byKey [2] EXPLICIT KeyHash
    constructed(0xA2, &[octet_string(b"responder")])
}

/// A basic OCSP response produced at the given time.
pub fn basic_ocsp_response(produced_at: Time, certs: &[Vec<u8>]) -> Vec<u8> {
    let mut res = vec![
        sequence(&[
            responder_id(),
            generalized_time(produced_at),
            sequence(&[]),
        ]),
        sequence(&[object_identifier(SIGNATURE_ALGORITHM)]),
        tlv(0x03, b"\x00ocsp"),
    ];
    if !certs.is_empty() {
        res.push(constructed(0xA0, &[sequence(certs)]));
    }
    sequence(&res)
}

/// Wraps a basic OCSP response for the crls set of signed data.
pub fn other_revocation_info(basic: &[u8]) -> Vec<u8> {
    constructed(0xA1, &[
        object_identifier(oid::PKIX_OCSP_BASIC), basic.to_vec()
    ])
}


//------------ SignerInfoBuilder ---------------------------------------------

#[derive(Clone, Debug)]
pub struct SignerInfoBuilder {
    signature: Vec<u8>,
    signed_attrs: Vec<Vec<u8>>,
    unsigned_attrs: Vec<Vec<u8>>,
}

impl SignerInfoBuilder {
    pub fn new(signature: &[u8]) -> Self {
        SignerInfoBuilder {
            signature: signature.into(),
            signed_attrs: Vec::new(),
            unsigned_attrs: Vec::new(),
        }
    }

    pub fn signed_attr(mut self, attr: Vec<u8>) -> Self {
        self.signed_attrs.push(attr);
        self
    }

    /// Adds an unsigned attribute.
    ///
    /// The attributes keep the order they are added in.
    pub fn unsigned_attr(mut self, attr: Vec<u8>) -> Self {
        self.unsigned_attrs.push(attr);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut res = vec![
            integer(1),
            // IssuerAndSerialNumber with an empty name.
            sequence(&[sequence(&[]), integer(1)]),
            algorithm(DigestAlgorithm::Sha256),
        ];
        if !self.signed_attrs.is_empty() {
            let mut attrs = self.signed_attrs.clone();
            attrs.sort();
            res.push(constructed(0xA0, &attrs));
        }
        res.push(sequence(&[object_identifier(SIGNATURE_ALGORITHM)]));
        res.push(octet_string(&self.signature));
        if !self.unsigned_attrs.is_empty() {
            res.push(constructed(0xA1, &self.unsigned_attrs));
        }
        sequence(&res)
    }
}


//------------ SignedDataBuilder ---------------------------------------------

/// Builds a signed data value wrapped into a content info.
#[derive(Clone, Debug)]
pub struct SignedDataBuilder {
    content_type: &'static [u8],
    content: Option<Vec<u8>>,
    certificates: Vec<Vec<u8>>,
    crls: Vec<Vec<u8>>,
    signer_infos: Vec<Vec<u8>>,
}

impl SignedDataBuilder {
    pub fn new() -> Self {
        SignedDataBuilder {
            content_type: oid::DATA.0,
            content: None,
            certificates: Vec::new(),
            crls: Vec::new(),
            signer_infos: Vec::new(),
        }
    }

    /// Sets the encapsulated content.
    ///
    /// Without it, the signed data is detached.
    pub fn content(mut self, content: &[u8]) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn content_type(mut self, content_type: ConstOid) -> Self {
        self.content_type = content_type.0;
        self
    }

    pub fn certificate(mut self, cert: Vec<u8>) -> Self {
        self.certificates.push(cert);
        self
    }

    /// Adds an element to the crls set.
    pub fn crl(mut self, crl: Vec<u8>) -> Self {
        self.crls.push(crl);
        self
    }

    pub fn signer_info(mut self, info: Vec<u8>) -> Self {
        self.signer_infos.push(info);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut encap = vec![tlv(0x06, self.content_type)];
        if let Some(content) = self.content.as_ref() {
            encap.push(constructed(0xA0, &[octet_string(content)]));
        }
        let mut signed_data = vec![
            integer(1),
            constructed(0x31, &[algorithm(DigestAlgorithm::Sha256)]),
            sequence(&encap),
        ];
        if !self.certificates.is_empty() {
            signed_data.push(constructed(0xA0, &self.certificates));
        }
        if !self.crls.is_empty() {
            signed_data.push(constructed(0xA1, &self.crls));
        }
        signed_data.push(constructed(0x31, &self.signer_infos));
        sequence(&[
            object_identifier(oid::SIGNED_DATA),
            constructed(0xA0, &[sequence(&signed_data)]),
        ])
    }
}

impl Default for SignedDataBuilder {
    fn default() -> Self {
        Self::new()
    }
}


//------------ TimestampBuilder ----------------------------------------------

/// Builds an RFC 3161 timestamp token.
///
/// The token is a signed data value with a TSTInfo as its content. Tokens
/// with different times or imprints have different encodings.
#[derive(Clone, Debug)]
pub struct TimestampBuilder {
    gen_time: Time,
    imprint: MessageDigest,
    certificates: Vec<Vec<u8>>,
    signer: SignerInfoBuilder,
}

impl TimestampBuilder {
    pub fn new(gen_time: Time, imprint: MessageDigest) -> Self {
        TimestampBuilder {
            gen_time,
            imprint,
            certificates: Vec::new(),
            signer: SignerInfoBuilder::new(b"tsa signature"),
        }
    }

    pub fn certificate(mut self, cert: Vec<u8>) -> Self {
        self.certificates.push(cert);
        self
    }

    pub fn unsigned_attr(mut self, attr: Vec<u8>) -> Self {
        self.signer = self.signer.unsigned_attr(attr);
        self
    }

    pub fn tst_info(&self) -> Vec<u8> {
        sequence(&[
            integer(1),
            object_identifier(TSA_POLICY),
            sequence(&[
                algorithm(self.imprint.algorithm().unwrap_or_default()),
                octet_string(self.imprint.value()),
            ]),
            integer(7),
            generalized_time(self.gen_time),
        ])
    }

    pub fn build(&self) -> Vec<u8> {
        let mut res = SignedDataBuilder::new()
            .content_type(oid::CT_TST_INFO)
            .content(&self.tst_info())
            .signer_info(self.signer.build());
        for cert in &self.certificates {
            res = res.certificate(cert.clone())
        }
        res.build()
    }
}
