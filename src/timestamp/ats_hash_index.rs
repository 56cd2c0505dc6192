//! The ATS-hash-index of archive timestamps v3.
//!
//! An archive timestamp v3 doesn’t cover the complete signature. Instead,
//! it carries an unsigned attribute listing the digests of all the
//! certificates, revocation information, and unsigned attributes present
//! in the signature when the timestamp was created:
//!
//! ```txt
//! ATSHashIndexV3 ::= SEQUENCE {
//!     hashIndAlgorithm         AlgorithmIdentifier DEFAULT {algorithm
//!                              id-sha256},
//!     certificatesHashIndex    SEQUENCE OF OCTET STRING,
//!     crlsHashIndex            SEQUENCE OF OCTET STRING,
//!     unsignedAttrValuesHashIndex  SEQUENCE OF OCTET STRING }
//! ```
//!
//! There are three versions of the attribute. They share the syntax but
//! differ in what is hashed for an unsigned attribute.

use bcder::{encode, ConstOid, Mode, OctetString};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use log::{debug, error};
use crate::cades::{CadesSignature, CertificateSource, Token};
use crate::cms::{Attribute, AttributeKind};
use crate::config::Config;
use crate::crypto::{DigestAlgorithm, MessageDigest};
use crate::der::{self, EncodingError, Tlv};
use crate::error::{self, MessageImprintError};
use crate::oid;
use crate::util::hex;
use super::token::TimestampToken;


//------------ AtsHashIndexVersion -------------------------------------------

/// The version of an ATS-hash-index attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AtsHashIndexVersion {
    /// `id-aa-ATSHashIndex` of ETSI TS 101 733.
    V1,

    /// `id-aa-ATSHashIndex-v2` of ETSI EN 319 122-1 v1.0.0.
    V2,

    /// `id-aa-ATSHashIndex-v3` of ETSI EN 319 122-1 v1.1.1.
    V3,
}

impl AtsHashIndexVersion {
    pub fn from_kind(kind: AttributeKind) -> Option<Self> {
        match kind {
            AttributeKind::AtsHashIndex => Some(AtsHashIndexVersion::V1),
            AttributeKind::AtsHashIndexV2 => Some(AtsHashIndexVersion::V2),
            AttributeKind::AtsHashIndexV3 => Some(AtsHashIndexVersion::V3),
            _ => None
        }
    }

    /// Returns the attribute type of this version.
    pub fn oid(self) -> ConstOid {
        match self {
            AtsHashIndexVersion::V1 => oid::AA_ATS_HASH_INDEX,
            AtsHashIndexVersion::V2 => oid::AA_ATS_HASH_INDEX_V2,
            AtsHashIndexVersion::V3 => oid::AA_ATS_HASH_INDEX_V3,
        }
    }

    /// Returns the octet strings to hash for an unsigned attribute.
    ///
    /// Versions 1 and 2 hash the DER encoding of the complete attribute.
    /// Version 3 hashes the attribute type together with each value
    /// separately.
    pub fn attribute_octets(
        self, attr: &Attribute
    ) -> Result<Vec<Vec<u8>>, EncodingError> {
        match self {
            AtsHashIndexVersion::V3 => attr.value_octets(),
            _ => Ok(vec![attr.to_der()?])
        }
    }
}


//------------ AtsHashIndex --------------------------------------------------

/// An ATS-hash-index found in an archive timestamp.
#[derive(Clone, Debug)]
pub struct AtsHashIndex {
    version: AtsHashIndexVersion,

    /// The algorithm element if present, as encoded.
    algorithm: Option<Tlv>,

    /// The digest algorithm, explicit or assumed.
    digest_algorithm: DigestAlgorithm,

    certificates: Vec<Bytes>,
    crls: Vec<Bytes>,
    unsigned_attrs: Vec<Bytes>,
}

impl AtsHashIndex {
    /// Returns the ATS-hash-index of a timestamp token if present.
    ///
    /// The first attribute of any version found among the unsigned
    /// attributes of the token is used.
    pub fn from_token(
        token: &TimestampToken, config: &Config,
    ) -> Result<Option<Self>, error::DecodeError> {
        let attr = match token.unsigned_attrs().iter().find(|attr| {
            attr.kind().is_ats_hash_index()
        }) {
            Some(attr) => attr,
            None => return Ok(None)
        };
        Self::from_attribute(attr, config).map(Some)
    }

    /// Parses an ATS-hash-index attribute.
    pub fn from_attribute(
        attr: &Attribute, config: &Config,
    ) -> Result<Self, error::DecodeError> {
        let version = match AtsHashIndexVersion::from_kind(attr.kind()) {
            Some(version) => version,
            None => return Err(malformed("not an ATS-hash-index attribute"))
        };
        let value = match attr.first_value() {
            Some(value) if value.tag() == [0x30] => value,
            _ => return Err(malformed("ATS-hash-index is not a sequence"))
        };
        let mut fields = value.children().map_err(|err| {
            error::DecodeError::content(err, Default::default())
        })?;
        let algorithm = match fields.len() {
            4 => Some(fields.remove(0)),
            3 => None,
            _ => return Err(malformed("invalid ATS-hash-index"))
        };
        let digest_algorithm = match algorithm.as_ref() {
            Some(alg) => Self::take_algorithm(alg)?,
            None => config.archive_hash_algorithm(),
        };
        let certificates = Self::take_hash_list(&fields[0])?;
        let crls = Self::take_hash_list(&fields[1])?;
        let unsigned_attrs = Self::take_hash_list(&fields[2])?;
        Ok(AtsHashIndex {
            version, algorithm, digest_algorithm,
            certificates, crls, unsigned_attrs
        })
    }

    /// Parses the algorithm element.
    ///
    /// This is normally an algorithm identifier but some implementations
    /// only include the object identifier.
    fn take_algorithm(
        alg: &Tlv
    ) -> Result<DigestAlgorithm, error::DecodeError> {
        match alg.tag() {
            [0x30] => {
                Mode::Ber.decode(alg.raw().clone(), DigestAlgorithm::take_from)
            }
            [0x06] => {
                Mode::Ber.decode(
                    alg.raw().clone(), DigestAlgorithm::take_oid_from
                )
            }
            _ => Err(malformed("invalid ATS-hash-index algorithm"))
        }
    }

    fn take_hash_list(list: &Tlv) -> Result<Vec<Bytes>, error::DecodeError> {
        Mode::Ber.decode(list.raw().clone(), |cons| {
            cons.take_sequence(|cons| {
                let mut res = Vec::new();
                while let Some(hash) = OctetString::take_opt_from(cons)? {
                    res.push(hash.into_bytes())
                }
                Ok(res)
            })
        })
    }

    pub fn version(&self) -> AtsHashIndexVersion {
        self.version
    }

    /// Returns the digest algorithm of all hashes in the index.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Returns whether the algorithm was given explicitly.
    pub fn has_explicit_algorithm(&self) -> bool {
        self.algorithm.is_some()
    }

    pub fn certificates(&self) -> &[Bytes] {
        &self.certificates
    }

    pub fn crls(&self) -> &[Bytes] {
        &self.crls
    }

    pub fn unsigned_attrs(&self) -> &[Bytes] {
        &self.unsigned_attrs
    }

    /// Returns whether the certificates list contains the digest.
    pub fn contains_certificate(&self, digest: &MessageDigest) -> bool {
        self.contains(&self.certificates, digest)
    }

    /// Returns whether the CRLs list contains the digest.
    ///
    /// This list also contains the OCSP responses.
    pub fn contains_crl(&self, digest: &MessageDigest) -> bool {
        self.contains(&self.crls, digest)
    }

    pub fn contains_unsigned_attr(&self, digest: &MessageDigest) -> bool {
        self.contains(&self.unsigned_attrs, digest)
    }

    fn contains(&self, list: &[Bytes], digest: &MessageDigest) -> bool {
        digest.algorithm() == Some(self.digest_algorithm)
            && list.iter().any(|item| item == digest.value())
    }
}

/// # Verification
///
impl AtsHashIndex {
    /// Returns the DER encoded index after checking it against a signature.
    ///
    /// Every hash listed in the index must correspond to one item of the
    /// signature. The certificates are those in `certificates`, the
    /// revocation information is taken from the crls set of the signed data
    /// and the unsigned attributes from the signer info.
    ///
    /// If a list contains hashes that don’t appear in the signature, an
    /// empty list is used instead. The resulting index will then fail to
    /// produce a matching message imprint.
    pub fn verified(
        &self,
        signature: &CadesSignature,
        certificates: &CertificateSource,
    ) -> Result<Vec<u8>, MessageImprintError> {
        let alg = self.digest_algorithm;

        let mut remaining = self.certificates.clone();
        for cert in certificates.iter() {
            let digest = cert.digest(alg);
            if remove_hash(&mut remaining, digest.value()) {
                debug!("Certificate {} present in ATS-hash-index.", cert.id());
            }
        }
        let certs = self.checked_list(
            &self.certificates, remaining, "certificate"
        );

        let mut remaining = self.crls.clone();
        if let Some(crls) = signature.signed_data().crls() {
            for item in crls.items() {
                let digest = alg.digest(&item.to_der()?);
                if remove_hash(&mut remaining, digest.as_ref()) {
                    debug!(
                        "Revocation data {} present in ATS-hash-index.",
                        hex::encode(digest.as_ref())
                    );
                }
            }
        }
        let crls = self.checked_list(&self.crls, remaining, "CRL");

        let mut remaining = self.unsigned_attrs.clone();
        for attr in signature.unsigned_attrs() {
            for octets in self.version.attribute_octets(attr)? {
                if remove_hash(&mut remaining, alg.digest(&octets).as_ref()) {
                    debug!(
                        "Attribute {} present in ATS-hash-index.",
                        attr.attr_type()
                    );
                }
            }
        }
        let attrs = self.checked_list(
            &self.unsigned_attrs, remaining, "unsigned attribute"
        );

        let mut content = Vec::new();
        if let Some(algorithm) = self.algorithm.as_ref() {
            algorithm.write_der(&mut content)?;
        }
        write_hash_list(certs, &mut content);
        write_hash_list(crls, &mut content);
        write_hash_list(attrs, &mut content);
        let mut res = Vec::new();
        der::write_header(&mut res, &[0x30], content.len());
        res.extend_from_slice(&content);
        Ok(res)
    }

    fn checked_list<'a>(
        &self, list: &'a [Bytes], remaining: Vec<Bytes>, what: &str
    ) -> &'a [Bytes] {
        if remaining.is_empty() {
            return list
        }
        error!(
            "{} {} hashes of the ATS-hash-index have not been found in \
             the signature: {}",
            remaining.len(), what,
            remaining.iter().map(|item| {
                hex::encode(item)
            }).collect::<Vec<_>>().join(", ")
        );
        &[]
    }
}

fn remove_hash(list: &mut Vec<Bytes>, hash: &[u8]) -> bool {
    match list.iter().position(|item| item.as_ref() == hash) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false
    }
}

fn write_hash_list(list: &[Bytes], target: &mut Vec<u8>) {
    let mut content = Vec::new();
    for item in list {
        der::write_header(&mut content, &[0x04], item.len());
        content.extend_from_slice(item);
    }
    der::write_header(target, &[0x30], content.len());
    target.extend_from_slice(&content);
}

fn malformed(msg: &'static str) -> error::DecodeError {
    error::DecodeError::content(msg, Default::default())
}


//------------ AtsHashIndexBuilder -------------------------------------------

/// Creates the ATS-hash-index for a new archive timestamp v3.
///
/// The certificate-values and revocation-values attributes are left out of
/// the unsigned attributes list.
pub struct AtsHashIndexBuilder<'a> {
    signature: &'a CadesSignature,
    certificates: &'a CertificateSource,
    version: AtsHashIndexVersion,
    digest_algorithm: DigestAlgorithm,
    default_algorithm: DigestAlgorithm,
}

impl<'a> AtsHashIndexBuilder<'a> {
    /// Creates a builder for a signature.
    ///
    /// The `certificates` should be all certificates found in the
    /// signature and its timestamps.
    pub fn new(
        signature: &'a CadesSignature,
        certificates: &'a CertificateSource,
    ) -> Self {
        let default_algorithm = signature.config().archive_hash_algorithm();
        AtsHashIndexBuilder {
            signature, certificates,
            version: AtsHashIndexVersion::V3,
            digest_algorithm: default_algorithm,
            default_algorithm,
        }
    }

    pub fn version(mut self, version: AtsHashIndexVersion) -> Self {
        self.version = version;
        self
    }

    pub fn digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    /// Builds the complete DER encoded attribute.
    ///
    /// The algorithm identifier is left out if it is the default.
    pub fn build(&self) -> Result<Bytes, MessageImprintError> {
        let alg = self.digest_algorithm;
        let certs = self.certificates.iter().map(|cert| {
            Bytes::copy_from_slice(cert.digest(alg).value())
        }).collect::<Vec<_>>();
        let mut crls = Vec::new();
        if let Some(set) = self.signature.signed_data().crls() {
            for item in set.items() {
                crls.push(
                    Bytes::copy_from_slice(alg.digest(&item.to_der()?).as_ref())
                );
            }
        }
        let mut attrs = Vec::new();
        for attr in self.signature.unsigned_attrs() {
            if matches!(
                attr.kind(),
                AttributeKind::CertificateValues
                | AttributeKind::RevocationValues
            ) {
                continue
            }
            for octets in self.version.attribute_octets(attr)? {
                attrs.push(Bytes::copy_from_slice(alg.digest(&octets).as_ref()))
            }
        }
        let algorithm = if alg == self.default_algorithm {
            None
        }
        else {
            Some(alg.encode())
        };
        let res = encode::sequence((
            self.version.oid().encode(),
            encode::set(
                encode::sequence((
                    algorithm,
                    encode_hash_list(&certs),
                    encode_hash_list(&crls),
                    encode_hash_list(&attrs),
                ))
            )
        )).to_captured(Mode::Der).into_bytes();
        Ok(res)
    }
}

fn encode_hash_list(list: &[Bytes]) -> impl encode::Values + '_ {
    encode::sequence(
        list.iter().map(|item| {
            OctetString::encode_slice(item.as_ref())
        }).collect::<Vec<_>>()
    )
}


//============ Tests =========================================================
