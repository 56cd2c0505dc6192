//! Signed and unsigned attributes of a signer info.

use bcder::{decode, ConstOid, Oid, Tag};
use bcder::decode::DecodeError;
use bytes::Bytes;
use crate::der::{self, EncodingError, Tlv};
use crate::oid;


//------------ Attribute -----------------------------------------------------

/// A single attribute of a signer info.
///
/// ```txt
/// Attribute ::= SEQUENCE {
///     attrType OBJECT IDENTIFIER,
///     attrValues SET OF AttributeValue }
/// ```
///
/// The attribute keeps its encoding as found in the signature so it can be
/// re-encoded for calculating message imprints later.
#[derive(Clone, Debug)]
pub struct Attribute {
    raw: Tlv,
    attr_type: Oid<Bytes>,
    kind: AttributeKind,
    values: Vec<Tlv>,
}

impl Attribute {
    /// Creates an attribute from its encoded value.
    pub fn from_tlv(raw: Tlv) -> Result<Self, EncodingError> {
        if raw.tag() != [0x30] {
            return Err(EncodingError::new("attribute is not a sequence"))
        }
        let mut fields = raw.children()?.into_iter();
        let attr_type = match fields.next() {
            Some(attr_type) if attr_type.tag() == [0x06] => {
                Oid(attr_type.content().clone())
            }
            _ => return Err(EncodingError::new("missing attribute type"))
        };
        let values = match fields.next() {
            Some(values) if values.tag() == [0x31] => values.children()?,
            _ => return Err(EncodingError::new("missing attribute values"))
        };
        if fields.next().is_some() {
            return Err(EncodingError::new("trailing data in attribute"))
        }
        Ok(Attribute {
            kind: AttributeKind::from_oid(&attr_type),
            raw, attr_type, values
        })
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let raw = Tlv::capture_from(cons)?;
        Self::from_tlv(raw).map_err(|err| cons.content_err(err))
    }

    pub fn attr_type(&self) -> &Oid<Bytes> {
        &self.attr_type
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn values(&self) -> &[Tlv] {
        &self.values
    }

    /// Returns the first value of the attribute.
    ///
    /// Most attributes are defined to have exactly one value.
    pub fn first_value(&self) -> Option<&Tlv> {
        self.values.first()
    }

    /// Returns the attribute as it was encoded originally.
    pub fn raw(&self) -> &Tlv {
        &self.raw
    }

    /// Returns the DER encoding of the complete attribute.
    pub fn to_der(&self) -> Result<Vec<u8>, EncodingError> {
        self.raw.to_der()
    }

    /// Returns the DER encoding of the attribute type.
    pub fn type_der(&self) -> Vec<u8> {
        let mut res = Vec::new();
        der::write_header(&mut res, &[0x06], self.attr_type.0.len());
        res.extend_from_slice(self.attr_type.0.as_ref());
        res
    }

    /// Returns the DER encoding of the attribute values set.
    pub fn values_der(&self) -> Result<Vec<u8>, EncodingError> {
        let mut res = Vec::new();
        der::write_der_set(&[0x31], &self.values, &mut res)?;
        Ok(res)
    }

    /// Returns the encoded type followed by the encoded values.
    ///
    /// This is what timestamps over individual attributes are calculated
    /// over, leaving out the outer sequence.
    pub fn type_and_values_der(&self) -> Result<Vec<u8>, EncodingError> {
        let mut res = self.type_der();
        res.extend_from_slice(&self.values_der()?);
        Ok(res)
    }

    /// Returns the octets hashed for each value by an ATS-hash-index-v3.
    ///
    /// For each value, this is the DER encoded attribute type followed by
    /// the DER encoded value.
    pub fn value_octets(&self) -> Result<Vec<Vec<u8>>, EncodingError> {
        self.values.iter().map(|value| {
            let mut res = self.type_der();
            value.write_der(&mut res)?;
            Ok(res)
        }).collect()
    }
}


//------------ AttributeKind -------------------------------------------------

/// The kinds of attributes relevant for processing timestamps.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttributeKind {
    ContentType,
    MessageDigest,
    SigningTime,
    SigningCertificate,
    SigningCertificateV2,
    ContentTimestamp,
    SignatureTimestamp,
    CompleteCertificateRefs,
    CompleteRevocationRefs,
    AttributeCertificateRefs,
    AttributeRevocationRefs,
    CertificateValues,
    RevocationValues,

    /// The CAdES-C-time-stamp over signature and references, type X1.
    SigAndRefsTimestamp,

    /// The time-stamped certificates and CRLs, type X2.
    RefsOnlyTimestamp,

    ArchiveTimestampV2,
    ArchiveTimestampV3,
    AtsHashIndex,
    AtsHashIndexV2,
    AtsHashIndexV3,
    CounterSignature,
    SignaturePolicyStore,

    /// Any other attribute.
    Other,
}

/// The attribute types we know about.
const KINDS: &[(ConstOid, AttributeKind)] = &[
    (oid::CONTENT_TYPE, AttributeKind::ContentType),
    (oid::MESSAGE_DIGEST, AttributeKind::MessageDigest),
    (oid::SIGNING_TIME, AttributeKind::SigningTime),
    (oid::AA_SIGNING_CERTIFICATE, AttributeKind::SigningCertificate),
    (oid::AA_SIGNING_CERTIFICATE_V2, AttributeKind::SigningCertificateV2),
    (oid::AA_ETS_CONTENT_TIMESTAMP, AttributeKind::ContentTimestamp),
    (oid::AA_SIGNATURE_TIME_STAMP_TOKEN, AttributeKind::SignatureTimestamp),
    (oid::AA_ETS_CERTIFICATE_REFS, AttributeKind::CompleteCertificateRefs),
    (oid::AA_ETS_REVOCATION_REFS, AttributeKind::CompleteRevocationRefs),
    (
        oid::AA_ETS_ATTR_CERTIFICATE_REFS,
        AttributeKind::AttributeCertificateRefs
    ),
    (
        oid::AA_ETS_ATTR_REVOCATION_REFS,
        AttributeKind::AttributeRevocationRefs
    ),
    (oid::AA_ETS_CERT_VALUES, AttributeKind::CertificateValues),
    (oid::AA_ETS_REVOCATION_VALUES, AttributeKind::RevocationValues),
    (oid::AA_ETS_ESC_TIME_STAMP, AttributeKind::SigAndRefsTimestamp),
    (oid::AA_ETS_CERT_CRL_TIMESTAMP, AttributeKind::RefsOnlyTimestamp),
    (oid::AA_ETS_ARCHIVE_TIMESTAMP_V2, AttributeKind::ArchiveTimestampV2),
    (oid::AA_ETS_ARCHIVE_TIMESTAMP_V3, AttributeKind::ArchiveTimestampV3),
    (oid::AA_ATS_HASH_INDEX, AttributeKind::AtsHashIndex),
    (oid::AA_ATS_HASH_INDEX_V2, AttributeKind::AtsHashIndexV2),
    (oid::AA_ATS_HASH_INDEX_V3, AttributeKind::AtsHashIndexV3),
    (oid::COUNTER_SIGNATURE, AttributeKind::CounterSignature),
    (oid::AA_ETS_SIG_POLICY_STORE, AttributeKind::SignaturePolicyStore),
];

impl AttributeKind {
    /// Determines the kind of attribute from its type.
    pub fn from_oid<T: AsRef<[u8]>>(oid: &Oid<T>) -> Self {
        KINDS.iter().find(|(known, _)| {
            known.0 == oid.0.as_ref()
        }).map(|(_, kind)| *kind).unwrap_or(AttributeKind::Other)
    }

    /// Returns whether attributes of this kind contain a timestamp token.
    pub fn is_timestamp(self) -> bool {
        matches!(
            self,
            AttributeKind::ContentTimestamp
            | AttributeKind::SignatureTimestamp
            | AttributeKind::SigAndRefsTimestamp
            | AttributeKind::RefsOnlyTimestamp
            | AttributeKind::ArchiveTimestampV2
            | AttributeKind::ArchiveTimestampV3
        )
    }

    pub fn is_archive_timestamp(self) -> bool {
        matches!(
            self,
            AttributeKind::ArchiveTimestampV2
            | AttributeKind::ArchiveTimestampV3
        )
    }

    /// Returns whether this is any version of the ATS-hash-index.
    pub fn is_ats_hash_index(self) -> bool {
        matches!(
            self,
            AttributeKind::AtsHashIndex
            | AttributeKind::AtsHashIndexV2
            | AttributeKind::AtsHashIndexV3
        )
    }

    pub fn is_certificate_refs(self) -> bool {
        matches!(
            self,
            AttributeKind::CompleteCertificateRefs
            | AttributeKind::AttributeCertificateRefs
        )
    }

    pub fn is_revocation_refs(self) -> bool {
        matches!(
            self,
            AttributeKind::CompleteRevocationRefs
            | AttributeKind::AttributeRevocationRefs
        )
    }
}


//------------ Attributes ----------------------------------------------------

/// An ordered list of attributes.
///
/// The order is the one found in the encoded signer info. For unsigned
/// attributes, this is the order in which they were added to the signature.
#[derive(Clone, Debug, Default)]
pub struct Attributes {
    /// The encoded attributes set if present.
    raw: Option<Tlv>,

    /// The attributes.
    attrs: Vec<Attribute>,
}

impl Attributes {
    /// Attributes that were not present at all.
    pub const EMPTY: Self = Attributes { raw: None, attrs: Vec::new() };

    /// Takes an optional attributes set with the given implicit tag.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>, tag: Tag,
    ) -> Result<Self, DecodeError<S::Error>> {
        let raw = match Tlv::capture_opt_constructed_from(cons, tag)? {
            Some(raw) => raw,
            None => return Ok(Self::default())
        };
        Self::from_tlv(raw).map_err(|err| cons.content_err(err))
    }

    /// Creates the attributes from an encoded set.
    pub fn from_tlv(raw: Tlv) -> Result<Self, EncodingError> {
        let attrs = raw.children()?.into_iter().map(
            Attribute::from_tlv
        ).collect::<Result<_, _>>()?;
        Ok(Attributes { raw: Some(raw), attrs })
    }

    /// Returns whether the attributes set was present at all.
    pub fn is_present(&self) -> bool {
        self.raw.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.attrs.iter()
    }

    /// Returns all attributes of the given kind in their order.
    pub fn of_kind(
        &self, kind: AttributeKind
    ) -> impl Iterator<Item = &Attribute> + '_ {
        self.attrs.iter().filter(move |attr| attr.kind() == kind)
    }

    /// Returns the first attribute of the given kind.
    pub fn first_of_kind(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.of_kind(kind).next()
    }

    /// Returns the DER encoded attributes set using the given tag.
    ///
    /// The attributes are sorted as required for a DER encoded `SET OF`.
    /// Returns `None` if the attributes were not present.
    pub fn to_der_set(
        &self, tag: u8
    ) -> Result<Option<Vec<u8>>, EncodingError> {
        if self.raw.is_none() {
            return Ok(None)
        }
        let raw = self.attrs.iter().map(|attr| attr.raw().clone()).collect::<
            Vec<_>
        >();
        let mut res = Vec::new();
        der::write_der_set(&[tag], &raw, &mut res)?;
        Ok(Some(res))
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    // id-aa-signatureTimeStampToken with two values in reverse order.
    const ATTR: &[u8] =
        b"\x30\x15\x06\x0b\x2a\x86\x48\x86\xf7\x0d\x01\x09\x10\x02\x0e\
          \x31\x06\x04\x01\x02\x04\x01\x01";

    fn attr() -> Attribute {
        Attribute::from_tlv(Tlv::parse(Bytes::from_static(ATTR)).unwrap())
            .unwrap()
    }

    #[test]
    fn classify() {
        let attr = attr();
        assert_eq!(attr.kind(), AttributeKind::SignatureTimestamp);
        assert!(attr.kind().is_timestamp());
        assert!(!attr.kind().is_archive_timestamp());
        assert_eq!(attr.values().len(), 2);
        assert_eq!(
            AttributeKind::from_oid(&oid::AA_ATS_HASH_INDEX_V3),
            AttributeKind::AtsHashIndexV3
        );
        assert_eq!(
            AttributeKind::from_oid(&oid::SHA256), AttributeKind::Other
        );
    }

    #[test]
    fn encodings() {
        let attr = attr();
        assert_eq!(
            attr.type_der(),
            b"\x06\x0b\x2a\x86\x48\x86\xf7\x0d\x01\x09\x10\x02\x0e".to_vec()
        );
        assert_eq!(
            attr.values_der().unwrap(),
            b"\x31\x06\x04\x01\x01\x04\x01\x02".to_vec()
        );
        let octets = attr.value_octets().unwrap();
        assert_eq!(octets.len(), 2);
        assert!(octets[0].ends_with(b"\x04\x01\x02"));
        assert!(octets[1].ends_with(b"\x04\x01\x01"));
        let whole = attr.to_der().unwrap();
        assert!(whole.ends_with(b"\x31\x06\x04\x01\x01\x04\x01\x02"));
    }

    #[test]
    fn reject_malformed() {
        assert!(Attribute::from_tlv(
            Tlv::parse(Bytes::from_static(b"\x30\x03\x04\x01\x00")).unwrap()
        ).is_err());
        assert!(Attribute::from_tlv(
            Tlv::parse(Bytes::from_static(b"\x31\x00")).unwrap()
        ).is_err());
    }

    #[test]
    fn attribute_sets() {
        let mut data = vec![0xA1, ATTR.len() as u8 * 2];
        data.extend_from_slice(ATTR);
        data.extend_from_slice(ATTR);
        let attrs = Attributes::from_tlv(
            Tlv::parse(Bytes::from(data)).unwrap()
        ).unwrap();
        assert!(attrs.is_present());
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.of_kind(AttributeKind::SignatureTimestamp).count(), 2);
        assert!(attrs.first_of_kind(AttributeKind::CounterSignature).is_none());
        let der = attrs.to_der_set(0xA0).unwrap().unwrap();
        assert_eq!(der[0], 0xA0);
        assert!(Attributes::default().to_der_set(0xA0).unwrap().is_none());
    }
}
