//! Certificates and revocation data found in signatures and timestamps.

use bcder::{decode, encode, Captured, Mode, Oid, Tag};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use log::warn;
use crate::cms::SignedData;
use crate::crypto::{DigestAlgorithm, MessageDigest};
use crate::der::{self, EncodingError, Tlv};
use crate::error;
use crate::oid;
use crate::timestamp::reference::{Identifier, IdentifierKind};
use crate::x509::Time;


//------------ Token ---------------------------------------------------------

/// An encoded object that can be referenced by its digest.
pub trait Token {
    /// Returns the identifier of the token.
    fn id(&self) -> &Identifier;

    /// Returns the encoding the digests of the token are calculated over.
    fn encoded(&self) -> &Bytes;

    /// Returns the digest of the token using the given algorithm.
    fn digest(&self, algorithm: DigestAlgorithm) -> MessageDigest {
        algorithm.message_digest(self.encoded())
    }
}


//------------ CertificateToken ----------------------------------------------

/// An encoded certificate.
#[derive(Clone, Debug)]
pub struct CertificateToken {
    encoded: Bytes,
    id: Identifier,
}

impl CertificateToken {
    /// Creates a certificate token from an encoded certificate.
    ///
    /// The certificate is kept in its DER encoding.
    pub fn from_tlv(tlv: &Tlv) -> Result<Self, EncodingError> {
        if tlv.tag() != [0x30] {
            return Err(EncodingError::new("certificate is not a sequence"))
        }
        let encoded = Bytes::from(tlv.to_der()?);
        Ok(CertificateToken {
            id: Identifier::new(IdentifierKind::Certificate, &encoded),
            encoded
        })
    }
}

impl Token for CertificateToken {
    fn id(&self) -> &Identifier {
        &self.id
    }

    fn encoded(&self) -> &Bytes {
        &self.encoded
    }
}


//------------ CrlBinary -----------------------------------------------------

/// An encoded certificate revocation list.
#[derive(Clone, Debug)]
pub struct CrlBinary {
    encoded: Bytes,
    id: Identifier,
}

impl CrlBinary {
    pub fn from_tlv(tlv: &Tlv) -> Result<Self, EncodingError> {
        if tlv.tag() != [0x30] {
            return Err(EncodingError::new("CRL is not a sequence"))
        }
        let encoded = Bytes::from(tlv.to_der()?);
        Ok(CrlBinary {
            id: Identifier::new(IdentifierKind::Revocation, &encoded),
            encoded
        })
    }
}

impl Token for CrlBinary {
    fn id(&self) -> &Identifier {
        &self.id
    }

    fn encoded(&self) -> &Bytes {
        &self.encoded
    }
}


//------------ OcspResponseBinary --------------------------------------------

/// An encoded basic OCSP response.
///
/// ```txt
/// BasicOCSPResponse ::= SEQUENCE {
///     tbsResponseData      ResponseData,
///     signatureAlgorithm   AlgorithmIdentifier,
///     signature            BIT STRING,
///     certs            [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL }
///
/// ResponseData ::= SEQUENCE {
///     version              [0] EXPLICIT Version DEFAULT v1,
///     responderID              ResponderID,
///     producedAt               GeneralizedTime,
///     responses                SEQUENCE OF SingleResponse,
///     responseExtensions   [1] EXPLICIT Extensions OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct OcspResponseBinary {
    /// The DER encoded basic OCSP response.
    encoded: Bytes,

    /// The basic OCSP response ready for re-encoding.
    captured: Captured,

    /// The format identifier used when embedding the response in CMS.
    format: Oid<Bytes>,

    produced_at: Time,
    certificates: Vec<CertificateToken>,
    id: Identifier,
}

impl OcspResponseBinary {
    /// Creates a value from an encoded basic OCSP response.
    pub fn from_basic_response(
        tlv: &Tlv, format: Oid<Bytes>
    ) -> Result<Self, error::DecodeError> {
        let encoded = Bytes::from(tlv.to_der().map_err(|err| {
            error::DecodeError::content(err, Default::default())
        })?);
        let (produced_at, certificates) = Mode::Der.decode(
            encoded.clone(), Self::take_basic_response
        )?;
        let captured = Mode::Der.decode(
            encoded.clone(), |cons| cons.capture_one()
        )?;
        Ok(OcspResponseBinary {
            id: Identifier::new(IdentifierKind::Revocation, &encoded),
            encoded, captured, format, produced_at, certificates
        })
    }

    /// Creates a value from an `OtherRevocationInfoFormat` of signed data.
    ///
    /// ```txt
    /// OtherRevocationInfoFormat ::= SEQUENCE {
    ///     otherRevInfoFormat OBJECT IDENTIFIER,
    ///     otherRevInfo ANY DEFINED BY otherRevInfoFormat }
    /// ```
    ///
    /// Returns `Ok(None)` if the format is not an OCSP response.
    pub fn from_other_revocation_info(
        tlv: &Tlv
    ) -> Result<Option<Self>, error::DecodeError> {
        let (format, info) = Mode::Ber.decode(tlv.content().clone(), |cons| {
            Ok((Oid::take_from(cons)?, Tlv::capture_from(cons)?))
        })?;
        if format == oid::PKIX_OCSP_BASIC {
            Self::from_basic_response(&info, format).map(Some)
        }
        else if format == oid::RI_OCSP_RESPONSE {
            let basic = Self::basic_from_ocsp_response(&info)?;
            Self::from_basic_response(&basic, format).map(Some)
        }
        else {
            Ok(None)
        }
    }

    /// Extracts the basic response from a complete OCSP response.
    ///
    /// ```txt
    /// OCSPResponse ::= SEQUENCE {
    ///     responseStatus         OCSPResponseStatus,
    ///     responseBytes      [0] EXPLICIT ResponseBytes OPTIONAL }
    ///
    /// ResponseBytes ::= SEQUENCE {
    ///     responseType   OBJECT IDENTIFIER,
    ///     response       OCTET STRING }
    /// ```
    fn basic_from_ocsp_response(
        tlv: &Tlv
    ) -> Result<Tlv, error::DecodeError> {
        let response = Mode::Ber.decode(tlv.raw().clone(), |cons| {
            cons.take_sequence(|cons| {
                cons.skip_one()?; // responseStatus
                cons.take_constructed_if(Tag::CTX_0, |cons| {
                    cons.take_sequence(|cons| {
                        oid::PKIX_OCSP_BASIC.skip_if(cons)?;
                        Ok(bcder::OctetString::take_from(cons)?.into_bytes())
                    })
                })
            })
        })?;
        Tlv::parse(response).map_err(|err| {
            error::DecodeError::content(err, Default::default())
        })
    }

    fn take_basic_response<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<(Time, Vec<CertificateToken>), decode::DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let produced_at = cons.take_sequence(|cons| {
                cons.take_opt_constructed_if(
                    Tag::CTX_0, der::skip_remaining
                )?;
                cons.skip_one()?; // responderID
                let res = Time::take_generalized_from(cons)?;
                der::skip_remaining(cons)?;
                Ok(res)
            })?;
            cons.skip_one()?; // signatureAlgorithm
            cons.skip_one()?; // signature
            let certificates = cons.take_opt_constructed_if(
                Tag::CTX_0, |cons| {
                    let certs = Tlv::capture_from(cons)?;
                    certs.children().and_then(|certs| {
                        certs.iter().map(
                            CertificateToken::from_tlv
                        ).collect::<Result<Vec<_>, _>>()
                    }).map_err(|err| cons.content_err(err))
                }
            )?.unwrap_or_default();
            Ok((produced_at, certificates))
        })
    }

    pub fn format(&self) -> &Oid<Bytes> {
        &self.format
    }

    /// Returns the time the response was produced at.
    pub fn produced_at(&self) -> Time {
        self.produced_at
    }

    /// Returns the certificates included in the response.
    pub fn certificates(&self) -> &[CertificateToken] {
        &self.certificates
    }

    /// Returns the response as it appears in a signed data’s crls set.
    ///
    /// This is the `OtherRevocationInfoFormat` with the format identifier
    /// and the basic response, implicitly tagged with `[1]` and DER encoded.
    pub fn revocation_info_choice(&self) -> Captured {
        encode::sequence_as(
            Tag::CTX_1, (self.format.encode_ref(), &self.captured)
        ).to_captured(Mode::Der)
    }
}

impl Token for OcspResponseBinary {
    fn id(&self) -> &Identifier {
        &self.id
    }

    fn encoded(&self) -> &Bytes {
        &self.encoded
    }
}


//------------ TokenSource ---------------------------------------------------

/// A collection of tokens.
///
/// Each token is present only once. The tokens keep the order in which they
/// were added.
#[derive(Clone, Debug)]
pub struct TokenSource<T> {
    tokens: Vec<T>,
}

pub type CertificateSource = TokenSource<CertificateToken>;
pub type CrlSource = TokenSource<CrlBinary>;
pub type OcspSource = TokenSource<OcspResponseBinary>;

impl<T> Default for TokenSource<T> {
    fn default() -> Self {
        TokenSource { tokens: Vec::new() }
    }
}

impl<T: Token + Clone> TokenSource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token unless a token with the same identifier is present.
    pub fn add(&mut self, token: T) {
        if !self.contains(token.id()) {
            self.tokens.push(token)
        }
    }

    /// Adds all tokens of another source.
    pub fn merge(&mut self, other: &Self) {
        for token in &other.tokens {
            self.add(token.clone())
        }
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.tokens.iter().any(|token| token.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.tokens.iter()
    }

    /// Returns the token with the given digest.
    pub fn find_by_digest(&self, digest: &MessageDigest) -> Option<&T> {
        let algorithm = digest.algorithm()?;
        self.tokens.iter().find(|token| {
            token.digest(algorithm).matches(digest)
        })
    }
}

impl<T: Token + Clone> Extend<T> for TokenSource<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        iter.into_iter().for_each(|token| self.add(token))
    }
}

impl OcspSource {
    /// Returns the response produced at the given time.
    pub fn find_by_produced_at(
        &self, produced_at: Time
    ) -> Option<&OcspResponseBinary> {
        self.tokens.iter().find(|token| token.produced_at() == produced_at)
    }
}


//------------ Sources -------------------------------------------------------

/// The certificates and revocation data of a signature or timestamp.
#[derive(Clone, Debug, Default)]
pub struct Sources {
    pub certificates: CertificateSource,
    pub crls: CrlSource,
    pub ocsp: OcspSource,
}

impl Sources {
    /// Collects the tokens from the certificates and crls sets.
    ///
    /// Entries that cannot be decoded are skipped with a warning.
    pub fn from_signed_data(signed_data: &SignedData) -> Self {
        let mut res = Self::default();
        if let Some(certs) = signed_data.certificates() {
            for item in certs.items() {
                // Other certificate choices are implicitly tagged.
                if item.tag() != [0x30] {
                    continue
                }
                match CertificateToken::from_tlv(item) {
                    Ok(cert) => res.certificates.add(cert),
                    Err(err) => {
                        warn!("Skipping malformed certificate: {}", err)
                    }
                }
            }
        }
        if let Some(crls) = signed_data.crls() {
            for item in crls.items() {
                res.add_revocation_info_choice(item)
            }
        }
        res
    }

    fn add_revocation_info_choice(&mut self, item: &Tlv) {
        match item.tag() {
            [0x30] => {
                match CrlBinary::from_tlv(item) {
                    Ok(crl) => self.crls.add(crl),
                    Err(err) => warn!("Skipping malformed CRL: {}", err),
                }
            }
            [0xA1] => {
                match OcspResponseBinary::from_other_revocation_info(item) {
                    Ok(Some(ocsp)) => self.add_ocsp(ocsp),
                    Ok(None) => { }
                    Err(err) => {
                        warn!("Skipping malformed OCSP response: {}", err)
                    }
                }
            }
            _ => { }
        }
    }

    /// Adds an OCSP response and the certificates it contains.
    pub fn add_ocsp(&mut self, ocsp: OcspResponseBinary) {
        self.certificates.extend(ocsp.certificates().iter().cloned());
        self.ocsp.add(ocsp)
    }

    /// Adds all tokens of another collection.
    pub fn merge(&mut self, other: &Sources) {
        self.certificates.merge(&other.certificates);
        self.crls.merge(&other.crls);
        self.ocsp.merge(&other.ocsp);
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::test;

    #[test]
    fn certificate_tokens() {
        let der = test::certificate("leaf");
        let tlv = Tlv::parse(Bytes::from(der.clone())).unwrap();
        let cert = CertificateToken::from_tlv(&tlv).unwrap();
        assert_eq!(cert.encoded().as_ref(), der.as_slice());
        assert_eq!(
            cert.id(), &Identifier::new(IdentifierKind::Certificate, &der)
        );

        let mut source = CertificateSource::new();
        source.add(cert.clone());
        source.add(cert.clone());
        assert_eq!(source.len(), 1);
        assert!(source.find_by_digest(
            &DigestAlgorithm::Sha1.message_digest(&der)
        ).is_some());
        assert!(source.find_by_digest(
            &DigestAlgorithm::Sha256.message_digest(b"other")
        ).is_none());
        assert!(source.find_by_digest(&MessageDigest::empty()).is_none());
    }

    #[test]
    fn ocsp_responses() {
        let basic = test::basic_ocsp_response(
            Time::utc(2023, 1, 2, 3, 4, 5), &[test::certificate("responder")]
        );
        let choice = test::other_revocation_info(&basic);
        let tlv = Tlv::parse(Bytes::from(choice.clone())).unwrap();
        let ocsp = OcspResponseBinary::from_other_revocation_info(
            &tlv
        ).unwrap().unwrap();
        assert_eq!(ocsp.encoded().as_ref(), basic.as_slice());
        assert_eq!(ocsp.produced_at(), Time::utc(2023, 1, 2, 3, 4, 5));
        assert_eq!(ocsp.certificates().len(), 1);
        assert_eq!(ocsp.revocation_info_choice().as_slice(), choice.as_slice());

        let mut sources = Sources::default();
        sources.add_ocsp(ocsp);
        assert_eq!(sources.certificates.len(), 1);
        assert!(sources.ocsp.find_by_produced_at(
            Time::utc(2023, 1, 2, 3, 4, 5)
        ).is_some());
    }

    #[test]
    fn sources_from_signed_data() {
        let basic = test::basic_ocsp_response(
            Time::utc(2023, 1, 2, 3, 4, 5), &[]
        );
        let data = test::SignedDataBuilder::new()
            .certificate(test::certificate("one"))
            .certificate(test::certificate("two"))
            .crl(test::crl("crl"))
            .crl(test::other_revocation_info(&basic))
            .signer_info(test::SignerInfoBuilder::new(b"sig").build())
            .build();
        let signed = SignedData::decode(Bytes::from(data), false).unwrap();
        let sources = Sources::from_signed_data(&signed);
        assert_eq!(sources.certificates.len(), 2);
        assert_eq!(sources.crls.len(), 1);
        assert_eq!(sources.ocsp.len(), 1);

        let mut merged = Sources::default();
        merged.merge(&sources);
        merged.merge(&sources);
        assert_eq!(merged.certificates.len(), 2);
    }
}
