//! References to and values of validation data in CAdES attributes.
//!
//! The attributes parsed here are defined in RFC 5126 and ETSI TS 101 733.
//! Certificate and revocation references identify validation data by the
//! digest of its encoding. Certificate and revocation values include the
//! data itself.

use bcder::{decode, Mode, OctetString, Tag};
use bcder::decode::DecodeError;
use crate::crypto::{DigestAlgorithm, MessageDigest};
use crate::der::{self, Tlv};
use crate::error;
use crate::x509::Time;


//------------ CertificateRef ------------------------------------------------

/// A reference to a certificate by its digest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateRef {
    digest: MessageDigest,
}

impl CertificateRef {
    pub fn new(digest: MessageDigest) -> Self {
        CertificateRef { digest }
    }

    pub fn digest(&self) -> &MessageDigest {
        &self.digest
    }

    /// Parses the value of a complete-certificate-references attribute.
    ///
    /// ```txt
    /// CompleteCertificateRefs ::= SEQUENCE OF OtherCertID
    ///
    /// OtherCertID ::= SEQUENCE {
    ///     otherCertHash            OtherHash,
    ///     issuerSerial             IssuerSerial OPTIONAL }
    /// ```
    ///
    /// This is also used for attribute-certificate-references.
    pub fn from_complete_refs(
        value: &Tlv
    ) -> Result<Vec<Self>, error::DecodeError> {
        Mode::Ber.decode(value.raw().clone(), |cons| {
            cons.take_sequence(|cons| {
                let mut res = Vec::new();
                while let Some(item) = cons.take_opt_sequence(|cons| {
                    let digest = take_other_hash(cons)?;
                    der::skip_remaining(cons)?; // issuerSerial
                    Ok(CertificateRef::new(digest))
                })? {
                    res.push(item)
                }
                Ok(res)
            })
        })
    }

    /// Parses the value of a signing-certificate attribute.
    ///
    /// ```txt
    /// SigningCertificate ::=  SEQUENCE {
    ///     certs        SEQUENCE OF ESSCertID,
    ///     policies     SEQUENCE OF PolicyInformation OPTIONAL }
    ///
    /// ESSCertID ::=  SEQUENCE {
    ///      certHash                 Hash,
    ///      issuerSerial             IssuerSerial OPTIONAL }
    /// ```
    ///
    /// The hash is always a SHA-1 digest.
    pub fn from_signing_certificate(
        value: &Tlv
    ) -> Result<Vec<Self>, error::DecodeError> {
        Self::take_signing_certificate(value, false)
    }

    /// Parses the value of a signing-certificate-v2 attribute.
    ///
    /// ```txt
    /// SigningCertificateV2 ::=  SEQUENCE {
    ///     certs        SEQUENCE OF ESSCertIDv2,
    ///     policies     SEQUENCE OF PolicyInformation OPTIONAL }
    ///
    /// ESSCertIDv2 ::=  SEQUENCE {
    ///     hashAlgorithm           AlgorithmIdentifier
    ///                                 DEFAULT {algorithm id-sha256},
    ///     certHash                Hash,
    ///     issuerSerial            IssuerSerial OPTIONAL }
    /// ```
    pub fn from_signing_certificate_v2(
        value: &Tlv
    ) -> Result<Vec<Self>, error::DecodeError> {
        Self::take_signing_certificate(value, true)
    }

    fn take_signing_certificate(
        value: &Tlv, v2: bool
    ) -> Result<Vec<Self>, error::DecodeError> {
        Mode::Ber.decode(value.raw().clone(), |cons| {
            cons.take_sequence(|cons| {
                let res = cons.take_sequence(|cons| {
                    let mut res = Vec::new();
                    while let Some(item) = cons.take_opt_sequence(|cons| {
                        Self::take_ess_cert_id(cons, v2)
                    })? {
                        res.push(item)
                    }
                    Ok(res)
                })?;
                der::skip_remaining(cons)?; // policies
                Ok(res)
            })
        })
    }

    /// Parses the content of an `ESSCertID` or `ESSCertIDv2`.
    fn take_ess_cert_id<S: decode::Source>(
        cons: &mut decode::Constructed<S>, v2: bool,
    ) -> Result<Self, DecodeError<S::Error>> {
        let alg = if v2 {
            DigestAlgorithm::take_opt_from(cons)?.unwrap_or(
                DigestAlgorithm::Sha256
            )
        }
        else {
            DigestAlgorithm::Sha1
        };
        let value = OctetString::take_from(cons)?.into_bytes();
        der::skip_remaining(cons)?; // issuerSerial
        Ok(CertificateRef::new(MessageDigest::new(alg, value)))
    }
}


//------------ RevocationRef -------------------------------------------------

/// A reference to a CRL or an OCSP response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RevocationRef {
    /// A CRL identified by its digest.
    Crl(MessageDigest),

    /// An OCSP response.
    ///
    /// The digest is optional. Without it, the response can only be
    /// identified by the time it was produced.
    Ocsp {
        digest: Option<MessageDigest>,
        produced_at: Time,
    },
}

impl RevocationRef {
    /// Parses the value of a complete-revocation-references attribute.
    ///
    /// ```txt
    /// CompleteRevocationRefs ::=  SEQUENCE OF CrlOcspRef
    ///
    /// CrlOcspRef ::= SEQUENCE {
    ///     crlids      [0] CRLListID   OPTIONAL,
    ///     ocspids     [1] OcspListID  OPTIONAL,
    ///     otherRev    [2] OtherRevRefs OPTIONAL }
    ///
    /// CRLListID ::=  SEQUENCE {
    ///     crls        SEQUENCE OF CrlValidatedID }
    ///
    /// CrlValidatedID ::=  SEQUENCE {
    ///     crlHash                   OtherHash,
    ///     crlIdentifier             CrlIdentifier OPTIONAL }
    ///
    /// OcspListID ::=  SEQUENCE {
    ///     ocspResponses        SEQUENCE OF OcspResponsesID }
    ///
    /// OcspResponsesID ::=  SEQUENCE {
    ///     ocspIdentifier              OcspIdentifier,
    ///     ocspRepHash                 OtherHash    OPTIONAL }
    ///
    /// OcspIdentifier ::= SEQUENCE {
    ///     ocspResponderID      ResponderID,
    ///     producedAt           GeneralizedTime }
    /// ```
    ///
    /// The tags are explicit as the module uses explicit tagging. This is
    /// also used for attribute-revocation-references.
    pub fn from_complete_refs(
        value: &Tlv
    ) -> Result<Vec<Self>, error::DecodeError> {
        Mode::Ber.decode(value.raw().clone(), |cons| {
            cons.take_sequence(|cons| {
                let mut res = Vec::new();
                while let Some(()) = cons.take_opt_sequence(|cons| {
                    Self::take_crl_ocsp_ref(cons, &mut res)
                })? { }
                Ok(res)
            })
        })
    }

    fn take_crl_ocsp_ref<S: decode::Source>(
        cons: &mut decode::Constructed<S>, res: &mut Vec<Self>,
    ) -> Result<(), DecodeError<S::Error>> {
        cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
            cons.take_sequence(|cons| {
                cons.take_sequence(|cons| {
                    while let Some(digest) = cons.take_opt_sequence(|cons| {
                        let digest = take_other_hash(cons)?;
                        der::skip_remaining(cons)?; // crlIdentifier
                        Ok(digest)
                    })? {
                        res.push(RevocationRef::Crl(digest))
                    }
                    Ok(())
                })
            })
        })?;
        cons.take_opt_constructed_if(Tag::CTX_1, |cons| {
            cons.take_sequence(|cons| {
                cons.take_sequence(|cons| {
                    while let Some(item) = cons.take_opt_sequence(|cons| {
                        let produced_at = cons.take_sequence(|cons| {
                            cons.skip_one()?; // ocspResponderID
                            Time::take_generalized_from(cons)
                        })?;
                        let digest = take_opt_other_hash(cons)?;
                        Ok(RevocationRef::Ocsp { digest, produced_at })
                    })? {
                        res.push(item)
                    }
                    Ok(())
                })
            })
        })?;
        der::skip_remaining(cons) // otherRev
    }

    pub fn digest(&self) -> Option<&MessageDigest> {
        match *self {
            RevocationRef::Crl(ref digest) => Some(digest),
            RevocationRef::Ocsp { ref digest, .. } => digest.as_ref(),
        }
    }
}


//------------ Values --------------------------------------------------------

/// Returns the certificates of a certificate-values attribute.
///
/// ```txt
/// CertificateValues ::=  SEQUENCE OF Certificate
/// ```
pub fn certificate_values(value: &Tlv) -> Result<Vec<Tlv>, error::DecodeError> {
    if value.tag() != [0x30] {
        return Err(content_err("certificate values are not a sequence"))
    }
    value.children().map_err(|err| {
        error::DecodeError::content(err, Default::default())
    })
}

/// The content of a revocation-values attribute.
///
/// ```txt
/// RevocationValues ::=  SEQUENCE {
///     crlVals          [0] SEQUENCE OF CertificateList OPTIONAL,
///     ocspVals         [1] SEQUENCE OF BasicOCSPResponse OPTIONAL,
///     otherRevVals     [2] OtherRevVals OPTIONAL }
/// ```
#[derive(Clone, Debug, Default)]
pub struct RevocationValues {
    pub crls: Vec<Tlv>,
    pub ocsp: Vec<Tlv>,
}

impl RevocationValues {
    pub fn from_tlv(value: &Tlv) -> Result<Self, error::DecodeError> {
        if value.tag() != [0x30] {
            return Err(content_err("revocation values are not a sequence"))
        }
        let mut res = RevocationValues::default();
        for item in children(value)? {
            let target = match item.tag() {
                [0xA0] => &mut res.crls,
                [0xA1] => &mut res.ocsp,
                _ => continue,
            };
            for list in children(&item)? {
                target.extend(children(&list)?)
            }
        }
        Ok(res)
    }
}


//------------ Helpers -------------------------------------------------------

/// Takes an `OtherHash` value.
///
/// ```txt
/// OtherHash ::= CHOICE {
///     sha1Hash OtherHashValue,  -- This contains a SHA-1 hash
///     otherHash OtherHashAlgAndValue }
///
/// OtherHashAlgAndValue ::= SEQUENCE {
///     hashAlgorithm   AlgorithmIdentifier,
///     hashValue       OtherHashValue }
/// ```
fn take_other_hash<S: decode::Source>(
    cons: &mut decode::Constructed<S>
) -> Result<MessageDigest, DecodeError<S::Error>> {
    take_opt_other_hash(cons)?.ok_or_else(|| {
        cons.content_err("missing hash value")
    })
}

fn take_opt_other_hash<S: decode::Source>(
    cons: &mut decode::Constructed<S>
) -> Result<Option<MessageDigest>, DecodeError<S::Error>> {
    if let Some(res) = cons.take_opt_sequence(|cons| {
        let alg = DigestAlgorithm::take_from(cons)?;
        let value = OctetString::take_from(cons)?.into_bytes();
        Ok(MessageDigest::new(alg, value))
    })? {
        return Ok(Some(res))
    }
    Ok(OctetString::take_opt_from(cons)?.map(|value| {
        MessageDigest::new(DigestAlgorithm::Sha1, value.into_bytes())
    }))
}

fn children(value: &Tlv) -> Result<Vec<Tlv>, error::DecodeError> {
    value.children().map_err(|err| {
        error::DecodeError::content(err, Default::default())
    })
}

fn content_err(msg: &'static str) -> error::DecodeError {
    error::DecodeError::content(msg, Default::default())
}


//============ Tests =========================================================
