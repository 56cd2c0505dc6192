//! CMS signed data.

use bcder::{decode, Mode, OctetString, Oid, Tag};
use bcder::decode::DecodeError;
use bytes::Bytes;
use crate::der::{self, EncodingError, Tlv};
use crate::error;
use crate::oid;
use super::signer_info::SignerInfo;


//------------ SignedData ----------------------------------------------------

/// A CMS signed data value wrapped into a content info.
///
/// ```txt
/// ContentInfo ::= SEQUENCE {
///     contentType ContentType,
///     content [0] EXPLICIT ANY DEFINED BY contentType }
///
/// SignedData ::= SEQUENCE {
///     version CMSVersion,
///     digestAlgorithms DigestAlgorithmIdentifiers,
///     encapContentInfo EncapsulatedContentInfo,
///     certificates [0] IMPLICIT CertificateSet OPTIONAL,
///     crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///     signerInfos SignerInfos }
/// ```
///
/// Both CAdES signatures and RFC 3161 timestamp tokens are signed data
/// values. Only the parts needed for processing timestamps are decoded,
/// everything is kept in its original encoding.
#[derive(Clone, Debug)]
pub struct SignedData {
    raw: Tlv,
    encap_content_info: EncapContentInfo,
    certificates: Option<EncodedSet>,
    crls: Option<EncodedSet>,
    signer_infos: Vec<SignerInfo>,
}

impl SignedData {
    /// Decodes a signed data value from its encoded content info.
    ///
    /// If `strict` is `true`, the data must be DER encoded.
    pub fn decode(
        source: Bytes, strict: bool
    ) -> Result<Self, error::DecodeError> {
        if strict { Mode::Der }
        else { Mode::Ber }
            .decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let raw = Tlv::capture_from(cons)?;
        Mode::Ber.decode(raw.raw().clone(), |cons| {
            cons.take_sequence(|cons| {
                oid::SIGNED_DATA.skip_if(cons)?; // contentType
                cons.take_constructed_if(Tag::CTX_0, |cons| {
                    Self::take_signed_data(cons, raw)
                })
            })
        }).map_err(DecodeError::convert)
    }

    fn take_signed_data<S: decode::Source>(
        cons: &mut decode::Constructed<S>, raw: Tlv,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.skip_one()?; // version
            cons.take_set(der::skip_remaining)?; // digestAlgorithms
            let encap_content_info = EncapContentInfo::take_from(cons)?;
            let certificates = EncodedSet::take_opt_from(cons, Tag::CTX_0)?;
            let crls = EncodedSet::take_opt_from(cons, Tag::CTX_1)?;
            let infos = Tlv::capture_from(cons)?;
            if infos.tag() != [0x31] {
                return Err(cons.content_err("expected signer infos"))
            }
            let signer_infos = infos.children().map_err(|err| {
                cons.content_err(err)
            })?.into_iter().map(|info| {
                SignerInfo::from_tlv(info).map_err(DecodeError::convert)
            }).collect::<Result<Vec<_>, _>>()?;
            Ok(SignedData {
                raw, encap_content_info, certificates, crls, signer_infos
            })
        })
    }

    /// Returns the content info as it was originally encoded.
    pub fn raw(&self) -> &Tlv {
        &self.raw
    }

    pub fn encap_content_info(&self) -> &EncapContentInfo {
        &self.encap_content_info
    }

    /// Returns the certificates set if it was present.
    pub fn certificates(&self) -> Option<&EncodedSet> {
        self.certificates.as_ref()
    }

    /// Returns the revocation information set if it was present.
    pub fn crls(&self) -> Option<&EncodedSet> {
        self.crls.as_ref()
    }

    pub fn signer_infos(&self) -> &[SignerInfo] {
        &self.signer_infos
    }
}


//------------ EncapContentInfo ----------------------------------------------

/// The encapsulated content of a signed data value.
///
/// ```txt
/// EncapsulatedContentInfo ::= SEQUENCE {
///     eContentType ContentType,
///     eContent [0] EXPLICIT OCTET STRING OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct EncapContentInfo {
    raw: Tlv,
    content_type: Oid<Bytes>,
    content: Option<Bytes>,

    /// Whether the content octet string used the constructed form.
    constructed_content: bool,
}

impl EncapContentInfo {
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let raw = Tlv::capture_from(cons)?;
        Self::from_tlv(raw).map_err(DecodeError::convert)
    }

    fn from_tlv(raw: Tlv) -> Result<Self, error::DecodeError> {
        Mode::Ber.decode(raw.raw().clone(), |cons| {
            cons.take_sequence(|cons| {
                let content_type = Oid::take_from(cons)?;
                let content = cons.take_opt_constructed_if(
                    Tag::CTX_0, Tlv::capture_from
                )?;
                let (content, constructed_content) = match content {
                    Some(content) => {
                        if content.tag()[0] & !0x20 != 0x04 {
                            return Err(cons.content_err(
                                "encapsulated content is not an octet string"
                            ))
                        }
                        let constructed = content.is_constructed();
                        let octets = Mode::Ber.decode(
                            content.raw().clone(), OctetString::take_from
                        )?.into_bytes();
                        (Some(octets), constructed)
                    }
                    None => (None, false)
                };
                Ok(EncapContentInfo {
                    raw, content_type, content, constructed_content
                })
            })
        })
    }

    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    /// Returns the encapsulated content.
    ///
    /// Returns `None` if the signature is detached.
    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn is_detached(&self) -> bool {
        self.content.is_none()
    }

    /// Returns the DER encoded content type.
    pub fn content_type_der(&self) -> Vec<u8> {
        let mut res = Vec::new();
        der::write_header(&mut res, &[0x06], self.content_type.0.len());
        res.extend_from_slice(self.content_type.0.as_ref());
        res
    }

    /// Returns the re-encoded content info.
    ///
    /// If the content was encoded as a constructed octet string, the value
    /// is encoded in BER with indefinite lengths throughout. Otherwise it is
    /// encoded in DER.
    pub fn encoded(&self) -> Result<Vec<u8>, EncodingError> {
        if self.constructed_content {
            self.raw.to_indefinite_ber()
        }
        else {
            self.raw.to_der()
        }
    }
}


//------------ EncodedSet ----------------------------------------------------

/// The implicitly tagged certificates or revocation information set.
#[derive(Clone, Debug)]
pub struct EncodedSet {
    raw: Tlv,
    items: Vec<Tlv>,
}

impl EncodedSet {
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>, tag: Tag,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        let raw = match Tlv::capture_opt_constructed_from(cons, tag)? {
            Some(raw) => raw,
            None => return Ok(None)
        };
        let items = raw.children().map_err(|err| cons.content_err(err))?;
        Ok(Some(EncodedSet { raw, items }))
    }

    /// Returns the elements of the set in their original order.
    pub fn items(&self) -> &[Tlv] {
        &self.items
    }

    /// Returns whether the set used the indefinite length form.
    pub fn is_ber(&self) -> bool {
        self.raw.is_indefinite()
    }

    /// Appends the tagged set in the encoding it had originally.
    ///
    /// A set with indefinite length keeps that form and its elements are
    /// copied as they are. Otherwise the elements are re-encoded in DER,
    /// keeping their original order.
    pub fn write_tagged(
        &self, target: &mut Vec<u8>
    ) -> Result<(), EncodingError> {
        if self.is_ber() {
            target.extend_from_slice(self.raw.tag());
            target.push(0x80);
            self.items.iter().for_each(|item| {
                target.extend_from_slice(item.raw())
            });
            target.extend_from_slice(&[0, 0]);
        }
        else {
            let mut content = Vec::new();
            for item in &self.items {
                item.write_der(&mut content)?;
            }
            der::write_header(target, self.raw.tag(), content.len());
            target.extend_from_slice(&content);
        }
        Ok(())
    }
}


//============ Tests =========================================================
