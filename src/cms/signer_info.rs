//! Signer infos.

use std::io;
use bcder::{decode, Mode, OctetString, Tag};
use bcder::decode::DecodeError;
use bytes::Bytes;
use crate::der::{self, EncodingError, Tlv};
use crate::error;
use super::attr::Attributes;


//------------ SignerInfo ----------------------------------------------------

/// The information about a single signer of a signed data value.
///
/// ```txt
/// SignerInfo ::= SEQUENCE {
///     version CMSVersion,
///     sid SignerIdentifier,
///     digestAlgorithm DigestAlgorithmIdentifier,
///     signedAttrs [0] IMPLICIT SignedAttributes OPTIONAL,
///     signatureAlgorithm SignatureAlgorithmIdentifier,
///     signature SignatureValue,
///     unsignedAttrs [1] IMPLICIT UnsignedAttributes OPTIONAL }
/// ```
///
/// Besides the signed and unsigned attributes, the fields are kept in their
/// encoded form only. They are needed to re-encode the signer info when
/// calculating the message imprints of archive timestamps.
#[derive(Clone, Debug)]
pub struct SignerInfo {
    raw: Tlv,
    version: Tlv,
    sid: Tlv,
    digest_algorithm: Tlv,
    signed_attrs: Attributes,
    signature_algorithm: Tlv,
    signature: Bytes,
    unsigned_attrs: Attributes,
}

impl SignerInfo {
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let raw = Tlv::capture_from(cons)?;
        Self::from_tlv(raw).map_err(DecodeError::convert)
    }

    /// Decodes a signer info from its encoded form.
    pub fn from_tlv(raw: Tlv) -> Result<Self, error::DecodeError> {
        let source = raw.raw().clone();
        Mode::Ber.decode(source, |cons| {
            cons.take_sequence(|cons| {
                let version = Tlv::capture_from(cons)?;
                let sid = Tlv::capture_from(cons)?;
                let digest_algorithm = Tlv::capture_from(cons)?;
                let signed_attrs = Attributes::take_opt_from(
                    cons, Tag::CTX_0
                )?;
                let signature_algorithm = Tlv::capture_from(cons)?;
                let signature = OctetString::take_from(cons)?.into_bytes();
                let unsigned_attrs = Attributes::take_opt_from(
                    cons, Tag::CTX_1
                )?;
                Ok(SignerInfo {
                    raw,
                    version,
                    sid,
                    digest_algorithm,
                    signed_attrs,
                    signature_algorithm,
                    signature,
                    unsigned_attrs,
                })
            })
        })
    }

    /// Returns the signer info as it was originally encoded.
    pub fn raw(&self) -> &Tlv {
        &self.raw
    }

    pub fn signed_attrs(&self) -> &Attributes {
        &self.signed_attrs
    }

    pub fn unsigned_attrs(&self) -> &Attributes {
        &self.unsigned_attrs
    }

    /// Returns the content of the signature value.
    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Returns the encoded signer identifier.
    pub fn sid(&self) -> &Tlv {
        &self.sid
    }

    /// Returns the DER encoding of the complete signer info.
    pub fn to_der(&self) -> Result<Vec<u8>, EncodingError> {
        self.raw.to_der()
    }

    /// Writes the DER encoded fields covered by the signature.
    ///
    /// These are all fields except the unsigned attributes, each DER
    /// encoded, without the outer sequence. The signed attributes are
    /// written as a DER encoded set with their context specific tag.
    pub fn write_signed_fields<W: io::Write>(
        &self, target: &mut W
    ) -> Result<(), error::MessageImprintError> {
        let mut buf = Vec::new();
        self.version.write_der(&mut buf)?;
        self.sid.write_der(&mut buf)?;
        self.digest_algorithm.write_der(&mut buf)?;
        if let Some(attrs) = self.signed_attrs.to_der_set(0xA0)? {
            buf.extend_from_slice(&attrs);
        }
        self.signature_algorithm.write_der(&mut buf)?;
        der::write_header(&mut buf, &[0x04], self.signature.len());
        buf.extend_from_slice(self.signature.as_ref());
        target.write_all(&buf)?;
        Ok(())
    }
}


//============ Tests =========================================================
