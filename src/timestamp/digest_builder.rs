//! Building the message imprints of timestamps.
//!
//! A timestamp token contains a digest of the data it covers, its message
//! imprint. Which data this is depends on the type of timestamp. This
//! module reconstructs the data for each type from a signature so it can be
//! compared to the message imprint.
//!
//! There are two variants. [`TimestampDataBuilder`] produces the data
//! itself. [`CadesMessageDigestBuilder`] produces its digest using the
//! algorithm of a timestamp token and is what is used when validating
//! timestamps. Both share the same functions writing the data which
//! can write into anything implementing `io::Write`.

use std::io;
use bytes::Bytes;
use log::{debug, trace, warn};
use crate::cades::{CadesSignature, CertificateSource};
use crate::cms::AttributeKind;
use crate::crypto::{Context, DigestAlgorithm, MessageDigest};
use crate::der;
use crate::error::MessageImprintError;
use crate::util::hex;
use crate::x509::Time;
use super::ats_hash_index::AtsHashIndex;
use super::token::{ArchiveTimestampType, TimestampToken, TimestampType};


//------------ Strategy ------------------------------------------------------

/// How the unsigned attributes are included in an archive timestamp v2.
///
/// ETSI TS 101 733 v1.8.3 and v2.2.1 disagree on whether the identifier
/// and length octets of the unsigned attributes set are part of the data
/// covered by an archive timestamp v2. Both forms exist in the wild.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// Include the `[1]` identifier and length octets, as of v2.2.1.
    WithTagLength,

    /// Only include the attributes themselves, as of v1.8.3.
    WithoutTagLength,
}

impl Strategy {
    /// The strategies in the order they are tried during validation.
    pub const PROBE_ORDER: [Strategy; 2] = [
        Strategy::WithTagLength, Strategy::WithoutTagLength
    ];
}


//------------ TimestampMessageDigestBuilder ---------------------------------

/// Something that produces the message digests for a timestamp.
///
/// The methods never fail. If the data can’t be determined, they log the
/// reason and return an empty message digest which will never match a
/// message imprint.
pub trait TimestampMessageDigestBuilder {
    /// Returns the digest of the signed document.
    fn content_timestamp_digest(&self) -> MessageDigest;

    /// Returns the digest of the signature value.
    fn signature_timestamp_digest(&self) -> MessageDigest;

    /// Returns the digest for a CAdES-C-time-stamp, type X1.
    fn timestamp_x1_digest(&self) -> MessageDigest;

    /// Returns the digest for a time-stamped-certs-crls-references, type X2.
    fn timestamp_x2_digest(&self) -> MessageDigest;

    /// Returns the digest for an archive timestamp.
    fn archive_timestamp_digest(&self) -> MessageDigest;
}


//------------ TimestampDataBuilder ------------------------------------------

/// Produces the data covered by the timestamps of a signature.
#[derive(Clone, Copy, Debug)]
pub struct TimestampDataBuilder<'a> {
    signature: &'a CadesSignature,

    /// All certificates of the signature and its timestamps.
    certificates: &'a CertificateSource,
}

impl<'a> TimestampDataBuilder<'a> {
    pub fn new(
        signature: &'a CadesSignature,
        certificates: &'a CertificateSource,
    ) -> Self {
        TimestampDataBuilder { signature, certificates }
    }

    pub fn signature(&self) -> &'a CadesSignature {
        self.signature
    }

    /// Returns the data covered by a content timestamp.
    pub fn content_timestamp_data(&self) -> Result<Bytes, MessageImprintError> {
        self.signature.original_document()
    }

    /// Returns the data covered by a signature timestamp.
    pub fn signature_timestamp_data(&self) -> Bytes {
        self.signature.signature_value().clone()
    }

    pub fn timestamp_x1_data(&self) -> Result<Vec<u8>, MessageImprintError> {
        let mut res = Vec::new();
        self.write_timestamp_x1_data(&mut res)?;
        Ok(res)
    }

    pub fn timestamp_x2_data(&self) -> Result<Vec<u8>, MessageImprintError> {
        let mut res = Vec::new();
        self.write_timestamp_x2_data(&mut res)?;
        Ok(res)
    }

    /// Returns the data covered by an archive timestamp.
    ///
    /// For an archive timestamp v2, `strategy` determines the encoding of
    /// the unsigned attributes. It is ignored for other versions.
    pub fn archive_timestamp_data(
        &self, token: &TimestampToken, strategy: Strategy,
    ) -> Result<Vec<u8>, MessageImprintError> {
        let mut res = Vec::new();
        match token.archive_timestamp_type() {
            Some(ArchiveTimestampType::CadesV2) => {
                self.write_archive_timestamp_v2_data(
                    token.gen_time(), strategy, &mut res
                )?;
            }
            Some(ArchiveTimestampType::CadesV3) => {
                let index = self.verified_ats_hash_index(token)?;
                self.write_archive_timestamp_v3_data(
                    &index, token.digest_algorithm(), &mut res
                )?;
            }
            _ => return Err(MessageImprintError::unsupported_archive_type())
        }
        Ok(res)
    }

    /// Returns the verified ATS-hash-index of an archive timestamp v3.
    ///
    /// See [`AtsHashIndex::verified`] for details.
    pub fn verified_ats_hash_index(
        &self, token: &TimestampToken
    ) -> Result<Vec<u8>, MessageImprintError> {
        match AtsHashIndex::from_token(token, self.signature.config())? {
            Some(index) => index.verified(self.signature, self.certificates),
            None => Err(MessageImprintError::missing_ats_hash_index())
        }
    }
}

/// # Writing the Data
///
impl<'a> TimestampDataBuilder<'a> {
    pub fn write_content_timestamp_data<W: io::Write>(
        &self, target: &mut W
    ) -> Result<(), MessageImprintError> {
        target.write_all(self.signature.original_document()?.as_ref())?;
        Ok(())
    }

    pub fn write_signature_timestamp_data<W: io::Write>(
        &self, target: &mut W
    ) -> Result<(), MessageImprintError> {
        target.write_all(self.signature.signature_value().as_ref())?;
        Ok(())
    }

    /// Writes the data of a timestamp of type X1.
    ///
    /// This is the signature value, followed by the signature timestamp
    /// attributes and the data of a type X2 timestamp. Attributes are
    /// written as their DER encoded type and values without the outer
    /// sequence.
    pub fn write_timestamp_x1_data<W: io::Write>(
        &self, target: &mut W
    ) -> Result<(), MessageImprintError> {
        target.write_all(self.signature.signature_value().as_ref())?;
        for attr in self.signature.unsigned_attrs().of_kind(
            AttributeKind::SignatureTimestamp
        ) {
            target.write_all(&attr.type_and_values_der()?)?;
        }
        self.write_timestamp_x2_data(target)
    }

    /// Writes the data of a timestamp of type X2.
    ///
    /// These are the complete-certificate-references attributes followed
    /// by the complete-revocation-references attributes. If there are none,
    /// nothing is written.
    pub fn write_timestamp_x2_data<W: io::Write>(
        &self, target: &mut W
    ) -> Result<(), MessageImprintError> {
        let attrs = self.signature.unsigned_attrs();
        for kind in [
            AttributeKind::CompleteCertificateRefs,
            AttributeKind::CompleteRevocationRefs
        ] {
            for attr in attrs.of_kind(kind) {
                target.write_all(&attr.type_and_values_der()?)?;
            }
        }
        Ok(())
    }

    /// Writes the data of an archive timestamp v2 created at `gen_time`.
    ///
    /// The data consists of the following elements of the signed data:
    ///
    /// * the encapsulated content info, in BER with indefinite lengths if
    ///   its content used the constructed form and in DER otherwise,
    /// * the detached content if the signature is detached,
    /// * the certificates and crls sets if present, in their original
    ///   encoding form,
    /// * the fields of the signer info, each DER encoded, with the unsigned
    ///   attributes encoded according to `strategy`.
    ///
    /// Archive timestamps not created strictly before `gen_time` are left
    /// out of the unsigned attributes.
    pub fn write_archive_timestamp_v2_data<W: io::Write>(
        &self, gen_time: Time, strategy: Strategy, target: &mut W
    ) -> Result<(), MessageImprintError> {
        let signed_data = self.signature.signed_data();
        let mut buf = signed_data.encap_content_info().encoded()?;
        if signed_data.encap_content_info().is_detached() {
            buf.extend_from_slice(&self.signature.signed_content()?);
        }
        if let Some(certs) = signed_data.certificates() {
            certs.write_tagged(&mut buf)?;
        }
        if let Some(crls) = signed_data.crls() {
            crls.write_tagged(&mut buf)?;
        }
        target.write_all(&buf)?;

        let mut buf = Vec::new();
        self.signature.signer_info().write_signed_fields(&mut buf)?;
        let attrs = self.signature.unsigned_attrs();
        if attrs.is_present() {
            let mut content = Vec::new();
            for attr in attrs {
                if attr.kind().is_archive_timestamp()
                    && !Self::created_before(attr.values(), gen_time)
                {
                    continue
                }
                content.extend_from_slice(&attr.to_der()?);
            }
            if strategy == Strategy::WithTagLength {
                der::write_header(&mut buf, &[0xA1], content.len());
            }
            buf.extend_from_slice(&content);
        }
        trace!("Signer info data: {}", hex::Hex(&buf));
        target.write_all(&buf)?;
        Ok(())
    }

    /// Returns whether an archive timestamp was created before `gen_time`.
    fn created_before(values: &[der::Tlv], gen_time: Time) -> bool {
        let value = match values.first() {
            Some(value) => value,
            None => return false
        };
        match TimestampToken::from_tlv(value, TimestampType::ArchiveTimestamp) {
            Ok(token) => token.gen_time() < gen_time,
            Err(err) => {
                debug!("Ignoring malformed archive timestamp: {}", err);
                false
            }
        }
    }

    /// Writes the data of an archive timestamp v3.
    ///
    /// The data consists of the DER encoded content type, the digest of
    /// the signed content using `algorithm`, the DER encoded fields of the
    /// signer info except the unsigned attributes, and finally `index`, the
    /// DER encoded value of the ATS-hash-index.
    pub fn write_archive_timestamp_v3_data<W: io::Write>(
        &self, index: &[u8], algorithm: DigestAlgorithm, target: &mut W
    ) -> Result<(), MessageImprintError> {
        let content_type = self.signature.signed_data()
            .encap_content_info().content_type_der();
        let content_digest = algorithm.digest(
            &self.signature.signed_content()?
        );
        debug!(
            "Archive timestamp v3 data: content type {}, content digest {}, \
             ATS-hash-index {}",
            hex::encode(&content_type), hex::encode(content_digest.as_ref()),
            hex::encode(index)
        );
        target.write_all(&content_type)?;
        target.write_all(content_digest.as_ref())?;
        self.signature.signer_info().write_signed_fields(target)?;
        target.write_all(index)?;
        Ok(())
    }
}


//------------ CadesMessageDigestBuilder -------------------------------------

/// Produces the message digests for validating a timestamp of a signature.
#[derive(Clone, Copy, Debug)]
pub struct CadesMessageDigestBuilder<'a> {
    data: TimestampDataBuilder<'a>,
    token: &'a TimestampToken,
    algorithm: DigestAlgorithm,
}

impl<'a> CadesMessageDigestBuilder<'a> {
    /// Creates a builder for the given timestamp token of a signature.
    ///
    /// The digests are calculated using the algorithm of the token’s
    /// message imprint. The `certificates` are all certificates of the
    /// signature and its timestamps. They are needed for verifying the
    /// ATS-hash-index of an archive timestamp v3.
    pub fn new(
        signature: &'a CadesSignature,
        certificates: &'a CertificateSource,
        token: &'a TimestampToken,
    ) -> Self {
        CadesMessageDigestBuilder {
            data: TimestampDataBuilder::new(signature, certificates),
            token,
            algorithm: token.digest_algorithm(),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Returns the digest of an archive timestamp v2 using `strategy`.
    pub fn archive_timestamp_v2_digest(
        &self, strategy: Strategy
    ) -> MessageDigest {
        self.digest_with(|context| {
            self.data.write_archive_timestamp_v2_data(
                self.token.gen_time(), strategy, context
            )
        })
    }

    /// Returns the digest of an archive timestamp v3.
    pub fn archive_timestamp_v3_digest(&self) -> MessageDigest {
        self.digest_with(|context| {
            let index = self.data.verified_ats_hash_index(self.token)?;
            self.data.write_archive_timestamp_v3_data(
                &index, self.algorithm, context
            )
        })
    }

    /// Runs `op` over a new digest context and returns the result.
    fn digest_with<F>(&self, op: F) -> MessageDigest
    where F: FnOnce(&mut Context) -> Result<(), MessageImprintError> {
        let mut context = self.algorithm.start();
        match op(&mut context) {
            Ok(()) => context.finish_message_digest(),
            Err(err) => {
                warn!(
                    "Unable to compute message imprint for timestamp {}: {}",
                    self.token.id(), err
                );
                MessageDigest::empty()
            }
        }
    }
}

impl<'a> TimestampMessageDigestBuilder for CadesMessageDigestBuilder<'a> {
    fn content_timestamp_digest(&self) -> MessageDigest {
        self.digest_with(|context| {
            self.data.write_content_timestamp_data(context)
        })
    }

    fn signature_timestamp_digest(&self) -> MessageDigest {
        self.digest_with(|context| {
            self.data.write_signature_timestamp_data(context)
        })
    }

    fn timestamp_x1_digest(&self) -> MessageDigest {
        self.digest_with(|context| self.data.write_timestamp_x1_data(context))
    }

    fn timestamp_x2_digest(&self) -> MessageDigest {
        self.digest_with(|context| self.data.write_timestamp_x2_data(context))
    }

    /// Returns the digest for the archive timestamp.
    ///
    /// For an archive timestamp v2, the data including the identifier and
    /// length octets of the unsigned attributes is tried first. If its
    /// digest doesn’t match the message imprint, the data without them is
    /// used.
    fn archive_timestamp_digest(&self) -> MessageDigest {
        match self.token.archive_timestamp_type() {
            Some(ArchiveTimestampType::CadesV2) => {
                let mut digest = MessageDigest::empty();
                for strategy in Strategy::PROBE_ORDER {
                    digest = self.archive_timestamp_v2_digest(strategy);
                    if digest.matches(self.token.message_imprint()) {
                        break
                    }
                    debug!(
                        "Message imprint of archive timestamp {} doesn’t \
                         match using {:?}.",
                        self.token.id(), strategy
                    );
                }
                digest
            }
            Some(ArchiveTimestampType::CadesV3) => {
                self.archive_timestamp_v3_digest()
            }
            _ => {
                warn!(
                    "Unable to compute message imprint for timestamp {}: {}",
                    self.token.id(),
                    MessageImprintError::unsupported_archive_type()
                );
                MessageDigest::empty()
            }
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::cades::DetachedDocument;
    use crate::oid;
    use crate::test;

    fn signature(data: Vec<u8>) -> CadesSignature {
        CadesSignature::decode(
            Bytes::from(data), Vec::new(), &Config::default()
        ).unwrap().remove(0)
    }

    fn token(imprint: MessageDigest) -> TimestampToken {
        TimestampToken::decode(
            Bytes::from(test::TimestampBuilder::new(
                Time::utc(2021, 1, 1, 0, 0, 0), imprint
            ).build()),
            TimestampType::SignatureTimestamp
        ).unwrap()
    }

    #[test]
    fn simple_digests() {
        let sig = signature(
            test::SignedDataBuilder::new()
                .content(b"document".as_ref())
                .signer_info(test::SignerInfoBuilder::new(b"sigval").build())
                .build()
        );
        let certs = CertificateSource::new();
        let token = token(DigestAlgorithm::Sha256.message_digest(b"sigval"));
        let builder = CadesMessageDigestBuilder::new(&sig, &certs, &token);
        assert_eq!(
            builder.content_timestamp_digest(),
            DigestAlgorithm::Sha256.message_digest(b"document")
        );
        assert!(
            builder.signature_timestamp_digest().matches(
                token.message_imprint()
            )
        );
    }

    #[test]
    fn missing_document() {
        let sig = signature(
            test::SignedDataBuilder::new()
                .signer_info(test::SignerInfoBuilder::new(b"sigval").build())
                .build()
        );
        let certs = CertificateSource::new();
        let token = token(DigestAlgorithm::Sha256.message_digest(b"doc"));
        let builder = CadesMessageDigestBuilder::new(&sig, &certs, &token);
        assert!(builder.content_timestamp_digest().is_empty());

        let sig = CadesSignature::decode(
            Bytes::from(
                test::SignedDataBuilder::new()
                    .signer_info(
                        test::SignerInfoBuilder::new(b"sigval").build()
                    )
                    .build()
            ),
            vec![DetachedDocument::new(None, &b"doc"[..])],
            &Config::default()
        ).unwrap().remove(0);
        let builder = CadesMessageDigestBuilder::new(&sig, &certs, &token);
        assert!(
            builder.content_timestamp_digest().matches(
                token.message_imprint()
            )
        );
    }

    #[test]
    fn empty_x2_data() {
        let sig = signature(
            test::SignedDataBuilder::new()
                .content(b"document".as_ref())
                .signer_info(test::SignerInfoBuilder::new(b"sigval").build())
                .build()
        );
        let certs = CertificateSource::new();
        let token = token(DigestAlgorithm::Sha256.message_digest(b""));
        let builder = CadesMessageDigestBuilder::new(&sig, &certs, &token);
        assert_eq!(
            builder.timestamp_x2_digest(),
            DigestAlgorithm::Sha256.message_digest(b"")
        );
        assert_eq!(
            builder.timestamp_x1_digest(),
            DigestAlgorithm::Sha256.message_digest(b"sigval")
        );
    }

    #[test]
    fn x1_and_x2_data() {
        let sig_ts = test::TimestampBuilder::new(
            Time::utc(2021, 1, 1, 0, 0, 0),
            DigestAlgorithm::Sha256.message_digest(b"sigval")
        ).build();
        let sig = signature(
            test::SignedDataBuilder::new()
                .content(b"document".as_ref())
                .signer_info(
                    test::SignerInfoBuilder::new(b"sigval")
                        .unsigned_attr(test::attr(
                            oid::AA_ETS_REVOCATION_REFS,
                            test::complete_revocation_refs(&[], &[])
                        ))
                        .unsigned_attr(test::attr(
                            oid::AA_SIGNATURE_TIME_STAMP_TOKEN, sig_ts
                        ))
                        .unsigned_attr(test::attr(
                            oid::AA_ETS_CERTIFICATE_REFS,
                            test::complete_certificate_refs(&[])
                        ))
                        .build()
                )
                .build()
        );
        let certs = CertificateSource::new();
        let builder = TimestampDataBuilder::new(&sig, &certs);
        let attrs = sig.unsigned_attrs().iter().collect::<Vec<_>>();
        let mut x2 = attrs[2].type_and_values_der().unwrap();
        x2.extend_from_slice(&attrs[0].type_and_values_der().unwrap());
        assert_eq!(builder.timestamp_x2_data().unwrap(), x2);

        let mut x1 = b"sigval".to_vec();
        x1.extend_from_slice(&attrs[1].type_and_values_der().unwrap());
        x1.extend_from_slice(&x2);
        assert_eq!(builder.timestamp_x1_data().unwrap(), x1);
    }

    /// A BER encoded signature.
    ///
    /// The content is a definite-length constructed octet string, the
    /// certificates set and the unsigned attributes use indefinite lengths.
    const BER_SIGNATURE: &[u8] = b"\
        \x30\x80\
          \x06\x09\x2a\x86\x48\x86\xf7\x0d\x01\x07\x02\
          \xa0\x80\
            \x30\x80\
              \x02\x01\x01\
              \x31\x0f\x30\x0d\x06\x09\x60\x86\x48\
                \x01\x65\x03\x04\x02\x01\x05\x00\
              \x30\x16\x06\x09\x2a\x86\x48\x86\xf7\x0d\x01\x07\x01\
                \xa0\x09\x24\x07\x04\x02ab\x04\x01c\
              \xa0\x80\x30\x80\x0c\x01x\x00\x00\x00\x00\
              \x31\x80\
                \x30\x80\
                  \x02\x01\x01\
                  \x30\x80\x30\x00\x02\x01\x01\x00\x00\
                  \x30\x0d\x06\x09\x60\x86\x48\x01\x65\x03\x04\x02\x01\x05\x00\
                  \x30\x0d\x06\x09\x60\x86\x48\x01\x65\x03\x04\x02\x01\x05\x00\
                  \x04\x03sig\
                  \xa1\x80\
                    \x30\x80\x06\x03\x2a\x03\x04\x31\
                      \x80\x04\x01v\x00\x00\x00\x00\
                  \x00\x00\
                \x00\x00\
              \x00\x00\
            \x00\x00\
          \x00\x00\
        \x00\x00";

    /// The signed data part of the archive timestamp v2 data.
    const BER_SIGNED_DATA: &[u8] = b"\
        \x30\x80\x06\x09\x2a\x86\x48\x86\xf7\x0d\x01\x07\x01\
          \xa0\x80\x24\x80\x04\x02ab\x04\x01c\x00\x00\x00\x00\x00\x00\
        \xa0\x80\x30\x80\x0c\x01x\x00\x00\x00\x00\
        \x02\x01\x01\
        \x30\x05\x30\x00\x02\x01\x01\
        \x30\x0d\x06\x09\x60\x86\x48\x01\x65\x03\x04\x02\x01\x05\x00\
        \x30\x0d\x06\x09\x60\x86\x48\x01\x65\x03\x04\x02\x01\x05\x00\
        \x04\x03sig";

    /// The DER encoded unsigned attribute of `BER_SIGNATURE`.
    const BER_UNSIGNED_ATTR: &[u8] =
        b"\x30\x0a\x06\x03\x2a\x03\x04\x31\x03\x04\x01v";

    #[test]
    fn archive_timestamp_v2_ber_data() {
        let sig = signature(BER_SIGNATURE.to_vec());
        assert!(sig.signed_data().certificates().unwrap().is_ber());
        assert_eq!(sig.unsigned_attrs().len(), 1);
        let certs = CertificateSource::new();
        let builder = TimestampDataBuilder::new(&sig, &certs);
        let gen_time = Time::utc(2021, 1, 1, 0, 0, 0);

        let mut with_tag = BER_SIGNED_DATA.to_vec();
        with_tag.extend_from_slice(b"\xa1\x0c");
        with_tag.extend_from_slice(BER_UNSIGNED_ATTR);
        let mut data = Vec::new();
        builder.write_archive_timestamp_v2_data(
            gen_time, Strategy::WithTagLength, &mut data
        ).unwrap();
        assert_eq!(data, with_tag);

        let mut without_tag = BER_SIGNED_DATA.to_vec();
        without_tag.extend_from_slice(BER_UNSIGNED_ATTR);
        let mut data = Vec::new();
        builder.write_archive_timestamp_v2_data(
            gen_time, Strategy::WithoutTagLength, &mut data
        ).unwrap();
        assert_eq!(data, without_tag);

        // Both forms are found through the message imprint.
        for expected in [with_tag, without_tag] {
            let mut token = token(
                DigestAlgorithm::Sha256.message_digest(&expected)
            );
            token.set_archive_timestamp_type(ArchiveTimestampType::CadesV2);
            assert!(
                CadesMessageDigestBuilder::new(&sig, &certs, &token)
                    .archive_timestamp_digest()
                    .matches(token.message_imprint())
            );
        }
    }

    #[test]
    fn unsupported_archive_type() {
        let sig = signature(
            test::SignedDataBuilder::new()
                .content(b"document".as_ref())
                .signer_info(test::SignerInfoBuilder::new(b"sigval").build())
                .build()
        );
        let certs = CertificateSource::new();
        let mut token = token(DigestAlgorithm::Sha256.message_digest(b""));
        let builder = TimestampDataBuilder::new(&sig, &certs);
        assert!(
            builder.archive_timestamp_data(
                &token, Strategy::WithTagLength
            ).is_err()
        );
        assert!(
            CadesMessageDigestBuilder::new(&sig, &certs, &token)
                .archive_timestamp_digest().is_empty()
        );

        // v3 without an ATS-hash-index.
        token.set_archive_timestamp_type(ArchiveTimestampType::CadesV3);
        assert!(
            CadesMessageDigestBuilder::new(&sig, &certs, &token)
                .archive_timestamp_digest().is_empty()
        );
    }
}
