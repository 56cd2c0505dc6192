//! RFC 3161 timestamp tokens.

use std::fmt;
use bcder::{decode, Integer, Mode, OctetString, Oid};
use bcder::decode::DecodeError;
use bytes::Bytes;
use log::{debug, warn};
use crate::cades::Sources;
use crate::cms::{Attributes, SignedData};
use crate::crypto::{DigestAlgorithm, MessageDigest};
use crate::der::{self, Tlv};
use crate::error;
use crate::oid;
use crate::x509::Time;
use super::reference::{
    add_references, Identifier, IdentifierKind, TimestampedReference
};


//------------ TimestampType -------------------------------------------------

/// The role a timestamp plays in a signature.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampType {
    /// A timestamp over the signed content.
    ContentTimestamp,

    /// A timestamp over the signature value.
    SignatureTimestamp,

    /// A timestamp over the validation data references only, type X2.
    ValidationDataRefsOnlyTimestamp,

    /// A timestamp over signature and validation data references, type X1.
    ValidationDataTimestamp,

    /// A timestamp over the complete signature.
    ArchiveTimestamp,
}

impl TimestampType {
    /// Returns whether timestamps of this type cover the signature.
    pub fn covers_signature(self) -> bool {
        !matches!(self, TimestampType::ContentTimestamp)
    }
}

impl fmt::Display for TimestampType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            TimestampType::ContentTimestamp => "CONTENT_TIMESTAMP",
            TimestampType::SignatureTimestamp => "SIGNATURE_TIMESTAMP",
            TimestampType::ValidationDataRefsOnlyTimestamp => {
                "VALIDATION_DATA_REFSONLY_TIMESTAMP"
            }
            TimestampType::ValidationDataTimestamp => {
                "VALIDATION_DATA_TIMESTAMP"
            }
            TimestampType::ArchiveTimestamp => "ARCHIVE_TIMESTAMP",
        })
    }
}


//------------ ArchiveTimestampType ------------------------------------------

/// The kind of archive timestamp.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArchiveTimestampType {
    /// An archive-time-stamp-v2 attribute.
    CadesV2,

    /// An archive-time-stamp-v3 attribute.
    CadesV3,

    /// An archive timestamp of unknown version.
    Cades,
}

impl fmt::Display for ArchiveTimestampType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ArchiveTimestampType::CadesV2 => "CAdES_V2",
            ArchiveTimestampType::CadesV3 => "CAdES_V3",
            ArchiveTimestampType::Cades => "CAdES",
        })
    }
}


//------------ TstInfo -------------------------------------------------------

/// The content of a timestamp token.
///
/// ```txt
/// TSTInfo ::= SEQUENCE  {
///     version                      INTEGER  { v1(1) },
///     policy                       TSAPolicyId,
///     messageImprint               MessageImprint,
///     serialNumber                 INTEGER,
///     genTime                      GeneralizedTime,
///     accuracy                     Accuracy                 OPTIONAL,
///     ordering                     BOOLEAN             DEFAULT FALSE,
///     nonce                        INTEGER                  OPTIONAL,
///     tsa                          [0] GeneralName          OPTIONAL,
///     extensions                   [1] IMPLICIT Extensions  OPTIONAL }
///
/// MessageImprint ::= SEQUENCE  {
///     hashAlgorithm                AlgorithmIdentifier,
///     hashedMessage                OCTET STRING  }
/// ```
#[derive(Clone, Debug)]
pub struct TstInfo {
    policy: Oid<Bytes>,
    message_imprint: MessageDigest,
    serial_number: Integer,
    gen_time: Time,
}

impl TstInfo {
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.skip_u8_if(1)?; // version
            let policy = Oid::take_from(cons)?;
            let message_imprint = cons.take_sequence(|cons| {
                let alg = DigestAlgorithm::take_from(cons)?;
                let value = OctetString::take_from(cons)?.into_bytes();
                Ok(MessageDigest::new(alg, value))
            })?;
            let serial_number = Integer::take_from(cons)?;
            let gen_time = Time::take_generalized_from(cons)?;
            der::skip_remaining(cons)?;
            Ok(TstInfo { policy, message_imprint, serial_number, gen_time })
        })
    }

    pub fn policy(&self) -> &Oid<Bytes> {
        &self.policy
    }

    pub fn message_imprint(&self) -> &MessageDigest {
        &self.message_imprint
    }

    pub fn serial_number(&self) -> &Integer {
        &self.serial_number
    }

    pub fn gen_time(&self) -> Time {
        self.gen_time
    }
}


//------------ TimestampToken ------------------------------------------------

/// A timestamp token found in a signature.
///
/// Besides the token itself, this keeps track of the outcome of matching
/// the message imprint and the references to the objects the timestamp
/// covers.
#[derive(Clone, Debug)]
pub struct TimestampToken {
    signed_data: SignedData,
    tst_info: TstInfo,

    /// The DER encoding of the token.
    encoded: Bytes,

    id: Identifier,
    timestamp_type: TimestampType,
    archive_timestamp_type: Option<ArchiveTimestampType>,
    sources: Sources,
    references: Vec<TimestampedReference>,

    /// Whether the message imprint has been checked.
    processed: bool,

    /// Whether the data for the message imprint could be determined.
    message_imprint_data_found: bool,

    /// Whether the message imprint matched the data.
    message_imprint_intact: bool,
}

impl TimestampToken {
    /// Decodes a timestamp token from its encoding.
    pub fn decode(
        source: Bytes, timestamp_type: TimestampType
    ) -> Result<Self, error::DecodeError> {
        let tlv = Tlv::parse(source).map_err(|err| {
            error::DecodeError::content(err, Default::default())
        })?;
        Self::from_tlv(&tlv, timestamp_type)
    }

    /// Creates a timestamp token from the value of a timestamp attribute.
    pub fn from_tlv(
        tlv: &Tlv, timestamp_type: TimestampType
    ) -> Result<Self, error::DecodeError> {
        let encoded = Bytes::from(tlv.to_der().map_err(|err| {
            error::DecodeError::content(err, Default::default())
        })?);
        let signed_data = Mode::Ber.decode(
            tlv.raw().clone(), SignedData::take_from
        )?;
        let encap = signed_data.encap_content_info();
        if encap.content_type() != &oid::CT_TST_INFO {
            return Err(error::DecodeError::content(
                "timestamp token without TSTInfo", Default::default()
            ))
        }
        let content = match encap.content() {
            Some(content) => content.clone(),
            None => {
                return Err(error::DecodeError::content(
                    "timestamp token without content", Default::default()
                ))
            }
        };
        let tst_info = Mode::Ber.decode(content, TstInfo::take_from)?;
        let sources = Sources::from_signed_data(&signed_data);
        Ok(TimestampToken {
            id: Identifier::new(IdentifierKind::Timestamp, &encoded),
            signed_data, tst_info, encoded, timestamp_type,
            archive_timestamp_type: None,
            sources,
            references: Vec::new(),
            processed: false,
            message_imprint_data_found: false,
            message_imprint_intact: false,
        })
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    pub fn tst_info(&self) -> &TstInfo {
        &self.tst_info
    }

    pub fn gen_time(&self) -> Time {
        self.tst_info.gen_time()
    }

    pub fn message_imprint(&self) -> &MessageDigest {
        self.tst_info.message_imprint()
    }

    /// Returns the algorithm of the message imprint.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.tst_info.message_imprint().algorithm().unwrap_or_default()
    }

    /// Returns the DER encoding of the token.
    pub fn encoded(&self) -> &Bytes {
        &self.encoded
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn timestamp_type(&self) -> TimestampType {
        self.timestamp_type
    }

    pub fn archive_timestamp_type(&self) -> Option<ArchiveTimestampType> {
        self.archive_timestamp_type
    }

    pub fn set_archive_timestamp_type(&mut self, typ: ArchiveTimestampType) {
        self.archive_timestamp_type = Some(typ)
    }

    /// Returns the unsigned attributes of the token’s signer info.
    pub fn unsigned_attrs(&self) -> &Attributes {
        static EMPTY: Attributes = Attributes::EMPTY;
        match self.signed_data.signer_infos().first() {
            Some(info) => info.unsigned_attrs(),
            None => &EMPTY,
        }
    }

    /// Returns the certificates and revocation data of the token.
    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Returns the references to the objects covered by the timestamp.
    pub fn references(&self) -> &[TimestampedReference] {
        &self.references
    }

    pub fn set_references(&mut self, references: Vec<TimestampedReference>) {
        self.references = references
    }

    /// Adds references not yet present.
    pub fn add_references<I>(&mut self, references: I)
    where I: IntoIterator<Item = TimestampedReference> {
        add_references(&mut self.references, references)
    }
}

/// # Matching the Message Imprint
///
impl TimestampToken {
    /// Checks the message imprint against a message digest of the data.
    ///
    /// Returns whether the message imprint matched. If `quiet` is `true`,
    /// a mismatch will not be logged.
    pub fn match_data(&mut self, digest: &MessageDigest, quiet: bool) -> bool {
        self.processed = true;
        self.message_imprint_data_found = !digest.is_empty();
        self.message_imprint_intact = false;
        if digest.is_empty() {
            if !quiet {
                warn!(
                    "No message digest available for checking timestamp {}.",
                    self.id
                );
            }
        }
        else if digest.algorithm() != self.message_imprint().algorithm() {
            if !quiet {
                warn!(
                    "Digest algorithm {} doesn’t match the algorithm of \
                     timestamp {}.",
                    digest.algorithm().unwrap_or_default(), self.id
                );
            }
        }
        else {
            self.message_imprint_intact = digest.matches(
                self.message_imprint()
            );
            if !self.message_imprint_intact && !quiet {
                warn!(
                    "Message imprint of timestamp {} doesn’t match. \
                     Provided: {}, present in timestamp: {}.",
                    self.id, digest, self.message_imprint()
                );
            }
            else if self.message_imprint_intact {
                debug!("Message imprint of timestamp {} matches.", self.id);
            }
        }
        self.message_imprint_intact
    }

    /// Checks the message imprint against the data itself.
    pub fn match_content(&mut self, data: &[u8]) -> bool {
        let digest = self.digest_algorithm().message_digest(data);
        self.match_data(&digest, false)
    }

    /// Returns whether the message imprint has been checked.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn is_message_imprint_data_found(&self) -> bool {
        self.message_imprint_data_found
    }

    pub fn is_message_imprint_intact(&self) -> bool {
        self.message_imprint_intact
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::test;

    #[test]
    fn decode_token() {
        let time = Time::utc(2022, 3, 4, 5, 6, 7);
        let imprint = DigestAlgorithm::Sha256.message_digest(b"data");
        let data = test::TimestampBuilder::new(time, imprint.clone())
            .certificate(test::certificate("tsa"))
            .build();
        let token = TimestampToken::decode(
            Bytes::from(data.clone()), TimestampType::SignatureTimestamp
        ).unwrap();
        assert_eq!(token.gen_time(), time);
        assert_eq!(token.message_imprint(), &imprint);
        assert_eq!(token.digest_algorithm(), DigestAlgorithm::Sha256);
        assert_eq!(token.encoded().as_ref(), data.as_slice());
        assert_eq!(token.sources().certificates.len(), 1);
        assert!(token.unsigned_attrs().is_empty());
        assert!(!token.is_processed());
        assert!(token.archive_timestamp_type().is_none());
    }

    #[test]
    fn reject_other_content() {
        let data = test::SignedDataBuilder::new()
            .content(b"no tst info".as_ref())
            .signer_info(test::SignerInfoBuilder::new(b"sig").build())
            .build();
        assert!(TimestampToken::decode(
            Bytes::from(data), TimestampType::ContentTimestamp
        ).is_err());
    }

    #[test]
    fn match_data() {
        let imprint = DigestAlgorithm::Sha256.message_digest(b"data");
        let mut token = TimestampToken::decode(
            Bytes::from(test::TimestampBuilder::new(
                Time::utc(2022, 3, 4, 5, 6, 7), imprint.clone()
            ).build()),
            TimestampType::ContentTimestamp
        ).unwrap();

        assert!(!token.match_data(&MessageDigest::empty(), true));
        assert!(token.is_processed());
        assert!(!token.is_message_imprint_data_found());

        assert!(!token.match_data(
            &DigestAlgorithm::Sha1.message_digest(b"data"), true
        ));
        assert!(token.is_message_imprint_data_found());
        assert!(!token.is_message_imprint_intact());

        assert!(token.match_data(&imprint, false));
        assert!(token.is_message_imprint_intact());
        assert!(token.match_content(b"data"));
        assert!(!token.match_content(b"other"));
    }
}
