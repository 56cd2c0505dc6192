//! The timestamps of a CAdES signature and what they cover.
//!
//! A [`CadesTimestampSource`] collects all timestamp tokens found in the
//! signed and unsigned attributes of a signature, determines for each of
//! them the objects it covers, and checks their message imprints.
//!
//! The objects covered by a timestamp are expressed as a list of
//! [`TimestampedReference`]s. Which objects these are depends on the type
//! of the timestamp and, for an archive timestamp v3, on the content of its
//! ATS-hash-index. Since later timestamps cover earlier ones, the unsigned
//! attributes are processed in the order they appear in the signature.

use log::{debug, warn};
use crate::cades::{
    CadesSignature, CertificateSource, CertificateToken, CrlBinary,
    OcspResponseBinary, Sources, Token,
};
use crate::cades::refs::{CertificateRef, RevocationRef};
use crate::cms::{Attribute, AttributeKind};
use crate::crypto::MessageDigest;
use crate::der::Tlv;
use super::ats_hash_index::{AtsHashIndex, AtsHashIndexVersion};
use super::digest_builder::{
    CadesMessageDigestBuilder, TimestampMessageDigestBuilder
};
use super::reference::{
    add_reference, add_references, Identifier, IdentifierKind,
    TimestampedObjectType, TimestampedReference,
};
use super::token::{ArchiveTimestampType, TimestampToken, TimestampType};


//------------ CadesTimestampSource ------------------------------------------

/// All timestamps of a CAdES signature.
#[derive(Clone, Debug)]
pub struct CadesTimestampSource {
    signature: CadesSignature,

    /// The tokens of the signature and of all its timestamps.
    sources: Sources,

    content_timestamps: Vec<TimestampToken>,
    signature_timestamps: Vec<TimestampToken>,

    /// Timestamps over signature and references, type X1.
    sig_and_refs_timestamps: Vec<TimestampToken>,

    /// Timestamps over references only, type X2.
    refs_only_timestamps: Vec<TimestampToken>,

    archive_timestamps: Vec<TimestampToken>,

    /// Timestamps not embedded in the signature.
    detached_timestamps: Vec<TimestampToken>,

    /// References to the validation data in the unsigned attributes.
    unsigned_properties_references: Vec<TimestampedReference>,
}

impl CadesTimestampSource {
    /// Creates the timestamp source for a signature.
    ///
    /// This extracts all timestamps from the signature, determines the
    /// references they cover and matches their message imprints.
    pub fn new(signature: &CadesSignature) -> Self {
        let mut res = CadesTimestampSource {
            signature: signature.clone(),
            sources: signature.sources(),
            content_timestamps: Vec::new(),
            signature_timestamps: Vec::new(),
            sig_and_refs_timestamps: Vec::new(),
            refs_only_timestamps: Vec::new(),
            archive_timestamps: Vec::new(),
            detached_timestamps: Vec::new(),
            unsigned_properties_references: Vec::new(),
        };
        res.make_signed_attr_timestamps();
        res.make_unsigned_attr_timestamps();
        res.validate_timestamps();
        res
    }

    pub fn signature(&self) -> &CadesSignature {
        &self.signature
    }

    /// Returns the tokens of the signature and all its timestamps.
    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    pub fn content_timestamps(&self) -> &[TimestampToken] {
        &self.content_timestamps
    }

    pub fn signature_timestamps(&self) -> &[TimestampToken] {
        &self.signature_timestamps
    }

    /// Returns the timestamps over signature and references.
    pub fn timestamps_x1(&self) -> &[TimestampToken] {
        &self.sig_and_refs_timestamps
    }

    /// Returns the timestamps over the references only.
    pub fn timestamps_x2(&self) -> &[TimestampToken] {
        &self.refs_only_timestamps
    }

    pub fn archive_timestamps(&self) -> &[TimestampToken] {
        &self.archive_timestamps
    }

    pub fn detached_timestamps(&self) -> &[TimestampToken] {
        &self.detached_timestamps
    }

    /// Returns all timestamps.
    ///
    /// The timestamps are ordered by type first: content, signature, X1,
    /// X2, archive, and detached timestamps. Within each type they keep the
    /// order of the signature.
    pub fn all_timestamps(&self) -> Vec<&TimestampToken> {
        self.content_timestamps.iter()
            .chain(self.signature_timestamps.iter())
            .chain(self.sig_and_refs_timestamps.iter())
            .chain(self.refs_only_timestamps.iter())
            .chain(self.archive_timestamps.iter())
            .chain(self.detached_timestamps.iter())
            .collect()
    }

    /// Returns all timestamps except for the latest archive timestamp.
    ///
    /// Archive and detached timestamps are sorted by their generation
    /// time and the last one is left out. This only happens if there are
    /// other timestamps or if some archive timestamp covers another
    /// timestamp. Otherwise all timestamps are returned.
    pub fn all_timestamps_except_last_archive_timestamp(
        &self
    ) -> Vec<&TimestampToken> {
        let mut res: Vec<_> = self.content_timestamps.iter()
            .chain(self.signature_timestamps.iter())
            .chain(self.sig_and_refs_timestamps.iter())
            .chain(self.refs_only_timestamps.iter())
            .collect();
        let mut archives: Vec<_> = self.archive_timestamps.iter()
            .chain(self.detached_timestamps.iter())
            .collect();
        if archives.is_empty() {
            return res
        }
        let covers_timestamps = archives.iter().any(|token| {
            token.references().iter().any(|reference| {
                reference.object_type() == TimestampedObjectType::Timestamp
            })
        });
        if !res.is_empty() || covers_timestamps {
            archives.sort_by_key(|token| token.gen_time());
            archives.pop();
        }
        res.extend(archives);
        res
    }

    /// Returns the tokens contained in all the timestamps.
    pub fn timestamp_sources(&self) -> Sources {
        let mut res = Sources::default();
        for token in self.all_timestamps() {
            res.merge(token.sources())
        }
        res
    }

    /// Returns the references to the validation data of the signature.
    ///
    /// These are the values and references found in the unsigned
    /// attributes as well as everything covered by counter signatures.
    pub fn unsigned_properties_references(&self) -> &[TimestampedReference] {
        &self.unsigned_properties_references
    }

    /// Returns whether an object is covered by a timestamp.
    ///
    /// For a counter signature, the timestamps of the signatures it
    /// countersigns are considered, too.
    pub fn is_timestamped(
        &self, id: &Identifier, object_type: TimestampedObjectType
    ) -> bool {
        let reference = TimestampedReference::new(id.clone(), object_type);
        let covered = self.all_timestamps().iter().any(|token| {
            token.references().contains(&reference)
        });
        if covered {
            return true
        }
        match self.signature.master_signature() {
            Some(master) => {
                Self::new(master).is_timestamped(id, object_type)
            }
            None => false
        }
    }

    /// Adds a timestamp kept outside of the signature.
    ///
    /// Such a timestamp covers the complete signature file: all validation
    /// data in the signed data, all timestamps embedded in the signature,
    /// and the signature itself with everything it references.
    ///
    /// The message imprint of the timestamp is not checked.
    pub fn add_external_timestamp(&mut self, mut token: TimestampToken) {
        token.add_references(self.signature_signed_data_references());
        let covered: Vec<_> = self.content_timestamps.iter()
            .chain(self.signature_timestamps.iter())
            .chain(self.sig_and_refs_timestamps.iter())
            .chain(self.refs_only_timestamps.iter())
            .chain(self.archive_timestamps.iter())
            .collect();
        token.add_references(self.encapsulated_references(covered));
        token.add_references(self.own_signature_references());
        self.sources.merge(token.sources());
        self.detached_timestamps.push(token);
    }
}

/// # Creating Timestamps
///
impl CadesTimestampSource {
    fn make_signed_attr_timestamps(&mut self) {
        let signature = self.signature.clone();
        for attr in signature.signed_attrs().of_kind(
            AttributeKind::ContentTimestamp
        ) {
            let references = self.signer_data_references();
            for token in self.make_timestamps(
                attr, TimestampType::ContentTimestamp, &references
            ) {
                self.sources.merge(token.sources());
                self.content_timestamps.push(token);
            }
        }
    }

    fn make_unsigned_attr_timestamps(&mut self) {
        let signature = self.signature.clone();
        let mut previous = Vec::new();
        for attr in signature.unsigned_attrs() {
            let tokens = match attr.kind() {
                AttributeKind::SignatureTimestamp => {
                    let references = self.signature_timestamp_references();
                    self.make_timestamps(
                        attr, TimestampType::SignatureTimestamp, &references
                    )
                }
                AttributeKind::CompleteCertificateRefs
                | AttributeKind::AttributeCertificateRefs => {
                    let references = self.certificate_refs_references(attr);
                    add_references(
                        &mut self.unsigned_properties_references, references
                    );
                    continue
                }
                AttributeKind::CompleteRevocationRefs
                | AttributeKind::AttributeRevocationRefs => {
                    let references = self.revocation_refs_references(attr);
                    add_references(
                        &mut self.unsigned_properties_references, references
                    );
                    continue
                }
                AttributeKind::RefsOnlyTimestamp => {
                    let references =
                        self.unsigned_properties_references.clone();
                    self.make_timestamps(
                        attr, TimestampType::ValidationDataRefsOnlyTimestamp,
                        &references
                    )
                }
                AttributeKind::SigAndRefsTimestamp => {
                    let mut references = self.encapsulated_references(
                        previous.iter().filter(|token: &&TimestampToken| {
                            token.timestamp_type()
                                == TimestampType::SignatureTimestamp
                        })
                    );
                    add_references(
                        &mut references,
                        self.unsigned_properties_references.iter().cloned()
                    );
                    self.make_timestamps(
                        attr, TimestampType::ValidationDataTimestamp,
                        &references
                    )
                }
                AttributeKind::CertificateValues => {
                    let references = self.certificate_values_references(attr);
                    add_references(
                        &mut self.unsigned_properties_references, references
                    );
                    continue
                }
                AttributeKind::RevocationValues => {
                    let references = self.revocation_values_references(attr);
                    add_references(
                        &mut self.unsigned_properties_references, references
                    );
                    continue
                }
                AttributeKind::ArchiveTimestampV2
                | AttributeKind::ArchiveTimestampV3 => {
                    let archive_type = match attr.kind() {
                        AttributeKind::ArchiveTimestampV2 => {
                            ArchiveTimestampType::CadesV2
                        }
                        _ => ArchiveTimestampType::CadesV3
                    };
                    let mut tokens = self.make_timestamps(
                        attr, TimestampType::ArchiveTimestamp, &[]
                    );
                    for token in &mut tokens {
                        token.set_archive_timestamp_type(archive_type);
                        self.incorporate_archive_references(token, &previous);
                    }
                    tokens
                }
                AttributeKind::CounterSignature => {
                    let references = self.counter_signatures_references(attr);
                    add_references(
                        &mut self.unsigned_properties_references, references
                    );
                    continue
                }
                AttributeKind::SignaturePolicyStore => continue,
                _ => {
                    warn!(
                        "Unsupported unsigned attribute {} in signature {}.",
                        attr.attr_type(), self.signature.id()
                    );
                    continue
                }
            };
            for token in tokens {
                self.sources.merge(token.sources());
                match token.timestamp_type() {
                    TimestampType::SignatureTimestamp => {
                        self.signature_timestamps.push(token.clone())
                    }
                    TimestampType::ValidationDataRefsOnlyTimestamp => {
                        self.refs_only_timestamps.push(token.clone())
                    }
                    TimestampType::ValidationDataTimestamp => {
                        self.sig_and_refs_timestamps.push(token.clone())
                    }
                    TimestampType::ArchiveTimestamp => {
                        self.archive_timestamps.push(token.clone())
                    }
                    TimestampType::ContentTimestamp => {
                        self.content_timestamps.push(token.clone())
                    }
                }
                previous.push(token);
            }
        }
    }

    /// Creates the timestamp tokens contained in an attribute.
    ///
    /// Values that aren’t valid timestamp tokens are skipped with a
    /// warning.
    fn make_timestamps(
        &self,
        attr: &Attribute,
        timestamp_type: TimestampType,
        references: &[TimestampedReference],
    ) -> Vec<TimestampToken> {
        let mut res = Vec::new();
        for value in attr.values() {
            match TimestampToken::from_tlv(value, timestamp_type) {
                Ok(mut token) => {
                    token.set_references(references.to_vec());
                    res.push(token)
                }
                Err(err) => {
                    warn!(
                        "Skipping malformed {} in signature {}: {}",
                        timestamp_type, self.signature.id(), err
                    );
                }
            }
        }
        res
    }

    /// Adds the references covered by an archive timestamp.
    fn incorporate_archive_references(
        &self, token: &mut TimestampToken, previous: &[TimestampToken]
    ) {
        if matches!(
            token.archive_timestamp_type(),
            Some(ArchiveTimestampType::CadesV2)
            | Some(ArchiveTimestampType::Cades)
        ) {
            // An archive timestamp v2 covers all unsigned properties.
            token.add_references(self.signature_timestamp_references());
            token.add_references(self.encapsulated_references(previous));
            token.add_references(
                self.unsigned_properties_references.iter().cloned()
            );
            token.add_references(self.signature_signed_data_references());
        }

        token.add_references(self.signature_timestamp_references());
        let index = match AtsHashIndex::from_token(
            token, self.signature.config()
        ) {
            Ok(Some(index)) => index,
            Ok(None) => return,
            Err(err) => {
                warn!(
                    "Malformed ATS-hash-index in timestamp {}: {}",
                    token.id(), err
                );
                return
            }
        };
        token.add_references(self.indexed_certificate_references(&index));
        token.add_references(self.indexed_revocation_references(&index));
        token.add_references(
            self.indexed_unsigned_attr_references(&index, previous)
        );
    }
}

/// # Checking Message Imprints
///
impl CadesTimestampSource {
    fn validate_timestamps(&mut self) {
        let signature = &self.signature;
        let certificates = &self.sources.certificates;
        match_timestamps(
            signature, certificates, &mut self.content_timestamps,
            |builder| builder.content_timestamp_digest()
        );
        match_timestamps(
            signature, certificates, &mut self.signature_timestamps,
            |builder| builder.signature_timestamp_digest()
        );
        match_timestamps(
            signature, certificates, &mut self.sig_and_refs_timestamps,
            |builder| builder.timestamp_x1_digest()
        );
        match_timestamps(
            signature, certificates, &mut self.refs_only_timestamps,
            |builder| builder.timestamp_x2_digest()
        );
        for token in &mut self.archive_timestamps {
            if token.is_processed() {
                continue
            }
            let digest = CadesMessageDigestBuilder::new(
                signature, certificates, token
            ).archive_timestamp_digest();
            token.match_data(&digest, false);
        }
    }
}

fn match_timestamps<F>(
    signature: &CadesSignature,
    certificates: &CertificateSource,
    tokens: &mut [TimestampToken],
    op: F
)
where F: Fn(&CadesMessageDigestBuilder) -> MessageDigest {
    for token in tokens {
        let digest = op(
            &CadesMessageDigestBuilder::new(signature, certificates, token)
        );
        token.match_data(&digest, false);
    }
}

/// # References of the Signature
///
impl CadesTimestampSource {
    /// Returns the references to the signed data.
    ///
    /// This is the signed document unless the signature is a counter
    /// signature which doesn’t sign a document of its own.
    pub fn signer_data_references(&self) -> Vec<TimestampedReference> {
        self.signature.document_id().map(|id| {
            TimestampedReference::new(id, TimestampedObjectType::SignedData)
        }).into_iter().collect()
    }

    /// Returns the references covered by a signature timestamp.
    pub fn signature_timestamp_references(
        &self
    ) -> Vec<TimestampedReference> {
        let mut res = self.encapsulated_references(&self.content_timestamps);
        add_references(&mut res, self.signer_data_references());
        add_reference(&mut res, TimestampedReference::new(
            self.signature.id().clone(), TimestampedObjectType::Signature
        ));
        add_references(&mut res, self.certificate_ref_references(
            &self.signature.signing_certificate_refs(), None
        ));
        res
    }

    /// Returns the references to the validation data in the signed data.
    ///
    /// These are all certificates, CRLs and OCSP responses of the
    /// certificates and crls sets. A counter signature has no signed data
    /// of its own so this is empty.
    pub fn signature_signed_data_references(
        &self
    ) -> Vec<TimestampedReference> {
        if self.signature.is_counter_signature() {
            return Vec::new()
        }
        let sources = self.signature.signed_data_sources();
        let mut res = certificate_references(sources.certificates.iter());
        add_references(&mut res, crl_references(sources.crls.iter()));
        for ocsp in sources.ocsp.iter() {
            add_references(&mut res, self.ocsp_references(ocsp))
        }
        res
    }

    /// Returns the references for the signature as a covered signature.
    ///
    /// This is the signature itself, the certificates in its
    /// certificate-values attributes, and everything covered by its
    /// timestamps and unsigned attributes.
    fn own_signature_references(&self) -> Vec<TimestampedReference> {
        let mut res = vec![TimestampedReference::new(
            self.signature.id().clone(), TimestampedObjectType::Signature
        )];
        add_references(&mut res, certificate_references(
            own_certificate_values(&self.signature).iter()
        ));
        add_references(&mut res, self.signer_data_references());
        add_references(
            &mut res, self.unsigned_properties_references.iter().cloned()
        );
        add_references(
            &mut res, self.encapsulated_references(self.all_timestamps())
        );
        res
    }
}

/// # References of Unsigned Attributes
///
impl CadesTimestampSource {
    fn certificate_refs_references(
        &self, attr: &Attribute
    ) -> Vec<TimestampedReference> {
        let mut refs = Vec::new();
        for value in attr.values() {
            match CertificateRef::from_complete_refs(value) {
                Ok(some) => refs.extend(some),
                Err(err) => {
                    warn!("Skipping malformed certificate refs: {}", err)
                }
            }
        }
        self.certificate_ref_references(&refs, None)
    }

    fn revocation_refs_references(
        &self, attr: &Attribute
    ) -> Vec<TimestampedReference> {
        let mut res = Vec::new();
        for value in attr.values() {
            match RevocationRef::from_complete_refs(value) {
                Ok(refs) => {
                    for item in &refs {
                        add_references(
                            &mut res, self.revocation_ref_references(item)
                        )
                    }
                }
                Err(err) => {
                    warn!("Skipping malformed revocation refs: {}", err)
                }
            }
        }
        res
    }

    fn certificate_values_references(
        &self, attr: &Attribute
    ) -> Vec<TimestampedReference> {
        certificate_references(
            self.signature.certificate_values(attr.values()).iter()
        )
    }

    fn revocation_values_references(
        &self, attr: &Attribute
    ) -> Vec<TimestampedReference> {
        let (crls, ocsp) = self.signature.revocation_values(attr.values());
        let mut res = crl_references(crls.iter());
        for item in &ocsp {
            add_references(&mut res, self.ocsp_references(item))
        }
        res
    }

    fn counter_signatures_references(
        &self, attr: &Attribute
    ) -> Vec<TimestampedReference> {
        let mut res = Vec::new();
        for counter in self.signature.attribute_counter_signatures(attr) {
            add_references(
                &mut res, self.counter_signature_references(&counter)
            );
        }
        res
    }

    /// Returns the references covered by a counter signature.
    ///
    /// A counter signature shares the signed data of its master, so only
    /// its signing certificate and the certificates of its own
    /// certificate-values attributes are included and there is no
    /// reference to signed data.
    pub fn counter_signature_references(
        &self, counter: &CadesSignature
    ) -> Vec<TimestampedReference> {
        let mut res = vec![TimestampedReference::new(
            counter.id().clone(), TimestampedObjectType::Signature
        )];
        add_references(&mut res, self.certificate_ref_references(
            &counter.signing_certificate_refs(), None
        ));
        add_references(&mut res, certificate_references(
            own_certificate_values(counter).iter()
        ));
        let source = Self::new(counter);
        add_references(&mut res, source.signer_data_references());
        add_references(
            &mut res, source.unsigned_properties_references.iter().cloned()
        );
        add_references(
            &mut res, self.encapsulated_references(source.all_timestamps())
        );
        res
    }
}

/// # References from the ATS-hash-index
///
impl CadesTimestampSource {
    /// Returns the certificates of the signed data listed in the index.
    pub fn indexed_certificate_references(
        &self, index: &AtsHashIndex
    ) -> Vec<TimestampedReference> {
        let algorithm = index.digest_algorithm();
        let mut res = Vec::new();
        if self.signature.is_counter_signature() {
            return res
        }
        for cert in self.signature.signed_data_sources().certificates.iter() {
            if index.contains_certificate(&cert.digest(algorithm)) {
                add_reference(&mut res, TimestampedReference::new(
                    cert.id().clone(), TimestampedObjectType::Certificate
                ));
            }
            else {
                debug!(
                    "Certificate {} not covered by ATS-hash-index or added \
                     after the archive timestamp.",
                    cert.id()
                );
            }
        }
        res
    }

    /// Returns the CRLs and OCSP responses of the signed data in the index.
    pub fn indexed_revocation_references(
        &self, index: &AtsHashIndex
    ) -> Vec<TimestampedReference> {
        let algorithm = index.digest_algorithm();
        let mut res = Vec::new();
        if self.signature.is_counter_signature() {
            return res
        }
        let sources = self.signature.signed_data_sources();
        for crl in sources.crls.iter() {
            if index.contains_crl(&crl.digest(algorithm)) {
                add_references(
                    &mut res, crl_references(Some(crl).into_iter())
                );
            }
            else {
                debug!(
                    "CRL {} not covered by ATS-hash-index or added after \
                     the archive timestamp.",
                    crl.id()
                );
            }
        }
        for ocsp in sources.ocsp.iter() {
            let digest = algorithm.message_digest(
                ocsp.revocation_info_choice().as_slice()
            );
            if index.contains_crl(&digest) {
                add_references(&mut res, self.ocsp_references(ocsp));
            }
            else {
                warn!(
                    "OCSP response {} not covered by ATS-hash-index or added \
                     after the archive timestamp.",
                    ocsp.id()
                );
            }
        }
        res
    }

    /// Returns the references of the unsigned attributes in the index.
    ///
    /// An attribute covered by the index contributes whatever it covers
    /// itself. For a timestamp, this is the matching timestamp among the
    /// `previous` ones together with its references.
    ///
    /// Versions 1 and 2 of the index list whole attributes, so all values
    /// of a listed attribute are covered. Version 3 lists each value.
    fn indexed_unsigned_attr_references(
        &self, index: &AtsHashIndex, previous: &[TimestampToken]
    ) -> Vec<TimestampedReference> {
        let algorithm = index.digest_algorithm();
        let version = index.version();
        let listed = |octets: &Vec<u8>| {
            index.contains_unsigned_attr(&algorithm.message_digest(octets))
        };
        let mut res = Vec::new();
        for attr in self.signature.unsigned_attrs() {
            let octets = match version.attribute_octets(attr) {
                Ok(octets) => octets,
                Err(err) => {
                    warn!(
                        "Cannot encode unsigned attribute {}: {}",
                        attr.attr_type(), err
                    );
                    continue
                }
            };
            let covered: Vec<&Tlv> = match version {
                AtsHashIndexVersion::V3 => {
                    attr.values().iter().zip(&octets).filter(|&(_, octets)| {
                        listed(octets)
                    }).map(|(value, _)| value).collect()
                }
                _ => {
                    if octets.iter().any(listed) {
                        attr.values().iter().collect()
                    }
                    else {
                        Vec::new()
                    }
                }
            };
            for value in covered {
                add_references(
                    &mut res,
                    self.unsigned_property_references(attr, value, previous)
                );
            }
        }
        res
    }

    fn unsigned_property_references(
        &self, attr: &Attribute, value: &Tlv, previous: &[TimestampToken]
    ) -> Vec<TimestampedReference> {
        let kind = attr.kind();
        if kind.is_timestamp() {
            let encoded = match value.to_der() {
                Ok(encoded) => encoded,
                Err(err) => {
                    warn!(
                        "Cannot encode timestamp in unsigned attribute {}: {}",
                        attr.attr_type(), err
                    );
                    return Vec::new()
                }
            };
            match previous.iter().find(|token| {
                token.encoded().as_ref() == encoded.as_slice()
            }) {
                Some(token) => self.timestamp_references(token),
                None => {
                    warn!(
                        "The timestamp order is broken. Unable to find a \
                         covered timestamp."
                    );
                    Vec::new()
                }
            }
        }
        else if kind.is_certificate_refs() {
            self.certificate_refs_references(attr)
        }
        else if kind.is_revocation_refs() {
            self.revocation_refs_references(attr)
        }
        else if kind == AttributeKind::CertificateValues {
            self.certificate_values_references(attr)
        }
        else if kind == AttributeKind::RevocationValues {
            self.revocation_values_references(attr)
        }
        else if kind == AttributeKind::CounterSignature {
            self.counter_signatures_references(attr)
        }
        else {
            warn!(
                "Unable to resolve unsigned attribute {} listed in \
                 ATS-hash-index.",
                attr.attr_type()
            );
            Vec::new()
        }
    }
}

/// # Resolving References
///
impl CadesTimestampSource {
    /// Returns the references covered when covering other timestamps.
    fn encapsulated_references<'a, I>(
        &self, tokens: I
    ) -> Vec<TimestampedReference>
    where I: IntoIterator<Item = &'a TimestampToken> {
        let mut res = Vec::new();
        for token in tokens {
            add_references(&mut res, self.timestamp_references(token))
        }
        res
    }

    /// Returns the references covered when covering a timestamp.
    ///
    /// This is the timestamp itself, its references, and the validation
    /// data it contains.
    fn timestamp_references(
        &self, token: &TimestampToken
    ) -> Vec<TimestampedReference> {
        let mut res = vec![TimestampedReference::new(
            token.id().clone(), TimestampedObjectType::Timestamp
        )];
        add_references(&mut res, token.references().iter().cloned());
        add_references(&mut res, self.timestamp_values_references(token));
        res
    }

    /// Returns the references to the validation data inside a timestamp.
    fn timestamp_values_references(
        &self, token: &TimestampToken
    ) -> Vec<TimestampedReference> {
        let sources = token.sources();
        let mut res = certificate_references(sources.certificates.iter());
        add_references(&mut res, self.certificate_ref_references(
            &timestamp_certificate_refs(token), Some(&sources.certificates)
        ));
        add_references(&mut res, crl_references(sources.crls.iter()));
        for ocsp in sources.ocsp.iter() {
            add_references(&mut res, self.ocsp_references(ocsp))
        }
        res
    }

    /// Resolves certificate references.
    ///
    /// References are looked up in `local` first and then in all tokens
    /// known to the source. If a reference cannot be resolved, a reference
    /// based on the digest is returned instead.
    fn certificate_ref_references(
        &self, refs: &[CertificateRef], local: Option<&CertificateSource>
    ) -> Vec<TimestampedReference> {
        let mut res = Vec::new();
        for cert_ref in refs {
            let found = local.and_then(|local| {
                local.find_by_digest(cert_ref.digest())
            }).or_else(|| {
                self.sources.certificates.find_by_digest(cert_ref.digest())
            });
            let id = match found {
                Some(cert) => cert.id().clone(),
                None => {
                    Identifier::from_digest(
                        IdentifierKind::Certificate, cert_ref.digest()
                    )
                }
            };
            add_reference(&mut res, TimestampedReference::new(
                id, TimestampedObjectType::Certificate
            ));
        }
        res
    }

    fn revocation_ref_references(
        &self, revocation_ref: &RevocationRef
    ) -> Vec<TimestampedReference> {
        match *revocation_ref {
            RevocationRef::Crl(ref digest) => {
                let id = match self.sources.crls.find_by_digest(digest) {
                    Some(crl) => crl.id().clone(),
                    None => {
                        Identifier::from_digest(
                            IdentifierKind::Revocation, digest
                        )
                    }
                };
                vec![TimestampedReference::new(id, TimestampedObjectType::Crl)]
            }
            RevocationRef::Ocsp { ref digest, produced_at } => {
                let found = match digest.as_ref() {
                    Some(digest) => self.sources.ocsp.find_by_digest(digest),
                    None => self.sources.ocsp.find_by_produced_at(produced_at)
                };
                if let Some(ocsp) = found {
                    return self.ocsp_references(ocsp)
                }
                let id = match digest.as_ref() {
                    Some(digest) => {
                        Identifier::from_digest(
                            IdentifierKind::Revocation, digest
                        )
                    }
                    None => {
                        Identifier::new(
                            IdentifierKind::Revocation,
                            produced_at.to_rfc3339().as_bytes()
                        )
                    }
                };
                vec![TimestampedReference::new(
                    id, TimestampedObjectType::Ocsp
                )]
            }
        }
    }

    /// Returns the references for an OCSP response.
    ///
    /// These are the response itself and the certificates it contains.
    fn ocsp_references(
        &self, ocsp: &OcspResponseBinary
    ) -> Vec<TimestampedReference> {
        let mut res = vec![TimestampedReference::new(
            ocsp.id().clone(), TimestampedObjectType::Ocsp
        )];
        add_references(
            &mut res, certificate_references(ocsp.certificates().iter())
        );
        res
    }
}


//------------ Helper Functions ----------------------------------------------

fn certificate_references<'a, I>(certs: I) -> Vec<TimestampedReference>
where I: Iterator<Item = &'a CertificateToken> {
    let mut res = Vec::new();
    for cert in certs {
        add_reference(&mut res, TimestampedReference::new(
            cert.id().clone(), TimestampedObjectType::Certificate
        ))
    }
    res
}

fn crl_references<'a, I>(crls: I) -> Vec<TimestampedReference>
where I: Iterator<Item = &'a CrlBinary> {
    let mut res = Vec::new();
    for crl in crls {
        add_reference(&mut res, TimestampedReference::new(
            crl.id().clone(), TimestampedObjectType::Crl
        ))
    }
    res
}

/// Returns the certificates of a signature’s certificate-values attributes.
fn own_certificate_values(signature: &CadesSignature) -> Vec<CertificateToken> {
    signature.unsigned_attrs().of_kind(
        AttributeKind::CertificateValues
    ).flat_map(|attr| {
        signature.certificate_values(attr.values())
    }).collect()
}

/// Returns the signing certificate references of a timestamp’s signer.
fn timestamp_certificate_refs(token: &TimestampToken) -> Vec<CertificateRef> {
    let info = match token.signed_data().signer_infos().first() {
        Some(info) => info,
        None => return Vec::new()
    };
    let mut res = Vec::new();
    for attr in info.signed_attrs() {
        for value in attr.values() {
            let refs = match attr.kind() {
                AttributeKind::SigningCertificate => {
                    CertificateRef::from_signing_certificate(value)
                }
                AttributeKind::SigningCertificateV2 => {
                    CertificateRef::from_signing_certificate_v2(value)
                }
                _ => continue
            };
            match refs {
                Ok(refs) => res.extend(refs),
                Err(err) => {
                    debug!(
                        "Malformed signing certificate in timestamp {}: {}",
                        token.id(), err
                    );
                }
            }
        }
    }
    res
}


//============ Tests =========================================================
