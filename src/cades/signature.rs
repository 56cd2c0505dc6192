//! CAdES signatures.

use std::sync::Arc;
use bcder::Oid;
use bytes::Bytes;
use log::warn;
use crate::cms::{
    Attribute, Attributes, AttributeKind, SignedData, SignerInfo
};
use crate::config::Config;
use crate::der::Tlv;
use crate::error::{self, MessageImprintError};
use crate::oid;
use crate::timestamp::reference::{Identifier, IdentifierKind};
use super::refs::{certificate_values, CertificateRef, RevocationValues};
use super::sources::{
    CertificateToken, CrlBinary, OcspResponseBinary, Sources
};


//------------ DetachedDocument ----------------------------------------------

/// A document signed by a detached signature.
#[derive(Clone, Debug)]
pub struct DetachedDocument {
    name: Option<String>,
    content: Bytes,
}

impl DetachedDocument {
    pub fn new(name: Option<String>, content: impl Into<Bytes>) -> Self {
        DetachedDocument { name, content: content.into() }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}


//------------ CadesSignature ------------------------------------------------

/// A single signature of a CAdES signed data value.
///
/// This is either one of the signer infos of the signed data or a counter
/// signature of some other signature. In the latter case, the counter
/// signature refers to the signature it countersigns as its master.
#[derive(Clone, Debug)]
pub struct CadesSignature {
    signed_data: Arc<SignedData>,
    signer_info: SignerInfo,
    documents: Arc<Vec<DetachedDocument>>,
    master: Option<Box<CadesSignature>>,
    id: Identifier,
    config: Config,
}

impl CadesSignature {
    /// Decodes all signatures of an encoded CAdES signature.
    ///
    /// The `documents` are the signed documents for a detached signature.
    /// Returns one value for each signer info.
    pub fn decode(
        source: Bytes,
        documents: Vec<DetachedDocument>,
        config: &Config,
    ) -> Result<Vec<Self>, error::DecodeError> {
        let signed_data = Arc::new(
            SignedData::decode(source, config.strict())?
        );
        let documents = Arc::new(documents);
        Ok(signed_data.signer_infos().iter().map(|info| {
            Self::new(
                signed_data.clone(), info.clone(), documents.clone(), *config
            )
        }).collect())
    }

    /// Creates a signature for one signer info of a signed data value.
    pub fn new(
        signed_data: Arc<SignedData>,
        signer_info: SignerInfo,
        documents: Arc<Vec<DetachedDocument>>,
        config: Config,
    ) -> Self {
        CadesSignature {
            id: Self::make_id(&signer_info),
            signed_data, signer_info, documents,
            master: None,
            config,
        }
    }

    fn make_id(signer_info: &SignerInfo) -> Identifier {
        match signer_info.to_der() {
            Ok(der) => Identifier::new(IdentifierKind::Signature, &der),
            Err(_) => {
                Identifier::new(
                    IdentifierKind::Signature, signer_info.raw().raw()
                )
            }
        }
    }

    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    pub fn signer_info(&self) -> &SignerInfo {
        &self.signer_info
    }

    pub fn signed_attrs(&self) -> &Attributes {
        self.signer_info.signed_attrs()
    }

    pub fn unsigned_attrs(&self) -> &Attributes {
        self.signer_info.unsigned_attrs()
    }

    /// Returns the content of the signature value.
    pub fn signature_value(&self) -> &Bytes {
        self.signer_info.signature()
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn documents(&self) -> &[DetachedDocument] {
        &self.documents
    }

    /// Returns the signature this signature countersigns.
    pub fn master_signature(&self) -> Option<&CadesSignature> {
        self.master.as_deref()
    }

    pub fn is_counter_signature(&self) -> bool {
        self.master.is_some()
    }
}

/// # Signed Content
///
impl CadesSignature {
    /// Returns the data that has been signed by the signature.
    ///
    /// For a counter signature, this is the signature value of its master.
    /// Otherwise it is the signed content.
    pub fn original_document(&self) -> Result<Bytes, MessageImprintError> {
        match self.master.as_ref() {
            Some(master) => Ok(master.signature_value().clone()),
            None => self.signed_content(),
        }
    }

    /// Returns the content of the signed data.
    ///
    /// This is the encapsulated content or, if the signature is detached,
    /// the single detached document.
    pub fn signed_content(&self) -> Result<Bytes, MessageImprintError> {
        let encap = self.signed_data.encap_content_info();
        if let Some(content) = encap.content() {
            return Ok(content.clone())
        }
        match self.documents.len() {
            0 => Err(MessageImprintError::missing_original_document()),
            1 => Ok(self.documents[0].content().clone()),
            _ => Err(MessageImprintError::ambiguous_detached_contents()),
        }
    }

    /// Returns whether the signed content isn’t part of the signature.
    pub fn is_detached(&self) -> bool {
        self.master.is_none()
            && self.signed_data.encap_content_info().is_detached()
    }

    /// Returns the identifier of the signed document if it is available.
    pub fn document_id(&self) -> Option<Identifier> {
        if self.is_counter_signature() {
            return None
        }
        self.original_document().ok().map(|document| {
            Identifier::new(IdentifierKind::Document, &document)
        })
    }
}

/// # Counter Signatures
///
impl CadesSignature {
    /// Returns the counter signatures of this signature.
    ///
    /// Counter signatures that fail to decode are skipped with a warning.
    pub fn counter_signatures(&self) -> Vec<CadesSignature> {
        self.unsigned_attrs().of_kind(
            AttributeKind::CounterSignature
        ).flat_map(|attr| self.attribute_counter_signatures(attr)).collect()
    }

    /// Returns the counter signatures contained in a single attribute.
    pub fn attribute_counter_signatures(
        &self, attr: &Attribute
    ) -> Vec<CadesSignature> {
        let mut res = Vec::new();
        for value in attr.values() {
            match SignerInfo::from_tlv(value.clone()) {
                Ok(info) => res.push(self.make_counter_signature(info)),
                Err(err) => {
                    warn!(
                        "Skipping malformed counter signature \
                         of signature {}: {}", self.id, err
                    );
                }
            }
        }
        res
    }

    fn make_counter_signature(&self, signer_info: SignerInfo) -> Self {
        CadesSignature {
            id: Self::make_id(&signer_info),
            signed_data: self.signed_data.clone(),
            signer_info,
            documents: self.documents.clone(),
            master: Some(Box::new(self.clone())),
            config: self.config,
        }
    }
}

/// # Validation Data
///
impl CadesSignature {
    /// Returns the tokens of the certificates and crls sets.
    pub fn signed_data_sources(&self) -> Sources {
        Sources::from_signed_data(&self.signed_data)
    }

    /// Returns all tokens available to this signature.
    ///
    /// These are the tokens of the signed data plus those found in
    /// certificate-values and revocation-values attributes.
    pub fn sources(&self) -> Sources {
        let mut res = self.signed_data_sources();
        for attr in self.unsigned_attrs() {
            match attr.kind() {
                AttributeKind::CertificateValues => {
                    res.certificates.extend(
                        self.certificate_values(attr.values())
                    );
                }
                AttributeKind::RevocationValues => {
                    let (crls, ocsp) = self.revocation_values(attr.values());
                    res.crls.extend(crls);
                    ocsp.into_iter().for_each(|ocsp| res.add_ocsp(ocsp));
                }
                _ => { }
            }
        }
        res
    }

    /// Returns the certificates of a certificate-values attribute.
    pub fn certificate_values(
        &self, values: &[Tlv]
    ) -> Vec<CertificateToken> {
        let mut res = Vec::new();
        for value in values {
            let certs = match certificate_values(value) {
                Ok(certs) => certs,
                Err(err) => {
                    warn!("Skipping malformed certificate values: {}", err);
                    continue
                }
            };
            for cert in certs {
                match CertificateToken::from_tlv(&cert) {
                    Ok(cert) => res.push(cert),
                    Err(err) => {
                        warn!("Skipping malformed certificate: {}", err)
                    }
                }
            }
        }
        res
    }

    /// Returns the CRLs and OCSP responses of a revocation-values attribute.
    pub fn revocation_values(
        &self, values: &[Tlv]
    ) -> (Vec<CrlBinary>, Vec<OcspResponseBinary>) {
        let mut crls = Vec::new();
        let mut ocsp = Vec::new();
        for value in values {
            let values = match RevocationValues::from_tlv(value) {
                Ok(values) => values,
                Err(err) => {
                    warn!("Skipping malformed revocation values: {}", err);
                    continue
                }
            };
            for item in values.crls {
                match CrlBinary::from_tlv(&item) {
                    Ok(crl) => crls.push(crl),
                    Err(err) => warn!("Skipping malformed CRL: {}", err),
                }
            }
            for item in values.ocsp {
                match OcspResponseBinary::from_basic_response(
                    &item, Oid(Bytes::from_static(oid::PKIX_OCSP_BASIC.0))
                ) {
                    Ok(item) => ocsp.push(item),
                    Err(err) => {
                        warn!("Skipping malformed OCSP response: {}", err)
                    }
                }
            }
        }
        (crls, ocsp)
    }

    /// Returns the references to the signing certificate.
    ///
    /// These are taken from the signing-certificate and
    /// signing-certificate-v2 signed attributes.
    pub fn signing_certificate_refs(&self) -> Vec<CertificateRef> {
        let mut res = Vec::new();
        for attr in self.signed_attrs() {
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
                        warn!(
                            "Malformed signing certificate attribute in \
                             signature {}: {}", self.id, err
                        );
                    }
                }
            }
        }
        res
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::test;

    fn decode(
        data: Vec<u8>, documents: Vec<DetachedDocument>
    ) -> CadesSignature {
        CadesSignature::decode(
            Bytes::from(data), documents, &Config::default()
        ).unwrap().into_iter().next().unwrap()
    }

    #[test]
    fn attached_document() {
        let sig = decode(
            test::SignedDataBuilder::new()
                .content(b"hello".as_ref())
                .signer_info(test::SignerInfoBuilder::new(b"sig").build())
                .build(),
            Vec::new()
        );
        assert!(!sig.is_detached());
        assert_eq!(sig.original_document().unwrap().as_ref(), b"hello");
        assert_eq!(
            sig.document_id(),
            Some(Identifier::new(IdentifierKind::Document, b"hello"))
        );
        assert_eq!(sig.signature_value().as_ref(), b"sig");
    }

    #[test]
    fn detached_documents() {
        let data = test::SignedDataBuilder::new()
            .signer_info(test::SignerInfoBuilder::new(b"sig").build())
            .build();
        let sig = decode(data.clone(), Vec::new());
        assert!(sig.is_detached());
        assert!(
            sig.original_document().unwrap_err().is_missing_original_document()
        );
        assert!(sig.document_id().is_none());

        let sig = decode(data.clone(), vec![
            DetachedDocument::new(Some("doc.txt".into()), &b"doc"[..])
        ]);
        assert_eq!(sig.original_document().unwrap().as_ref(), b"doc");

        let sig = decode(data, vec![
            DetachedDocument::new(None, &b"one"[..]),
            DetachedDocument::new(None, &b"two"[..]),
        ]);
        assert!(sig.original_document().is_err());
    }

    #[test]
    fn counter_signatures() {
        let counter = test::SignerInfoBuilder::new(b"counter").build();
        let data = test::SignedDataBuilder::new()
            .content(b"hello".as_ref())
            .signer_info(
                test::SignerInfoBuilder::new(b"master")
                    .unsigned_attr(test::attr(
                        crate::oid::COUNTER_SIGNATURE, counter
                    ))
                    .build()
            )
            .build();
        let sig = decode(data, Vec::new());
        let counters = sig.counter_signatures();
        assert_eq!(counters.len(), 1);
        let counter = &counters[0];
        assert!(counter.is_counter_signature());
        assert_eq!(counter.signature_value().as_ref(), b"counter");
        assert_eq!(counter.original_document().unwrap().as_ref(), b"master");
        assert_eq!(counter.signed_content().unwrap().as_ref(), b"hello");
        assert_eq!(counter.master_signature().unwrap().id(), sig.id());
        assert!(counter.document_id().is_none());
        assert_ne!(counter.id(), sig.id());
    }

    #[test]
    fn signing_certificate() {
        let digest = crate::crypto::DigestAlgorithm::Sha256.message_digest(
            b"cert"
        );
        let data = test::SignedDataBuilder::new()
            .signer_info(
                test::SignerInfoBuilder::new(b"sig")
                    .signed_attr(test::attr(
                        crate::oid::AA_SIGNING_CERTIFICATE_V2,
                        test::signing_certificate_v2(&digest, false)
                    ))
                    .build()
            )
            .build();
        let sig = decode(data, Vec::new());
        let refs = sig.signing_certificate_refs();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].digest(), &digest);
    }

    #[test]
    fn validation_data_values() {
        let data = test::SignedDataBuilder::new()
            .certificate(test::certificate("signer"))
            .signer_info(
                test::SignerInfoBuilder::new(b"sig")
                    .unsigned_attr(test::attr(
                        crate::oid::AA_ETS_CERT_VALUES,
                        test::sequence(&[test::certificate("ca")])
                    ))
                    .unsigned_attr(test::attr(
                        crate::oid::AA_ETS_REVOCATION_VALUES,
                        test::revocation_values(&[test::crl("crl")], &[])
                    ))
                    .build()
            )
            .build();
        let sig = decode(data, Vec::new());
        let sources = sig.sources();
        assert_eq!(sources.certificates.len(), 2);
        assert_eq!(sources.crls.len(), 1);
        assert_eq!(sig.signed_data_sources().certificates.len(), 1);
    }
}
