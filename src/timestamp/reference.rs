//! Identifiers and references to timestamped objects.

use std::fmt;
use crate::crypto::{DigestAlgorithm, MessageDigest};
use crate::util::hex;


//------------ IdentifierKind ------------------------------------------------

/// The kind of object an identifier refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IdentifierKind {
    Certificate,

    /// A CRL or OCSP response.
    Revocation,

    Timestamp,
    Signature,

    /// The signed document.
    Document,
}

impl IdentifierKind {
    fn prefix(self) -> &'static str {
        match self {
            IdentifierKind::Certificate => "C-",
            IdentifierKind::Revocation => "R-",
            IdentifierKind::Timestamp => "T-",
            IdentifierKind::Signature => "S-",
            IdentifierKind::Document => "D-",
        }
    }
}


//------------ Identifier ----------------------------------------------------

/// The identifier of a token or signature.
///
/// Identifiers are derived from the SHA-256 digest of the encoded object.
/// They are prefixed by a short string indicating the kind of object.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identifier(String);

impl Identifier {
    /// Creates the identifier for an encoded object.
    pub fn new(kind: IdentifierKind, encoded: &[u8]) -> Self {
        Self::from_digest_value(
            kind, DigestAlgorithm::Sha256.digest(encoded).as_ref()
        )
    }

    /// Creates an identifier from a digest of the object.
    ///
    /// This is used for objects only known through a reference.
    pub fn from_digest(kind: IdentifierKind, digest: &MessageDigest) -> Self {
        Self::from_digest_value(kind, digest.value().as_ref())
    }

    fn from_digest_value(kind: IdentifierKind, value: &[u8]) -> Self {
        let mut res = String::from(kind.prefix());
        res.push_str(&hex::encode(value));
        Identifier(res)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}


//------------ TimestampedObjectType -----------------------------------------

/// The type of an object covered by a timestamp.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampedObjectType {
    Signature,
    Certificate,
    Crl,
    Ocsp,
    Timestamp,

    /// The signed data, i.e., the signed document.
    SignedData,
}

impl fmt::Display for TimestampedObjectType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            TimestampedObjectType::Signature => "SIGNATURE",
            TimestampedObjectType::Certificate => "CERTIFICATE",
            TimestampedObjectType::Crl => "CRL",
            TimestampedObjectType::Ocsp => "OCSP",
            TimestampedObjectType::Timestamp => "TIMESTAMP",
            TimestampedObjectType::SignedData => "SIGNED_DATA",
        })
    }
}


//------------ TimestampedReference ------------------------------------------

/// A reference to an object covered by a timestamp.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimestampedReference {
    id: Identifier,
    object_type: TimestampedObjectType,
}

impl TimestampedReference {
    pub fn new(id: Identifier, object_type: TimestampedObjectType) -> Self {
        TimestampedReference { id, object_type }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn object_type(&self) -> TimestampedObjectType {
        self.object_type
    }
}

impl fmt::Display for TimestampedReference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.object_type, self.id)
    }
}


//------------ Functions -----------------------------------------------------

/// Adds a reference unless it is already present.
pub fn add_reference(
    target: &mut Vec<TimestampedReference>, reference: TimestampedReference
) {
    if !target.contains(&reference) {
        target.push(reference)
    }
}

/// Adds all references not yet present, keeping their order.
pub fn add_references<I>(target: &mut Vec<TimestampedReference>, refs: I)
where I: IntoIterator<Item = TimestampedReference> {
    for reference in refs {
        add_reference(target, reference)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identifiers() {
        let id = Identifier::new(IdentifierKind::Certificate, b"");
        assert_eq!(
            id.as_str(),
            "C-E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855"
        );
        let digest = MessageDigest::new(DigestAlgorithm::Sha1, &b"\x01\xff"[..]);
        assert_eq!(
            Identifier::from_digest(IdentifierKind::Revocation, &digest)
                .to_string(),
            "R-01FF"
        );
    }

    #[test]
    fn references_are_deduplicated() {
        let cert = TimestampedReference::new(
            Identifier::new(IdentifierKind::Certificate, b"cert"),
            TimestampedObjectType::Certificate,
        );
        let sig = TimestampedReference::new(
            Identifier::new(IdentifierKind::Signature, b"sig"),
            TimestampedObjectType::Signature,
        );
        let mut refs = vec![cert.clone()];
        add_references(&mut refs, vec![sig.clone(), cert.clone(), sig.clone()]);
        assert_eq!(refs, vec![cert, sig]);
    }
}
