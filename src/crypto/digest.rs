//! Digest algorithm and operations.

use std::{fmt, io};
use bcder::{decode, encode};
use bcder::{ConstOid, Oid};
use bcder::decode::DecodeError;
use bcder::encode::PrimitiveContent;
use bytes::Bytes;
use ring::digest;
use crate::oid;
use crate::util::hex;

// Re-export the things from ring for actual digest generation.
pub use ring::digest::Digest;


//------------ DigestAlgorithm -----------------------------------------------

/// The digest algorithms used by CAdES timestamps.
///
/// Timestamp tokens and ATS-hash-index values may declare any of these.
/// SHA-1 is only supported for reading legacy structures such as the
/// `OtherHash` of CAdES certificate references.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DigestAlgorithm {
    Sha1,

    #[default]
    Sha256,

    Sha384,
    Sha512,
}

/// # Creating Digest Values
///
impl DigestAlgorithm {
    /// Returns the digest of `data` using this algorithm.
    pub fn digest(self, data: &[u8]) -> Digest {
        digest::digest(self.ring_algorithm(), data)
    }

    /// Returns a digest context for multi-step calculation of the digest.
    pub fn start(self) -> Context {
        Context {
            algorithm: self,
            context: digest::Context::new(self.ring_algorithm())
        }
    }

    /// Returns the message digest of `data`.
    pub fn message_digest(self, data: &[u8]) -> MessageDigest {
        MessageDigest::new(
            self, Bytes::copy_from_slice(self.digest(data).as_ref())
        )
    }

    /// Returns the length of a digest value in octets.
    pub fn digest_len(self) -> usize {
        self.ring_algorithm().output_len()
    }

    fn ring_algorithm(self) -> &'static digest::Algorithm {
        match self {
            DigestAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            DigestAlgorithm::Sha256 => &digest::SHA256,
            DigestAlgorithm::Sha384 => &digest::SHA384,
            DigestAlgorithm::Sha512 => &digest::SHA512,
        }
    }
}


/// # ASN.1 Values
///
/// Digest algorithms appear in CMS in the following syntax:
///
/// ```txt
/// DigestAlgorithmIdentifier  ::= AlgorithmIdentifier
/// AlgorithmIdentifier        ::= SEQUENCE {
///      algorithm                 OBJECT IDENTIFIER,
///      parameters                ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// The _parameters_ field may either be absent or `NULL` for all the
/// algorithms supported here.
impl DigestAlgorithm {
    /// Returns the object identifier of the algorithm.
    pub fn oid(self) -> ConstOid {
        match self {
            DigestAlgorithm::Sha1 => oid::SHA1,
            DigestAlgorithm::Sha256 => oid::SHA256,
            DigestAlgorithm::Sha384 => oid::SHA384,
            DigestAlgorithm::Sha512 => oid::SHA512,
        }
    }

    /// Returns the algorithm for the given object identifier if supported.
    pub fn from_oid<T: AsRef<[u8]>>(oid: &Oid<T>) -> Option<Self> {
        [
            DigestAlgorithm::Sha1, DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384, DigestAlgorithm::Sha512,
        ].into_iter().find(|alg| alg.oid().as_ref() == oid.as_ref())
    }

    /// Takes and returns a single digest algorithm identifier.
    ///
    /// Returns a malformed error if the algorithm isn’t one of the supported
    /// algorithms or if the value isn’t correctly encoded.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Takes and returns an optional digest algorithm identifier.
    ///
    /// Returns `Ok(None)` if the next value isn’t a sequence.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(Self::from_constructed)
    }

    /// Parses the algorithm identifier from the contents of its sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let res = Self::take_oid_from(cons)?;
        cons.take_opt_null()?;
        Ok(res)
    }

    /// Takes a single algorithm object identifier from a constructed value.
    pub fn take_oid_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let oid = Oid::take_from(cons)?;
        Self::from_oid(&oid).ok_or_else(|| {
            cons.content_err("unsupported digest algorithm")
        })
    }

    /// Provides an encoder for a single algorithm identifier.
    ///
    /// The parameters are left out.
    pub fn encode(self) -> impl encode::Values {
        encode::sequence(self.oid().encode())
    }

    /// Provides an encoder for just the object identifier of the algorithm.
    pub fn encode_oid(self) -> impl encode::Values {
        self.oid().encode()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
        })
    }
}


//------------ Context -------------------------------------------------------

/// A digest calculation in progress.
///
/// The context implements `io::Write`, so the functions producing the data
/// to be digested can write either into a context or into a vec.
#[derive(Clone)]
pub struct Context {
    algorithm: DigestAlgorithm,
    context: digest::Context,
}

impl Context {
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) {
        self.context.update(data)
    }

    pub fn finish(self) -> Digest {
        self.context.finish()
    }

    /// Finishes the calculation and returns a message digest.
    pub fn finish_message_digest(self) -> MessageDigest {
        let algorithm = self.algorithm;
        MessageDigest::new(
            algorithm, Bytes::copy_from_slice(self.finish().as_ref())
        )
    }
}

impl io::Write for Context {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}


//------------ MessageDigest -------------------------------------------------

/// A digest value together with the algorithm that produced it.
///
/// A message digest can be empty. This happens when the data to be
/// digested could not be determined. An empty message digest never matches
/// any other message digest, including another empty one.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct MessageDigest {
    algorithm: Option<DigestAlgorithm>,
    value: Bytes,
}

impl MessageDigest {
    pub fn new(algorithm: DigestAlgorithm, value: impl Into<Bytes>) -> Self {
        MessageDigest { algorithm: Some(algorithm), value: value.into() }
    }

    /// Returns the empty message digest.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.algorithm.is_none() || self.value.is_empty()
    }

    pub fn algorithm(&self) -> Option<DigestAlgorithm> {
        self.algorithm
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Returns whether the digest is not empty and equals `other`.
    pub fn matches(&self, other: &MessageDigest) -> bool {
        !self.is_empty() && self == other
    }
}

impl fmt::Display for MessageDigest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.algorithm {
            Some(alg) => write!(f, "{}:{}", alg, hex::encode(&self.value)),
            None => f.write_str("<empty>")
        }
    }
}


//============ Tests =========================================================


#[cfg(all(test, feature = "serde"))]
mod test_serde {
    use super::*;
    use serde_test::{Token, assert_tokens};

    #[test]
    fn digest_algorithm() {
        assert_tokens(
            &DigestAlgorithm::Sha384,
            &[Token::UnitVariant { name: "DigestAlgorithm", variant: "Sha384" }]
        );
    }
}
