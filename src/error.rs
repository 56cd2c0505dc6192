//! Error handling.

use std::{error, fmt, io};
use std::convert::Infallible;
use crate::der::EncodingError;

pub use bcder::decode::ContentError;

/// The error produced when decoding data from memory.
pub type DecodeError = bcder::decode::DecodeError<Infallible>;


//------------ MessageImprintError -------------------------------------------

/// The data covered by a timestamp could not be determined.
///
/// This error is produced by the functions building the message imprint of
/// a timestamp. It is turned into an empty message digest by the public
/// methods of the message digest builders.
#[derive(Debug)]
pub struct MessageImprintError {
    kind: MessageImprintErrorKind,
}

#[derive(Debug)]
enum MessageImprintErrorKind {
    /// Some part of the signature failed to decode.
    Decoding(DecodeError),

    /// Some part of the signature could not be re-encoded.
    Encoding(EncodingError),

    /// The original document of a detached signature is not available.
    MissingOriginalDocument,

    /// There is more than one detached document to choose from.
    AmbiguousDetachedContents,

    /// An archive timestamp v3 has no ATS-hash-index attribute.
    MissingAtsHashIndex,

    /// The timestamp wasn’t produced with a supported digest algorithm.
    UnsupportedDigestAlgorithm,

    /// The timestamp is not an archive timestamp of a known type.
    UnsupportedArchiveType,

    /// Writing the data failed.
    Io(io::Error),
}

impl MessageImprintError {
    pub(crate) fn missing_original_document() -> Self {
        MessageImprintErrorKind::MissingOriginalDocument.into()
    }

    pub(crate) fn ambiguous_detached_contents() -> Self {
        MessageImprintErrorKind::AmbiguousDetachedContents.into()
    }

    pub(crate) fn missing_ats_hash_index() -> Self {
        MessageImprintErrorKind::MissingAtsHashIndex.into()
    }

    pub(crate) fn unsupported_digest_algorithm() -> Self {
        MessageImprintErrorKind::UnsupportedDigestAlgorithm.into()
    }

    pub(crate) fn unsupported_archive_type() -> Self {
        MessageImprintErrorKind::UnsupportedArchiveType.into()
    }

    /// Returns whether the error was caused by a missing document.
    pub fn is_missing_original_document(&self) -> bool {
        matches!(
            self.kind,
            MessageImprintErrorKind::MissingOriginalDocument
            | MessageImprintErrorKind::AmbiguousDetachedContents
        )
    }
}

impl From<MessageImprintErrorKind> for MessageImprintError {
    fn from(kind: MessageImprintErrorKind) -> Self {
        MessageImprintError { kind }
    }
}

impl From<DecodeError> for MessageImprintError {
    fn from(err: DecodeError) -> Self {
        MessageImprintErrorKind::Decoding(err).into()
    }
}

impl From<ContentError> for MessageImprintError {
    fn from(err: ContentError) -> Self {
        MessageImprintErrorKind::Decoding(
            DecodeError::content(err, Default::default())
        ).into()
    }
}

impl From<EncodingError> for MessageImprintError {
    fn from(err: EncodingError) -> Self {
        MessageImprintErrorKind::Encoding(err).into()
    }
}

impl From<io::Error> for MessageImprintError {
    fn from(err: io::Error) -> Self {
        MessageImprintErrorKind::Io(err).into()
    }
}

impl fmt::Display for MessageImprintError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            MessageImprintErrorKind::Decoding(ref err) => {
                write!(f, "decoding failed: {}", err)
            }
            MessageImprintErrorKind::Encoding(ref err) => {
                write!(f, "re-encoding failed: {}", err)
            }
            MessageImprintErrorKind::MissingOriginalDocument => {
                f.write_str("original document not found")
            }
            MessageImprintErrorKind::AmbiguousDetachedContents => {
                f.write_str("more than one detached document provided")
            }
            MessageImprintErrorKind::MissingAtsHashIndex => {
                f.write_str("no ATS-hash-index attribute in timestamp")
            }
            MessageImprintErrorKind::UnsupportedDigestAlgorithm => {
                f.write_str("unsupported digest algorithm")
            }
            MessageImprintErrorKind::UnsupportedArchiveType => {
                f.write_str("unsupported archive timestamp type")
            }
            MessageImprintErrorKind::Io(ref err) => {
                write!(f, "writing data failed: {}", err)
            }
        }
    }
}

impl error::Error for MessageImprintError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            MessageImprintError::missing_original_document().to_string(),
            "original document not found"
        );
        assert!(
            MessageImprintError::ambiguous_detached_contents()
                .is_missing_original_document()
        );
        assert!(
            !MessageImprintError::from(EncodingError::new("short value"))
                .is_missing_original_document()
        );
        assert_eq!(
            MessageImprintError::from(EncodingError::new("short value"))
                .to_string(),
            "re-encoding failed: short value"
        );
    }
}
