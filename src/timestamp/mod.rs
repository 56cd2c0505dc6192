//! Timestamps in CAdES signatures.
//!
//! A CAdES signature can carry a number of RFC 3161 timestamp tokens in
//! its signed and unsigned attributes. Each of them covers some data that
//! is derived from the signature. The [`digest_builder`] module produces
//! the message imprints to check the tokens against. The [`source`]
//! module determines which objects each token covers.

pub use self::ats_hash_index::{
    AtsHashIndex, AtsHashIndexBuilder, AtsHashIndexVersion
};
pub use self::digest_builder::{
    CadesMessageDigestBuilder, Strategy, TimestampDataBuilder,
    TimestampMessageDigestBuilder,
};
pub use self::reference::{
    Identifier, IdentifierKind, TimestampedObjectType, TimestampedReference,
};
pub use self::source::CadesTimestampSource;
pub use self::token::{
    ArchiveTimestampType, TimestampToken, TimestampType, TstInfo
};

pub mod ats_hash_index;
pub mod digest_builder;
pub mod reference;
pub mod source;
pub mod token;
