//! CAdES signatures and the validation data they carry.

pub use self::signature::{CadesSignature, DetachedDocument};
pub use self::sources::{
    CertificateSource, CertificateToken, CrlBinary, CrlSource,
    OcspResponseBinary, OcspSource, Sources, Token, TokenSource,
};

pub mod refs;
pub mod signature;
pub mod sources;
