//! Timestamps in CAdES signatures.
//!
//! _CMS Advanced Electronic Signatures_ (CAdES) extend the signed data of
//! the Cryptographic Message Syntax with attributes that make a signature
//! verifiable for a long time. Most of these carry RFC 3161 timestamp
//! tokens which prove that certain data existed at a certain time.
//!
//! This crate determines for each timestamp of a CAdES signature the data
//! it has been issued over and which signature, certificates, revocation
//! data, and other timestamps it covers. The message imprint of each token
//! is checked against the data. Verifying the signatures of the tokens
//! themselves is left to the caller.
//!
//! The main entry points are [`CadesSignature`] for decoding a signature
//! and [`CadesTimestampSource`] for the timestamps of a signature.
//!
//! [`CadesSignature`]: cades::CadesSignature
//! [`CadesTimestampSource`]: timestamp::CadesTimestampSource

pub use self::config::Config;

pub mod cades;
pub mod cms;
pub mod config;
pub mod crypto;
pub mod der;
pub mod error;
pub mod oid;
pub mod timestamp;
pub mod util;
pub mod x509;

#[cfg(test)]
mod test;
