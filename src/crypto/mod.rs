//! Cryptographic digests.

pub use self::digest::{Context, Digest, DigestAlgorithm, MessageDigest};

pub mod digest;
