//! Cryptographic Message Syntax.
//!
//! This module contains the parts of [RFC 5652] needed to process CAdES
//! signatures and RFC 3161 timestamp tokens. All values keep their original
//! encoding so they can be re-encoded for calculating message imprints.
//!
//! [RFC 5652]: https://tools.ietf.org/html/rfc5652

pub use self::attr::{Attribute, AttributeKind, Attributes};
pub use self::signed_data::{EncapContentInfo, EncodedSet, SignedData};
pub use self::signer_info::SignerInfo;

pub mod attr;
pub mod signed_data;
pub mod signer_info;
