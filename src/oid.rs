//! The object identifiers used in this crate.
//!
//! This module collects all the object indentifiers used at various places
//! in this crate in one central place. They are public so you can refer to
//! them should that ever become necessary.

use bcder::{ConstOid, Oid};


//------------ Digest Algorithms ---------------------------------------------

/// [RFC 3279](https://tools.ietf.org/html/rfc3279) `id-sha1`
pub const SHA1: ConstOid = Oid(&[43, 14, 3, 2, 26]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha256`
///
/// Identifies the SHA-256 one-way hash function.
pub const SHA256: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha384`
pub const SHA384: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 2]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `id-sha512`
pub const SHA512: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 3]);


//------------ CMS Content Types ---------------------------------------------

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-data`
pub const DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-signedData`
pub const SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// [RFC 3161](https://tools.ietf.org/html/rfc3161) `id-ct-TSTInfo`
pub const CT_TST_INFO: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 1, 4]);


//------------ CMS Attributes ------------------------------------------------

pub const CONTENT_TYPE: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);
pub const MESSAGE_DIGEST: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);
pub const SIGNING_TIME: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 5]);

/// [RFC 5652](https://tools.ietf.org/html/rfc5652) `id-countersignature`
pub const COUNTER_SIGNATURE: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 6]);


//------------ ETSI and ESS Attributes ---------------------------------------
//
// Most of these live under `id-aa`, 1.2.840.113549.1.9.16.2.

/// [RFC 2634](https://tools.ietf.org/html/rfc2634) `id-aa-signingCertificate`
pub const AA_SIGNING_CERTIFICATE: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 12]);

/// [RFC 3161](https://tools.ietf.org/html/rfc3161)
/// `id-aa-signatureTimeStampToken`
pub const AA_SIGNATURE_TIME_STAMP_TOKEN: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 14]);

/// `id-aa-ets-contentTimestamp`
pub const AA_ETS_CONTENT_TIMESTAMP: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 20]);

/// `id-aa-ets-certificateRefs`
pub const AA_ETS_CERTIFICATE_REFS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 21]);

/// `id-aa-ets-revocationRefs`
pub const AA_ETS_REVOCATION_REFS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 22]);

/// `id-aa-ets-certValues`
pub const AA_ETS_CERT_VALUES: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 23]);

/// `id-aa-ets-revocationValues`
pub const AA_ETS_REVOCATION_VALUES: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 24]);

/// `id-aa-ets-escTimeStamp`, the CAdES-C-time-stamp or X1 timestamp.
pub const AA_ETS_ESC_TIME_STAMP: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 25]);

/// `id-aa-ets-certCRLTimestamp`, the time-stamped certificates and CRLs
/// or X2 timestamp.
pub const AA_ETS_CERT_CRL_TIMESTAMP: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 26]);

/// `id-aa-ets-attrCertificateRefs`
pub const AA_ETS_ATTR_CERTIFICATE_REFS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 44]);

/// `id-aa-ets-attrRevocationRefs`
pub const AA_ETS_ATTR_REVOCATION_REFS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 45]);

/// [RFC 5035](https://tools.ietf.org/html/rfc5035)
/// `id-aa-signingCertificateV2`
pub const AA_SIGNING_CERTIFICATE_V2: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 47]);

/// `id-aa-ets-archiveTimestampV2`
pub const AA_ETS_ARCHIVE_TIMESTAMP_V2: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 16, 2, 48]);

/// ETSI TS 101 733 `id-aa-ets-archiveTimestampV3`, 0.4.0.1733.2.4
pub const AA_ETS_ARCHIVE_TIMESTAMP_V3: ConstOid
    = Oid(&[4, 0, 141, 69, 2, 4]);

/// ETSI TS 101 733 `id-aa-ATSHashIndex`, 0.4.0.1733.2.5
pub const AA_ATS_HASH_INDEX: ConstOid = Oid(&[4, 0, 141, 69, 2, 5]);

/// ETSI EN 319 122-1 `id-aa-ets-sigPolicyStore`, 0.4.0.19122.1.3
pub const AA_ETS_SIG_POLICY_STORE: ConstOid
    = Oid(&[4, 0, 129, 149, 50, 1, 3]);

/// ETSI EN 319 122-1 v1.0.0 `id-aa-ATSHashIndex-v2`, 0.4.0.19122.1.4
pub const AA_ATS_HASH_INDEX_V2: ConstOid = Oid(&[4, 0, 129, 149, 50, 1, 4]);

/// ETSI EN 319 122-1 v1.1.1 `id-aa-ATSHashIndex-v3`, 0.4.0.19122.1.5
pub const AA_ATS_HASH_INDEX_V3: ConstOid = Oid(&[4, 0, 129, 149, 50, 1, 5]);


//------------ Revocation Information ----------------------------------------

/// [RFC 6960](https://tools.ietf.org/html/rfc6960) `id-pkix-ocsp-basic`
pub const PKIX_OCSP_BASIC: ConstOid
    = Oid(&[43, 6, 1, 5, 5, 7, 48, 1, 1]);

/// [RFC 5940](https://tools.ietf.org/html/rfc5940) `id-ri-ocsp-response`
pub const RI_OCSP_RESPONSE: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 16, 2]);
