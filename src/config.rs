//! Configuration.

use bcder::Mode;
use crate::crypto::DigestAlgorithm;


//------------ Config --------------------------------------------------------

/// Configuration for processing CAdES signatures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// The digest algorithm assumed for an ATS-hash-index without one.
    ///
    /// The ATS-hash-index of an archive timestamp v3 may leave out its
    /// hash algorithm. In this case, the algorithm given here is used. It
    /// defaults to SHA-256 which is what everyone creating such indexes
    /// uses. Changing it will break verification of existing signatures.
    archive_hash_algorithm: DigestAlgorithm,

    /// Whether to insist on DER encoding.
    ///
    /// By default, BER encoded signatures are accepted.
    strict: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn archive_hash_algorithm(&self) -> DigestAlgorithm {
        self.archive_hash_algorithm
    }

    pub fn set_archive_hash_algorithm(&mut self, alg: DigestAlgorithm) {
        self.archive_hash_algorithm = alg
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict
    }

    /// Returns the decoding mode to use for signatures.
    pub fn mode(&self) -> Mode {
        if self.strict {
            Mode::Der
        }
        else {
            Mode::Ber
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            archive_hash_algorithm: DigestAlgorithm::Sha256,
            strict: false,
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let mut config = Config::new();
        assert_eq!(config.archive_hash_algorithm(), DigestAlgorithm::Sha256);
        assert_eq!(config.mode(), Mode::Ber);
        config.set_strict(true);
        assert_eq!(config.mode(), Mode::Der);
    }
}
