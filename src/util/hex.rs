//! Converting octet sequences into hex strings.

use std::fmt;


/// Encodes an octet sequence as an upper case hex string.
pub fn encode(src: &[u8]) -> String {
    let mut res = String::with_capacity(src.len() * 2);
    for ch in src {
        let [high, low] = encode_u8(*ch);
        res.push(char::from(high));
        res.push(char::from(low));
    }
    res
}

/// Encodes a single octet as two hex digits.
pub fn encode_u8(ch: u8) -> [u8; 2] {
    [DIGITS[usize::from(ch >> 4)], DIGITS[usize::from(ch & 0x0F)]]
}

const DIGITS: &[u8] = b"0123456789ABCDEF";


//------------ Hex -----------------------------------------------------------

/// A wrapper displaying an octet sequence in hex.
///
/// This is used for trace logging of the data fed into digests without
/// having to allocate a string unless the log level is enabled.
pub struct Hex<'a>(pub &'a [u8]);

impl<'a> fmt::Display for Hex<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for ch in self.0 {
            let [high, low] = encode_u8(*ch);
            write!(f, "{}{}", char::from(high), char::from(low))?;
        }
        Ok(())
    }
}


//============ Tests =========================================================
