//! Raw tag-length-value access to BER and DER encoded data.
//!
//! Typed values are decoded with bcder throughout this crate. Computing
//! timestamp message imprints, however, requires reproducing exactly the
//! octets an ASN.1 encoder would have produced when re-encoding a value in
//! DER or in indefinite-length BER, including values whose type we never
//! look at. This module provides a minimal walker over encoded values for
//! that purpose.
//!
//! The DER re-encoding implemented by [`Tlv::write_der`] does the
//! following:
//!
//! * all lengths are written in their shortest definite form,
//! * constructed string values are flattened into their primitive form,
//! * the elements of a universal `SET` or `SET OF` are sorted by their
//!   encoding.
//!
//! Values tagged implicitly keep their element order since their type isn’t
//! known from the encoding alone.

use std::{cmp, error, fmt};
use bcder::{decode, Tag};
use bcder::decode::{ContentError, DecodeError};
use bytes::Bytes;


/// The maximum nesting depth we are willing to follow.
const MAX_DEPTH: usize = 64;


//------------ Tlv -----------------------------------------------------------

/// A single encoded value.
#[derive(Clone, Debug)]
pub struct Tlv {
    /// The identifier octets.
    tag: Bytes,

    /// The content octets.
    ///
    /// For values using the indefinite length form, this excludes the
    /// end-of-contents octets.
    content: Bytes,

    /// The complete encoding of the value as found in the source.
    raw: Bytes,

    /// Whether the value uses the indefinite length form.
    indefinite: bool,
}

impl Tlv {
    /// Parses a single value which must span all of `data`.
    pub fn parse(data: Bytes) -> Result<Self, EncodingError> {
        let mut data = data;
        let res = Self::take_from(&mut data)?;
        if !data.is_empty() {
            return Err(EncodingError::new("trailing data after value"))
        }
        Ok(res)
    }

    /// Takes a single value from the beginning of `data`.
    pub fn take_from(data: &mut Bytes) -> Result<Self, EncodingError> {
        Self::take_nested(data, 0)
    }

    /// Captures the next value of a constructed value.
    pub fn capture_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let captured = cons.capture_one()?;
        Self::parse(captured.into_bytes()).map_err(|err| cons.content_err(err))
    }

    /// Captures the next value if it is constructed and has the given tag.
    pub fn capture_opt_constructed_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>, tag: Tag,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        let captured = cons.capture(|cons| {
            cons.take_opt_constructed_if(tag, skip_remaining)?;
            Ok(())
        })?;
        if captured.as_slice().is_empty() {
            return Ok(None)
        }
        Self::parse(captured.into_bytes()).map(Some).map_err(|err| {
            cons.content_err(err)
        })
    }

    fn take_nested(
        data: &mut Bytes, depth: usize
    ) -> Result<Self, EncodingError> {
        if depth > MAX_DEPTH {
            return Err(EncodingError::new("values nested too deeply"))
        }
        let first = octet_at(data, 0)?;
        let mut pos = 1;
        if first & 0x1F == 0x1F {
            loop {
                let octet = octet_at(data, pos)?;
                pos += 1;
                if octet & 0x80 == 0 {
                    break
                }
            }
        }
        let tag_end = pos;
        let len = octet_at(data, pos)?;
        pos += 1;

        if len == 0x80 {
            if first & 0x20 == 0 {
                return Err(EncodingError::new(
                    "indefinite length for primitive value"
                ))
            }
            let mut rest = data.slice(pos..);
            loop {
                if rest.len() < 2 {
                    return Err(EncodingError::new(
                        "missing end-of-contents octets"
                    ))
                }
                if rest[0] == 0 && rest[1] == 0 {
                    break
                }
                Self::take_nested(&mut rest, depth + 1)?;
            }
            let content_end = data.len() - rest.len();
            let end = content_end + 2;
            let res = Tlv {
                tag: data.slice(..tag_end),
                content: data.slice(pos..content_end),
                raw: data.slice(..end),
                indefinite: true,
            };
            *data = data.slice(end..);
            return Ok(res)
        }

        let content_len = if len < 0x80 {
            usize::from(len)
        }
        else {
            let count = usize::from(len & 0x7F);
            if count > std::mem::size_of::<usize>() {
                return Err(EncodingError::new("length value too large"))
            }
            let mut res = 0usize;
            for _ in 0..count {
                res = (res << 8) | usize::from(octet_at(data, pos)?);
                pos += 1;
            }
            res
        };
        let end = match pos.checked_add(content_len) {
            Some(end) if end <= data.len() => end,
            _ => return Err(EncodingError::new("short value"))
        };
        let res = Tlv {
            tag: data.slice(..tag_end),
            content: data.slice(pos..end),
            raw: data.slice(..end),
            indefinite: false,
        };
        *data = data.slice(end..);
        Ok(res)
    }

    /// Returns the identifier octets of the value.
    pub fn tag(&self) -> &[u8] {
        self.tag.as_ref()
    }

    /// Returns whether the value is constructed.
    pub fn is_constructed(&self) -> bool {
        self.tag[0] & 0x20 != 0
    }

    /// Returns whether the value used the indefinite length form.
    pub fn is_indefinite(&self) -> bool {
        self.indefinite
    }

    /// Returns the content octets.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Returns the complete value as it was encoded originally.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Returns the values contained in a constructed value.
    pub fn children(&self) -> Result<Vec<Tlv>, EncodingError> {
        if !self.is_constructed() {
            return Err(EncodingError::new("expected constructed value"))
        }
        Self::split(self.content.clone())
    }

    /// Splits a sequence of encoded values into its elements.
    pub fn split(data: Bytes) -> Result<Vec<Tlv>, EncodingError> {
        let mut data = data;
        let mut res = Vec::new();
        while !data.is_empty() {
            res.push(Self::take_from(&mut data)?)
        }
        Ok(res)
    }
}


/// # Re-encoding
///
impl Tlv {
    /// Returns the DER encoding of the value.
    pub fn to_der(&self) -> Result<Vec<u8>, EncodingError> {
        let mut res = Vec::with_capacity(self.raw.len());
        self.write_der(&mut res)?;
        Ok(res)
    }

    /// Appends the DER encoding of the value to `target`.
    pub fn write_der(&self, target: &mut Vec<u8>) -> Result<(), EncodingError> {
        self.write_der_nested(self.tag.as_ref(), target, 0)
    }

    /// Appends the DER encoding of the value using a different tag.
    ///
    /// The tag replaces the identifier octets of the value. Any sorting
    /// happens according to the original tag. This allows encoding a
    /// `SET OF` as an implicitly tagged value.
    pub fn write_der_as(
        &self, tag: &[u8], target: &mut Vec<u8>
    ) -> Result<(), EncodingError> {
        self.write_der_nested(tag, target, 0)
    }

    fn write_der_nested(
        &self, tag: &[u8], target: &mut Vec<u8>, depth: usize
    ) -> Result<(), EncodingError> {
        if depth > MAX_DEPTH {
            return Err(EncodingError::new("values nested too deeply"))
        }
        if !self.is_constructed() {
            write_header(target, tag, self.content.len());
            target.extend_from_slice(self.content.as_ref());
            return Ok(())
        }
        if let Some(kind) = self.string_kind() {
            let content = self.flatten_string(kind, depth)?;
            let mut tag = Vec::from(tag);
            tag[0] &= !0x20;
            write_header(target, &tag, content.len());
            target.extend_from_slice(&content);
            return Ok(())
        }
        let mut elements = Vec::new();
        for child in self.children()? {
            let mut element = Vec::new();
            child.write_der_nested(
                child.tag.as_ref(), &mut element, depth + 1
            )?;
            elements.push(element);
        }
        if self.tag.as_ref() == [0x31] {
            elements.sort_by(|left, right| set_order(left, right));
        }
        write_header(
            target, tag, elements.iter().map(Vec::len).sum()
        );
        elements.iter().for_each(|item| target.extend_from_slice(item));
        Ok(())
    }

    /// Returns the BER encoding of the value using indefinite length form.
    ///
    /// Every constructed value is encoded with indefinite length.
    /// Primitive values are kept unchanged.
    pub fn to_indefinite_ber(&self) -> Result<Vec<u8>, EncodingError> {
        let mut res = Vec::with_capacity(self.raw.len() + 8);
        self.write_indefinite_nested(&mut res, 0)?;
        Ok(res)
    }

    fn write_indefinite_nested(
        &self, target: &mut Vec<u8>, depth: usize
    ) -> Result<(), EncodingError> {
        if depth > MAX_DEPTH {
            return Err(EncodingError::new("values nested too deeply"))
        }
        if !self.is_constructed() {
            write_header(target, self.tag.as_ref(), self.content.len());
            target.extend_from_slice(self.content.as_ref());
            return Ok(())
        }
        target.extend_from_slice(self.tag.as_ref());
        target.push(0x80);
        for child in self.children()? {
            child.write_indefinite_nested(target, depth + 1)?;
        }
        target.extend_from_slice(&[0, 0]);
        Ok(())
    }

    /// Returns which kind of universal string type the value is.
    fn string_kind(&self) -> Option<StringKind> {
        // Only single-octet universal tags are string types.
        if self.tag.len() != 1 || self.tag[0] & 0xC0 != 0 {
            return None
        }
        match self.tag[0] & 0x1F {
            3 => Some(StringKind::Bit),
            4 | 12 | 18 | 19 | 20 | 21 | 22 | 25 | 26 | 27 | 28 | 30 => {
                Some(StringKind::Octet)
            }
            _ => None
        }
    }

    /// Collects the content of a constructed string value.
    fn flatten_string(
        &self, kind: StringKind, depth: usize
    ) -> Result<Vec<u8>, EncodingError> {
        let mut segments = Vec::new();
        self.collect_segments(&mut segments, depth)?;
        match kind {
            StringKind::Octet => {
                Ok(segments.iter().flat_map(|s| s.iter().copied()).collect())
            }
            StringKind::Bit => {
                let mut res = vec![0u8];
                for segment in &segments {
                    let (unused, bits) = match segment.split_first() {
                        Some(some) => some,
                        None => {
                            return Err(EncodingError::new(
                                "empty bit string segment"
                            ))
                        }
                    };
                    res[0] = *unused;
                    res.extend_from_slice(bits);
                }
                Ok(res)
            }
        }
    }

    fn collect_segments(
        &self, segments: &mut Vec<Bytes>, depth: usize
    ) -> Result<(), EncodingError> {
        if depth > MAX_DEPTH {
            return Err(EncodingError::new("values nested too deeply"))
        }
        for child in self.children()? {
            if child.is_constructed() {
                child.collect_segments(segments, depth + 1)?
            }
            else {
                segments.push(child.content.clone())
            }
        }
        Ok(())
    }
}


//------------ StringKind ----------------------------------------------------

#[derive(Clone, Copy, Debug)]
enum StringKind {
    Bit,
    Octet,
}


//------------ Functions -----------------------------------------------------

/// Returns the DER encoding of a single encoded value.
pub fn to_der(data: &Bytes) -> Result<Vec<u8>, EncodingError> {
    Tlv::parse(data.clone())?.to_der()
}

/// Skips over all remaining values of a constructed value.
///
/// `Constructed::skip_all` treats the end-of-contents octets of a value in
/// indefinite length form as a missing value, so we stop at them here.
pub fn skip_remaining<S: decode::Source>(
    cons: &mut decode::Constructed<S>
) -> Result<(), DecodeError<S::Error>> {
    while cons.skip_opt(|_, _, _| Ok(()))?.is_some() { }
    Ok(())
}

/// Appends a DER encoded `SET OF` built from the given elements.
///
/// The elements are re-encoded in DER and sorted. The set is written using
/// the identifier octets in `tag`.
pub fn write_der_set(
    tag: &[u8], elements: &[Tlv], target: &mut Vec<u8>
) -> Result<(), EncodingError> {
    let mut encoded = elements.iter().map(Tlv::to_der).collect::<Result<
        Vec<_>, _
    >>()?;
    encoded.sort_by(|left, right| set_order(left, right));
    write_header(target, tag, encoded.iter().map(Vec::len).sum());
    encoded.iter().for_each(|item| target.extend_from_slice(item));
    Ok(())
}

/// Appends identifier and definite length octets to `target`.
pub fn write_header(target: &mut Vec<u8>, tag: &[u8], len: usize) {
    target.extend_from_slice(tag);
    if len < 0x80 {
        target.push(len as u8);
    }
    else {
        let octets = len.to_be_bytes();
        let skip = octets.iter().take_while(|octet| **octet == 0).count();
        target.push(0x80 | (octets.len() - skip) as u8);
        target.extend_from_slice(&octets[skip..]);
    }
}

/// The order of elements of a DER encoded set.
///
/// Elements are ordered by their encoding with the constructed bit of the
/// first octet ignored.
fn set_order(left: &[u8], right: &[u8]) -> cmp::Ordering {
    match (left.split_first(), right.split_first()) {
        (Some((lfirst, lrest)), Some((rfirst, rrest))) => {
            (lfirst & !0x20).cmp(&(rfirst & !0x20)).then_with(|| {
                lrest.cmp(rrest)
            })
        }
        _ => left.cmp(right)
    }
}

fn octet_at(data: &Bytes, pos: usize) -> Result<u8, EncodingError> {
    data.get(pos).copied().ok_or_else(|| {
        EncodingError::new("unexpected end of data")
    })
}


//------------ EncodingError -------------------------------------------------

/// Encoded data could not be processed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EncodingError(&'static str);

impl EncodingError {
    pub(crate) fn new(msg: &'static str) -> Self {
        EncodingError(msg)
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl error::Error for EncodingError { }

impl From<EncodingError> for ContentError {
    fn from(err: EncodingError) -> Self {
        ContentError::from_static(err.0)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn der(data: &'static [u8]) -> Vec<u8> {
        to_der(&Bytes::from_static(data)).unwrap()
    }

    #[test]
    fn definite_values_stay_unchanged() {
        let data = b"\x30\x06\x02\x01\x01\x04\x01\xAA";
        assert_eq!(der(data), data.to_vec());
    }

    #[test]
    fn indefinite_lengths_become_definite() {
        assert_eq!(
            der(b"\x30\x80\x02\x01\x01\x30\x80\x05\x00\x00\x00\x00\x00"),
            b"\x30\x07\x02\x01\x01\x30\x02\x05\x00".to_vec()
        );
    }

    #[test]
    fn constructed_octet_strings_are_flattened() {
        assert_eq!(
            der(b"\x24\x80\x04\x02ab\x24\x80\x04\x01c\x00\x00\x00\x00"),
            b"\x04\x03abc".to_vec()
        );
        assert_eq!(
            der(b"\xA0\x08\x24\x06\x04\x01a\x04\x01b"),
            b"\xA0\x04\x04\x02ab".to_vec()
        );
    }

    #[test]
    fn constructed_bit_strings_are_flattened() {
        assert_eq!(
            der(b"\x23\x09\x03\x02\x00\xF0\x03\x03\x04\x0F\xF0"),
            b"\x03\x04\x04\xF0\x0F\xF0".to_vec()
        );
    }

    #[test]
    fn sets_are_sorted() {
        assert_eq!(
            der(b"\x31\x09\x04\x01\x02\x02\x01\x05\x04\x01\x01"),
            b"\x31\x09\x02\x01\x05\x04\x01\x01\x04\x01\x02".to_vec()
        );
        // Implicitly tagged sets are not.
        assert_eq!(
            der(b"\xA1\x06\x04\x01\x02\x04\x01\x01"),
            b"\xA1\x06\x04\x01\x02\x04\x01\x01".to_vec()
        );
    }

    #[test]
    fn retagged_set_is_sorted() {
        let set = Tlv::parse(Bytes::from_static(
            b"\x31\x06\x04\x01\x02\x04\x01\x01"
        )).unwrap();
        let mut target = Vec::new();
        set.write_der_as(&[0xA0], &mut target).unwrap();
        assert_eq!(target, b"\xA0\x06\x04\x01\x01\x04\x01\x02".to_vec());
    }

    #[test]
    fn indefinite_ber() {
        let value = Tlv::parse(Bytes::from_static(
            b"\x30\x0B\x06\x01\x2A\xA0\x06\x24\x04\x04\x02ab"
        )).unwrap();
        assert_eq!(
            value.to_indefinite_ber().unwrap(),
            b"\x30\x80\x06\x01\x2A\xA0\x80\x24\x80\x04\x02ab\
              \x00\x00\x00\x00\x00\x00".to_vec()
        );
    }

    #[test]
    fn long_lengths() {
        let mut data = vec![0x04, 0x81, 0x80];
        data.extend_from_slice(&[0x55; 0x80]);
        let value = Tlv::parse(Bytes::from(data.clone())).unwrap();
        assert_eq!(value.content().len(), 0x80);
        assert_eq!(value.to_der().unwrap(), data);

        let mut target = Vec::new();
        write_header(&mut target, &[0x30], 0x1234);
        assert_eq!(target, vec![0x30, 0x82, 0x12, 0x34]);
    }

    #[test]
    fn malformed_values() {
        assert!(Tlv::parse(Bytes::from_static(b"\x30\x05\x02\x01")).is_err());
        assert!(Tlv::parse(Bytes::from_static(b"\x04\x80\x00\x00")).is_err());
        assert!(Tlv::parse(Bytes::from_static(b"\x30\x80\x02\x01\x01")).is_err());
        assert!(Tlv::parse(Bytes::from_static(b"\x02\x01\x01\x00")).is_err());
        assert!(Tlv::parse(Bytes::new()).is_err());
    }

    #[test]
    fn split_and_children() {
        let value = Tlv::parse(Bytes::from_static(
            b"\x30\x80\x02\x01\x01\x04\x00\x00\x00"
        )).unwrap();
        assert!(value.is_indefinite());
        let children = value.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].raw().as_ref(), b"\x02\x01\x01");
        assert_eq!(children[1].tag(), &[0x04]);
        assert_eq!(value.raw().len(), 9);
    }
}
