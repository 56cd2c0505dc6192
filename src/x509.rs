//! Types common to the X.509 and CMS structures.

use std::{io, ops, str};
use std::str::FromStr;
use bcder::{decode, encode};
use bcder::{Mode, Tag};
use bcder::decode::{ContentError, DecodeError};
use bcder::decode::Source as _;
use bcder::encode::PrimitiveContent;
use chrono::{
    Datelike, DateTime, LocalResult, TimeDelta, Timelike, TimeZone, Utc
};


//------------ Time ----------------------------------------------------------

/// A point in time as used in certificates and timestamp tokens.
///
/// Both `UTCTime` and `GeneralizedTime` are accepted when decoding. The
/// latter may contain fractional seconds as allowed for the `genTime` of a
/// timestamp token.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Time(DateTime<Utc>);

impl Time {
    pub fn new(dt: DateTime<Utc>) -> Self {
        Time(dt)
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Creates a time value from its components.
    ///
    /// # Panics
    ///
    /// The function panics if the components don’t form a valid time.
    pub fn utc(
        year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32
    ) -> Self {
        match Self::from_parts((year, month, day, hour, min, sec), 0) {
            Ok(res) => res,
            Err(_) => panic!("invalid time components")
        }
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive(|tag, prim| {
            match tag {
                Tag::UTC_TIME => Self::from_utc_time(prim),
                Tag::GENERALIZED_TIME => Self::from_generalized_time(prim),
                _ => {
                    Err(prim.content_err(
                        "malformed time value"
                    ))
                }
            }
        })
    }

    /// Takes a `GeneralizedTime` value.
    pub fn take_generalized_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_primitive_if(
            Tag::GENERALIZED_TIME, Self::from_generalized_time
        )
    }

    fn from_utc_time<S: decode::Source>(
        prim: &mut decode::Primitive<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        // RFC 5280 requires the format YYMMDDHHMMSSZ
        let year = read_two_char(prim)? as i32;
        let year = if year >= 50 { year + 1900 }
                   else { year + 2000 };
        let res = (
            year,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
        );
        if prim.take_u8()? != b'Z' {
            return Err(prim.content_err(
                "malformed time value"
            ))
        }
        Self::from_parts(res, 0).map_err(|err| prim.content_err(err))
    }

    fn from_generalized_time<S: decode::Source>(
        prim: &mut decode::Primitive<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        // RFC 3161 requires the format YYYYMMDDHHMMSS[.s...]Z
        let res = (
            read_four_char(prim)? as i32,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
            read_two_char(prim)?,
        );
        let mut nanos = 0;
        let mut next = prim.take_u8()?;
        if next == b'.' {
            let mut scale = 100_000_000;
            let mut digits = 0;
            loop {
                next = prim.take_u8()?;
                if !next.is_ascii_digit() {
                    break
                }
                nanos += u32::from(next - b'0') * scale;
                scale /= 10;
                digits += 1;
            }
            if digits == 0 {
                return Err(prim.content_err("malformed time value"))
            }
        }
        if next != b'Z' {
            return Err(prim.content_err(
                "malformed time value"
            ))
        }
        Self::from_parts(res, nanos).map_err(|err| prim.content_err(err))
    }

    fn from_parts(
        parts: (i32, u32, u32, u32, u32, u32), nanos: u32,
    ) -> Result<Self, ContentError> {
        match Utc.with_ymd_and_hms(
            parts.0, parts.1, parts.2, parts.3, parts.4, parts.5
        ) {
            LocalResult::Single(dt) => {
                match dt.with_nanosecond(nanos) {
                    Some(dt) => Ok(Time(dt)),
                    None => {
                        Err(ContentError::from_static("malformed time value"))
                    }
                }
            }
            _ => Err(ContentError::from_static("malformed time value"))
        }
    }

    pub fn encode_generalized_time(self) -> impl encode::Values {
        GeneralizedTime(self).encode()
    }
}


//--- Deref and AsRef

impl ops::Deref for Time {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<DateTime<Utc>> for Time {
    fn as_ref(&self) -> &DateTime<Utc> {
        &self.0
    }
}


//--- From

impl From<DateTime<Utc>> for Time {
    fn from(time: DateTime<Utc>) -> Self {
        Time(time)
    }
}

impl From<Time> for DateTime<Utc> {
    fn from(time: Time) -> Self {
        time.0
    }
}


//--- Add and Sub

impl ops::Add<TimeDelta> for Time {
    type Output = Self;

    fn add(self, duration: TimeDelta) -> Self::Output {
        Self::new(self.0 + duration)
    }
}

impl ops::Sub<TimeDelta> for Time {
    type Output = Self;

    fn sub(self, duration: TimeDelta) -> Self::Output {
        Self::new(self.0 - duration)
    }
}


fn read_two_char<S: decode::Source>(
    source: &mut S
) -> Result<u32, DecodeError<S::Error>> {
    let mut s = [0u8; 2];
    s[0] = source.take_u8()?;
    s[1] = source.take_u8()?;
    parse_digits(source, &s)
}


fn read_four_char<S: decode::Source>(
    source: &mut S
) -> Result<u32, DecodeError<S::Error>> {
    let mut s = [0u8; 4];
    s[0] = source.take_u8()?;
    s[1] = source.take_u8()?;
    s[2] = source.take_u8()?;
    s[3] = source.take_u8()?;
    parse_digits(source, &s)
}

fn parse_digits<S: decode::Source>(
    source: &mut S, s: &[u8]
) -> Result<u32, DecodeError<S::Error>> {
    if !s.iter().all(u8::is_ascii_digit) {
        return Err(source.content_err("malformed time value"))
    }
    let s = match str::from_utf8(s) {
        Ok(s) => s,
        Err(_err) => {
            return Err(source.content_err("malformed time value"))
        }
    };
    u32::from_str(s).map_err(|_err| {
        source.content_err("malformed time value")
    })
}


//------------ GeneralizedTime -----------------------------------------------

/// Encodes a time as `GeneralizedTime` with millisecond precision.
///
/// Fractional seconds are only added if there are any.
pub struct GeneralizedTime(Time);

impl GeneralizedTime {
    fn millis(&self) -> u32 {
        self.0.nanosecond() / 1_000_000
    }
}

impl PrimitiveContent for GeneralizedTime {
    const TAG: Tag = Tag::GENERALIZED_TIME;

    fn encoded_len(&self, _: Mode) -> usize {
        if self.millis() == 0 {
            15 // yyyyMMddhhmmssZ
        }
        else {
            19 // yyyyMMddhhmmss.fffZ
        }
    }

    fn write_encoded<W: io::Write>(
        &self, _: Mode, target: &mut W
    ) -> Result<(), io::Error> {
        write!(
            target, "{:04}{:02}{:02}{:02}{:02}{:02}",
            self.0.year(), self.0.month(), self.0.day(),
            self.0.hour(), self.0.minute(), self.0.second()
        )?;
        if self.millis() != 0 {
            write!(target, ".{:03}", self.millis())?;
        }
        target.write_all(b"Z")
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use bcder::encode::Values;

    fn decode(data: &[u8]) -> Result<Time, DecodeError<std::convert::Infallible>> {
        Mode::Der.decode(data, Time::take_from)
    }

    #[test]
    fn decode_utc_time() {
        assert_eq!(
            decode(b"\x17\x0d230405060708Z").unwrap(),
            Time::utc(2023, 4, 5, 6, 7, 8)
        );
        assert_eq!(
            decode(b"\x17\x0d990405060708Z").unwrap(),
            Time::utc(1999, 4, 5, 6, 7, 8)
        );
    }

    #[test]
    fn decode_generalized_time() {
        assert_eq!(
            decode(b"\x18\x0f20230405060708Z").unwrap(),
            Time::utc(2023, 4, 5, 6, 7, 8)
        );
        let fraction = decode(b"\x18\x1220230405060708.25Z").unwrap();
        assert_eq!(fraction.nanosecond(), 250_000_000);
        assert!(fraction > Time::utc(2023, 4, 5, 6, 7, 8));
        assert!(decode(b"\x18\x1020230405060708.Z").is_err());
        assert!(decode(b"\x18\x0f20230405060708X").is_err());
        assert!(decode(b"\x18\x0f20231305060708Z").is_err());
    }

    #[test]
    fn encode_generalized_time() {
        let time = Time::utc(2021, 12, 31, 23, 59, 58);
        assert_eq!(
            time.encode_generalized_time().to_captured(Mode::Der).as_slice(),
            b"\x18\x0f20211231235958Z"
        );
        let time = time + TimeDelta::milliseconds(120);
        let encoded = time.encode_generalized_time().to_captured(Mode::Der);
        assert_eq!(encoded.as_slice(), b"\x18\x1320211231235958.120Z");
        assert_eq!(decode(encoded.as_slice()).unwrap(), time);
    }
}
