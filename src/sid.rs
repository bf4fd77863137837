//! Security identifiers: binary layout and canonical text form.
//!
//! Binary format: [revision: u8][sub_count: u8][authority: 6 bytes BE][sub_count x u32 LE]
//!
//! Text format: `S-<revision>-<authority>-<sub1>-<sub2>-...`
//! - authority is decimal below 2^32, otherwise `0x` + 12 upper-case hex digits
//! - the text form is canonical, so equality of SIDs is equality of their text

use std::fmt;
use std::str::FromStr;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::constants::{SID_HEADER_LEN, SID_MAX_SUB_AUTHORITIES};
use crate::error::{MqsecError, Result};

/// Largest value the 6-byte identifier authority can hold
const MAX_AUTHORITY: u64 = (1 << 48) - 1;

/// Decoded security identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sid {
    revision: u8,
    authority: u64,
    sub_authorities: Vec<u32>,
}

impl Sid {
    /// Create from parts.
    ///
    /// # Example
    /// ```
    /// let sid = mqsec::Sid::new(1, 5, &[32, 544]).unwrap();
    /// assert_eq!(sid.to_string(), "S-1-5-32-544");
    /// ```
    pub fn new(revision: u8, authority: u64, sub_authorities: &[u32]) -> Result<Self> {
        if authority > MAX_AUTHORITY {
            return Err(MqsecError::sid(format!(
                "identifier authority {authority} does not fit in 48 bits"
            )));
        }
        if sub_authorities.len() > SID_MAX_SUB_AUTHORITIES {
            return Err(MqsecError::sid(format!(
                "{} sub-authorities (max {})",
                sub_authorities.len(),
                SID_MAX_SUB_AUTHORITIES
            )));
        }
        Ok(Self {
            revision,
            authority,
            sub_authorities: sub_authorities.to_vec(),
        })
    }

    #[inline]
    pub fn revision(&self) -> u8 {
        self.revision
    }

    #[inline]
    pub fn authority(&self) -> u64 {
        self.authority
    }

    #[inline]
    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authorities
    }

    /// Relative identifier (last sub-authority), if any
    pub fn rid(&self) -> Option<u32> {
        self.sub_authorities.last().copied()
    }

    /// Encoded length in bytes
    #[inline]
    pub fn byte_len(&self) -> usize {
        SID_HEADER_LEN + 4 * self.sub_authorities.len()
    }

    /// Decode a SID from the start of `bytes`, returning it and the number of
    /// bytes it occupies. Trailing bytes are left alone.
    pub fn decode_prefix(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < SID_HEADER_LEN {
            return Err(MqsecError::sid(format!(
                "need {} header bytes, have {}",
                SID_HEADER_LEN,
                bytes.len()
            )));
        }
        let mut rdr = bytes;
        let revision = rdr.read_u8()?;
        let count = rdr.read_u8()? as usize;
        if count > SID_MAX_SUB_AUTHORITIES {
            return Err(MqsecError::sid(format!(
                "{count} sub-authorities (max {SID_MAX_SUB_AUTHORITIES})"
            )));
        }
        let len = SID_HEADER_LEN + 4 * count;
        if bytes.len() < len {
            return Err(MqsecError::sid(format!(
                "declares {count} sub-authorities ({len} bytes) but only {} bytes remain",
                bytes.len()
            )));
        }
        let authority = rdr.read_u48::<BigEndian>()?;
        let mut sub_authorities = Vec::with_capacity(count);
        for _ in 0..count {
            sub_authorities.push(rdr.read_u32::<LittleEndian>()?);
        }
        Ok((
            Self {
                revision,
                authority,
                sub_authorities,
            },
            len,
        ))
    }

    /// Decode a SID that occupies exactly `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (sid, len) = Self::decode_prefix(bytes)?;
        if len != bytes.len() {
            return Err(MqsecError::sid(format!(
                "{} trailing bytes after {len}-byte SID",
                bytes.len() - len
            )));
        }
        Ok(sid)
    }

    /// Encode to the binary layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        self.write_to(&mut out);
        out
    }

    /// Append the binary layout to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.revision);
        out.push(self.sub_authorities.len() as u8);
        out.extend_from_slice(&self.authority.to_be_bytes()[2..]);
        for sub in &self.sub_authorities {
            out.extend_from_slice(&sub.to_le_bytes());
        }
    }

    /// Parse the text form. A lower-case `s-` prefix and a hex authority are
    /// accepted; [`fmt::Display`] always renders the canonical form.
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("S-")
            .or_else(|| s.strip_prefix("s-"))
            .ok_or_else(|| MqsecError::sid(format!("{s:?} does not start with S-")))?;

        let mut parts = rest.split('-');
        let revision = parts
            .next()
            .filter(|p| !p.is_empty())
            .and_then(|p| parse_decimal::<u8>(p))
            .ok_or_else(|| MqsecError::sid(format!("{s:?} has no valid revision")))?;
        let authority = parts
            .next()
            .and_then(parse_authority)
            .ok_or_else(|| MqsecError::sid(format!("{s:?} has no valid identifier authority")))?;

        let mut subs = Vec::new();
        for part in parts {
            let sub = parse_decimal::<u32>(part)
                .ok_or_else(|| MqsecError::sid(format!("{s:?} has invalid sub-authority {part:?}")))?;
            subs.push(sub);
        }
        Self::new(revision, authority, &subs)
    }
}

fn parse_decimal<T: FromStr>(p: &str) -> Option<T> {
    if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    p.parse().ok()
}

fn parse_authority(p: &str) -> Option<u64> {
    let v = match p.strip_prefix("0x").or_else(|| p.strip_prefix("0X")) {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            u64::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None => parse_decimal::<u64>(p)?,
    };
    (v <= MAX_AUTHORITY).then_some(v)
}

/// Render binary SID bytes as canonical text
pub fn sid_bytes_to_text(bytes: &[u8]) -> Result<String> {
    Ok(Sid::from_bytes(bytes)?.to_string())
}

/// Parse SID text into its binary layout
pub fn sid_text_to_bytes(text: &str) -> Result<Vec<u8>> {
    Ok(Sid::parse(text)?.to_bytes())
}

// ============================================================================
// Display / Debug
// ============================================================================

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}-", self.revision)?;
        if self.authority >> 32 == 0 {
            write!(f, "{}", self.authority)?;
        } else {
            write!(f, "0x{:012X}", self.authority)?;
        }
        for sub in &self.sub_authorities {
            write!(f, "-{sub}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sid({self})")
    }
}

// ============================================================================
// Conversion traits
// ============================================================================

impl FromStr for Sid {
    type Err = MqsecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&[u8]> for Sid {
    type Error = MqsecError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

impl serde::Serialize for Sid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Sid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Tests
// ============================================================================
