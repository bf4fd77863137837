//! ACL walking and ACE matching.
//!
//! Layout (little-endian):
//! - ACL header: [revision: u8][sbz1: u8][acl_size: u16][ace_count: u16][sbz2: u16]
//! - ACE header: [type: u8][flags: u8][ace_size: u16]
//! - access-allowed body: [mask: u32][sid: rest of entry]
//!
//! `Acl::parse` walks every entry header once before anything is matched, so a
//! count that overruns the declared size is reported as malformed even when an
//! earlier entry would have matched.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use tracing::{debug, trace};

use crate::caps::AccessMask;
use crate::constants::{
    ACCESS_ALLOWED_ACE_TYPE, ACE_HEADER_LEN, ACE_MASK_LEN, ACL_HEADER_LEN, ACL_REVISION,
    ACL_REVISION_DS, MAX_KNOWN_ACE_TYPE,
};
use crate::descriptor::DaclView;
use crate::error::{MqsecError, Result};
use crate::sid::Sid;

/// Fixed 8-byte ACL header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AclHeader {
    pub revision: u8,
    pub acl_size: u16,
    pub ace_count: u16,
}

/// Size accounting for a parsed ACL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AclSizeInfo {
    pub ace_count: u32,
    pub bytes_in_use: u32,
    pub bytes_free: u32,
}

/// Fixed 4-byte ACE header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AceHeader {
    pub ace_type: u8,
    pub flags: u8,
    pub size: u16,
}

impl AceHeader {
    fn read(buf: &[u8]) -> Self {
        Self {
            ace_type: buf[0],
            flags: buf[1],
            size: LittleEndian::read_u16(&buf[2..4]),
        }
    }
}

/// Decoded access-allowed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessAllowedAce {
    /// Inheritance/audit bits, carried but not interpreted
    pub flags: u8,
    pub mask: AccessMask,
    pub sid: Sid,
}

/// One entry of an ACL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Ace {
    AccessAllowed(AccessAllowedAce),
    /// Any other recognised type; only the header is decoded
    Skipped(AceHeader),
}

/// A structurally validated ACL borrowed from a descriptor blob
#[derive(Debug, Clone, Copy)]
pub struct Acl<'a> {
    header: AclHeader,
    /// Exactly `acl_size` bytes, header included
    data: &'a [u8],
    bytes_in_use: usize,
}

impl<'a> Acl<'a> {
    /// Parse an ACL from a region that starts at the ACL header and may extend
    /// past it. Every entry header is bounds-checked here.
    pub fn parse(region: &'a [u8]) -> Result<Self> {
        if region.len() < ACL_HEADER_LEN {
            return Err(MqsecError::acl(format!(
                "{} bytes is shorter than the {}-byte ACL header",
                region.len(),
                ACL_HEADER_LEN
            )));
        }
        let header = AclHeader {
            revision: region[0],
            acl_size: LittleEndian::read_u16(&region[2..4]),
            ace_count: LittleEndian::read_u16(&region[4..6]),
        };
        if !(ACL_REVISION..=ACL_REVISION_DS).contains(&header.revision) {
            return Err(MqsecError::acl(format!("unsupported revision {}", header.revision)));
        }

        let size = header.acl_size as usize;
        if size < ACL_HEADER_LEN || size > region.len() {
            return Err(MqsecError::acl(format!(
                "declared size {size} outside {}..={}",
                ACL_HEADER_LEN,
                region.len()
            )));
        }
        let data = &region[..size];

        let mut cursor = ACL_HEADER_LEN;
        for index in 0..header.ace_count {
            let ace = entry_header(data, cursor, index)?;
            if ace.ace_type > MAX_KNOWN_ACE_TYPE {
                return Err(MqsecError::acl(format!(
                    "entry {index} has unrecognised type 0x{:02X}",
                    ace.ace_type
                )));
            }
            cursor += ace.size as usize;
        }
        trace!(?header, bytes_in_use = cursor, "validated ACL");

        Ok(Self {
            header,
            data,
            bytes_in_use: cursor,
        })
    }

    #[inline]
    pub fn header(&self) -> AclHeader {
        self.header
    }

    pub fn size_info(&self) -> AclSizeInfo {
        AclSizeInfo {
            ace_count: self.header.ace_count as u32,
            bytes_in_use: self.bytes_in_use as u32,
            bytes_free: (self.data.len() - self.bytes_in_use) as u32,
        }
    }

    /// Iterate entries in stored order
    pub fn entries(&self) -> AceIter<'a> {
        AceIter {
            data: self.data,
            cursor: ACL_HEADER_LEN,
            index: 0,
            count: self.header.ace_count,
        }
    }

    /// First access-allowed entry naming `target`
    pub fn find_ace(&self, target: &Sid) -> Result<AccessAllowedAce> {
        let target_text = target.to_string();
        for entry in self.entries() {
            match entry? {
                Ace::AccessAllowed(ace) => {
                    let text = ace.sid.to_string();
                    trace!(sid = %text, mask = ace.mask.bits(), "comparing access-allowed entry");
                    if text == target_text {
                        debug!(sid = %text, mask = ace.mask.bits(), "matched ACE");
                        return Ok(ace);
                    }
                }
                Ace::Skipped(h) => {
                    trace!(ace_type = h.ace_type, size = h.size, "skipping entry");
                }
            }
        }
        Err(MqsecError::NoMatchingAce { sid: target_text })
    }
}

/// Read and bounds-check the header of entry `index` at `cursor`
fn entry_header(data: &[u8], cursor: usize, index: u16) -> Result<AceHeader> {
    let remaining = data.len().saturating_sub(cursor);
    if remaining < ACE_HEADER_LEN {
        return Err(MqsecError::acl(format!(
            "entry {index} header at offset {cursor} overruns ACL size {}",
            data.len()
        )));
    }
    let h = AceHeader::read(&data[cursor..cursor + ACE_HEADER_LEN]);
    let size = h.size as usize;
    if size < ACE_HEADER_LEN || size > remaining {
        return Err(MqsecError::acl(format!(
            "entry {index} declares {size} bytes with {remaining} remaining"
        )));
    }
    Ok(h)
}

/// Iterator over the entries of an [`Acl`]. Stops after the first error.
pub struct AceIter<'a> {
    data: &'a [u8],
    cursor: usize,
    index: u16,
    count: u16,
}

impl AceIter<'_> {
    fn decode(&mut self) -> Result<Ace> {
        let (data, index) = (self.data, self.index);
        let h = entry_header(data, self.cursor, index)?;
        let entry = &data[self.cursor..self.cursor + h.size as usize];
        self.cursor += h.size as usize;
        self.index += 1;

        if h.ace_type != ACCESS_ALLOWED_ACE_TYPE {
            return Ok(Ace::Skipped(h));
        }

        let body = &entry[ACE_HEADER_LEN..];
        if body.len() < ACE_MASK_LEN {
            return Err(MqsecError::acl(format!("entry {index} too short for an access mask")));
        }
        let mask = AccessMask::from_bits(LittleEndian::read_u32(&body[..ACE_MASK_LEN]));
        let (sid, _) = Sid::decode_prefix(&body[ACE_MASK_LEN..])
            .map_err(|e| MqsecError::acl(format!("entry {index}: {e}")))?;

        Ok(Ace::AccessAllowed(AccessAllowedAce {
            flags: h.flags,
            mask,
            sid,
        }))
    }
}

impl Iterator for AceIter<'_> {
    type Item = Result<Ace>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let r = self.decode();
        if r.is_err() {
            self.index = self.count;
        }
        Some(r)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some((self.count - self.index) as usize))
    }
}

/// Resolve the access mask granted to `target_sid_text` by the DACL at `view`.
///
/// The target is parsed and compared in canonical text form.
pub fn find_ace_for_sid(blob: &[u8], view: DaclView, target_sid_text: &str) -> Result<AccessMask> {
    let target = Sid::parse(target_sid_text)?;
    let acl = Acl::parse(view.slice(blob)?)?;
    Ok(acl.find_ace(&target)?.mask)
}
