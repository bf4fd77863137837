//! Security descriptor header decoding and DACL location.
//!
//! Only the self-relative layout is understood: offsets are relative to the
//! start of the blob. Owner, group and SACL regions are decoded as offsets
//! but never followed.

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use tracing::{debug, trace};

use crate::constants::{
    SECURITY_DESCRIPTOR_HEADER_LEN, SECURITY_DESCRIPTOR_REVISION, SE_DACL_DEFAULTED,
    SE_DACL_PRESENT, SE_SELF_RELATIVE,
};
use crate::error::{MqsecError, Result};

/// Fixed 20-byte descriptor header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecurityDescriptorHeader {
    pub revision: u8,
    pub control: u16,
    pub owner_offset: u32,
    pub group_offset: u32,
    pub sacl_offset: u32,
    pub dacl_offset: u32,
}

impl SecurityDescriptorHeader {
    pub fn parse(blob: &[u8]) -> Result<Self> {
        if blob.len() < SECURITY_DESCRIPTOR_HEADER_LEN {
            return Err(MqsecError::descriptor(format!(
                "{} bytes is shorter than the {}-byte header",
                blob.len(),
                SECURITY_DESCRIPTOR_HEADER_LEN
            )));
        }
        let mut rdr = blob;
        let revision = rdr.read_u8()?;
        let _sbz1 = rdr.read_u8()?;
        let header = Self {
            revision,
            control: rdr.read_u16::<LittleEndian>()?,
            owner_offset: rdr.read_u32::<LittleEndian>()?,
            group_offset: rdr.read_u32::<LittleEndian>()?,
            sacl_offset: rdr.read_u32::<LittleEndian>()?,
            dacl_offset: rdr.read_u32::<LittleEndian>()?,
        };
        trace!(?header, "decoded security descriptor header");

        if header.revision != SECURITY_DESCRIPTOR_REVISION {
            return Err(MqsecError::descriptor(format!(
                "unsupported revision {}",
                header.revision
            )));
        }
        if !header.has(SE_SELF_RELATIVE) {
            return Err(MqsecError::descriptor(
                "descriptor is not self-relative; absolute descriptors carry pointers",
            ));
        }
        Ok(header)
    }

    #[inline]
    pub fn has(&self, flag: u16) -> bool {
        self.control & flag == flag
    }

    pub fn dacl_present(&self) -> bool {
        self.has(SE_DACL_PRESENT)
    }

    pub fn dacl_defaulted(&self) -> bool {
        self.has(SE_DACL_DEFAULTED)
    }
}

/// Start of the DACL inside the descriptor blob.
///
/// `len` runs from `offset` to the end of the blob, since a self-relative
/// descriptor may place other regions after the DACL. [`Acl::parse`]
/// narrows it to the ACL header's declared size.
///
/// [`Acl::parse`]: crate::acl::Acl::parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaclView {
    pub offset: usize,
    pub len: usize,
}

impl DaclView {
    /// Borrow the ACL region. Fails if the view does not lie inside `blob`.
    pub fn slice<'a>(&self, blob: &'a [u8]) -> Result<&'a [u8]> {
        self.offset
            .checked_add(self.len)
            .and_then(|end| blob.get(self.offset..end))
            .ok_or_else(|| {
                MqsecError::descriptor(format!(
                    "DACL view {}+{} lies outside {}-byte descriptor",
                    self.offset,
                    self.len,
                    blob.len()
                ))
            })
    }
}

/// Outcome of locating the DACL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DaclLocation {
    /// No DACL: the present flag is clear, or it is set with a null offset.
    Absent,
    Present(DaclView),
}

impl DaclLocation {
    pub fn is_present(&self) -> bool {
        matches!(self, DaclLocation::Present(_))
    }

    /// The view, or [`MqsecError::NoDacl`]
    pub fn view(self) -> Result<DaclView> {
        match self {
            DaclLocation::Present(v) => Ok(v),
            DaclLocation::Absent => Err(MqsecError::NoDacl),
        }
    }
}

/// Locate the DACL of a self-relative security descriptor.
pub fn parse_dacl(blob: &[u8]) -> Result<DaclLocation> {
    let header = SecurityDescriptorHeader::parse(blob)?;

    if !header.dacl_present() {
        debug!(control = header.control, "descriptor has no DACL");
        return Ok(DaclLocation::Absent);
    }
    if header.dacl_offset == 0 {
        debug!("descriptor has a null DACL");
        return Ok(DaclLocation::Absent);
    }

    let offset = header.dacl_offset as usize;
    if offset < SECURITY_DESCRIPTOR_HEADER_LEN || offset >= blob.len() {
        return Err(MqsecError::descriptor(format!(
            "DACL offset {offset} outside {}..{}",
            SECURITY_DESCRIPTOR_HEADER_LEN,
            blob.len()
        )));
    }

    let view = DaclView {
        offset,
        len: blob.len() - offset,
    };
    debug!(offset = view.offset, len = view.len, defaulted = header.dacl_defaulted(), "located DACL");
    Ok(DaclLocation::Present(view))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(control: u16, dacl_offset: u32) -> Vec<u8> {
        let mut b = vec![SECURITY_DESCRIPTOR_REVISION, 0];
        b.extend_from_slice(&control.to_le_bytes());
        b.extend_from_slice(&[0; 12]);
        b.extend_from_slice(&dacl_offset.to_le_bytes());
        b
    }

    #[test]
    fn short_blob_is_malformed() {
        let err = parse_dacl(&[1, 0, 4, 0x80]).unwrap_err();
        assert!(matches!(err, MqsecError::MalformedDescriptor(_)));
    }

    #[test]
    fn absent_when_flag_clear() {
        let blob = header(SE_SELF_RELATIVE, 20);
        assert_eq!(parse_dacl(&blob).unwrap(), DaclLocation::Absent);
    }

    #[test]
    fn null_dacl_is_absent() {
        let blob = header(SE_SELF_RELATIVE | SE_DACL_PRESENT, 0);
        assert_eq!(parse_dacl(&blob).unwrap(), DaclLocation::Absent);
        assert!(matches!(DaclLocation::Absent.view(), Err(MqsecError::NoDacl)));
    }

    #[test]
    fn absolute_descriptor_rejected() {
        let mut blob = header(SE_DACL_PRESENT, 20);
        blob.extend_from_slice(&[0; 8]);
        assert!(matches!(parse_dacl(&blob), Err(MqsecError::MalformedDescriptor(_))));
    }

    #[test]
    fn wrong_revision_rejected() {
        let mut blob = header(SE_SELF_RELATIVE | SE_DACL_PRESENT, 20);
        blob[0] = 2;
        assert!(matches!(parse_dacl(&blob), Err(MqsecError::MalformedDescriptor(_))));
    }

    #[test]
    fn offset_out_of_range() {
        let blob = header(SE_SELF_RELATIVE | SE_DACL_PRESENT, 20);
        assert!(matches!(parse_dacl(&blob), Err(MqsecError::MalformedDescriptor(_))));
        let mut blob = header(SE_SELF_RELATIVE | SE_DACL_PRESENT, 4);
        blob.extend_from_slice(&[0; 8]);
        assert!(matches!(parse_dacl(&blob), Err(MqsecError::MalformedDescriptor(_))));
    }

    #[test]
    fn view_covers_tail() {
        let mut blob = header(SE_SELF_RELATIVE | SE_DACL_PRESENT, 20);
        blob.extend_from_slice(&[2, 0, 8, 0, 0, 0, 0, 0]);
        let view = parse_dacl(&blob).unwrap().view().unwrap();
        assert_eq!(view, DaclView { offset: 20, len: 8 });
        assert_eq!(view.slice(&blob).unwrap(), &blob[20..]);
        assert!(DaclView { offset: 20, len: 9 }.slice(&blob).is_err());
    }
}
