//! Shared descriptor fixtures for integration tests

#![allow(dead_code)]

use mqsec::constants::{
    ACCESS_ALLOWED_ACE_TYPE, ACCESS_DENIED_ACE_TYPE, ACL_REVISION, SECURITY_DESCRIPTOR_REVISION,
    SE_DACL_PRESENT, SE_SELF_RELATIVE,
};
use mqsec::Sid;

pub const ALICE: &str = "S-1-5-21-1-2-3-1001";
pub const BOB: &str = "S-1-5-21-1-2-3-1002";
pub const NOBODY: &str = "S-1-5-21-1-2-3-9999";
pub const EVERYONE: &str = "S-1-1-0";

/// Encode one ACE carrying a mask and SID
pub fn ace(ace_type: u8, flags: u8, mask: u32, sid: &str) -> Vec<u8> {
    let sid = Sid::parse(sid).unwrap().to_bytes();
    let size = (8 + sid.len()) as u16;
    let mut b = vec![ace_type, flags];
    b.extend_from_slice(&size.to_le_bytes());
    b.extend_from_slice(&mask.to_le_bytes());
    b.extend_from_slice(&sid);
    b
}

pub fn allow(mask: u32, sid: &str) -> Vec<u8> {
    ace(ACCESS_ALLOWED_ACE_TYPE, 0, mask, sid)
}

pub fn deny(mask: u32, sid: &str) -> Vec<u8> {
    ace(ACCESS_DENIED_ACE_TYPE, 0, mask, sid)
}

/// Encode an ACL whose header declares `count` entries
pub fn acl_with_count(count: u16, entries: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = entries.concat();
    let size = (8 + body.len()) as u16;
    let mut b = vec![ACL_REVISION, 0];
    b.extend_from_slice(&size.to_le_bytes());
    b.extend_from_slice(&count.to_le_bytes());
    b.extend_from_slice(&[0, 0]);
    b.extend_from_slice(&body);
    b
}

pub fn acl(entries: &[Vec<u8>]) -> Vec<u8> {
    acl_with_count(entries.len() as u16, entries)
}

/// Self-relative descriptor builder
#[derive(Default)]
pub struct DescriptorBuilder {
    owner: Option<String>,
    dacl: Option<Vec<u8>>,
    null_dacl: bool,
}

impl DescriptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, sid: &str) -> Self {
        self.owner = Some(sid.to_string());
        self
    }

    pub fn dacl(mut self, acl: Vec<u8>) -> Self {
        self.dacl = Some(acl);
        self
    }

    /// Present flag set but no ACL body
    pub fn null_dacl(mut self) -> Self {
        self.null_dacl = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut control = SE_SELF_RELATIVE;
        let mut tail = Vec::new();
        let mut owner_offset = 0u32;
        let mut dacl_offset = 0u32;

        if let Some(owner) = &self.owner {
            owner_offset = 20;
            tail.extend(Sid::parse(owner).unwrap().to_bytes());
        }
        if self.null_dacl {
            control |= SE_DACL_PRESENT;
        } else if let Some(acl) = &self.dacl {
            control |= SE_DACL_PRESENT;
            dacl_offset = (20 + tail.len()) as u32;
            tail.extend_from_slice(acl);
        }

        let mut b = vec![SECURITY_DESCRIPTOR_REVISION, 0];
        b.extend_from_slice(&control.to_le_bytes());
        b.extend_from_slice(&owner_offset.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        b.extend_from_slice(&dacl_offset.to_le_bytes());
        b.extend(tail);
        b
    }
}

/// Descriptor with one DACL holding `entries`
pub fn descriptor(entries: &[Vec<u8>]) -> Vec<u8> {
    DescriptorBuilder::new().dacl(acl(entries)).build()
}
