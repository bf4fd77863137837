//! Binary layout constants, queue status codes and right names

use crate::caps::QueueRight;

// Security descriptor (self-relative form)
pub const SECURITY_DESCRIPTOR_REVISION: u8 = 1;
pub const SECURITY_DESCRIPTOR_HEADER_LEN: usize = 20;

// Security descriptor control flags
pub const SE_DACL_PRESENT: u16 = 0x0004;
pub const SE_DACL_DEFAULTED: u16 = 0x0008;
pub const SE_SELF_RELATIVE: u16 = 0x8000;

// ACL
pub const ACL_REVISION: u8 = 2;
pub const ACL_REVISION_DS: u8 = 4;
pub const ACL_HEADER_LEN: usize = 8;

// ACE
pub const ACE_HEADER_LEN: usize = 4;
pub const ACE_MASK_LEN: usize = 4;

pub const ACCESS_ALLOWED_ACE_TYPE: u8 = 0x00;
pub const ACCESS_DENIED_ACE_TYPE: u8 = 0x01;
pub const SYSTEM_AUDIT_ACE_TYPE: u8 = 0x02;
pub const SYSTEM_MANDATORY_LABEL_ACE_TYPE: u8 = 0x11;
/// Highest ACE type tag the walker knows how to step over.
pub const MAX_KNOWN_ACE_TYPE: u8 = 0x13;

// SID
pub const SID_MAX_SUB_AUTHORITIES: usize = 15;
pub const SID_HEADER_LEN: usize = 8;

// SECURITY_INFORMATION bit requested from the descriptor source
pub const DACL_SECURITY_INFORMATION: u32 = 0x0000_0004;

// Queue security query statuses
pub const MQ_OK: u32 = 0x0000_0000;
pub const MQ_ERROR: u32 = 0xC00E_0001;
pub const MQ_ERROR_QUEUE_NOT_FOUND: u32 = 0xC00E_0003;
pub const MQ_ERROR_NO_DS: u32 = 0xC00E_0013;
pub const MQ_ERROR_ILLEGAL_FORMATNAME: u32 = 0xC00E_001E;
pub const MQ_ERROR_UNSUPPORTED_FORMATNAME_OPERATION: u32 = 0xC00E_0020;
pub const MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL: u32 = 0xC00E_0023;
pub const MQ_ERROR_ACCESS_DENIED: u32 = 0xC00E_0025;
pub const MQ_ERROR_PRIVILEGE_NOT_HELD: u32 = 0xC00E_0026;

const STATUS_MESSAGES: &[(u32, &str)] = &[
    (MQ_OK, "MQ_OK"),
    (MQ_ERROR, "MQ_ERROR"),
    (MQ_ERROR_QUEUE_NOT_FOUND, "MQ_ERROR_QUEUE_NOT_FOUND"),
    (MQ_ERROR_NO_DS, "MQ_ERROR_NO_DS"),
    (MQ_ERROR_ILLEGAL_FORMATNAME, "MQ_ERROR_ILLEGAL_FORMATNAME"),
    (MQ_ERROR_UNSUPPORTED_FORMATNAME_OPERATION, "MQ_ERROR_UNSUPPORTED_FORMATNAME_OPERATION"),
    (MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL, "MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL"),
    (MQ_ERROR_ACCESS_DENIED, "MQ_ERROR_ACCESS_DENIED"),
    (MQ_ERROR_PRIVILEGE_NOT_HELD, "MQ_ERROR_PRIVILEGE_NOT_HELD"),
];

/// Diagnostic name for a queue status code. Unmapped codes are not an error.
pub fn status_message(status: u32) -> &'static str {
    STATUS_MESSAGES
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, name)| *name)
        .unwrap_or("unknown status")
}

// Right name mappings
const RIGHTS: &[(&str, u32)] = &[
    ("delete_message", QueueRight::DELETE_MESSAGE),
    ("peek_message", QueueRight::PEEK_MESSAGE),
    ("write_message", QueueRight::WRITE_MESSAGE),
    ("delete_journal_message", QueueRight::DELETE_JOURNAL_MESSAGE),
    ("set_queue_properties", QueueRight::SET_QUEUE_PROPERTIES),
    ("get_queue_properties", QueueRight::GET_QUEUE_PROPERTIES),
    ("delete_queue", QueueRight::DELETE_QUEUE),
    ("get_queue_permissions", QueueRight::GET_QUEUE_PERMISSIONS),
    ("change_queue_permissions", QueueRight::CHANGE_QUEUE_PERMISSIONS),
    ("take_queue_ownership", QueueRight::TAKE_QUEUE_OWNERSHIP),
];

const COMPOSITE_RIGHTS: &[(&str, u32)] = &[
    ("receive_message", QueueRight::RECEIVE_MESSAGE),
    ("receive_journal_message", QueueRight::RECEIVE_JOURNAL_MESSAGE),
    ("generic_read", QueueRight::GENERIC_READ),
    ("generic_write", QueueRight::GENERIC_WRITE),
    ("generic_all", QueueRight::GENERIC_ALL),
];

/// Convert a rights mask to the names of the single-bit rights it holds
pub fn rights_to_names(mask: u32) -> Vec<&'static str> {
    RIGHTS
        .iter()
        .filter(|(_, b)| mask & b == *b)
        .map(|(n, _)| *n)
        .collect()
}

/// Names of the composite rights fully contained in a mask
pub fn composite_names(mask: u32) -> Vec<&'static str> {
    COMPOSITE_RIGHTS
        .iter()
        .filter(|(_, b)| mask & b == *b)
        .map(|(n, _)| *n)
        .collect()
}

/// Convert a list of right names (single-bit or composite) to a mask.
/// Unknown names are ignored.
pub fn names_to_rights(names: &[&str]) -> u32 {
    names
        .iter()
        .filter_map(|n| right_by_name(n))
        .fold(0, |a, b| a | b)
}

/// Look up one right by name, case-insensitively
pub fn right_by_name(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    RIGHTS
        .iter()
        .chain(COMPOSITE_RIGHTS)
        .find(|(k, _)| *k == name)
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_values() {
        assert_eq!(SE_DACL_PRESENT | SE_SELF_RELATIVE, 0x8004);
        assert_eq!(DACL_SECURITY_INFORMATION, 0x4);
        assert!(SYSTEM_MANDATORY_LABEL_ACE_TYPE <= MAX_KNOWN_ACE_TYPE);
        assert_eq!(SID_HEADER_LEN + 4 * SID_MAX_SUB_AUTHORITIES, 68);
    }

    #[test]
    fn unmapped_status_is_unknown() {
        assert_eq!(status_message(MQ_ERROR_ACCESS_DENIED), "MQ_ERROR_ACCESS_DENIED");
        assert_eq!(status_message(0xDEAD_BEEF), "unknown status");
    }

    #[test]
    fn names_cover_every_single_bit() {
        let all = RIGHTS.iter().fold(0, |a, (_, b)| a | b);
        assert_eq!(all, QueueRight::GENERIC_ALL);
        assert_eq!(rights_to_names(all).len(), RIGHTS.len());
    }

    #[test]
    fn composite_and_single_names_mix() {
        let mask = names_to_rights(&["receive_message", "WRITE_MESSAGE", "bogus"]);
        assert_eq!(mask, QueueRight::RECEIVE_MESSAGE | QueueRight::WRITE_MESSAGE);
        assert_eq!(composite_names(mask), vec!["receive_message"]);
    }
}
