//! DACL walking and ACE matching tests
//!
//! These tests build self-relative descriptors byte by byte and verify the
//! distinct outcomes of an access check: mask, no DACL, no matching ACE and
//! malformed input.

mod common;

use common::*;
use mqsec::constants::{SYSTEM_AUDIT_ACE_TYPE, SYSTEM_MANDATORY_LABEL_ACE_TYPE};
use mqsec::{access_mask_for_sid, parse_dacl, Ace, Acl, DaclLocation, MqsecError, QueueRight};

// ============================================================================
// Matching
// ============================================================================

/// Verify the single-entry scenario: receive rights for one SID, nothing for another
#[test]
fn single_allowed_entry_end_to_end() {
    let sd = descriptor(&[allow(0x0000_0003, ALICE)]);

    let mask = access_mask_for_sid(&sd, ALICE).unwrap();
    assert_eq!(mask.bits(), 0x0000_0003);
    assert_eq!(mask.bits(), QueueRight::RECEIVE_MESSAGE);
    assert!(mask.contains(QueueRight::RECEIVE_MESSAGE));

    let err = access_mask_for_sid(&sd, NOBODY).unwrap_err();
    assert!(matches!(err, MqsecError::NoMatchingAce { ref sid } if sid == NOBODY));
}

/// Verify the entry for the target is found among others
#[test]
fn match_among_several_entries() {
    let sd = descriptor(&[
        allow(QueueRight::GENERIC_READ, EVERYONE),
        allow(QueueRight::WRITE_MESSAGE, BOB),
        allow(QueueRight::GENERIC_ALL, ALICE),
    ]);
    assert_eq!(access_mask_for_sid(&sd, BOB).unwrap().bits(), QueueRight::WRITE_MESSAGE);
    assert_eq!(access_mask_for_sid(&sd, ALICE).unwrap().bits(), QueueRight::GENERIC_ALL);
    assert_eq!(access_mask_for_sid(&sd, EVERYONE).unwrap().bits(), QueueRight::GENERIC_READ);
}

/// Verify the first matching entry wins and masks are not merged
#[test]
fn first_match_wins() {
    let sd = descriptor(&[
        allow(QueueRight::PEEK_MESSAGE, ALICE),
        allow(QueueRight::WRITE_MESSAGE, ALICE),
    ]);
    assert_eq!(access_mask_for_sid(&sd, ALICE).unwrap().bits(), QueueRight::PEEK_MESSAGE);
}

/// Verify mask bits outside the named rights are returned unchanged
#[test]
fn unnamed_bits_preserved() {
    let sd = descriptor(&[allow(0x1000_0002, ALICE)]);
    assert_eq!(access_mask_for_sid(&sd, ALICE).unwrap().bits(), 0x1000_0002);
}

/// Verify a DACL placed after an owner SID is located through its offset
#[test]
fn dacl_after_owner() {
    let sd = common::DescriptorBuilder::new()
        .owner(BOB)
        .dacl(acl(&[allow(QueueRight::GENERIC_WRITE, ALICE)]))
        .build();
    assert_eq!(parse_dacl(&sd).unwrap().view().unwrap().offset, 20 + 28);
    assert_eq!(access_mask_for_sid(&sd, ALICE).unwrap().bits(), QueueRight::GENERIC_WRITE);
}

/// Verify bytes after the DACL are in the view but outside the parsed ACL
#[test]
fn trailing_region_outside_acl() {
    let acl_bytes = acl(&[allow(QueueRight::RECEIVE_MESSAGE, ALICE)]);
    let mut sd = DescriptorBuilder::new().dacl(acl_bytes.clone()).build();
    sd.extend_from_slice(&[0xFF; 16]);

    let view = parse_dacl(&sd).unwrap().view().unwrap();
    assert_eq!(view.len, acl_bytes.len() + 16);

    let parsed = Acl::parse(view.slice(&sd).unwrap()).unwrap();
    assert_eq!(parsed.header().acl_size as usize, acl_bytes.len());
    assert_eq!(parsed.size_info().bytes_free, 0);
    assert_eq!(access_mask_for_sid(&sd, ALICE).unwrap().bits(), QueueRight::RECEIVE_MESSAGE);
}

/// Verify the target SID is compared in canonical form
#[test]
fn target_sid_canonicalized() {
    let sd = descriptor(&[allow(QueueRight::RECEIVE_MESSAGE, ALICE)]);
    let lower = ALICE.to_lowercase();
    assert_eq!(access_mask_for_sid(&sd, &lower).unwrap().bits(), QueueRight::RECEIVE_MESSAGE);
}

/// Verify an unparseable target SID is a decode error, not "not found"
#[test]
fn invalid_target_sid() {
    let sd = descriptor(&[allow(QueueRight::RECEIVE_MESSAGE, ALICE)]);
    assert!(matches!(
        access_mask_for_sid(&sd, "alice"),
        Err(MqsecError::InvalidSid(_))
    ));
}

// ============================================================================
// Absent DACL / empty DACL
// ============================================================================

/// Verify a descriptor without a DACL yields NoDacl for every SID
#[test]
fn no_dacl_regardless_of_sid() {
    let sd = common::DescriptorBuilder::new().owner(ALICE).build();
    assert_eq!(parse_dacl(&sd).unwrap(), DaclLocation::Absent);
    for sid in [ALICE, BOB, NOBODY, EVERYONE] {
        assert!(matches!(access_mask_for_sid(&sd, sid), Err(MqsecError::NoDacl)));
    }
}

/// Verify a null DACL is reported as NoDacl, not a zero mask
#[test]
fn null_dacl_is_no_dacl() {
    let sd = common::DescriptorBuilder::new().null_dacl().build();
    assert!(matches!(access_mask_for_sid(&sd, ALICE), Err(MqsecError::NoDacl)));
}

/// Verify an empty DACL yields NoMatchingAce for any SID
#[test]
fn empty_dacl_no_match() {
    let sd = descriptor(&[]);
    for sid in [ALICE, EVERYONE] {
        assert!(matches!(
            access_mask_for_sid(&sd, sid),
            Err(MqsecError::NoMatchingAce { .. })
        ));
    }
}

// ============================================================================
// Non-allowed entry types
// ============================================================================

/// Verify a deny entry for the target is skipped and the later allow entry used
#[test]
fn deny_entry_skipped() {
    let sd = descriptor(&[
        deny(QueueRight::WRITE_MESSAGE, ALICE),
        allow(QueueRight::RECEIVE_MESSAGE, ALICE),
    ]);
    assert_eq!(access_mask_for_sid(&sd, ALICE).unwrap().bits(), QueueRight::RECEIVE_MESSAGE);
}

/// Verify a DACL of only non-allowed entries naming the target yields NoMatchingAce
#[test]
fn only_skipped_entries() {
    let sd = descriptor(&[
        deny(QueueRight::GENERIC_ALL, ALICE),
        ace(SYSTEM_AUDIT_ACE_TYPE, 0xC0, QueueRight::GENERIC_ALL, ALICE),
        ace(SYSTEM_MANDATORY_LABEL_ACE_TYPE, 0, 1, ALICE),
    ]);
    assert!(matches!(
        access_mask_for_sid(&sd, ALICE),
        Err(MqsecError::NoMatchingAce { .. })
    ));
}

/// Verify skipped entries are not decoded: a garbage body is still stepped over
#[test]
fn skipped_payload_not_decoded() {
    let garbage = vec![0x01, 0x00, 8, 0, 0xFF, 0xFF, 0xFF, 0xFF];
    let sd = descriptor(&[garbage, allow(QueueRight::PEEK_MESSAGE, ALICE)]);
    assert_eq!(access_mask_for_sid(&sd, ALICE).unwrap().bits(), QueueRight::PEEK_MESSAGE);
}

/// Verify an unrecognised type tag is malformed, even before a matching entry
#[test]
fn unknown_type_malformed() {
    let sd = descriptor(&[
        ace(0x7F, 0, QueueRight::GENERIC_ALL, BOB),
        allow(QueueRight::PEEK_MESSAGE, ALICE),
    ]);
    assert!(matches!(access_mask_for_sid(&sd, ALICE), Err(MqsecError::MalformedAcl(_))));
}

// ============================================================================
// Malformed input
// ============================================================================

/// Verify a count of 5 with only 2 entries is malformed, not a partial match
#[test]
fn count_overruns_entries() {
    let entries = [allow(QueueRight::RECEIVE_MESSAGE, ALICE), allow(QueueRight::PEEK_MESSAGE, BOB)];
    let sd = common::DescriptorBuilder::new()
        .dacl(acl_with_count(5, &entries))
        .build();
    assert!(matches!(access_mask_for_sid(&sd, ALICE), Err(MqsecError::MalformedAcl(_))));
    assert!(matches!(access_mask_for_sid(&sd, NOBODY), Err(MqsecError::MalformedAcl(_))));
}

/// Verify an entry whose size runs past the ACL is malformed
#[test]
fn entry_size_overruns_acl() {
    let mut entry = allow(QueueRight::RECEIVE_MESSAGE, ALICE);
    entry[2] += 4;
    let sd = descriptor(&[entry]);
    assert!(matches!(access_mask_for_sid(&sd, ALICE), Err(MqsecError::MalformedAcl(_))));
}

/// Verify a SID that claims more sub-authorities than its entry holds is malformed
#[test]
fn sid_overruns_entry() {
    let mut entry = allow(QueueRight::RECEIVE_MESSAGE, ALICE);
    entry[9] = 6;
    let sd = descriptor(&[entry]);
    assert!(matches!(access_mask_for_sid(&sd, ALICE), Err(MqsecError::MalformedAcl(_))));
}

/// Verify an ACL size larger than the descriptor is malformed
#[test]
fn acl_size_past_descriptor() {
    let mut sd = descriptor(&[allow(QueueRight::RECEIVE_MESSAGE, ALICE)]);
    let len = sd.len();
    sd.truncate(len - 4);
    assert!(matches!(access_mask_for_sid(&sd, ALICE), Err(MqsecError::MalformedAcl(_))));
}

/// Verify truncated descriptor headers are malformed descriptors
#[test]
fn truncated_header() {
    let sd = descriptor(&[allow(QueueRight::RECEIVE_MESSAGE, ALICE)]);
    for len in [0, 1, 8, 19] {
        assert!(matches!(
            access_mask_for_sid(&sd[..len], ALICE),
            Err(MqsecError::MalformedDescriptor(_))
        ));
    }
}

/// Verify every truncation of a valid descriptor fails cleanly
#[test]
fn every_truncation_is_an_error() {
    let sd = descriptor(&[
        deny(QueueRight::WRITE_MESSAGE, BOB),
        allow(QueueRight::RECEIVE_MESSAGE, ALICE),
    ]);
    for len in 0..sd.len() {
        let r = access_mask_for_sid(&sd[..len], ALICE);
        assert!(
            matches!(r, Err(MqsecError::MalformedDescriptor(_)) | Err(MqsecError::MalformedAcl(_))),
            "len {len}: {r:?}"
        );
    }
}

// ============================================================================
// Enumeration
// ============================================================================

/// Verify entries enumerate in stored order with their types
#[test]
fn enumerate_entries() {
    let sd = descriptor(&[
        deny(QueueRight::WRITE_MESSAGE, BOB),
        allow(QueueRight::RECEIVE_MESSAGE, ALICE),
    ]);
    let view = parse_dacl(&sd).unwrap().view().unwrap();
    let acl = Acl::parse(view.slice(&sd).unwrap()).unwrap();
    assert_eq!(acl.header().ace_count, 2);
    assert_eq!(acl.size_info().bytes_free, 0);

    let entries: Vec<Ace> = acl.entries().map(|e| e.unwrap()).collect();
    assert!(matches!(entries[0], Ace::Skipped(h) if h.ace_type == 1));
    match &entries[1] {
        Ace::AccessAllowed(a) => {
            assert_eq!(a.sid.to_string(), ALICE);
            assert_eq!(a.mask.bits(), QueueRight::RECEIVE_MESSAGE);
        }
        other => panic!("expected access-allowed entry, got {other:?}"),
    }
}
