//! mqsec - Message queue access checks from security descriptors
//!
//! Walks the DACL of a queue's self-relative security descriptor and returns
//! the access mask of the access-allowed entry naming a principal's SID.
//!
//! ```
//! use mqsec::{access_mask_for_sid, MqsecError, QueueRight};
//!
//! fn can_receive(descriptor: &[u8], sid: &str) -> Result<bool, MqsecError> {
//!     Ok(access_mask_for_sid(descriptor, sid)?.contains(QueueRight::RECEIVE_MESSAGE))
//! }
//! ```

pub mod acl;
pub mod caps;
pub mod check;
pub mod constants;
pub mod descriptor;
pub mod error;
pub mod identity;
pub mod queue_path;
pub mod sid;
pub mod source;

pub use acl::{find_ace_for_sid, AccessAllowedAce, Ace, AceHeader, AceIter, Acl, AclHeader, AclSizeInfo};
pub use caps::{AccessMask, QueueRight};
pub use check::{access_mask_for_sid, access_report, check_access, get_access_mask, AccessReport};
pub use constants::{names_to_rights, right_by_name, rights_to_names, status_message};
pub use descriptor::{parse_dacl, DaclLocation, DaclView, SecurityDescriptorHeader};
pub use error::{MqsecError, Result};
pub use identity::{principal_name_to_sid_text, IdentityResolver, PrincipalMap, StaticResolver};
pub use queue_path::QueuePath;
pub use sid::{sid_bytes_to_text, sid_text_to_bytes, Sid};
pub use source::{fetch_descriptor, DirectorySource, MemorySource, QueryOutcome, SecuritySource};
