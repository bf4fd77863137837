//! Access checks: descriptor bytes + principal in, access mask out

use serde::Serialize;
use tracing::debug;

use crate::acl::find_ace_for_sid;
use crate::caps::AccessMask;
use crate::descriptor::parse_dacl;
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::queue_path::QueuePath;
use crate::sid::Sid;
use crate::source::{fetch_descriptor, SecuritySource};

/// Access mask granted to `sid_text` by a raw security descriptor.
///
/// Outcomes: the mask of the first matching access-allowed entry,
/// [`NoDacl`](crate::MqsecError::NoDacl),
/// [`NoMatchingAce`](crate::MqsecError::NoMatchingAce), or a decode error.
/// No default is applied for a missing entry.
pub fn access_mask_for_sid(descriptor: &[u8], sid_text: &str) -> Result<AccessMask> {
    let view = parse_dacl(descriptor)?.view()?;
    find_ace_for_sid(descriptor, view, sid_text)
}

/// Resolve `username`, fetch the queue's descriptor and return the user's mask.
pub fn get_access_mask<S, R>(source: &S, resolver: &R, queue: &QueuePath, username: &str) -> Result<AccessMask>
where
    S: SecuritySource + ?Sized,
    R: IdentityResolver + ?Sized,
{
    Ok(resolve(source, resolver, queue, username)?.1)
}

fn resolve<S, R>(source: &S, resolver: &R, queue: &QueuePath, username: &str) -> Result<(Sid, AccessMask)>
where
    S: SecuritySource + ?Sized,
    R: IdentityResolver + ?Sized,
{
    let sid = resolver.resolve_sid(username)?;
    let descriptor = fetch_descriptor(source, queue)?;
    let mask = access_mask_for_sid(&descriptor, &sid.to_string())?;
    debug!(%queue, username, %sid, mask = mask.bits(), "resolved access mask");
    Ok((sid, mask))
}

/// True if `mask` grants every bit of `required`
#[inline]
pub fn check_access(mask: AccessMask, required: u32) -> bool {
    mask.contains(required)
}

/// Answer to "does this user hold these rights on this queue"
#[derive(Debug, Clone, Serialize)]
pub struct AccessReport {
    pub queue: String,
    pub principal: String,
    pub sid: String,
    pub mask: AccessMask,
    pub rights: Vec<&'static str>,
    pub required: u32,
    pub granted: bool,
}

/// Like [`get_access_mask`], returning a full report for `required`
pub fn access_report<S, R>(
    source: &S,
    resolver: &R,
    queue: &QueuePath,
    username: &str,
    required: u32,
) -> Result<AccessReport>
where
    S: SecuritySource + ?Sized,
    R: IdentityResolver + ?Sized,
{
    let (sid, mask) = resolve(source, resolver, queue, username)?;
    Ok(AccessReport {
        queue: queue.format_name(),
        principal: username.to_string(),
        sid: sid.to_string(),
        mask,
        rights: mask.names(),
        required,
        granted: check_access(mask, required),
    })
}
