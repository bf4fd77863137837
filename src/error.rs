//! Error types for mqsec

use thiserror::Error;

use crate::constants::status_message;

/// The main error type for mqsec operations.
///
/// Every outcome of an access check that is not an access mask is a distinct
/// variant, so callers can tell "no DACL" apart from "no matching ACE" apart
/// from a decode failure.
#[derive(Debug, Error)]
pub enum MqsecError {
    /// The descriptor source reported an undersized buffer on the data call.
    #[error("security descriptor buffer too small: {provided} bytes provided, {needed} needed")]
    BufferTooSmall { provided: usize, needed: usize },

    /// The descriptor source returned a status other than success.
    #[error("queue security query failed for {format_name}: {} (0x{status:08X})", status_text(.status))]
    DescriptorQueryFailed { format_name: String, status: u32 },

    /// Descriptor header is truncated or references bytes outside the blob.
    #[error("malformed security descriptor: {0}")]
    MalformedDescriptor(String),

    /// ACL header or entries are inconsistent with the declared sizes.
    #[error("malformed ACL: {0}")]
    MalformedAcl(String),

    /// SID bytes or text could not be decoded.
    #[error("invalid SID: {0}")]
    InvalidSid(String),

    #[error("No DACL found for security descriptor")]
    NoDacl,

    #[error("No ACE for SID {sid} found in security descriptor")]
    NoMatchingAce { sid: String },

    /// The identity resolver could not map a principal name to a SID.
    #[error("could not resolve principal {name}: {reason}")]
    PrincipalResolutionFailed { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MqsecError {
    /// Status code carried by a failed descriptor query, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            MqsecError::DescriptorQueryFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn acl(msg: impl Into<String>) -> Self {
        MqsecError::MalformedAcl(msg.into())
    }

    pub(crate) fn descriptor(msg: impl Into<String>) -> Self {
        MqsecError::MalformedDescriptor(msg.into())
    }

    pub(crate) fn sid(msg: impl Into<String>) -> Self {
        MqsecError::InvalidSid(msg.into())
    }
}

fn status_text(status: &u32) -> &'static str {
    status_message(*status)
}

/// Result type alias for mqsec operations
pub type Result<T> = std::result::Result<T, MqsecError>;
