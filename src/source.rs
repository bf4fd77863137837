//! Security descriptor sources and the two-phase size-then-fetch query.
//!
//! A source is asked twice for the same queue:
//! 1. with an empty buffer; it must answer `MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL`
//!    and report the length it needs
//! 2. with a buffer of that length; it must answer `MQ_OK`
//!
//! The "too small" answer on the first call is the normal path. Success on
//! the first call means the descriptor is empty, which is malformed. Any other
//! status on either call is surfaced as an error and never retried.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::{
    DACL_SECURITY_INFORMATION, MQ_ERROR, MQ_ERROR_ACCESS_DENIED, MQ_ERROR_ILLEGAL_FORMATNAME,
    MQ_ERROR_QUEUE_NOT_FOUND, MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL, MQ_OK,
};
use crate::error::{MqsecError, Result};
use crate::queue_path::QueuePath;

/// Extension of descriptor files in a [`DirectorySource`]
pub const DESCRIPTOR_EXT: &str = "sd";

/// Answer of one [`SecuritySource::get_queue_security`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOutcome {
    pub status: u32,
    /// Bytes the full descriptor occupies
    pub length_needed: usize,
}

impl QueryOutcome {
    pub const fn ok(length: usize) -> Self {
        Self { status: MQ_OK, length_needed: length }
    }

    pub const fn too_small(needed: usize) -> Self {
        Self {
            status: MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL,
            length_needed: needed,
        }
    }

    pub const fn failed(status: u32) -> Self {
        Self { status, length_needed: 0 }
    }
}

/// Something that can hand out a queue's self-relative security descriptor.
pub trait SecuritySource {
    /// Copy the descriptor parts selected by `info` for `format_name` into `buf`.
    ///
    /// When `buf` is shorter than the descriptor, nothing is copied and the
    /// outcome is "too small" with the required length.
    fn get_queue_security(&self, format_name: &str, info: u32, buf: &mut [u8]) -> QueryOutcome;
}

impl<S: SecuritySource + ?Sized> SecuritySource for &S {
    fn get_queue_security(&self, format_name: &str, info: u32, buf: &mut [u8]) -> QueryOutcome {
        (**self).get_queue_security(format_name, info, buf)
    }
}

/// Run the two-phase query and return the descriptor bytes for `queue`.
pub fn fetch_descriptor<S: SecuritySource + ?Sized>(source: &S, queue: &QueuePath) -> Result<Vec<u8>> {
    let format_name = queue.format_name();

    let probe = source.get_queue_security(&format_name, DACL_SECURITY_INFORMATION, &mut []);
    if probe.status == MQ_OK {
        warn!(%format_name, "size query succeeded with an empty buffer");
        return Err(MqsecError::descriptor(format!(
            "{format_name} returned an empty security descriptor"
        )));
    }
    if probe.status != MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL {
        warn!(%format_name, status = probe.status, "size query did not report a required length");
        return Err(MqsecError::DescriptorQueryFailed { format_name, status: probe.status });
    }
    debug!(%format_name, needed = probe.length_needed, "descriptor size negotiated");

    let mut buf = vec![0u8; probe.length_needed];
    let fetch = source.get_queue_security(&format_name, DACL_SECURITY_INFORMATION, &mut buf);
    match fetch.status {
        MQ_OK => {
            buf.truncate(fetch.length_needed.min(buf.len()));
            debug!(%format_name, len = buf.len(), "fetched security descriptor");
            Ok(buf)
        }
        MQ_ERROR_SECURITY_DESCRIPTOR_TOO_SMALL => Err(MqsecError::BufferTooSmall {
            provided: buf.len(),
            needed: fetch.length_needed,
        }),
        status => Err(MqsecError::DescriptorQueryFailed { format_name, status }),
    }
}

/// Copy `descriptor` into `buf` following the size protocol
fn answer(descriptor: &[u8], buf: &mut [u8]) -> QueryOutcome {
    if buf.len() < descriptor.len() {
        return QueryOutcome::too_small(descriptor.len());
    }
    buf[..descriptor.len()].copy_from_slice(descriptor);
    QueryOutcome::ok(descriptor.len())
}

// ============================================================================
// In-memory source
// ============================================================================

#[derive(Debug, Clone)]
enum Entry {
    Descriptor(Vec<u8>),
    Fails(u32),
}

/// Descriptors held in memory, keyed by format name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    queues: HashMap<String, Entry>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, queue: &QueuePath, descriptor: Vec<u8>) -> &mut Self {
        self.queues.insert(queue.format_name(), Entry::Descriptor(descriptor));
        self
    }

    /// Make every query for `queue` answer `status`
    pub fn fail_with(&mut self, queue: &QueuePath, status: u32) -> &mut Self {
        self.queues.insert(queue.format_name(), Entry::Fails(status));
        self
    }
}

impl SecuritySource for MemorySource {
    fn get_queue_security(&self, format_name: &str, _info: u32, buf: &mut [u8]) -> QueryOutcome {
        match self.queues.get(format_name) {
            Some(Entry::Descriptor(d)) => answer(d, buf),
            Some(Entry::Fails(status)) => QueryOutcome::failed(*status),
            None => QueryOutcome::failed(MQ_ERROR_QUEUE_NOT_FOUND),
        }
    }
}

// ============================================================================
// Directory source
// ============================================================================

/// Descriptors stored as raw files `<root>/<queue>.sd`.
///
/// Only queues on the local computer (`.`) or on a computer whose name matches
/// `computer` are served.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    computer: Option<String>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(MqsecError::Config(format!(
                "descriptor store {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root, computer: None })
    }

    /// Also serve queues addressed to this computer name
    pub fn with_computer(mut self, computer: &str) -> Self {
        self.computer = Some(computer.to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the descriptor of `queue`; always a direct child of the root
    pub fn descriptor_path(&self, queue: &str) -> PathBuf {
        self.root.join(format!("{queue}.{DESCRIPTOR_EXT}"))
    }

    fn serves(&self, path: &QueuePath) -> bool {
        path.computer() == crate::queue_path::LOCAL_COMPUTER
            || self
                .computer
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(path.computer()))
    }
}

impl SecuritySource for DirectorySource {
    fn get_queue_security(&self, format_name: &str, _info: u32, buf: &mut [u8]) -> QueryOutcome {
        let Ok(path) = format_name.parse::<QueuePath>() else {
            return QueryOutcome::failed(MQ_ERROR_ILLEGAL_FORMATNAME);
        };
        if !self.serves(&path) {
            return QueryOutcome::failed(MQ_ERROR_QUEUE_NOT_FOUND);
        }
        let file = self.descriptor_path(path.queue());
        if file.parent() != Some(self.root.as_path()) {
            return QueryOutcome::failed(MQ_ERROR_ILLEGAL_FORMATNAME);
        }
        match std::fs::read(&file) {
            Ok(descriptor) => answer(&descriptor, buf),
            Err(e) => {
                debug!(file = %file.display(), error = %e, "descriptor file unreadable");
                QueryOutcome::failed(match e.kind() {
                    io::ErrorKind::NotFound => MQ_ERROR_QUEUE_NOT_FOUND,
                    io::ErrorKind::PermissionDenied => MQ_ERROR_ACCESS_DENIED,
                    _ => MQ_ERROR,
                })
            }
        }
    }
}
