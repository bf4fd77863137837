//! Queue addressing: private queues reached through a direct format name.
//!
//! Format: `Direct=OS:<computer>\Private$\<queue>`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MqsecError, Result};

/// Computer name meaning "this machine"
pub const LOCAL_COMPUTER: &str = ".";

/// Serialized as its direct format name; deserialization goes through
/// [`FromStr`] so the same validation applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueuePath {
    computer: String,
    queue: String,
}

impl QueuePath {
    pub fn new(computer: &str, queue: &str) -> Result<Self> {
        if queue.is_empty() {
            return Err(MqsecError::Config("queue name cannot be empty".into()));
        }
        if computer.is_empty() {
            return Err(MqsecError::Config("computer name cannot be empty".into()));
        }
        if queue.contains('\\') || computer.contains('\\') {
            return Err(MqsecError::Config(format!(
                "unexpected backslash in {computer:?}\\{queue:?}"
            )));
        }
        for name in [computer, queue] {
            if name.contains(['/', '\0']) {
                return Err(MqsecError::Config(format!("illegal character in {name:?}")));
            }
        }
        if queue.contains("..") {
            return Err(MqsecError::Config(format!("queue name {queue:?} contains \"..\"")));
        }
        Ok(Self {
            computer: computer.to_string(),
            queue: queue.to_string(),
        })
    }

    /// Private queue on the local computer
    pub fn local(queue: &str) -> Result<Self> {
        Self::new(LOCAL_COMPUTER, queue)
    }

    #[inline]
    pub fn computer(&self) -> &str {
        &self.computer
    }

    #[inline]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Direct format name passed to the descriptor source
    pub fn format_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QueuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Direct=OS:{}\\Private$\\{}", self.computer, self.queue)
    }
}

impl TryFrom<String> for QueuePath {
    type Error = MqsecError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<QueuePath> for String {
    fn from(path: QueuePath) -> Self {
        path.format_name()
    }
}

/// Accepts `queue`, `computer\queue`, `computer\private$\queue` or a full
/// direct format name.
impl FromStr for QueuePath {
    type Err = MqsecError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s
            .strip_prefix("Direct=OS:")
            .or_else(|| s.strip_prefix("DIRECT=OS:"))
            .unwrap_or(s);
        let parts: Vec<&str> = s.split('\\').collect();
        match parts.as_slice() {
            [queue] => Self::local(queue),
            [computer, queue] => Self::new(computer, queue),
            [computer, private, queue] if private.eq_ignore_ascii_case("private$") => {
                Self::new(computer, queue)
            }
            _ => Err(MqsecError::Config(format!("unrecognised queue path {s:?}"))),
        }
    }
}
