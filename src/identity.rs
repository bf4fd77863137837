//! Principal name to SID resolution

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MqsecError, Result};
use crate::sid::Sid;

/// Maps a textual principal name (e.g. `DOMAIN\alice`) to its SID.
pub trait IdentityResolver {
    /// Fails with [`MqsecError::PrincipalResolutionFailed`] when the name is unknown.
    fn resolve_sid(&self, name: &str) -> Result<Sid>;
}

impl<R: IdentityResolver + ?Sized> IdentityResolver for &R {
    fn resolve_sid(&self, name: &str) -> Result<Sid> {
        (**self).resolve_sid(name)
    }
}

/// Canonical SID text for a principal name
pub fn principal_name_to_sid_text<R: IdentityResolver + ?Sized>(resolver: &R, name: &str) -> Result<String> {
    Ok(resolver.resolve_sid(name)?.to_string())
}

/// On-disk form of a principal table: `{"DOMAIN\\alice": "S-1-5-21-..."}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalMap(pub HashMap<String, Sid>);

/// Fixed name table. Lookups ignore ASCII case, as account names do.
/// A name that is already SID text resolves to itself.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    names: HashMap<String, Sid>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, sid: Sid) -> &mut Self {
        self.names.insert(name.to_ascii_lowercase(), sid);
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl From<PrincipalMap> for StaticResolver {
    fn from(map: PrincipalMap) -> Self {
        let mut r = Self::new();
        for (name, sid) in map.0 {
            r.insert(&name, sid);
        }
        r
    }
}

impl IdentityResolver for StaticResolver {
    fn resolve_sid(&self, name: &str) -> Result<Sid> {
        if let Some(sid) = self.names.get(&name.to_ascii_lowercase()) {
            debug!(principal = name, %sid, "resolved principal");
            return Ok(sid.clone());
        }
        if name.starts_with("S-") || name.starts_with("s-") {
            return Sid::parse(name).map_err(|e| MqsecError::PrincipalResolutionFailed {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }
        Err(MqsecError::PrincipalResolutionFailed {
            name: name.to_string(),
            reason: "no such account".into(),
        })
    }
}
