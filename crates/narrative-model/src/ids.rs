//! Workspace and object identifiers
//!
//! Provides [`WorkspaceIdentity`] (numeric id or name) and
//! [`ObjectReference`], the canonical `wsid/objid/ver` triple used as the
//! deduplication key everywhere in the catalog.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Errors when parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// Empty identifier
    #[error("empty identifier")]
    Empty,

    /// Reference does not have exactly three slash-separated parts
    #[error("malformed object reference '{0}': expected wsid/objid/ver")]
    Malformed(String),

    /// A reference part is not a number
    #[error("non-numeric {part} in object reference '{input}'")]
    NonNumeric {
        /// Which part failed
        part: &'static str,
        /// Full input
        input: String,
    },
}

/// A workspace selector: numeric id or name
///
/// Anything made purely of ASCII digits is an id, everything else a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceIdentity {
    /// Numeric workspace id
    Id(u64),
    /// Workspace name
    Name(String),
}

impl WorkspaceIdentity {
    /// Normalize an optional id / optional name pair.
    ///
    /// The name wins when both are present; returns `None` when neither is.
    #[must_use]
    pub fn from_parts(id: Option<u64>, name: Option<&str>) -> Option<Self> {
        match (name.filter(|n| !n.is_empty()), id) {
            (Some(name), _) => Some(Self::Name(name.to_string())),
            (None, Some(id)) => Some(Self::Id(id)),
            (None, None) => None,
        }
    }

    /// Numeric id, if this is an id selector
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// Name, if this is a name selector
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Name(name) => Some(name),
        }
    }

    /// Whether this selector matches a workspace with the given id and name
    #[inline]
    #[must_use]
    pub fn matches(&self, id: u64, name: &str) -> bool {
        match self {
            Self::Id(want) => *want == id,
            Self::Name(want) => want == name,
        }
    }
}

impl Display for WorkspaceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl FromStr for WorkspaceIdentity {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            // all-digit strings can still overflow u64; those are names
            if let Ok(id) = s.parse() {
                return Ok(Self::Id(id));
            }
        }
        Ok(Self::Name(s.to_string()))
    }
}

impl From<u64> for WorkspaceIdentity {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

/// Canonical object reference `wsid/objid/ver`
///
/// Equality and hashing are over all three parts: the same object id can
/// appear at different versions or in different workspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectReference {
    /// Workspace id
    pub wsid: u64,
    /// Object id within the workspace
    pub objid: u64,
    /// Object version
    pub version: u64,
}

impl ObjectReference {
    /// Create new reference
    #[inline]
    #[must_use]
    pub const fn new(wsid: u64, objid: u64, version: u64) -> Self {
        Self {
            wsid,
            objid,
            version,
        }
    }
}

impl Display for ObjectReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.wsid, self.objid, self.version)
    }
}

impl FromStr for ObjectReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let parts: Vec<&str> = s.split('/').collect();
        let [wsid, objid, version] = parts.as_slice() else {
            return Err(ReferenceError::Malformed(s.to_string()));
        };
        let num = |part: &'static str, raw: &str| {
            raw.parse::<u64>().map_err(|_| ReferenceError::NonNumeric {
                part,
                input: s.to_string(),
            })
        };
        Ok(Self::new(
            num("workspace id", wsid)?,
            num("object id", objid)?,
            num("version", version)?,
        ))
    }
}

impl Serialize for ObjectReference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectReference {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
