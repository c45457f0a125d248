//! Entity identifiers with an explicit origin tag

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Length of every identifier assigned by the remote document store.
pub const REMOTE_ID_LEN: usize = 20;

const LOCAL_ID_PREFIX: &str = "local-";

/// Where an identifier was minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Generated on this device, never confirmed by the remote store
    Local,
    /// Assigned by the remote store
    Remote,
}

/// Identifier of a trip, category or expense.
///
/// Local ids are UUID v7 (time-sortable) and render with a `local-` prefix,
/// so they can never have the remote id length. The string form is what gets
/// persisted and what users type on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityId {
    Local(String),
    Remote(String),
}

impl EntityId {
    /// Mint a fresh client-side identifier.
    #[must_use]
    pub fn new_local() -> Self {
        Self::Local(Uuid::now_v7().to_string())
    }

    /// Wrap an identifier handed out by the remote store.
    #[must_use]
    pub fn remote(id: impl Into<String>) -> Self {
        Self::Remote(id.into())
    }

    #[must_use]
    pub const fn origin(&self) -> Origin {
        match self {
            Self::Local(_) => Origin::Local,
            Self::Remote(_) => Origin::Remote,
        }
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    /// True only for remote-tagged ids that also have the store's id length.
    ///
    /// This is the guard checked before any remote delete is issued.
    #[must_use]
    pub fn is_remote_shaped(&self) -> bool {
        match self {
            Self::Remote(value) => value.len() == REMOTE_ID_LEN,
            Self::Local(_) => false,
        }
    }

    /// The raw value, without the local prefix.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Local(value) | Self::Remote(value) => value,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(value) => write!(f, "{LOCAL_ID_PREFIX}{value}"),
            Self::Remote(value) => write!(f, "{value}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.is_empty() {
            return Err(Error::Validation("identifier must not be empty".to_string()));
        }

        match value.strip_prefix(LOCAL_ID_PREFIX) {
            Some("") => Err(Error::Validation(format!(
                "local identifier '{value}' has no value"
            ))),
            Some(local) => Ok(Self::Local(local.to_string())),
            None => Ok(Self::Remote(value.to_string())),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}
