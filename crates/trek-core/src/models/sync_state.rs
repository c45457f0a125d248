//! Per-record sync lifecycle

use serde::{Deserialize, Serialize};

/// Lifecycle of a record relative to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Client id, never confirmed by the remote store
    #[default]
    LocalUnsynced,
    /// Remote id, edited locally after creation; update not pushed yet
    RemoteDirty,
    /// Remote id, fully reconciled
    RemoteSynced,
}

impl SyncState {
    /// Legacy `isSynced` flag: the record exists remotely under a store id.
    #[must_use]
    pub const fn is_synced(self) -> bool {
        !matches!(self, Self::LocalUnsynced)
    }

    /// Legacy `syncedUpdate` flag. `None` while the record is local-only.
    #[must_use]
    pub const fn synced_update(self) -> Option<bool> {
        match self {
            Self::LocalUnsynced => None,
            Self::RemoteDirty => Some(false),
            Self::RemoteSynced => Some(true),
        }
    }

    /// State after an in-place edit made without reaching the remote store.
    #[must_use]
    pub const fn after_local_edit(self) -> Self {
        match self {
            Self::LocalUnsynced => Self::LocalUnsynced,
            Self::RemoteDirty | Self::RemoteSynced => Self::RemoteDirty,
        }
    }

    /// Whether the reconciler still has something to push for this record.
    #[must_use]
    pub const fn needs_push(self) -> bool {
        !matches!(self, Self::RemoteSynced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_edit_transitions() {
        assert_eq!(
            SyncState::LocalUnsynced.after_local_edit(),
            SyncState::LocalUnsynced
        );
        assert_eq!(
            SyncState::RemoteSynced.after_local_edit(),
            SyncState::RemoteDirty
        );
        assert_eq!(
            SyncState::RemoteDirty.after_local_edit(),
            SyncState::RemoteDirty
        );
    }

    #[test]
    fn legacy_flags() {
        assert!(!SyncState::LocalUnsynced.is_synced());
        assert_eq!(SyncState::LocalUnsynced.synced_update(), None);
        assert!(SyncState::RemoteDirty.is_synced());
        assert_eq!(SyncState::RemoteDirty.synced_update(), Some(false));
        assert_eq!(SyncState::RemoteSynced.synced_update(), Some(true));
        assert!(!SyncState::RemoteSynced.needs_push());
    }
}
