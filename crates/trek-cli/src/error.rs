use std::io;

use thiserror::Error;
use trek_core::alerts::UserAlert;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] trek_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{}: {}", .0.title, .0.message)]
    Alert(UserAlert),
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Record ID cannot be empty")]
    EmptyId,
    #[error("Nothing to update; pass at least one field")]
    EmptyUpdate,
    #[error("No user configured. Pass --user or set TREK_USER_ID.")]
    UserNotConfigured,
    #[error("Failed to resolve a data directory; pass --data-dir or set TREK_DATA_DIR")]
    DataDirUnavailable,
    #[error("Sync needs a connection. Set TREK_REMOTE_URL and run without --offline.")]
    Offline,
}
