//! Database layer for Trek

mod connection;
mod migrations;

pub use connection::{Database, RemoteConfig};
