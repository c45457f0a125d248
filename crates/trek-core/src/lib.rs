//! trek-core - Core library for Trek
//!
//! This crate contains the models, offline cache, sync engine, and currency
//! conversion shared by all Trek interfaces. Records are written straight to
//! the remote document store while online and queued in a local key-value
//! cache while offline, then reconciled by [`services::SyncReconciler`].

pub mod alerts;
pub mod auth;
pub mod config;
pub mod currency;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod storage;
pub mod util;

pub use error::{Error, Result};
pub use models::{Category, Entity, EntityId, EntityKind, Expense, SyncState, Trip};
