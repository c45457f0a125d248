//! Entity stores, sync and the managers front ends talk to.

mod entity_store;
mod manager;
mod network;
mod sync;


pub use entity_store::EntityStore;
pub use manager::{ConvertingSave, DirectSave, EntityManager, SaveStrategy};
pub use network::NetworkStatus;
pub use sync::{KindReport, PhaseFailure, SyncPhase, SyncReconciler, SyncReport};
