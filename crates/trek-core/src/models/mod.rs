//! Data models for Trek

mod category;
mod entity;
mod expense;
mod id;
mod sync_state;
mod trip;

pub use category::{Category, CategoryPatch};
pub use entity::{Entity, EntityKind, EntityMeta, IdRemap};
pub use expense::{Expense, ExpensePatch};
pub use id::{EntityId, Origin, REMOTE_ID_LEN};
pub use sync_state::SyncState;
pub use trip::{Trip, TripPatch};
