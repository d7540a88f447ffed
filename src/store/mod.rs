//! Entity cache and mutation synchronization.

pub mod entry;
pub mod sync;
pub mod traits;

pub use entry::{CacheEntry, EntryState};
pub use sync::EntityStore;
pub use traits::Resource;
