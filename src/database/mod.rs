pub mod memory;
pub mod models;
pub mod postgrest;
pub mod store;

pub use memory::{MemorySeed, MemoryStore};
pub use postgrest::PostgrestStore;
pub use store::{Store, StoreError};
