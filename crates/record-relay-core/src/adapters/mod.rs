//! # Infrastructure Adapters
//!
//! Infrastructure implementations of the status store interface.

pub mod filesystem_status_store;
pub mod memory_status_store;

pub use filesystem_status_store::FilesystemStatusStore;
pub use memory_status_store::InMemoryStatusStore;
