//! Durable key/value storage for chat sessions and preferences.
//!
//! Keys are flat strings; values are opaque UTF-8 text. Callers own the key
//! namespace. The store never interprets keys beyond encoding them into file
//! names.

mod error;
mod memory;
mod paths;
mod store;

pub use error::SessionStoreError;
pub use memory::MemoryStore;
pub use paths::{decode_key, entry_file_name, ENTRY_EXTENSION};
pub use store::{FileStore, KeyValueStore};
