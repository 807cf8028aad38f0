//! # Recipebox Storage
//!
//! Durable block store trait and implementations for recipebox.
//!
//! A block store is a named, key-addressed store of **opaque byte blobs**.
//! Recipebox keeps exactly one blob in it: the full image of the embedded
//! query engine, rewritten after every mutation.
//!
//! ## Design Principles
//!
//! - Stores never interpret the bytes they hold
//! - `put` replaces a value atomically: readers see the old or the new blob,
//!   never a mixture
//! - Must be `Send + Sync` so an engine handle can be shared
//!
//! ## Available Stores
//!
//! - [`InMemoryBlockStore`] - For testing and ephemeral sessions
//! - [`FileBlockStore`] - One directory per store, one file per key
//!
//! ## Example
//!
//! ```rust
//! use recipebox_storage::{BlockStore, InMemoryBlockStore};
//!
//! let store = InMemoryBlockStore::new("recipes");
//! store.put("data", b"image bytes").unwrap();
//! assert_eq!(store.get("data").unwrap().as_deref(), Some(&b"image bytes"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileBlockStore;
pub use memory::InMemoryBlockStore;
pub use store::{validate_key, BlockStore};
