//! Storage layer
//!
//! # Architecture
//!
//! Every entity lives in its own table of [`Record`]s keyed by a positive
//! integer id:
//!
//! ```text
//! Table (name → RecordStore<R>)
//!   └─→ Rows (id → R), read back ordered by id
//! ```
//!
//! ## Record Store
//!
//! The [`RecordStore`] trait is the only thing the sequence allocator talks
//! to. It has five operations: create, find by id, find all ordered by id,
//! update by id and delete by id.
//!
//! ## Implementation
//!
//! - [`MemoryStore`] keeps rows in a `BTreeMap` behind a lock
//! - [`FileStore`] adds write-through JSON snapshots, one file per table

pub mod engine;
pub mod file;
pub mod memory;

pub use engine::{Filter, Order, Record, RecordStore};
pub use file::FileStore;
pub use memory::MemoryStore;
