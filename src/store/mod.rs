//! Store Module
//!
//! In-memory key-value map shared by every request handler.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Many concurrent readers, or exactly one writer
//! - No knowledge of persistence: callers log mutations themselves
//!
//! ## Data Structure Choice
//! HashMap wrapped in a parking_lot RwLock:
//! - Point lookups only, no ordered scans on the hot path
//! - A write holds the lock for one insert/remove, so no partial
//!   update is ever observable

mod table;

pub use table::KeyValueStore;
