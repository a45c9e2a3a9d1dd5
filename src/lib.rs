//! # kvlog
//!
//! An in-memory key-value store made durable by a transaction log:
//! - Append-only, line-oriented transaction log
//! - Asynchronous writer with bounded backpressure
//! - Startup replay with sequence-number integrity checks
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │              (mutate store, then log)                        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌──────────────┐         ┌──────────────┐
//!   │KeyValueStore │         │ Transaction  │
//!   │   (RwLock)   │◄─replay─│   Logger     │
//!   └──────────────┘         └──────┬───────┘
//!                                   │ writer thread
//!                                   ▼
//!                           ┌──────────────┐
//!                           │  log file    │
//!                           │  (append)    │
//!                           └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod translog;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, SyncPolicy};
pub use engine::Engine;
pub use store::KeyValueStore;
pub use translog::{Event, EventKind, FileTransactionLogger, TransactionLogger};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of kvlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
