//! Transaction Log Module
//!
//! Durably records store mutations so the store can be rebuilt after a
//! restart or crash.
//!
//! ## Responsibilities
//! - Queue mutation events without blocking callers (bounded backpressure)
//! - Assign gap-free sequence numbers on a single writer thread
//! - Replay the log into a fresh store at startup, failing fast on
//!   corruption
//! - Surface asynchronous write failures on an error channel
//!
//! ## File Format
//! UTF-8 text, one record per line, never rewritten:
//! ```text
//! ┌──────────┬──────┬──────┬──────────────────┐
//! │ sequence │ kind │ key  │ value (empty: D) │  \t-separated, \n-terminated
//! └──────────┴──────┴──────┴──────────────────┘
//! 1	P	a	1
//! 2	P	b	2
//! 3	D	a
//! ```

mod event;
mod file;
mod logger;
mod pending;
mod reader;
mod recovery;
mod writer;

pub use event::{validate_field, Event, EventKind};
pub use file::{FileTransactionLogger, LoggerOptions};
pub use logger::TransactionLogger;
pub use recovery::{forward_errors, recover, replay, RecoveryStats};
