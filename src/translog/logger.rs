//! Persistence contract
//!
//! Every transaction log backend implements `TransactionLogger`; the engine
//! and the recovery coordinator only ever talk to this trait.

use crossbeam::channel::Receiver;

use crate::error::{KvError, Result};
use super::Event;

/// Capability set of a transaction log backend
///
/// ## Lifecycle
/// 1. `read_trans_log` once, draining both streams (replay)
/// 2. `start` the background writer
/// 3. `write_put` / `write_delete` for every successful mutation
/// 4. `wait` and `close` on shutdown
pub trait TransactionLogger: Send + Sync {
    /// Queue a put record. Blocks only while the pending queue is full.
    fn write_put(&self, key: &str, value: &str) -> Result<()>;

    /// Queue a delete record. Blocks only while the pending queue is full.
    fn write_delete(&self, key: &str) -> Result<()>;

    /// Stream of asynchronous write failures
    fn err(&self) -> Receiver<KvError>;

    /// Replay recorded events from the current read position to the end.
    ///
    /// Both receivers disconnect when the scan ends. At most one error is
    /// sent, after which no further events follow.
    fn read_trans_log(&self) -> (Receiver<Event>, Receiver<KvError>);

    /// Start the background writer; sequence numbers continue from the
    /// last replayed record.
    fn start(&mut self) -> Result<()>;

    /// Block until every queued event has been written or has failed
    fn wait(&self);

    /// Drain, stop the writer and flush the log to disk
    fn close(&mut self) -> Result<()>;

    /// Last assigned or last replayed sequence number
    fn last_sequence(&self) -> u64;
}
