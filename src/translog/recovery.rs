//! Startup recovery
//!
//! Rebuilds the store from the transaction log before any live write is
//! accepted, then hands the log over to the background writer.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{never, Receiver};
use crossbeam::select;

use crate::error::{KvError, Result};
use crate::store::KeyValueStore;
use super::{Event, EventKind, TransactionLogger};

/// Result of a recovery pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Number of events applied to the store
    pub events_replayed: u64,

    pub puts: u64,

    pub deletes: u64,

    /// Sequence number the writer will continue from
    pub last_sequence: u64,
}

impl RecoveryStats {
    fn apply(&mut self, store: &KeyValueStore, event: Event) {
        match event.kind {
            EventKind::Put => {
                store.put(event.key, event.value);
                self.puts += 1;
            }
            EventKind::Delete => {
                store.delete(&event.key);
                self.deletes += 1;
            }
        }
        self.events_replayed += 1;
    }
}

/// Apply every logged event to `store`, in log order
///
/// Returns the first replay error; the store must then be discarded.
pub fn replay(store: &KeyValueStore, logger: &dyn TransactionLogger) -> Result<RecoveryStats> {
    let (events, errors) = logger.read_trans_log();
    let no_errors = never::<KvError>();
    let mut errors_open = true;
    let mut stats = RecoveryStats::default();

    loop {
        let error_stream = if errors_open { &errors } else { &no_errors };
        select! {
            recv(error_stream) -> msg => match msg {
                Ok(err) => return Err(err),
                Err(_) => errors_open = false,
            },
            recv(events) -> msg => match msg {
                Ok(event) => stats.apply(store, event),
                Err(_) => break,
            },
        }
    }

    // An error sent just before the scan ended may still be queued
    if errors_open {
        if let Ok(err) = errors.recv() {
            return Err(err);
        }
    }

    stats.last_sequence = logger.last_sequence();
    Ok(stats)
}

/// Replay the log into `store`, then start the logger's writer
///
/// Any replay failure is fatal: the logger is left unstarted.
pub fn recover(store: &KeyValueStore, logger: &mut dyn TransactionLogger) -> Result<RecoveryStats> {
    let stats = match replay(store, &*logger) {
        Ok(stats) => stats,
        Err(err) => {
            tracing::error!("Transaction log replay failed: {}", err);
            return Err(err);
        }
    };

    tracing::info!(
        "Transaction log recovery: {} events replayed ({} puts, {} deletes), last_sequence={}",
        stats.events_replayed,
        stats.puts,
        stats.deletes,
        stats.last_sequence
    );

    logger.start()?;
    Ok(stats)
}

/// Log every asynchronous write failure for the lifetime of the logger
///
/// The thread exits once the logger (and with it every error sender) is
/// dropped.
pub fn forward_errors(errors: Receiver<KvError>) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("kvlog-errors".to_string())
        .spawn(move || {
            for err in errors.iter() {
                tracing::error!(
                    error = %err,
                    "transaction log write failed; the most recent mutation may not survive a crash"
                );
            }
        })?;
    Ok(handle)
}
