//! Engine Module
//!
//! Owns one store and one transaction logger and applies the
//! "mutate, then log" contract for every request.
//!
//! ## Responsibilities
//! - Run recovery before serving any request
//! - Validate keys and values against the log format
//! - Log every successful mutation, in the order it was applied
//! - Drain and close the log on shutdown

use std::path::Path;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::Command;
use crate::store::KeyValueStore;
use crate::translog::{
    forward_errors, recover, validate_field, FileTransactionLogger, LoggerOptions, RecoveryStats,
    TransactionLogger,
};

/// The main storage engine
///
/// ## Lifecycle
/// construct → recover → serve → drain-and-close. `open` performs the
/// first two steps; `close` the last.
///
/// ## Concurrency Model
///
/// - **Writes** (put/delete): serialized by `write_lock` so the store and
///   the log see mutations in the same order
/// - **Reads** (get): only take the store's read lock
pub struct Engine {
    config: Config,

    store: KeyValueStore,

    logger: Box<dyn TransactionLogger>,

    /// Serializes "mutate store, then enqueue event"
    write_lock: Mutex<()>,

    recovery: RecoveryStats,

    /// Thread forwarding write errors to the log sink
    error_sink: Option<JoinHandle<()>>,
}

impl Engine {
    /// Open the log at `config.log_path`, replay it and start logging
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let logger = FileTransactionLogger::open(&config.log_path, LoggerOptions::from(&config))?;
        Self::with_logger(config, Box::new(logger))
    }

    /// Open with a log path (convenience method)
    ///
    /// Uses default config with the specified log file
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().log_path(path).build();
        Self::open(config)
    }

    /// Recover from an already constructed, unstarted logger
    pub fn with_logger(config: Config, mut logger: Box<dyn TransactionLogger>) -> Result<Self> {
        let store = KeyValueStore::new();
        let recovery = recover(&store, logger.as_mut())?;
        let error_sink = forward_errors(logger.err())?;

        tracing::info!("Engine ready with {} keys", store.len());

        Ok(Self {
            config,
            store,
            logger,
            write_lock: Mutex::new(()),
            recovery,
            error_sink: Some(error_sink),
        })
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<String>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some("PONG".to_string())),
        }
    }

    /// Get a value by key, or `KvError::NotFound`
    pub fn get(&self, key: &str) -> Result<String> {
        self.store.get(key)
    }

    /// Put a key-value pair and queue its log record
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        validate_field("key", key)?;
        validate_field("value", value)?;

        let _write_guard = self.write_lock.lock();
        self.store.put(key, value);
        self.logger.write_put(key, value)
    }

    /// Delete a key and queue its log record, whether or not it existed
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_field("key", key)?;

        let _write_guard = self.write_lock.lock();
        self.store.delete(key);
        self.logger.write_delete(key)
    }

    /// Block until every queued record has been written or has failed
    pub fn drain(&self) {
        self.logger.wait();
    }

    /// Close the engine gracefully
    ///
    /// Drains the queue, stops the writer and syncs the log file
    pub fn close(self) -> Result<()> {
        let Engine {
            mut logger,
            error_sink,
            ..
        } = self;

        logger.close()?;
        drop(logger);

        if let Some(handle) = error_sink {
            let _ = handle.join();
        }

        tracing::info!("Engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    /// Last sequence number written (or replayed)
    pub fn last_sequence(&self) -> u64 {
        self.logger.last_sequence()
    }

    /// Stats from the startup replay
    pub fn recovery_stats(&self) -> &RecoveryStats {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
