//! File-backed transaction logger
//!
//! Append-only log file with one background writer thread and a transient
//! replay thread.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::config::{Config, SyncPolicy};
use crate::error::{KvError, Result};
use super::pending::PendingWrites;
use super::writer::{self, WriterContext};
use super::{reader, Event, TransactionLogger};

/// Events buffered between the replay thread and its consumer
const REPLAY_BUFFER: usize = 64;

/// Tuning knobs for a `FileTransactionLogger`
#[derive(Debug, Clone, Copy)]
pub struct LoggerOptions {
    /// Pending-event queue capacity (backpressure threshold)
    pub queue_capacity: usize,

    pub sync_policy: SyncPolicy,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            sync_policy: SyncPolicy::OsBuffered,
        }
    }
}

impl From<&Config> for LoggerOptions {
    fn from(config: &Config) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            sync_policy: config.sync_policy,
        }
    }
}

/// Transaction logger persisting events to a local append-only file
///
/// ## Concurrency Model
///
/// - **Writes**: any number of threads enqueue through a bounded channel;
///   one writer thread assigns sequence numbers and appends, so records
///   land in enqueue order
/// - **Replay**: one transient thread scans the file and advances
///   `last_sequence`; it must finish before `start`
/// - **Errors**: write failures go to a capacity-1 channel read via `err()`
pub struct FileTransactionLogger {
    /// Path of the log file (for diagnostics)
    path: PathBuf,

    /// Read + append handle; threads get their own clones
    file: File,

    options: LoggerOptions,

    /// Last assigned or last replayed sequence number
    last_sequence: Arc<AtomicU64>,

    /// Queued-but-unwritten events
    pending: Arc<PendingWrites>,

    /// Producer side of the pending queue; `None` before start and after close
    events: Option<Sender<Event>>,

    errors_tx: Sender<KvError>,
    errors_rx: Receiver<KvError>,

    writer: Option<JoinHandle<()>>,

    started: bool,
    closed: bool,
}

impl FileTransactionLogger {
    /// Open (or create) a log file for replay and appending
    ///
    /// The logger starts with `last_sequence = 0`; replay advances it.
    pub fn open(path: impl AsRef<Path>, options: LoggerOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if options.queue_capacity == 0 {
            return Err(KvError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| KvError::LogOpen {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|source| KvError::LogOpen {
                path: path.clone(),
                source,
            })?;

        let (errors_tx, errors_rx) = bounded(1);

        tracing::info!("Opened transaction log {}", path.display());

        Ok(Self {
            path,
            file,
            options,
            last_sequence: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(PendingWrites::default()),
            events: None,
            errors_tx,
            errors_rx,
            writer: None,
            started: false,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_started(&self) -> bool {
        self.started && !self.closed
    }

    fn enqueue(&self, event: Event) -> Result<()> {
        let sender = match &self.events {
            Some(sender) => sender,
            None if self.closed => return Err(KvError::LoggerClosed),
            None => return Err(KvError::LoggerNotStarted),
        };

        self.pending.add();
        if sender.send(event).is_err() {
            self.pending.done();
            return Err(KvError::LoggerClosed);
        }
        Ok(())
    }
}

impl TransactionLogger for FileTransactionLogger {
    fn write_put(&self, key: &str, value: &str) -> Result<()> {
        self.enqueue(Event::put(key, value))
    }

    fn write_delete(&self, key: &str) -> Result<()> {
        self.enqueue(Event::delete(key))
    }

    fn err(&self) -> Receiver<KvError> {
        self.errors_rx.clone()
    }

    fn read_trans_log(&self) -> (Receiver<Event>, Receiver<KvError>) {
        let (events_tx, events_rx) = bounded(REPLAY_BUFFER);
        let (errors_tx, errors_rx) = bounded(1);

        if self.started || self.closed {
            let _ = errors_tx.send(KvError::LoggerAlreadyStarted);
            return (events_rx, errors_rx);
        }

        let file = match self.file.try_clone() {
            Ok(file) => file,
            Err(e) => {
                let _ = errors_tx.send(KvError::Io(e));
                return (events_rx, errors_rx);
            }
        };

        let spawn_errors = errors_tx.clone();
        let last_sequence = Arc::clone(&self.last_sequence);
        let spawned = thread::Builder::new()
            .name("kvlog-replay".to_string())
            .spawn(move || reader::scan(file, last_sequence, events_tx, errors_tx));

        if let Err(e) = spawned {
            let _ = spawn_errors.send(KvError::Io(e));
        }

        (events_rx, errors_rx)
    }

    fn start(&mut self) -> Result<()> {
        if self.closed {
            return Err(KvError::LoggerClosed);
        }
        if self.started {
            return Err(KvError::LoggerAlreadyStarted);
        }

        let (events_tx, events_rx) = bounded(self.options.queue_capacity);
        let ctx = WriterContext {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            events: events_rx,
            last_sequence: Arc::clone(&self.last_sequence),
            pending: Arc::clone(&self.pending),
            errors: self.errors_tx.clone(),
            sync_policy: self.options.sync_policy,
        };

        let handle = thread::Builder::new()
            .name("kvlog-writer".to_string())
            .spawn(move || writer::run(ctx))?;

        self.events = Some(events_tx);
        self.writer = Some(handle);
        self.started = true;

        tracing::info!(
            "Transaction logger started at sequence {} (queue capacity {})",
            self.last_sequence(),
            self.options.queue_capacity
        );
        Ok(())
    }

    fn wait(&self) {
        self.pending.wait();
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;

        // Disconnecting the queue ends the writer loop once it has drained
        self.events = None;
        if let Some(handle) = self.writer.take() {
            handle.join().map_err(|_| {
                KvError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "transaction log writer thread panicked",
                ))
            })?;
        }

        self.file.sync_all()?;

        tracing::info!(
            "Transaction log {} closed at sequence {}",
            self.path.display(),
            self.last_sequence()
        );
        Ok(())
    }

    fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }
}

impl Drop for FileTransactionLogger {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close transaction log {}: {}", self.path.display(), e);
        }
    }
}
