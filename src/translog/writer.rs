//! Transaction log writer
//!
//! Body of the single background thread that owns appends to the log file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{Receiver, Sender, TrySendError};

use crate::config::SyncPolicy;
use crate::error::{KvError, Result};
use super::pending::PendingWrites;
use super::Event;

/// Everything the writer thread owns or shares
pub(super) struct WriterContext {
    pub file: File,
    pub path: PathBuf,
    pub events: Receiver<Event>,
    pub last_sequence: Arc<AtomicU64>,
    pub pending: Arc<PendingWrites>,
    pub errors: Sender<KvError>,
    pub sync_policy: SyncPolicy,
}

/// Consume queued events until every sender is gone
pub(super) fn run(ctx: WriterContext) {
    // Dropped last, after the queue receiver is gone
    let _guard = ReleaseOnPanic(Arc::clone(&ctx.pending));

    let WriterContext {
        file,
        path,
        events,
        last_sequence,
        pending,
        errors,
        sync_policy,
    } = ctx;

    let mut appender = Appender::new(file, sync_policy);

    tracing::debug!("Transaction log writer started on {}", path.display());

    for event in events.iter() {
        match appender.append(&last_sequence, &event) {
            Ok(sequence) => {
                tracing::debug!(sequence, kind = %event.kind, key = %event.key, "record appended");
            }
            Err(err) => report(&errors, err),
        }
        pending.done();
    }

    tracing::debug!(
        "Transaction log writer stopped at sequence {}",
        last_sequence.load(Ordering::Acquire)
    );
}

/// Unblocks `wait()` callers if the writer thread dies
struct ReleaseOnPanic(Arc<PendingWrites>);

impl Drop for ReleaseOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!("Transaction log writer panicked; releasing pending writes");
            self.0.release_all();
        }
    }
}

// =============================================================================
// Appending
// =============================================================================

/// The file operations an append needs
pub(super) trait LogFile: Write {
    fn size(&self) -> io::Result<u64>;

    fn truncate(&mut self, len: u64) -> io::Result<()>;

    fn last_byte(&mut self) -> io::Result<Option<u8>>;

    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn last_byte(&mut self) -> io::Result<Option<u8>> {
        let len = self.size()?;
        if len == 0 {
            return Ok(None);
        }
        self.seek(SeekFrom::Start(len - 1))?;
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(Some(byte[0]))
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Appends records so each one starts on its own line
///
/// The tail is inspected before the first append and after any failed
/// append: an unterminated last line (a replayed record without `\n`, or
/// a torn write that could not be rolled back) gets a `\n` first.
pub(super) struct Appender<F> {
    file: F,
    sync_policy: SyncPolicy,
    check_tail: bool,
}

impl<F: LogFile> Appender<F> {
    pub(super) fn new(file: F, sync_policy: SyncPolicy) -> Self {
        Self {
            file,
            sync_policy,
            check_tail: true,
        }
    }

    /// Assign the next sequence number and append one record
    ///
    /// The sequence is consumed even when the write fails, so a record that
    /// was partly written can never share a number with the next one.
    pub(super) fn append(&mut self, last_sequence: &AtomicU64, event: &Event) -> Result<u64> {
        event.validate()?;

        let sequence = last_sequence.fetch_add(1, Ordering::AcqRel) + 1;
        let line = Event {
            sequence,
            ..event.clone()
        }
        .encode();

        self.write_record(line.as_bytes())
            .map_err(|source| KvError::LogWrite { sequence, source })?;

        Ok(sequence)
    }

    fn write_record(&mut self, line: &[u8]) -> io::Result<()> {
        if self.check_tail {
            if matches!(self.file.last_byte()?, Some(byte) if byte != b'\n') {
                self.file.write_all(b"\n")?;
            }
            self.check_tail = false;
        }

        let start = self.file.size()?;
        let written = self.file.write_all(line).and_then(|_| match self.sync_policy {
            SyncPolicy::EveryWrite => self.file.sync(),
            SyncPolicy::OsBuffered => Ok(()),
        });

        if let Err(e) = written {
            // Roll back whatever part of the record reached the file
            if let Err(truncate_err) = self.file.truncate(start) {
                tracing::warn!("Cannot roll back failed append: {}", truncate_err);
            }
            self.check_tail = true;
            return Err(e);
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> F {
        self.file
    }
}

/// Push a failure onto the error channel without ever blocking the writer
fn report(errors: &Sender<KvError>, err: KvError) {
    match errors.try_send(err) {
        Ok(()) => {}
        Err(TrySendError::Full(err)) => {
            tracing::warn!(error = %err, "error channel full, dropping transaction log error");
        }
        Err(TrySendError::Disconnected(err)) => {
            tracing::error!(error = %err, "transaction log error with no listener");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory log that accepts `budget` more bytes, then fails
    #[derive(Default)]
    struct FlakyLog {
        data: Vec<u8>,
        budget: Option<usize>,
        truncate_fails: bool,
    }

    impl FlakyLog {
        fn with_contents(contents: &[u8]) -> Self {
            Self {
                data: contents.to_vec(),
                ..Self::default()
            }
        }

        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.data.clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for FlakyLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let accepted = match self.budget.as_mut() {
                None => buf.len(),
                Some(0) => return Err(io::Error::new(io::ErrorKind::Other, "no space left")),
                Some(budget) => {
                    let n = buf.len().min(*budget);
                    *budget -= n;
                    n
                }
            };
            self.data.extend_from_slice(&buf[..accepted]);
            Ok(accepted)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogFile for FlakyLog {
        fn size(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.truncate_fails {
                return Err(io::Error::new(io::ErrorKind::Other, "truncate refused"));
            }
            self.data.truncate(len as usize);
            Ok(())
        }

        fn last_byte(&mut self) -> io::Result<Option<u8>> {
            Ok(self.data.last().copied())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn parsed_sequences(log: &FlakyLog) -> Vec<u64> {
        log.lines()
            .iter()
            .enumerate()
            .map(|(i, line)| Event::parse(line, i as u64 + 1).unwrap().sequence)
            .collect()
    }

    #[test]
    fn test_append_after_unterminated_tail_starts_new_line() {
        let log = FlakyLog::with_contents(b"1\tP\ta\t1\n2\tP\tb\t2");
        let last_sequence = AtomicU64::new(2);
        let mut appender = Appender::new(log, SyncPolicy::OsBuffered);

        appender.append(&last_sequence, &Event::put("c", "3")).unwrap();
        appender.append(&last_sequence, &Event::put("d", "4")).unwrap();

        let log = appender.into_inner();
        assert_eq!(log.data, b"1\tP\ta\t1\n2\tP\tb\t2\n3\tP\tc\t3\n4\tP\td\t4\n");
    }

    #[test]
    fn test_append_to_terminated_tail_adds_nothing() {
        let log = FlakyLog::with_contents(b"1\tP\ta\t1\n");
        let last_sequence = AtomicU64::new(1);
        let mut appender = Appender::new(log, SyncPolicy::EveryWrite);

        appender.append(&last_sequence, &Event::delete("a")).unwrap();

        assert_eq!(appender.into_inner().data, b"1\tP\ta\t1\n2\tD\ta\t\n");
    }

    #[test]
    fn test_partial_write_is_rolled_back() {
        let last_sequence = AtomicU64::new(0);
        let mut appender = Appender::new(FlakyLog::default(), SyncPolicy::OsBuffered);
        appender.append(&last_sequence, &Event::put("a", "1")).unwrap();

        appender.file.budget = Some(4);
        let err = appender
            .append(&last_sequence, &Event::put("b", "2"))
            .unwrap_err();
        assert!(matches!(err, KvError::LogWrite { sequence: 2, .. }));

        appender.file.budget = None;
        appender.append(&last_sequence, &Event::put("c", "3")).unwrap();

        let log = appender.into_inner();
        assert_eq!(parsed_sequences(&log), vec![1, 3]);
    }

    #[test]
    fn test_torn_line_that_cannot_be_rolled_back_is_terminated() {
        let last_sequence = AtomicU64::new(0);
        let mut appender = Appender::new(FlakyLog::default(), SyncPolicy::OsBuffered);

        appender.file.budget = Some(3);
        appender.file.truncate_fails = true;
        assert!(appender.append(&last_sequence, &Event::put("a", "1")).is_err());

        appender.file.budget = None;
        appender.append(&last_sequence, &Event::put("b", "2")).unwrap();

        let log = appender.into_inner();
        assert_eq!(log.lines(), vec!["1\tP".to_string(), "2\tP\tb\t2".to_string()]);
    }

    #[test]
    fn test_invalid_event_consumes_no_sequence() {
        let last_sequence = AtomicU64::new(5);
        let mut appender = Appender::new(FlakyLog::default(), SyncPolicy::OsBuffered);

        let err = appender
            .append(&last_sequence, &Event::put("bad\tkey", "v"))
            .unwrap_err();

        assert!(matches!(err, KvError::InvalidField(_)));
        assert_eq!(last_sequence.load(Ordering::Acquire), 5);
        assert!(appender.into_inner().data.is_empty());
    }

    #[test]
    fn test_writer_panic_releases_waiters() {
        let pending = Arc::new(PendingWrites::default());
        pending.add();
        pending.add();

        let worker = Arc::clone(&pending);
        let result = thread::spawn(move || {
            let _guard = ReleaseOnPanic(worker);
            panic!("writer died");
        })
        .join();

        assert!(result.is_err());
        pending.wait();
        assert_eq!(pending.get(), 0);
    }
}
