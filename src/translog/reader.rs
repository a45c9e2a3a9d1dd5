//! Transaction log replay scan
//!
//! Body of the transient thread behind `read_trans_log`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::Sender;

use crate::error::KvError;
use super::Event;

/// Read lines until EOF or the first bad record
///
/// Dropping both senders on return is what tells the consumer the scan
/// is over.
pub(super) fn scan(
    file: File,
    last_sequence: Arc<AtomicU64>,
    events: Sender<Event>,
    errors: Sender<KvError>,
) {
    let reader = BufReader::new(file);
    let mut replayed = 0u64;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index as u64 + 1;

        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                let _ = errors.send(KvError::LogParse {
                    line: line_no,
                    reason: "line is not valid UTF-8".to_string(),
                });
                return;
            }
            Err(e) => {
                let _ = errors.send(KvError::Io(e));
                return;
            }
        };

        let event = match Event::parse(&line, line_no) {
            Ok(event) => event,
            Err(err) => {
                let _ = errors.send(err);
                return;
            }
        };

        let last = last_sequence.load(Ordering::Acquire);
        if event.sequence <= last {
            let _ = errors.send(KvError::OutOfOrder {
                line: line_no,
                last,
                found: event.sequence,
            });
            return;
        }
        last_sequence.store(event.sequence, Ordering::Release);

        if events.send(event).is_err() {
            tracing::debug!("Replay consumer went away after {} events", replayed);
            return;
        }
        replayed += 1;
    }

    tracing::debug!("Replay scan finished: {} events", replayed);
}
