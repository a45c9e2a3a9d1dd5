//! Transaction log events
//!
//! Defines a single logged mutation and its line encoding.

use std::fmt;

use crate::error::{KvError, Result};

const FIELD_SEPARATOR: char = '\t';

/// Characters a key or value may not contain, since the line format
/// does not escape them
const RESERVED_CHARS: [char; 3] = ['\t', '\n', '\r'];

/// Kind of mutation recorded by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Put,
    Delete,
}

impl EventKind {
    /// Single-letter code used in the log file
    pub fn code(self) -> &'static str {
        match self {
            EventKind::Put => "P",
            EventKind::Delete => "D",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(EventKind::Put),
            "D" => Some(EventKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One durable record of a store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Position in the log; 0 until the writer assigns it
    pub sequence: u64,

    pub kind: EventKind,

    pub key: String,

    /// Empty for deletes
    pub value: String,
}

impl Event {
    /// Unsequenced put event
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Unsequenced delete event
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Check that the event can be encoded without breaking the line format
    pub fn validate(&self) -> Result<()> {
        validate_field("key", &self.key)?;
        validate_field("value", &self.value)
    }

    /// Encode as one newline-terminated log line
    ///
    /// Callers must `validate` first; reserved characters are written as-is.
    pub fn encode(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\n",
            self.sequence, self.kind, self.key, self.value
        )
    }

    /// Parse one log line (without its trailing newline)
    ///
    /// `line_no` is only used for error reporting.
    pub fn parse(line: &str, line_no: u64) -> Result<Self> {
        let malformed = |reason: String| KvError::LogParse {
            line: line_no,
            reason,
        };

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() != 4 {
            return Err(malformed(format!(
                "expected 4 fields, found {}",
                fields.len()
            )));
        }

        let sequence = fields[0]
            .parse::<u64>()
            .map_err(|e| malformed(format!("invalid sequence {:?}: {}", fields[0], e)))?;

        let kind = EventKind::from_code(fields[1])
            .ok_or_else(|| malformed(format!("unknown event kind {:?}", fields[1])))?;

        if kind == EventKind::Delete && !fields[3].is_empty() {
            return Err(malformed("delete record carries a value".to_string()));
        }

        Ok(Self {
            sequence,
            kind,
            key: fields[2].to_string(),
            value: fields[3].to_string(),
        })
    }
}

/// Reject keys or values containing a field or record delimiter
pub fn validate_field(name: &str, field: &str) -> Result<()> {
    match field.chars().find(|c| RESERVED_CHARS.contains(c)) {
        Some(c) => Err(KvError::InvalidField(format!(
            "{} contains reserved character {:?}",
            name, c
        ))),
        None => Ok(()),
    }
}
