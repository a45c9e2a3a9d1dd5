//! Event Tests
//!
//! Tests verify:
//! - Line encoding of put and delete records
//! - Parsing of well-formed lines
//! - Parse errors for wrong field counts, bad sequences and unknown kinds
//! - Field validation against the delimiters

use kvlog::translog::{validate_field, Event, EventKind};
use kvlog::KvError;

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_new_events_are_unsequenced() {
    assert_eq!(Event::put("a", "1").sequence, 0);
    assert_eq!(Event::delete("a").sequence, 0);
}

#[test]
fn test_delete_event_has_empty_value() {
    let event = Event::delete("a");
    assert_eq!(event.kind, EventKind::Delete);
    assert_eq!(event.value, "");
}

#[test]
fn test_encode_matches_log_format() {
    assert_eq!(Event::put("a", "1").with_sequence(1).encode(), "1\tP\ta\t1\n");
    assert_eq!(Event::put("b", "2").with_sequence(2).encode(), "2\tP\tb\t2\n");
    assert_eq!(Event::delete("a").with_sequence(3).encode(), "3\tD\ta\t\n");
}

#[test]
fn test_encode_value_with_spaces() {
    let line = Event::put("greeting", "hello big world").with_sequence(42).encode();
    assert_eq!(line, "42\tP\tgreeting\thello big world\n");
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_put() {
    let event = Event::parse("7\tP\tkey\tvalue", 1).unwrap();
    assert_eq!(event, Event::put("key", "value").with_sequence(7));
}

#[test]
fn test_parse_delete() {
    let event = Event::parse("8\tD\tkey\t", 1).unwrap();
    assert_eq!(event, Event::delete("key").with_sequence(8));
}

#[test]
fn test_parse_encoded_line() {
    let original = Event::put("k", "some value").with_sequence(u64::MAX);
    let line = original.encode();
    let parsed = Event::parse(line.trim_end_matches('\n'), 1).unwrap();
    assert_eq!(parsed, original);
}

#[test]
fn test_parse_empty_key_and_value() {
    let event = Event::parse("1\tP\t\t", 1).unwrap();
    assert_eq!(event.key, "");
    assert_eq!(event.value, "");
}

#[test]
fn test_parse_too_few_fields() {
    let err = Event::parse("1\tP\tkey", 3).unwrap_err();
    assert!(matches!(err, KvError::LogParse { line: 3, .. }));
    assert!(err.is_corruption());
}

#[test]
fn test_parse_too_many_fields() {
    let err = Event::parse("1\tP\tkey\tvalue\textra", 1).unwrap_err();
    assert!(matches!(err, KvError::LogParse { .. }));
}

#[test]
fn test_parse_empty_line() {
    assert!(matches!(
        Event::parse("", 1),
        Err(KvError::LogParse { .. })
    ));
}

#[test]
fn test_parse_non_numeric_sequence() {
    assert!(matches!(
        Event::parse("abc\tP\tkey\tvalue", 1),
        Err(KvError::LogParse { .. })
    ));
    assert!(matches!(
        Event::parse("-1\tP\tkey\tvalue", 1),
        Err(KvError::LogParse { .. })
    ));
}

#[test]
fn test_parse_unknown_kind() {
    assert!(matches!(
        Event::parse("1\tPUT\tkey\tvalue", 1),
        Err(KvError::LogParse { .. })
    ));
}

#[test]
fn test_parse_delete_with_value_is_rejected() {
    assert!(matches!(
        Event::parse("1\tD\tkey\tvalue", 1),
        Err(KvError::LogParse { .. })
    ));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_validate_accepts_plain_text() {
    assert!(Event::put("user:42", "name=Ada Lovelace").validate().is_ok());
    assert!(validate_field("key", "ünïcödé").is_ok());
}

#[test]
fn test_validate_rejects_delimiters() {
    assert!(matches!(
        Event::put("a\tb", "v").validate(),
        Err(KvError::InvalidField(_))
    ));
    assert!(matches!(
        Event::put("a", "multi\nline").validate(),
        Err(KvError::InvalidField(_))
    ));
}

#[test]
fn test_event_kind_codes() {
    assert_eq!(EventKind::Put.code(), "P");
    assert_eq!(EventKind::Delete.code(), "D");
    assert_eq!(EventKind::from_code("P"), Some(EventKind::Put));
    assert_eq!(EventKind::from_code("D"), Some(EventKind::Delete));
    assert_eq!(EventKind::from_code("p"), None);
}
