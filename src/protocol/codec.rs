//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! Every message is one frame:
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Tag (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! The tag is the command type for requests and the status for responses.
//!
//! ### Request payload by command type
//! - GET:    key_len (4 bytes) + key
//! - PUT:    key_len (4 bytes) + key + value
//! - DELETE: key_len (4 bytes) + key
//! - PING:   empty
//!
//! Keys, values and response payloads must be UTF-8.

use std::io::{Read, Write};

use crate::error::{KvError, Result};
use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte tag + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(tag);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

fn payload_len(header: &[u8]) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

/// Split a complete frame into its tag and payload
fn unframe(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let total_len = HEADER_SIZE + payload_len(bytes)?;
    if bytes.len() < total_len {
        return Err(KvError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

/// Read one frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let len = payload_len(&header)?;
    let mut message = vec![0u8; HEADER_SIZE + len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;

    Ok(message)
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| KvError::Protocol(format!("{} is not valid UTF-8", what)))
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

fn key_payload(key: &str, value: Option<&str>) -> Vec<u8> {
    let value = value.unwrap_or("");
    let mut payload = Vec::with_capacity(4 + key.len() + value.len());
    payload.extend_from_slice(&(key.len() as u32).to_be_bytes());
    payload.extend_from_slice(key.as_bytes());
    payload.extend_from_slice(value.as_bytes());
    payload
}

/// Encode a command to bytes
pub fn encode_command(command: &Command) -> Vec<u8> {
    let payload = match command {
        Command::Get { key } | Command::Delete { key } => key_payload(key, None),
        Command::Put { key, value } => key_payload(key, Some(value.as_str())),
        Command::Ping => Vec::new(),
    };
    frame(command.command_type() as u8, &payload)
}

/// Split a keyed payload into the key and whatever follows it
fn decode_key<'a>(payload: &'a [u8], command: &str) -> Result<(String, &'a [u8])> {
    if payload.len() < 4 {
        return Err(KvError::Protocol(format!(
            "{} command: missing key length",
            command
        )));
    }

    let key_len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    let rest = &payload[4..];
    if rest.len() < key_len {
        return Err(KvError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            command,
            key_len,
            rest.len()
        )));
    }

    let key = utf8(&rest[..key_len], "key")?;
    Ok((key, &rest[key_len..]))
}

/// Decode a command from a complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (tag, payload) = unframe(bytes)?;
    let command_type = CommandType::from_byte(tag)
        .ok_or_else(|| KvError::Protocol(format!("Unknown command type: 0x{:02x}", tag)))?;

    match command_type {
        CommandType::Get => {
            let (key, trailing) = decode_key(payload, "GET")?;
            reject_trailing(trailing, "GET")?;
            Ok(Command::Get { key })
        }
        CommandType::Put => {
            let (key, value) = decode_key(payload, "PUT")?;
            let value = utf8(value, "value")?;
            Ok(Command::Put { key, value })
        }
        CommandType::Delete => {
            let (key, trailing) = decode_key(payload, "DELETE")?;
            reject_trailing(trailing, "DELETE")?;
            Ok(Command::Delete { key })
        }
        CommandType::Ping => {
            reject_trailing(payload, "PING")?;
            Ok(Command::Ping)
        }
    }
}

fn reject_trailing(trailing: &[u8], command: &str) -> Result<()> {
    if trailing.is_empty() {
        Ok(())
    } else {
        Err(KvError::Protocol(format!(
            "{} command: unexpected {} trailing bytes",
            command,
            trailing.len()
        )))
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or("");
    frame(response.status as u8, payload.as_bytes())
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (tag, payload) = unframe(bytes)?;
    let status = Status::from_byte(tag)
        .ok_or_else(|| KvError::Protocol(format!("Unknown response status: 0x{:02x}", tag)))?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(utf8(payload, "response payload")?)
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
