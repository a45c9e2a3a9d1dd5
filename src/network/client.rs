//! Blocking client
//!
//! Used by the CLI and by integration tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{KvError, Result};
use crate::protocol::{read_response, write_command, Command, Response, Status};

/// A single connection to a kvlog server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| KvError::Network(format!("failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one command and wait for its response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// `KvError::NotFound` when the key is absent
    pub fn get(&mut self, key: &str) -> Result<String> {
        let response = self.send(&Command::Get {
            key: key.to_string(),
        })?;
        expect_ok(response).map(|payload| payload.unwrap_or_default())
    }

    pub fn put(&mut self, key: &str, value: &str) -> Result<()> {
        let response = self.send(&Command::Put {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        expect_ok(response).map(|_| ())
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        let response = self.send(&Command::Delete {
            key: key.to_string(),
        })?;
        expect_ok(response).map(|_| ())
    }

    pub fn ping(&mut self) -> Result<String> {
        let response = self.send(&Command::Ping)?;
        expect_ok(response).map(|payload| payload.unwrap_or_default())
    }
}

fn expect_ok(response: Response) -> Result<Option<String>> {
    match response.status {
        Status::Ok => Ok(response.payload),
        Status::NotFound => Err(KvError::NotFound),
        Status::Error => Err(KvError::Network(format!(
            "server error: {}",
            response.payload.unwrap_or_default()
        ))),
    }
}
