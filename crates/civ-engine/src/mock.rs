//! Scripted transport for engine unit tests

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::transport::Transport;

/// Replies queued for one expected write
#[derive(Debug)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// Transport that checks each write against a script and plays back the
/// scripted reply bytes
#[derive(Debug, Default)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    pending: VecDeque<u8>,
    open: bool,
    sent: Vec<Vec<u8>>,
    frames_read: usize,
    flushes: usize,
    fail_flush: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `request` is written, make `response` available to reads
    ///
    /// `response` may hold several frames, or none to force a timeout.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Bytes already waiting on the line before anything is written
    pub fn preload(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes);
    }

    /// Make every flush fail with an I/O error
    pub fn fail_flush(&mut self) {
        self.fail_flush = true;
    }

    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Bytes queued but never read
    pub fn unread(&self) -> usize {
        self.pending.len()
    }
}

impl Transport for MockTransport {
    async fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if !self.open {
            return Err(EngineError::NotConnected);
        }
        if self.fail_flush {
            return Err(std::io::Error::other("flush failed").into());
        }
        self.flushes += 1;
        self.pending.clear();
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.open {
            return Err(EngineError::NotConnected);
        }
        self.sent.push(bytes.to_vec());

        let expectation = self.expectations.pop_front().ok_or_else(|| {
            std::io::Error::other(format!("unscripted write {:02X?}", bytes))
        })?;
        if expectation.request != bytes {
            return Err(std::io::Error::other(format!(
                "expected write {:02X?}, got {:02X?}",
                expectation.request, bytes
            ))
            .into());
        }

        self.pending.extend(expectation.response);
        Ok(())
    }

    async fn read_until(&mut self, terminator: u8, timeout: Duration) -> Result<Vec<u8>> {
        if !self.open {
            return Err(EngineError::NotConnected);
        }

        let Some(pos) = self.pending.iter().position(|&b| b == terminator) else {
            return Err(EngineError::Timeout {
                ms: timeout.as_millis() as u64,
            });
        };

        self.frames_read += 1;
        Ok(self.pending.drain(..=pos).collect())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
