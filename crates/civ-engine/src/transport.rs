//! Byte transports for the protocol engine
//!
//! The engine never reads a fixed byte count. Frames vary in length, so
//! every read runs to the terminator byte. Bytes that arrive after the
//! terminator are kept for the next read.
//!
//! Two implementations are provided:
//! - [`SerialTransport`]: a real serial port via `tokio_serial`
//! - [`StreamTransport`]: any `AsyncRead + AsyncWrite`, e.g. one end of
//!   `tokio::io::duplex()` connected to a simulated radio

use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, trace};

use crate::config::SerialConfig;
use crate::error::{EngineError, Result};

/// Read timeout handed to the serial driver; the engine applies its own
/// per-response timeout on top.
const SERIAL_DRIVER_TIMEOUT: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 256;

/// Half-duplex byte link to a radio
pub trait Transport: Send {
    /// Open the link
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Close the link; any later read or write fails with `NotConnected`
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Discard stale bytes in both directions
    fn flush(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Write all of `bytes`
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Read up to and including `terminator`
    ///
    /// Fails with [`EngineError::Timeout`] if no terminator arrives within
    /// `timeout`.
    fn read_until(
        &mut self,
        terminator: u8,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Returns `true` between `open` and `close`
    fn is_open(&self) -> bool;
}

/// Read from `io` until `pending` holds a terminator, then split it off
async fn read_to_terminator<R>(
    io: &mut R,
    pending: &mut Vec<u8>,
    terminator: u8,
    timeout: Duration,
) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        if let Some(pos) = pending.iter().position(|&b| b == terminator) {
            let bytes: Vec<u8> = pending.drain(..=pos).collect();
            trace!("RX {:02X?}", bytes);
            return Ok(bytes);
        }

        let n = match tokio::time::timeout_at(deadline, io.read(&mut chunk)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(EngineError::Timeout {
                    ms: timeout.as_millis() as u64,
                })
            }
        };

        if n == 0 {
            return Err(std::io::Error::new(ErrorKind::UnexpectedEof, "link closed").into());
        }

        pending.extend_from_slice(&chunk[..n]);
    }
}

/// Serial port transport
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<SerialStream>,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Create a transport for the given port; nothing is opened until
    /// [`Transport::open`]
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: None,
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .timeout(SERIAL_DRIVER_TIMEOUT)
            .open_native_async()?;

        debug!(
            "Opened serial port {} at {} baud",
            self.config.port, self.config.baud_rate
        );
        self.port = Some(stream);
        self.pending.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.config.port);
        }
        self.pending.clear();
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(EngineError::NotConnected)?;
        port.clear(ClearBuffer::All)?;
        self.pending.clear();
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(EngineError::NotConnected)?;
        trace!("TX {:02X?}", bytes);
        // SerialStream also implements the blocking io::Write
        AsyncWriteExt::write_all(port, bytes).await?;
        AsyncWriteExt::flush(port).await?;
        Ok(())
    }

    async fn read_until(&mut self, terminator: u8, timeout: Duration) -> Result<Vec<u8>> {
        let port = self.port.as_mut().ok_or(EngineError::NotConnected)?;
        read_to_terminator(port, &mut self.pending, terminator, timeout).await
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

/// Transport over any async byte stream
///
/// The stream is treated as already open. Closing shuts down the write half
/// and drops the stream, so the peer sees end-of-file; a closed
/// `StreamTransport` cannot be reopened.
pub struct StreamTransport<T> {
    io: Option<T>,
    open: bool,
    pending: Vec<u8>,
}

impl<T> StreamTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(io: T) -> Self {
        Self {
            io: Some(io),
            open: false,
            pending: Vec::new(),
        }
    }

    fn stream(&mut self) -> Result<&mut T> {
        match (self.open, self.io.as_mut()) {
            (true, Some(io)) => Ok(io),
            _ => Err(EngineError::NotConnected),
        }
    }
}

impl<T> Transport for StreamTransport<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn open(&mut self) -> Result<()> {
        if self.io.is_none() {
            return Err(EngineError::NotConnected);
        }
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.pending.clear();
        if let Some(mut io) = self.io.take() {
            io.shutdown().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        let io = self.stream()?;
        let mut chunk = [0u8; READ_CHUNK];

        // Drain whatever is already buffered without waiting for more
        let mut discarded = 0;
        while let Ok(Ok(n)) = tokio::time::timeout(Duration::ZERO, io.read(&mut chunk)).await {
            if n == 0 {
                break;
            }
            discarded += n;
        }

        discarded += self.pending.len();
        self.pending.clear();
        if discarded > 0 {
            debug!("Flushed {} stale bytes", discarded);
        }
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let io = self.stream()?;
        trace!("TX {:02X?}", bytes);
        io.write_all(bytes).await?;
        io.flush().await?;
        Ok(())
    }

    async fn read_until(&mut self, terminator: u8, timeout: Duration) -> Result<Vec<u8>> {
        let io = match (self.open, self.io.as_mut()) {
            (true, Some(io)) => io,
            _ => return Err(EngineError::NotConnected),
        };
        read_to_terminator(io, &mut self.pending, terminator, timeout).await
    }

    fn is_open(&self) -> bool {
        self.open && self.io.is_some()
    }
}
