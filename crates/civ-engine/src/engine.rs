//! CI-V protocol engine
//!
//! [`CivEngine`] owns the transport and the radio's address, and runs one
//! request/response exchange at a time:
//!
//! ```text
//! Idle -> compose -> send -> await reply -> (echo? -> await reply) -> parse -> Idle
//! ```
//!
//! Every operation takes `&mut self`, so a second frame can never be sent
//! while a reply is outstanding. Composite operations (VFO then frequency,
//! RIT offset then enable) stop at the first failure and do not undo the
//! frames already accepted by the radio.

use std::time::Duration;

use civ_protocol::formatter::MAX_RIT_OFFSET_HZ;
use civ_protocol::memory::MAX_CHANNEL;
use civ_protocol::{
    Command, CommandSet, Frame, MemoryChannel, Mode, RadioBehavior, RadioModel, ResponseLayout,
    SignalStrength, StandardCommandSet, VfoRef, PREAMBLE, TERMINATOR,
};
use tracing::{debug, info, trace};

use crate::config::{EngineConfig, SerialConfig};
use crate::error::{EngineError, Result};
use crate::transport::{SerialTransport, Transport};

/// RIT or XIT state as read back from the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTuning {
    /// Offset in Hz; RIT and XIT share one register
    pub offset_hz: i64,
    pub enabled: bool,
}

/// Half-duplex CI-V session with one radio
pub struct CivEngine<T> {
    transport: T,
    command_set: Box<dyn CommandSet>,
    address: u8,
    controller_address: u8,
    response_timeout: Duration,
    connected: bool,
}

impl CivEngine<SerialTransport> {
    /// Engine for `model` on a serial port
    pub fn serial(serial: SerialConfig, model: RadioModel, config: &EngineConfig) -> Self {
        Self::for_model(SerialTransport::new(serial), model, config)
    }
}

impl<T: Transport> CivEngine<T> {
    /// Engine with an explicit command set
    pub fn new(
        transport: T,
        address: u8,
        command_set: Box<dyn CommandSet>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            transport,
            command_set,
            address,
            controller_address: config.controller_address,
            response_timeout: config.response_timeout(),
            connected: false,
        }
    }

    /// Engine for a radio described only by its behavior descriptor
    pub fn with_behavior(
        transport: T,
        address: u8,
        behavior: RadioBehavior,
        config: &EngineConfig,
    ) -> Self {
        let command_set = StandardCommandSet::new(behavior, ResponseLayout::default());
        Self::new(transport, address, Box::new(command_set), config)
    }

    /// Engine for a supported model, using its table entry
    pub fn for_model(transport: T, model: RadioModel, config: &EngineConfig) -> Self {
        Self::new(
            transport,
            config.radio_address(model),
            model.command_set(),
            config,
        )
    }

    /// Radio address frames are sent to
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn behavior(&self) -> &RadioBehavior {
        self.command_set.behavior()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Consume the engine and return its transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the transport and discard stale bytes
    pub async fn connect(&mut self) -> Result<()> {
        self.transport.open().await?;
        if let Err(e) = self.transport.flush().await {
            debug!("Flush failed on connect, closing transport: {}", e);
            let _ = self.transport.close().await;
            return Err(e);
        }
        self.connected = true;
        info!("Connected to CI-V radio at 0x{:02X}", self.address);
        Ok(())
    }

    /// Close the transport
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.transport.close().await?;
        info!("Disconnected from CI-V radio at 0x{:02X}", self.address);
        Ok(())
    }

    // ========================================================================
    // Exchange primitives
    // ========================================================================

    /// Send one command and return the radio's reply, whatever it is
    ///
    /// This is the primitive the typed operations are built on. Model
    /// specific commands without a typed wrapper can use it directly.
    pub async fn transact(&mut self, command: &Command) -> Result<Frame> {
        self.send(command).await?;
        self.receive().await
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        if !self.connected {
            return Err(EngineError::NotConnected);
        }
        let frame = Frame::new(self.address, self.controller_address, command);
        let bytes = frame.to_bytes();
        trace!("Sending {:02X?}", bytes);
        self.transport.write(&bytes).await
    }

    /// Read one reply, absorbing a single echo on echoing radios
    async fn receive(&mut self) -> Result<Frame> {
        let frame = self.read_frame().await?;

        if self.behavior().echoes_commands && frame.is_echo(self.controller_address) {
            debug!(
                "Absorbed echo of command 0x{:02X} to 0x{:02X}",
                frame.command, frame.destination
            );
            return self.read_frame().await;
        }

        Ok(frame)
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        let bytes = self
            .transport
            .read_until(TERMINATOR, self.response_timeout)
            .await?;

        // Line noise before the preamble is not part of the frame
        let start = bytes
            .windows(2)
            .position(|w| w[0] == PREAMBLE && w[1] == PREAMBLE)
            .unwrap_or(0);
        Ok(Frame::parse(&bytes[start..])?)
    }

    /// Send a set command and require OK
    async fn execute(&mut self, command: &Command, operation: &'static str) -> Result<()> {
        let reply = self.transact(command).await?;
        if reply.is_ack() {
            Ok(())
        } else {
            Err(EngineError::CommandRejected { operation })
        }
    }

    /// Send a read command and return the reply, failing on NG
    async fn query(&mut self, command: &Command, operation: &'static str) -> Result<Frame> {
        let reply = self.transact(command).await?;
        if reply.is_nak() {
            return Err(EngineError::CommandRejected { operation });
        }
        Ok(reply)
    }

    // ========================================================================
    // Frequency and VFO
    // ========================================================================

    pub async fn set_frequency(&mut self, hz: u64) -> Result<()> {
        self.validate_frequency(hz)?;
        let command = self.command_set.format_set_frequency(hz);
        self.execute(&command, "set frequency").await
    }

    pub async fn get_frequency(&mut self) -> Result<u64> {
        let command = self.command_set.format_read_frequency();
        let reply = self.query(&command, "read frequency").await?;
        Ok(self.command_set.parse_frequency_response(&reply)?)
    }

    /// Make `vfo` the current VFO or receiver
    pub async fn select_vfo(&mut self, vfo: VfoRef) -> Result<()> {
        let command = self
            .command_set
            .format_select_vfo(vfo)
            .ok_or(EngineError::Unsupported("VFO selection"))?;
        self.execute(&command, "select VFO").await
    }

    /// Select `vfo`, then set its frequency
    ///
    /// If the frequency is rejected the radio is left on the new VFO.
    pub async fn set_vfo_frequency(&mut self, vfo: VfoRef, hz: u64) -> Result<()> {
        self.validate_frequency(hz)?;
        debug!("Selecting {:?} before setting {} Hz", vfo, hz);
        self.select_vfo(vfo).await?;
        self.set_frequency(hz).await
    }

    /// Swap VFO A/B (or Main/Sub)
    pub async fn exchange_vfos(&mut self) -> Result<()> {
        let command = self
            .command_set
            .format_exchange_vfos()
            .ok_or(EngineError::Unsupported("VFO exchange"))?;
        self.execute(&command, "exchange VFOs").await
    }

    /// Copy the current VFO (or Main) to the other one
    pub async fn equalize_vfos(&mut self) -> Result<()> {
        let command = self
            .command_set
            .format_equalize_vfos()
            .ok_or(EngineError::Unsupported("VFO equalize"))?;
        self.execute(&command, "equalize VFOs").await
    }

    // ========================================================================
    // Mode
    // ========================================================================

    /// Set mode, with `filter` if the radio takes a filter byte
    pub async fn set_mode(&mut self, mode: Mode, filter: Option<u8>) -> Result<()> {
        let command = self.command_set.format_set_mode(mode, filter);
        self.execute(&command, "set mode").await
    }

    pub async fn get_mode(&mut self) -> Result<(Mode, Option<u8>)> {
        let command = self.command_set.format_read_mode();
        let reply = self.query(&command, "read mode").await?;
        Ok(self.command_set.parse_mode_response(&reply)?)
    }

    // ========================================================================
    // Power, PTT, meters, split
    // ========================================================================

    /// Set RF power as percentage of full scale (clamped to 100)
    pub async fn set_power(&mut self, percent: u8) -> Result<()> {
        let command = self.command_set.format_set_power(percent);
        self.execute(&command, "set power").await
    }

    /// RF power as percentage of full scale
    pub async fn get_power(&mut self) -> Result<u8> {
        let command = self.command_set.format_read_power();
        let reply = self.query(&command, "read power").await?;
        Ok(self.command_set.parse_power_response(&reply)?)
    }

    pub async fn set_ptt(&mut self, on: bool) -> Result<()> {
        let command = self.command_set.format_set_ptt(on);
        self.execute(&command, "set PTT").await
    }

    pub async fn get_ptt(&mut self) -> Result<bool> {
        let command = self.command_set.format_read_ptt();
        let reply = self.query(&command, "read PTT").await?;
        Ok(self.command_set.parse_ptt_response(&reply)?)
    }

    pub async fn get_s_meter(&mut self) -> Result<SignalStrength> {
        let command = self.command_set.format_read_s_meter();
        let reply = self.query(&command, "read S-meter").await?;
        Ok(self.command_set.parse_s_meter_response(&reply)?)
    }

    pub async fn set_split(&mut self, on: bool) -> Result<()> {
        let command = self.command_set.format_set_split(on);
        self.execute(&command, "set split").await
    }

    pub async fn get_split(&mut self) -> Result<bool> {
        let command = self.command_set.format_read_split();
        let reply = self.query(&command, "read split").await?;
        Ok(self.command_set.parse_split_response(&reply)?)
    }

    // ========================================================================
    // RIT / XIT
    // ========================================================================

    /// Write the RIT offset, then switch RIT on or off
    ///
    /// If the offset is rejected the enable frame is not sent. If the
    /// enable frame is rejected the new offset stays in place.
    pub async fn set_rit(&mut self, offset_hz: i64, enabled: bool) -> Result<()> {
        validate_offset(offset_hz)?;

        debug!("Setting RIT offset {} Hz", offset_hz);
        let command = self.command_set.format_set_rit_offset(offset_hz);
        self.execute(&command, "set RIT offset").await?;

        debug!("Setting RIT {}", if enabled { "on" } else { "off" });
        let command = self.command_set.format_set_rit_enabled(enabled);
        self.execute(&command, "set RIT enable").await
    }

    pub async fn get_rit(&mut self) -> Result<OffsetTuning> {
        let command = self.command_set.format_read_rit_offset();
        let reply = self.query(&command, "read RIT offset").await?;
        let offset_hz = self.command_set.parse_rit_offset_response(&reply)?;

        let command = self.command_set.format_read_rit_enabled();
        let reply = self.query(&command, "read RIT enable").await?;
        let enabled = self.command_set.parse_rit_enabled_response(&reply)?;

        Ok(OffsetTuning { offset_hz, enabled })
    }

    /// Write the XIT offset, then switch XIT on or off
    ///
    /// CI-V has no capability query, so an NG on the first frame is taken
    /// to mean the radio has no XIT and reported as
    /// [`EngineError::Unsupported`].
    pub async fn set_xit(&mut self, offset_hz: i64, enabled: bool) -> Result<()> {
        validate_offset(offset_hz)?;

        debug!("Setting XIT offset {} Hz", offset_hz);
        let command = self.command_set.format_set_xit_offset(offset_hz);
        let reply = self.transact(&command).await?;
        if reply.is_nak() {
            return Err(EngineError::Unsupported("XIT"));
        }
        if !reply.is_ack() {
            return Err(EngineError::CommandRejected {
                operation: "set XIT offset",
            });
        }

        debug!("Setting XIT {}", if enabled { "on" } else { "off" });
        let command = self.command_set.format_set_xit_enabled(enabled);
        self.execute(&command, "set XIT enable").await
    }

    pub async fn get_xit(&mut self) -> Result<OffsetTuning> {
        let command = self.command_set.format_read_xit_offset();
        let reply = self.query(&command, "read XIT offset").await?;
        let offset_hz = self.command_set.parse_xit_offset_response(&reply)?;

        let command = self.command_set.format_read_xit_enabled();
        let reply = self.transact(&command).await?;
        if reply.is_nak() {
            return Err(EngineError::Unsupported("XIT"));
        }
        let enabled = self.command_set.parse_xit_enabled_response(&reply)?;

        Ok(OffsetTuning { offset_hz, enabled })
    }

    // ========================================================================
    // Memory channels
    // ========================================================================

    /// Store a full channel record in one frame
    pub async fn write_memory(&mut self, channel: &MemoryChannel) -> Result<()> {
        channel.validate().map_err(EngineError::InvalidParameter)?;
        let command = self.command_set.format_write_memory(channel);
        self.execute(&command, "write memory").await
    }

    /// Read a full channel record
    ///
    /// A blank channel fails with `ParseError::EmptyChannel` rather than
    /// returning an all-zero record.
    pub async fn read_memory(&mut self, channel: u16) -> Result<MemoryChannel> {
        validate_channel(channel)?;
        let command = self.command_set.format_read_memory(channel);
        let reply = self.query(&command, "read memory").await?;
        Ok(self.command_set.parse_memory_response(&reply)?)
    }

    /// Switch to memory mode on `channel`
    pub async fn select_memory(&mut self, channel: u16) -> Result<()> {
        validate_channel(channel)?;
        let command = self.command_set.format_select_memory(channel);
        self.execute(&command, "select memory").await
    }

    // ========================================================================
    // Transceive
    // ========================================================================

    /// Turn unsolicited frequency/mode broadcasts on or off
    pub async fn set_transceive(&mut self, on: bool) -> Result<()> {
        let command = self.command_set.format_set_transceive(on);
        self.execute(&command, "set transceive").await
    }

    /// Reject frequencies the radio's field would truncate
    fn validate_frequency(&self, hz: u64) -> Result<()> {
        let max = self.command_set.max_frequency_hz();
        if hz > max {
            return Err(EngineError::InvalidParameter(format!(
                "frequency {} Hz exceeds {} Hz",
                hz, max
            )));
        }
        Ok(())
    }
}

fn validate_offset(hz: i64) -> Result<()> {
    if hz.abs() > MAX_RIT_OFFSET_HZ {
        return Err(EngineError::InvalidParameter(format!(
            "offset {} Hz outside ±{} Hz",
            hz, MAX_RIT_OFFSET_HZ
        )));
    }
    Ok(())
}

fn validate_channel(channel: u16) -> Result<()> {
    if channel > MAX_CHANNEL {
        return Err(EngineError::InvalidParameter(format!(
            "channel {} exceeds {}",
            channel, MAX_CHANNEL
        )));
    }
    Ok(())
}
