//! Command formatting and reply parsing
//!
//! [`CommandSet`] turns each logical operation into a [`Command`] and each
//! reply [`Frame`] back into a typed value. Every method has a default
//! driven by the radio's [`RadioBehavior`] and [`ResponseLayout`], so a
//! model only implements the methods where its firmware is a genuine
//! outlier.
//!
//! Formatting never fails. Methods that return `Option<Command>` return
//! `None` when the operation does not exist on the radio (for example VFO
//! selection on a single-VFO receiver). Parsing fails only on replies that
//! carry the wrong command, the wrong length or invalid BCD.

use crate::bcd;
use crate::behavior::{RadioBehavior, ResponseLayout, VfoModel};
use crate::command::{Command, Mode, SignalStrength, VfoRef};
use crate::error::ParseError;
use crate::frame::Frame;
use crate::memory::MemoryChannel;

/// CI-V command codes
pub mod cmd {
    /// Read operating frequency
    pub const READ_FREQUENCY: u8 = 0x03;
    /// Read operating mode
    pub const READ_MODE: u8 = 0x04;
    /// Set operating frequency
    pub const SET_FREQUENCY: u8 = 0x05;
    /// Set operating mode
    pub const SET_MODE: u8 = 0x06;
    /// Select VFO / receiver, exchange, equalize
    pub const VFO: u8 = 0x07;
    /// Select memory channel
    pub const SELECT_MEMORY: u8 = 0x08;
    /// Split on/off
    pub const SPLIT: u8 = 0x0F;
    /// Level settings (two-byte command)
    pub const LEVEL: u8 = 0x14;
    /// Meter readings (two-byte command)
    pub const METER: u8 = 0x15;
    /// Memory contents and miscellaneous settings
    pub const SETTINGS: u8 = 0x1A;
    /// Transmit control
    pub const TX: u8 = 0x1C;
    /// RIT / XIT
    pub const RIT: u8 = 0x21;
}

/// Sub-command codes
pub mod sub {
    /// RF power level (`14 0A`)
    pub const RF_POWER: u8 = 0x0A;
    /// S-meter (`15 02`)
    pub const S_METER: u8 = 0x02;
    /// PTT (`1C 00`)
    pub const PTT: u8 = 0x00;
    /// Memory contents (`1A 00`)
    pub const MEMORY_CONTENTS: u8 = 0x00;
    /// Transceive (`1A 05`)
    pub const TRANSCEIVE: u8 = 0x05;
    /// Shared RIT/XIT offset register (`21 00`)
    pub const RIT_OFFSET: u8 = 0x00;
    /// RIT on/off (`21 01`)
    pub const RIT_ENABLE: u8 = 0x01;
    /// XIT on/off (`21 02`)
    pub const XIT_ENABLE: u8 = 0x02;
    /// Exchange VFOs or Main/Sub (`07 B0`)
    pub const EXCHANGE: u8 = 0xB0;
    /// Equalize VFO A=B (`07 A0`)
    pub const EQUALIZE_AB: u8 = 0xA0;
    /// Equalize Main=Sub (`07 B1`)
    pub const EQUALIZE_MAIN_SUB: u8 = 0xB1;
}

/// Filter byte sent with a mode change when the caller does not pick one
pub const DEFAULT_FILTER: u8 = 0x01;

/// Widest RIT/XIT offset in Hz (4 digits)
pub const MAX_RIT_OFFSET_HZ: i64 = 9999;

const RIT_DIGITS: usize = 4;

/// Convert a 0-100 % value to the 0-255 wire scale, clamping above 100
pub fn percent_to_level(percent: u8) -> u8 {
    let percent = percent.min(100) as u16;
    ((percent * 255 + 50) / 100) as u8
}

/// Convert a 0-255 wire level back to 0-100 %
pub fn level_to_percent(level: u8) -> u8 {
    ((level as u16 * 100 + 127) / 255) as u8
}

/// Formatter/parser pair for every operation the engine performs
pub trait CommandSet: Send + Sync {
    /// Behavior descriptor that drives the default methods
    fn behavior(&self) -> &RadioBehavior;

    /// How this radio lays out sub-commanded replies
    fn response_layout(&self) -> ResponseLayout;

    // ---------------------------------------------------------------
    // Frequency
    // ---------------------------------------------------------------

    /// Highest frequency the radio's frequency field can carry
    ///
    /// Anything above it loses its top digits on the wire.
    fn max_frequency_hz(&self) -> u64 {
        bcd::max_frequency_for_width(bcd::FREQUENCY_BYTES)
    }

    fn format_set_frequency(&self, hz: u64) -> Command {
        Command::new(cmd::SET_FREQUENCY, bcd::encode_frequency(hz))
    }

    fn format_read_frequency(&self) -> Command {
        Command::read(cmd::READ_FREQUENCY, None)
    }

    fn parse_frequency_response(&self, frame: &Frame) -> Result<u64, ParseError> {
        expect_command(frame, cmd::READ_FREQUENCY)?;
        expect_len(&frame.payload, "frequency", bcd::FREQUENCY_BYTES)?;
        bcd::decode_frequency(&frame.payload)
    }

    // ---------------------------------------------------------------
    // VFO
    // ---------------------------------------------------------------

    fn format_select_vfo(&self, vfo: VfoRef) -> Option<Command> {
        let code = self.behavior().vfo_code(vfo)?;
        Some(Command::new(cmd::VFO, [code]))
    }

    fn format_exchange_vfos(&self) -> Option<Command> {
        match self.behavior().vfo_model {
            VfoModel::None => None,
            _ => Some(Command::new(cmd::VFO, [sub::EXCHANGE])),
        }
    }

    fn format_equalize_vfos(&self) -> Option<Command> {
        match self.behavior().vfo_model {
            VfoModel::None => None,
            VfoModel::MainSub => Some(Command::new(cmd::VFO, [sub::EQUALIZE_MAIN_SUB])),
            _ => Some(Command::new(cmd::VFO, [sub::EQUALIZE_AB])),
        }
    }

    // ---------------------------------------------------------------
    // Mode
    // ---------------------------------------------------------------

    /// Mode change, with a filter byte only if the radio requires one
    ///
    /// Radios without the filter byte NAK a two-byte payload, so `filter`
    /// is dropped for them.
    fn format_set_mode(&self, mode: Mode, filter: Option<u8>) -> Command {
        if self.behavior().requires_mode_filter_byte {
            Command::new(cmd::SET_MODE, [mode.code(), filter.unwrap_or(DEFAULT_FILTER)])
        } else {
            Command::new(cmd::SET_MODE, [mode.code()])
        }
    }

    fn format_read_mode(&self) -> Command {
        Command::read(cmd::READ_MODE, None)
    }

    /// Mode and, if the radio sent one, filter index
    fn parse_mode_response(&self, frame: &Frame) -> Result<(Mode, Option<u8>), ParseError> {
        expect_command(frame, cmd::READ_MODE)?;
        match frame.payload.as_slice() {
            [mode] => Ok((Mode::try_from(*mode)?, None)),
            [mode, filter] => Ok((Mode::try_from(*mode)?, Some(*filter))),
            other => Err(ParseError::UnexpectedLength {
                what: "mode",
                expected: 2,
                actual: other.len(),
            }),
        }
    }

    // ---------------------------------------------------------------
    // Power and meters
    // ---------------------------------------------------------------

    /// RF power as percentage of full scale, clamped to 100
    fn format_set_power(&self, percent: u8) -> Command {
        Command::with_sub(
            cmd::LEVEL,
            sub::RF_POWER,
            bcd::encode_level(percent_to_level(percent)),
        )
    }

    fn format_read_power(&self) -> Command {
        Command::read(cmd::LEVEL, Some(sub::RF_POWER))
    }

    fn parse_power_response(&self, frame: &Frame) -> Result<u8, ParseError> {
        expect_sub_command(frame, cmd::LEVEL, sub::RF_POWER)?;
        Ok(level_to_percent(bcd::decode_level(&frame.payload)?))
    }

    fn format_read_s_meter(&self) -> Command {
        Command::read(cmd::METER, Some(sub::S_METER))
    }

    fn parse_s_meter_response(&self, frame: &Frame) -> Result<SignalStrength, ParseError> {
        expect_sub_command(frame, cmd::METER, sub::S_METER)?;
        Ok(SignalStrength::from_raw(bcd::decode_level(&frame.payload)?))
    }

    // ---------------------------------------------------------------
    // PTT and split
    // ---------------------------------------------------------------

    fn format_set_ptt(&self, on: bool) -> Command {
        Command::new(cmd::TX, [sub::PTT, u8::from(on)])
    }

    fn format_read_ptt(&self) -> Command {
        Command::new(cmd::TX, [sub::PTT])
    }

    fn parse_ptt_response(&self, frame: &Frame) -> Result<bool, ParseError> {
        parse_flag(frame, self.response_layout(), cmd::TX, sub::PTT, "PTT")
    }

    fn format_set_split(&self, on: bool) -> Command {
        Command::new(cmd::SPLIT, [u8::from(on)])
    }

    fn format_read_split(&self) -> Command {
        Command::read(cmd::SPLIT, None)
    }

    fn parse_split_response(&self, frame: &Frame) -> Result<bool, ParseError> {
        expect_command(frame, cmd::SPLIT)?;
        expect_len(&frame.payload, "split", 1)?;
        // 0x10-0x12 are duplex settings, which are not split
        Ok(frame.payload[0] == 0x01)
    }

    // ---------------------------------------------------------------
    // RIT / XIT
    // ---------------------------------------------------------------

    /// Write the shared RIT/XIT offset register
    ///
    /// The offset is not range checked; the engine rejects values beyond
    /// ±[`MAX_RIT_OFFSET_HZ`] before calling this.
    fn format_set_rit_offset(&self, hz: i64) -> Command {
        let mut payload = vec![sub::RIT_OFFSET];
        payload.extend(bcd::encode_signed_offset(hz, RIT_DIGITS));
        Command::new(cmd::RIT, payload)
    }

    fn format_set_rit_enabled(&self, on: bool) -> Command {
        Command::new(cmd::RIT, [sub::RIT_ENABLE, u8::from(on)])
    }

    fn format_read_rit_offset(&self) -> Command {
        Command::new(cmd::RIT, [sub::RIT_OFFSET])
    }

    fn format_read_rit_enabled(&self) -> Command {
        Command::new(cmd::RIT, [sub::RIT_ENABLE])
    }

    fn parse_rit_offset_response(&self, frame: &Frame) -> Result<i64, ParseError> {
        expect_command(frame, cmd::RIT)?;
        let data = sub_data(frame, self.response_layout(), sub::RIT_OFFSET)?;
        expect_len(data, "RIT offset", RIT_DIGITS / 2 + 1)?;
        bcd::decode_signed_offset(data)
    }

    fn parse_rit_enabled_response(&self, frame: &Frame) -> Result<bool, ParseError> {
        parse_flag(frame, self.response_layout(), cmd::RIT, sub::RIT_ENABLE, "RIT")
    }

    /// XIT shares the RIT offset register
    fn format_set_xit_offset(&self, hz: i64) -> Command {
        self.format_set_rit_offset(hz)
    }

    fn format_set_xit_enabled(&self, on: bool) -> Command {
        Command::new(cmd::RIT, [sub::XIT_ENABLE, u8::from(on)])
    }

    fn format_read_xit_offset(&self) -> Command {
        self.format_read_rit_offset()
    }

    fn format_read_xit_enabled(&self) -> Command {
        Command::new(cmd::RIT, [sub::XIT_ENABLE])
    }

    fn parse_xit_offset_response(&self, frame: &Frame) -> Result<i64, ParseError> {
        self.parse_rit_offset_response(frame)
    }

    fn parse_xit_enabled_response(&self, frame: &Frame) -> Result<bool, ParseError> {
        parse_flag(frame, self.response_layout(), cmd::RIT, sub::XIT_ENABLE, "XIT")
    }

    // ---------------------------------------------------------------
    // Memory
    // ---------------------------------------------------------------

    fn format_select_memory(&self, channel: u16) -> Command {
        Command::new(cmd::SELECT_MEMORY, bcd::encode_bcd_be(channel as u32, 4))
    }

    fn format_write_memory(&self, channel: &MemoryChannel) -> Command {
        let mut payload = vec![sub::MEMORY_CONTENTS];
        payload.extend(channel.encode());
        Command::new(cmd::SETTINGS, payload)
    }

    fn format_read_memory(&self, channel: u16) -> Command {
        let mut payload = vec![sub::MEMORY_CONTENTS];
        payload.extend(bcd::encode_bcd_be(channel as u32, 4));
        Command::new(cmd::SETTINGS, payload)
    }

    fn parse_memory_response(&self, frame: &Frame) -> Result<MemoryChannel, ParseError> {
        expect_command(frame, cmd::SETTINGS)?;
        let data = sub_data(frame, self.response_layout(), sub::MEMORY_CONTENTS)?;
        MemoryChannel::decode(data)
    }

    // ---------------------------------------------------------------
    // Transceive
    // ---------------------------------------------------------------

    /// Enable or disable unsolicited frequency/mode broadcasts
    fn format_set_transceive(&self, on: bool) -> Command {
        Command::new(cmd::SETTINGS, [sub::TRANSCEIVE, u8::from(on)])
    }
}

/// Command set driven entirely by the behavior descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardCommandSet {
    behavior: RadioBehavior,
    layout: ResponseLayout,
}

impl StandardCommandSet {
    pub fn new(behavior: RadioBehavior, layout: ResponseLayout) -> Self {
        Self { behavior, layout }
    }
}

impl CommandSet for StandardCommandSet {
    fn behavior(&self) -> &RadioBehavior {
        &self.behavior
    }

    fn response_layout(&self) -> ResponseLayout {
        self.layout
    }
}

/// IC-735: 4-byte frequency field, otherwise standard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ic735CommandSet {
    inner: StandardCommandSet,
}

/// Frequency field width of the IC-735
pub const IC735_FREQUENCY_BYTES: usize = 4;

impl Ic735CommandSet {
    pub fn new(behavior: RadioBehavior, layout: ResponseLayout) -> Self {
        Self {
            inner: StandardCommandSet::new(behavior, layout),
        }
    }
}

impl CommandSet for Ic735CommandSet {
    fn behavior(&self) -> &RadioBehavior {
        self.inner.behavior()
    }

    fn response_layout(&self) -> ResponseLayout {
        self.inner.response_layout()
    }

    fn max_frequency_hz(&self) -> u64 {
        bcd::max_frequency_for_width(IC735_FREQUENCY_BYTES)
    }

    fn format_set_frequency(&self, hz: u64) -> Command {
        Command::new(
            cmd::SET_FREQUENCY,
            bcd::encode_frequency_width(hz, IC735_FREQUENCY_BYTES),
        )
    }

    fn parse_frequency_response(&self, frame: &Frame) -> Result<u64, ParseError> {
        expect_command(frame, cmd::READ_FREQUENCY)?;
        expect_len(&frame.payload, "frequency", IC735_FREQUENCY_BYTES)?;
        bcd::decode_frequency(&frame.payload)
    }
}

fn expect_command(frame: &Frame, expected: u8) -> Result<(), ParseError> {
    if frame.command != expected {
        return Err(ParseError::UnexpectedCommand {
            expected,
            actual: frame.command,
        });
    }
    Ok(())
}

fn expect_sub_command(frame: &Frame, command: u8, sub_command: u8) -> Result<(), ParseError> {
    expect_command(frame, command)?;
    match frame.sub_command {
        Some(actual) if actual == sub_command => Ok(()),
        Some(actual) => Err(ParseError::UnexpectedCommand {
            expected: sub_command,
            actual,
        }),
        None => Err(ParseError::MalformedFrame(format!(
            "reply to 0x{:02X} is missing sub-command 0x{:02X}",
            command, sub_command
        ))),
    }
}

fn expect_len(data: &[u8], what: &'static str, expected: usize) -> Result<(), ParseError> {
    if data.len() != expected {
        return Err(ParseError::UnexpectedLength {
            what,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn sub_data<'a>(
    frame: &'a Frame,
    layout: ResponseLayout,
    sub_command: u8,
) -> Result<&'a [u8], ParseError> {
    layout.data(sub_command, &frame.payload).ok_or_else(|| {
        let actual = frame.payload.first().copied().unwrap_or(0);
        ParseError::UnexpectedCommand {
            expected: sub_command,
            actual,
        }
    })
}

fn parse_flag(
    frame: &Frame,
    layout: ResponseLayout,
    command: u8,
    sub_command: u8,
    what: &'static str,
) -> Result<bool, ParseError> {
    expect_command(frame, command)?;
    let data = sub_data(frame, layout, sub_command)?;
    expect_len(data, what, 1)?;
    Ok(data[0] != 0)
}
