//! Virtual CI-V transceiver
//!
//! Answers CI-V frames the way the configured model would: echoing
//! commands if the model echoes, honouring its VFO model, filter-byte rule,
//! frequency field width and reply layout. Any command can be forced to NG
//! for fault injection.

use std::collections::{BTreeMap, HashSet};

use civ_protocol::bcd;
use civ_protocol::formatter::{cmd, sub};
use civ_protocol::frame::BROADCAST_ADDR;
use civ_protocol::memory::{RECORD_LEN, UNSET};
use civ_protocol::{
    Command, Frame, MemoryChannel, Mode, RadioBehavior, RadioModel, ResponseLayout, VfoModel,
    VfoRef,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for creating a virtual radio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualRadioConfig {
    /// Display name/identifier
    pub id: String,
    /// Model to emulate
    pub model: RadioModel,
    /// CI-V address, defaults to the model's factory address
    pub address: Option<u8>,
    /// Initial frequency in Hz
    pub initial_frequency_hz: u64,
    /// Initial operating mode
    pub initial_mode: Mode,
    /// Raw S-meter value reported to meter reads
    pub s_meter_raw: u8,
}

impl Default for VirtualRadioConfig {
    fn default() -> Self {
        Self {
            id: "Virtual Radio".to_string(),
            model: RadioModel::Ic7300,
            address: None,
            initial_frequency_hz: 14_250_000, // 20m
            initial_mode: Mode::Usb,
            s_meter_raw: 0,
        }
    }
}

/// A simulated CI-V transceiver
#[derive(Debug)]
pub struct VirtualRadio {
    id: String,
    model: RadioModel,
    address: u8,
    behavior: RadioBehavior,
    layout: ResponseLayout,
    frequency_bytes: usize,
    has_xit: bool,
    memory_channels: u16,
    /// Two VFOs (A/B or Main/Sub)
    vfo_hz: [u64; 2],
    current_vfo: usize,
    mode: Mode,
    filter: u8,
    power_level: u8,
    ptt: bool,
    split: bool,
    rit_offset_hz: i64,
    rit_enabled: bool,
    xit_enabled: bool,
    s_meter_raw: u8,
    memories: BTreeMap<u16, MemoryChannel>,
    selected_memory: Option<u16>,
    transceive: bool,
    rejected: HashSet<u8>,
    frames_handled: usize,
}

impl VirtualRadio {
    /// Create a virtual radio emulating `model` with default settings
    pub fn new(id: impl Into<String>, model: RadioModel) -> Self {
        Self::from_config(VirtualRadioConfig {
            id: id.into(),
            model,
            ..Default::default()
        })
    }

    /// Create a virtual radio from configuration
    pub fn from_config(config: VirtualRadioConfig) -> Self {
        let info = config.model.info();
        Self {
            id: config.id,
            model: config.model,
            address: config.address.unwrap_or(info.default_address),
            behavior: info.behavior,
            layout: info.response_layout,
            frequency_bytes: info.frequency_bytes,
            has_xit: info.has_xit,
            memory_channels: info.memory_channels,
            vfo_hz: [config.initial_frequency_hz; 2],
            current_vfo: 0,
            mode: config.initial_mode,
            filter: 1,
            power_level: 255,
            ptt: false,
            split: false,
            rit_offset_hz: 0,
            rit_enabled: false,
            xit_enabled: false,
            s_meter_raw: config.s_meter_raw,
            memories: BTreeMap::new(),
            selected_memory: None,
            transceive: true,
            rejected: HashSet::new(),
            frames_handled: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> RadioModel {
        self.model
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Frequency of the current VFO
    pub fn frequency_hz(&self) -> u64 {
        self.vfo_hz[self.current_vfo]
    }

    /// Frequency of VFO A/Main (0) or B/Sub (1)
    pub fn vfo_frequency_hz(&self, index: usize) -> Option<u64> {
        self.vfo_hz.get(index).copied()
    }

    /// Index of the current VFO, 0 for A/Main and 1 for B/Sub
    pub fn current_vfo(&self) -> usize {
        self.current_vfo
    }

    /// Tune the current VFO from the front panel
    pub fn set_frequency(&mut self, hz: u64) {
        self.vfo_hz[self.current_vfo] = hz;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filter(&self) -> u8 {
        self.filter
    }

    /// RF power on the 0-255 wire scale
    pub fn power_level(&self) -> u8 {
        self.power_level
    }

    pub fn ptt(&self) -> bool {
        self.ptt
    }

    pub fn split(&self) -> bool {
        self.split
    }

    pub fn rit_offset_hz(&self) -> i64 {
        self.rit_offset_hz
    }

    pub fn rit_enabled(&self) -> bool {
        self.rit_enabled
    }

    pub fn xit_enabled(&self) -> bool {
        self.xit_enabled
    }

    pub fn set_s_meter_raw(&mut self, raw: u8) {
        self.s_meter_raw = raw;
    }

    pub fn memory(&self, channel: u16) -> Option<&MemoryChannel> {
        self.memories.get(&channel)
    }

    /// Store a channel directly, bypassing CI-V
    pub fn store_memory(&mut self, channel: MemoryChannel) {
        self.memories.insert(channel.number, channel);
    }

    pub fn selected_memory(&self) -> Option<u16> {
        self.selected_memory
    }

    pub fn transceive(&self) -> bool {
        self.transceive
    }

    /// Answer every future frame carrying `command` with NG
    pub fn reject_command(&mut self, command: u8) {
        self.rejected.insert(command);
    }

    /// Number of frames addressed to this radio so far
    pub fn frames_handled(&self) -> usize {
        self.frames_handled
    }

    /// Process one received frame and return the frames the radio sends back
    ///
    /// Frames for other addresses and bare OK/NG frames get no reply. On an
    /// echoing model the first returned frame is the echo.
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<Frame> {
        if frame.destination != self.address && frame.destination != BROADCAST_ADDR {
            return Vec::new();
        }
        if frame.is_ack() || frame.is_nak() {
            return Vec::new();
        }

        self.frames_handled += 1;
        let mut out = Vec::with_capacity(2);

        if self.behavior.echoes_commands {
            out.push(frame.clone());
        }

        let reply = if self.rejected.contains(&frame.command) {
            None
        } else {
            self.respond(frame)
        };

        let reply = reply.unwrap_or_else(|| {
            debug!(
                "{} rejecting command 0x{:02X} {:02X?}",
                self.id, frame.command, frame.payload
            );
            Reply::Nak
        });

        out.push(match reply {
            Reply::Ack => Frame::ack(frame.source, self.address),
            Reply::Nak => Frame::nak(frame.source, self.address),
            Reply::Data(command) => Frame::new(frame.source, self.address, &command),
        });
        out
    }

    /// `None` means NG
    fn respond(&mut self, frame: &Frame) -> Option<Reply> {
        let payload = frame.payload.as_slice();

        match (frame.command, frame.sub_command) {
            (cmd::READ_FREQUENCY, None) if payload.is_empty() => Some(Reply::Data(Command::new(
                cmd::READ_FREQUENCY,
                bcd::encode_frequency_width(self.frequency_hz(), self.frequency_bytes),
            ))),
            (cmd::SET_FREQUENCY, None) if payload.len() == self.frequency_bytes => {
                let hz = bcd::decode_frequency(payload).ok()?;
                self.set_frequency(hz);
                Some(Reply::Ack)
            }
            (cmd::READ_MODE, None) if payload.is_empty() => {
                let data = if self.behavior.requires_mode_filter_byte {
                    vec![self.mode.code(), self.filter]
                } else {
                    vec![self.mode.code()]
                };
                Some(Reply::Data(Command::new(cmd::READ_MODE, data)))
            }
            (cmd::SET_MODE, None) => self.set_mode(payload),
            (cmd::VFO, None) => self.vfo_operation(payload),
            (cmd::SELECT_MEMORY, None) if payload.len() == 2 => {
                let channel = bcd::decode_bcd_be(payload).ok()? as u16;
                if channel > self.memory_channels {
                    return None;
                }
                self.selected_memory = Some(channel);
                Some(Reply::Ack)
            }
            (cmd::SPLIT, None) => match payload {
                [] => Some(Reply::Data(Command::new(cmd::SPLIT, [u8::from(self.split)]))),
                [0x00] | [0x01] => {
                    self.split = payload[0] == 0x01;
                    Some(Reply::Ack)
                }
                _ => None,
            },
            (cmd::LEVEL, Some(sub::RF_POWER)) => match payload.len() {
                0 => Some(Reply::Data(Command::with_sub(
                    cmd::LEVEL,
                    sub::RF_POWER,
                    bcd::encode_level(self.power_level),
                ))),
                2 => {
                    self.power_level = bcd::decode_level(payload).ok()?;
                    Some(Reply::Ack)
                }
                _ => None,
            },
            (cmd::METER, Some(sub::S_METER)) if payload.is_empty() => Some(Reply::Data(
                Command::with_sub(cmd::METER, sub::S_METER, bcd::encode_level(self.s_meter_raw)),
            )),
            (cmd::TX, None) => match payload {
                [sub::PTT] => Some(self.sub_reply(cmd::TX, sub::PTT, vec![u8::from(self.ptt)])),
                [sub::PTT, on @ (0x00 | 0x01)] => {
                    self.ptt = *on == 0x01;
                    Some(Reply::Ack)
                }
                _ => None,
            },
            (cmd::SETTINGS, None) => self.settings(payload),
            (cmd::RIT, None) => self.rit_operation(payload),
            _ => None,
        }
    }

    fn set_mode(&mut self, payload: &[u8]) -> Option<Reply> {
        let expected = if self.behavior.requires_mode_filter_byte { 2 } else { 1 };
        if payload.len() != expected {
            return None;
        }
        self.mode = Mode::try_from(payload[0]).ok()?;
        if let Some(&filter) = payload.get(1) {
            self.filter = filter;
        }
        Some(Reply::Ack)
    }

    fn vfo_operation(&mut self, payload: &[u8]) -> Option<Reply> {
        let [code] = payload else {
            return None;
        };
        if self.behavior.vfo_model == VfoModel::None {
            return None;
        }

        match *code {
            sub::EXCHANGE => self.vfo_hz.swap(0, 1),
            sub::EQUALIZE_AB | sub::EQUALIZE_MAIN_SUB => {
                self.vfo_hz[1 - self.current_vfo] = self.vfo_hz[self.current_vfo];
            }
            code => {
                let vfo = [VfoRef::A, VfoRef::B, VfoRef::Main, VfoRef::Sub]
                    .into_iter()
                    .find(|&vfo| self.behavior.vfo_code(vfo) == Some(code))?;
                self.current_vfo = match vfo {
                    VfoRef::A | VfoRef::Main => 0,
                    VfoRef::B | VfoRef::Sub => 1,
                };
            }
        }
        Some(Reply::Ack)
    }

    fn settings(&mut self, payload: &[u8]) -> Option<Reply> {
        match payload {
            [sub::MEMORY_CONTENTS, hi, lo] => {
                let channel = bcd::decode_bcd_be(&[*hi, *lo]).ok()? as u16;
                let data = match self.memories.get(&channel) {
                    Some(memory) => memory.encode(),
                    None => vec![*hi, *lo, UNSET],
                };
                Some(self.sub_reply(cmd::SETTINGS, sub::MEMORY_CONTENTS, data))
            }
            [sub::MEMORY_CONTENTS, record @ ..] if record.len() == RECORD_LEN => {
                let channel = MemoryChannel::decode(record).ok()?;
                if channel.number > self.memory_channels {
                    return None;
                }
                self.memories.insert(channel.number, channel);
                Some(Reply::Ack)
            }
            [sub::TRANSCEIVE, on @ (0x00 | 0x01)] => {
                self.transceive = *on == 0x01;
                Some(Reply::Ack)
            }
            _ => None,
        }
    }

    fn rit_operation(&mut self, payload: &[u8]) -> Option<Reply> {
        match payload {
            [sub::RIT_OFFSET] => Some(self.sub_reply(
                cmd::RIT,
                sub::RIT_OFFSET,
                bcd::encode_signed_offset(self.rit_offset_hz, 4),
            )),
            [sub::RIT_OFFSET, offset @ ..] if offset.len() == 3 => {
                self.rit_offset_hz = bcd::decode_signed_offset(offset).ok()?;
                Some(Reply::Ack)
            }
            [sub::RIT_ENABLE] => Some(self.sub_reply(
                cmd::RIT,
                sub::RIT_ENABLE,
                vec![u8::from(self.rit_enabled)],
            )),
            [sub::RIT_ENABLE, on @ (0x00 | 0x01)] => {
                self.rit_enabled = *on == 0x01;
                Some(Reply::Ack)
            }
            [sub::XIT_ENABLE, ..] if !self.has_xit => None,
            [sub::XIT_ENABLE] => Some(self.sub_reply(
                cmd::RIT,
                sub::XIT_ENABLE,
                vec![u8::from(self.xit_enabled)],
            )),
            [sub::XIT_ENABLE, on @ (0x00 | 0x01)] => {
                self.xit_enabled = *on == 0x01;
                Some(Reply::Ack)
            }
            _ => None,
        }
    }

    /// Data reply for a command whose sub-command travels in the payload
    fn sub_reply(&self, command: u8, sub_command: u8, data: Vec<u8>) -> Reply {
        let payload = match self.layout {
            ResponseLayout::SubCommandEchoed => {
                let mut payload = vec![sub_command];
                payload.extend(data);
                payload
            }
            ResponseLayout::SubCommandOmitted => data,
        };
        Reply::Data(Command::new(command, payload))
    }
}

enum Reply {
    Ack,
    Nak,
    Data(Command),
}
