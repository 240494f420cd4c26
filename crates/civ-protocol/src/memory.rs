//! Memory-channel record codec
//!
//! A channel travels as one fixed-offset record in the payload of the
//! memory contents command (`1A 00`):
//!
//! ```text
//! offset  size  field
//!      0     2  channel number, 4-digit big-endian BCD
//!      2     5  frequency, little-endian BCD
//!      7     1  mode code
//!      8     1  filter index (FF = not set)
//!      9     1  data mode 00/01 (FF = not set)
//!     10     3  duplex offset in 100 Hz units, signed BCD (5 digits)
//!     13     2  tone in tenths of Hz, 4-digit big-endian BCD (0 = none)
//!     15    10  name, ASCII padded with spaces
//! ```
//!
//! A blank channel comes back as the channel number followed by a single
//! `FF`, which decodes to [`ParseError::EmptyChannel`].

use crate::bcd;
use crate::command::Mode;
use crate::error::ParseError;

/// Size of an encoded record in bytes
pub const RECORD_LEN: usize = 25;

/// Maximum stored name length
pub const NAME_LEN: usize = 10;

/// Highest channel number the 4-digit field can carry
pub const MAX_CHANNEL: u16 = 9999;

/// Largest duplex offset magnitude the 5-digit, 100 Hz field can carry
pub const MAX_DUPLEX_OFFSET_HZ: i64 = 9_999_900;

/// Largest tone the 4-digit tenths-of-Hz field can carry
pub const MAX_TONE_HZ: f64 = 999.9;

/// Marker byte for unset filter and data-mode fields, and for blank channels
pub const UNSET: u8 = 0xFF;

const DUPLEX_DIGITS: usize = 5;
const DUPLEX_UNIT_HZ: i64 = 100;

/// One memory channel
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryChannel {
    pub number: u16,
    pub frequency_hz: u64,
    pub mode: Mode,
    pub filter: Option<u8>,
    pub data_mode: Option<bool>,
    pub duplex_offset_hz: Option<i64>,
    pub tone_hz: Option<f64>,
    /// Up to 10 ASCII characters; longer names are truncated on write
    pub name: Option<String>,
}

impl MemoryChannel {
    /// A channel with only frequency and mode set
    pub fn new(number: u16, frequency_hz: u64, mode: Mode) -> Self {
        Self {
            number,
            frequency_hz,
            mode,
            filter: None,
            data_mode: None,
            duplex_offset_hz: None,
            tone_hz: None,
            name: None,
        }
    }

    /// Check that every field fits its wire representation
    ///
    /// [`encode`](Self::encode) never fails, it silently truncates. Call
    /// this first to reject values that would not survive the trip.
    pub fn validate(&self) -> Result<(), String> {
        if self.number > MAX_CHANNEL {
            return Err(format!(
                "channel {} exceeds {}",
                self.number, MAX_CHANNEL
            ));
        }

        if self.frequency_hz > 9_999_999_999 {
            return Err(format!("frequency {} Hz out of range", self.frequency_hz));
        }

        if self.filter == Some(UNSET) {
            return Err("filter index 0xFF is reserved".into());
        }

        if let Some(offset) = self.duplex_offset_hz {
            if offset.abs() > MAX_DUPLEX_OFFSET_HZ || offset % DUPLEX_UNIT_HZ != 0 {
                return Err(format!(
                    "duplex offset {} Hz is not a multiple of 100 Hz within ±{} Hz",
                    offset, MAX_DUPLEX_OFFSET_HZ
                ));
            }
        }

        if let Some(tone) = self.tone_hz {
            if !(0.0..=MAX_TONE_HZ).contains(&tone) {
                return Err(format!("tone {} Hz out of range", tone));
            }
        }

        if let Some(name) = &self.name {
            if !name.is_ascii() {
                return Err(format!("name {:?} is not ASCII", name));
            }
        }

        Ok(())
    }

    /// Encode to the 25-byte record
    pub fn encode(&self) -> Vec<u8> {
        let mut record = Vec::with_capacity(RECORD_LEN);

        record.extend(bcd::encode_bcd_be(self.number as u32, 4));
        record.extend(bcd::encode_frequency(self.frequency_hz));
        record.push(self.mode.code());
        record.push(self.filter.unwrap_or(UNSET));
        record.push(self.data_mode.map_or(UNSET, u8::from));

        let offset_units = self.duplex_offset_hz.unwrap_or(0) / DUPLEX_UNIT_HZ;
        record.extend(bcd::encode_signed_offset(offset_units, DUPLEX_DIGITS));

        let tone_tenths = self
            .tone_hz
            .map(|hz| (hz * 10.0).round() as u32)
            .unwrap_or(0);
        record.extend(bcd::encode_bcd_be(tone_tenths, 4));

        let mut name = [b' '; NAME_LEN];
        if let Some(text) = &self.name {
            for (slot, ch) in name.iter_mut().zip(text.chars()) {
                *slot = if ch.is_ascii() { ch as u8 } else { b'?' };
            }
        }
        record.extend_from_slice(&name);

        record
    }

    /// Decode a record
    ///
    /// Trailing bytes beyond the 25-byte record are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < 2 {
            return Err(ParseError::UnexpectedLength {
                what: "memory channel",
                expected: RECORD_LEN,
                actual: bytes.len(),
            });
        }

        let number = bcd::decode_bcd_be(&bytes[0..2])? as u16;

        if bytes.get(2) == Some(&UNSET) {
            return Err(ParseError::EmptyChannel(number));
        }

        if bytes.len() < RECORD_LEN {
            return Err(ParseError::UnexpectedLength {
                what: "memory channel",
                expected: RECORD_LEN,
                actual: bytes.len(),
            });
        }

        let frequency_hz = bcd::decode_frequency(&bytes[2..7])?;
        let mode = Mode::try_from(bytes[7])?;
        let filter = Some(bytes[8]).filter(|&b| b != UNSET);
        let data_mode = match bytes[9] {
            UNSET => None,
            b => Some(b != 0),
        };

        let offset_units = bcd::decode_signed_offset(&bytes[10..13])?;
        let duplex_offset_hz = Some(offset_units * DUPLEX_UNIT_HZ).filter(|&hz| hz != 0);

        let tone_tenths = bcd::decode_bcd_be(&bytes[13..15])?;
        let tone_hz = (tone_tenths != 0).then(|| tone_tenths as f64 / 10.0);

        let raw_name = &bytes[15..RECORD_LEN];
        if !raw_name.is_ascii() {
            return Err(ParseError::MalformedFrame(format!(
                "memory channel {} name is not ASCII",
                number
            )));
        }
        let text = String::from_utf8_lossy(raw_name).trim_end().to_string();
        let name = (!text.is_empty()).then_some(text);

        Ok(Self {
            number,
            frequency_hz,
            mode,
            filter,
            data_mode,
            duplex_offset_hz,
            tone_hz,
            name,
        })
    }
}
