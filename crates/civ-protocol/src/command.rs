//! Value types shared by the formatter, the engine and the simulator
//!
//! This module provides the operating modes, logical VFO references and
//! meter readings that CI-V commands carry, plus [`Command`], the
//! address-free part of a frame produced by a formatter.

use crate::error::ParseError;

/// Operating modes with their CI-V mode codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Lower Sideband
    Lsb,
    /// Upper Sideband
    Usb,
    /// Amplitude Modulation
    Am,
    /// Continuous Wave
    Cw,
    /// RTTY (FSK)
    Rtty,
    /// Frequency Modulation
    Fm,
    /// Wide FM (broadcast receive)
    Wfm,
    /// CW Reverse
    CwR,
    /// RTTY Reverse
    RttyR,
    /// D-STAR digital voice
    Dv,
}

impl Mode {
    /// CI-V mode code sent in the first payload byte of `06` / `04`
    pub fn code(self) -> u8 {
        match self {
            Mode::Lsb => 0x00,
            Mode::Usb => 0x01,
            Mode::Am => 0x02,
            Mode::Cw => 0x03,
            Mode::Rtty => 0x04,
            Mode::Fm => 0x05,
            Mode::Wfm => 0x06,
            Mode::CwR => 0x07,
            Mode::RttyR => 0x08,
            Mode::Dv => 0x17,
        }
    }

    /// Returns whether this is a voice mode
    pub fn is_voice(&self) -> bool {
        matches!(
            self,
            Self::Lsb | Self::Usb | Self::Am | Self::Fm | Self::Wfm | Self::Dv
        )
    }

    /// Returns whether this is a CW mode
    pub fn is_cw(&self) -> bool {
        matches!(self, Self::Cw | Self::CwR)
    }
}

impl TryFrom<u8> for Mode {
    type Error = ParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Lsb),
            0x01 => Ok(Self::Usb),
            0x02 => Ok(Self::Am),
            0x03 => Ok(Self::Cw),
            0x04 => Ok(Self::Rtty),
            0x05 => Ok(Self::Fm),
            0x06 => Ok(Self::Wfm),
            0x07 => Ok(Self::CwR),
            0x08 => Ok(Self::RttyR),
            0x17 => Ok(Self::Dv),
            other => Err(ParseError::InvalidMode(other)),
        }
    }
}

/// Logical VFO reference
///
/// Which of these a radio can address depends on its
/// [`VfoModel`](crate::behavior::VfoModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VfoRef {
    /// VFO A
    A,
    /// VFO B
    B,
    /// Main receiver
    Main,
    /// Sub receiver
    Sub,
}

/// S-meter reading
///
/// Derived from the raw 0-255 meter value. Icom scales put S9 at 120 and
/// S9+60 dB at 241.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalStrength {
    raw: u8,
    s_units: u8,
    over_s9_db: u8,
}

/// Raw meter value that corresponds to S9
pub const S9_RAW: u8 = 120;

/// Raw meter value that corresponds to S9+60 dB
pub const S9_PLUS_60_RAW: u8 = 241;

impl SignalStrength {
    /// Derive a reading from the raw meter value
    pub fn from_raw(raw: u8) -> Self {
        if raw <= S9_RAW {
            Self {
                raw,
                s_units: ((raw as u16 * 9) / S9_RAW as u16) as u8,
                over_s9_db: 0,
            }
        } else {
            let span = (S9_PLUS_60_RAW - S9_RAW) as u16;
            let above = (raw.min(S9_PLUS_60_RAW) - S9_RAW) as u16;
            Self {
                raw,
                s_units: 9,
                over_s9_db: ((above * 60) / span) as u8,
            }
        }
    }

    /// Raw meter value (0-255)
    pub fn raw(&self) -> u8 {
        self.raw
    }

    /// S units (0-9)
    pub fn s_units(&self) -> u8 {
        self.s_units
    }

    /// Decibels over S9 (0-60)
    pub fn over_s9_db(&self) -> u8 {
        self.over_s9_db
    }
}

impl std::fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.over_s9_db > 0 {
            write!(f, "S9+{}dB", self.over_s9_db)
        } else {
            write!(f, "S{}", self.s_units)
        }
    }
}

/// Address-free CI-V command: command byte, optional sub-command, payload
///
/// Formatters produce these; the engine adds the addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command byte
    pub command: u8,
    /// Sub-command byte, if the command has one
    pub sub_command: Option<u8>,
    /// Data bytes
    pub payload: Vec<u8>,
}

impl Command {
    /// A command with no sub-command
    pub fn new(command: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            command,
            sub_command: None,
            payload: payload.into(),
        }
    }

    /// A command with a sub-command byte
    pub fn with_sub(command: u8, sub_command: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            command,
            sub_command: Some(sub_command),
            payload: payload.into(),
        }
    }

    /// A read request: command bytes only
    pub fn read(command: u8, sub_command: Option<u8>) -> Self {
        Self {
            command,
            sub_command,
            payload: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_codes_round_trip() {
        for mode in [
            Mode::Lsb,
            Mode::Usb,
            Mode::Am,
            Mode::Cw,
            Mode::Rtty,
            Mode::Fm,
            Mode::Wfm,
            Mode::CwR,
            Mode::RttyR,
            Mode::Dv,
        ] {
            assert_eq!(Mode::try_from(mode.code()), Ok(mode));
        }
    }

    #[test]
    fn unknown_mode_code() {
        assert_eq!(Mode::try_from(0x42), Err(ParseError::InvalidMode(0x42)));
    }

    #[test]
    fn signal_strength_scale() {
        let s0 = SignalStrength::from_raw(0);
        assert_eq!((s0.s_units(), s0.over_s9_db()), (0, 0));

        let s5 = SignalStrength::from_raw(67);
        assert_eq!(s5.s_units(), 5);

        let s9 = SignalStrength::from_raw(120);
        assert_eq!((s9.s_units(), s9.over_s9_db()), (9, 0));
        assert_eq!(s9.to_string(), "S9");

        let plus60 = SignalStrength::from_raw(241);
        assert_eq!((plus60.s_units(), plus60.over_s9_db()), (9, 60));

        let pegged = SignalStrength::from_raw(255);
        assert_eq!(pegged.over_s9_db(), 60);
        assert_eq!(pegged.raw(), 255);
    }

    #[test]
    fn signal_strength_over_s9_display() {
        // 181 is halfway between S9 (120) and S9+60 (241)
        let reading = SignalStrength::from_raw(181);
        assert_eq!(reading.over_s9_db(), 30);
        assert_eq!(reading.to_string(), "S9+30dB");
    }
}
