//! Radio behavior descriptor
//!
//! A handful of enumerated axes that classify every supported transceiver.
//! The generic command set reads these instead of branching on model
//! identity.

use crate::command::VfoRef;

/// How a radio addresses its VFOs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VfoModel {
    /// VFO A/B selectable, commands may target a VFO directly
    Targetable,
    /// VFO A/B selectable, commands act on the current VFO only
    CurrentOnly,
    /// Main/Sub receivers, no A/B
    MainSub,
    /// Main/Sub receivers, each with its own A/B pair
    MainSubDualVfo,
    /// Single VFO, no selection command
    None,
}

/// Unit the radio's front panel uses for RF power
///
/// The wire always carries percentage of scale; conversion happens above
/// the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PowerUnits {
    Percentage,
    Watts,
}

/// Where a sub-commanded reply puts its data
///
/// Some firmware repeats the sub-command byte at the start of the reply
/// payload (`1C 00 01`); older firmware sends the bare data (`1C 01`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResponseLayout {
    /// Payload begins with an echo of the sub-command byte
    #[default]
    SubCommandEchoed,
    /// Payload is bare data
    SubCommandOmitted,
}

impl ResponseLayout {
    /// Strip the sub-command echo from a reply payload
    ///
    /// Returns `None` if the layout expects an echo and the payload does
    /// not start with `sub_command`.
    pub fn data<'a>(&self, sub_command: u8, payload: &'a [u8]) -> Option<&'a [u8]> {
        match self {
            ResponseLayout::SubCommandEchoed => match payload.split_first() {
                Some((&first, rest)) if first == sub_command => Some(rest),
                _ => None,
            },
            ResponseLayout::SubCommandOmitted => Some(payload),
        }
    }
}

/// Behavior descriptor for one transceiver model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadioBehavior {
    /// VFO addressing model
    pub vfo_model: VfoModel,
    /// Mode set command must carry a filter byte
    pub requires_mode_filter_byte: bool,
    /// Radio loops every received command back before replying
    pub echoes_commands: bool,
    /// Front-panel power unit
    pub power_units: PowerUnits,
}

impl RadioBehavior {
    /// Descriptor for a current-generation radio with A/B VFOs
    pub const fn modern() -> Self {
        Self {
            vfo_model: VfoModel::CurrentOnly,
            requires_mode_filter_byte: true,
            echoes_commands: false,
            power_units: PowerUnits::Percentage,
        }
    }

    pub const fn with_vfo_model(mut self, vfo_model: VfoModel) -> Self {
        self.vfo_model = vfo_model;
        self
    }

    pub const fn with_echo(mut self) -> Self {
        self.echoes_commands = true;
        self
    }

    pub const fn without_filter_byte(mut self) -> Self {
        self.requires_mode_filter_byte = false;
        self
    }

    pub const fn with_power_units(mut self, power_units: PowerUnits) -> Self {
        self.power_units = power_units;
        self
    }

    /// Wire code for selecting `vfo`, or `None` if this radio cannot address it
    ///
    /// Returns `None` for every reference when the radio has no VFO
    /// selection at all.
    pub fn vfo_code(&self, vfo: VfoRef) -> Option<u8> {
        match (self.vfo_model, vfo) {
            (VfoModel::Targetable | VfoModel::CurrentOnly, VfoRef::A | VfoRef::Main) => {
                Some(0x00)
            }
            (VfoModel::Targetable | VfoModel::CurrentOnly, VfoRef::B | VfoRef::Sub) => {
                Some(0x01)
            }
            (VfoModel::MainSub, VfoRef::A | VfoRef::B) => None,
            (VfoModel::MainSub | VfoModel::MainSubDualVfo, VfoRef::Main) => Some(0xD0),
            (VfoModel::MainSub | VfoModel::MainSubDualVfo, VfoRef::Sub) => Some(0xD1),
            (VfoModel::MainSubDualVfo, VfoRef::A) => Some(0x00),
            (VfoModel::MainSubDualVfo, VfoRef::B) => Some(0x01),
            (VfoModel::None, _) => None,
        }
    }

    /// Returns `true` if the radio has any VFO selection command
    pub fn has_vfo_selection(&self) -> bool {
        self.vfo_model != VfoModel::None
    }
}

impl Default for RadioBehavior {
    fn default() -> Self {
        Self::modern()
    }
}
