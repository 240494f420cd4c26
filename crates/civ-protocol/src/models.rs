//! Radio model database
//!
//! Static per-model data: default CI-V address, baud rate, behavior
//! descriptor and capability flags. Everything a session needs to pick and
//! configure a command set without branching on model identity.

use crate::behavior::{PowerUnits, RadioBehavior, ResponseLayout, VfoModel};
use crate::bcd::FREQUENCY_BYTES;
use crate::formatter::{CommandSet, Ic735CommandSet, StandardCommandSet, IC735_FREQUENCY_BYTES};

/// Supported transceivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadioModel {
    Ic705,
    Ic7300,
    Ic7610,
    Ic9700,
    Ic7851,
    Ic9100,
    Ic7100,
    Ic7000,
    Ic718,
    Ic746,
    Ic756Pro,
    Ic706Mk2G,
    Ic910H,
    Ic735,
    IcR8600,
}

/// Static information about one model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioModelInfo {
    /// Model name as printed on the front panel
    pub name: &'static str,
    /// Factory default CI-V address
    pub default_address: u8,
    /// Factory default CI-V baud rate
    pub default_baud_rate: u32,
    pub behavior: RadioBehavior,
    pub response_layout: ResponseLayout,
    /// Number of regular memory channels
    pub memory_channels: u16,
    /// Maximum TX power in watts, `None` for receivers
    pub max_power_watts: Option<u16>,
    /// Accepts the XIT commands
    pub has_xit: bool,
    /// Width of the frequency field in bytes
    pub frequency_bytes: usize,
}

const MODERN: RadioBehavior = RadioBehavior::modern();

// Shorthand for the many rigs sharing the modern defaults
const fn standard(
    name: &'static str,
    default_address: u8,
    behavior: RadioBehavior,
    memory_channels: u16,
    max_power_watts: Option<u16>,
    has_xit: bool,
) -> RadioModelInfo {
    RadioModelInfo {
        name,
        default_address,
        default_baud_rate: 19_200,
        behavior,
        response_layout: ResponseLayout::SubCommandEchoed,
        memory_channels,
        max_power_watts,
        has_xit,
        frequency_bytes: FREQUENCY_BYTES,
    }
}

static IC705: RadioModelInfo = standard(
    "IC-705",
    0xA4,
    MODERN
        .with_vfo_model(VfoModel::Targetable)
        .with_power_units(PowerUnits::Watts),
    500,
    Some(10),
    false,
);

static IC7300: RadioModelInfo = standard("IC-7300", 0x94, MODERN, 99, Some(100), true);

static IC7610: RadioModelInfo = standard(
    "IC-7610",
    0x98,
    MODERN.with_vfo_model(VfoModel::MainSubDualVfo),
    99,
    Some(100),
    true,
);

static IC9700: RadioModelInfo = standard(
    "IC-9700",
    0xA2,
    MODERN.with_vfo_model(VfoModel::MainSubDualVfo),
    99,
    Some(100),
    false,
);

static IC7851: RadioModelInfo = standard(
    "IC-7851",
    0x8E,
    MODERN.with_vfo_model(VfoModel::MainSub),
    99,
    Some(200),
    true,
);

static IC9100: RadioModelInfo = standard(
    "IC-9100",
    0x7C,
    MODERN.with_vfo_model(VfoModel::MainSub),
    99,
    Some(100),
    true,
);

static IC7100: RadioModelInfo = standard("IC-7100", 0x88, MODERN, 495, Some(100), false);

static IC7000: RadioModelInfo = RadioModelInfo {
    default_baud_rate: 9600,
    ..standard("IC-7000", 0x70, MODERN.with_echo(), 495, Some(100), false)
};

static IC718: RadioModelInfo = RadioModelInfo {
    default_baud_rate: 9600,
    ..standard("IC-718", 0x5E, MODERN.with_echo(), 101, Some(100), false)
};

static IC746: RadioModelInfo = RadioModelInfo {
    default_baud_rate: 9600,
    ..standard("IC-746", 0x56, MODERN.with_echo(), 99, Some(100), false)
};

static IC756PRO: RadioModelInfo = standard(
    "IC-756PRO",
    0x5C,
    MODERN.with_echo(),
    100,
    Some(100),
    true,
);

static IC706MK2G: RadioModelInfo = RadioModelInfo {
    default_baud_rate: 9600,
    ..standard("IC-706MkIIG", 0x58, MODERN.with_echo(), 99, Some(100), false)
};

static IC910H: RadioModelInfo = RadioModelInfo {
    default_baud_rate: 9600,
    ..standard(
        "IC-910H",
        0x60,
        MODERN.with_vfo_model(VfoModel::MainSub).with_echo(),
        99,
        Some(100),
        false,
    )
};

static IC735: RadioModelInfo = RadioModelInfo {
    default_baud_rate: 1200,
    response_layout: ResponseLayout::SubCommandOmitted,
    frequency_bytes: IC735_FREQUENCY_BYTES,
    ..standard(
        "IC-735",
        0x04,
        MODERN.with_echo().without_filter_byte(),
        12,
        Some(100),
        false,
    )
};

static ICR8600: RadioModelInfo = standard(
    "IC-R8600",
    0x96,
    MODERN.with_vfo_model(VfoModel::None),
    2000,
    None,
    false,
);

static ALL_MODELS: &[RadioModel] = &[
    RadioModel::Ic705,
    RadioModel::Ic7300,
    RadioModel::Ic7610,
    RadioModel::Ic9700,
    RadioModel::Ic7851,
    RadioModel::Ic9100,
    RadioModel::Ic7100,
    RadioModel::Ic7000,
    RadioModel::Ic718,
    RadioModel::Ic746,
    RadioModel::Ic756Pro,
    RadioModel::Ic706Mk2G,
    RadioModel::Ic910H,
    RadioModel::Ic735,
    RadioModel::IcR8600,
];

impl RadioModel {
    /// Static data for this model
    pub fn info(self) -> &'static RadioModelInfo {
        match self {
            RadioModel::Ic705 => &IC705,
            RadioModel::Ic7300 => &IC7300,
            RadioModel::Ic7610 => &IC7610,
            RadioModel::Ic9700 => &IC9700,
            RadioModel::Ic7851 => &IC7851,
            RadioModel::Ic9100 => &IC9100,
            RadioModel::Ic7100 => &IC7100,
            RadioModel::Ic7000 => &IC7000,
            RadioModel::Ic718 => &IC718,
            RadioModel::Ic746 => &IC746,
            RadioModel::Ic756Pro => &IC756PRO,
            RadioModel::Ic706Mk2G => &IC706MK2G,
            RadioModel::Ic910H => &IC910H,
            RadioModel::Ic735 => &IC735,
            RadioModel::IcR8600 => &ICR8600,
        }
    }

    /// All supported models
    pub fn all() -> impl Iterator<Item = RadioModel> {
        ALL_MODELS.iter().copied()
    }

    /// Look up a model by its factory default CI-V address
    pub fn by_civ_address(address: u8) -> Option<RadioModel> {
        Self::all().find(|m| m.info().default_address == address)
    }

    /// Look up a model by name, ignoring case
    pub fn by_name(name: &str) -> Option<RadioModel> {
        Self::all().find(|m| m.info().name.eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn behavior(self) -> RadioBehavior {
        self.info().behavior
    }

    /// Formatter/parser for this model
    pub fn command_set(self) -> Box<dyn CommandSet> {
        let info = self.info();
        match self {
            RadioModel::Ic735 => Box::new(Ic735CommandSet::new(info.behavior, info.response_layout)),
            _ => Box::new(StandardCommandSet::new(info.behavior, info.response_layout)),
        }
    }
}

impl std::fmt::Display for RadioModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn lookup_by_address() {
        assert_eq!(RadioModel::by_civ_address(0x94), Some(RadioModel::Ic7300));
        assert_eq!(RadioModel::by_civ_address(0xA4), Some(RadioModel::Ic705));
        assert_eq!(RadioModel::by_civ_address(0x01), None);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(RadioModel::by_name("ic-7610"), Some(RadioModel::Ic7610));
        assert_eq!(RadioModel::by_name("IC-R8600"), Some(RadioModel::IcR8600));
        assert_eq!(RadioModel::by_name("TS-590"), None);
    }

    #[test]
    fn addresses_are_unique() {
        let addresses: HashSet<u8> = RadioModel::all().map(|m| m.info().default_address).collect();
        assert_eq!(addresses.len(), RadioModel::all().count());
    }

    #[test]
    fn every_model_listed_once() {
        let models: HashSet<RadioModel> = RadioModel::all().collect();
        assert_eq!(models.len(), ALL_MODELS.len());
        assert_eq!(models.len(), 15);
    }

    #[test]
    fn echoing_models() {
        let echoing: Vec<&str> = RadioModel::all()
            .filter(|m| m.behavior().echoes_commands)
            .map(|m| m.name())
            .collect();
        assert!(echoing.contains(&"IC-735"));
        assert!(echoing.contains(&"IC-7000"));
        assert!(!echoing.contains(&"IC-7300"));
    }

    #[test]
    fn ic735_outlier() {
        let info = RadioModel::Ic735.info();
        assert!(!info.behavior.requires_mode_filter_byte);
        assert_eq!(info.response_layout, ResponseLayout::SubCommandOmitted);
        assert_eq!(info.frequency_bytes, 4);
        assert_eq!(
            RadioModel::Ic735
                .command_set()
                .format_set_frequency(7_040_000)
                .payload
                .len(),
            4
        );
    }

    #[test]
    fn frequency_width_matches_command_set() {
        for model in RadioModel::all() {
            let command = model.command_set().format_set_frequency(14_074_000);
            assert_eq!(command.payload.len(), model.info().frequency_bytes, "{}", model);
        }
    }

    #[test]
    fn receiver_has_no_vfo_selection_or_power() {
        let info = RadioModel::IcR8600.info();
        assert_eq!(info.behavior.vfo_model, VfoModel::None);
        assert_eq!(info.max_power_watts, None);
    }

    #[test]
    fn display_uses_front_panel_name() {
        assert_eq!(RadioModel::Ic756Pro.to_string(), "IC-756PRO");
    }
}
