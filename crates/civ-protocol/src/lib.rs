//! CI-V Protocol Library
//!
//! This crate provides the synchronous codecs for the Icom CI-V protocol:
//!
//! - **BCD**: frequency, level and signed-offset digit packing
//! - **Frames**: `FE FE <to> <from> <cmd> [sub] <data> FD` encoding, parsing
//!   and a streaming splitter
//! - **Behavior**: the small set of axes (VFO model, filter byte, echo,
//!   power units) that classifies a transceiver
//! - **Command sets**: one generic formatter/parser driven by the behavior
//!   descriptor, with narrow per-model overrides
//! - **Memory channels**: the fixed-layout record carried by `1A 00`
//! - **Models**: static per-model data keyed by [`RadioModel`]
//!
//! Nothing here performs I/O. The `civ-engine` crate drives these codecs
//! over a serial link.
//!
//! # Example
//!
//! ```rust
//! use civ_protocol::{CommandSet, Frame, RadioModel, CONTROLLER_ADDR};
//!
//! let model = RadioModel::Ic7300;
//! let commands = model.command_set();
//!
//! let request = commands.format_set_frequency(14_230_000);
//! let bytes = Frame::new(model.info().default_address, CONTROLLER_ADDR, &request).to_bytes();
//! assert_eq!(
//!     bytes,
//!     [0xFE, 0xFE, 0x94, 0xE0, 0x05, 0x00, 0x00, 0x23, 0x14, 0x00, 0xFD]
//! );
//!
//! let reply = Frame::parse(&[0xFE, 0xFE, 0xE0, 0x94, 0xFB, 0xFD]).unwrap();
//! assert!(reply.is_ack());
//! ```

pub mod bcd;
pub mod behavior;
pub mod command;
pub mod error;
pub mod formatter;
pub mod frame;
pub mod memory;
pub mod models;

pub use behavior::{PowerUnits, RadioBehavior, ResponseLayout, VfoModel};
pub use command::{Command, Mode, SignalStrength, VfoRef};
pub use error::ParseError;
pub use formatter::{CommandSet, Ic735CommandSet, StandardCommandSet};
pub use frame::{Frame, FrameBuffer, ACK, CONTROLLER_ADDR, NAK, PREAMBLE, TERMINATOR};
pub use memory::MemoryChannel;
pub use models::{RadioModel, RadioModelInfo};
