//! CI-V Radio Simulation Library
//!
//! Simulated Icom transceivers for exercising the protocol engine without
//! hardware. A [`VirtualRadio`] answers CI-V frames with the quirks of the
//! model it emulates (command echo, VFO addressing, filter byte, reply
//! layout) and [`run_virtual_radio_task`] serves it over any async stream.
//!
//! # Example
//!
//! ```rust
//! use civ_protocol::{Command, Frame, RadioModel, CONTROLLER_ADDR};
//! use civ_sim::VirtualRadio;
//!
//! let mut radio = VirtualRadio::new("bench", RadioModel::Ic7300);
//! radio.set_frequency(7_074_000);
//!
//! let read = Frame::new(radio.address(), CONTROLLER_ADDR, &Command::read(0x03, None));
//! for reply in radio.handle_frame(&read) {
//!     println!("Radio output: {:02X?}", reply.to_bytes());
//! }
//! ```

pub mod radio;
pub mod task;

pub use radio::{VirtualRadio, VirtualRadioConfig};
pub use task::{run_virtual_radio_task, VirtualRadioCommand};
