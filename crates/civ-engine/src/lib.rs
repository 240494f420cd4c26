//! CI-V Protocol Engine
//!
//! Drives an Icom-style transceiver over a half-duplex CI-V link. The
//! engine composes frames with a [`CommandSet`](civ_protocol::CommandSet),
//! writes them to a [`Transport`], waits for the reply (absorbing the echo
//! on radios that loop commands back) and decodes it.
//!
//! # Example
//!
//! ```rust,no_run
//! use civ_engine::{CivEngine, EngineConfig, SerialConfig};
//! use civ_protocol::{Mode, RadioModel};
//!
//! # async fn example() -> civ_engine::Result<()> {
//! let model = RadioModel::Ic7300;
//! let mut engine = CivEngine::serial(
//!     SerialConfig::for_model("/dev/ttyUSB0", model),
//!     model,
//!     &EngineConfig::default(),
//! );
//!
//! engine.connect().await?;
//! engine.set_frequency(14_074_000).await?;
//! engine.set_mode(Mode::Usb, None).await?;
//! println!("{}", engine.get_s_meter().await?);
//! engine.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod transport;

#[cfg(test)]
mod mock;

pub use config::{EngineConfig, SerialConfig};
pub use engine::{CivEngine, OffsetTuning};
pub use error::{EngineError, Result};
pub use transport::{SerialTransport, StreamTransport, Transport};
