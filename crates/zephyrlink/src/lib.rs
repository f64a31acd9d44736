//! Zephyr instrument link protocol.
//!
//! Instruments flying on Zephyr gondolas talk to the on-board computer over
//! a serial link using tag-delimited ASCII frames with a 16-bit CRC.
//! Telecommands arrive as `id,param,...;` statements in a binary section.
//!
//! # Crate Structure
//!
//! - [`transport`]: polled byte source and byte sink abstraction
//! - [`frame`]: frame reader, frame writer, CRC and telemetry buffer
//! - [`telecommand`]: schema-driven telecommand decoder

/// Re-export transport types.
pub mod transport {
    pub use zephyrlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use zephyrlink_frame::*;
}

/// Re-export telecommand types.
pub mod telecommand {
    pub use zephyrlink_telecommand::*;
}
