//! Byte-level transport abstraction for the Zephyr serial link.
//!
//! The framing layer never blocks on the link. It polls a [`ByteSource`]
//! (peek / read one / available / flush) and writes to a [`ByteSink`].
//!
//! Two sources ship with this crate:
//! - [`MemorySource`] for tests, simulators and replayed captures
//! - [`IoSource`] for anything implementing [`std::io::Read`] (serial
//!   devices, files, pipes)
//!
//! Every [`std::io::Write`] is a [`ByteSink`].

pub mod error;
pub mod io;
pub mod memory;
pub mod traits;

pub use error::{Result, TransportError};
pub use io::IoSource;
pub use memory::MemorySource;
pub use traits::{ByteSink, ByteSource};
