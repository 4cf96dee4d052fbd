//! Device layer for the Targa USB VFD (vendor 0x19C2, product 0x6A11).
//!
//! Three pieces stack up here:
//!
//! - [`proto`]: the escape/opcode byte protocol and icon indices.
//! - [`Transport`]: a FIFO command queue flushed to the device in 63-byte
//!   chunks, each physical write prefixed by its own length byte.
//! - [`Display`]: the façade composing framebuffer, backing store, font and
//!   transport; it transmits only the columns that changed since the last
//!   flush.
//!
//! The physical interface sits behind the [`VfdLink`] trait so the whole
//! layer runs against [`testing::CaptureLink`] in tests and headless
//! emulation, mirroring how the HID device behaves.

mod display;
mod link;
pub mod proto;
pub mod testing;
mod transport;

pub use display::{Display, DisplayError, DisplayOptions, TextFit};
pub use link::{HidLink, LinkError, VfdLink, PRODUCT_ID, VENDOR_ID};
pub use transport::{Transport, CHUNK_PAYLOAD};
