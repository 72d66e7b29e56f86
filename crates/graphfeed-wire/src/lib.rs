//! Wire codec and message catalog for the graphfeed protocol.
//!
//! The protocol is deliberately flat: every integer field is a fixed-width
//! little-endian u64, strings travel as raw bytes with their length in a
//! preceding u64 field, and feature values are 32-bit floats. No padding,
//! no alignment, no self-describing containers.

pub mod batch;
pub mod codec;
pub mod error;
pub mod message;

pub use batch::{EdgeIndex, GraphBatch, NodeFeatures};
pub use codec::{put_byte, put_str, put_u64, put_u64_slice, WireReader};
pub use error::{Result, WireError};
pub use message::{Opcode, StatusCode};
