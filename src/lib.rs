//! Decoder for the hex-encoded Buoyancy Interchange Transmission
//! System packet format: a bit-level cursor over hex text, a recursive
//! decoder producing a typed packet tree, and the version-sum and
//! evaluation traversals over that tree.

pub mod bitstream;
pub mod error;
pub mod packet;
