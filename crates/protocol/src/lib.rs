//! Wire types for the privileged helper bridge.
//!
//! This crate contains the serde-serializable types exchanged with the
//! elevated helper over the loopback channel. These types represent the
//! "protocol layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and framing arithmetic
//! * 1:1 with protocol: Match what the helper reads and writes
//! * Stable: Changes only when [`PROTOCOL_VERSION`] changes
//!
//! Socket handling, retries and session lifecycle are built on top of these
//! types in `privbridge`.

pub mod envelope;
pub mod frame;
pub mod handshake;

pub use envelope::*;
pub use frame::*;
pub use handshake::*;
