//! A client for TheSkyX's scripting socket.
//!
//! TheSkyX runs JavaScript sent over a plain TCP connection and answers with
//! either a JSON document or a line of English ending in ` Error = <N>.`. In
//! both cases a `|` marks the end of the packet, though not necessarily right
//! after the body. [`read_response`] untangles the two shapes and leaves the
//! connection at the packet boundary; [`Client`] wraps it in typed calls.
//!
//! ```rust
//! use unspinned::{State, read_response};
//!
//! let mut wire: &[u8] = b"That rotator is busy. Error = 214.|{\"Longitude\":0,\"Latitude\":47,\
//!     \"RotatorAngle\":10,\"PointingAt\":{\"Alt\":30,\"Az\":200}}|";
//!
//! let first = read_response::<State, _>(&mut wire).unwrap_err();
//! assert_eq!(first.protocol().unwrap().error_number, Some(214));
//!
//! let second: State = read_response(&mut wire).unwrap();
//! assert_eq!(second.rotator_angle.0, 10.0);
//! assert!(wire.is_empty());
//! ```

mod angle;
mod client;
mod error;
pub mod readers;
mod response;
mod state;

#[cfg(test)]
mod tests;

pub use angle::{Degrees, Radians};
pub use client::{Client, DEFAULT_PORT, GET_STATE_SCRIPT, rotate_script};
pub use error::{Error, ProtocolError, Result};
pub use response::{PACKET_TERMINATOR, read_response, read_response_buffered};
pub use state::{AltAz, State};
