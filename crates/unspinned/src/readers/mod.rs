//! Stream plumbing shared by the response decoder.
//!
//! [`Lookahead`] peeks arbitrarily far into a byte source one character at a
//! time. [`Concat`] glues byte streams back together, which is how bytes that
//! were buffered somewhere else get put back in front of a live socket.

mod concat;
mod lookahead;

pub use concat::Concat;
pub use lookahead::Lookahead;
