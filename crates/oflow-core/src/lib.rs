//! # oflow-core: request/reply correlation for the oflow codec
//!
//! The codec in `oflow-proto` is deliberately synchronous and I/O-free.
//! This crate holds the one genuine concurrency primitive a controller or
//! switch implementation needs on top of it: the single-assignment
//! [`MessageFuture`] that connects a request (by transaction id) to the
//! reply some other thread will eventually decode.
//!
//! The intended shape: the sender seals a request, creates a future for
//! it, and hands the future to whoever needs the answer; the connection's
//! inbound reader later parses a frame, looks up the pending future by
//! xid, and satisfies it. Waiters block (bounded or unbounded) or register
//! listeners - whichever fits the calling code.

pub mod error;
pub mod future;

pub use error::{CoreError, Result};
pub use future::{Disposition, MessageFuture, Outcome};
