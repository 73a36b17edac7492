//! Bridge sessions.
//!
//! A [`Session`] connects one [`Master`] (the remote terminal client) to one
//! [`Slave`] (a process on a pseudo-terminal) and runs until either side
//! goes away.

pub mod endpoint;
mod engine;
pub mod options;
pub mod pty;

pub use endpoint::{IoFuture, Master, Slave};
pub use engine::Session;
pub use options::{SessionOption, SessionOptions, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
pub use pty::{PtyCommand, PtyError, PtySlave};
