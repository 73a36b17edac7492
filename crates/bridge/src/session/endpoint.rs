//! The two byte-stream endpoints a session bridges.
//!
//! Both traits take `&self` so one endpoint can be read by one pump while the
//! other pump writes to it. Implementations synchronize internally.

use std::future::Future;
use std::io;
use std::pin::Pin;

/// Boxed future returned by endpoint methods.
pub type IoFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// The remote terminal client speaking the framed protocol.
pub trait Master: Send + Sync {
    /// Reads one frame into `buf`.
    ///
    /// Each call yields exactly one frame, truncated to `buf.len()`.
    /// `Ok(0)` is a zero-length frame, not end of stream; implementations
    /// report a closed connection as an error.
    fn read<'a>(&'a self, buf: &'a mut [u8]) -> IoFuture<'a, usize>;

    /// Writes one complete frame.
    fn write<'a>(&'a self, frame: &'a [u8]) -> IoFuture<'a, usize>;
}

/// The local process attached to a pseudo-terminal.
pub trait Slave: Send + Sync {
    /// Reads terminal output into `buf`. `Ok(0)` means end of stream.
    fn read<'a>(&'a self, buf: &'a mut [u8]) -> IoFuture<'a, usize>;

    /// Writes all of `data` to the terminal input.
    fn write<'a>(&'a self, data: &'a [u8]) -> IoFuture<'a, usize>;

    /// Changes the terminal window size.
    fn resize<'a>(&'a self, columns: u16, rows: u16) -> IoFuture<'a, ()>;
}
