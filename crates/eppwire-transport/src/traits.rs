use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

/// A connected byte stream whose blocking operations can be bounded.
///
/// This is the only capability the framer needs from a transport: blocking
/// `Read + Write`, per-direction timeouts, and a way to tear the stream down.
/// Timeouts are re-applied by the framer before every blocking call, so an
/// implementation only has to honor the most recent value.
///
/// `None` disables the timeout. Implementations may reject `Some(Duration::ZERO)`
/// (the standard library does); callers must never pass it.
pub trait DeadlineStream: Read + Write {
    /// Bound subsequent blocking reads.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Bound subsequent blocking writes.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Close the stream in both directions.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl DeadlineStream for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_write_timeout(self, timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

#[cfg(unix)]
impl DeadlineStream for std::os::unix::net::UnixStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        std::os::unix::net::UnixStream::set_write_timeout(self, timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        std::os::unix::net::UnixStream::shutdown(self, Shutdown::Both)
    }
}

impl<T: DeadlineStream + ?Sized> DeadlineStream for Box<T> {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_write_timeout(timeout)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        (**self).shutdown()
    }
}
