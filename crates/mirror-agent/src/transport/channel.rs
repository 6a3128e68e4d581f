//! Socket abstraction used by the session controller.
//!
//! The controller needs a little more than `Read + Write`: a receive timeout
//! so the loop can wake up to send notifications, and a way to wait until the
//! socket accepts more data after a short write.  [`ControlChannel`] bundles
//! these for Unix-domain and TCP streams.

use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

/// Send timeout installed on control sockets.  A blocked write returns
/// `WouldBlock` after this long and the socket writer takes over waiting.
pub const SEND_TIMEOUT_SLICE: Duration = Duration::from_millis(50);

/// Readiness wait for a writable socket.
pub trait WaitWritable {
    /// Blocks until the socket accepts more data or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout.  An interrupted wait reports `Ok(true)`
    /// so that the caller simply retries the write.
    fn wait_writable(&self, timeout: Duration) -> io::Result<bool>;
}

pub trait ControlChannel: Read + Write + WaitWritable + Send + Sized {
    /// `None` blocks reads indefinitely.
    fn set_receive_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    fn set_send_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Returns a second handle to the same socket, used as the read half.
    fn try_clone_channel(&self) -> io::Result<Self>;

    /// Shuts down both directions, waking any blocked reader.
    fn shutdown_channel(&self) -> io::Result<()>;
}

#[cfg(unix)]
fn poll_writable(fd: std::os::unix::io::RawFd, timeout: Duration) -> io::Result<bool> {
    use nix::errno::Errno;
    use nix::poll::{poll, PollFd, PollFlags};

    let mut fds = [PollFd::new(fd, PollFlags::POLLOUT)];
    let timeout_millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    match poll(&mut fds, timeout_millis) {
        Ok(0) => Ok(false),
        Ok(_) => Ok(true),
        Err(Errno::EINTR) => Ok(true),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

#[cfg(not(unix))]
fn poll_writable_fallback(timeout: Duration) -> io::Result<bool> {
    // Without poll(2) the send timeout already waited; pause briefly and retry.
    std::thread::sleep(timeout.min(Duration::from_millis(10)));
    Ok(true)
}

// ── Unix-domain sockets ───────────────────────────────────────────────────────

#[cfg(unix)]
impl WaitWritable for UnixStream {
    fn wait_writable(&self, timeout: Duration) -> io::Result<bool> {
        use std::os::unix::io::AsRawFd;
        poll_writable(self.as_raw_fd(), timeout)
    }
}

#[cfg(unix)]
impl ControlChannel for UnixStream {
    fn set_receive_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }

    fn set_send_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_write_timeout(timeout)
    }

    fn try_clone_channel(&self) -> io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_channel(&self) -> io::Result<()> {
        self.shutdown(std::net::Shutdown::Both)
    }
}

// ── TCP sockets ───────────────────────────────────────────────────────────────

impl WaitWritable for TcpStream {
    #[cfg(unix)]
    fn wait_writable(&self, timeout: Duration) -> io::Result<bool> {
        use std::os::unix::io::AsRawFd;
        poll_writable(self.as_raw_fd(), timeout)
    }

    #[cfg(not(unix))]
    fn wait_writable(&self, timeout: Duration) -> io::Result<bool> {
        poll_writable_fallback(timeout)
    }
}

impl ControlChannel for TcpStream {
    fn set_receive_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }

    fn set_send_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_write_timeout(timeout)
    }

    fn try_clone_channel(&self) -> io::Result<Self> {
        self.try_clone()
    }

    fn shutdown_channel(&self) -> io::Result<()> {
        self.shutdown(std::net::Shutdown::Both)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_socket_is_writable() {
        let (a, _b) = UnixStream::pair().unwrap();
        assert!(a.wait_writable(Duration::from_millis(100)).unwrap());
    }

    #[test]
    fn test_full_socket_times_out() {
        // Arrange: fill the send buffer without a reader.
        let (mut a, _b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();
        let chunk = [0u8; 4096];
        loop {
            match a.write(&chunk) {
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        // Act / Assert
        assert!(!a.wait_writable(Duration::from_millis(20)).unwrap());
    }

    #[test]
    fn test_receive_timeout_surfaces_as_would_block() {
        let (mut a, _b) = UnixStream::pair().unwrap();
        a.set_receive_timeout(Some(Duration::from_millis(10))).unwrap();

        let err = a.read(&mut [0u8; 1]).unwrap_err();

        assert!(matches!(
            err.kind(),
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
        ));
    }
}
