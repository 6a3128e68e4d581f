//! Reliable socket writer.
//!
//! Writes a message split into two buffers (typically a header and a payload)
//! as one logical unit.  Partial writes resume from the exact byte offset
//! already delivered, so no byte is ever sent twice and the peer's framing
//! stays intact.  When the socket stops accepting data the writer waits for
//! writability, but never longer than the caller's total time budget.

use std::io::{self, IoSlice, Write};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use crate::transport::channel::WaitWritable;

/// Outcome of a [`SocketWriter::write`] call that did not hit a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteResult {
    Success,
    /// Every byte was delivered, but the socket blocked at least once.
    SuccessAfterBlocking,
    /// The time budget ran out before every byte was delivered.
    Timeout,
    /// The peer closed the connection.
    Disconnected,
}

/// Fatal transport errors.  The process cannot recover from these.
#[derive(Debug, Error)]
pub enum SocketWriteError {
    #[error("error writing to {socket} socket: {source}")]
    Io {
        socket: String,
        #[source]
        source: io::Error,
    },

    #[error("error waiting for {socket} socket to start accepting data: {source}")]
    Poll {
        socket: String,
        #[source]
        source: io::Error,
    },

    #[error("no progress writing to {socket} socket")]
    NoProgress { socket: String },
}

/// Stands in for budgets too large to represent as an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub struct SocketWriter<W> {
    inner: W,
    socket_name: String,
}

impl<W: Write + WaitWritable> SocketWriter<W> {
    pub fn new(inner: W, socket_name: impl Into<String>) -> Self {
        Self {
            inner,
            socket_name: socket_name.into(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Writes `buf1` followed by `buf2` within `timeout`.
    ///
    /// The budget covers time spent blocked inside the socket write as well
    /// as time spent waiting for writability.
    ///
    /// # Errors
    ///
    /// Returns [`SocketWriteError`] for OS errors other than a disconnect, for
    /// a failed readiness wait, and for a write that accepts zero bytes.
    pub fn write(
        &mut self,
        buf1: &[u8],
        buf2: &[u8],
        timeout: Duration,
    ) -> Result<WriteResult, SocketWriteError> {
        let mut first = buf1;
        let mut second = buf2;
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut was_blocked = false;

        loop {
            if first.is_empty() {
                first = std::mem::take(&mut second);
            }
            if first.is_empty() {
                return Ok(if was_blocked {
                    WriteResult::SuccessAfterBlocking
                } else {
                    WriteResult::Success
                });
            }

            let written = if second.is_empty() {
                self.inner.write(first)
            } else {
                self.inner
                    .write_vectored(&[IoSlice::new(first), IoSlice::new(second)])
            };

            match written {
                Ok(0) => {
                    return Err(SocketWriteError::NoProgress {
                        socket: self.socket_name.clone(),
                    })
                }
                Ok(n) => {
                    if n < first.len() {
                        first = &first[n..];
                    } else {
                        let into_second = n - first.len();
                        first = &second[into_second..];
                        second = &[];
                    }
                    if !(first.is_empty() && second.is_empty()) && Instant::now() >= deadline {
                        debug!("{} socket write budget exhausted", self.socket_name);
                        return Ok(WriteResult::Timeout);
                    }
                }
                Err(e) if is_disconnect(&e) => {
                    debug!("{} socket disconnected: {e}", self.socket_name);
                    return Ok(WriteResult::Disconnected);
                }
                Err(e) if is_transient(&e) => {
                    warn!("writing to {} socket failed - {e}", self.socket_name);
                    was_blocked = true;
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(WriteResult::Timeout);
                    }
                    let writable = self.inner.wait_writable(remaining).map_err(|source| {
                        SocketWriteError::Poll {
                            socket: self.socket_name.clone(),
                            source,
                        }
                    })?;
                    if !writable {
                        return Ok(WriteResult::Timeout);
                    }
                    if Instant::now() >= deadline {
                        return Ok(WriteResult::Timeout);
                    }
                    debug!("retrying writing to {} socket", self.socket_name);
                }
                Err(source) => {
                    return Err(SocketWriteError::Io {
                        socket: self.socket_name.clone(),
                        source,
                    })
                }
            }
        }
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    ) {
        return true;
    }
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(nix::errno::Errno::EBADF as i32)
    }
    #[cfg(not(unix))]
    {
        false
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
