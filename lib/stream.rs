// Stream: exact-length reads, fully flushed writes and a one-shot close
// over a single exclusively owned transport.
use dmstream_core::{events, Interest, Result, StreamConfig, StreamError, TransportKind, WriteMode};
use dmstream_transport::{adopt, Transport};
use std::fmt;
use std::io;
use std::os::fd::OwnedFd;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

// Largest single receive; the result buffer grows as bytes arrive.
const READ_CHUNK: usize = 64 * 1024;

/// Byte stream over one transport handle.
///
/// The handle is `Some` exactly while the stream is open; `close` takes it
/// out, so a closed stream can never reach the transport again. A stream is
/// driven by one owner at a time (`&mut self` everywhere) and every call
/// blocks for at most the bounds in its [`StreamConfig`].
pub struct Stream {
    handle: Option<Box<dyn Transport>>,
    kind: TransportKind,
    config: StreamConfig,
}

impl Stream {
    /// Wrap an open transport using [`StreamConfig::global`].
    pub fn new<T: Transport + 'static>(transport: T) -> Result<Self> {
        Self::with_config(transport, StreamConfig::global().clone())
    }

    pub fn with_config<T: Transport + 'static>(transport: T, config: StreamConfig) -> Result<Self> {
        Self::from_boxed(Box::new(transport), config)
    }

    /// Fails with `InvalidArgument` when the transport does not pass its
    /// capability check.
    pub fn from_boxed(transport: Box<dyn Transport>, config: StreamConfig) -> Result<Self> {
        transport
            .check_open()
            .map_err(|e| StreamError::InvalidArgument(format!("not an open transport handle: {}", e)))?;

        let kind = transport.kind();
        debug!(event = events::STREAM_OPEN, kind = %kind, "stream opened");

        Ok(Stream {
            handle: Some(transport),
            kind,
            config,
        })
    }

    /// Take ownership of a raw descriptor of any supported kind.
    pub fn adopt(fd: OwnedFd) -> Result<Self> {
        let transport = adopt(fd)
            .map_err(|e| StreamError::InvalidArgument(format!("not a transport handle: {}", e)))?;
        Self::from_boxed(transport, StreamConfig::global().clone())
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Read exactly `length` bytes.
    ///
    /// Each receive is preceded by a readiness wait of `poll_timeout`; a wait
    /// that expires fails with `TimedOut`. The whole call is bounded by
    /// `read_deadline`, reported as `ReadTimeout` with the byte count so far.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Err(StreamError::InvalidArgument(
                "read length must be greater than zero".to_string(),
            ));
        }
        let config = &self.config;
        let transport = self.handle.as_mut().ok_or(StreamError::NotReadable)?;

        // No deadline when the configured bound does not fit in an Instant.
        let deadline = Instant::now().checked_add(config.read_deadline);
        let mut buf = Vec::with_capacity(length.min(READ_CHUNK));
        let mut scratch = vec![0u8; length.min(READ_CHUNK)];

        while buf.len() < length {
            let received = buf.len();
            let window = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(StreamError::ReadTimeout { received, length });
                    }
                    // The last window before the deadline is clipped to it.
                    config.poll_timeout.min(remaining)
                }
                None => config.poll_timeout,
            };

            match transport.poll_ready(Interest::Readable, window) {
                Ok(true) => {}
                Ok(false) if window < config.poll_timeout => {
                    return Err(StreamError::ReadTimeout { received, length });
                }
                Ok(false) => return Err(StreamError::TimedOut(Interest::Readable)),
                Err(e) => return Err(StreamError::SelectFailed(e)),
            }

            let want = (length - received).min(scratch.len());
            match transport.receive(&mut scratch[..want]) {
                Ok(0) => {
                    debug!(event = events::PEER_CLOSED, kind = %self.kind, received, length, "end of stream");
                    return Err(StreamError::ConnectionClosed);
                }
                Ok(n) => {
                    buf.extend_from_slice(&scratch[..n]);
                    if buf.len() < length {
                        trace!(event = events::READ_PARTIAL, received = buf.len(), length);
                    }
                }
                Err(e) if retry_now(&e) => continue,
                Err(e) if peer_gone(&e) => {
                    debug!(event = events::PEER_CLOSED, kind = %self.kind, received, length, error = %e, "receive failed");
                    return Err(StreamError::ConnectionClosed);
                }
                Err(e) => return Err(StreamError::ReadFailed(e)),
            }
        }

        trace!(event = events::STREAM_READ, kind = %self.kind, length);
        Ok(buf)
    }

    /// Write the first `length` bytes of `data` (all of it when `None`).
    ///
    /// Success always returns exactly the requested length.
    pub fn write(&mut self, data: &[u8], length: Option<usize>) -> Result<usize> {
        let mode = self.config.write_mode.resolve(self.kind);
        let config = &self.config;
        let transport = self.handle.as_mut().ok_or(StreamError::NotWritable)?;

        let total = length.unwrap_or(data.len());
        if total > data.len() {
            return Err(StreamError::InvalidArgument(format!(
                "write length {} exceeds buffer of {} bytes",
                total,
                data.len()
            )));
        }
        if total == 0 {
            return Ok(0);
        }
        let data = &data[..total];

        let written = match mode {
            WriteMode::Single => write_once(transport.as_mut(), data, config.poll_timeout)?,
            WriteMode::Retry | WriteMode::Auto => write_retrying(transport.as_mut(), data, config)?,
        };

        trace!(event = events::STREAM_WRITE, kind = %self.kind, length = written);
        Ok(written)
    }

    /// Release the handle. Closing a closed stream is a no-op.
    ///
    /// The stream is closed after this call whether or not the OS reported
    /// an error.
    pub fn close(&mut self) -> Result<()> {
        let Some(transport) = self.handle.take() else {
            return Ok(());
        };

        match transport.close() {
            Ok(()) => {
                debug!(event = events::STREAM_CLOSE, kind = %self.kind, "stream closed");
                Ok(())
            }
            Err(e) => {
                debug!(event = events::STREAM_CLOSE, kind = %self.kind, error = %e, "close failed");
                Err(StreamError::CloseFailed(e))
            }
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("kind", &self.kind)
            .field("closed", &self.is_closed())
            .field("config", &self.config)
            .finish()
    }
}

fn wait_writable(transport: &dyn Transport, window: Duration) -> Result<()> {
    match transport.poll_ready(Interest::Writable, window) {
        Ok(true) => Ok(()),
        Ok(false) => Err(StreamError::TimedOut(Interest::Writable)),
        Err(e) => Err(StreamError::SelectFailed(e)),
    }
}

// Only consecutive zero-byte writes count against the stall budget.
fn write_retrying(transport: &mut dyn Transport, data: &[u8], config: &StreamConfig) -> Result<usize> {
    let total = data.len();
    let mut written = 0;
    let mut stalls = 0u32;
    let mut attempt = 0u32;

    while written < total {
        attempt += 1;
        wait_writable(transport, config.poll_timeout)?;

        match transport.send(&data[written..]) {
            Ok(0) => {}
            Ok(n) => {
                written += n;
                stalls = 0;
                if written < total {
                    trace!(event = events::WRITE_PARTIAL, written, total, attempt);
                }
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(StreamError::WriteFailed { attempt, source: e }),
        }

        stalls += 1;
        debug!(event = events::WRITE_STALL, attempt, stalls, written, total, "zero-byte write");
        if stalls >= config.max_write_stalls {
            return Err(StreamError::PartialWrite { written, total });
        }
        thread::sleep(config.stall_backoff);
    }

    Ok(total)
}

fn write_once(transport: &mut dyn Transport, data: &[u8], window: Duration) -> Result<usize> {
    wait_writable(transport, window)?;
    match transport.send(data) {
        Ok(n) if n == data.len() => Ok(n),
        Ok(n) => Err(StreamError::PartialWrite {
            written: n,
            total: data.len(),
        }),
        Err(e) => Err(StreamError::WriteFailed { attempt: 1, source: e }),
    }
}

fn retry_now(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}

fn peer_gone(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}
