// Unix socket transport implementation
use crate::readiness;
use crate::traits::Transport;
use dmstream_core::{Interest, TransportKind};
use nix::sys::socket::{setsockopt, sockopt};
use std::io::{Error, ErrorKind, Result};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

pub struct UnixSocketTransport {
    stream: UnixStream,
}

impl UnixSocketTransport {
    pub fn new(stream: UnixStream) -> Self {
        UnixSocketTransport { stream }
    }

    pub fn connect<P: AsRef<Path>>(socket_path: P) -> Result<Self> {
        Ok(UnixSocketTransport {
            stream: UnixStream::connect(socket_path)?,
        })
    }

    /// Connected, unnamed socket pair.
    pub fn pair() -> Result<(Self, Self)> {
        let (a, b) = UnixStream::pair()?;
        Ok((UnixSocketTransport::new(a), UnixSocketTransport::new(b)))
    }

    /// Get raw file descriptor for diagnostics
    pub fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    /// Set socket send buffer size (SO_SNDBUF)
    pub fn set_send_buffer_size(&self, size: usize) -> Result<()> {
        setsockopt(&self.stream, sockopt::SndBuf, &size)
            .map_err(|e| Error::new(ErrorKind::Other, e))
    }
}

impl AsFd for UnixSocketTransport {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl Transport for UnixSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::UnixSocket
    }

    fn check_open(&self) -> Result<()> {
        readiness::ensure_blocking(self.as_fd())?;
        readiness::check_stream_socket(self.as_fd())
    }

    fn poll_ready(&self, interest: Interest, timeout: Duration) -> Result<bool> {
        readiness::wait(self.as_fd(), interest, timeout)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        readiness::socket_recv(self.as_fd(), buf)
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        readiness::socket_send(self.as_fd(), data)
    }

    fn close(self: Box<Self>) -> Result<()> {
        readiness::close_fd(OwnedFd::from(self.stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::fcntl::{fcntl, FcntlArg, OFlag};

    #[test]
    fn check_open_clears_nonblocking() {
        let (a, _b) = UnixSocketTransport::pair().unwrap();
        a.stream.set_nonblocking(true).unwrap();
        a.check_open().unwrap();

        let flags = OFlag::from_bits_truncate(fcntl(a.as_raw_fd(), FcntlArg::F_GETFL).unwrap());
        assert!(!flags.contains(OFlag::O_NONBLOCK));
    }

    #[test]
    fn send_does_not_block_on_full_buffer() {
        let (mut a, _b) = UnixSocketTransport::pair().unwrap();
        a.set_send_buffer_size(4096).unwrap();

        let chunk = vec![0xA5u8; 64 * 1024];
        let mut blocked = false;
        for _ in 0..256 {
            match a.send(&chunk) {
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    blocked = true;
                    break;
                }
                Err(e) => panic!("unexpected send error: {e}"),
            }
        }
        assert!(blocked, "peer never drained, send must eventually refuse");
    }

    #[test]
    fn send_to_closed_peer_is_an_error() {
        let (mut a, b) = UnixSocketTransport::pair().unwrap();
        drop(b);
        let err = a.send(b"late").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }
}
