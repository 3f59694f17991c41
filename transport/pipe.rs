// Pipe / FIFO transport implementation
use crate::readiness;
use crate::traits::Transport;
use dmstream_core::{Interest, TransportKind};
use std::fs::File;
use std::io::{Read, Result, Write};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::time::Duration;

// POLLOUT on a pipe guarantees room for PIPE_BUF bytes, so a write of at
// most that size returns without blocking.
const MAX_PIPE_WRITE: usize = libc::PIPE_BUF;

/// One end of a pipe or FIFO.
///
/// Pipe writes have no per-call `MSG_NOSIGNAL`: writing after the reader
/// has gone raises `SIGPIPE`, so the host must ignore that signal (Rust
/// binaries do by default) to see `BrokenPipe` instead.
pub struct PipeTransport {
    file: File,
}

impl PipeTransport {
    pub fn new(fd: OwnedFd) -> Self {
        PipeTransport {
            file: File::from(fd),
        }
    }

    /// Anonymous pipe: returns `(reader, writer)`.
    pub fn pair() -> Result<(Self, Self)> {
        let (read_end, write_end) = nix::unistd::pipe()?;
        Ok((PipeTransport::new(read_end), PipeTransport::new(write_end)))
    }
}

impl AsFd for PipeTransport {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Transport for PipeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Pipe
    }

    fn check_open(&self) -> Result<()> {
        readiness::ensure_blocking(self.as_fd())
    }

    fn poll_ready(&self, interest: Interest, timeout: Duration) -> Result<bool> {
        readiness::wait(self.as_fd(), interest, timeout)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file.read(buf)
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        let len = data.len().min(MAX_PIPE_WRITE);
        self.file.write(&data[..len])
    }

    fn close(self: Box<Self>) -> Result<()> {
        readiness::close_fd(OwnedFd::from(self.file))
    }
}
