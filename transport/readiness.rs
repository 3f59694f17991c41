// Descriptor-level primitives shared by the fd-backed transports:
// poll(2) readiness with a timeout, blocking-mode enforcement, per-call
// non-blocking socket transfers and close(2) with error reporting.
use dmstream_core::Interest;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::socket::{getsockopt, recv, send, sockopt, MsgFlags, SockType};
use std::io::{Error, ErrorKind, Result};
use std::os::fd::{AsRawFd, BorrowedFd, IntoRawFd, OwnedFd};
use std::time::{Duration, Instant};

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: MsgFlags = MsgFlags::MSG_DONTWAIT.union(MsgFlags::MSG_NOSIGNAL);
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: MsgFlags = MsgFlags::MSG_DONTWAIT;

/// Wait for `interest` on `fd` for at most `timeout`.
///
/// Hang-up and error conditions count as ready so the following transfer
/// observes them. An invalid descriptor is reported as `EBADF`.
pub fn wait(fd: BorrowedFd<'_>, interest: Interest, timeout: Duration) -> Result<bool> {
    let wanted = match interest {
        Interest::Readable => PollFlags::POLLIN,
        Interest::Writable => PollFlags::POLLOUT,
    };
    // A timeout past the range of Instant waits without a deadline.
    let deadline = Instant::now().checked_add(timeout);

    loop {
        let remaining = match deadline {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        };
        let mut fds = [PollFd::new(fd, wanted)];
        match poll(&mut fds, poll_millis(remaining)) {
            Ok(0) => {
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    return Ok(false);
                }
                // poll slices are capped at u16::MAX ms
            }
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or_else(PollFlags::empty);
                if revents.contains(PollFlags::POLLNVAL) {
                    return Err(Error::from(Errno::EBADF));
                }
                return Ok(revents.intersects(wanted | PollFlags::POLLHUP | PollFlags::POLLERR));
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

// Round up so a sub-millisecond remainder does not turn into a busy poll.
fn poll_millis(remaining: Duration) -> u16 {
    remaining.as_micros().div_ceil(1000).min(u16::MAX as u128) as u16
}

/// Fails with `EBADF` unless `fd` refers to an open descriptor, then clears
/// `O_NONBLOCK` so every transport starts from blocking mode.
pub fn ensure_blocking(fd: BorrowedFd<'_>) -> Result<()> {
    let raw = fd.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(raw, FcntlArg::F_GETFL)?);
    if flags.contains(OFlag::O_NONBLOCK) {
        fcntl(raw, FcntlArg::F_SETFL(flags - OFlag::O_NONBLOCK))?;
    }
    Ok(())
}

/// Fails unless `fd` is a connection-oriented byte-stream socket.
pub fn check_stream_socket(fd: BorrowedFd<'_>) -> Result<()> {
    let ty = getsockopt(&fd, sockopt::SockType)?;
    if ty != SockType::Stream {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("socket type {:?} is not a byte stream", ty),
        ));
    }
    Ok(())
}

pub fn socket_send(fd: BorrowedFd<'_>, data: &[u8]) -> Result<usize> {
    Ok(send(fd.as_raw_fd(), data, SEND_FLAGS)?)
}

pub fn socket_recv(fd: BorrowedFd<'_>, buf: &mut [u8]) -> Result<usize> {
    Ok(recv(fd.as_raw_fd(), buf, MsgFlags::MSG_DONTWAIT)?)
}

/// close(2) with the result reported, unlike dropping an `OwnedFd`.
pub fn close_fd(fd: OwnedFd) -> Result<()> {
    Ok(nix::unistd::close(fd.into_raw_fd())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::fd::AsFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn readable_only_after_data_arrives() {
        let (a, mut b) = UnixStream::pair().unwrap();
        assert!(!wait(a.as_fd(), Interest::Readable, Duration::from_millis(20)).unwrap());

        b.write_all(b"x").unwrap();
        assert!(wait(a.as_fd(), Interest::Readable, Duration::from_millis(500)).unwrap());
    }

    #[test]
    fn hangup_counts_as_readable() {
        let (a, b) = UnixStream::pair().unwrap();
        drop(b);
        assert!(wait(a.as_fd(), Interest::Readable, Duration::from_millis(500)).unwrap());
    }

    #[test]
    fn fresh_socket_is_writable() {
        let (a, _b) = UnixStream::pair().unwrap();
        assert!(wait(a.as_fd(), Interest::Writable, Duration::from_millis(500)).unwrap());
    }

    #[test]
    fn blocking_mode_is_restored() {
        let (a, _b) = UnixStream::pair().unwrap();
        a.set_nonblocking(true).unwrap();
        ensure_blocking(a.as_fd()).unwrap();

        let flags = OFlag::from_bits_truncate(fcntl(a.as_raw_fd(), FcntlArg::F_GETFL).unwrap());
        assert!(!flags.contains(OFlag::O_NONBLOCK));
    }

    #[test]
    fn unbounded_timeout_waits_without_deadline() {
        let (a, mut b) = UnixStream::pair().unwrap();
        b.write_all(b"x").unwrap();
        assert!(wait(a.as_fd(), Interest::Readable, Duration::MAX).unwrap());
        assert!(wait(a.as_fd(), Interest::Writable, Duration::MAX).unwrap());
    }

    #[test]
    fn recv_on_empty_socket_would_block() {
        let (a, _b) = UnixStream::pair().unwrap();
        let mut buf = [0u8; 8];
        let err = socket_recv(a.as_fd(), &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn poll_slice_rounds_up() {
        assert_eq!(poll_millis(Duration::from_micros(1)), 1);
        assert_eq!(poll_millis(Duration::ZERO), 0);
        assert_eq!(poll_millis(Duration::from_secs(3600)), u16::MAX);
    }
}
