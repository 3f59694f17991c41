// TCP transport implementation
use crate::readiness;
use crate::traits::Transport;
use dmstream_core::{Interest, TransportKind};
use std::io::Result;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::time::Duration;

pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Wrap an already-connected stream.
    pub fn new(stream: TcpStream) -> Self {
        TcpTransport { stream }
    }

    pub fn connect<A: ToSocketAddrs>(address: A) -> Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport { stream })
    }

    pub fn connect_timeout(address: &SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(address, timeout)?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport { stream })
    }

    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

impl AsFd for TcpTransport {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::TcpSocket
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
