// Classify an arbitrary descriptor and wrap it in the matching transport
use crate::file::FileTransport;
use crate::pipe::PipeTransport;
use crate::readiness;
use crate::tcp::TcpTransport;
use crate::traits::Transport;
use crate::unix::UnixSocketTransport;
use nix::sys::socket::{getsockname, AddressFamily, SockaddrLike, SockaddrStorage};
use std::fs::File;
use std::io::{Error, ErrorKind, Result};
use std::net::TcpStream;
use std::os::fd::{AsFd, AsRawFd, OwnedFd};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use tracing::debug;

/// Take ownership of `fd` and return the transport matching what it is.
///
/// Stream sockets (TCP or Unix), FIFOs, regular files and character devices
/// are accepted. Anything else is rejected with `InvalidInput` and the
/// descriptor is dropped.
pub fn adopt(fd: OwnedFd) -> Result<Box<dyn Transport>> {
    let file = File::from(fd);
    let file_type = file.metadata()?.file_type();

    if file_type.is_socket() {
        let fd = OwnedFd::from(file);
        readiness::check_stream_socket(fd.as_fd())?;
        let addr: SockaddrStorage = getsockname(fd.as_raw_fd())?;
        return match addr.family() {
            Some(AddressFamily::Unix) => {
                debug!(fd = fd.as_raw_fd(), kind = "unix", "adopted descriptor");
                Ok(Box::new(UnixSocketTransport::new(UnixStream::from(fd))))
            }
            Some(AddressFamily::Inet) | Some(AddressFamily::Inet6) => {
                debug!(fd = fd.as_raw_fd(), kind = "tcp", "adopted descriptor");
                Ok(Box::new(TcpTransport::new(TcpStream::from(fd))))
            }
            other => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unsupported socket family {:?}", other),
            )),
        };
    }

    if file_type.is_fifo() {
        debug!(fd = file.as_raw_fd(), kind = "pipe", "adopted descriptor");
        return Ok(Box::new(PipeTransport::new(OwnedFd::from(file))));
    }

    if file_type.is_file() || file_type.is_char_device() {
        debug!(fd = file.as_raw_fd(), kind = "file", "adopted descriptor");
        return Ok(Box::new(FileTransport::new(file)));
    }

    Err(Error::new(
        ErrorKind::InvalidInput,
        "descriptor is not a socket, pipe or file",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmstream_core::TransportKind;
    use std::net::{TcpListener, UdpSocket};

    #[test]
    fn recognises_every_supported_kind() {
        let (r, _w) = nix::unistd::pipe().unwrap();
        assert_eq!(adopt(r).unwrap().kind(), TransportKind::Pipe);

        let (a, _b) = UnixStream::pair().unwrap();
        assert_eq!(adopt(OwnedFd::from(a)).unwrap().kind(), TransportKind::UnixSocket);

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        assert_eq!(adopt(OwnedFd::from(client)).unwrap().kind(), TransportKind::TcpSocket);

        let file = tempfile::tempfile().unwrap();
        assert_eq!(adopt(OwnedFd::from(file)).unwrap().kind(), TransportKind::File);
    }

    #[test]
    fn rejects_datagram_socket() {
        let udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        let err = adopt(OwnedFd::from(udp)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let handle = File::open(dir.path()).unwrap();
        let err = adopt(OwnedFd::from(handle)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
