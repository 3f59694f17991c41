// File / character-device transport implementation
use crate::readiness;
use crate::traits::Transport;
use dmstream_core::{Interest, TransportKind};
use std::fs::{File, OpenOptions};
use std::io::{Read, Result, Write};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::Path;
use std::time::Duration;

pub struct FileTransport {
    file: File,
}

impl FileTransport {
    pub fn new(file: File) -> Self {
        FileTransport { file }
    }

    /// Open a device node or file for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(FileTransport { file })
    }
}

impl AsFd for FileTransport {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Transport for FileTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::File
    }

    fn check_open(&self) -> Result<()> {
        readiness::ensure_blocking(self.as_fd())
    }

    // Regular files always poll ready; character devices honour it.
    fn poll_ready(&self, interest: Interest, timeout: Duration) -> Result<bool> {
        readiness::wait(self.as_fd(), interest, timeout)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file.read(buf)
    }

    fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.file.write(data)
    }

    fn close(self: Box<Self>) -> Result<()> {
        readiness::close_fd(OwnedFd::from(self.file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, SeekFrom};

    #[test]
    fn regular_file_is_always_ready() {
        let file = tempfile::tempfile().unwrap();
        let t = FileTransport::new(file);
        t.check_open().unwrap();
        assert!(t.poll_ready(Interest::Readable, Duration::ZERO).unwrap());
        assert!(t.poll_ready(Interest::Writable, Duration::ZERO).unwrap());
    }

    #[test]
    fn write_then_read_back() {
        let mut file = tempfile::tempfile().unwrap();
        let mut t = FileTransport::new(file.try_clone().unwrap());

        assert_eq!(t.send(b"device state").unwrap(), 12);
        file.seek(SeekFrom::Start(0)).unwrap();

        let mut buf = [0u8; 32];
        let n = t.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"device state");
        // shared offset now at end of file
        assert_eq!(t.receive(&mut buf).unwrap(), 0);
    }
}
