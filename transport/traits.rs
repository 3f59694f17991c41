// Transport abstraction - one open byte-stream handle the stream can drive
use dmstream_core::{Interest, TransportKind};
use std::io::Result;
use std::time::Duration;

pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Capability check: fails unless the handle is an open byte-stream
    /// resource. Leaves the handle in blocking mode.
    fn check_open(&self) -> Result<()>;

    /// Wait until `interest` is ready. `Ok(false)` means the window elapsed.
    fn poll_ready(&self, interest: Interest, timeout: Duration) -> Result<bool>;

    /// One bounded receive. `Ok(0)` is end-of-stream.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// One bounded send. May accept fewer bytes than offered.
    fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Release the handle, reporting what the OS says about it.
    fn close(self: Box<Self>) -> Result<()>;
}
