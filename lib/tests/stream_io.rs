//! End-to-end tests over real descriptors: anonymous pipes, Unix socket
//! pairs, TCP loopback and temporary files.

use dmstream::{
    ErrorKind, FileTransport, PipeTransport, Stream, StreamConfig, StreamError, TcpTransport,
    TransportKind, UnixSocketTransport,
};
use std::io::{Read, Seek, SeekFrom};
use std::net::TcpListener;
use std::os::fd::OwnedFd;
use std::thread;
use std::time::Duration;

fn config() -> StreamConfig {
    StreamConfig::default()
        .with_poll_timeout(Duration::from_secs(2))
        .with_read_deadline(Duration::from_secs(10))
        .with_stall_backoff(Duration::from_millis(5))
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

// ============================================================================
// Byte transfer
// ============================================================================

#[test]
fn pipe_pair_delivers_bytes_in_order() {
    let (reader, writer) = PipeTransport::pair().unwrap();
    let mut rx = Stream::with_config(reader, config()).unwrap();
    let mut tx = Stream::with_config(writer, config()).unwrap();
    assert_eq!(rx.kind(), TransportKind::Pipe);

    // Larger than the pipe buffer, so the writer has to wait for the reader.
    let payload = pattern(256 * 1024);
    let expected = payload.clone();
    let writer = thread::spawn(move || {
        let n = tx.write(&payload, None).unwrap();
        tx.close().unwrap();
        n
    });

    let got = rx.read(expected.len()).unwrap();
    assert_eq!(writer.join().unwrap(), expected.len());
    assert_eq!(got, expected);
    rx.close().unwrap();
}

#[test]
fn unix_socket_pair_is_bidirectional() {
    let (a, b) = UnixSocketTransport::pair().unwrap();
    let mut left = Stream::with_config(a, config()).unwrap();
    let mut right = Stream::with_config(b, config()).unwrap();

    let request = pattern(300 * 1024);
    let expected_request = request.clone();
    let peer = thread::spawn(move || {
        let got = right.read(expected_request.len()).unwrap();
        assert_eq!(got, expected_request);
        right.write(b"ack", None).unwrap();
        right.close().unwrap();
    });

    assert_eq!(left.write(&request, None).unwrap(), request.len());
    assert_eq!(left.read(3).unwrap(), b"ack");
    peer.join().unwrap();
    left.close().unwrap();
}

#[test]
fn tcp_loopback_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (socket, _) = listener.accept().unwrap();
        let mut s = Stream::with_config(TcpTransport::new(socket), config()).unwrap();
        let header = s.read(4).unwrap();
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let body = s.read(len).unwrap();
        s.write(&body, None).unwrap();
        s.close().unwrap();
    });

    let mut client = Stream::with_config(TcpTransport::connect(addr).unwrap(), config()).unwrap();
    let body = pattern(70_000);
    client.write(&(body.len() as u32).to_be_bytes(), None).unwrap();
    client.write(&body, None).unwrap();

    assert_eq!(client.read(body.len()).unwrap(), body);
    server.join().unwrap();
    client.close().unwrap();
}

#[test]
fn file_stream_uses_single_write() {
    let mut file = tempfile::tempfile().unwrap();
    let mut s = Stream::with_config(FileTransport::new(file.try_clone().unwrap()), config()).unwrap();
    assert_eq!(s.kind(), TransportKind::File);

    assert_eq!(s.write(b"set-config mode=2", Some(10)).unwrap(), 10);
    s.close().unwrap();

    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "set-config");
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn writer_closing_mid_read_is_peer_close() {
    let (reader, writer) = PipeTransport::pair().unwrap();
    let mut rx = Stream::with_config(reader, config()).unwrap();
    let mut tx = Stream::with_config(writer, config()).unwrap();

    tx.write(b"abc", None).unwrap();
    tx.close().unwrap();

    let err = rx.read(10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
}

#[test]
fn silent_peer_times_out() {
    let (a, _b) = UnixSocketTransport::pair().unwrap();
    let cfg = config().with_poll_timeout(Duration::from_millis(50));
    let mut s = Stream::with_config(a, cfg).unwrap();

    let err = s.read(1).unwrap_err();
    assert!(matches!(err, StreamError::TimedOut(_)), "got {err:?}");
}

#[test]
fn peer_that_never_drains_times_out_the_writer() {
    let (a, _b) = UnixSocketTransport::pair().unwrap();
    a.set_send_buffer_size(4096).unwrap();
    let cfg = config().with_poll_timeout(Duration::from_millis(100));
    let mut s = Stream::with_config(a, cfg).unwrap();

    // Usually poll stops reporting POLLOUT; a kernel that keeps reporting it
    // answers with EAGAIN instead, which exhausts the stall budget.
    let err = s.write(&pattern(8 * 1024 * 1024), None).unwrap_err();
    assert!(
        err.is_timeout() || err.kind() == ErrorKind::PartialWrite,
        "got {err:?}"
    );
}

#[test]
fn write_to_departed_peer_fails_on_first_attempt() {
    let (a, b) = UnixSocketTransport::pair().unwrap();
    drop(b);
    let mut s = Stream::with_config(a, config()).unwrap();

    match s.write(b"status?", None).unwrap_err() {
        StreamError::WriteFailed { attempt, .. } => assert_eq!(attempt, 1),
        other => panic!("expected write failure, got {other:?}"),
    }
}

// ============================================================================
// Construction from raw descriptors
// ============================================================================

#[test]
fn adopt_accepts_pipe_and_rejects_directory() {
    let (read_end, _write_end) = nix::unistd::pipe().unwrap();
    let s = Stream::adopt(read_end).unwrap();
    assert_eq!(s.kind(), TransportKind::Pipe);

    let dir = tempfile::tempdir().unwrap();
    let handle = std::fs::File::open(dir.path()).unwrap();
    let err = Stream::adopt(OwnedFd::from(handle)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn closed_stream_is_inert() {
    let (reader, _writer) = PipeTransport::pair().unwrap();
    let mut s = Stream::with_config(reader, config()).unwrap();

    s.close().unwrap();
    s.close().unwrap();
    assert_eq!(s.read(1).unwrap_err().kind(), ErrorKind::NotReadable);
    assert_eq!(s.write(b"x", None).unwrap_err().kind(), ErrorKind::NotWritable);
}
