// client: probe library for poking a device endpoint through a Stream
use anyhow::{anyhow, bail, Context, Result};
use dmstream::{Stream, StreamConfig, TcpTransport, UnixSocketTransport};
use std::fmt;
use std::fmt::Write as _;
use std::net::ToSocketAddrs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Tcp(String),
    Unix(PathBuf),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Tcp(addr) => write!(f, "tcp://{}", addr),
            Target::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

pub struct ProbeClient {
    target: Target,
    stream: Stream,
}

impl ProbeClient {
    pub fn connect(target: Target, config: StreamConfig, connect_timeout: Duration) -> Result<Self> {
        let stream = match &target {
            Target::Tcp(addr) => {
                let resolved = addr
                    .to_socket_addrs()
                    .with_context(|| format!("resolving {}", addr))?
                    .next()
                    .ok_or_else(|| anyhow!("{} resolved to no address", addr))?;
                let transport = TcpTransport::connect_timeout(&resolved, connect_timeout)
                    .with_context(|| format!("connecting to {}", target))?;
                Stream::with_config(transport, config)?
            }
            Target::Unix(path) => {
                let transport = UnixSocketTransport::connect(path)
                    .with_context(|| format!("connecting to {}", target))?;
                Stream::with_config(transport, config)?
            }
        };
        info!(target_addr = %target, "connected");

        Ok(ProbeClient { target, stream })
    }

    /// Send `request`, then read exactly `expect` bytes if asked to.
    pub fn exchange(&mut self, request: &[u8], expect: Option<usize>) -> Result<Option<Vec<u8>>> {
        if !request.is_empty() {
            let sent = self
                .stream
                .write(request, None)
                .with_context(|| format!("writing {} bytes to {}", request.len(), self.target))?;
            info!(target_addr = %self.target, bytes = sent, "request sent");
        }

        match expect {
            Some(0) | None => Ok(None),
            Some(n) => {
                let reply = self
                    .stream
                    .read(n)
                    .with_context(|| format!("reading {} bytes from {}", n, self.target))?;
                info!(target_addr = %self.target, bytes = reply.len(), "reply received");
                Ok(Some(reply))
            }
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.stream
            .close()
            .with_context(|| format!("closing {}", self.target))
    }
}

/// Decode a hex payload; whitespace between bytes is ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("hex payload has an odd number of digits");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair)?;
            u8::from_str_radix(s, 16).with_context(|| format!("invalid hex byte {:?}", s))
        })
        .collect()
}

/// Classic 16-bytes-per-line dump: offset, hex, printable ASCII.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}  ", line * 16);
        for i in 0..16 {
            match chunk.get(i) {
                Some(b) => {
                    let _ = write!(out, "{:02x} ", b);
                }
                None => out.push_str("   "),
            }
        }
        out.push('|');
        out.extend(chunk.iter().map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' }));
        out.push_str("|\n");
    }
    out
}

/// Structured logs to stderr; `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%dT%H:%M:%S%.3f".to_string()))
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixListener;
    use std::thread;

    #[test]
    fn hex_payload_round_trips_through_dump() {
        let bytes = parse_hex("de ad be ef 41").unwrap();
        assert_eq!(bytes, vec![0xde, 0xad, 0xbe, 0xef, 0x41]);
        assert_eq!(hex_dump(&bytes), format!("00000000  de ad be ef 41 {}|....A|\n", "   ".repeat(11)));
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn exchange_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let device = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut request = [0u8; 5];
            conn.read_exact(&mut request).unwrap();
            assert_eq!(&request, b"GET 1");
            conn.write_all(b"value=42").unwrap();
        });

        let config = StreamConfig::default().with_poll_timeout(Duration::from_secs(2));
        let mut client = ProbeClient::connect(Target::Unix(path), config, Duration::from_secs(1)).unwrap();
        let reply = client.exchange(b"GET 1", Some(8)).unwrap();
        assert_eq!(reply.as_deref(), Some(&b"value=42"[..]));

        client.close().unwrap();
        device.join().unwrap();
    }

    #[test]
    fn unreachable_target_reports_context() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::Unix(dir.path().join("missing.sock"));
        let err = ProbeClient::connect(target, StreamConfig::default(), Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("connecting to unix://"));
    }
}
