// Core types shared by the transport layer and the stream
use std::fmt;

// Concrete transport behind a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    TcpSocket,
    UnixSocket,
    Pipe,
    File,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransportKind::TcpSocket => write!(f, "tcp"),
            TransportKind::UnixSocket => write!(f, "unix"),
            TransportKind::Pipe => write!(f, "pipe"),
            TransportKind::File => write!(f, "file"),
        }
    }
}

// Readiness a caller waits for before a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Interest::Readable => write!(f, "read"),
            Interest::Writable => write!(f, "write"),
        }
    }
}

/// How `Stream::write` pushes a buffer into the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `Single` for files, `Retry` for everything else.
    Auto,
    /// Loop over partial writes with a bounded stall budget.
    Retry,
    /// One write call; anything short of the full length is an error.
    Single,
}

impl WriteMode {
    pub fn resolve(self, kind: TransportKind) -> WriteMode {
        match self {
            WriteMode::Auto if kind == TransportKind::File => WriteMode::Single,
            WriteMode::Auto => WriteMode::Retry,
            other => other,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(WriteMode::Auto),
            "retry" => Some(WriteMode::Retry),
            "single" => Some(WriteMode::Single),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_write_mode_depends_on_kind() {
        assert_eq!(WriteMode::Auto.resolve(TransportKind::File), WriteMode::Single);
        assert_eq!(WriteMode::Auto.resolve(TransportKind::Pipe), WriteMode::Retry);
        assert_eq!(WriteMode::Auto.resolve(TransportKind::TcpSocket), WriteMode::Retry);
        assert_eq!(WriteMode::Retry.resolve(TransportKind::File), WriteMode::Retry);
        assert_eq!(WriteMode::Single.resolve(TransportKind::UnixSocket), WriteMode::Single);
    }

    #[test]
    fn write_mode_parse_is_case_insensitive() {
        assert_eq!(WriteMode::parse("RETRY"), Some(WriteMode::Retry));
        assert_eq!(WriteMode::parse(" single "), Some(WriteMode::Single));
        assert_eq!(WriteMode::parse("sometimes"), None);
    }
}
