// Event names attached to tracing records as the `event` field
pub const STREAM_OPEN: &str = "stream_open";
pub const STREAM_READ: &str = "stream_read";
pub const STREAM_WRITE: &str = "stream_write";
pub const STREAM_CLOSE: &str = "stream_close";

pub const READ_PARTIAL: &str = "read_partial";
pub const WRITE_PARTIAL: &str = "write_partial";
pub const WRITE_STALL: &str = "write_stall";
pub const PEER_CLOSED: &str = "peer_closed";

pub const CONFIG_IGNORED: &str = "config_ignored";
