// dmstream: reliable byte stream over one transport handle for the
// device-management client. Framing and connection policy live above it.

// Re-export error taxonomy, tuning and shared types
pub use dmstream_core::*;

// Re-export transport abstractions
pub use dmstream_transport::*;

mod stream;

pub use stream::Stream;
