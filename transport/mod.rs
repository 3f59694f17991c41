// Transport module: byte-stream capability over concrete OS handles
pub mod traits;
pub mod readiness;
pub mod unix;
pub mod tcp;
pub mod pipe;
pub mod file;
pub mod adopt;

pub use traits::*;
pub use unix::*;
pub use tcp::*;
pub use pipe::*;
pub use file::*;
pub use adopt::adopt;
