// Core module: error taxonomy, tuning and shared types (NO I/O)
pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
