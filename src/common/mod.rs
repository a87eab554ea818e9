//! Common utilities and types shared across filedata

pub mod config;
pub mod error;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result, SequenceFault};
pub use utils::{display_id, encode_key, format_bytes, EMPTY_KEY_NAME};
