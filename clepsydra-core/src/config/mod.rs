//! Device configuration
//!
//! The firmware embeds a `device.toml` and parses it at boot with the small
//! `no_std` parser in [`toml`]. Anything missing keeps its default.

pub mod toml;
pub mod types;

pub use self::toml::{parse_config, ParseError};
pub use types::*;
