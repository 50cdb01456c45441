pub mod auth;
pub mod config;
pub mod consts;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod relay;
pub mod resolve;

pub use config::{Options, ServerConfig};
pub use error::{Result, SocksError};
