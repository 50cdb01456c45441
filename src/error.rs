use std::io;
use std::net::SocketAddr;
use thiserror::Error;

use crate::handler::Stage;
use crate::protocol::Reply;

/// SOCKS5 会话统一的错误类型
#[derive(Error, Debug)]
pub enum SocksError {
    #[error("IO error: {0}")]
    Io(io::Error),

    /// 声明的长度超过了实际可读的字节
    #[error("truncated input")]
    Truncated,

    #[error("unsupported socks version: 0x{0:02x}")]
    UnsupportedVersion(u8),

    #[error("unsupported auth version: 0x{0:02x}")]
    UnsupportedAuthVersion(u8),

    #[error("no acceptable auth methods")]
    NoAcceptableMethods,

    #[error("authentication failed for user {0}")]
    AuthFailed(String),

    #[error("unsupported command: 0x{0:02x}")]
    UnsupportedCommand(u8),

    #[error("unsupported address type: 0x{0:02x}")]
    UnsupportedAddressType(u8),

    #[error("domain name is not valid utf-8")]
    InvalidDomain,

    #[error("unassigned reply code: 0x{0:02x}")]
    UnknownReply(u8),

    #[error("name not found: {0}")]
    NameNotFound(String),

    #[error("connect to {target} failed: {source}")]
    Dial {
        target: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("{0} timed out")]
    Timeout(Stage),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SocksError>;

impl From<io::Error> for SocksError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => SocksError::Truncated,
            _ => SocksError::Io(err),
        }
    }
}

impl SocksError {
    /// 失败时应当回给客户端的 REP，`None` 表示不再写 connect reply
    pub fn reply(&self) -> Option<Reply> {
        match self {
            SocksError::UnsupportedVersion(_) => Some(Reply::GeneralFailure),
            SocksError::UnsupportedCommand(_) => Some(Reply::CommandNotSupported),
            SocksError::UnsupportedAddressType(_) => Some(Reply::AddressTypeNotSupported),
            SocksError::InvalidDomain | SocksError::NameNotFound(_) => Some(Reply::HostUnreachable),
            SocksError::Dial { source, .. } => Some(Reply::from(source.kind())),
            SocksError::Timeout(Stage::Connect) => Some(Reply::TtlExpired),
            _ => None,
        }
    }
}
