use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::consts::*;
use crate::error::{Result, SocksError};

/// 可识别的配置项，交给 `ServerConfig::new` 校验
#[derive(Clone)]
pub struct Options {
    pub ip: IpAddr,
    pub port: u16,
    pub version: u8,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub handshake_timeout: Duration,
    pub connect_timeout: Duration,
    /// 一侧关闭后，另一侧空闲多久就结束转发
    pub drain_timeout: Duration,
    /// Linux 上用 splice 零拷贝转发
    pub zero_copy: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            version: SOCKS_VERSION,
            authenticator: None,
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            drain_timeout: Duration::from_secs(DEFAULT_DRAIN_TIMEOUT),
            zero_copy: true,
        }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    listen: SocketAddr,
    version: u8,
    authenticator: Option<Arc<dyn Authenticator>>,
    handshake_timeout: Duration,
    connect_timeout: Duration,
    drain_timeout: Duration,
    zero_copy: bool,
}

impl ServerConfig {
    pub fn new(options: Options) -> Result<Self> {
        if options.version != SOCKS_VERSION {
            return Err(SocksError::Config(format!(
                "unsupported socks version: {}",
                options.version
            )));
        }
        if options.handshake_timeout.is_zero() {
            return Err(SocksError::Config("handshake timeout must be positive".into()));
        }
        if options.connect_timeout.is_zero() {
            return Err(SocksError::Config("connect timeout must be positive".into()));
        }
        if options.drain_timeout.is_zero() {
            return Err(SocksError::Config("drain timeout must be positive".into()));
        }

        Ok(ServerConfig {
            listen: SocketAddr::new(options.ip, options.port),
            version: options.version,
            authenticator: options.authenticator,
            handshake_timeout: options.handshake_timeout,
            connect_timeout: options.connect_timeout,
            drain_timeout: options.drain_timeout,
            zero_copy: options.zero_copy,
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn authenticator(&self) -> Option<&dyn Authenticator> {
        self.authenticator.as_deref()
    }

    /// 配置了 authenticator 时不再接受 no-auth
    pub fn auth_required(&self) -> bool {
        self.authenticator.is_some()
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn zero_copy(&self) -> bool {
        self.zero_copy
    }
}
