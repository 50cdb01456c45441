use std::net::{IpAddr, SocketAddr};
use tokio::net::lookup_host;
use tracing::debug;

use crate::error::{Result, SocksError};
use crate::protocol::Address;

/// 把请求里的地址解析成可以直接拨号的 endpoint
pub async fn resolve(address: &Address, port: u16) -> Result<SocketAddr> {
    match address {
        Address::IpV4(ip) => Ok(SocketAddr::new(IpAddr::V4(*ip), port)),
        Address::IpV6(ip) => Ok(SocketAddr::new(IpAddr::V6(*ip), port)),
        Address::Domain(domain) => {
            if domain.is_empty() {
                return Err(SocksError::NameNotFound(String::new()));
            }
            let addrs = lookup_host((domain.as_str(), port)).await.map_err(|e| {
                debug!("lookup {} failed: {}", domain, e);
                SocksError::NameNotFound(domain.clone())
            })?;
            select_endpoint(addrs).ok_or_else(|| SocksError::NameNotFound(domain.clone()))
        }
    }
}

/// IPv4 和 IPv6 都可以，取解析结果里的第一个
pub fn select_endpoint(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<SocketAddr> {
    addrs.into_iter().next()
}
