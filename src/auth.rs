// src/auth.rs
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::consts::*;
use crate::error::{Result, SocksError};
use crate::protocol::{AuthReply, AuthRequest, write_message};

/// 用户名/密码校验，会话只关心返回的布尔结果
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &[u8], password: &[u8]) -> bool;
}

/// 单个静态用户
#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password: String,
}

impl Authenticator for User {
    fn authenticate(&self, username: &[u8], password: &[u8]) -> bool {
        self.username.as_bytes() == username && self.password.as_bytes() == password
    }
}

/// username/password 子协商 (RFC 1929)
///
/// 没有配置 authenticator 时接受任意凭据。
pub async fn perform_password_auth<S>(
    stream: &mut S,
    authenticator: Option<&dyn Authenticator>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = AuthRequest::read_from(stream).await?;

    if request.version != AUTH_VERSION {
        write_message(stream, AuthReply::failure()).await?;
        return Err(SocksError::UnsupportedAuthVersion(request.version));
    }

    let username = request.username_lossy();
    debug!("[Auth] 尝试认证: {} / ***", username);

    let accepted =
        authenticator.is_none_or(|auth| auth.authenticate(&request.username, &request.password));

    if accepted {
        write_message(stream, AuthReply::success()).await?;
        info!("用户 {} 认证成功", username);
        Ok(())
    } else {
        write_message(stream, AuthReply::failure()).await?;
        warn!("用户 {} 认证失败: 密码错误", username);
        Err(SocksError::AuthFailed(username))
    }
}
