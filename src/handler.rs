use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::auth;
use crate::config::ServerConfig;
use crate::consts::*;
use crate::error::{Result, SocksError};
use crate::protocol::{
    Command, ConnectReply, ConnectRequest, MethodSelection, NegotiationRequest, write_message,
};
use crate::relay;
use crate::resolve::resolve;

/// 握手的各个阶段，每个阶段各自受超时约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Negotiation,
    Authentication,
    Request,
    Connect,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Negotiation => "negotiation",
            Stage::Authentication => "authentication",
            Stage::Request => "request",
            Stage::Connect => "connect",
        };
        f.write_str(name)
    }
}

/// 按固定优先级选择认证方式：username/password > no-auth > 无可用方式
pub fn select_method(methods: &[u8], auth_required: bool) -> u8 {
    if methods.contains(&METHOD_PASSWORD) {
        METHOD_PASSWORD
    } else if !auth_required && methods.contains(&METHOD_NO_AUTH) {
        METHOD_NO_AUTH
    } else {
        METHOD_NO_ACCEPTABLE
    }
}

/// 握手完成，可以开始转发
pub struct Established<S> {
    pub client: BufReader<S>,
    pub target: TcpStream,
    pub request: ConnectRequest,
    pub method: u8,
}

pub struct Handshake<'a, S> {
    stream: BufReader<S>,
    config: &'a ServerConfig,
}

impl<'a, S> Handshake<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: &'a ServerConfig) -> Self {
        Handshake {
            stream: BufReader::new(stream),
            config,
        }
    }

    pub async fn run(mut self) -> Result<Established<S>> {
        let config = self.config;
        let limit = config.handshake_timeout();

        // ==========================================
        // 阶段 1: 协商 (Negotiation)
        // ==========================================
        let method = deadline(limit, Stage::Negotiation, self.negotiate()).await?;

        // ==========================================
        // 阶段 2: 认证 (Authentication)
        // ==========================================
        if method == METHOD_PASSWORD {
            let authenticator = config.authenticator();
            deadline(
                limit,
                Stage::Authentication,
                auth::perform_password_auth(&mut self.stream, authenticator),
            )
            .await?;
        }

        // ==========================================
        // 阶段 3: 请求 (Request)
        // ==========================================
        let request = match deadline(limit, Stage::Request, self.read_request()).await {
            Ok(request) => request,
            Err(e) => return Err(self.fail(e).await),
        };

        // 先拨通目标再回复成功，拨号失败才能带上正确的 REP
        let target = match dial(config, &request).await {
            Ok(target) => target,
            Err(e) => return Err(self.fail(e).await),
        };

        write_message(&mut self.stream, ConnectReply::success(request.address.atyp())).await?;

        Ok(Established {
            client: self.stream,
            target,
            request,
            method,
        })
    }

    async fn negotiate(&mut self) -> Result<u8> {
        let request = NegotiationRequest::read_from(&mut self.stream).await?;
        if request.version != self.config.version() {
            return Err(SocksError::UnsupportedVersion(request.version));
        }

        let method = select_method(&request.methods, self.config.auth_required());
        write_message(&mut self.stream, MethodSelection::new(method)).await?;

        if method == METHOD_NO_ACCEPTABLE {
            return Err(SocksError::NoAcceptableMethods);
        }
        debug!("selected auth method 0x{:02x}", method);
        Ok(method)
    }

    async fn read_request(&mut self) -> Result<ConnectRequest> {
        let request = ConnectRequest::read_from(&mut self.stream).await?;
        if request.version != self.config.version() {
            return Err(SocksError::UnsupportedVersion(request.version));
        }
        if request.command != Command::Connect {
            warn!("不支持的命令: {:?} ({})", request.command, request);
            return Err(SocksError::UnsupportedCommand(request.command.into()));
        }
        Ok(request)
    }

    /// 尽力写一个失败回复，写不出去也不再追究
    async fn fail(&mut self, err: SocksError) -> SocksError {
        if let Some(reply) = err.reply() {
            if let Err(e) = write_message(&mut self.stream, ConnectReply::failure(reply)).await {
                debug!("failed to send {:?} reply: {}", reply, e);
            }
        }
        err
    }
}

async fn deadline<T, F>(limit: Duration, stage: Stage, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} 超时 ({:?})", stage, limit);
            Err(SocksError::Timeout(stage))
        }
    }
}

async fn dial(config: &ServerConfig, request: &ConnectRequest) -> Result<TcpStream> {
    let connect = async {
        let target = resolve(&request.address, request.port).await?;
        TcpStream::connect(target).await.map_err(|source| {
            error!("目标主机连接失败：{}({})", request, source);
            SocksError::Dial { target, source }
        })
    };
    deadline(config.connect_timeout(), Stage::Connect, connect).await
}

/// 处理一个客户端连接：握手，拨号，转发
pub async fn process(socket: TcpStream, config: &ServerConfig) -> Result<()> {
    let established = Handshake::new(socket, config).run().await?;
    info!(
        "TCP Connect to: {} (method 0x{:02x})",
        established.request, established.method
    );

    // ==========================================
    // 阶段 4: TCP 转发
    // ==========================================
    let relayed = relay::transfer(
        established.client,
        established.target,
        config.zero_copy(),
        config.drain_timeout(),
    )
    .await;
    match relayed {
        Ok(traffic) => debug!(
            "传输完成 {}: 上行 {}b, 下行 {}b",
            established.request, traffic.up, traffic.down
        ),
        // 传输层的错误直接结束会话，不再写任何协议字节
        Err(e) => debug!("传输中断 {}: {}", established.request, e),
    }
    Ok(())
}

/// 接受连接，每个连接一个独立的 task
pub async fn serve(listener: TcpListener, config: Arc<ServerConfig>) {
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("accept error: {}", e);
                continue;
            }
        };
        debug!("SOCKS connection from {}", addr);

        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = process(socket, config.as_ref()).await {
                error!("[Error] from {:?} : {}", addr, e);
            }
        });
    }
}
