// src/main.rs
use clap::Parser;
use std::error::Error;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{Level, error, info};

use socks5_proxy::auth::{Authenticator, User};
use socks5_proxy::consts::DEFAULT_PORT;
use socks5_proxy::handler;
use socks5_proxy::{Options, ServerConfig};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// 监听地址
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: IpAddr,

    /// 监听端口
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// 认证用户名 (可选)
    #[arg(short, long)]
    user: Option<String>,

    /// 认证密码 (可选，必须配合 user 使用)
    #[arg(long)]
    pass: Option<String>,

    /// 连接目标的超时时间 (秒)
    #[arg(long, default_value_t = 5)]
    timeout: u8,

    /// 握手每一步的超时时间 (秒)
    #[arg(long, default_value_t = 10)]
    handshake_timeout: u8,

    /// 一侧关闭后另一侧允许空闲的时间 (秒)
    #[arg(long, default_value_t = 30)]
    drain_timeout: u8,

    /// 不使用 splice 零拷贝转发
    #[arg(long)]
    no_splice: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let authenticator: Option<Arc<dyn Authenticator>> = match (args.user, args.pass) {
        (Some(username), Some(password)) => {
            info!("use auth,user:{}", username);
            Some(Arc::new(User { username, password }))
        }
        (Some(_), None) => {
            error!("no password");
            std::process::exit(1);
        }
        (None, Some(_)) => {
            error!("no user");
            std::process::exit(1);
        }
        (None, None) => {
            info!("running in No_auth");
            None
        }
    };

    let config = ServerConfig::new(Options {
        ip: args.ip,
        port: args.port,
        authenticator,
        handshake_timeout: Duration::from_secs(args.handshake_timeout.into()),
        connect_timeout: Duration::from_secs(args.timeout.into()),
        drain_timeout: Duration::from_secs(args.drain_timeout.into()),
        zero_copy: !args.no_splice,
        ..Options::default()
    })?;

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("SOCKS5 Server running on {}", addr);

    handler::serve(listener, Arc::new(config)).await;
    Ok(())
}
