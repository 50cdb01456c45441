use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const RELAY_BUFFER_SIZE: usize = 8 * 1024;

/// 两个方向各自转发的字节数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traffic {
    pub up: u64,
    pub down: u64,
}

/// 转发过程中每搬一块数据记一次
#[derive(Default)]
struct Activity {
    ticks: AtomicU64,
}

impl Activity {
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// 一个方向结束后，剩下的方向只要在 `idle` 内还有数据就继续，否则放弃
async fn linger<F, T>(mut rest: Pin<&mut F>, activity: &Activity, idle: Duration) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    loop {
        let seen = activity.ticks();
        match timeout(idle, rest.as_mut()).await {
            Ok(result) => return result,
            Err(_) if activity.ticks() == seen => {
                debug!("对侧已关闭，另一个方向 {:?} 内没有数据", idle);
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "relay drain timed out",
                ));
            }
            Err(_) => continue,
        }
    }
}

/// 双向转发：两个方向各跑一个 pump，两个都结束才返回
///
/// 一侧读到 EOF 后关闭对侧的写端，对端因此能读到 EOF 并结束另一个方向。
/// 对端不理会 EOF 时，另一个方向空闲超过 `idle` 就被丢弃，返回 `TimedOut`。
/// 任一方向出错时另一个方向直接被丢弃，两条流随之关闭。
pub async fn relay<A, B>(a: A, b: B, idle: Duration) -> io::Result<Traffic>
where
    A: AsyncRead + AsyncWrite,
    B: AsyncRead + AsyncWrite,
{
    let (mut a_read, mut a_write) = tokio::io::split(a);
    let (mut b_read, mut b_write) = tokio::io::split(b);
    let activity = Activity::default();

    let a_to_b = pump(&mut a_read, &mut b_write, &activity);
    let b_to_a = pump(&mut b_read, &mut a_write, &activity);
    tokio::pin!(a_to_b, b_to_a);

    let (up, down) = tokio::select! {
        up = &mut a_to_b => {
            let up = up?;
            (up, linger(b_to_a, &activity, idle).await?)
        }
        down = &mut b_to_a => {
            let down = down?;
            (linger(a_to_b, &activity, idle).await?, down)
        }
    };

    Ok(Traffic { up, down })
}

async fn pump<R, W>(reader: &mut R, writer: &mut W, activity: &Activity) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
        activity.tick();
    }
    // 对端可能已经断开，shutdown 失败不影响已转发的数据
    if let Err(e) = writer.shutdown().await {
        debug!("shutdown after {}b: {}", total, e);
    }
    Ok(total)
}

/// 客户端与目标之间的 TCP 转发
pub async fn transfer(
    client: BufReader<TcpStream>,
    mut target: TcpStream,
    zero_copy: bool,
    idle: Duration,
) -> io::Result<Traffic> {
    // 客户端在请求后面紧跟着发的数据可能已经读进了握手缓冲区
    let pending = client.buffer().len() as u64;
    if pending > 0 {
        target.write_all(client.buffer()).await?;
    }
    let mut client = client.into_inner();

    #[cfg(target_os = "linux")]
    if zero_copy {
        let (up, down) = splice::transfer(&mut client, &mut target, idle).await?;
        debug!("Splice 传输完成: 上行 {}b, 下行 {}b", up, down);
        return Ok(Traffic {
            up: up + pending,
            down,
        });
    }

    #[cfg(not(target_os = "linux"))]
    let _ = zero_copy;

    // 用户态拷贝
    let traffic = relay(&mut client, &mut target, idle).await?;
    Ok(Traffic {
        up: traffic.up + pending,
        down: traffic.down,
    })
}

#[cfg(target_os = "linux")]
mod splice {
    use std::io;
    use std::os::unix::io::{AsRawFd, RawFd};
    use std::pin::Pin;
    use std::task::{Context, Poll, ready};
    use std::time::Duration;
    use tokio::io::{AsyncRead, AsyncWrite, Interest, ReadBuf};
    use tokio::net::TcpStream;
    use tokio::sync::Notify;
    use tokio_splice::{Stream, zero_copy_bidirectional};

    use super::{Activity, linger};

    /// splice 只给出双向的总结果，这里在写端 shutdown 时发出通知，
    /// 每次成功的 splice 记一次活动
    struct Watched<'a> {
        stream: &'a mut TcpStream,
        activity: &'a Activity,
        closed: &'a Notify,
    }

    impl AsRawFd for Watched<'_> {
        fn as_raw_fd(&self) -> RawFd {
            self.stream.as_raw_fd()
        }
    }

    impl AsyncRead for Watched<'_> {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut *self.get_mut().stream).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for Watched<'_> {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Pin::new(&mut *self.get_mut().stream).poll_write(cx, buf)
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Pin::new(&mut *self.get_mut().stream).poll_flush(cx)
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let result = ready!(Pin::new(&mut *this.stream).poll_shutdown(cx));
            this.closed.notify_one();
            Poll::Ready(result)
        }
    }

    impl Stream for Watched<'_> {
        fn poll_read_ready_n(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.stream.poll_read_ready(cx)
        }

        fn poll_write_ready_n(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            self.stream.poll_write_ready(cx)
        }

        fn try_io_n<R>(
            &self,
            interest: Interest,
            f: impl FnOnce() -> io::Result<R>,
        ) -> io::Result<R> {
            let result = self.stream.try_io(interest, f);
            if result.is_ok() {
                self.activity.tick();
            }
            result
        }
    }

    pub(super) async fn transfer(
        client: &mut TcpStream,
        target: &mut TcpStream,
        idle: Duration,
    ) -> io::Result<(u64, u64)> {
        let activity = Activity::default();
        let closed = Notify::new();
        let mut client = Watched {
            stream: client,
            activity: &activity,
            closed: &closed,
        };
        let mut target = Watched {
            stream: target,
            activity: &activity,
            closed: &closed,
        };

        let copy = zero_copy_bidirectional(&mut client, &mut target);
        tokio::pin!(copy);

        tokio::select! {
            result = &mut copy => result,
            _ = closed.notified() => linger(copy, &activity, idle).await,
        }
    }
}
