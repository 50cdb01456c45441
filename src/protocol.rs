use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::consts::*;
use crate::error::{Result, SocksError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    IpV4(Ipv4Addr),
    Domain(String),
    IpV6(Ipv6Addr),
}

impl Address {
    pub fn atyp(&self) -> u8 {
        match self {
            Address::IpV4(_) => ATYP_IPV4,
            Address::Domain(_) => ATYP_DOMAIN,
            Address::IpV6(_) => ATYP_IPV6,
        }
    }

    /// 全 0 的地址，用于不跟踪真实 bound 地址时的回复
    pub fn unspecified(atyp: u8) -> Self {
        match atyp {
            ATYP_IPV6 => Address::IpV6(Ipv6Addr::UNSPECIFIED),
            ATYP_DOMAIN => Address::Domain(String::new()),
            _ => Address::IpV4(Ipv4Addr::UNSPECIFIED),
        }
    }

    async fn read_from<R: AsyncRead + Unpin>(reader: &mut R, atyp: u8) -> Result<Self> {
        let address = match atyp {
            ATYP_IPV4 => {
                let mut buf = [0u8; 4];
                reader.read_exact(&mut buf).await?;
                Address::IpV4(Ipv4Addr::from(buf))
            }
            ATYP_DOMAIN => {
                // 先读 1 字节长度，再读 N 字节域名
                let len = reader.read_u8().await? as usize;
                let mut buf = vec![0u8; len];
                reader.read_exact(&mut buf).await?;
                let domain = String::from_utf8(buf).map_err(|_| SocksError::InvalidDomain)?;
                Address::Domain(domain)
            }
            ATYP_IPV6 => {
                let mut buf = [0u8; 16];
                reader.read_exact(&mut buf).await?;
                Address::IpV6(Ipv6Addr::from(buf))
            }
            _ => return Err(SocksError::UnsupportedAddressType(atyp)),
        };
        Ok(address)
    }

    fn write(&self, buf: &mut Vec<u8>) {
        buf.push(self.atyp());
        match self {
            Address::IpV4(ip) => buf.extend_from_slice(&ip.octets()),
            Address::Domain(domain) => {
                let len = domain.len().min(MAX_DOMAIN_LEN);
                buf.push(len as u8);
                buf.extend_from_slice(&domain.as_bytes()[..len]);
            }
            Address::IpV6(ip) => buf.extend_from_slice(&ip.octets()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::IpV4(ip) => write!(f, "{}", ip),
            Address::Domain(domain) => write!(f, "{}", domain),
            Address::IpV6(ip) => write!(f, "[{}]", ip),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
    Unknown(u8),
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        match value {
            CMD_CONNECT => Command::Connect,
            CMD_BIND => Command::Bind,
            CMD_UDP_ASSOCIATE => Command::UdpAssociate,
            other => Command::Unknown(other),
        }
    }
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        match value {
            Command::Connect => CMD_CONNECT,
            Command::Bind => CMD_BIND,
            Command::UdpAssociate => CMD_UDP_ASSOCIATE,
            Command::Unknown(other) => other,
        }
    }
}

/// Connect reply 的 REP 字段
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Succeeded = REP_SUCCESS,
    GeneralFailure = REP_GENERAL_FAILURE,
    ConnectionNotAllowed = REP_CONNECTION_NOT_ALLOWED,
    NetworkUnreachable = REP_NETWORK_UNREACHABLE,
    HostUnreachable = REP_HOST_UNREACHABLE,
    ConnectionRefused = REP_CONNECTION_REFUSED,
    TtlExpired = REP_TTL_EXPIRED,
    CommandNotSupported = REP_COMMAND_NOT_SUPPORTED,
    AddressTypeNotSupported = REP_ADDRESS_TYPE_NOT_SUPPORTED,
}

impl TryFrom<u8> for Reply {
    type Error = SocksError;

    fn try_from(value: u8) -> Result<Self> {
        let reply = match value {
            REP_SUCCESS => Reply::Succeeded,
            REP_GENERAL_FAILURE => Reply::GeneralFailure,
            REP_CONNECTION_NOT_ALLOWED => Reply::ConnectionNotAllowed,
            REP_NETWORK_UNREACHABLE => Reply::NetworkUnreachable,
            REP_HOST_UNREACHABLE => Reply::HostUnreachable,
            REP_CONNECTION_REFUSED => Reply::ConnectionRefused,
            REP_TTL_EXPIRED => Reply::TtlExpired,
            REP_COMMAND_NOT_SUPPORTED => Reply::CommandNotSupported,
            REP_ADDRESS_TYPE_NOT_SUPPORTED => Reply::AddressTypeNotSupported,
            other => return Err(SocksError::UnknownReply(other)),
        };
        Ok(reply)
    }
}

impl From<io::ErrorKind> for Reply {
    /// 拨号失败的分类
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::ConnectionRefused => Reply::ConnectionRefused,
            io::ErrorKind::NetworkUnreachable | io::ErrorKind::NetworkDown => {
                Reply::NetworkUnreachable
            }
            io::ErrorKind::HostUnreachable => Reply::HostUnreachable,
            io::ErrorKind::TimedOut => Reply::TtlExpired,
            io::ErrorKind::PermissionDenied => Reply::ConnectionNotAllowed,
            _ => Reply::GeneralFailure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationRequest {
    pub version: u8,
    pub methods: Vec<u8>,
}

impl NegotiationRequest {
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let version = reader.read_u8().await?;
        let nmethods = reader.read_u8().await? as usize;
        let mut methods = vec![0u8; nmethods];
        reader.read_exact(&mut methods).await?;
        Ok(NegotiationRequest { version, methods })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        let n = self.methods.len().min(u8::MAX as usize);
        buf.push(self.version);
        buf.push(n as u8);
        buf.extend_from_slice(&self.methods[..n]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSelection {
    pub version: u8,
    pub method: u8,
}

impl MethodSelection {
    pub fn new(method: u8) -> Self {
        MethodSelection {
            version: SOCKS_VERSION,
            method,
        }
    }

    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await?;
        Ok(MethodSelection {
            version: buf[0],
            method: buf[1],
        })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&[self.version, self.method]);
    }
}

/// username/password 子协商请求，用户名和密码各自占用独立的缓冲区
#[derive(Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub version: u8,
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl AuthRequest {
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let version = reader.read_u8().await?;

        let ulen = reader.read_u8().await? as usize;
        let mut username = vec![0u8; ulen];
        reader.read_exact(&mut username).await?;

        let plen = reader.read_u8().await? as usize;
        let mut password = vec![0u8; plen];
        reader.read_exact(&mut password).await?;

        Ok(AuthRequest {
            version,
            username,
            password,
        })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        let ulen = self.username.len().min(u8::MAX as usize);
        let plen = self.password.len().min(u8::MAX as usize);
        buf.push(self.version);
        buf.push(ulen as u8);
        buf.extend_from_slice(&self.username[..ulen]);
        buf.push(plen as u8);
        buf.extend_from_slice(&self.password[..plen]);
    }

    pub fn username_lossy(&self) -> String {
        String::from_utf8_lossy(&self.username).into_owned()
    }
}

// 不打印密码
impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("version", &self.version)
            .field("username", &self.username_lossy())
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthReply {
    pub version: u8,
    pub status: u8,
}

impl AuthReply {
    pub fn success() -> Self {
        AuthReply {
            version: AUTH_VERSION,
            status: AUTH_SUCCESS,
        }
    }

    pub fn failure() -> Self {
        AuthReply {
            version: AUTH_VERSION,
            status: AUTH_FAILURE,
        }
    }

    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut buf = [0u8; 2];
        reader.read_exact(&mut buf).await?;
        Ok(AuthReply {
            version: buf[0],
            status: buf[1],
        })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&[self.version, self.status]);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub version: u8,
    pub command: Command,
    /// 保留字段，应为 0，不做校验
    pub rsv: u8,
    pub address: Address,
    pub port: u16,
}

impl fmt::Display for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl ConnectRequest {
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut head = [0u8; 4];
        reader.read_exact(&mut head).await?;

        let address = Address::read_from(reader, head[3]).await?;
        let port = reader.read_u16().await?;

        Ok(ConnectRequest {
            version: head[0],
            command: Command::from(head[1]),
            rsv: head[2],
            address,
            port,
        })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&[self.version, self.command.into(), self.rsv]);
        self.address.write(buf);
        buf.extend_from_slice(&self.port.to_be_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectReply {
    pub version: u8,
    pub reply: Reply,
    pub rsv: u8,
    pub address: Address,
    pub port: u16,
}

impl ConnectReply {
    /// 成功回复，回显请求的地址类型，bound 地址和端口填 0
    pub fn success(atyp: u8) -> Self {
        ConnectReply {
            version: SOCKS_VERSION,
            reply: Reply::Succeeded,
            rsv: RSV,
            address: Address::unspecified(atyp),
            port: 0,
        }
    }

    pub fn failure(reply: Reply) -> Self {
        ConnectReply {
            version: SOCKS_VERSION,
            reply,
            rsv: RSV,
            address: Address::unspecified(ATYP_IPV4),
            port: 0,
        }
    }

    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self> {
        let mut head = [0u8; 4];
        reader.read_exact(&mut head).await?;

        let address = Address::read_from(reader, head[3]).await?;
        let port = reader.read_u16().await?;

        Ok(ConnectReply {
            version: head[0],
            reply: Reply::try_from(head[1])?,
            rsv: head[2],
            address,
            port,
        })
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&[self.version, self.reply as u8, self.rsv]);
        self.address.write(buf);
        buf.extend_from_slice(&self.port.to_be_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Negotiation,
    MethodSelection,
    AuthRequest,
    AuthReply,
    ConnectRequest,
    ConnectReply,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Negotiation(NegotiationRequest),
    MethodSelection(MethodSelection),
    AuthRequest(AuthRequest),
    AuthReply(AuthReply),
    ConnectRequest(ConnectRequest),
    ConnectReply(ConnectReply),
}

impl Message {
    /// 从流中读取一条指定类型的消息，只消费属于它的字节
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R, kind: MessageKind) -> Result<Self> {
        let message = match kind {
            MessageKind::Negotiation => Message::Negotiation(NegotiationRequest::read_from(reader).await?),
            MessageKind::MethodSelection => {
                Message::MethodSelection(MethodSelection::read_from(reader).await?)
            }
            MessageKind::AuthRequest => Message::AuthRequest(AuthRequest::read_from(reader).await?),
            MessageKind::AuthReply => Message::AuthReply(AuthReply::read_from(reader).await?),
            MessageKind::ConnectRequest => {
                Message::ConnectRequest(ConnectRequest::read_from(reader).await?)
            }
            MessageKind::ConnectReply => Message::ConnectReply(ConnectReply::read_from(reader).await?),
        };
        Ok(message)
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Negotiation(_) => MessageKind::Negotiation,
            Message::MethodSelection(_) => MessageKind::MethodSelection,
            Message::AuthRequest(_) => MessageKind::AuthRequest,
            Message::AuthReply(_) => MessageKind::AuthReply,
            Message::ConnectRequest(_) => MessageKind::ConnectRequest,
            Message::ConnectReply(_) => MessageKind::ConnectReply,
        }
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        match self {
            Message::Negotiation(m) => m.write(buf),
            Message::MethodSelection(m) => m.write(buf),
            Message::AuthRequest(m) => m.write(buf),
            Message::AuthReply(m) => m.write(buf),
            Message::ConnectRequest(m) => m.write(buf),
            Message::ConnectReply(m) => m.write(buf),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        self.write(&mut buf);
        buf
    }
}

impl From<MethodSelection> for Message {
    fn from(m: MethodSelection) -> Self {
        Message::MethodSelection(m)
    }
}

impl From<AuthReply> for Message {
    fn from(m: AuthReply) -> Self {
        Message::AuthReply(m)
    }
}

impl From<ConnectReply> for Message {
    fn from(m: ConnectReply) -> Self {
        Message::ConnectReply(m)
    }
}

/// 序列化后一次性写出并 flush，对端不会看到半条回复
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    message: impl Into<Message>,
) -> Result<()> {
    let buf = message.into().to_bytes();
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn assert_roundtrip(bytes: &[u8], kind: MessageKind) -> Message {
        let mut reader = bytes;
        let message = Message::read_from(&mut reader, kind).await.unwrap();
        assert!(reader.is_empty(), "decoder left {} bytes", reader.len());
        assert_eq!(message.kind(), kind);
        assert_eq!(message.to_bytes(), bytes);
        message
    }

    #[tokio::test]
    async fn test_negotiation_method_count_bounds() {
        assert_roundtrip(&[0x05, 0x00], MessageKind::Negotiation).await;

        let mut full = vec![0x05, 0xFF];
        full.extend((0..255u8).map(|i| i.wrapping_mul(7)));
        let message = assert_roundtrip(&full, MessageKind::Negotiation).await;
        match message {
            Message::Negotiation(req) => assert_eq!(req.methods.len(), 255),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_negotiation_does_not_consume_following_bytes() {
        let mut reader: &[u8] = &[0x05, 0x01, 0x00, 0x05, 0x01];
        let req = NegotiationRequest::read_from(&mut reader).await.unwrap();
        assert_eq!(req.methods, vec![METHOD_NO_AUTH]);
        assert_eq!(reader, &[0x05, 0x01]);
    }

    #[tokio::test]
    async fn test_negotiation_truncated() {
        let mut reader: &[u8] = &[0x05, 0x03, 0x00];
        let err = NegotiationRequest::read_from(&mut reader).await.unwrap_err();
        assert!(matches!(err, SocksError::Truncated));
    }

    #[tokio::test]
    async fn test_negotiation_split_across_reads() {
        let mut stream = tokio_test::io::Builder::new()
            .read(&[0x05])
            .read(&[0x02, 0x00])
            .read(&[0x02])
            .build();
        let req = NegotiationRequest::read_from(&mut stream).await.unwrap();
        assert_eq!(req.methods, vec![METHOD_NO_AUTH, METHOD_PASSWORD]);
    }

    #[tokio::test]
    async fn test_auth_request_credential_lengths() {
        assert_roundtrip(&[0x01, 0x00, 0x00], MessageKind::AuthRequest).await;

        let mut max = vec![0x01, 0xFF];
        max.extend(std::iter::repeat_n(b'u', 255));
        max.push(0xFF);
        max.extend(std::iter::repeat_n(b'p', 255));
        let message = assert_roundtrip(&max, MessageKind::AuthRequest).await;
        match message {
            Message::AuthRequest(req) => {
                assert_eq!(req.username, vec![b'u'; 255]);
                assert_eq!(req.password, vec![b'p'; 255]);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_request_keeps_password_separate() {
        let mut reader: &[u8] = &[0x01, 0x05, b'a', b'l', b'i', b'c', b'e', 0x03, b'p', b'w', b'd'];
        let req = AuthRequest::read_from(&mut reader).await.unwrap();
        assert_eq!(req.username, b"alice");
        assert_eq!(req.password, b"pwd");
        assert_ne!(req.username, req.password);
    }

    #[tokio::test]
    async fn test_auth_request_truncated_password() {
        let mut reader: &[u8] = &[0x01, 0x01, b'a', 0x04, b'p'];
        let err = AuthRequest::read_from(&mut reader).await.unwrap_err();
        assert!(matches!(err, SocksError::Truncated));
    }

    #[test]
    fn test_auth_request_debug_hides_password() {
        let req = AuthRequest {
            version: AUTH_VERSION,
            username: b"bob".to_vec(),
            password: b"hunter2".to_vec(),
        };
        let debug = format!("{:?}", req);
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_connect_request_address_types() {
        let message = assert_roundtrip(
            &[0x05, 0x01, 0x00, 0x01, 0x7F, 0x00, 0x00, 0x01, 0x00, 0x50],
            MessageKind::ConnectRequest,
        )
        .await;
        match message {
            Message::ConnectRequest(req) => {
                assert_eq!(req.command, Command::Connect);
                assert_eq!(req.address, Address::IpV4(Ipv4Addr::LOCALHOST));
                assert_eq!(req.port, 80);
                assert_eq!(req.to_string(), "127.0.0.1:80");
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let mut v6 = vec![0x05, 0x01, 0x00, 0x04];
        v6.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        v6.extend_from_slice(&[0xFF, 0xFF]);
        let message = assert_roundtrip(&v6, MessageKind::ConnectRequest).await;
        match message {
            Message::ConnectRequest(req) => {
                assert_eq!(req.port, 65535);
                assert_eq!(req.to_string(), "[::1]:65535");
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let mut domain = vec![0x05, 0x01, 0x00, 0x03, 11];
        domain.extend_from_slice(b"example.com");
        domain.extend_from_slice(&[0x00, 0x00]);
        assert_roundtrip(&domain, MessageKind::ConnectRequest).await;

        let mut long = vec![0x05, 0x01, 0x00, 0x03, 0xFF];
        long.extend(std::iter::repeat_n(b'a', 255));
        long.extend_from_slice(&[0x01, 0xBB]);
        assert_roundtrip(&long, MessageKind::ConnectRequest).await;
    }

    #[tokio::test]
    async fn test_connect_request_keeps_bind_and_udp_commands() {
        let mut reader: &[u8] = &[0x05, 0x02, 0x00, 0x01, 10, 0, 0, 1, 0x00, 0x16];
        let req = ConnectRequest::read_from(&mut reader).await.unwrap();
        assert_eq!(req.command, Command::Bind);

        let mut reader: &[u8] = &[0x05, 0x03, 0x00, 0x01, 10, 0, 0, 1, 0x00, 0x35];
        let req = ConnectRequest::read_from(&mut reader).await.unwrap();
        assert_eq!(req.command, Command::UdpAssociate);
        assert_eq!(u8::from(Command::Unknown(0x09)), 0x09);
    }

    #[tokio::test]
    async fn test_connect_request_unsupported_address_type() {
        let mut reader: &[u8] = &[0x05, 0x01, 0x00, 0x02, 1, 2, 3, 4, 0, 80];
        let err = ConnectRequest::read_from(&mut reader).await.unwrap_err();
        assert!(matches!(err, SocksError::UnsupportedAddressType(0x02)));
        assert_eq!(err.reply(), Some(Reply::AddressTypeNotSupported));
    }

    #[tokio::test]
    async fn test_connect_request_truncated_domain() {
        let mut reader: &[u8] = &[0x05, 0x01, 0x00, 0x03, 10, b'a', b'b'];
        let err = ConnectRequest::read_from(&mut reader).await.unwrap_err();
        assert!(matches!(err, SocksError::Truncated));

        let mut reader: &[u8] = &[0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0];
        let err = ConnectRequest::read_from(&mut reader).await.unwrap_err();
        assert!(matches!(err, SocksError::Truncated));
    }

    #[tokio::test]
    async fn test_connect_request_invalid_domain() {
        let mut reader: &[u8] = &[0x05, 0x01, 0x00, 0x03, 2, 0xC3, 0x28, 0, 80];
        let err = ConnectRequest::read_from(&mut reader).await.unwrap_err();
        assert!(matches!(err, SocksError::InvalidDomain));
    }

    #[tokio::test]
    async fn test_reply_encodings() {
        let cases: Vec<(Message, &[u8])> = vec![
            (Message::from(MethodSelection::new(METHOD_NO_AUTH)), &[0x05, 0x00][..]),
            (Message::from(MethodSelection::new(METHOD_PASSWORD)), &[0x05, 0x02][..]),
            (Message::from(MethodSelection::new(METHOD_NO_ACCEPTABLE)), &[0x05, 0xFF][..]),
            (Message::from(AuthReply::success()), &[0x01, 0x00][..]),
            (Message::from(AuthReply::failure()), &[0x01, 0x01][..]),
            (
                Message::from(ConnectReply::success(ATYP_IPV4)),
                &[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0][..],
            ),
            (
                Message::from(ConnectReply::success(ATYP_DOMAIN)),
                &[0x05, 0x00, 0x00, 0x03, 0, 0, 0][..],
            ),
            (
                Message::from(ConnectReply::failure(Reply::CommandNotSupported)),
                &[0x05, 0x07, 0x00, 0x01, 0, 0, 0, 0, 0, 0][..],
            ),
        ];
        for (message, expected) in cases {
            assert_eq!(message.to_bytes(), expected, "{:?}", message);
            assert_roundtrip(expected, message.kind()).await;
        }

        let v6 = Message::from(ConnectReply::success(ATYP_IPV6)).to_bytes();
        assert_eq!(v6.len(), 22);
        assert_eq!(v6[3], ATYP_IPV6);
        assert!(v6[4..].iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_connect_reply_unknown_code() {
        let mut reader: &[u8] = &[0x05, 0x09, 0x00, 0x01, 0, 0, 0, 0, 0, 0];
        let err = ConnectReply::read_from(&mut reader).await.unwrap_err();
        assert!(matches!(err, SocksError::UnknownReply(0x09)));
    }

    #[test]
    fn test_dial_error_classification() {
        assert_eq!(
            Reply::from(io::ErrorKind::ConnectionRefused),
            Reply::ConnectionRefused
        );
        assert_eq!(
            Reply::from(io::ErrorKind::HostUnreachable),
            Reply::HostUnreachable
        );
        assert_eq!(
            Reply::from(io::ErrorKind::NetworkUnreachable),
            Reply::NetworkUnreachable
        );
        assert_eq!(Reply::from(io::ErrorKind::TimedOut), Reply::TtlExpired);
        assert_eq!(Reply::from(io::ErrorKind::Other), Reply::GeneralFailure);
    }

    #[tokio::test]
    async fn test_write_message_single_unit() {
        let mut stream = tokio_test::io::Builder::new()
            .write(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
            .build();
        write_message(&mut stream, ConnectReply::success(ATYP_IPV4))
            .await
            .unwrap();
    }
}
