//! 데이터그램 전송 계층
//!
//! - 페이로드 전송 후 응답 데이터그램 정확히 하나를 대기
//! - 응답 대기는 타임아웃/취소 가능
//! - 소켓은 전역이 아닌 인스턴스 소유

use std::borrow::Cow;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::{Config, Error, Result};

/// 프린터 주소 (host, port)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterAddr {
    pub host: String,
    pub port: u16,
}

impl PrinterAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// 호스트 이름 해석
    pub async fn resolve(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await?
            .next()
            .ok_or_else(|| Error::AddrResolve {
                addr: self.to_string(),
            })
    }
}

impl From<SocketAddr> for PrinterAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl FromStr for PrinterAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::AddrResolve { addr: s.to_string() };

        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for PrinterAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// 수신한 응답 데이터그램
#[derive(Debug, Clone)]
pub struct Ack {
    pub from: SocketAddr,
    pub payload: Bytes,
}

impl Ack {
    /// 응답 텍스트 (깨진 UTF-8 허용)
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// 전송 계층
///
/// 응답 내용은 검증하지 않음. 수신 자체만 의미 있음
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// 페이로드 전송
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// 응답 데이터그램 하나 대기
    async fn recv_ack(&self) -> Result<Ack>;

    /// 전송 후 응답 하나 대기
    async fn exchange(&self, payload: &[u8]) -> Result<Ack> {
        self.send(payload).await?;
        self.recv_ack().await
    }
}

/// UDP 전송 계층
pub struct UdpTransport {
    socket: UdpSocket,
    printer: SocketAddr,
    ack_timeout: Option<Duration>,
    recv_buffer_size: usize,
    cancel: CancelToken,
}

impl UdpTransport {
    /// 임시 포트로 바인딩 후 프린터 주소 고정
    pub async fn connect(printer: &PrinterAddr, config: &Config) -> Result<Self> {
        let printer = printer.resolve().await?;
        let bind_addr = match printer {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        Self::bind(bind_addr, printer, config).await
    }

    pub async fn bind(bind_addr: SocketAddr, printer: SocketAddr, config: &Config) -> Result<Self> {
        config.validate()?;

        let socket = UdpSocket::bind(bind_addr).await?;
        if config.broadcast {
            socket.set_broadcast(true)?;
        }

        info!("UDP 전송 준비: {} -> {}", socket.local_addr()?, printer);

        Ok(Self {
            socket,
            printer,
            ack_timeout: config.ack_timeout(),
            recv_buffer_size: config.recv_buffer_size,
            cancel: CancelToken::never(),
        })
    }

    /// 취소 토큰 연결
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 해석된 프린터 주소
    pub fn printer_addr(&self) -> SocketAddr {
        self.printer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    async fn recv_with_timeout(
        socket: &UdpSocket,
        buf: &mut [u8],
        limit: Option<Duration>,
    ) -> Result<(usize, SocketAddr)> {
        match limit {
            Some(limit) => tokio::time::timeout(limit, socket.recv_from(buf))
                .await
                .map_err(|_| Error::AckTimeout {
                    timeout_ms: limit.as_millis() as u64,
                })?
                .map_err(Error::from),
            None => Ok(socket.recv_from(buf).await?),
        }
    }
}

impl Transport for UdpTransport {
    async fn send(&self, payload: &[u8]) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.socket.send_to(payload, self.printer).await?;
        Ok(())
    }

    async fn recv_ack(&self) -> Result<Ack> {
        let mut buf = vec![0u8; self.recv_buffer_size];

        let received = tokio::select! {
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = Self::recv_with_timeout(&self.socket, &mut buf, self.ack_timeout) => result,
        };
        let (len, from) = received?;

        buf.truncate(len);
        let ack = Ack {
            from,
            payload: Bytes::from(buf),
        };
        debug!("응답 수신 from {}: {}", ack.from, ack.text().trim_end());

        Ok(ack)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! 테스트용 기록 전송 계층

    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use super::*;

    /// 보낸 페이로드를 기록하고 미리 정한 응답을 돌려주는 전송 계층
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<Vec<u8>>>,
        pub acks_read: Mutex<usize>,
        replies: Mutex<VecDeque<Result<Ack>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                acks_read: Mutex::new(0),
                replies: Mutex::new(VecDeque::new()),
            }
        }

        /// 다음 응답 대기를 실패시킴
        pub fn fail_next_ack(&self, err: Error) {
            self.replies.lock().push_back(Err(err));
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().clone()
        }

        pub fn sent_text(&self) -> Vec<String> {
            self.sent()
                .iter()
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .collect()
        }

        pub fn acks_read(&self) -> usize {
            *self.acks_read.lock()
        }
    }

    impl Transport for RecordingTransport {
        async fn send(&self, payload: &[u8]) -> Result<()> {
            self.sent.lock().push(payload.to_vec());
            Ok(())
        }

        async fn recv_ack(&self) -> Result<Ack> {
            *self.acks_read.lock() += 1;
            match self.replies.lock().pop_front() {
                Some(reply) => reply,
                None => Ok(Ack {
                    from: SocketAddr::from((Ipv4Addr::LOCALHOST, 8899)),
                    payload: Bytes::from_static(b"ok"),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;

    #[test]
    fn test_printer_addr_parse() {
        let addr: PrinterAddr = "192.168.1.50:8899".parse().unwrap();
        assert_eq!(addr, PrinterAddr::new("192.168.1.50", 8899));
        assert_eq!(addr.to_string(), "192.168.1.50:8899");

        let v6: PrinterAddr = "[::1]:8899".parse().unwrap();
        assert_eq!(v6.host, "::1");
        assert_eq!(v6.to_string(), "[::1]:8899");

        assert!("printer".parse::<PrinterAddr>().is_err());
        assert!("printer:99999".parse::<PrinterAddr>().is_err());
        assert!(":8899".parse::<PrinterAddr>().is_err());
    }

    #[tokio::test]
    async fn test_exchange_reads_one_reply() {
        let printer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let printer_addr = printer.local_addr().unwrap();

        let transport = UdpTransport::connect(&printer_addr.into(), &Config::immediate())
            .await
            .unwrap();
        assert_eq!(transport.printer_addr(), printer_addr);

        let echo = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, from) = printer.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], b"M4001");
            printer.send_to(b"ok\r\n", from).await.unwrap();
        });

        let ack = transport.exchange(b"M4001").await.unwrap();
        assert_eq!(ack.text(), "ok\r\n");
        assert_eq!(ack.from, printer_addr);
        echo.await.unwrap();
    }

    #[tokio::test]
    async fn test_ack_timeout() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = Config::immediate();
        config.ack_timeout_ms = 50;

        let transport = UdpTransport::connect(&silent.local_addr().unwrap().into(), &config)
            .await
            .unwrap();

        let err = transport.exchange(b"M4001").await.unwrap_err();
        assert!(matches!(err, Error::AckTimeout { timeout_ms: 50 }));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_wait() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let (handle, token) = cancel_pair();

        let transport = UdpTransport::connect(&silent.local_addr().unwrap().into(), &Config::blocking())
            .await
            .unwrap()
            .with_cancel(token);

        let cancel_later = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };

        let (result, ()) = tokio::time::timeout(
            Duration::from_secs(1),
            async { tokio::join!(transport.exchange(b"G28"), cancel_later) },
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
