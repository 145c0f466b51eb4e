//! UDP 传输
//!
//! 控制器主动向客户端端口发送状态报文，客户端向控制器回复。未指定远端主机时，
//! 第一个发送方即被视为控制器，其它地址的报文在 `close()` 之前一律丢弃。
//! 这里不做连接握手，也没有心跳：控制器的报文本身就是节拍。

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::{Transport, TransportError};

/// `set_read_timeout` 不接受零值
const MIN_READ_TIMEOUT: Duration = Duration::from_micros(1);

#[derive(Debug, Default)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    remote_filter: Option<IpAddr>,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 实际绑定的本地地址（端口 0 时由系统分配）
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        Ok(socket.local_addr()?)
    }

    /// 已锁定的对端（控制器）
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn resolve(host: &str) -> Result<IpAddr, TransportError> {
        (host, 0)
            .to_socket_addrs()
            .map_err(|e| TransportError::AddressResolution(format!("{host}: {e}")))?
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| TransportError::AddressResolution(host.to_string()))
    }
}

impl Transport for UdpTransport {
    fn open(&mut self, port: u16, remote_host: Option<&str>) -> Result<(), TransportError> {
        self.close();
        let remote_filter = remote_host.map(Self::resolve).transpose()?;
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        debug!(
            "UDP transport bound to {:?}, remote filter {:?}",
            socket.local_addr().ok(),
            remote_filter
        );
        self.socket = Some(socket);
        self.remote_filter = remote_filter;
        Ok(())
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("UDP transport closed");
        }
        self.peer = None;
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            socket.set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))?;

            match socket.recv_from(buf) {
                Ok((len, from)) => {
                    // 未指定远端主机时锁定第一个发送方，直到 close()
                    let accepted = match (self.remote_filter, self.peer) {
                        (Some(expected), _) => from.ip() == expected,
                        (None, Some(locked)) => from == locked,
                        (None, None) => true,
                    };
                    if !accepted {
                        trace!("Dropping datagram from unexpected sender {}", from);
                    } else {
                        self.peer = Some(from);
                        if len >= buf.len() {
                            return Err(TransportError::DatagramTooLarge {
                                capacity: buf.len(),
                            });
                        }
                        return Ok(len);
                    }
                },
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::Timeout);
                },
                Err(e) => return Err(TransportError::Io(e)),
            }

            if Instant::now() >= deadline {
                return Err(TransportError::Timeout);
            }
        }
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotOpen)?;
        let peer = self.peer.ok_or(TransportError::NoPeer)?;
        socket.send_to(datagram, peer)?;
        Ok(())
    }
}
