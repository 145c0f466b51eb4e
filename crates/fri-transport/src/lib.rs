//! # FRI Transport
//!
//! 数据报传输抽象层。控制循环只依赖 [`Transport`] trait：
//!
//! - [`UdpTransport`]: 标准库 UDP socket（控制器的实际链路）
//! - `MockTransport`: 脚本化的内存传输（`mock` feature，用于测试）
//!
//! 传输层只负责收发字节，不理解报文内容。

use std::time::Duration;
use thiserror::Error;

pub mod udp;

#[cfg(feature = "mock")]
pub mod mock;

pub use udp::UdpTransport;

#[cfg(feature = "mock")]
pub use mock::{MockEvent, MockHandle, MockTransport};

/// FRI 默认端口
pub const DEFAULT_PORT: u16 = 30200;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Receive timeout")]
    Timeout,
    #[error("Transport not open")]
    NotOpen,
    #[error("Cannot resolve remote host: {0}")]
    AddressResolution(String),
    #[error("No peer to reply to")]
    NoPeer,
    #[error("Datagram fills the {capacity}-byte receive buffer and may be truncated")]
    DatagramTooLarge { capacity: usize },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

/// 数据报传输
///
/// 实现者须保证：`receive` 在超时后返回 [`TransportError::Timeout`]，
/// 不消费也不伪造数据；`close` 幂等。
pub trait Transport {
    /// 在本地端口上打开；`remote_host` 为 `Some` 时只接受来自该主机的数据报
    fn open(&mut self, port: u16, remote_host: Option<&str>) -> Result<(), TransportError>;

    /// 关闭（幂等）
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// 接收一个数据报，返回写入 `buf` 的字节数
    ///
    /// 数据报填满 `buf` 时返回 [`TransportError::DatagramTooLarge`]，
    /// 调用方应分配比最大合法报文多一个字节的缓冲区。
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// 向已锁定的对端（控制器）发送
    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, port: u16, remote_host: Option<&str>) -> Result<(), TransportError> {
        (**self).open(port, remote_host)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        (**self).receive(buf, timeout)
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        (**self).send(datagram)
    }
}
