//! Mock 传输
//!
//! 按脚本回放入站数据报、记录出站数据报，用于在没有控制器的情况下测试控制循环。
//! [`MockTransport`] 交给被测代码，[`MockHandle`] 留在测试中注入事件和检查发送。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::{Transport, TransportError};

/// 脚本化的入站事件
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Datagram(Vec<u8>),
    Timeout,
    /// 模拟 socket 错误
    Error(std::io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    inbound: VecDeque<MockEvent>,
    sent: Vec<Vec<u8>>,
    open: bool,
    opened: Vec<(u16, Option<String>)>,
    close_count: usize,
    fail_open: bool,
    peer_known: bool,
}

/// 内存传输（被测端）
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// 测试端句柄
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockHandle { state },
        )
    }
}

impl MockHandle {
    /// 追加一个入站数据报
    pub fn push_datagram(&self, datagram: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .inbound
            .push_back(MockEvent::Datagram(datagram.into()));
    }

    /// 追加一次接收超时
    pub fn push_timeout(&self) {
        self.state.lock().inbound.push_back(MockEvent::Timeout);
    }

    pub fn push_event(&self, event: MockEvent) {
        self.state.lock().inbound.push_back(event);
    }

    /// 尚未被消费的入站事件数
    pub fn pending(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// 取出并清空已发送的数据报
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().sent)
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// 每次 `open` 的参数
    pub fn open_calls(&self) -> Vec<(u16, Option<String>)> {
        self.state.lock().opened.clone()
    }

    /// 实际关闭次数（已关闭时再次 close 不计数）
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// 让后续 `open` 失败
    pub fn fail_open(&self, fail: bool) {
        self.state.lock().fail_open = fail;
    }
}

impl Transport for MockTransport {
    fn open(&mut self, port: u16, remote_host: Option<&str>) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.opened.push((port, remote_host.map(str::to_string)));
        if state.fail_open {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "mock open failure",
            )));
        }
        state.open = true;
        state.peer_known = false;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if state.open {
            state.open = false;
            state.close_count += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        match state.inbound.pop_front() {
            Some(MockEvent::Datagram(datagram)) => {
                state.peer_known = true;
                if datagram.len() >= buf.len() {
                    return Err(TransportError::DatagramTooLarge {
                        capacity: buf.len(),
                    });
                }
                buf[..datagram.len()].copy_from_slice(&datagram);
                Ok(datagram.len())
            },
            Some(MockEvent::Error(kind)) => Err(TransportError::Io(std::io::Error::new(
                kind,
                "mock receive failure",
            ))),
            Some(MockEvent::Timeout) | None => Err(TransportError::Timeout),
        }
    }

    fn send(&mut self, datagram: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        if !state.peer_known {
            return Err(TransportError::NoPeer);
        }
        state.sent.push(datagram.to_vec());
        Ok(())
    }
}
