//! 外部自动化接口（UDP）
//!
//! 控制器在固定端口 30300 上接收文本控制报文，用于在 AUT EXT 模式下启动、
//! 暂停默认应用并查询其状态。它与 FRI 周期链路相互独立：FRI 客户端通常在
//! 应用启动之后才开始收到状态报文。
//!
//! 每条控制报文都带一个递增的报文计数；控制器在收到报文后回复一条状态报文，
//! 其中回传它最近收到的计数。
//!
//! 控制器启用 `App_Enable` 信号时，100 ms 内未收到 `App_Enable;true` 就会暂停
//! 应用，此时 [`ExternalClient::app_start`] 会启动后台心跳线程持续发送该信号。

pub mod message;

use parking_lot::Mutex;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

pub use message::{AppState, ControlMessage, ControllerStatus, ExternalErrorCode, InputSignal};

/// 控制器默认地址
pub const DEFAULT_CONTROLLER_IP: Ipv4Addr = Ipv4Addr::new(172, 31, 1, 147);
/// 外部自动化接口的固定端口
pub const EXTERNAL_PORT: u16 = 30300;

const MAX_STATUS_SIZE: usize = 1024;
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// 外部自动化接口错误
#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No status message from the controller within the timeout")]
    Timeout,

    #[error("Malformed status message: {0}")]
    MalformedStatus(String),

    #[error("Malformed control message: {0}")]
    MalformedControl(String),

    #[error("Unknown error id {0}")]
    UnknownErrorId(i32),

    #[error("Unknown application state {0}")]
    UnknownAppState(String),

    #[error("Stopping the application requires App_Enable support on the controller")]
    AppEnableUnsupported,
}

/// 外部接口配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalConfig {
    /// 控制器地址
    pub controller: SocketAddr,
    /// 第一条控制报文的计数为 `initial_counter + 1`
    pub initial_counter: u64,
    /// 控制器是否评估 `App_Enable` 信号
    pub app_enable_supported: bool,
    /// 等待状态报文的超时
    pub receive_timeout: Duration,
    /// `App_Enable;true` 心跳间隔，必须小于控制器的 100 ms 窗口
    pub heartbeat_interval: Duration,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            controller: SocketAddr::new(IpAddr::V4(DEFAULT_CONTROLLER_IP), EXTERNAL_PORT),
            initial_counter: 0,
            app_enable_supported: false,
            receive_timeout: Duration::from_millis(100),
            heartbeat_interval: Duration::from_millis(50),
        }
    }
}

/// 发送通道，主线程与心跳线程共用
///
/// 计数的递增与发送在同一把锁内完成，保证控制器看到的计数严格递增。
#[derive(Clone)]
struct Link {
    socket: Arc<UdpSocket>,
    controller: SocketAddr,
    counter: Arc<Mutex<u64>>,
}

impl Link {
    fn send(&self, signal: InputSignal, value: bool) -> io::Result<u64> {
        let mut counter = self.counter.lock();
        let message = ControlMessage {
            timestamp_ms: now_ms(),
            counter: *counter + 1,
            signal,
            value,
        };
        let text = message.to_string();
        self.socket.send_to(text.as_bytes(), self.controller)?;
        *counter = message.counter;
        trace!("Sent {}", text);
        Ok(message.counter)
    }
}

/// `App_Enable;true` 心跳线程
struct Heartbeat {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    fn start(link: Link, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let handle = thread::spawn(move || {
            while !stop_clone.load(Ordering::Relaxed) {
                if let Err(e) = link.send(InputSignal::AppEnable, true) {
                    warn!("App_Enable heartbeat failed: {}", e);
                }
                thread::sleep(interval);
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 外部自动化接口客户端
///
/// 丢弃客户端只停止心跳，不发送 `App_Enable;false`；控制器会在 100 ms 后自行暂停应用。
pub struct ExternalClient {
    link: Link,
    config: ExternalConfig,
    heartbeat: Option<Heartbeat>,
}

impl ExternalClient {
    /// 在本机任意端口上打开套接字
    pub fn connect(config: ExternalConfig) -> Result<Self, ExternalError> {
        let bind_ip: IpAddr = match config.controller {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => std::net::Ipv6Addr::UNSPECIFIED.into(),
        };
        let socket = UdpSocket::bind((bind_ip, 0))?;
        debug!(
            "External interface {} -> {}",
            socket.local_addr()?,
            config.controller
        );
        Ok(Self {
            link: Link {
                socket: Arc::new(socket),
                controller: config.controller,
                counter: Arc::new(Mutex::new(config.initial_counter)),
            },
            config,
            heartbeat: None,
        })
    }

    pub fn config(&self) -> &ExternalConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ExternalError> {
        Ok(self.link.socket.local_addr()?)
    }

    /// 最近一条控制报文的计数
    pub fn counter(&self) -> u64 {
        *self.link.counter.lock()
    }

    /// 重设报文计数
    ///
    /// 出现 `INCORRECT_DATA_PACKET_COUNTER` 时，把计数对齐到状态报文中的
    /// `counter_received`。
    pub fn set_counter(&self, counter: u64) {
        *self.link.counter.lock() = counter;
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.heartbeat.as_ref().is_some_and(Heartbeat::is_running)
    }

    /// 查询状态
    pub fn get_state(&self) -> Result<ControllerStatus, ExternalError> {
        self.request(InputSignal::GetState, true)
    }

    /// 启动默认应用，支持 `App_Enable` 时先启动心跳
    pub fn app_start(&mut self) -> Result<ControllerStatus, ExternalError> {
        if self.config.app_enable_supported && !self.is_heartbeat_running() {
            info!("Starting App_Enable heartbeat every {:?}", self.config.heartbeat_interval);
            self.heartbeat = Some(Heartbeat::start(
                self.link.clone(),
                self.config.heartbeat_interval,
            ));
        }
        info!("Requesting application start");
        self.request(InputSignal::AppStart, true)
    }

    /// 暂停默认应用
    ///
    /// 只有控制器评估 `App_Enable` 时可用；否则需在示教器上停止应用。
    pub fn app_stop(&mut self) -> Result<ControllerStatus, ExternalError> {
        if !self.config.app_enable_supported {
            return Err(ExternalError::AppEnableUnsupported);
        }
        // 先停心跳，避免 `true` 排在 `false` 之后
        if let Some(mut heartbeat) = self.heartbeat.take() {
            heartbeat.shutdown();
            info!("App_Enable heartbeat stopped");
        }
        info!("Requesting application stop");
        self.request(InputSignal::AppEnable, false)
    }

    pub fn app_restart(&mut self) -> Result<ControllerStatus, ExternalError> {
        self.app_stop()?;
        self.app_start()
    }

    /// 单独发送一次 `App_Enable;true`，不等待状态报文
    pub fn app_enable(&self) -> Result<u64, ExternalError> {
        Ok(self.link.send(InputSignal::AppEnable, true)?)
    }

    /// 发送控制报文并等待对应的状态报文
    ///
    /// 心跳报文的回复会先于本次回复到达；`counter_received` 小于本次计数的无错误状态报文被跳过。
    fn request(&self, signal: InputSignal, value: bool) -> Result<ControllerStatus, ExternalError> {
        let counter = self.link.send(signal, value)?;
        debug!("Sent {}={} (counter {})", signal, value, counter);

        let socket = &self.link.socket;
        let deadline = Instant::now() + self.config.receive_timeout;
        let mut buf = [0u8; MAX_STATUS_SIZE];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ExternalError::Timeout);
            }
            socket.set_read_timeout(Some(remaining.max(MIN_READ_TIMEOUT)))?;

            let (len, from) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Err(ExternalError::Timeout);
                },
                Err(e) => return Err(e.into()),
            };
            if from.ip() != self.config.controller.ip() {
                trace!("Dropping datagram from unexpected host {}", from);
                continue;
            }

            let text = std::str::from_utf8(&buf[..len])
                .map_err(|e| ExternalError::MalformedStatus(e.to_string()))?;
            let status: ControllerStatus = text.parse()?;
            if status.counter_received < counter && !status.error.is_error() {
                trace!("Skipping status for counter {}", status.counter_received);
                continue;
            }

            for problem in status.problems() {
                warn!("[{}, {}] {}", status.counter_sent, status.counter_received, problem);
            }
            debug!("Application state: {}", status.app_state);
            return Ok(status);
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
