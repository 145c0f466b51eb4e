//! 控制循环（`ClientApplication`）
//!
//! 每次 [`ClientApplication::step`] 完成一次“收一个状态报文、最多回一个命令报文”的交换：
//!
//! 1. 带超时接收状态报文；超时则本周期错过，会话状态与上一快照均不变
//! 2. 解码为 [`RobotState`] 快照
//! 3. 状态机观察会话状态；发生转换时先调用 `on_state_change`
//! 4. 按当前会话状态调用 `monitor` / `wait_for_command` / `command`
//! 5. 指令阶段编码并发送一个命令报文（`COMMANDING_WAIT` 为保持 IPO 位置的应答）
//!
//! 单线程同步执行，没有后台线程；`step()` 需要 `&mut self`，因此不会被并发重入。
//! 协议违例（解码失败、命令不完整等）会先断开再返回错误，绝不发送错误数据。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use bytes::BytesMut;
use fri_protocol::{
    BinaryCodec, ClientCommandMode, Command, CommandPacket, LBR_JOINT_COUNT, PacketCodec,
    RobotState, SessionState, Unsupported,
};
use fri_transport::{Transport, TransportError, UdpTransport};
use tracing::{debug, error, info, warn};

use crate::client::LbrClient;
use crate::config::{ClientConfig, MissingCommandPolicy};
use crate::error::FriError;
use crate::recording::DataRecorder;
use crate::session::{Callback, SessionStateMachine};
use crate::stats::CycleStats;

/// 协作式断开句柄
///
/// 可克隆，可以交给客户端在回调中使用。请求在下一次 `step()` 开始时生效：
/// 断开连接并返回 [`FriError::NotConnected`]。
#[derive(Debug, Clone, Default)]
pub struct DisconnectHandle {
    requested: Arc<AtomicBool>,
}

impl DisconnectHandle {
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }

    fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }
}

/// FRI 控制循环
///
/// 实例独占自己的传输与状态机，多个实例之间不共享任何状态。
pub struct ClientApplication<C, T = UdpTransport, P = BinaryCodec, const N: usize = LBR_JOINT_COUNT>
where
    C: LbrClient<N>,
    T: Transport,
    P: PacketCodec<N>,
{
    transport: T,
    client: C,
    codec: P,
    config: ClientConfig,
    machine: SessionStateMachine,
    state: Option<RobotState<N>>,
    connected: bool,
    disconnect: DisconnectHandle,
    stats: CycleStats,
    recorder: Option<DataRecorder>,
    recv_buf: Vec<u8>,
    send_buf: BytesMut,
}

impl<C, T, const N: usize> ClientApplication<C, T, BinaryCodec, N>
where
    C: LbrClient<N>,
    T: Transport,
{
    /// 使用 [`BinaryCodec`]（版本取自配置）
    pub fn new(transport: T, client: C, config: ClientConfig) -> Result<Self, FriError> {
        let codec = BinaryCodec::new(config.protocol_revision);
        Self::with_codec(transport, client, codec, config)
    }
}

impl<C, T, P, const N: usize> ClientApplication<C, T, P, N>
where
    C: LbrClient<N>,
    T: Transport,
    P: PacketCodec<N>,
{
    pub fn with_codec(transport: T, client: C, codec: P, config: ClientConfig) -> Result<Self, FriError> {
        config.validate()?;
        Ok(Self {
            transport,
            client,
            codec,
            // 多一个字节用于识别超长报文
            recv_buf: vec![0; config.max_datagram_size + 1],
            send_buf: BytesMut::with_capacity(config.max_datagram_size),
            config,
            machine: SessionStateMachine::new(),
            state: None,
            connected: false,
            disconnect: DisconnectHandle::default(),
            stats: CycleStats::default(),
            recorder: None,
        })
    }

    /// 在本地 UDP 端口上等待控制器
    ///
    /// `remote_host` 为 `None` 时接受第一个发送方。已连接时先断开再重新连接。
    /// 会话状态保持 `IDLE`，直到第一次成功的 `step()`。
    pub fn connect(&mut self, port: u16, remote_host: Option<&str>) -> Result<(), FriError> {
        if self.connected {
            debug!("Reconnecting, closing current session first");
            self.disconnect();
        }
        self.transport.open(port, remote_host)?;
        self.connected = true;
        self.machine.reset();
        self.disconnect.clear();
        info!(
            "FRI client listening on port {} (remote host: {})",
            port,
            remote_host.unwrap_or("any")
        );
        Ok(())
    }

    /// 释放传输并将会话状态复位为 `IDLE`（幂等）
    pub fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.transport.close();
        self.machine.reset();
        self.connected = false;
        if let Some(Err(e)) = self.recorder.as_mut().map(DataRecorder::flush) {
            warn!("Failed to flush recording: {}", e);
        }
        info!("FRI client disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn disconnect_handle(&self) -> DisconnectHandle {
        self.disconnect.clone()
    }

    /// 执行一个控制周期
    ///
    /// 接收超时返回 [`ErrorKind::MissedCycle`](crate::ErrorKind::MissedCycle) 类错误，
    /// 状态不变，可以继续调用；会话结束类错误返回前已经断开。
    pub fn step(&mut self) -> Result<(), FriError> {
        if self.disconnect.take() {
            debug!("Disconnect requested by client");
            self.disconnect();
        }
        if !self.connected {
            return Err(FriError::NotConnected);
        }

        let len = match self
            .transport
            .receive(&mut self.recv_buf, self.config.receive_timeout())
        {
            Ok(len) => len,
            Err(TransportError::Timeout) => return Err(self.missed_cycle()),
            Err(e) => return Err(self.end_session(e.into())),
        };
        let started = Instant::now();

        let state = match self.codec.decode_state(&self.recv_buf[..len]) {
            Ok(state) => state,
            Err(e) => return Err(self.end_session(e.into())),
        };
        self.check_safety(&state);

        if let Some(transition) = self.machine.observe(state.session_state()) {
            self.stats.transitions += 1;
            debug!("Session state {} -> {}", transition.old, transition.new);
            self.client.on_state_change(transition.old, transition.new);
        }

        let packet = match self.machine.required_callback() {
            Callback::Monitor => {
                self.client.monitor(&state);
                None
            },
            Callback::WaitForCommand => {
                self.client.wait_for_command(&state);
                Some(CommandPacket::acknowledge(&state))
            },
            Callback::Command => Some(self.run_command(&state)?),
        };

        if let Some(packet) = packet {
            self.send(&packet)?;
        }

        self.record(&state);
        self.stats.record_cycle(started.elapsed());
        self.state = Some(state);
        Ok(())
    }

    fn run_command(&mut self, state: &RobotState<N>) -> Result<CommandPacket<N>, FriError> {
        if state.client_command_mode() == ClientCommandMode::CartesianPose {
            let err = Unsupported::because("cartesian pose command", "cartesian overlay is not supported");
            return Err(self.end_session(err.into()));
        }

        let mut command = Command::for_state(state);
        let failure = match self.client.command(state, &mut command) {
            Err(e) => Some(FriError::Command(e)),
            Ok(()) => command
                .missing_channel()
                .map(|channel| FriError::IncompleteCommand {
                    channel,
                    mode: command.mode(),
                }),
        };

        if let Some(err) = failure {
            match self.config.missing_command_policy {
                MissingCommandPolicy::Fault => return Err(self.end_session(err)),
                MissingCommandPolicy::HoldPosition => {
                    command.fill_hold(state.ipo_joint_position());
                    warn!("{}; sending hold command", err);
                },
            }
        }

        Ok(command.into_packet(state.revision(), state.sequence()))
    }

    fn send(&mut self, packet: &CommandPacket<N>) -> Result<(), FriError> {
        self.send_buf.clear();
        if let Err(e) = self.codec.encode_command(packet, &mut self.send_buf) {
            return Err(self.end_session(e.into()));
        }
        if let Err(e) = self.transport.send(&self.send_buf) {
            return Err(self.end_session(e.into()));
        }
        self.stats.commands_sent += 1;
        Ok(())
    }

    fn missed_cycle(&mut self) -> FriError {
        self.stats.record_missed();
        let missed = self.stats.consecutive_missed;
        warn!(
            "No state packet within {:?} ({} consecutive)",
            self.config.receive_timeout(),
            missed
        );
        match self.config.max_consecutive_missed_cycles {
            Some(limit) if missed >= limit => self.end_session(FriError::TooManyMissedCycles(missed)),
            _ => FriError::MissedCycle(self.config.receive_timeout()),
        }
    }

    /// 会话结束：断开后返回会话结束类错误，原因可经 `root_cause()` 读取
    fn end_session(&mut self, err: FriError) -> FriError {
        error!("Ending FRI session: {}", err);
        self.disconnect();
        err.into_session_ended()
    }

    fn check_safety(&self, state: &RobotState<N>) {
        let previous = self.state.as_ref().map(|s| s.safety_state());
        if previous != Some(state.safety_state()) && state.safety_state().is_stopped() {
            warn!("Controller reports safety state {:?}", state.safety_state());
        }
    }

    fn record(&mut self, state: &RobotState<N>) {
        let failed = match self.recorder.as_mut() {
            Some(recorder) => recorder.record(state).err(),
            None => None,
        };
        if let Some(e) = failed {
            warn!("Stopping data recording after write error: {}", e);
            self.recorder = None;
        }
    }

    /// 把每个完成的周期记录到 CSV 文件
    pub fn collect_data(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), FriError> {
        self.recorder = Some(DataRecorder::create(path)?);
        Ok(())
    }

    /// 停止记录并 flush
    pub fn stop_collecting(&mut self) -> Result<(), FriError> {
        if let Some(mut recorder) = self.recorder.take() {
            recorder.flush()?;
        }
        Ok(())
    }

    pub fn recorder(&self) -> Option<&DataRecorder> {
        self.recorder.as_ref()
    }

    /// 最近一个成功处理的状态快照
    pub fn state(&self) -> Option<&RobotState<N>> {
        self.state.as_ref()
    }

    pub fn session_state(&self) -> SessionState {
        self.machine.current()
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<C, T, P, const N: usize> Drop for ClientApplication<C, T, P, N>
where
    C: LbrClient<N>,
    T: Transport,
    P: PacketCodec<N>,
{
    fn drop(&mut self) {
        self.disconnect();
    }
}
