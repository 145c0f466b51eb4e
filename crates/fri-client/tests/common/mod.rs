//! 控制循环测试的公共工具
//!
//! 用 `BinaryCodec` 生成状态报文，经 `MockTransport` 注入控制循环，
//! 由 `RecordingClient` 记录回调顺序。

#![allow(dead_code)]

use bytes::BytesMut;
use fri_client::{ClientApplication, ClientConfig, DisconnectHandle, LbrClient, MissingCommandPolicy};
use fri_protocol::{
    BinaryCodec, ClientCommandMode, Command, CommandError, CommandPacket, IoValue,
    ProtocolRevision, RobotState, SessionState,
};
use fri_transport::{MockHandle, MockTransport};

pub const IPO: [f64; 7] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];

/// 回调事件
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StateChange(SessionState, SessionState),
    Monitor(SessionState),
    WaitForCommand(SessionState),
    Command(SessionState),
}

/// `command()` 的行为
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandBehavior {
    /// 写入 IPO 位置（及模式要求的零力矩/零力）
    Hold,
    /// 同一通道写两次，最后一次为 `[1.0; 7]`
    WriteTwice,
    /// 写入 6 个元素（被拒绝），忽略错误
    WrongShapeIgnored,
    /// 写入 6 个元素并把错误返回
    WrongShapePropagated,
    /// 什么也不写
    Nothing,
}

pub struct RecordingClient {
    pub events: Vec<Event>,
    pub behavior: CommandBehavior,
    pub disconnect: Option<DisconnectHandle>,
    pub disconnect_on_command: bool,
    pub rejected: Vec<CommandError>,
}

impl RecordingClient {
    pub fn new(behavior: CommandBehavior) -> Self {
        Self {
            events: Vec::new(),
            behavior,
            disconnect: None,
            disconnect_on_command: false,
            rejected: Vec::new(),
        }
    }

    pub fn state_changes(&self) -> Vec<(SessionState, SessionState)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::StateChange(old, new) => Some((*old, *new)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl LbrClient for RecordingClient {
    fn on_state_change(&mut self, old: SessionState, new: SessionState) {
        self.events.push(Event::StateChange(old, new));
    }

    fn monitor(&mut self, state: &RobotState) {
        self.events.push(Event::Monitor(state.session_state()));
    }

    fn wait_for_command(&mut self, state: &RobotState) {
        self.events.push(Event::WaitForCommand(state.session_state()));
    }

    fn command(&mut self, state: &RobotState, cmd: &mut Command<'_>) -> Result<(), CommandError> {
        self.events.push(Event::Command(state.session_state()));
        if self.disconnect_on_command {
            if let Some(handle) = &self.disconnect {
                handle.request();
            }
        }

        match self.behavior {
            CommandBehavior::Hold => {
                cmd.set_joint_position(state.ipo_joint_position())?;
                match state.client_command_mode() {
                    ClientCommandMode::Torque => cmd.set_torque(&[0.0; 7])?,
                    ClientCommandMode::Wrench => cmd.set_wrench(&[0.0; 6])?,
                    _ => {},
                }
            },
            CommandBehavior::WriteTwice => {
                cmd.set_joint_position(&[0.0; 7])?;
                cmd.set_joint_position(&[1.0; 7])?;
            },
            CommandBehavior::WrongShapeIgnored => {
                if let Err(e) = cmd.set_joint_position(&[0.0; 6]) {
                    self.rejected.push(e);
                }
            },
            CommandBehavior::WrongShapePropagated => {
                cmd.set_joint_position(&[0.0; 6])?;
            },
            CommandBehavior::Nothing => {},
        }
        Ok(())
    }
}

pub type TestApp = ClientApplication<RecordingClient, MockTransport>;

/// 已连接的控制循环与 mock 句柄
pub fn connected_app(behavior: CommandBehavior, policy: MissingCommandPolicy) -> (TestApp, MockHandle) {
    connected_app_with(behavior, ClientConfig::default().with_missing_command_policy(policy))
}

pub fn connected_app_with(behavior: CommandBehavior, config: ClientConfig) -> (TestApp, MockHandle) {
    let (transport, handle) = MockTransport::new();
    let mut app = TestApp::new(transport, RecordingClient::new(behavior), config).unwrap();
    app.connect(30200, None).unwrap();
    (app, handle)
}

pub fn codec() -> BinaryCodec {
    BinaryCodec::new(ProtocolRevision::V2)
}

pub fn state(sequence: u32, session: SessionState, mode: ClientCommandMode) -> RobotState {
    RobotState::builder(ProtocolRevision::V2)
        .sequence(sequence)
        .session_state(session)
        .client_command_mode(mode)
        .ipo_joint_position(IPO)
        .measured_joint_position(IPO)
        .io("gripper", IoValue::Boolean(false))
        .build()
}

pub fn state_packet(sequence: u32, session: SessionState, mode: ClientCommandMode) -> Vec<u8> {
    let mut out = BytesMut::new();
    codec()
        .encode_state(&state(sequence, session, mode), &mut out)
        .unwrap();
    out.to_vec()
}

/// 按顺序注入一串会话状态（JointPosition 模式）
pub fn push_sessions(handle: &MockHandle, sessions: &[SessionState]) {
    for (i, session) in sessions.iter().enumerate() {
        handle.push_datagram(state_packet(i as u32, *session, ClientCommandMode::JointPosition));
    }
}

pub fn decode_sent(handle: &MockHandle) -> Vec<CommandPacket> {
    handle
        .take_sent()
        .iter()
        .map(|datagram| codec().decode_command(datagram).unwrap())
        .collect()
}
