//! 会话状态机
//!
//! 只反映控制器上报的会话状态，从不主动发起转换。每收到一个状态报文调用一次
//! [`SessionStateMachine::observe`]；协议保证一个报文最多对应一次转换，
//! 因此不存在合并多次转换的情况。
//!
//! 连接（或 `reset`）后的第一个报文只建立基线：此前没有上一周期可比较，
//! 不产生转换通知。
//!
//! ```text
//! IDLE → MONITORING_WAIT → MONITORING_READY → COMMANDING_WAIT → COMMANDING_ACTIVE
//!              ↑                                     │                 │
//!              └─────────────── 会话丢失 ─────────────┴─────────────────┘
//! ```

use fri_protocol::SessionState;

/// 一次会话状态转换
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub old: SessionState,
    pub new: SessionState,
}

/// 本周期必须调用的客户端回调
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Monitor,
    WaitForCommand,
    Command,
}

impl Callback {
    /// 控制器是否等待本周期的响应报文
    pub fn expects_response(self) -> bool {
        !matches!(self, Callback::Monitor)
    }
}

/// 会话状态到回调的映射（全函数，无隐藏状态）
pub fn required_callback(state: SessionState) -> Callback {
    match state {
        SessionState::Idle | SessionState::MonitoringWait | SessionState::MonitoringReady => {
            Callback::Monitor
        },
        SessionState::CommandingWait => Callback::WaitForCommand,
        SessionState::CommandingActive => Callback::Command,
    }
}

/// 会话状态机
#[derive(Debug, Clone, Default)]
pub struct SessionStateMachine {
    current: SessionState,
    has_baseline: bool,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> SessionState {
        self.current
    }

    /// 记录控制器上报的状态；与当前状态不同时返回转换
    pub fn observe(&mut self, reported: SessionState) -> Option<Transition> {
        if !self.has_baseline {
            self.has_baseline = true;
            self.current = reported;
            return None;
        }
        if reported == self.current {
            return None;
        }
        let transition = Transition {
            old: self.current,
            new: reported,
        };
        self.current = reported;
        Some(transition)
    }

    /// 当前状态对应的回调
    pub fn required_callback(&self) -> Callback {
        required_callback(self.current)
    }

    /// 回到 `IDLE`（断开连接时）
    pub fn reset(&mut self) {
        self.current = SessionState::Idle;
        self.has_baseline = false;
    }
}
