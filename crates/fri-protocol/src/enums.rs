//! 会话与机器人状态枚举
//!
//! 数值与控制器 SDK 的枚举值保持一致（`repr(u8)`），解码时用
//! `num_enum::TryFromPrimitive` 拒绝越界值，而不是静默回落到默认值：
//! 越界的会话状态是协议违例。

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::ProtocolError;

/// FRI 会话状态（有序生命周期）
///
/// `IDLE → MONITORING_WAIT → MONITORING_READY → COMMANDING_WAIT → COMMANDING_ACTIVE`，
/// 控制器报告会话丢失时可从 `COMMANDING_*` 回落到 `MONITORING_WAIT`。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SessionState {
    /// 无会话（初始状态，也是断开后的回落目标）
    Idle = 0,
    /// 监控阶段，等待连接质量达标
    MonitoringWait = 1,
    /// 监控阶段，已可进入指令阶段
    MonitoringReady = 2,
    /// 控制器等待客户端确认可开始下发指令
    CommandingWait = 3,
    /// 每周期都需要下发控制数据
    CommandingActive = 4,
}

impl SessionState {
    /// 全部会话状态（按生命周期顺序）
    pub const ALL: [SessionState; 5] = [
        SessionState::Idle,
        SessionState::MonitoringWait,
        SessionState::MonitoringReady,
        SessionState::CommandingWait,
        SessionState::CommandingActive,
    ];

    /// 控制器名称（大写下划线形式）
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::MonitoringWait => "MONITORING_WAIT",
            SessionState::MonitoringReady => "MONITORING_READY",
            SessionState::CommandingWait => "COMMANDING_WAIT",
            SessionState::CommandingActive => "COMMANDING_ACTIVE",
        }
    }

    /// 是否处于指令阶段（控制器等待客户端应答）
    pub fn is_commanding(self) -> bool {
        matches!(
            self,
            SessionState::CommandingWait | SessionState::CommandingActive
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 连接质量（仅供参考，本核心不据此做控制决策）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ConnectionQuality {
    Poor = 0,
    Fair = 1,
    Good = 2,
    Excellent = 3,
}

/// 安全状态（严重程度单调递增）
///
/// 停机行为由控制器负责，客户端只能观察。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SafetyState {
    NormalOperation = 0,
    SafetyStopLevel0 = 1,
    SafetyStopLevel1 = 2,
    SafetyStopLevel2 = 3,
}

impl SafetyState {
    pub fn is_stopped(self) -> bool {
        self != SafetyState::NormalOperation
    }
}

/// 操作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OperationMode {
    TestMode1 = 0,
    TestMode2 = 1,
    AutomaticMode = 2,
}

/// 驱动状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum DriveState {
    Off = 0,
    Transitioning = 1,
    Active = 2,
}

/// 控制器侧控制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ControlMode {
    PositionControlMode = 0,
    CartImpControlMode = 1,
    JointImpControlMode = 2,
    NoControl = 3,
}

/// 叠加类型：控制器是否把客户端指令叠加到自身插补轨迹上
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum OverlayType {
    NoOverlay = 0,
    Joint = 1,
    Cartesian = 2,
}

/// 冗余策略（仅运动学冗余机械臂，协议 V2）
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RedundancyStrategy {
    E1 = 0,
    NoStrategy = 4,
}

/// 本周期控制器期望的客户端指令通道
///
/// 成员集合随协议版本变化（V1 只有单一 `POSITION`，V2 拆分为
/// `JOINT_POSITION`/`CARTESIAN_POSE`），因此这里不带线上数值，
/// 由 [`ProtocolRevision`](crate::ProtocolRevision) 负责编解码。
/// V1 的 `POSITION` 映射为 [`ClientCommandMode::JointPosition`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ClientCommandMode {
    #[default]
    NoCommandMode,
    Wrench,
    Torque,
    JointPosition,
    CartesianPose,
}

// 线上枚举的默认值单独实现：`num_enum` 会把 `#[default]` 变体当作
// 解码兜底值，这里必须保持越界即报错。
macro_rules! impl_default {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(
            impl Default for $ty {
                fn default() -> Self {
                    $ty::$variant
                }
            }
        )*
    };
}

impl_default! {
    SessionState => Idle,
    ConnectionQuality => Poor,
    SafetyState => NormalOperation,
    OperationMode => TestMode1,
    DriveState => Off,
    ControlMode => NoControl,
    OverlayType => NoOverlay,
    RedundancyStrategy => NoStrategy,
}

/// 把 `TryFromPrimitive` 失败转换成带字段名的协议错误
pub(crate) fn decode_enum<T>(field: &'static str, value: u8) -> Result<T, ProtocolError>
where
    T: TryFromPrimitive<Primitive = u8>,
{
    T::try_from_primitive(value).map_err(|_| ProtocolError::InvalidValue { field, value })
}
