//! 命令缓冲区与命令报文
//!
//! [`Command`] 是每个指令周期新建的写缓冲区：由控制循环按本周期的
//! `ClientCommandMode` 创建，客户端在 `command()` 中填写，编码一次后丢弃。
//! 不跨周期复用，因此不会把上一周期的数据带到下一周期。
//!
//! 通道可用性（与控制器 SDK 一致）：
//!
//! | ClientCommandMode | 可写通道 |
//! |-------------------|----------|
//! | `JointPosition` | joint position |
//! | `Torque` | joint position + torque |
//! | `Wrench` | joint position + wrench |
//! | `CartesianPose` | Cartesian pose（本实现不支持） |
//! | `NoCommandMode` | 无 |

use crate::enums::ClientCommandMode;
use crate::error::{CommandChannel, CommandError, Unsupported};
use crate::io::{IoSignals, IoValue};
use crate::joints::{LBR_JOINT_COUNT, WRENCH_DIM, copy_exact};
use crate::revision::ProtocolRevision;
use crate::state::{PoseMatrix, RobotState};

const CARTESIAN_OVERLAY_UNSUPPORTED: &str = "cartesian overlay is not supported";

/// 某指令模式下允许（且必须）写入的通道
pub fn required_channels(mode: ClientCommandMode) -> &'static [CommandChannel] {
    match mode {
        ClientCommandMode::NoCommandMode => &[],
        ClientCommandMode::JointPosition => &[CommandChannel::JointPosition],
        ClientCommandMode::Torque => &[CommandChannel::JointPosition, CommandChannel::Torque],
        ClientCommandMode::Wrench => &[CommandChannel::JointPosition, CommandChannel::Wrench],
        ClientCommandMode::CartesianPose => &[CommandChannel::CartesianPose],
    }
}

/// 单周期命令缓冲区（`LBRCommand`）
///
/// 所有 setter 在调用点同步校验：通道必须属于本周期的指令模式，
/// 向量长度必须等于 N（wrench 为 6）。校验失败时缓冲区保持不变。
/// 同一通道多次写入以最后一次为准。
#[derive(Debug, Clone)]
pub struct Command<'a, const N: usize = LBR_JOINT_COUNT> {
    mode: ClientCommandMode,
    declared_io: &'a IoSignals,
    joint_position: Option<[f64; N]>,
    torque: Option<[f64; N]>,
    wrench: Option<[f64; WRENCH_DIM]>,
    io: IoSignals,
}

impl<'a, const N: usize> Command<'a, N> {
    /// 为当前周期创建空缓冲区
    pub fn for_state(state: &'a RobotState<N>) -> Self {
        Self::new(state.client_command_mode(), state.io_signals())
    }

    /// 以指定模式和已声明的 IO 创建空缓冲区
    pub fn new(mode: ClientCommandMode, declared_io: &'a IoSignals) -> Self {
        Self {
            mode,
            declared_io,
            joint_position: None,
            torque: None,
            wrench: None,
            io: IoSignals::new(),
        }
    }

    /// 本周期控制器期望的指令模式
    pub fn mode(&self) -> ClientCommandMode {
        self.mode
    }

    pub fn joint_position(&self) -> Option<&[f64; N]> {
        self.joint_position.as_ref()
    }

    pub fn torque(&self) -> Option<&[f64; N]> {
        self.torque.as_ref()
    }

    pub fn wrench(&self) -> Option<&[f64; WRENCH_DIM]> {
        self.wrench.as_ref()
    }

    pub fn io_values(&self) -> &IoSignals {
        &self.io
    }

    /// 缓冲区是否未写入任何数据
    pub fn is_empty(&self) -> bool {
        self.joint_position.is_none()
            && self.torque.is_none()
            && self.wrench.is_none()
            && self.io.is_empty()
    }

    fn ensure_commanded(&self, channel: CommandChannel) -> Result<(), CommandError> {
        if required_channels(self.mode).contains(&channel) {
            Ok(())
        } else {
            Err(CommandError::ChannelNotCommanded {
                channel,
                mode: self.mode,
            })
        }
    }

    /// 写入关节位置（rad，长度 N）
    pub fn set_joint_position(&mut self, values: &[f64]) -> Result<(), CommandError> {
        self.ensure_commanded(CommandChannel::JointPosition)?;
        self.joint_position = Some(copy_exact(CommandChannel::JointPosition, values)?);
        Ok(())
    }

    /// 写入关节力矩（Nm，长度 N，仅 `Torque` 模式）
    pub fn set_torque(&mut self, values: &[f64]) -> Result<(), CommandError> {
        self.ensure_commanded(CommandChannel::Torque)?;
        self.torque = Some(copy_exact(CommandChannel::Torque, values)?);
        Ok(())
    }

    /// 写入末端力/力矩 `[F_x, F_y, F_z, tau_A, tau_B, tau_C]`（仅 `Wrench` 模式）
    pub fn set_wrench(&mut self, values: &[f64]) -> Result<(), CommandError> {
        self.ensure_commanded(CommandChannel::Wrench)?;
        self.wrench = Some(copy_exact(CommandChannel::Wrench, values)?);
        Ok(())
    }

    /// Cartesian 位姿指令（未支持）
    pub fn set_cartesian_pose(&mut self, _values: &[f64]) -> Result<(), CommandError> {
        Err(Unsupported::because("set_cartesian_pose", CARTESIAN_OVERLAY_UNSUPPORTED).into())
    }

    /// Cartesian 位姿指令（矩阵形式，未支持）
    pub fn set_cartesian_pose_as_matrix(&mut self, _matrix: &PoseMatrix) -> Result<(), CommandError> {
        Err(Unsupported::because(
            "set_cartesian_pose_as_matrix",
            CARTESIAN_OVERLAY_UNSUPPORTED,
        )
        .into())
    }

    pub fn set_boolean_io_value(&mut self, name: &str, value: bool) -> Result<(), CommandError> {
        self.set_io(name, IoValue::Boolean(value))
    }

    pub fn set_digital_io_value(&mut self, name: &str, value: u64) -> Result<(), CommandError> {
        self.set_io(name, IoValue::Digital(value))
    }

    pub fn set_analog_io_value(&mut self, name: &str, value: f64) -> Result<(), CommandError> {
        self.set_io(name, IoValue::Analog(value))
    }

    fn set_io(&mut self, name: &str, value: IoValue) -> Result<(), CommandError> {
        let declared = self
            .declared_io
            .get(name)
            .ok_or_else(|| CommandError::UnknownIo {
                name: name.to_string(),
            })?;
        if !declared.same_kind(&value) {
            return Err(CommandError::IoKindMismatch {
                name: name.to_string(),
                expected: declared.kind_name(),
            });
        }
        self.io.set(name, value);
        Ok(())
    }

    /// 第一个未写入的必需通道
    pub fn missing_channel(&self) -> Option<CommandChannel> {
        required_channels(self.mode).iter().copied().find(|channel| match channel {
            CommandChannel::JointPosition => self.joint_position.is_none(),
            CommandChannel::Torque => self.torque.is_none(),
            CommandChannel::Wrench => self.wrench.is_none(),
            // 无法写入，始终缺失
            CommandChannel::CartesianPose => true,
        })
    }

    /// 用安全默认值补齐缺失通道：关节位置保持 IPO 位置，力矩/力为零
    ///
    /// 返回是否发生了补齐。Cartesian 通道无法补齐。
    pub fn fill_hold(&mut self, ipo_joint_position: &[f64; N]) -> bool {
        let mut filled = false;
        for channel in required_channels(self.mode) {
            match channel {
                CommandChannel::JointPosition if self.joint_position.is_none() => {
                    self.joint_position = Some(*ipo_joint_position);
                    filled = true;
                },
                CommandChannel::Torque if self.torque.is_none() => {
                    self.torque = Some([0.0; N]);
                    filled = true;
                },
                CommandChannel::Wrench if self.wrench.is_none() => {
                    self.wrench = Some([0.0; WRENCH_DIM]);
                    filled = true;
                },
                _ => {},
            }
        }
        filled
    }

    /// 消费缓冲区，生成控制命令报文
    pub fn into_packet(self, revision: ProtocolRevision, sequence: u32) -> CommandPacket<N> {
        CommandPacket {
            revision,
            reflected_sequence: sequence,
            kind: CommandKind::Control,
            mode: self.mode,
            joint_position: self.joint_position,
            torque: self.torque,
            wrench: self.wrench,
            io: self.io,
        }
    }
}

/// 命令报文类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `COMMANDING_WAIT` 阶段的应答（保持 IPO 位置）
    Acknowledge,
    /// `COMMANDING_ACTIVE` 阶段的完整控制数据
    Control,
}

/// 编码前的命令报文
#[derive(Debug, Clone, PartialEq)]
pub struct CommandPacket<const N: usize = LBR_JOINT_COUNT> {
    pub revision: ProtocolRevision,
    /// 回传状态报文的序号
    pub reflected_sequence: u32,
    pub kind: CommandKind,
    pub mode: ClientCommandMode,
    pub joint_position: Option<[f64; N]>,
    pub torque: Option<[f64; N]>,
    pub wrench: Option<[f64; WRENCH_DIM]>,
    pub io: IoSignals,
}

impl<const N: usize> CommandPacket<N> {
    /// `COMMANDING_WAIT` 阶段的应答：保持当前 IPO 关节位置
    pub fn acknowledge(state: &RobotState<N>) -> Self {
        Self {
            revision: state.revision(),
            reflected_sequence: state.sequence(),
            kind: CommandKind::Acknowledge,
            mode: state.client_command_mode(),
            joint_position: Some(*state.ipo_joint_position()),
            torque: None,
            wrench: None,
            io: IoSignals::new(),
        }
    }
}
