//! 协议层错误类型
//!
//! 三类错误互不混用：
//! - [`ProtocolError`]：收到的数据报无法解码（会话级故障）
//! - [`CommandError`]：命令缓冲区被错误调用（调用方编程错误）
//! - [`Unsupported`]：当前协议版本/本实现尚未提供的功能（能力缺口）

use thiserror::Error;

use crate::enums::ClientCommandMode;

/// 能力缺口：功能在当前协议版本或本实现中不可用
///
/// 与传输错误、协议违例严格区分，调用方可以据此按能力分支。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{feature} is not supported{}", reason_suffix(.reason))]
pub struct Unsupported {
    /// 不可用的功能名
    pub feature: &'static str,
    /// 可选说明
    pub reason: Option<&'static str>,
}

impl Unsupported {
    pub const fn new(feature: &'static str) -> Self {
        Self {
            feature,
            reason: None,
        }
    }

    pub const fn because(feature: &'static str, reason: &'static str) -> Self {
        Self {
            feature,
            reason: Some(reason),
        }
    }
}

fn reason_suffix(reason: &Option<&'static str>) -> String {
    reason.map(|r| format!(" ({r})")).unwrap_or_default()
}

/// 数据报解码/编码错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid packet length: expected at least {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid packet magic: 0x{actual:08X} (expected 0x{expected:08X})")]
    InvalidMagic { expected: u32, actual: u32 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u8 },

    #[error("Joint count mismatch: configured {expected}, packet carries {actual}")]
    JointCountMismatch { expected: usize, actual: usize },

    #[error("Protocol revision mismatch: configured {expected}, packet carries {actual}")]
    RevisionMismatch { expected: u8, actual: u8 },

    #[error("Malformed IO block: {0}")]
    MalformedIo(String),

    #[error("{0} trailing bytes after IO block")]
    TrailingBytes(usize),

    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(String),

    #[error("{mode:?} cannot be represented in protocol revision {revision}")]
    CommandModeNotInRevision {
        mode: ClientCommandMode,
        revision: u8,
    },
}

/// 命令通道
///
/// 每个周期命令报文中可以写入的数据通道。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandChannel {
    JointPosition,
    Torque,
    Wrench,
    CartesianPose,
}

/// 命令缓冲区的调用错误
///
/// 在 setter 调用点同步返回，绝不推迟到编码阶段，也不会截断或补零。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("{channel:?} expects {expected} values, got {actual}")]
    ShapeMismatch {
        channel: CommandChannel,
        expected: usize,
        actual: usize,
    },

    #[error("{channel:?} is not commanded in client command mode {mode:?}")]
    ChannelNotCommanded {
        channel: CommandChannel,
        mode: ClientCommandMode,
    },

    #[error("Unknown IO signal: {name}")]
    UnknownIo { name: String },

    #[error("IO signal {name} is not a {expected} signal")]
    IoKindMismatch { name: String, expected: &'static str },

    #[error(transparent)]
    Unsupported(#[from] Unsupported),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let plain = Unsupported::new("ipo_redundancy_value");
        assert_eq!(format!("{}", plain), "ipo_redundancy_value is not supported");

        let with_reason = Unsupported::because("ipo_cartesian_pose", "cartesian overlay inactive");
        let msg = format!("{}", with_reason);
        assert!(msg.contains("ipo_cartesian_pose"));
        assert!(msg.contains("cartesian overlay inactive"));
    }

    #[test]
    fn test_command_error_from_unsupported() {
        let err: CommandError = Unsupported::new("set_cartesian_pose").into();
        assert!(matches!(err, CommandError::Unsupported(u) if u.feature == "set_cartesian_pose"));
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::JointCountMismatch {
            expected: 7,
            actual: 6,
        };
        assert_eq!(
            format!("{}", err),
            "Joint count mismatch: configured 7, packet carries 6"
        );

        let err = ProtocolError::InvalidMagic {
            expected: 0x4C42_5253,
            actual: 0,
        };
        assert!(format!("{}", err).contains("0x4C425253"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = CommandError::ShapeMismatch {
            channel: CommandChannel::JointPosition,
            expected: 7,
            actual: 6,
        };
        assert_eq!(format!("{}", err), "JointPosition expects 7 values, got 6");
    }
}
