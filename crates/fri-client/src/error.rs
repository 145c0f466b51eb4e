//! 客户端错误类型定义
//!
//! 调用方通过 [`FriError::kind`] 区分四类情况：本周期错过（重试即可）、
//! 会话已结束、API 用法错误、当前版本不支持的功能。

use std::time::Duration;

use fri_protocol::{ClientCommandMode, CommandChannel, CommandError, ProtocolError, Unsupported};
use fri_transport::TransportError;
use thiserror::Error;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 本周期未收到状态报文，会话状态未改变，可继续 `step()`
    MissedCycle,
    /// 会话已结束（已断开），需重新 `connect()`
    SessionEnded,
    /// API 调用方式错误
    Usage,
    /// 当前协议版本/实现不支持该功能
    Unsupported,
}

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum FriError {
    /// 接收超时
    #[error("Missed cycle: no state packet within {0:?}")]
    MissedCycle(Duration),

    /// 连续超时次数超过配置上限
    #[error("Session ended after {0} consecutive missed cycles")]
    TooManyMissedCycles(u32),

    /// 传输层错误（超时除外）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 报文解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// `command()` 返回时必需通道未写入
    #[error("Incomplete command: {channel:?} not written in client command mode {mode:?}")]
    IncompleteCommand {
        channel: CommandChannel,
        mode: ClientCommandMode,
    },

    /// `command()` 回调返回的错误
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// 未连接（或已通过 `DisconnectHandle` 请求断开）
    #[error("Not connected")]
    NotConnected,

    #[error(transparent)]
    Unsupported(#[from] Unsupported),

    /// 配置无效
    #[error("Invalid config: {0}")]
    Config(String),

    /// 数据记录文件错误
    #[error("Recorder IO error: {0}")]
    Recorder(#[from] std::io::Error),

    /// 会话因 `cause` 结束（已断开）
    ///
    /// 本身不属于会话结束类的错误（如 `command()` 返回的用法错误）在断开后包装为此变体。
    #[error("Session ended: {cause}")]
    SessionEnded {
        #[source]
        cause: Box<FriError>,
    },
}

impl FriError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FriError::MissedCycle(_) => ErrorKind::MissedCycle,
            FriError::Transport(TransportError::Timeout) => ErrorKind::MissedCycle,
            FriError::Transport(TransportError::NotOpen) => ErrorKind::Usage,
            FriError::SessionEnded { .. }
            | FriError::TooManyMissedCycles(_)
            | FriError::Transport(_)
            | FriError::Protocol(_)
            | FriError::IncompleteCommand { .. } => ErrorKind::SessionEnded,
            FriError::Command(CommandError::Unsupported(_)) | FriError::Unsupported(_) => {
                ErrorKind::Unsupported
            },
            FriError::Command(_)
            | FriError::NotConnected
            | FriError::Config(_)
            | FriError::Recorder(_) => ErrorKind::Usage,
        }
    }

    /// 包装为会话结束错误（已是会话结束类时原样返回）
    pub fn into_session_ended(self) -> FriError {
        if self.kind() == ErrorKind::SessionEnded {
            self
        } else {
            FriError::SessionEnded {
                cause: Box::new(self),
            }
        }
    }

    /// 最内层的原因
    pub fn root_cause(&self) -> &FriError {
        match self {
            FriError::SessionEnded { cause } => cause.root_cause(),
            other => other,
        }
    }

    /// 是否只是错过本周期
    pub fn is_missed_cycle(&self) -> bool {
        self.kind() == ErrorKind::MissedCycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        assert_eq!(
            FriError::MissedCycle(Duration::from_millis(100)).kind(),
            ErrorKind::MissedCycle
        );
        assert_eq!(
            FriError::Protocol(ProtocolError::InvalidValue {
                field: "session_state",
                value: 9
            })
            .kind(),
            ErrorKind::SessionEnded
        );
        assert_eq!(FriError::NotConnected.kind(), ErrorKind::Usage);
        assert_eq!(
            FriError::Unsupported(Unsupported::new("ipo_cartesian_pose")).kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn test_command_error_kind_follows_cause() {
        let shape = CommandError::ShapeMismatch {
            channel: CommandChannel::JointPosition,
            expected: 7,
            actual: 6,
        };
        assert_eq!(FriError::from(shape).kind(), ErrorKind::Usage);

        let unsupported = CommandError::from(Unsupported::new("set_cartesian_pose"));
        assert_eq!(FriError::from(unsupported).kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_session_ended_wraps_other_kinds() {
        let shape = CommandError::ShapeMismatch {
            channel: CommandChannel::JointPosition,
            expected: 7,
            actual: 6,
        };
        let err = FriError::from(shape.clone()).into_session_ended();
        assert_eq!(err.kind(), ErrorKind::SessionEnded);
        assert!(matches!(err.root_cause(), FriError::Command(e) if *e == shape));
        assert!(err.to_string().starts_with("Session ended: "));
        assert!(std::error::Error::source(&err).is_some());

        let err = FriError::Unsupported(Unsupported::new("cartesian pose command")).into_session_ended();
        assert_eq!(err.kind(), ErrorKind::SessionEnded);
        assert_eq!(err.root_cause().kind(), ErrorKind::Unsupported);

        // 已是会话结束类，不重复包装
        let err = FriError::TooManyMissedCycles(3).into_session_ended();
        assert!(matches!(err, FriError::TooManyMissedCycles(3)));
    }

    #[test]
    fn test_transport_error_kinds() {
        assert!(FriError::Transport(TransportError::Timeout).is_missed_cycle());
        assert_eq!(
            FriError::Transport(TransportError::NoPeer).kind(),
            ErrorKind::SessionEnded
        );
    }

    #[test]
    fn test_display() {
        let err = FriError::IncompleteCommand {
            channel: CommandChannel::Torque,
            mode: ClientCommandMode::Torque,
        };
        assert!(err.to_string().contains("Torque"));
        assert_eq!(FriError::NotConnected.to_string(), "Not connected");
    }
}
