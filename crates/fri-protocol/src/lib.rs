//! # FRI Protocol
//!
//! KUKA LBR 快速机器人接口（FRI）周期协议的数据模型（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `enums`: 会话状态、安全状态、命令模式等枚举
//! - `revision`: 协议版本（V1/V2）及其能力差异
//! - `state`: 每周期的机器人状态快照 [`RobotState`]
//! - `command`: 客户端写入的命令缓冲区 [`Command`] 与命令报文
//! - `io`: 命名 IO 信号
//! - `codec`: 编解码接口 [`PacketCodec`] 与仿真用二进制布局
//!
//! ## 向量形状
//!
//! 关节数 N 是编译期常量（LBR 为 7），所有按关节索引的向量都是 `[f64; N]`。
//! 外部传入的切片只在 setter 处做一次长度校验，不截断、不补零。

pub mod codec;
pub mod command;
pub mod enums;
pub mod error;
pub mod io;
pub mod joints;
pub mod revision;
pub mod state;

pub use codec::{BinaryCodec, PacketCodec};
pub use command::{Command, CommandKind, CommandPacket, required_channels};
pub use enums::*;
pub use error::{CommandChannel, CommandError, ProtocolError, Unsupported};
pub use io::{IoSignal, IoSignals, IoValue};
pub use joints::{CARTESIAN_POSE_DIM, LBR_JOINT_COUNT, WRENCH_DIM, narrow_to_f32};
pub use revision::ProtocolRevision;
pub use state::{PoseMatrix, RobotState, RobotStateBuilder};
