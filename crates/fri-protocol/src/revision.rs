//! 协议版本
//!
//! `ClientCommandMode` 的成员和若干状态字段随控制器 SDK 主版本变化：
//!
//! | 线上值 | V1 | V2 |
//! |--------|----|----|
//! | 0 | NO_COMMAND_MODE | NO_COMMAND_MODE |
//! | 1 | POSITION | JOINT_POSITION |
//! | 2 | WRENCH | WRENCH |
//! | 3 | TORQUE | TORQUE |
//! | 4 | - | CARTESIAN_POSE |
//!
//! 状态字段：V1 携带 commanded joint position；V2 携带 measured
//! Cartesian pose、measured redundancy value 与 redundancy strategy。

use semver::Version;

use crate::enums::ClientCommandMode;
use crate::error::ProtocolError;

/// 协议版本（按控制器 SDK 主版本划分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProtocolRevision {
    V1,
    #[default]
    V2,
}

impl ProtocolRevision {
    /// 线上版本号
    pub fn wire_id(self) -> u8 {
        match self {
            ProtocolRevision::V1 => 1,
            ProtocolRevision::V2 => 2,
        }
    }

    pub fn from_wire_id(id: u8) -> Result<Self, ProtocolError> {
        match id {
            1 => Ok(ProtocolRevision::V1),
            2 => Ok(ProtocolRevision::V2),
            _ => Err(ProtocolError::InvalidValue {
                field: "revision",
                value: id,
            }),
        }
    }

    /// 根据 SDK/固件版本选择协议版本
    ///
    /// 只接受主版本 1 和 2，其余版本需要先和目标控制器固件确认。
    pub fn from_version(version: &Version) -> Result<Self, ProtocolError> {
        match version.major {
            1 => Ok(ProtocolRevision::V1),
            2 => Ok(ProtocolRevision::V2),
            _ => Err(ProtocolError::UnsupportedVersion(version.to_string())),
        }
    }

    /// 解析版本字符串（如 `"2.5.0"`）并选择协议版本
    pub fn parse_version(version: &str) -> Result<Self, ProtocolError> {
        let version = Version::parse(version)
            .map_err(|e| ProtocolError::UnsupportedVersion(format!("{version}: {e}")))?;
        Self::from_version(&version)
    }

    /// 解码线上 `ClientCommandMode`
    pub fn decode_command_mode(self, value: u8) -> Result<ClientCommandMode, ProtocolError> {
        let mode = match (self, value) {
            (_, 0) => ClientCommandMode::NoCommandMode,
            (_, 1) => ClientCommandMode::JointPosition,
            (_, 2) => ClientCommandMode::Wrench,
            (_, 3) => ClientCommandMode::Torque,
            (ProtocolRevision::V2, 4) => ClientCommandMode::CartesianPose,
            _ => {
                return Err(ProtocolError::InvalidValue {
                    field: "client_command_mode",
                    value,
                });
            },
        };
        Ok(mode)
    }

    /// 编码 `ClientCommandMode`
    pub fn encode_command_mode(self, mode: ClientCommandMode) -> Result<u8, ProtocolError> {
        match (self, mode) {
            (_, ClientCommandMode::NoCommandMode) => Ok(0),
            (_, ClientCommandMode::JointPosition) => Ok(1),
            (_, ClientCommandMode::Wrench) => Ok(2),
            (_, ClientCommandMode::Torque) => Ok(3),
            (ProtocolRevision::V2, ClientCommandMode::CartesianPose) => Ok(4),
            (revision, mode) => Err(ProtocolError::CommandModeNotInRevision {
                mode,
                revision: revision.wire_id(),
            }),
        }
    }

    /// 该版本支持的全部指令模式
    pub fn command_modes(self) -> &'static [ClientCommandMode] {
        match self {
            ProtocolRevision::V1 => &[
                ClientCommandMode::NoCommandMode,
                ClientCommandMode::JointPosition,
                ClientCommandMode::Wrench,
                ClientCommandMode::Torque,
            ],
            ProtocolRevision::V2 => &[
                ClientCommandMode::NoCommandMode,
                ClientCommandMode::JointPosition,
                ClientCommandMode::Wrench,
                ClientCommandMode::Torque,
                ClientCommandMode::CartesianPose,
            ],
        }
    }

    /// 控制器 SDK 中该模式的名称
    pub fn command_mode_name(self, mode: ClientCommandMode) -> &'static str {
        match (self, mode) {
            (_, ClientCommandMode::NoCommandMode) => "NO_COMMAND_MODE",
            (ProtocolRevision::V1, ClientCommandMode::JointPosition) => "POSITION",
            (ProtocolRevision::V2, ClientCommandMode::JointPosition) => "JOINT_POSITION",
            (_, ClientCommandMode::Wrench) => "WRENCH",
            (_, ClientCommandMode::Torque) => "TORQUE",
            (_, ClientCommandMode::CartesianPose) => "CARTESIAN_POSE",
        }
    }

    /// 状态报文是否携带 commanded joint position
    pub fn has_commanded_joint_position(self) -> bool {
        self == ProtocolRevision::V1
    }

    /// 状态报文是否携带 Cartesian pose 与冗余信息
    pub fn has_cartesian_state(self) -> bool {
        self == ProtocolRevision::V2
    }
}

impl std::fmt::Display for ProtocolRevision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.wire_id())
    }
}
