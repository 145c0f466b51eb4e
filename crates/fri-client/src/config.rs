//! 客户端配置
//!
//! 所有字段都有默认值，TOML 中缺省的字段取默认值：
//!
//! ```toml
//! receive_timeout_ms = 100
//! protocol_revision = "v2"
//! max_datagram_size = 1500
//! missing_command_policy = "fault"
//! # max_consecutive_missed_cycles = 50
//! ```

use std::path::Path;
use std::time::Duration;

use fri_protocol::ProtocolRevision;
use serde::{Deserialize, Serialize};

use crate::error::FriError;

/// `command()` 返回时必需通道未写全的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCommandPolicy {
    /// 协议违例：断开会话，不发送任何数据
    #[default]
    Fault,
    /// 补齐为安全默认值（保持 IPO 位置、力矩/力为零）后发送，并记录警告
    HoldPosition,
}

/// 控制循环配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 单周期接收超时（毫秒），应为控制周期的数倍
    pub receive_timeout_ms: u64,
    pub protocol_revision: ProtocolRevision,
    /// 最大合法数据报长度
    pub max_datagram_size: usize,
    pub missing_command_policy: MissingCommandPolicy,
    /// 连续超时达到此次数时结束会话（`None` 表示交由调用方决定）
    pub max_consecutive_missed_cycles: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 100,
            protocol_revision: ProtocolRevision::default(),
            max_datagram_size: 1500,
            missing_command_policy: MissingCommandPolicy::default(),
            max_consecutive_missed_cycles: None,
        }
    }
}

impl ClientConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    pub fn with_protocol_revision(mut self, revision: ProtocolRevision) -> Self {
        self.protocol_revision = revision;
        self
    }

    pub fn with_missing_command_policy(mut self, policy: MissingCommandPolicy) -> Self {
        self.missing_command_policy = policy;
        self
    }

    pub fn with_max_consecutive_missed_cycles(mut self, limit: u32) -> Self {
        self.max_consecutive_missed_cycles = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), FriError> {
        if self.receive_timeout_ms == 0 {
            return Err(FriError::Config("receive_timeout_ms must be > 0".into()));
        }
        if self.max_datagram_size == 0 || self.max_datagram_size > 65_507 {
            return Err(FriError::Config(format!(
                "max_datagram_size must be in 1..=65507, got {}",
                self.max_datagram_size
            )));
        }
        if self.max_consecutive_missed_cycles == Some(0) {
            return Err(FriError::Config(
                "max_consecutive_missed_cycles must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, FriError> {
        let config: Self = toml::from_str(content).map_err(|e| FriError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FriError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FriError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, FriError> {
        toml::to_string_pretty(self).map_err(|e| FriError::Config(e.to_string()))
    }
}
