//! 仿真控制器命令

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use fri_protocol::{ClientCommandMode, ProtocolRevision};
use fri_transport::DEFAULT_PORT;
use std::net::ToSocketAddrs;

use crate::simulator::{self, SimulatedController, default_schedule};
use crate::utils::{install_stop_flag, raise_thread_priority};

/// 仿真控制器报告的命令模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SimulatedMode {
    NoCommand,
    JointPosition,
    Torque,
    Wrench,
}

impl From<SimulatedMode> for ClientCommandMode {
    fn from(mode: SimulatedMode) -> Self {
        match mode {
            SimulatedMode::NoCommand => ClientCommandMode::NoCommandMode,
            SimulatedMode::JointPosition => ClientCommandMode::JointPosition,
            SimulatedMode::Torque => ClientCommandMode::Torque,
            SimulatedMode::Wrench => ClientCommandMode::Wrench,
        }
    }
}

/// 仿真控制器命令参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 客户端地址
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// 客户端端口
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// 命令模式
    #[arg(long, value_enum, default_value_t = SimulatedMode::JointPosition)]
    pub mode: SimulatedMode,

    /// 模拟的控制器 SDK 版本
    #[arg(long, default_value = "2.5.0")]
    pub sdk_version: String,

    /// 控制周期（毫秒）
    #[arg(long, default_value_t = 5.0)]
    pub cycle_ms: f64,

    /// `COMMANDING_ACTIVE` 持续的周期数
    #[arg(long, default_value_t = 2000)]
    pub cycles: u32,
}

impl SimulateCommand {
    pub fn execute(self) -> Result<()> {
        let revision = ProtocolRevision::parse_version(&self.sdk_version)?;
        let target = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("无法解析客户端地址: {}", self.host))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("无法解析客户端地址: {}", self.host))?;

        let mut sim = SimulatedController::new(
            revision,
            self.mode.into(),
            self.cycle_ms / 1000.0,
            default_schedule(self.cycles),
        )?;

        let stop = install_stop_flag()?;
        raise_thread_priority();

        let stats = simulator::run(&mut sim, target, &stop)?;
        println!("仿真结束:");
        println!("  状态报文: {}", stats.states_sent);
        println!("  有效回复: {}", stats.replies);
        println!("  缺失回复: {}", stats.missing_replies);
        println!("  拒绝回复: {}", stats.rejected_replies);
        Ok(())
    }
}
