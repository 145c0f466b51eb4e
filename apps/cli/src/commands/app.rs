//! 外部自动化接口命令
//!
//! 通过控制器的 UDP 外部接口启动、暂停默认应用或查询状态（需 AUT EXT 模式）。

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use fri_client::external::{ControllerStatus, DEFAULT_CONTROLLER_IP, EXTERNAL_PORT};
use fri_client::{ExternalClient, ExternalConfig};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::utils::install_stop_flag;

/// 外部接口命令参数
#[derive(Args, Debug)]
pub struct AppCommand {
    /// 控制器地址
    #[arg(long, default_value_t = IpAddr::V4(DEFAULT_CONTROLLER_IP))]
    pub controller_ip: IpAddr,

    /// 控制器外部接口端口
    #[arg(long, default_value_t = EXTERNAL_PORT)]
    pub controller_port: u16,

    /// 起始报文计数（计数错误时对齐到控制器收到的计数）
    #[arg(long, default_value_t = 0)]
    pub counter: u64,

    /// 控制器评估 App_Enable 信号
    #[arg(long)]
    pub app_enable: bool,

    /// 等待状态报文的超时（毫秒）
    #[arg(long, default_value_t = 100)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub action: AppAction,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    /// 启动默认应用；带 --app-enable 时保持心跳直到 Ctrl+C
    Start,
    /// 暂停默认应用（需 --app-enable）
    Stop,
    /// 先暂停再启动
    Restart,
    /// 查询状态
    State,
}

impl AppCommand {
    pub fn execute(self) -> Result<()> {
        let config = ExternalConfig {
            controller: SocketAddr::new(self.controller_ip, self.controller_port),
            initial_counter: self.counter,
            app_enable_supported: self.app_enable,
            receive_timeout: Duration::from_millis(self.timeout_ms),
            ..Default::default()
        };
        let controller = config.controller;
        let mut client = ExternalClient::connect(config)
            .with_context(|| format!("无法打开外部接口套接字 ({controller})"))?;

        let status = match self.action {
            AppAction::Start => client.app_start(),
            AppAction::Stop => client.app_stop(),
            AppAction::Restart => client.app_restart(),
            AppAction::State => client.get_state(),
        }
        .with_context(|| format!("外部接口请求失败 ({controller})"))?;
        print_status(&status);

        if matches!(self.action, AppAction::Start | AppAction::Restart) && client.is_heartbeat_running() {
            let stop = install_stop_flag()?;
            info!("Keeping App_Enable heartbeat alive, press Ctrl+C to stop the application");
            while !stop.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(50));
            }
            print_status(&client.app_stop().context("暂停应用失败")?);
        }
        Ok(())
    }
}

fn print_status(status: &ControllerStatus) {
    println!("控制器状态 [{}, {}]:", status.counter_sent, status.counter_received);
    println!("  应用状态: {}", status.app_state);
    println!("  错误: {}", status.error);
    println!("  AUT EXT: {}", status.aut_ext_active);
    println!("  App_Start: {}  App_Enable: {}", status.app_start, status.app_enable);
    for problem in status.problems() {
        println!("  ⚠️ {problem}");
    }
}
