//! 关节正弦叠加命令
//!
//! 监听控制器状态报文，进入指令阶段后在选定关节上叠加正弦偏移。
//! 指令阶段结束、会话回到 `IDLE` 或收到 Ctrl+C 时退出。

use anyhow::{Context, Result};
use clap::Args;
use fri_client::ClientApplication;
use fri_protocol::{ProtocolRevision, SessionState};
use fri_transport::{DEFAULT_PORT, UdpTransport};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use super::config::load_config;
use crate::overlay::{SineOverlayClient, SineOverlayConfig};
use crate::utils::{install_stop_flag, raise_thread_priority};
use crate::validation::validate_overlay;

type OverlayApp = ClientApplication<SineOverlayClient, UdpTransport>;

/// 正弦叠加命令参数
#[derive(Args, Debug)]
pub struct SineOverlayCommand {
    /// 控制器地址（只接受该主机的报文）
    #[arg(long)]
    pub hostname: Option<String>,

    /// 本地监听端口
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// 配置文件路径（默认使用用户配置目录）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 控制器 SDK 版本（如 2.5.0），覆盖配置中的协议版本
    #[arg(long)]
    pub sdk_version: Option<String>,

    /// 叠加的关节（逗号分隔，从 0 开始）
    #[arg(long, value_delimiter = ',', default_value = "3")]
    pub joint_mask: Vec<usize>,

    /// 正弦频率（Hz）
    #[arg(long, default_value_t = 0.25)]
    pub freq_hz: f64,

    /// 正弦幅值（弧度）
    #[arg(long, default_value_t = 0.04)]
    pub ampl_rad: f64,

    /// 低通滤波系数
    #[arg(long, default_value_t = 0.99)]
    pub filter_coeff: f64,

    /// 把每周期状态记录到 CSV 文件
    #[arg(long)]
    pub collect_data: Option<PathBuf>,
}

impl SineOverlayCommand {
    pub fn execute(self) -> Result<()> {
        let overlay = SineOverlayConfig {
            joint_mask: self.joint_mask.clone(),
            freq_hz: self.freq_hz,
            ampl_rad: self.ampl_rad,
            filter_coeff: self.filter_coeff,
        };
        validate_overlay(&overlay)?;

        let mut config = load_config(self.config.as_deref())?;
        if let Some(version) = &self.sdk_version {
            config.protocol_revision = ProtocolRevision::parse_version(version)?;
        }
        info!(
            "Sine overlay on joints {:?}: {} Hz, {} rad, filter {}, protocol {}",
            overlay.joint_mask, overlay.freq_hz, overlay.ampl_rad, overlay.filter_coeff,
            config.protocol_revision
        );

        let mut app = OverlayApp::new(UdpTransport::new(), SineOverlayClient::new(overlay), config)?;
        if let Some(path) = &self.collect_data {
            app.collect_data(path)
                .with_context(|| format!("创建数据文件失败: {}", path.display()))?;
        }

        let stop = install_stop_flag()?;
        raise_thread_priority();

        app.connect(self.port, self.hostname.as_deref())
            .with_context(|| format!("监听端口 {} 失败", self.port))?;
        info!("Listening for controller on port {}", self.port);

        let result = run_loop(&mut app, &stop);
        app.disconnect();

        let stats = app.stats();
        info!(
            "Finished: {} cycles, {} commands sent, {} missed cycles, max processing {:?}",
            stats.cycles, stats.commands_sent, stats.missed_cycles, stats.max_processing
        );
        result
    }
}

fn run_loop(app: &mut OverlayApp, stop: &AtomicBool) -> Result<()> {
    while !stop.load(Ordering::SeqCst) {
        match app.step() {
            Ok(()) => {
                if app.client().has_commanded() && app.session_state() == SessionState::Idle {
                    info!("Session returned to IDLE, exiting");
                    break;
                }
            },
            Err(e) if e.is_missed_cycle() => {
                if app.client().has_commanded() {
                    warn!("{}", e);
                } else {
                    debug!("{}", e);
                }
            },
            Err(e) => return Err(e).context("控制循环异常结束"),
        }
    }
    Ok(())
}
