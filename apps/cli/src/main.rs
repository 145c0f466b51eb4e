//! # FRI CLI
//!
//! FRI 客户端命令行工具。
//!
//! ```bash
//! # 在关节 A4 上叠加 0.25 Hz / 0.04 rad 的正弦
//! fri-cli sine-overlay --joint-mask 3 --freq-hz 0.25 --ampl-rad 0.04
//!
//! # 没有真实控制器时，用仿真控制器联调
//! fri-cli simulate --port 30200 --cycle-ms 5 --cycles 2000
//!
//! # 通过外部接口启动默认应用，并查询状态
//! fri-cli app --controller-ip 172.31.1.147 start
//! fri-cli app state
//!
//! # 配置管理
//! fri-cli config init
//! fri-cli config show
//! ```
//!
//! 日志级别通过 `RUST_LOG` 调整，默认 `fri_cli=info,fri_client=info`。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod overlay;
mod simulator;
mod utils;
mod validation;

use commands::{AppCommand, ConfigCommand, SimulateCommand, SineOverlayCommand};

/// FRI CLI - 机器人 FRI 客户端命令行工具
#[derive(Parser, Debug)]
#[command(name = "fri-cli")]
#[command(about = "Command-line FRI client for KUKA LBR controllers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 在选定关节上叠加正弦运动
    SineOverlay {
        #[command(flatten)]
        args: SineOverlayCommand,
    },

    /// 运行仿真控制器
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 外部自动化接口：启动/暂停默认应用、查询状态
    App {
        #[command(flatten)]
        args: AppCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fri_cli=info,fri_client=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),

        Commands::SineOverlay { args } => args.execute(),

        Commands::Simulate { args } => args.execute(),

        Commands::App { args } => args.execute(),
    }
}
