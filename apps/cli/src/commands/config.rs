//! 配置管理命令
//!
//! 客户端配置保存在 `<config_dir>/fri-cli/config.toml`，字段见 [`ClientConfig`]。

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use fri_client::ClientConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("fri-cli");
    path.push("config.toml");
    Ok(path)
}

/// 加载配置
///
/// 显式给出的路径必须存在；未给出时使用默认路径，文件不存在则取默认配置。
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig> {
    if let Some(path) = explicit {
        return ClientConfig::load(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()));
    }

    match config_file() {
        Ok(path) if path.exists() => ClientConfig::load(&path)
            .with_context(|| format!("加载配置文件失败: {}", path.display())),
        _ => Ok(ClientConfig::default()),
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置
    Show {
        /// 配置文件路径（默认使用用户配置目录）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 检查配置文件
    Check {
        /// 配置文件路径
        file: PathBuf,
    },

    /// 写入默认配置
    Init {
        /// 输出路径（默认使用用户配置目录）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { config } => Self::show_(config.as_deref()),

            ConfigCommand::Check { file } => Self::check_(&file),

            ConfigCommand::Init { output, force } => Self::init_(output, force),
        }
    }

    fn show_(path: Option<&Path>) -> Result<()> {
        let config = load_config(path)?;
        print!("{}", config.to_toml_string()?);
        Ok(())
    }

    fn check_(file: &Path) -> Result<()> {
        let config = ClientConfig::load(file)
            .with_context(|| format!("配置文件无效: {}", file.display()))?;

        println!("✅ 配置文件有效: {}", file.display());
        println!("  接收超时: {:?}", config.receive_timeout());
        println!("  协议版本: {}", config.protocol_revision);
        println!("  缺失命令策略: {:?}", config.missing_command_policy);
        Ok(())
    }

    fn init_(output: Option<PathBuf>, force: bool) -> Result<()> {
        let path = match output {
            Some(path) => path,
            None => config_file()?,
        };

        if path.exists() && !force {
            bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("创建配置目录失败")?;
        }

        let content = ClientConfig::default().to_toml_string()?;
        fs::write(&path, content).context("写入配置文件失败")?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }
}
