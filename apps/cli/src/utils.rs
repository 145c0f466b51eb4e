//! 命令共用的运行时工具

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// 安装 Ctrl+C 处理器，返回停止标志
///
/// 每个进程只能安装一次。
pub fn install_stop_flag() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, stopping");
        flag.store(true, Ordering::SeqCst);
    })
    .context("设置 Ctrl+C 处理器失败")?;
    Ok(stop)
}

/// 提升当前线程优先级（`realtime` feature）
///
/// 失败只记录警告：通常是缺少 CAP_SYS_NICE 权限。
pub fn raise_thread_priority() {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => info!("Control thread priority set to MAX (realtime)"),
            Err(e) => tracing::warn!(
                "Failed to set realtime priority: {:?}. \
                 On Linux this needs CAP_SYS_NICE, e.g. \
                 sudo setcap cap_sys_nice=+ep <binary>",
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_priority_never_panics() {
        raise_thread_priority();
    }
}
