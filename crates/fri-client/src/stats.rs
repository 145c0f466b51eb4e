//! 周期统计

use std::time::Duration;

/// 控制循环统计（只读，通过 `ClientApplication::stats()` 获取）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// 成功完成的周期数
    pub cycles: u64,
    /// 接收超时次数
    pub missed_cycles: u64,
    /// 当前连续超时次数（收到报文后清零）
    pub consecutive_missed: u32,
    /// 已发送的命令报文数（含应答报文）
    pub commands_sent: u64,
    /// 观察到的会话状态转换次数
    pub transitions: u64,
    /// 上一周期从收到报文到处理完成的耗时
    pub last_processing: Duration,
    pub max_processing: Duration,
}

impl CycleStats {
    pub(crate) fn record_cycle(&mut self, processing: Duration) {
        self.cycles += 1;
        self.consecutive_missed = 0;
        self.last_processing = processing;
        if processing > self.max_processing {
            self.max_processing = processing;
        }
    }

    pub(crate) fn record_missed(&mut self) {
        self.missed_cycles += 1;
        self.consecutive_missed = self.consecutive_missed.saturating_add(1);
    }

    /// 周期成功率（无数据时为 1.0）
    pub fn success_ratio(&self) -> f64 {
        let total = self.cycles + self.missed_cycles;
        if total == 0 {
            1.0
        } else {
            self.cycles as f64 / total as f64
        }
    }
}
