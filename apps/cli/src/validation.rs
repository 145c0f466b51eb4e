//! 输入验证模块
//!
//! 正弦叠加参数在连接控制器之前校验，避免在指令阶段才发现问题。

use anyhow::{Result, bail};
use fri_protocol::LBR_JOINT_COUNT;

use crate::overlay::SineOverlayConfig;

/// 叠加幅值上限（弧度）
pub const MAX_AMPLITUDE_RAD: f64 = 0.5;

/// 校验正弦叠加参数
pub fn validate_overlay(config: &SineOverlayConfig) -> Result<()> {
    if config.joint_mask.is_empty() {
        bail!("关节掩码不能为空");
    }
    for &joint in &config.joint_mask {
        if joint >= LBR_JOINT_COUNT {
            bail!("关节索引 {} 超出范围 [0, {})", joint, LBR_JOINT_COUNT);
        }
    }
    if !config.freq_hz.is_finite() || config.freq_hz <= 0.0 {
        bail!("频率必须为正数: {}", config.freq_hz);
    }
    if !config.ampl_rad.is_finite() || config.ampl_rad.abs() > MAX_AMPLITUDE_RAD {
        bail!(
            "幅值 {:.3} rad 超出限制 ±{:.3} rad",
            config.ampl_rad,
            MAX_AMPLITUDE_RAD
        );
    }
    if !(0.0..1.0).contains(&config.filter_coeff) {
        bail!("滤波系数必须在 [0, 1) 内: {}", config.filter_coeff);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SineOverlayConfig {
        SineOverlayConfig {
            joint_mask: vec![3],
            freq_hz: 0.25,
            ampl_rad: 0.04,
            filter_coeff: 0.99,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_overlay(&config()).is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut c = config();
        c.joint_mask = vec![7];
        assert!(validate_overlay(&c).is_err());

        let mut c = config();
        c.joint_mask.clear();
        assert!(validate_overlay(&c).is_err());

        let mut c = config();
        c.freq_hz = 0.0;
        assert!(validate_overlay(&c).is_err());

        let mut c = config();
        c.ampl_rad = 1.0;
        assert!(validate_overlay(&c).is_err());

        let mut c = config();
        c.filter_coeff = 1.0;
        assert!(validate_overlay(&c).is_err());
    }
}
