//! 定长向量工具
//!
//! 所有按关节索引的向量都是 `[f64; N]`，N 在编译期固定（每种机型固定）。
//! 来自外部的切片只在这里做一次长度校验，每个 setter 共用。

use crate::error::{CommandChannel, CommandError};

/// LBR 系列关节数
pub const LBR_JOINT_COUNT: usize = 7;

/// 力/力矩向量维度：`[F_x, F_y, F_z, tau_A, tau_B, tau_C]`
pub const WRENCH_DIM: usize = 6;

/// Cartesian 位姿维度：`[x, y, z, q_x, q_y, q_z, q_w]`
pub const CARTESIAN_POSE_DIM: usize = 7;

/// 校验长度并逐位拷贝
///
/// 长度不符时返回 [`CommandError::ShapeMismatch`]，不截断、不补零。
pub fn copy_exact<const L: usize>(
    channel: CommandChannel,
    values: &[f64],
) -> Result<[f64; L], CommandError> {
    <[f64; L]>::try_from(values).map_err(|_| CommandError::ShapeMismatch {
        channel,
        expected: L,
        actual: values.len(),
    })
}

/// 转为单精度（有损）
///
/// 内部一律使用 `f64`（与控制器线上语义一致）。需要 `f32` 的边界层
/// 必须显式调用此函数：超出 `f32` 精度的尾数被舍入，超出范围的值变为 ±inf。
pub fn narrow_to_f32<const L: usize>(values: &[f64; L]) -> [f32; L] {
    values.map(|v| v as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_exact_accepts_exact_length() {
        let src = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let copied: [f64; LBR_JOINT_COUNT] =
            copy_exact(CommandChannel::JointPosition, &src).unwrap();
        assert_eq!(copied, src);
    }

    #[test]
    fn test_copy_exact_rejects_short_and_long() {
        let short = [0.0; 6];
        let err = copy_exact::<LBR_JOINT_COUNT>(CommandChannel::Torque, &short).unwrap_err();
        assert_eq!(
            err,
            CommandError::ShapeMismatch {
                channel: CommandChannel::Torque,
                expected: 7,
                actual: 6
            }
        );

        let long = [0.0; 8];
        assert!(copy_exact::<WRENCH_DIM>(CommandChannel::Wrench, &long).is_err());
    }

    #[test]
    fn test_narrow_to_f32_is_lossy() {
        let wide = [0.1_f64, 1e300, -2.5];
        let narrow = narrow_to_f32(&wide);
        assert_eq!(narrow[2], -2.5_f32);
        assert!(narrow[1].is_infinite());
        assert_ne!(narrow[0] as f64, wide[0]);
    }
}
