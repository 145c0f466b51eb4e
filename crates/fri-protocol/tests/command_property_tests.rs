//! 命令缓冲区的属性测试
//!
//! 使用 proptest 验证长度校验与通道规则。

use fri_protocol::*;
use proptest::prelude::*;

fn commanded_modes() -> impl Strategy<Value = ClientCommandMode> {
    prop_oneof![
        Just(ClientCommandMode::NoCommandMode),
        Just(ClientCommandMode::JointPosition),
        Just(ClientCommandMode::Torque),
        Just(ClientCommandMode::Wrench),
    ]
}

proptest! {
    /// 长度不等于关节数的关节位置一律拒绝，且缓冲区不变
    #[test]
    fn joint_position_rejects_wrong_length(len in 0usize..16) {
        prop_assume!(len != LBR_JOINT_COUNT);
        let io = IoSignals::new();
        let mut cmd = Command::<7>::new(ClientCommandMode::JointPosition, &io);
        let values = vec![0.1; len];

        let result = cmd.set_joint_position(&values);
        let is_shape_mismatch = matches!(
            result,
            Err(CommandError::ShapeMismatch { expected: 7, actual, .. }) if actual == len
        );
        prop_assert!(is_shape_mismatch);
        prop_assert!(cmd.joint_position().is_none());
    }

    /// 合法写入按位保存
    #[test]
    fn joint_position_is_stored_exactly(values in proptest::array::uniform7(-3.2..3.2f64)) {
        let io = IoSignals::new();
        let mut cmd = Command::<7>::new(ClientCommandMode::JointPosition, &io);
        cmd.set_joint_position(&values).unwrap();
        prop_assert_eq!(cmd.joint_position(), Some(&values));
    }

    /// wrench 维度固定为 6，与关节数无关
    #[test]
    fn wrench_rejects_wrong_length(len in 0usize..16) {
        prop_assume!(len != WRENCH_DIM);
        let io = IoSignals::new();
        let mut cmd = Command::<7>::new(ClientCommandMode::Wrench, &io);
        prop_assert!(cmd.set_wrench(&vec![1.0; len]).is_err());
        prop_assert!(cmd.wrench().is_none());
    }

    /// 只有本周期模式包含的通道可写
    #[test]
    fn channel_rules_follow_mode(mode in commanded_modes()) {
        let io = IoSignals::new();
        let mut cmd = Command::<7>::new(mode, &io);
        let channels = required_channels(mode);

        prop_assert_eq!(
            cmd.set_joint_position(&[0.0; 7]).is_ok(),
            channels.contains(&CommandChannel::JointPosition)
        );
        prop_assert_eq!(
            cmd.set_torque(&[0.0; 7]).is_ok(),
            channels.contains(&CommandChannel::Torque)
        );
        prop_assert_eq!(
            cmd.set_wrench(&[0.0; 6]).is_ok(),
            channels.contains(&CommandChannel::Wrench)
        );
        // 所有可写通道写完后不再缺失
        prop_assert_eq!(cmd.missing_channel(), None);
    }

    /// 补齐后位置通道等于 IPO 位置
    #[test]
    fn fill_hold_uses_ipo_position(ipo in proptest::array::uniform7(-3.0..3.0f64), mode in commanded_modes()) {
        let io = IoSignals::new();
        let mut cmd = Command::<7>::new(mode, &io);
        cmd.fill_hold(&ipo);
        prop_assert_eq!(cmd.missing_channel(), None);
        if mode != ClientCommandMode::NoCommandMode {
            prop_assert_eq!(cmd.joint_position(), Some(&ipo));
        }
    }
}
