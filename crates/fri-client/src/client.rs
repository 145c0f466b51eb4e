//! 客户端能力接口
//!
//! 控制循环只依赖 [`LbrClient`]，所有回调都在 `step()` 内同步调用，
//! 与 `step()` 在同一线程上。每个回调都必须在一个控制周期内返回。

use fri_protocol::{Command, CommandError, LBR_JOINT_COUNT, RobotState, SessionState};

/// 用户实现的 FRI 客户端
///
/// 同一周期内 `on_state_change`（如有）总是先于阶段回调触发，
/// 阶段回调看到的 `state` 已经反映新状态。
pub trait LbrClient<const N: usize = LBR_JOINT_COUNT> {
    /// 会话状态转换通知
    fn on_state_change(&mut self, old: SessionState, new: SessionState);

    /// 监控阶段（`IDLE`/`MONITORING_*`），控制器不等待指令
    fn monitor(&mut self, state: &RobotState<N>);

    /// `COMMANDING_WAIT`：控制器已就绪，本周期以保持 IPO 位置的应答回复
    ///
    /// 典型实现在此记录当前 IPO 关节位置，作为 `command()` 的起点以避免跳变。
    fn wait_for_command(&mut self, state: &RobotState<N>);

    /// `COMMANDING_ACTIVE`：每周期一次
    ///
    /// 返回前必须写入 `state.client_command_mode()` 要求的全部通道。
    /// 同一通道多次写入以最后一次为准，每周期只发送一个命令报文。
    fn command(
        &mut self,
        state: &RobotState<N>,
        command: &mut Command<'_, N>,
    ) -> Result<(), CommandError>;
}

impl<C, const N: usize> LbrClient<N> for Box<C>
where
    C: LbrClient<N> + ?Sized,
{
    fn on_state_change(&mut self, old: SessionState, new: SessionState) {
        (**self).on_state_change(old, new)
    }

    fn monitor(&mut self, state: &RobotState<N>) {
        (**self).monitor(state)
    }

    fn wait_for_command(&mut self, state: &RobotState<N>) {
        (**self).wait_for_command(state)
    }

    fn command(
        &mut self,
        state: &RobotState<N>,
        command: &mut Command<'_, N>,
    ) -> Result<(), CommandError> {
        (**self).command(state, command)
    }
}
