//! 关节正弦叠加客户端
//!
//! 在 IPO 关节位置上对选定关节叠加一个低通滤波后的正弦偏移：
//!
//! ```text
//! offset = offset * filter + ampl * sin(phi) * (1 - filter)
//! phi    = (phi + 2π * freq * sample_time) mod 2π
//! ```
//!
//! 进入 `MONITORING_READY` 时相位与偏移清零，因此每次进入指令阶段都从零偏移平滑开始。

use std::f64::consts::TAU;

use fri_client::LbrClient;
use fri_protocol::{ClientCommandMode, Command, CommandError, RobotState, SessionState, WRENCH_DIM};
use tracing::{debug, info};

/// 正弦叠加参数
#[derive(Debug, Clone, PartialEq)]
pub struct SineOverlayConfig {
    /// 叠加的关节索引（从 0 开始）
    pub joint_mask: Vec<usize>,
    pub freq_hz: f64,
    pub ampl_rad: f64,
    /// 一阶低通系数，`[0, 1)`
    pub filter_coeff: f64,
}

#[derive(Debug)]
pub struct SineOverlayClient {
    config: SineOverlayConfig,
    offset: f64,
    phi: f64,
    step_width: f64,
    has_commanded: bool,
}

impl SineOverlayClient {
    pub fn new(config: SineOverlayConfig) -> Self {
        Self {
            config,
            offset: 0.0,
            phi: 0.0,
            step_width: 0.0,
            has_commanded: false,
        }
    }

    /// 是否已经进入过指令阶段
    pub fn has_commanded(&self) -> bool {
        self.has_commanded
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    fn reset(&mut self) {
        self.offset = 0.0;
        self.phi = 0.0;
        self.step_width = 0.0;
    }

    fn advance(&mut self, sample_time: f64) -> f64 {
        if self.step_width == 0.0 {
            self.step_width = TAU * self.config.freq_hz * sample_time;
        }
        let filter = self.config.filter_coeff;
        self.offset = self.offset * filter + self.config.ampl_rad * self.phi.sin() * (1.0 - filter);
        self.phi += self.step_width;
        if self.phi >= TAU {
            self.phi -= TAU;
        }
        self.offset
    }
}

impl<const N: usize> LbrClient<N> for SineOverlayClient {
    fn on_state_change(&mut self, old: SessionState, new: SessionState) {
        info!("Session state changed: {} -> {}", old, new);
        if new == SessionState::MonitoringReady {
            self.reset();
        }
    }

    fn monitor(&mut self, _state: &RobotState<N>) {}

    fn wait_for_command(&mut self, state: &RobotState<N>) {
        self.step_width = TAU * self.config.freq_hz * state.sample_time();
        debug!(
            "Ready to command, step width {:.6} rad per cycle",
            self.step_width
        );
    }

    fn command(
        &mut self,
        state: &RobotState<N>,
        command: &mut Command<'_, N>,
    ) -> Result<(), CommandError> {
        self.has_commanded = true;
        let offset = self.advance(state.sample_time());

        let mut target = *state.ipo_joint_position();
        for &joint in &self.config.joint_mask {
            if let Some(position) = target.get_mut(joint) {
                *position += offset;
            }
        }
        command.set_joint_position(&target)?;

        match state.client_command_mode() {
            ClientCommandMode::Torque => command.set_torque(&[0.0; N])?,
            ClientCommandMode::Wrench => command.set_wrench(&[0.0; WRENCH_DIM])?,
            _ => {},
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fri_protocol::{CommandChannel, ProtocolRevision};

    fn client() -> SineOverlayClient {
        SineOverlayClient::new(SineOverlayConfig {
            joint_mask: vec![3],
            freq_hz: 0.25,
            ampl_rad: 0.04,
            filter_coeff: 0.99,
        })
    }

    fn active_state(mode: ClientCommandMode) -> RobotState {
        RobotState::builder(ProtocolRevision::V2)
            .session_state(SessionState::CommandingActive)
            .client_command_mode(mode)
            .sample_time(0.005)
            .ipo_joint_position([0.0, 0.5, 0.0, -1.2, 0.0, 0.8, 0.0])
            .build()
    }

    #[test]
    fn test_first_cycle_starts_at_ipo() {
        let mut client = client();
        let state = active_state(ClientCommandMode::JointPosition);
        let mut cmd = Command::for_state(&state);
        LbrClient::<7>::command(&mut client, &state, &mut cmd).unwrap();
        // sin(0) = 0
        assert_eq!(cmd.joint_position(), Some(state.ipo_joint_position()));
        assert!(client.has_commanded());
    }

    #[test]
    fn test_only_masked_joints_move() {
        let mut client = client();
        let state = active_state(ClientCommandMode::JointPosition);
        for _ in 0..200 {
            let mut cmd = Command::for_state(&state);
            LbrClient::<7>::command(&mut client, &state, &mut cmd).unwrap();
            let target = cmd.joint_position().unwrap();
            let ipo = state.ipo_joint_position();
            for j in 0..7 {
                if j == 3 {
                    assert!((target[j] - ipo[j]).abs() <= 0.04);
                } else {
                    assert_eq!(target[j], ipo[j]);
                }
            }
        }
        assert!(client.offset() > 0.0);
    }

    #[test]
    fn test_torque_mode_writes_zero_torque() {
        let mut client = client();
        let state = active_state(ClientCommandMode::Torque);
        let mut cmd = Command::for_state(&state);
        LbrClient::<7>::command(&mut client, &state, &mut cmd).unwrap();
        assert_eq!(cmd.torque(), Some(&[0.0; 7]));
        assert_eq!(cmd.missing_channel(), None);
    }

    #[test]
    fn test_monitoring_ready_resets_phase() {
        let mut client = client();
        let state = active_state(ClientCommandMode::JointPosition);
        for _ in 0..50 {
            let mut cmd = Command::for_state(&state);
            LbrClient::<7>::command(&mut client, &state, &mut cmd).unwrap();
        }
        assert!(client.offset() != 0.0);

        LbrClient::<7>::on_state_change(
            &mut client,
            SessionState::MonitoringWait,
            SessionState::MonitoringReady,
        );
        assert_eq!(client.offset(), 0.0);
    }

    #[test]
    fn test_wrench_mode_is_complete() {
        let mut client = client();
        let state = active_state(ClientCommandMode::Wrench);
        let mut cmd = Command::for_state(&state);
        LbrClient::<7>::command(&mut client, &state, &mut cmd).unwrap();
        assert_ne!(cmd.missing_channel(), Some(CommandChannel::Wrench));
        assert!(cmd.wrench().is_some());
    }
}
