//! 仿真控制器
//!
//! 按固定周期向客户端端口发送状态报文，会话依次经过
//! `MONITORING_WAIT → MONITORING_READY → COMMANDING_WAIT → COMMANDING_ACTIVE → IDLE`。
//! 指令阶段每周期等待客户端回复，测得关节位置跟随客户端下发的目标位置。
//!
//! 用于没有真实控制器时的台架联调。

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Result, bail};
use bytes::BytesMut;
use fri_protocol::{
    BinaryCodec, ClientCommandMode, ConnectionQuality, LBR_JOINT_COUNT, ProtocolError,
    ProtocolRevision, RobotState, SessionState,
};
use tracing::{debug, info, trace, warn};

/// 仿真机器人的初始关节位置（弧度）
pub const HOME_POSITION: [f64; LBR_JOINT_COUNT] = [0.0, 0.5, 0.0, -1.2, 0.0, 0.8, 0.0];

const RECEIVE_BUFFER: usize = 1500;

/// 会话阶段及其持续周期数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    pub state: SessionState,
    pub cycles: u32,
}

/// 默认会话脚本
pub fn default_schedule(commanding_cycles: u32) -> Vec<Phase> {
    [
        (SessionState::MonitoringWait, 20),
        (SessionState::MonitoringReady, 20),
        (SessionState::CommandingWait, 10),
        (SessionState::CommandingActive, commanding_cycles),
        (SessionState::Idle, 5),
    ]
    .into_iter()
    .map(|(state, cycles)| Phase { state, cycles })
    .collect()
}

/// 仿真统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationStats {
    pub states_sent: u64,
    pub replies: u64,
    pub missing_replies: u64,
    pub rejected_replies: u64,
}

#[derive(Debug)]
pub struct SimulatedController {
    codec: BinaryCodec,
    mode: ClientCommandMode,
    sample_time: f64,
    schedule: Vec<Phase>,
    phase: usize,
    cycle_in_phase: u32,
    sequence: u32,
    ipo: [f64; LBR_JOINT_COUNT],
    measured: [f64; LBR_JOINT_COUNT],
    commanded_torque: [f64; LBR_JOINT_COUNT],
    stats: SimulationStats,
}

impl SimulatedController {
    pub fn new(
        revision: ProtocolRevision,
        mode: ClientCommandMode,
        sample_time: f64,
        schedule: Vec<Phase>,
    ) -> Result<Self> {
        if !revision.command_modes().contains(&mode) {
            bail!("协议 {} 不支持命令模式 {:?}", revision, mode);
        }
        if !sample_time.is_finite() || sample_time <= 0.0 {
            bail!("采样周期必须为正数: {}", sample_time);
        }

        Ok(Self {
            codec: BinaryCodec::new(revision),
            mode,
            sample_time,
            schedule,
            phase: 0,
            cycle_in_phase: 0,
            sequence: 0,
            ipo: HOME_POSITION,
            measured: HOME_POSITION,
            commanded_torque: [0.0; LBR_JOINT_COUNT],
            stats: SimulationStats::default(),
        })
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(self.sample_time)
    }

    pub fn stats(&self) -> SimulationStats {
        self.stats
    }

    pub fn measured_joint_position(&self) -> &[f64; LBR_JOINT_COUNT] {
        &self.measured
    }

    /// 生成下一周期的状态，脚本结束时返回 `None`
    pub fn next_state(&mut self) -> Option<RobotState> {
        while let Some(phase) = self.schedule.get(self.phase) {
            if self.cycle_in_phase < phase.cycles {
                break;
            }
            self.phase += 1;
            self.cycle_in_phase = 0;
        }
        let session = self.schedule.get(self.phase)?.state;
        self.cycle_in_phase += 1;
        self.sequence = self.sequence.wrapping_add(1);

        // 离开指令阶段后测得位置回到插补位置
        if !session.is_commanding() {
            self.measured = self.ipo;
            self.commanded_torque = [0.0; LBR_JOINT_COUNT];
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let quality = if session == SessionState::MonitoringWait {
            ConnectionQuality::Fair
        } else {
            ConnectionQuality::Excellent
        };

        Some(
            RobotState::builder(self.codec.revision())
                .sequence(self.sequence)
                .sample_time(self.sample_time)
                .session_state(session)
                .connection_quality(quality)
                .client_command_mode(self.mode)
                .timestamp(now.as_secs() as u32, now.subsec_nanos())
                .measured_joint_position(self.measured)
                .commanded_torque(self.commanded_torque)
                .ipo_joint_position(self.ipo)
                .commanded_joint_position(self.measured)
                .tracking_performance(1.0)
                .build(),
        )
    }

    /// 编码下一周期的状态报文，返回其会话状态
    pub fn encode_next(&mut self, out: &mut BytesMut) -> Result<Option<SessionState>, ProtocolError> {
        let Some(state) = self.next_state() else {
            return Ok(None);
        };
        self.codec.encode_state(&state, out)?;
        self.stats.states_sent += 1;
        Ok(Some(state.session_state()))
    }

    /// 处理客户端回复
    pub fn handle_reply(&mut self, datagram: &[u8]) -> Result<()> {
        let packet = match self.codec.decode_command::<LBR_JOINT_COUNT>(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                self.stats.rejected_replies += 1;
                return Err(e.into());
            },
        };
        if packet.reflected_sequence != self.sequence {
            self.stats.rejected_replies += 1;
            bail!(
                "回复序号 {} 与当前状态序号 {} 不一致",
                packet.reflected_sequence,
                self.sequence
            );
        }

        if let Some(position) = packet.joint_position {
            self.measured = position;
        }
        if let Some(torque) = packet.torque {
            self.commanded_torque = torque;
        }
        self.stats.replies += 1;
        trace!("Reply for sequence {} ({:?})", packet.reflected_sequence, packet.kind);
        Ok(())
    }

    pub fn record_missing_reply(&mut self) {
        self.stats.missing_replies += 1;
    }
}

/// 运行仿真直到脚本结束或 `stop` 置位
pub fn run(sim: &mut SimulatedController, target: SocketAddr, stop: &AtomicBool) -> Result<SimulationStats> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.connect(target)?;
    let period = sim.period();
    socket.set_read_timeout(Some(period / 2))?;
    info!(
        "Simulated controller {} -> {} ({:?} per cycle)",
        socket.local_addr()?,
        target,
        period
    );

    let mut out = BytesMut::with_capacity(RECEIVE_BUFFER);
    let mut buf = [0u8; RECEIVE_BUFFER];
    let mut last_session: Option<SessionState> = None;
    let mut next_tick = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        out.clear();
        let Some(session) = sim.encode_next(&mut out)? else {
            break;
        };
        if last_session != Some(session) {
            info!("Session state: {}", session);
            last_session = Some(session);
        }
        next_tick += period;

        match socket.send(&out) {
            Ok(_) => {},
            // 客户端尚未监听
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => debug!("Client not listening"),
            Err(e) => return Err(e.into()),
        }

        if session.is_commanding() {
            match socket.recv(&mut buf) {
                Ok(n) => {
                    if let Err(e) = sim.handle_reply(&buf[..n]) {
                        warn!("Rejected reply: {}", e);
                    }
                },
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::ConnectionRefused
                    ) =>
                {
                    sim.record_missing_reply();
                    debug!("No reply within {:?}", period / 2);
                },
                Err(e) => return Err(e.into()),
            }
        }

        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }

    Ok(sim.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fri_protocol::{CommandPacket, PacketCodec};

    fn schedule() -> Vec<Phase> {
        vec![
            Phase {
                state: SessionState::MonitoringWait,
                cycles: 2,
            },
            Phase {
                state: SessionState::CommandingActive,
                cycles: 3,
            },
            Phase {
                state: SessionState::Idle,
                cycles: 1,
            },
        ]
    }

    fn controller() -> SimulatedController {
        SimulatedController::new(
            ProtocolRevision::V2,
            ClientCommandMode::JointPosition,
            0.005,
            schedule(),
        )
        .unwrap()
    }

    #[test]
    fn test_schedule_is_walked_in_order() {
        let mut sim = controller();
        let mut seen = Vec::new();
        while let Some(state) = sim.next_state() {
            seen.push((state.sequence(), state.session_state()));
        }
        assert_eq!(
            seen,
            vec![
                (1, SessionState::MonitoringWait),
                (2, SessionState::MonitoringWait),
                (3, SessionState::CommandingActive),
                (4, SessionState::CommandingActive),
                (5, SessionState::CommandingActive),
                (6, SessionState::Idle),
            ]
        );
        assert!(sim.next_state().is_none());
    }

    #[test]
    fn test_reply_moves_measured_position() {
        let mut sim = controller();
        sim.next_state();
        let state = sim.next_state().unwrap();

        let mut packet = CommandPacket::acknowledge(&state);
        packet.joint_position = Some([0.3; LBR_JOINT_COUNT]);
        let mut out = BytesMut::new();
        BinaryCodec::new(ProtocolRevision::V2)
            .encode_command(&packet, &mut out)
            .unwrap();

        sim.handle_reply(&out).unwrap();
        assert_eq!(sim.measured_joint_position(), &[0.3; LBR_JOINT_COUNT]);
        assert_eq!(sim.stats().replies, 1);
    }

    #[test]
    fn test_stale_reply_is_rejected() {
        let mut sim = controller();
        let stale = sim.next_state().unwrap();
        sim.next_state();

        let mut out = BytesMut::new();
        BinaryCodec::new(ProtocolRevision::V2)
            .encode_command(&CommandPacket::acknowledge(&stale), &mut out)
            .unwrap();

        assert!(sim.handle_reply(&out).is_err());
        assert!(sim.handle_reply(&[0u8; 4]).is_err());
        assert_eq!(sim.stats().rejected_replies, 2);
        assert_eq!(sim.measured_joint_position(), &HOME_POSITION);
    }

    #[test]
    fn test_unsupported_mode_for_revision() {
        assert!(
            SimulatedController::new(
                ProtocolRevision::V1,
                ClientCommandMode::CartesianPose,
                0.005,
                schedule(),
            )
            .is_err()
        );
        assert!(
            SimulatedController::new(
                ProtocolRevision::V2,
                ClientCommandMode::JointPosition,
                0.0,
                schedule(),
            )
            .is_err()
        );
    }

    #[test]
    fn test_encode_next_counts_states() {
        let mut sim = controller();
        let mut out = BytesMut::new();
        let mut sessions = Vec::new();
        loop {
            out.clear();
            match sim.encode_next(&mut out).unwrap() {
                Some(session) => sessions.push(session),
                None => break,
            }
        }
        assert_eq!(sessions.len(), 6);
        assert_eq!(sim.stats().states_sent, 6);
    }
}
