//! 机器人状态快照
//!
//! 每收到一个状态报文就整体替换一次，对客户端只读。
//! 同一快照内所有按关节索引的向量长度均为 N，索引 i 始终指向同一个物理关节。

use std::time::Duration;

use nalgebra::{Quaternion, UnitQuaternion};

use crate::enums::{
    ClientCommandMode, ConnectionQuality, ControlMode, DriveState, OperationMode, OverlayType,
    RedundancyStrategy, SafetyState, SessionState,
};
use crate::error::Unsupported;
use crate::io::{IoSignals, IoValue};
use crate::joints::{CARTESIAN_POSE_DIM, LBR_JOINT_COUNT};
use crate::revision::ProtocolRevision;

/// 3×4 齐次变换矩阵（行主序，最后一列为平移）
pub type PoseMatrix = [[f64; 4]; 3];

const CARTESIAN_OVERLAY_INACTIVE: &str = "requires an active cartesian overlay";

/// 单周期机器人状态（`LBRState`）
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState<const N: usize = LBR_JOINT_COUNT> {
    pub(crate) revision: ProtocolRevision,
    pub(crate) sequence: u32,
    pub(crate) sample_time: f64,
    pub(crate) session_state: SessionState,
    pub(crate) connection_quality: ConnectionQuality,
    pub(crate) safety_state: SafetyState,
    pub(crate) operation_mode: OperationMode,
    pub(crate) drive_state: DriveState,
    pub(crate) client_command_mode: ClientCommandMode,
    pub(crate) overlay_type: OverlayType,
    pub(crate) control_mode: ControlMode,
    pub(crate) timestamp_sec: u32,
    pub(crate) timestamp_nanosec: u32,
    pub(crate) measured_joint_position: [f64; N],
    pub(crate) measured_torque: [f64; N],
    pub(crate) commanded_torque: [f64; N],
    pub(crate) external_torque: [f64; N],
    pub(crate) ipo_joint_position: [f64; N],
    pub(crate) tracking_performance: f64,
    pub(crate) io: IoSignals,
    // V1
    pub(crate) commanded_joint_position: Option<[f64; N]>,
    // V2
    pub(crate) measured_cartesian_pose: Option<[f64; CARTESIAN_POSE_DIM]>,
    pub(crate) measured_redundancy_value: Option<f64>,
    pub(crate) redundancy_strategy: Option<RedundancyStrategy>,
}

impl<const N: usize> RobotState<N> {
    /// 关节数
    pub const NUMBER_OF_JOINTS: usize = N;

    /// 创建构造器（控制器仿真与测试使用）
    pub fn builder(revision: ProtocolRevision) -> RobotStateBuilder<N> {
        RobotStateBuilder::new(revision)
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.revision
    }

    /// 报文序号（命令报文回传此值）
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// 控制周期（秒）
    pub fn sample_time(&self) -> f64 {
        self.sample_time
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn connection_quality(&self) -> ConnectionQuality {
        self.connection_quality
    }

    pub fn safety_state(&self) -> SafetyState {
        self.safety_state
    }

    pub fn operation_mode(&self) -> OperationMode {
        self.operation_mode
    }

    pub fn drive_state(&self) -> DriveState {
        self.drive_state
    }

    pub fn client_command_mode(&self) -> ClientCommandMode {
        self.client_command_mode
    }

    pub fn overlay_type(&self) -> OverlayType {
        self.overlay_type
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    pub fn timestamp_sec(&self) -> u32 {
        self.timestamp_sec
    }

    pub fn timestamp_nanosec(&self) -> u32 {
        self.timestamp_nanosec
    }

    /// 控制器时间戳
    pub fn timestamp(&self) -> Duration {
        Duration::new(self.timestamp_sec as u64, self.timestamp_nanosec)
    }

    pub fn measured_joint_position(&self) -> &[f64; N] {
        &self.measured_joint_position
    }

    pub fn measured_torque(&self) -> &[f64; N] {
        &self.measured_torque
    }

    pub fn commanded_torque(&self) -> &[f64; N] {
        &self.commanded_torque
    }

    pub fn external_torque(&self) -> &[f64; N] {
        &self.external_torque
    }

    /// 插补器（IPO）关节位置
    pub fn ipo_joint_position(&self) -> &[f64; N] {
        &self.ipo_joint_position
    }

    pub fn tracking_performance(&self) -> f64 {
        self.tracking_performance
    }

    pub fn io_signals(&self) -> &IoSignals {
        &self.io
    }

    pub fn boolean_io_value(&self, name: &str) -> Option<bool> {
        match self.io.get(name) {
            Some(IoValue::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn digital_io_value(&self, name: &str) -> Option<u64> {
        match self.io.get(name) {
            Some(IoValue::Digital(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn analog_io_value(&self, name: &str) -> Option<f64> {
        match self.io.get(name) {
            Some(IoValue::Analog(v)) => Some(*v),
            _ => None,
        }
    }

    /// 控制器下发的关节位置（仅 V1）
    pub fn commanded_joint_position(&self) -> Result<&[f64; N], Unsupported> {
        self.commanded_joint_position.as_ref().ok_or(Unsupported::because(
            "commanded_joint_position",
            "only reported by protocol v1",
        ))
    }

    /// 测量的 Cartesian 位姿 `[x, y, z, q_x, q_y, q_z, q_w]`（仅 V2）
    pub fn measured_cartesian_pose(&self) -> Result<&[f64; CARTESIAN_POSE_DIM], Unsupported> {
        self.measured_cartesian_pose.as_ref().ok_or(Unsupported::because(
            "measured_cartesian_pose",
            "only reported by protocol v2",
        ))
    }

    /// 测量的 Cartesian 位姿（3×4 齐次矩阵，仅 V2）
    pub fn measured_cartesian_pose_as_matrix(&self) -> Result<PoseMatrix, Unsupported> {
        let pose = self.measured_cartesian_pose()?;
        Ok(pose_to_matrix(pose))
    }

    /// IPO Cartesian 位姿
    ///
    /// 只在 Cartesian overlay 激活时由控制器提供，本实现不支持 Cartesian overlay。
    pub fn ipo_cartesian_pose(&self) -> Result<&[f64; CARTESIAN_POSE_DIM], Unsupported> {
        Err(Unsupported::because(
            "ipo_cartesian_pose",
            CARTESIAN_OVERLAY_INACTIVE,
        ))
    }

    pub fn ipo_cartesian_pose_as_matrix(&self) -> Result<PoseMatrix, Unsupported> {
        Err(Unsupported::because(
            "ipo_cartesian_pose_as_matrix",
            CARTESIAN_OVERLAY_INACTIVE,
        ))
    }

    /// 测量的冗余值（仅 V2）
    pub fn measured_redundancy_value(&self) -> Result<f64, Unsupported> {
        self.measured_redundancy_value.ok_or(Unsupported::because(
            "measured_redundancy_value",
            "only reported by protocol v2",
        ))
    }

    pub fn ipo_redundancy_value(&self) -> Result<f64, Unsupported> {
        Err(Unsupported::because(
            "ipo_redundancy_value",
            CARTESIAN_OVERLAY_INACTIVE,
        ))
    }

    /// 冗余策略（仅 V2）
    pub fn redundancy_strategy(&self) -> Result<RedundancyStrategy, Unsupported> {
        self.redundancy_strategy.ok_or(Unsupported::because(
            "redundancy_strategy",
            "only reported by protocol v2",
        ))
    }
}

/// 四元数位姿转齐次矩阵
fn pose_to_matrix(pose: &[f64; CARTESIAN_POSE_DIM]) -> PoseMatrix {
    let [x, y, z, qx, qy, qz, qw] = *pose;
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz))
        .to_rotation_matrix();
    let r = rotation.matrix();
    [
        [r[(0, 0)], r[(0, 1)], r[(0, 2)], x],
        [r[(1, 0)], r[(1, 1)], r[(1, 2)], y],
        [r[(2, 0)], r[(2, 1)], r[(2, 2)], z],
    ]
}

/// `RobotState` 构造器
///
/// 版本相关字段只在对应版本中存在：`build()` 为 V1 填充 commanded joint
/// position，为 V2 填充 Cartesian 位姿与冗余信息，其余置空。
#[derive(Debug, Clone)]
pub struct RobotStateBuilder<const N: usize = LBR_JOINT_COUNT> {
    state: RobotState<N>,
}

impl<const N: usize> RobotStateBuilder<N> {
    pub fn new(revision: ProtocolRevision) -> Self {
        Self {
            state: RobotState {
                revision,
                sequence: 0,
                sample_time: 0.005,
                session_state: SessionState::Idle,
                connection_quality: ConnectionQuality::Poor,
                safety_state: SafetyState::NormalOperation,
                operation_mode: OperationMode::TestMode1,
                drive_state: DriveState::Off,
                client_command_mode: ClientCommandMode::NoCommandMode,
                overlay_type: OverlayType::NoOverlay,
                control_mode: ControlMode::NoControl,
                timestamp_sec: 0,
                timestamp_nanosec: 0,
                measured_joint_position: [0.0; N],
                measured_torque: [0.0; N],
                commanded_torque: [0.0; N],
                external_torque: [0.0; N],
                ipo_joint_position: [0.0; N],
                tracking_performance: 0.0,
                io: IoSignals::new(),
                commanded_joint_position: None,
                measured_cartesian_pose: None,
                measured_redundancy_value: None,
                redundancy_strategy: None,
            },
        }
    }

    pub fn sequence(mut self, sequence: u32) -> Self {
        self.state.sequence = sequence;
        self
    }

    pub fn sample_time(mut self, sample_time: f64) -> Self {
        self.state.sample_time = sample_time;
        self
    }

    pub fn session_state(mut self, state: SessionState) -> Self {
        self.state.session_state = state;
        self
    }

    pub fn connection_quality(mut self, quality: ConnectionQuality) -> Self {
        self.state.connection_quality = quality;
        self
    }

    pub fn safety_state(mut self, safety: SafetyState) -> Self {
        self.state.safety_state = safety;
        self
    }

    pub fn operation_mode(mut self, mode: OperationMode) -> Self {
        self.state.operation_mode = mode;
        self
    }

    pub fn drive_state(mut self, drive: DriveState) -> Self {
        self.state.drive_state = drive;
        self
    }

    pub fn client_command_mode(mut self, mode: ClientCommandMode) -> Self {
        self.state.client_command_mode = mode;
        self
    }

    pub fn overlay_type(mut self, overlay: OverlayType) -> Self {
        self.state.overlay_type = overlay;
        self
    }

    pub fn control_mode(mut self, mode: ControlMode) -> Self {
        self.state.control_mode = mode;
        self
    }

    pub fn timestamp(mut self, sec: u32, nanosec: u32) -> Self {
        self.state.timestamp_sec = sec;
        self.state.timestamp_nanosec = nanosec;
        self
    }

    pub fn measured_joint_position(mut self, values: [f64; N]) -> Self {
        self.state.measured_joint_position = values;
        self
    }

    pub fn measured_torque(mut self, values: [f64; N]) -> Self {
        self.state.measured_torque = values;
        self
    }

    pub fn commanded_torque(mut self, values: [f64; N]) -> Self {
        self.state.commanded_torque = values;
        self
    }

    pub fn external_torque(mut self, values: [f64; N]) -> Self {
        self.state.external_torque = values;
        self
    }

    pub fn ipo_joint_position(mut self, values: [f64; N]) -> Self {
        self.state.ipo_joint_position = values;
        self
    }

    pub fn tracking_performance(mut self, value: f64) -> Self {
        self.state.tracking_performance = value;
        self
    }

    pub fn io(mut self, name: &str, value: IoValue) -> Self {
        self.state.io.set(name, value);
        self
    }

    pub fn io_signals(mut self, io: IoSignals) -> Self {
        self.state.io = io;
        self
    }

    /// V1 字段，V2 下被忽略
    pub fn commanded_joint_position(mut self, values: [f64; N]) -> Self {
        self.state.commanded_joint_position = Some(values);
        self
    }

    /// V2 字段，V1 下被忽略
    pub fn measured_cartesian_pose(mut self, pose: [f64; CARTESIAN_POSE_DIM]) -> Self {
        self.state.measured_cartesian_pose = Some(pose);
        self
    }

    /// V2 字段，V1 下被忽略
    pub fn redundancy(mut self, value: f64, strategy: RedundancyStrategy) -> Self {
        self.state.measured_redundancy_value = Some(value);
        self.state.redundancy_strategy = Some(strategy);
        self
    }

    pub fn build(self) -> RobotState<N> {
        let mut state = self.state;
        if state.revision.has_commanded_joint_position() {
            state.commanded_joint_position = Some(
                state
                    .commanded_joint_position
                    .unwrap_or(state.ipo_joint_position),
            );
        } else {
            state.commanded_joint_position = None;
        }

        if state.revision.has_cartesian_state() {
            state.measured_cartesian_pose = Some(
                state
                    .measured_cartesian_pose
                    .unwrap_or([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]),
            );
            state.measured_redundancy_value = Some(state.measured_redundancy_value.unwrap_or(0.0));
            state.redundancy_strategy = Some(
                state
                    .redundancy_strategy
                    .unwrap_or(RedundancyStrategy::NoStrategy),
            );
        } else {
            state.measured_cartesian_pose = None;
            state.measured_redundancy_value = None;
            state.redundancy_strategy = None;
        }
        state
    }
}
