//! 报文编解码
//!
//! 控制器真实的报文布局是专有格式，不在本 crate 范围内；控制循环只依赖
//! [`PacketCodec`] trait。[`BinaryCodec`] 是一个公开的小端布局，供仿真控制器、
//! 回环测试和台架调试使用。
//!
//! ## 布局（小端）
//!
//! ```text
//! 报文头（10 字节）
//!   magic: u32          "LBRS"(状态) / "LBRC"(命令)
//!   revision: u8        1 | 2
//!   joint_count: u8     N
//!   sequence: u32       状态报文序号；命令报文回传该值
//!
//! 状态报文体
//!   sample_time: f64
//!   session, quality, safety, operation, drive,
//!   client_command_mode, overlay, control: u8 × 8
//!   timestamp_sec: u32, timestamp_nanosec: u32
//!   tracking_performance: f64
//!   measured_joint_position, measured_torque, commanded_torque,
//!   external_torque, ipo_joint_position: f64 × N × 5
//!   V1: commanded_joint_position: f64 × N
//!   V2: measured_cartesian_pose: f64 × 7, redundancy_value: f64, strategy: u8
//!   IO 块
//!
//! 命令报文体
//!   kind: u8 (0 = acknowledge, 1 = control)
//!   client_command_mode: u8
//!   flags: u8 (bit0 joint position, bit1 torque, bit2 wrench)
//!   joint_position: f64 × N, torque: f64 × N, wrench: f64 × 6（未写入为 0）
//!   IO 块
//!
//! IO 块
//!   count: u8
//!   每项: name_len: u8, name: UTF-8, kind: u8 (0 bool, 1 digital, 2 analog), value: 8 字节
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::command::{CommandKind, CommandPacket};
use crate::enums::decode_enum;
use crate::error::ProtocolError;
use crate::io::{IoSignals, IoValue};
use crate::joints::{CARTESIAN_POSE_DIM, WRENCH_DIM};
use crate::revision::ProtocolRevision;
use crate::state::RobotState;

/// 状态报文 magic（"LBRS"）
pub const STATE_MAGIC: u32 = 0x4C42_5253;
/// 命令报文 magic（"LBRC"）
pub const COMMAND_MAGIC: u32 = 0x4C42_5243;

const HEADER_LEN: usize = 4 + 1 + 1 + 4;

const FLAG_JOINT_POSITION: u8 = 0b001;
const FLAG_TORQUE: u8 = 0b010;
const FLAG_WRENCH: u8 = 0b100;

/// 控制循环依赖的编解码接口
pub trait PacketCodec<const N: usize> {
    /// 解码一个状态数据报
    fn decode_state(&self, datagram: &[u8]) -> Result<RobotState<N>, ProtocolError>;

    /// 编码一个命令报文，追加到 `out`
    fn encode_command(
        &self,
        packet: &CommandPacket<N>,
        out: &mut BytesMut,
    ) -> Result<(), ProtocolError>;
}

/// 公开的小端二进制布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryCodec {
    revision: ProtocolRevision,
}

impl BinaryCodec {
    pub fn new(revision: ProtocolRevision) -> Self {
        Self { revision }
    }

    pub fn revision(&self) -> ProtocolRevision {
        self.revision
    }

    /// 状态报文最小长度（IO 块为空时）
    pub fn state_len<const N: usize>(&self) -> usize {
        let revision_specific = match self.revision {
            ProtocolRevision::V1 => N * 8,
            ProtocolRevision::V2 => CARTESIAN_POSE_DIM * 8 + 8 + 1,
        };
        HEADER_LEN + 8 + 8 + 8 + 8 + 5 * N * 8 + revision_specific + 1
    }

    /// 命令报文最小长度（IO 块为空时）
    pub fn command_len<const N: usize>(&self) -> usize {
        HEADER_LEN + 3 + 2 * N * 8 + WRENCH_DIM * 8 + 1
    }

    /// 编码状态报文（控制器侧）
    pub fn encode_state<const N: usize>(
        &self,
        state: &RobotState<N>,
        out: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        self.check_revision(state.revision())?;
        out.reserve(self.state_len::<N>());
        self.put_header::<N>(out, STATE_MAGIC, state.sequence());

        out.put_f64_le(state.sample_time());
        out.put_u8(state.session_state().into());
        out.put_u8(state.connection_quality().into());
        out.put_u8(state.safety_state().into());
        out.put_u8(state.operation_mode().into());
        out.put_u8(state.drive_state().into());
        out.put_u8(self.revision.encode_command_mode(state.client_command_mode())?);
        out.put_u8(state.overlay_type().into());
        out.put_u8(state.control_mode().into());
        out.put_u32_le(state.timestamp_sec());
        out.put_u32_le(state.timestamp_nanosec());
        out.put_f64_le(state.tracking_performance());

        put_f64s(out, state.measured_joint_position());
        put_f64s(out, state.measured_torque());
        put_f64s(out, state.commanded_torque());
        put_f64s(out, state.external_torque());
        put_f64s(out, state.ipo_joint_position());

        match self.revision {
            ProtocolRevision::V1 => {
                let commanded = state
                    .commanded_joint_position
                    .unwrap_or(*state.ipo_joint_position());
                put_f64s(out, &commanded);
            },
            ProtocolRevision::V2 => {
                let pose = state
                    .measured_cartesian_pose
                    .unwrap_or([0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
                put_f64s(out, &pose);
                out.put_f64_le(state.measured_redundancy_value.unwrap_or(0.0));
                out.put_u8(state.redundancy_strategy.unwrap_or_default().into());
            },
        }

        put_io(out, state.io_signals())
    }

    /// 解码命令报文（控制器侧）
    pub fn decode_command<const N: usize>(
        &self,
        datagram: &[u8],
    ) -> Result<CommandPacket<N>, ProtocolError> {
        let mut buf = datagram;
        ensure(&buf, self.command_len::<N>())?;
        let sequence = self.take_header::<N>(&mut buf, COMMAND_MAGIC)?;

        let kind = match buf.get_u8() {
            0 => CommandKind::Acknowledge,
            1 => CommandKind::Control,
            value => {
                return Err(ProtocolError::InvalidValue {
                    field: "command_kind",
                    value,
                });
            },
        };
        let mode = self.revision.decode_command_mode(buf.get_u8())?;
        let flags = buf.get_u8();

        let joint_position = take_f64s::<N>(&mut buf);
        let torque = take_f64s::<N>(&mut buf);
        let wrench = take_f64s::<WRENCH_DIM>(&mut buf);
        let io = take_io(&mut buf)?;
        ensure_consumed(&buf)?;

        Ok(CommandPacket {
            revision: self.revision,
            reflected_sequence: sequence,
            kind,
            mode,
            joint_position: (flags & FLAG_JOINT_POSITION != 0).then_some(joint_position),
            torque: (flags & FLAG_TORQUE != 0).then_some(torque),
            wrench: (flags & FLAG_WRENCH != 0).then_some(wrench),
            io,
        })
    }

    fn check_revision(&self, revision: ProtocolRevision) -> Result<(), ProtocolError> {
        if revision == self.revision {
            Ok(())
        } else {
            Err(ProtocolError::RevisionMismatch {
                expected: self.revision.wire_id(),
                actual: revision.wire_id(),
            })
        }
    }

    fn put_header<const N: usize>(&self, out: &mut BytesMut, magic: u32, sequence: u32) {
        out.put_u32_le(magic);
        out.put_u8(self.revision.wire_id());
        out.put_u8(N as u8);
        out.put_u32_le(sequence);
    }

    /// 校验报文头，返回序号
    fn take_header<const N: usize>(&self, buf: &mut &[u8], magic: u32) -> Result<u32, ProtocolError> {
        let actual_magic = buf.get_u32_le();
        if actual_magic != magic {
            return Err(ProtocolError::InvalidMagic {
                expected: magic,
                actual: actual_magic,
            });
        }
        let revision = buf.get_u8();
        if revision != self.revision.wire_id() {
            return Err(ProtocolError::RevisionMismatch {
                expected: self.revision.wire_id(),
                actual: revision,
            });
        }
        let joint_count = buf.get_u8() as usize;
        if joint_count != N {
            return Err(ProtocolError::JointCountMismatch {
                expected: N,
                actual: joint_count,
            });
        }
        Ok(buf.get_u32_le())
    }
}

impl<const N: usize> PacketCodec<N> for BinaryCodec {
    fn decode_state(&self, datagram: &[u8]) -> Result<RobotState<N>, ProtocolError> {
        let mut buf = datagram;
        ensure(&buf, self.state_len::<N>())?;
        let sequence = self.take_header::<N>(&mut buf, STATE_MAGIC)?;

        let mut builder = RobotState::<N>::builder(self.revision)
            .sequence(sequence)
            .sample_time(buf.get_f64_le())
            .session_state(decode_enum("session_state", buf.get_u8())?)
            .connection_quality(decode_enum("connection_quality", buf.get_u8())?)
            .safety_state(decode_enum("safety_state", buf.get_u8())?)
            .operation_mode(decode_enum("operation_mode", buf.get_u8())?)
            .drive_state(decode_enum("drive_state", buf.get_u8())?)
            .client_command_mode(self.revision.decode_command_mode(buf.get_u8())?)
            .overlay_type(decode_enum("overlay_type", buf.get_u8())?)
            .control_mode(decode_enum("control_mode", buf.get_u8())?);

        let sec = buf.get_u32_le();
        let nanosec = buf.get_u32_le();
        builder = builder
            .timestamp(sec, nanosec)
            .tracking_performance(buf.get_f64_le())
            .measured_joint_position(take_f64s(&mut buf))
            .measured_torque(take_f64s(&mut buf))
            .commanded_torque(take_f64s(&mut buf))
            .external_torque(take_f64s(&mut buf))
            .ipo_joint_position(take_f64s(&mut buf));

        builder = match self.revision {
            ProtocolRevision::V1 => builder.commanded_joint_position(take_f64s(&mut buf)),
            ProtocolRevision::V2 => {
                let pose = take_f64s::<CARTESIAN_POSE_DIM>(&mut buf);
                let redundancy = buf.get_f64_le();
                let strategy = decode_enum("redundancy_strategy", buf.get_u8())?;
                builder
                    .measured_cartesian_pose(pose)
                    .redundancy(redundancy, strategy)
            },
        };

        let io = take_io(&mut buf)?;
        ensure_consumed(&buf)?;
        Ok(builder.io_signals(io).build())
    }

    fn encode_command(
        &self,
        packet: &CommandPacket<N>,
        out: &mut BytesMut,
    ) -> Result<(), ProtocolError> {
        self.check_revision(packet.revision)?;
        out.reserve(self.command_len::<N>());
        self.put_header::<N>(out, COMMAND_MAGIC, packet.reflected_sequence);

        out.put_u8(match packet.kind {
            CommandKind::Acknowledge => 0,
            CommandKind::Control => 1,
        });
        out.put_u8(self.revision.encode_command_mode(packet.mode)?);

        let mut flags = 0;
        if packet.joint_position.is_some() {
            flags |= FLAG_JOINT_POSITION;
        }
        if packet.torque.is_some() {
            flags |= FLAG_TORQUE;
        }
        if packet.wrench.is_some() {
            flags |= FLAG_WRENCH;
        }
        out.put_u8(flags);

        put_f64s(out, &packet.joint_position.unwrap_or([0.0; N]));
        put_f64s(out, &packet.torque.unwrap_or([0.0; N]));
        put_f64s(out, &packet.wrench.unwrap_or([0.0; WRENCH_DIM]));

        put_io(out, &packet.io)
    }
}

fn ensure(buf: &&[u8], expected: usize) -> Result<(), ProtocolError> {
    if buf.remaining() < expected {
        Err(ProtocolError::InvalidLength {
            expected,
            actual: buf.remaining(),
        })
    } else {
        Ok(())
    }
}

fn put_f64s(out: &mut BytesMut, values: &[f64]) {
    for &v in values {
        out.put_f64_le(v);
    }
}

/// 调用方需先保证剩余长度足够
fn take_f64s<const L: usize>(buf: &mut &[u8]) -> [f64; L] {
    let mut values = [0.0; L];
    for v in values.iter_mut() {
        *v = buf.get_f64_le();
    }
    values
}

fn put_io(out: &mut BytesMut, io: &IoSignals) -> Result<(), ProtocolError> {
    let count = u8::try_from(io.len())
        .map_err(|_| ProtocolError::MalformedIo(format!("too many IO signals: {}", io.len())))?;
    out.put_u8(count);
    for signal in io.iter() {
        let name = signal.name.as_bytes();
        let name_len = u8::try_from(name.len())
            .map_err(|_| ProtocolError::MalformedIo(format!("IO name too long: {}", signal.name)))?;
        out.put_u8(name_len);
        out.put_slice(name);
        out.put_u8(signal.value.wire_kind());
        match signal.value {
            IoValue::Boolean(v) => out.put_u64_le(v as u64),
            IoValue::Digital(v) => out.put_u64_le(v),
            IoValue::Analog(v) => out.put_f64_le(v),
        }
    }
    Ok(())
}

fn take_io(buf: &mut &[u8]) -> Result<IoSignals, ProtocolError> {
    let count = buf.get_u8() as usize;
    let mut signals = IoSignals::new();
    for i in 0..count {
        if buf.remaining() < 1 {
            return Err(ProtocolError::MalformedIo(format!("truncated at signal {i}")));
        }
        let name_len = buf.get_u8() as usize;
        if buf.remaining() < name_len + 1 + 8 {
            return Err(ProtocolError::MalformedIo(format!("truncated at signal {i}")));
        }
        let name = std::str::from_utf8(&buf[..name_len])
            .map_err(|e| ProtocolError::MalformedIo(format!("signal {i} name: {e}")))?
            .to_string();
        buf.advance(name_len);
        let value = match buf.get_u8() {
            0 => IoValue::Boolean(buf.get_u64_le() != 0),
            1 => IoValue::Digital(buf.get_u64_le()),
            2 => IoValue::Analog(buf.get_f64_le()),
            kind => {
                return Err(ProtocolError::MalformedIo(format!(
                    "signal {name}: unknown kind {kind}"
                )));
            },
        };
        if signals.get(&name).is_some() {
            return Err(ProtocolError::MalformedIo(format!("duplicate signal {name}")));
        }
        signals.set(&name, value);
    }
    Ok(signals)
}

/// IO 块是报文的最后一部分
fn ensure_consumed(buf: &&[u8]) -> Result<(), ProtocolError> {
    match buf.remaining() {
        0 => Ok(()),
        extra => Err(ProtocolError::TrailingBytes(extra)),
    }
}
