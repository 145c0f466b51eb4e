//! 二进制编解码测试

use bytes::BytesMut;
use fri_protocol::codec::{COMMAND_MAGIC, STATE_MAGIC};
use fri_protocol::*;
use proptest::prelude::*;

fn sample_state(revision: ProtocolRevision) -> RobotState {
    RobotState::builder(revision)
        .sequence(42)
        .sample_time(0.002)
        .session_state(SessionState::CommandingWait)
        .connection_quality(ConnectionQuality::Excellent)
        .drive_state(DriveState::Active)
        .client_command_mode(ClientCommandMode::JointPosition)
        .overlay_type(OverlayType::Joint)
        .control_mode(ControlMode::PositionControlMode)
        .timestamp(1_700_000_000, 250_000)
        .measured_joint_position([0.1, -0.2, 0.3, -0.4, 0.5, -0.6, 0.7])
        .external_torque([1.5; 7])
        .ipo_joint_position([0.11, -0.21, 0.31, -0.41, 0.51, -0.61, 0.71])
        .tracking_performance(0.98)
        .io("gripper_open", IoValue::Boolean(true))
        .io("voltage", IoValue::Analog(24.0))
        .build()
}

fn encode_state(codec: &BinaryCodec, state: &RobotState) -> Vec<u8> {
    let mut out = BytesMut::new();
    codec.encode_state(state, &mut out).unwrap();
    out.to_vec()
}

#[test]
fn state_survives_encoding_for_both_revisions() {
    for revision in [ProtocolRevision::V1, ProtocolRevision::V2] {
        let codec = BinaryCodec::new(revision);
        let state = sample_state(revision);
        let datagram = encode_state(&codec, &state);
        let decoded: RobotState = codec.decode_state(&datagram).unwrap();
        assert_eq!(decoded, state, "revision {revision}");
    }
}

#[test]
fn v2_cartesian_pose_is_carried() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let state = RobotState::<7>::builder(ProtocolRevision::V2)
        .measured_cartesian_pose([0.5, 0.0, 0.8, 0.0, 0.0, 0.0, 1.0])
        .redundancy(0.3, RedundancyStrategy::E1)
        .build();
    let decoded: RobotState = codec.decode_state(&encode_state(&codec, &state)).unwrap();
    assert_eq!(decoded.measured_cartesian_pose().unwrap()[2], 0.8);
    assert_eq!(decoded.measured_redundancy_value().unwrap(), 0.3);
    assert_eq!(decoded.redundancy_strategy().unwrap(), RedundancyStrategy::E1);
}

#[test]
fn decode_rejects_wrong_magic() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let mut datagram = encode_state(&codec, &sample_state(ProtocolRevision::V2));
    datagram[0] ^= 0xFF;
    let err = PacketCodec::<7>::decode_state(&codec, &datagram).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidMagic { expected: STATE_MAGIC, .. }));
}

#[test]
fn decode_rejects_other_revision() {
    let v1 = BinaryCodec::new(ProtocolRevision::V1);
    let v2 = BinaryCodec::new(ProtocolRevision::V2);
    let datagram = encode_state(&v1, &sample_state(ProtocolRevision::V1));
    let err = PacketCodec::<7>::decode_state(&v2, &datagram).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::RevisionMismatch {
            expected: 2,
            actual: 1
        }
    );
}

#[test]
fn decode_rejects_joint_count_mismatch() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let datagram = encode_state(&codec, &sample_state(ProtocolRevision::V2));
    let err = PacketCodec::<6>::decode_state(&codec, &datagram).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::JointCountMismatch {
            expected: 6,
            actual: 7
        }
    );
}

#[test]
fn decode_rejects_unknown_session_state() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let mut datagram = encode_state(&codec, &sample_state(ProtocolRevision::V2));
    // 报文头 10 字节 + sample_time 8 字节之后是会话状态
    datagram[18] = 9;
    let err = PacketCodec::<7>::decode_state(&codec, &datagram).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::InvalidValue {
            field: "session_state",
            value: 9
        }
    );
}

#[test]
fn decode_rejects_cartesian_mode_in_v1() {
    let codec = BinaryCodec::new(ProtocolRevision::V1);
    let mut datagram = encode_state(&codec, &sample_state(ProtocolRevision::V1));
    // client_command_mode 位于第 6 个枚举字节
    datagram[18 + 5] = 4;
    assert!(PacketCodec::<7>::decode_state(&codec, &datagram).is_err());
}

#[test]
fn acknowledge_reflects_sequence_and_holds_ipo() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let state = sample_state(ProtocolRevision::V2);
    let packet = CommandPacket::acknowledge(&state);

    let mut out = BytesMut::new();
    codec.encode_command(&packet, &mut out).unwrap();
    assert_eq!(&out[..4], &COMMAND_MAGIC.to_le_bytes());

    let decoded: CommandPacket = codec.decode_command(&out).unwrap();
    assert_eq!(decoded.kind, CommandKind::Acknowledge);
    assert_eq!(decoded.reflected_sequence, 42);
    assert_eq!(decoded.joint_position, Some(*state.ipo_joint_position()));
    assert_eq!(decoded.torque, None);
}

#[test]
fn control_packet_keeps_channels_and_io() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let state = RobotState::<7>::builder(ProtocolRevision::V2)
        .sequence(7)
        .client_command_mode(ClientCommandMode::Torque)
        .io("gripper_open", IoValue::Boolean(false))
        .build();

    let mut command = Command::for_state(&state);
    command.set_joint_position(&[0.2; 7]).unwrap();
    command.set_torque(&[0.0, 0.5, 0.0, 0.0, 0.0, 0.0, -0.5]).unwrap();
    command.set_boolean_io_value("gripper_open", true).unwrap();
    let packet = command.into_packet(ProtocolRevision::V2, state.sequence());

    let mut out = BytesMut::new();
    codec.encode_command(&packet, &mut out).unwrap();
    let decoded: CommandPacket = codec.decode_command(&out).unwrap();
    assert_eq!(decoded, packet);
    assert_eq!(decoded.io.get("gripper_open"), Some(&IoValue::Boolean(true)));
}

#[test]
fn encode_command_rejects_revision_mismatch() {
    let codec = BinaryCodec::new(ProtocolRevision::V1);
    let packet = CommandPacket::acknowledge(&sample_state(ProtocolRevision::V2));
    let mut out = BytesMut::new();
    assert!(matches!(
        codec.encode_command(&packet, &mut out),
        Err(ProtocolError::RevisionMismatch { .. })
    ));
}

#[test]
fn io_name_longer_than_255_bytes_is_rejected() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let long_name = "x".repeat(300);
    let state = RobotState::<7>::builder(ProtocolRevision::V2)
        .io(&long_name, IoValue::Digital(1))
        .build();
    let mut out = BytesMut::new();
    assert!(matches!(
        codec.encode_state(&state, &mut out),
        Err(ProtocolError::MalformedIo(_))
    ));
}

#[test]
fn bytes_after_io_block_are_rejected() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let mut datagram = encode_state(&codec, &sample_state(ProtocolRevision::V2));
    datagram.extend_from_slice(&[0, 0]);
    assert!(matches!(
        PacketCodec::<7>::decode_state(&codec, &datagram),
        Err(ProtocolError::TrailingBytes(2))
    ));

    let packet = CommandPacket::acknowledge(&sample_state(ProtocolRevision::V2));
    let mut out = BytesMut::new();
    codec.encode_command(&packet, &mut out).unwrap();
    out.extend_from_slice(&[0xFF]);
    assert!(matches!(
        codec.decode_command::<7>(&out),
        Err(ProtocolError::TrailingBytes(1))
    ));
}

#[test]
fn duplicate_io_names_are_rejected() {
    let codec = BinaryCodec::new(ProtocolRevision::V2);
    let state = RobotState::<7>::builder(ProtocolRevision::V2)
        .io("io_a", IoValue::Digital(1))
        .io("io_b", IoValue::Digital(2))
        .build();
    let mut datagram = encode_state(&codec, &state);

    // 把第二个信号改名为第一个的名字
    let at = datagram
        .windows(4)
        .position(|w| w == b"io_b")
        .unwrap();
    datagram[at..at + 4].copy_from_slice(b"io_a");

    let err = PacketCodec::<7>::decode_state(&codec, &datagram).unwrap_err();
    match err {
        ProtocolError::MalformedIo(msg) => assert!(msg.contains("duplicate"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

proptest! {
    /// 任意截断的状态报文都返回错误而不是 panic
    #[test]
    fn truncated_state_is_an_error(cut in 0usize..400) {
        let codec = BinaryCodec::new(ProtocolRevision::V2);
        let datagram = encode_state(&codec, &sample_state(ProtocolRevision::V2));
        let cut = cut.min(datagram.len() - 1);
        prop_assert!(PacketCodec::<7>::decode_state(&codec, &datagram[..cut]).is_err());
    }

    /// 任意字节输入都不会 panic
    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..600)) {
        let codec = BinaryCodec::new(ProtocolRevision::V1);
        let _ = PacketCodec::<7>::decode_state(&codec, &bytes);
        let _ = codec.decode_command::<7>(&bytes);
    }

    /// 序号原样回传
    #[test]
    fn acknowledge_reflects_any_sequence(sequence in any::<u32>()) {
        let codec = BinaryCodec::new(ProtocolRevision::V2);
        let state = RobotState::<7>::builder(ProtocolRevision::V2).sequence(sequence).build();
        let mut out = BytesMut::new();
        codec.encode_command(&CommandPacket::acknowledge(&state), &mut out).unwrap();
        let decoded: CommandPacket = codec.decode_command(&out).unwrap();
        prop_assert_eq!(decoded.reflected_sequence, sequence);
    }
}
