//! 周期数据记录
//!
//! 每个完成的周期写一行 CSV：控制器时间戳、会话状态、采样周期，以及测量关节位置、
//! 测量力矩、外部力矩、IPO 关节位置四组向量。表头在第一行数据写入时按关节数生成。
//!
//! 写文件发生在控制循环线程上，使用带缓冲的写入；`Drop` 时自动 flush。

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fri_protocol::RobotState;

const VECTOR_COLUMNS: [&str; 4] = [
    "measured_joint_position",
    "measured_torque",
    "external_torque",
    "ipo_joint_position",
];

/// CSV 数据记录器
#[derive(Debug)]
pub struct DataRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    header_written: bool,
    rows: u64,
    line: String,
}

impl DataRecorder {
    /// 创建（覆盖已有文件）
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        tracing::debug!("Recording cycle data to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            header_written: false,
            rows: 0,
            line: String::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 已写入的数据行数
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn record<const N: usize>(&mut self, state: &RobotState<N>) -> std::io::Result<()> {
        if !self.header_written {
            self.write_header(N)?;
        }

        self.line.clear();
        let timestamp = state.timestamp().as_secs_f64();
        // 写入 String 不会失败
        let _ = write!(
            self.line,
            "{timestamp:.9},{},{}",
            state.session_state(),
            state.sample_time()
        );
        for values in [
            state.measured_joint_position(),
            state.measured_torque(),
            state.external_torque(),
            state.ipo_joint_position(),
        ] {
            for v in values {
                let _ = write!(self.line, ",{v}");
            }
        }
        self.line.push('\n');

        self.writer.write_all(self.line.as_bytes())?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    fn write_header(&mut self, joints: usize) -> std::io::Result<()> {
        let mut header = String::from("timestamp,session_state,sample_time");
        for column in VECTOR_COLUMNS {
            for i in 0..joints {
                let _ = write!(header, ",{column}_{i}");
            }
        }
        header.push('\n');
        self.writer.write_all(header.as_bytes())?;
        self.header_written = true;
        Ok(())
    }
}

impl Drop for DataRecorder {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush recording {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fri_protocol::{ProtocolRevision, SessionState};

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.csv");

        let mut recorder = DataRecorder::create(&path).unwrap();
        let state = RobotState::<3>::builder(ProtocolRevision::V2)
            .session_state(SessionState::MonitoringReady)
            .sample_time(0.005)
            .timestamp(10, 500_000_000)
            .measured_joint_position([0.1, 0.2, 0.3])
            .ipo_joint_position([1.0, 2.0, 3.0])
            .build();
        recorder.record(&state).unwrap();
        recorder.record(&state).unwrap();
        assert_eq!(recorder.rows(), 2);
        drop(recorder);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,session_state,sample_time,measured_joint_position_0"));
        assert!(lines[0].ends_with("ipo_joint_position_2"));
        assert_eq!(lines[0].split(',').count(), 3 + 4 * 3);
        assert!(lines[1].starts_with("10.500000000,MONITORING_READY,0.005,0.1,0.2,0.3"));
        assert!(lines[1].ends_with(",1,2,3"));
    }
}
