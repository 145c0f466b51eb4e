//! 外部自动化接口报文
//!
//! 报文为 UTF-8 文本，字段以 `;` 分隔。
//!
//! ```text
//! 控制报文（客户端 → 控制器）
//!   时间戳(ms);报文计数;信号名;true|false
//!
//! 状态报文（控制器 → 客户端）
//!   时间戳(ms);控制器发送计数;控制器收到的计数;错误 ID;
//!   AutExt_Active;AutExt_AppReadyToStart;DefaultApp_Error;Station_Error;
//!   应用状态;App_Start;App_Enable
//! ```

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;
use std::str::FromStr;

use super::ExternalError;

const SEPARATOR: char = ';';
const STATUS_FIELDS: usize = 11;
const CONTROL_FIELDS: usize = 4;

/// 控制报文的输入信号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSignal {
    /// 启动默认应用
    AppStart,
    /// 使能信号；控制器启用该信号时，100 ms 内未收到 `true` 即暂停应用
    AppEnable,
    /// 只请求状态报文
    GetState,
}

impl InputSignal {
    pub fn name(self) -> &'static str {
        match self {
            InputSignal::AppStart => "App_Start",
            InputSignal::AppEnable => "App_Enable",
            InputSignal::GetState => "Get_State",
        }
    }
}

impl fmt::Display for InputSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputSignal {
    type Err = ExternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "App_Start" => Ok(InputSignal::AppStart),
            "App_Enable" => Ok(InputSignal::AppEnable),
            "Get_State" => Ok(InputSignal::GetState),
            other => Err(ExternalError::MalformedControl(format!("unknown signal {other}"))),
        }
    }
}

/// 状态报文中的错误 ID
///
/// 多个错误同时出现时控制器只报告优先级最高的一个（-3 高于 -4）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum ExternalErrorCode {
    NoError = 0,
    /// 客户端 IP 与控制器项目中配置的不一致
    IncorrectClientIp = -1,
    IncorrectMessageStructure = -2,
    /// 报文计数不连续，需把计数对齐到状态报文中控制器收到的计数
    IncorrectDataPacketCounter = -3,
    IncorrectTimeStamp = -4,
    IncorrectSignalName = -5,
    IncorrectSignalValue = -6,
    TimeoutError = -7,
}

impl ExternalErrorCode {
    pub fn is_error(self) -> bool {
        self != ExternalErrorCode::NoError
    }

    pub fn name(self) -> &'static str {
        match self {
            ExternalErrorCode::NoError => "NO_ERROR",
            ExternalErrorCode::IncorrectClientIp => "INCORRECT_CLIENT_IP",
            ExternalErrorCode::IncorrectMessageStructure => "INCORRECT_MESSAGE_STRUCTURE",
            ExternalErrorCode::IncorrectDataPacketCounter => "INCORRECT_DATA_PACKET_COUNTER",
            ExternalErrorCode::IncorrectTimeStamp => "INCORRECT_TIME_STAMP",
            ExternalErrorCode::IncorrectSignalName => "INCORRECT_SIGNAL_NAME",
            ExternalErrorCode::IncorrectSignalValue => "INCORRECT_SIGNAL_VALUE",
            ExternalErrorCode::TimeoutError => "TIMEOUT_ERROR",
        }
    }
}

impl fmt::Display for ExternalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 默认应用的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    /// 已选中，未运行
    Idle,
    Running,
    MotionPaused,
    Repositioning,
    Error,
    Starting,
    Stopping,
}

impl AppState {
    /// 控制器使用的拼写（`REPOSITIONG` 即控制器原文）
    pub fn wire_name(self) -> &'static str {
        match self {
            AppState::Idle => "IDLE",
            AppState::Running => "RUNNING",
            AppState::MotionPaused => "MOTIONPAUSED",
            AppState::Repositioning => "REPOSITIONG",
            AppState::Error => "ERROR",
            AppState::Starting => "STARTING",
            AppState::Stopping => "STOPPING",
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for AppState {
    type Err = ExternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(AppState::Idle),
            "RUNNING" => Ok(AppState::Running),
            "MOTIONPAUSED" => Ok(AppState::MotionPaused),
            "REPOSITIONG" | "REPOSITIONING" => Ok(AppState::Repositioning),
            "ERROR" => Ok(AppState::Error),
            "STARTING" => Ok(AppState::Starting),
            "STOPPING" => Ok(AppState::Stopping),
            other => Err(ExternalError::UnknownAppState(other.to_string())),
        }
    }
}

/// 控制报文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    pub timestamp_ms: u64,
    pub counter: u64,
    pub signal: InputSignal,
    pub value: bool,
}

impl fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{}",
            self.timestamp_ms, self.counter, self.signal, self.value
        )
    }
}

impl FromStr for ControlMessage {
    type Err = ExternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(SEPARATOR).collect();
        if fields.len() != CONTROL_FIELDS {
            return Err(ExternalError::MalformedControl(format!(
                "expected {CONTROL_FIELDS} fields, got {}",
                fields.len()
            )));
        }
        let malformed = |what: &str| ExternalError::MalformedControl(format!("{what}: {s}"));
        Ok(ControlMessage {
            timestamp_ms: fields[0].parse().map_err(|_| malformed("timestamp"))?,
            counter: fields[1].parse().map_err(|_| malformed("counter"))?,
            signal: fields[2].parse()?,
            value: parse_flag(fields[3]).ok_or_else(|| malformed("signal value"))?,
        })
    }
}

/// 状态报文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    pub timestamp_ms: u64,
    /// 控制器发出的状态报文计数
    pub counter_sent: u64,
    /// 控制器最近收到的控制报文计数
    pub counter_received: u64,
    pub error: ExternalErrorCode,
    /// AUT EXT 模式已激活
    pub aut_ext_active: bool,
    pub app_ready_to_start: bool,
    pub default_app_error: bool,
    pub station_error: bool,
    pub app_state: AppState,
    pub app_start: bool,
    pub app_enable: bool,
}

impl ControllerStatus {
    /// 状态报文中需要操作员处理的问题
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.error.is_error() {
            problems.push(format!("controller error {}", self.error));
        }
        if !self.aut_ext_active {
            problems.push("AUT EXT mode is not active".to_string());
        }
        if !self.app_ready_to_start {
            problems.push("application is not ready to start".to_string());
        }
        if self.default_app_error {
            problems.push("default application error".to_string());
        }
        if self.station_error {
            problems.push("station error".to_string());
        }
        problems
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{};{};{};{};{};{};{}",
            self.timestamp_ms,
            self.counter_sent,
            self.counter_received,
            i32::from(self.error),
            self.aut_ext_active,
            self.app_ready_to_start,
            self.default_app_error,
            self.station_error,
            self.app_state,
            self.app_start,
            self.app_enable
        )
    }
}

impl FromStr for ControllerStatus {
    type Err = ExternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim_end().split(SEPARATOR).collect();
        if fields.len() != STATUS_FIELDS {
            return Err(ExternalError::MalformedStatus(format!(
                "expected {STATUS_FIELDS} fields, got {}",
                fields.len()
            )));
        }
        let malformed = |what: &str| ExternalError::MalformedStatus(format!("{what}: {s}"));
        let flag = |i: usize, what: &str| parse_flag(fields[i]).ok_or_else(|| malformed(what));

        let error_id: i32 = fields[3].parse().map_err(|_| malformed("error id"))?;
        let error = ExternalErrorCode::try_from(error_id)
            .map_err(|_| ExternalError::UnknownErrorId(error_id))?;

        Ok(ControllerStatus {
            timestamp_ms: fields[0].parse().map_err(|_| malformed("timestamp"))?,
            counter_sent: fields[1].parse().map_err(|_| malformed("counter sent"))?,
            counter_received: fields[2].parse().map_err(|_| malformed("counter received"))?,
            error,
            aut_ext_active: flag(4, "AutExt_Active")?,
            app_ready_to_start: flag(5, "AutExt_AppReadyToStart")?,
            default_app_error: flag(6, "DefaultApp_Error")?,
            station_error: flag(7, "Station_Error")?,
            app_state: fields[8].parse()?,
            app_start: flag(9, "App_Start")?,
            app_enable: flag(10, "App_Enable")?,
        })
    }
}

fn parse_flag(field: &str) -> Option<bool> {
    match field {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
