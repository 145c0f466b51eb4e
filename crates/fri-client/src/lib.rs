//! # FRI Client
//!
//! KUKA LBR FRI 客户端的会话状态机与周期控制循环。
//!
//! ## 模块
//!
//! - `session`: 会话状态机与回调映射
//! - `client`: 用户实现的 [`LbrClient`] trait
//! - `app`: 控制循环 [`ClientApplication`]
//! - `config`: [`ClientConfig`]（TOML）
//! - `error`: [`FriError`] 与四类 [`ErrorKind`]
//! - `stats`: 周期统计
//! - `recording`: CSV 周期数据记录
//! - `external`: 外部自动化接口（启动/暂停默认应用、查询状态）
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use fri_client::{ClientApplication, ClientConfig, LbrClient};
//! use fri_protocol::{Command, CommandError, RobotState, SessionState};
//! use fri_transport::UdpTransport;
//!
//! struct Hold {
//!     target: [f64; 7],
//! }
//!
//! impl LbrClient for Hold {
//!     fn on_state_change(&mut self, _old: SessionState, _new: SessionState) {}
//!     fn monitor(&mut self, _state: &RobotState) {}
//!     fn wait_for_command(&mut self, state: &RobotState) {
//!         self.target = *state.ipo_joint_position();
//!     }
//!     fn command(&mut self, _state: &RobotState, cmd: &mut Command<'_>) -> Result<(), CommandError> {
//!         cmd.set_joint_position(&self.target)
//!     }
//! }
//!
//! # fn main() -> Result<(), fri_client::FriError> {
//! let mut app: ClientApplication<_, _> = ClientApplication::new(
//!     UdpTransport::new(),
//!     Hold { target: [0.0; 7] },
//!     ClientConfig::default(),
//! )?;
//! app.connect(30200, None)?;
//! loop {
//!     match app.step() {
//!         Ok(()) => {},
//!         Err(e) if e.is_missed_cycle() => continue,
//!         Err(e) => return Err(e),
//!     }
//! }
//! # }
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod external;
pub mod recording;
pub mod session;
pub mod stats;

pub use app::{ClientApplication, DisconnectHandle};
pub use client::LbrClient;
pub use config::{ClientConfig, MissingCommandPolicy};
pub use error::{ErrorKind, FriError};
pub use external::{ExternalClient, ExternalConfig, ExternalError};
pub use recording::DataRecorder;
pub use session::{Callback, SessionStateMachine, Transition, required_callback};
pub use stats::CycleStats;
