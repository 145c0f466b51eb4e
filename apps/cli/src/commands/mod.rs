//! 命令定义和实现

pub mod app;
pub mod config;
pub mod simulate;
pub mod sine_overlay;

pub use app::AppCommand;
pub use config::ConfigCommand;
pub use simulate::SimulateCommand;
pub use sine_overlay::SineOverlayCommand;
