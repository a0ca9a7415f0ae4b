//! # I104M 命令下发
//!
//! 只在激活实例上运行：订阅本连接的新命令，逐条判断是否过期，
//! 编码为 28 字节命令帧后依次发往配置的前置机地址，最后把终态写回命令队列。
//!
//! - [`CommandDispatcher`]：单条命令的处理
//! - [`FrameTransmitter`]：发送抽象，生产实现为 [`UdpTransmitter`]
//! - [`spawn_command_supervisor`]：跟随激活标志打开/关闭订阅

mod dispatcher;
mod supervisor;
mod transmitter;

pub use dispatcher::{CommandDispatcher, DispatcherConfig};
pub use supervisor::spawn_command_supervisor;
pub use transmitter::{FrameTransmitter, TransmitError, UdpTransmitter};

/// 命令下发错误
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// 命令终态写回失败
    #[error("storage error: {0}")]
    Storage(String),
}
