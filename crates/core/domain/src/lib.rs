//! I104M 网关共享领域模型。
//!
//! 各能力模块之间只通过这里的类型交换数据：
//! - [`PointUpdate`]：解码后的遥测值（带品质位与源时标）
//! - [`CommandRequest`]：待下发的命令及其终态 [`CommandOutcome`]
//! - [`ConnectionConfig`] / [`InstanceState`]：连接配置与冗余记录

pub mod command;
pub mod data;
pub mod instance;

pub use command::{CancelReason, CommandOutcome, CommandRequest};
pub use data::{PointUpdate, QualityFlags};
pub use instance::{
    ConnectionConfig, DEFAULT_LOCAL_BIND_ADDRESS, DEFAULT_PEER_ADDRESS, DRIVER_NAME, InstanceState,
};

/// 获取当前时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
