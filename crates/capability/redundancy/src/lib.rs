//! # I104M 主备冗余
//!
//! 多个网关实例共享同一条实例记录，同一时刻只有一个实例处理流量。
//! 仲裁基于心跳计数而非共识协议，允许短暂的双主窗口。
//!
//! [`RedundancyController`] 是 [`ActivityFlag`] 的唯一写者；
//! 接收任务与命令任务通过 [`ActivityHandle`] 读取激活状态。

mod controller;
mod error;
mod flag;

pub use controller::{RedundancyConfig, RedundancyController, Role};
pub use error::RedundancyError;
pub use flag::{ActivityFlag, ActivityHandle};
