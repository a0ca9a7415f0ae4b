//! 内存存储实现模块
//!
//! 用于测试和本地演示，不做持久化。
//!
//! - PointUpdateSink: InMemoryPointStore
//! - CommandQueueStore: InMemoryCommandQueue
//! - InstanceStore / StoreHealth: InMemoryInstanceStore

pub mod command;
pub mod instance;
pub mod realtime;

pub use command::*;
pub use instance::*;
pub use realtime::*;
